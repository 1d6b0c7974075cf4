//! Operand ("use") graph.
//!
//! Graph nodes ([`User`]) own ordered operand lists built from arena
//! segments. Passes read and rewrite operands through [`User::operand_at`];
//! a slot reference obtained that way survives any later growth of the
//! same node.

pub mod dump;
pub mod user;

pub use dump::OperandDump;
pub use user::{Operands, SegmentInfo, Segments, Use, User};
