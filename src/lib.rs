//! pooled-ast - arena-backed building blocks for AST construction.
//!
//! Compilers build large graphs of short-lived nodes that are all released
//! at once. This crate provides the memory layer and containers for that
//! pattern:
//!
//! - [`core`](crate::core) - paged bump arena, arena strings and the AST session
//! - [`operand`] - nodes that reference other nodes through growable,
//!   segmented operand lists
//! - [`sequence`] - segmented growable sequence with insertion and removal
//! - [`print`] - tree of lines and scopes rendered as indented text
//!
//! # Primary Usage
//!
//! ```
//! use pooled_ast::{Arena, AstSession};
//!
//! let arena = Arena::new();
//! let session = AstSession::new(&arena);
//!
//! let x = session.user("x", &[]);
//! let y = session.user("y", &[]);
//! let add = session.user("add", &[x, y]);
//! assert_eq!(add.operand_count(), 2);
//!
//! let root = session.root_scope();
//! let body = root.append_scope();
//! body.set_prefix("if (x)");
//! body.append_line("return x + y;");
//! assert_eq!(root.render(), "if (x) {\n\treturn x + y;\n}\n");
//! ```
//!
//! Values stored in the arena are never dropped, so only types without drop
//! glue are accepted:
//!
//! ```compile_fail
//! use pooled_ast::Arena;
//!
//! let arena = Arena::new();
//! arena.allocate(String::from("owns heap memory"));
//! ```

pub mod core;
pub mod operand;
pub mod print;
pub mod sequence;

// Re-export common types
pub use crate::core::{
    Arena, ArenaConfig, ArenaError, ArenaResult, ArenaStats, ArenaStr, AstSession, PageKind,
    SessionStats,
};
pub use operand::{OperandDump, Use, User};
pub use print::{PrintableItem, PrintableLine, PrintableScope};
pub use sequence::Sequence;
