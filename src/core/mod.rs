// This module gathers the memory layer every other part of pooled-ast sits on. It exports
// the paged arena (small shared pages plus dedicated pages for oversized requests, with
// allocation statistics and arena-owned strings), the error type for rejected requests,
// and the AST session that builds graph nodes, sequences and print scopes over a borrowed
// arena. Objects produced here are never dropped individually; they are released together
// when the owning arena is cleared or dropped.

//! Core arena infrastructure.
//!
//! # Key Components
//!
//! ## Arena (`arena`)
//! - Fixed-capacity small pages filled by bump allocation
//! - Dedicated pages for requests at or above half the page size
//! - NUL-terminated string copies owned by the arena
//!
//! ## Session (`session`)
//! - Ties nodes, sequences and print scopes to one arena lifetime
//! - String interning and creation statistics

pub mod arena;
pub mod error;
pub mod session;
pub mod test_utils;

pub use arena::{
    Arena,
    ArenaConfig,
    ArenaStats,
    ArenaStr,
    PageKind,
    DEFAULT_PAGE_SIZE,
    MIN_PAGE_SIZE,
};

pub use error::{
    ArenaError,
    ArenaResult,
};

pub use session::{
    AstSession,
    SessionStats,
};
