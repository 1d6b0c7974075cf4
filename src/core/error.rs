// This module defines the error types for pooled-ast using the thiserror crate. ArenaError
// covers the recoverable failures of the arena: a size computation that overflows usize,
// an alignment that is not a power of two, a reversed or out-of-bounds byte range handed to
// the string copier, and an arena configuration with an unusably small page. Each variant
// carries the offending values for debugging. Exhaustion of the underlying allocator is not
// represented here; it is fatal and routed through std::alloc::handle_alloc_error. Contract
// violations such as an out-of-range operand index panic instead of returning an error.
// ArenaResult<T> is the convenience alias for Result<T, ArenaError>.

//! Error types for arena allocation.
//!
//! Using thiserror for idiomatic error handling.

use thiserror::Error;

/// Recoverable arena failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArenaError {
    #[error("Allocation size overflow: {count} elements of {element_size} bytes")]
    SizeOverflow {
        count: usize,
        element_size: usize,
    },

    #[error("Invalid alignment {alignment}: must be a power of two")]
    InvalidAlignment {
        alignment: usize,
    },

    #[error("Invalid byte range: start {start} is past end {end}")]
    InvalidRange {
        start: usize,
        end: usize,
    },

    #[error("Byte range end {end} is out of bounds for a source of {len} bytes")]
    OutOfBounds {
        end: usize,
        len: usize,
    },

    #[error("Invalid page size {page_size}: must be at least {minimum} bytes")]
    InvalidPageSize {
        page_size: usize,
        minimum: usize,
    },
}

/// Result type alias for arena operations.
pub type ArenaResult<T> = Result<T, ArenaError>;
