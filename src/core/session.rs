// This module provides the AST session, the front door through which the expression and
// statement layers build on a pooled-ast arena. AstSession borrows an Arena and ties every
// node, sequence and printable scope it creates to that arena's lifetime, so nothing it
// returns can outlive the memory that backs it. It deduplicates strings through an intern
// table keyed by the arena copy itself, builds operand-graph nodes with their initial
// operands, links further operands, and hands out empty sequences and root print scopes.
// SessionStats counts what the session created and, together with the arena statistics,
// renders a short report for debugging.

//! Arena-backed AST session.
//!
//! All objects created through a session share the lifetime of the arena the
//! session borrows.

use super::arena::{Arena, ArenaStats, ArenaStr};
use crate::operand::User;
use crate::print::PrintableScope;
use crate::sequence::Sequence;
use hashbrown::HashMap;
use log::trace;
use std::cell::RefCell;
use std::fmt;

/// Counters for what a session created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Graph nodes created.
    pub users_created: usize,

    /// Operand edges created, initial operands included.
    pub operands_linked: usize,

    /// Distinct strings copied into the arena by interning.
    pub strings_interned: usize,

    /// Intern requests answered from the table.
    pub intern_hits: usize,

    /// Print scopes created.
    pub scopes_created: usize,

    /// Arena statistics at the time the report was taken.
    pub arena: ArenaStats,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "AST Session Statistics:")?;
        writeln!(f, "  Users created: {}", self.users_created)?;
        writeln!(f, "  Operands linked: {}", self.operands_linked)?;
        writeln!(
            f,
            "  Strings interned: {} ({} hits)",
            self.strings_interned, self.intern_hits
        )?;
        writeln!(f, "  Scopes created: {}", self.scopes_created)?;
        write!(f, "{}", self.arena)
    }
}

/// Arena-based AST session.
pub struct AstSession<'arena> {
    /// Arena every session object is allocated in.
    arena: &'arena Arena,

    /// Interned strings, keyed by the arena copy of their bytes.
    interned: RefCell<HashMap<&'arena [u8], ArenaStr<'arena>>>,

    stats: RefCell<SessionStats>,
}

impl<'arena> AstSession<'arena> {
    /// Create a new session over `arena`.
    pub fn new(arena: &'arena Arena) -> Self {
        Self {
            arena,
            interned: RefCell::new(HashMap::new()),
            stats: RefCell::new(SessionStats::default()),
        }
    }

    /// Get access to the arena.
    pub fn arena(&self) -> &'arena Arena {
        self.arena
    }

    /// Copy `text` into the arena once; later calls return the same copy.
    pub fn intern_str(&self, text: &str) -> ArenaStr<'arena> {
        let mut interned = self.interned.borrow_mut();
        if let Some(&copy) = interned.get(text.as_bytes()) {
            self.stats.borrow_mut().intern_hits += 1;
            return copy;
        }

        let copy = self.arena.copy_str(text);
        interned.insert(copy.as_bytes(), copy);
        self.stats.borrow_mut().strings_interned += 1;
        copy
    }

    /// Create a node whose operands are `operands`, in append order.
    pub fn user<K>(&self, kind: K, operands: &[&'arena User<'arena, K>]) -> &'arena User<'arena, K> {
        let user = User::with_operands(self.arena, kind, operands);
        let mut stats = self.stats.borrow_mut();
        stats.users_created += 1;
        stats.operands_linked += operands.len();
        user
    }

    /// Create a node with room for `capacity` operands and none set.
    pub fn user_with_capacity<K>(&self, kind: K, capacity: usize) -> &'arena User<'arena, K> {
        self.stats.borrow_mut().users_created += 1;
        User::new(self.arena, kind, capacity)
    }

    /// Append `target` to `user`'s operands.
    pub fn link<K>(&self, user: &'arena User<'arena, K>, target: &'arena User<'arena, K>) {
        user.push_operand(Some(target));
        self.stats.borrow_mut().operands_linked += 1;
        trace!("Linked operand #{} of {:p}", user.operand_count(), user);
    }

    /// An empty sequence allocating from the session arena.
    pub fn sequence<T: Copy>(&self) -> Sequence<'arena, T> {
        Sequence::new(self.arena)
    }

    /// A new top-level print scope.
    pub fn root_scope(&self) -> &'arena PrintableScope<'arena> {
        self.stats.borrow_mut().scopes_created += 1;
        PrintableScope::new(self.arena, None)
    }

    /// Get session statistics.
    pub fn stats(&self) -> SessionStats {
        let mut stats = self.stats.borrow().clone();
        stats.arena = self.arena.stats();
        stats
    }
}
