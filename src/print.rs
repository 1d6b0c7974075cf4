//! Printable item tree.
//!
//! Statements are rendered into a tree of lines and brace-delimited scopes
//! before being written out. Every node lives in the arena, text is copied
//! into arena strings, and each scope keeps its children in two
//! [`Sequence`]s: items prepended ahead of the body, and the body itself.
//!
//! Rendering rules: a line prints as `indent` tabs, its text and a newline.
//! A scope prints `prefix {`, its prepended items and body one level deeper,
//! then `}` followed by ` suffix` when a suffix is set.

use crate::core::{Arena, ArenaStr};
use crate::sequence::{Iter, Sequence};
use std::cell::Cell;
use std::fmt::{self, Write};

/// Reference to either kind of printable node.
#[derive(Clone, Copy)]
pub enum PrintableItem<'a> {
    Line(&'a PrintableLine<'a>),
    Scope(&'a PrintableScope<'a>),
}

impl<'a> PrintableItem<'a> {
    /// The scope this item was created in.
    pub fn parent(&self) -> Option<&'a PrintableScope<'a>> {
        match self {
            PrintableItem::Line(line) => line.parent,
            PrintableItem::Scope(scope) => scope.parent,
        }
    }

    pub fn as_line(&self) -> Option<&'a PrintableLine<'a>> {
        match self {
            PrintableItem::Line(line) => Some(line),
            PrintableItem::Scope(_) => None,
        }
    }

    pub fn as_scope(&self) -> Option<&'a PrintableScope<'a>> {
        match self {
            PrintableItem::Scope(scope) => Some(scope),
            PrintableItem::Line(_) => None,
        }
    }

    /// Render this item at `indent` tabs.
    pub fn print<W: Write + ?Sized>(&self, out: &mut W, indent: usize) -> fmt::Result {
        match self {
            PrintableItem::Line(line) => line.print(out, indent),
            PrintableItem::Scope(scope) => scope.print(out, indent),
        }
    }
}

impl fmt::Debug for PrintableItem<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrintableItem::Line(line) => write!(f, "Line({:?})", line.line()),
            PrintableItem::Scope(scope) => write!(f, "Scope({} items)", scope.items.len()),
        }
    }
}

impl fmt::Display for PrintableItem<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print(f, 0)
    }
}

/// One line of output text.
pub struct PrintableLine<'a> {
    arena: &'a Arena,
    parent: Option<&'a PrintableScope<'a>>,
    line: Cell<ArenaStr<'a>>,
}

impl<'a> PrintableLine<'a> {
    pub fn new(arena: &'a Arena, parent: Option<&'a PrintableScope<'a>>, line: &str) -> &'a Self {
        arena.allocate(Self {
            arena,
            parent,
            line: Cell::new(arena.copy_str(line)),
        })
    }

    pub fn line(&self) -> ArenaStr<'a> {
        self.line.get()
    }

    /// Replace the text with a fresh arena copy of `line`.
    pub fn set_line(&self, line: &str) {
        self.line.set(self.arena.copy_str(line));
    }

    pub fn print<W: Write + ?Sized>(&self, out: &mut W, indent: usize) -> fmt::Result {
        write_indent(out, indent)?;
        writeln!(out, "{}", self.line())
    }
}

/// A brace-delimited group of items with optional prefix and suffix text.
pub struct PrintableScope<'a> {
    arena: &'a Arena,
    parent: Option<&'a PrintableScope<'a>>,
    prefix: Cell<Option<ArenaStr<'a>>>,
    suffix: Cell<Option<ArenaStr<'a>>>,
    prepended: Sequence<'a, PrintableItem<'a>>,
    items: Sequence<'a, PrintableItem<'a>>,
}

impl<'a> PrintableScope<'a> {
    pub fn new(arena: &'a Arena, parent: Option<&'a PrintableScope<'a>>) -> &'a Self {
        arena.allocate(Self {
            arena,
            parent,
            prefix: Cell::new(None),
            suffix: Cell::new(None),
            prepended: Sequence::new(arena),
            items: Sequence::new(arena),
        })
    }

    pub fn parent(&self) -> Option<&'a PrintableScope<'a>> {
        self.parent
    }

    pub fn prefix(&self) -> Option<ArenaStr<'a>> {
        self.prefix.get()
    }

    pub fn suffix(&self) -> Option<ArenaStr<'a>> {
        self.suffix.get()
    }

    pub fn set_prefix(&self, prefix: &str) {
        self.prefix.set(Some(self.arena.copy_str(prefix)));
    }

    pub fn set_suffix(&self, suffix: &str) {
        self.suffix.set(Some(self.arena.copy_str(suffix)));
    }

    /// Add a line ahead of every item added so far, including earlier
    /// prepended lines.
    pub fn prepend_line(&'a self, line: &str) -> PrintableItem<'a> {
        let item = PrintableItem::Line(PrintableLine::new(self.arena, Some(self), line));
        self.prepended.insert(0, item);
        item
    }

    /// Add a line at the end of the body.
    pub fn append_line(&'a self, line: &str) -> PrintableItem<'a> {
        self.append_item(PrintableItem::Line(PrintableLine::new(self.arena, Some(self), line)))
    }

    /// Add an existing item at the end of the body.
    pub fn append_item(&self, item: PrintableItem<'a>) -> PrintableItem<'a> {
        self.items.push_back(item);
        item
    }

    /// Open a nested scope at the end of the body.
    pub fn append_scope(&'a self) -> &'a PrintableScope<'a> {
        let scope = PrintableScope::new(self.arena, Some(self));
        self.append_item(PrintableItem::Scope(scope));
        scope
    }

    /// Body items in order.
    pub fn items(&self) -> Iter<'a, PrintableItem<'a>> {
        self.items.iter()
    }

    /// Prepended items in print order.
    pub fn prepended_items(&self) -> Iter<'a, PrintableItem<'a>> {
        self.prepended.iter()
    }

    /// Last body item, if any.
    pub fn last_item(&self) -> Option<PrintableItem<'a>> {
        self.items.back_or_null()
    }

    pub fn is_empty(&self) -> bool {
        self.prepended.is_empty() && self.items.is_empty()
    }

    /// Render the scope with its braces.
    pub fn print<W: Write + ?Sized>(&self, out: &mut W, indent: usize) -> fmt::Result {
        write_indent(out, indent)?;
        if let Some(prefix) = self.prefix() {
            write!(out, "{} ", prefix)?;
        }
        writeln!(out, "{{")?;
        self.print_children(out, indent + 1)?;
        write_indent(out, indent)?;
        write!(out, "}}")?;
        if let Some(suffix) = self.suffix() {
            write!(out, " {}", suffix)?;
        }
        writeln!(out)
    }

    /// Render only the children, as done for a top-level scope.
    pub fn print_root<W: Write + ?Sized>(&self, out: &mut W, indent: usize) -> fmt::Result {
        self.print_children(out, indent)
    }

    /// Render the children into a new string.
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.print_root(&mut out, 0);
        out
    }

    fn print_children<W: Write + ?Sized>(&self, out: &mut W, indent: usize) -> fmt::Result {
        for item in self.prepended.iter().chain(self.items.iter()) {
            item.print(out, indent)?;
        }
        Ok(())
    }
}

fn write_indent<W: Write + ?Sized>(out: &mut W, indent: usize) -> fmt::Result {
    for _ in 0..indent {
        out.write_char('\t')?;
    }
    Ok(())
}
