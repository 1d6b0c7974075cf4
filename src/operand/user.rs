//! Graph nodes and their segmented operand lists.
//!
//! A [`User`] owns an ordered list of operand slots ([`Use`]). The list is a
//! chain of segments: the user's own header describes the current segment,
//! and each older segment is described by a frozen segment descriptor
//! allocated in the arena when the list outgrew it. Growth never moves a
//! slot, so a `&Use` handed out once stays valid for the arena's lifetime.
//!
//! # Index convention
//!
//! Operands are indexed newest-first: index 0 is the most recently appended
//! operand and index `operand_count() - 1` is the first one ever appended.
//! Segments are visited newest-first; inside a segment the slots are filled
//! from slot 0 upwards and relative index `r` lives in slot `used - r - 1`.

use crate::core::Arena;
use log::trace;
use std::cell::Cell;
use std::fmt;
use std::mem;

/// One operand slot. Empty until something points it at a node.
pub struct Use<'a, K> {
    target: Cell<Option<&'a User<'a, K>>>,
}

impl<'a, K> Use<'a, K> {
    /// An empty slot.
    pub const fn empty() -> Self {
        Self {
            target: Cell::new(None),
        }
    }

    /// The node this slot points to.
    pub fn get(&self) -> Option<&'a User<'a, K>> {
        self.target.get()
    }

    /// Point this slot at `target`.
    pub fn set(&self, target: Option<&'a User<'a, K>>) {
        self.target.set(target);
    }

    pub fn is_empty(&self) -> bool {
        self.target.get().is_none()
    }
}

impl<K> fmt::Debug for Use<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(target) => write!(f, "Use(-> {:p})", target),
            None => write!(f, "Use(empty)"),
        }
    }
}

/// Descriptor of one contiguous run of operand slots.
///
/// `used` counts the active slots, which always occupy `slots[..used]`.
/// `older` links to the descriptor of the next-older segment.
pub(crate) struct Segment<'a, K> {
    slots: &'a [Use<'a, K>],
    used: usize,
    older: Option<&'a Segment<'a, K>>,
}

impl<K> Clone for Segment<'_, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Segment<'_, K> {}

impl<'a, K> Segment<'a, K> {
    fn allocated(&self) -> usize {
        self.slots.len()
    }

    fn is_full(&self) -> bool {
        self.used == self.slots.len()
    }
}

/// Capacity and active count of one segment, as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentInfo {
    pub allocated: usize,
    pub used: usize,
}

/// A graph node owning an operand list. `K` is the node payload.
pub struct User<'a, K> {
    arena: &'a Arena,
    kind: K,
    current: Cell<Segment<'a, K>>,
}

impl<'a, K> User<'a, K> {
    /// Allocate a node with room for `capacity` operands in its first
    /// segment. All slots start empty and are not counted as operands.
    pub fn new(arena: &'a Arena, kind: K, capacity: usize) -> &'a Self {
        let slots = allocate_slots(arena, capacity);
        arena.allocate(Self {
            arena,
            kind,
            current: Cell::new(Segment {
                slots,
                used: 0,
                older: None,
            }),
        })
    }

    /// Allocate a node whose operands are `operands`, appended in order.
    pub fn with_operands(arena: &'a Arena, kind: K, operands: &[&'a User<'a, K>]) -> &'a Self {
        let slots = allocate_slots(arena, operands.len());
        for (slot, operand) in slots.iter().zip(operands) {
            slot.set(Some(*operand));
        }
        arena.allocate(Self {
            arena,
            kind,
            current: Cell::new(Segment {
                slots,
                used: operands.len(),
                older: None,
            }),
        })
    }

    /// The node payload.
    pub fn kind(&self) -> &K {
        &self.kind
    }

    /// The arena this node and its segments live in.
    pub fn arena(&self) -> &'a Arena {
        self.arena
    }

    /// Total number of operands across every segment.
    pub fn operand_count(&self) -> usize {
        self.segment_chain().map(|segment| segment.used).sum()
    }

    /// Resolve `index` to its slot, or `None` when out of range.
    pub fn operand(&self, index: usize) -> Option<&'a Use<'a, K>> {
        let mut remaining = index;
        for segment in self.segment_chain() {
            if remaining < segment.used {
                return Some(&segment.slots[segment.used - remaining - 1]);
            }
            remaining -= segment.used;
        }
        None
    }

    /// Resolve `index` to its slot.
    ///
    /// Passing `index >= operand_count()` breaks the caller's contract and
    /// panics.
    pub fn operand_at(&self, index: usize) -> &'a Use<'a, K> {
        debug_assert!(
            index < self.operand_count(),
            "operand index {} out of range ({} operands)",
            index,
            self.operand_count()
        );
        match self.operand(index) {
            Some(slot) => slot,
            None => panic!(
                "operand index {} out of range ({} operands)",
                index,
                self.operand_count()
            ),
        }
    }

    /// The node operand `index` points to.
    pub fn operand_value(&self, index: usize) -> Option<&'a User<'a, K>> {
        self.operand(index).and_then(Use::get)
    }

    /// Repoint operand `index`.
    pub fn set_operand(&self, index: usize, target: Option<&'a User<'a, K>>) {
        self.operand_at(index).set(target);
    }

    /// Append one operand. It becomes operand 0.
    pub fn push_operand(&self, target: Option<&'a User<'a, K>>) -> &'a Use<'a, K> {
        let mut current = self.current.get();
        if current.is_full() {
            current = self.grow(1);
        }

        let slot = &current.slots[current.used];
        slot.set(target);
        current.used += 1;
        self.current.set(current);
        slot
    }

    /// Append operands in order; the last one becomes operand 0.
    ///
    /// Free slots in the current segment are filled first, and at most one
    /// new segment is allocated for the overflow.
    pub fn push_operands(&self, targets: &[Option<&'a User<'a, K>>]) {
        let mut remaining = targets;
        while !remaining.is_empty() {
            let mut current = self.current.get();
            if current.is_full() {
                current = self.grow(remaining.len());
            }

            let take = (current.allocated() - current.used).min(remaining.len());
            let free = &current.slots[current.used..current.used + take];
            for (slot, target) in free.iter().zip(&remaining[..take]) {
                slot.set(*target);
            }
            current.used += take;
            self.current.set(current);
            remaining = &remaining[take..];
        }
    }

    /// Operand slots, newest first (operand 0 first).
    pub fn operands(&self) -> Operands<'a, K> {
        let current = self.current.get();
        Operands {
            segment: Some(current),
            remaining: current.used,
        }
    }

    /// Segment capacities and active counts, newest first.
    pub fn segments(&self) -> Segments<'a, K> {
        Segments {
            chain: self.segment_chain(),
        }
    }

    fn segment_chain(&self) -> SegmentChain<'a, K> {
        SegmentChain {
            next: Some(self.current.get()),
        }
    }

    /// Freeze the current header into a descriptor and start a new segment
    /// large enough for `overflow` more operands.
    fn grow(&self, overflow: usize) -> Segment<'a, K> {
        let previous = self.current.get();
        let older = if previous.allocated() == 0 {
            previous.older
        } else {
            let header: &'a Segment<'a, K> = self.arena.allocate(previous);
            Some(header)
        };

        let capacity = overflow.max(self.operand_count()).max(1);
        trace!(
            "Growing operand list of {} operands: new segment of {} slots",
            self.operand_count(),
            capacity
        );

        let segment = Segment {
            slots: allocate_slots(self.arena, capacity),
            used: 0,
            older,
        };
        self.current.set(segment);
        segment
    }
}

impl<K: fmt::Debug> fmt::Debug for User<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("kind", &self.kind)
            .field("operands", &self.operand_count())
            .finish()
    }
}

fn allocate_slots<'a, K>(arena: &'a Arena, capacity: usize) -> &'a [Use<'a, K>] {
    match arena.allocate_dynamic_with(capacity, mem::align_of::<Use<'a, K>>(), |_| Use::empty()) {
        Ok(slots) => slots,
        Err(err) => panic!("cannot allocate operand segment of {} slots: {}", capacity, err),
    }
}

struct SegmentChain<'a, K> {
    next: Option<Segment<'a, K>>,
}

impl<'a, K> Iterator for SegmentChain<'a, K> {
    type Item = Segment<'a, K>;

    fn next(&mut self) -> Option<Self::Item> {
        let segment = self.next?;
        self.next = segment.older.copied();
        Some(segment)
    }
}

/// Iterator over a node's segment descriptors, newest first.
pub struct Segments<'a, K> {
    chain: SegmentChain<'a, K>,
}

impl<'a, K> Iterator for Segments<'a, K> {
    type Item = SegmentInfo;

    fn next(&mut self) -> Option<Self::Item> {
        self.chain.next().map(|segment| SegmentInfo {
            allocated: segment.allocated(),
            used: segment.used,
        })
    }
}

/// Iterator over a node's operand slots, newest first.
pub struct Operands<'a, K> {
    segment: Option<Segment<'a, K>>,
    remaining: usize,
}

impl<'a, K> Iterator for Operands<'a, K> {
    type Item = &'a Use<'a, K>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let segment = self.segment?;
            if self.remaining > 0 {
                self.remaining -= 1;
                return Some(&segment.slots[self.remaining]);
            }
            self.segment = segment.older.copied();
            self.remaining = self.segment.map_or(0, |older| older.used);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ArenaConfig;
    use std::ptr;

    fn leaf<'a>(arena: &'a Arena, name: &'static str) -> &'a User<'a, &'static str> {
        User::new(arena, name, 0)
    }

    fn names<'a>(user: &User<'a, &'static str>) -> Vec<&'static str> {
        user.operands()
            .map(|slot| *slot.get().map_or(&"<empty>", |target| target.kind()))
            .collect()
    }

    #[test]
    fn test_growth_keeps_old_slots() {
        let arena = Arena::new();
        let (x, y, z) = (leaf(&arena, "x"), leaf(&arena, "y"), leaf(&arena, "z"));

        let node = User::new(&arena, "add", 2);
        node.push_operand(Some(x));
        node.push_operand(Some(y));
        let before: Vec<*const Use<'_, _>> = (0..2).map(|i| node.operand_at(i) as *const _).collect();

        node.push_operand(Some(z));

        assert_eq!(node.operand_count(), 3);
        assert!(ptr::eq(node.operand_value(0).unwrap(), z));
        assert!(ptr::eq(node.operand_value(1).unwrap(), y));
        assert!(ptr::eq(node.operand_value(2).unwrap(), x));
        assert_eq!(node.operand_at(1) as *const _, before[0]);
        assert_eq!(node.operand_at(2) as *const _, before[1]);
        assert_eq!(
            node.segments().collect::<Vec<_>>(),
            vec![
                SegmentInfo { allocated: 2, used: 1 },
                SegmentInfo { allocated: 2, used: 2 },
            ]
        );
    }

    #[test]
    fn test_with_operands_order() {
        let arena = Arena::new();
        let (a, b, c) = (leaf(&arena, "a"), leaf(&arena, "b"), leaf(&arena, "c"));
        let call = User::with_operands(&arena, "call", &[a, b, c]);

        assert_eq!(call.operand_count(), 3);
        assert_eq!(names(call), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_empty_capacity_grows_on_first_push() {
        let arena = Arena::new();
        let node = leaf(&arena, "ret");
        assert_eq!(node.operand_count(), 0);
        assert!(node.operand(0).is_none());

        let v = leaf(&arena, "v");
        node.push_operand(Some(v));
        assert_eq!(node.operand_count(), 1);
        // The zero-capacity first segment is not kept in the chain.
        assert_eq!(node.segments().count(), 1);
    }

    #[test]
    fn test_push_operands_fills_then_grows_once() {
        let arena = Arena::new();
        let leaves: Vec<_> = ["a", "b", "c", "d", "e"].iter().map(|n| leaf(&arena, *n)).collect();
        let node = User::new(&arena, "phi", 2);
        node.push_operand(Some(leaves[0]));

        let rest: Vec<_> = leaves[1..].iter().map(|leaf| Some(*leaf)).collect();
        node.push_operands(&rest);

        assert_eq!(node.operand_count(), 5);
        assert_eq!(names(node), vec!["e", "d", "c", "b", "a"]);
        assert_eq!(
            node.segments().collect::<Vec<_>>(),
            vec![
                SegmentInfo { allocated: 3, used: 3 },
                SegmentInfo { allocated: 2, used: 2 },
            ]
        );
    }

    #[test]
    fn test_set_operand_and_empty_slots() {
        let arena = Arena::new();
        let (a, b) = (leaf(&arena, "a"), leaf(&arena, "b"));
        let node = User::new(&arena, "store", 2);
        node.push_operands(&[None, Some(a)]);

        assert!(node.operand_at(1).is_empty());
        node.set_operand(1, Some(b));
        assert!(ptr::eq(node.operand_value(1).unwrap(), b));
        node.set_operand(0, None);
        assert!(node.operand_value(0).is_none());
        assert_eq!(node.operand_count(), 2);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_operand_at_out_of_range() {
        let arena = Arena::new();
        let node = leaf(&arena, "nop");
        node.operand_at(0);
    }

    #[test]
    fn test_many_growths_index_consistency() {
        let arena = Arena::with_config(ArenaConfig::with_page_size(256).unwrap());
        let values: Vec<_> = (0..200).map(|i| User::new(&arena, i, 0)).collect();
        let node = User::new(&arena, -1, 1);

        let mut addresses = Vec::new();
        for value in &values {
            let slot = node.push_operand(Some(*value));
            addresses.push(slot as *const Use<'_, i32>);
        }

        let count = node.operand_count();
        assert_eq!(count, values.len());
        for (appended, address) in addresses.iter().enumerate() {
            let index = count - appended - 1;
            assert_eq!(node.operand_at(index) as *const _, *address);
            assert_eq!(*node.operand_value(index).unwrap().kind(), appended as i32);
        }
        assert_eq!(node.operands().count(), count);
    }
}
