// This module implements the segmented sequence, the ordered container used by the printable
// tree and other small ordered collections. Elements live in arena buffers chained in insertion
// order; appending never reallocates, it links a new buffer whose capacity is the sum of the
// last two buffer capacities. Insertion ripples a carried value through the following slots and
// appends whatever falls off the end, so no bulk move ever crosses a buffer boundary. Erasing
// closes the gap inside the owning buffer; a buffer emptied this way is relinked at the tail of
// the chain and reused by later appends, since the arena cannot take it back. An empty sequence
// owns no buffer at all. Indexed access walks the chain and costs O(buffers + offset).

//! Segmented growable sequence backed by the arena.
//!
//! All operations take `&self`: the buffer links and counts use interior
//! mutability, which lets a sequence live inside arena-allocated nodes that
//! are only reachable through shared references.

use crate::core::Arena;
use std::cell::Cell;
use std::fmt;
use std::mem;

/// Capacity of the first buffer, and the stand-in for a missing predecessor.
const INITIAL_CAPACITY: usize = 5;

struct Buffer<'a, T> {
    slots: &'a [Cell<T>],
    used: Cell<usize>,
    prev: Cell<Option<&'a Buffer<'a, T>>>,
    next: Cell<Option<&'a Buffer<'a, T>>>,
}

impl<T> Buffer<'_, T> {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn has_room(&self) -> bool {
        self.used.get() < self.slots.len()
    }
}

/// Ordered container whose elements never move between buffers.
pub struct Sequence<'a, T> {
    arena: &'a Arena,
    first: Cell<Option<&'a Buffer<'a, T>>>,
    last: Cell<Option<&'a Buffer<'a, T>>>,
}

impl<'a, T: Copy> Sequence<'a, T> {
    /// An empty sequence. No memory is taken from the arena until the first
    /// push.
    pub fn new(arena: &'a Arena) -> Self {
        Self {
            arena,
            first: Cell::new(None),
            last: Cell::new(None),
        }
    }

    /// Append `value`.
    pub fn push_back(&self, value: T) {
        let buffer = self.tail_with_room(value);
        let used = buffer.used.get();
        buffer.slots[used].set(value);
        buffer.used.set(used + 1);
    }

    /// Append every value of `values` in order.
    pub fn extend_from<I: IntoIterator<Item = T>>(&self, values: I) {
        for value in values {
            self.push_back(value);
        }
    }

    /// Insert `value` so that it ends up at `position`.
    ///
    /// # Panics
    ///
    /// Panics if `position > len()`.
    pub fn insert(&self, position: usize, value: T) {
        let len = self.len();
        assert!(
            position <= len,
            "insert position {} out of range (len {})",
            position,
            len
        );

        let mut displaced = value;
        if let Some((mut buffer, mut offset)) = self.seek(position) {
            loop {
                while offset < buffer.used.get() {
                    displaced = buffer.slots[offset].replace(displaced);
                    offset += 1;
                }
                match buffer.next.get() {
                    Some(next) => {
                        buffer = next;
                        offset = 0;
                    }
                    None => break,
                }
            }
        }
        self.push_back(displaced);
    }

    /// Remove the element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn erase_at(&self, index: usize) {
        debug_assert!(
            index < self.len(),
            "erase index {} out of range (len {})",
            index,
            self.len()
        );
        let Some((buffer, offset)) = self.seek(index) else {
            panic!("erase index {} out of range (len {})", index, self.len());
        };

        let used = buffer.used.get() - 1;
        for slot in offset..used {
            buffer.slots[slot].set(buffer.slots[slot + 1].get());
        }
        buffer.used.set(used);

        if used == 0 {
            self.recycle(buffer);
        }
    }

    /// First element.
    pub fn front(&self) -> Option<T> {
        self.iter().next()
    }

    /// Last element, skipping empty buffers at the tail.
    pub fn back(&self) -> Option<T> {
        let mut buffer = self.last.get();
        while let Some(current) = buffer {
            let used = current.used.get();
            if used > 0 {
                return Some(current.slots[used - 1].get());
            }
            buffer = current.prev.get();
        }
        None
    }

    /// Same as [`back`](Self::back); `None` signals an empty sequence.
    pub fn back_or_null(&self) -> Option<T> {
        self.back()
    }

    /// Element at `index`, found by walking the buffer chain.
    pub fn get(&self, index: usize) -> Option<T> {
        self.seek(index)
            .map(|(buffer, offset)| buffer.slots[offset].get())
    }

    /// Element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn at(&self, index: usize) -> T {
        debug_assert!(index < self.len(), "index {} out of range (len {})", index, self.len());
        match self.get(index) {
            Some(value) => value,
            None => panic!("index {} out of range (len {})", index, self.len()),
        }
    }

    /// Overwrite the element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn set(&self, index: usize, value: T) {
        debug_assert!(index < self.len(), "index {} out of range (len {})", index, self.len());
        match self.seek(index) {
            Some((buffer, offset)) => buffer.slots[offset].set(value),
            None => panic!("index {} out of range (len {})", index, self.len()),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.buffers().map(|buffer| buffer.used.get()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers().all(|buffer| buffer.used.get() == 0)
    }

    /// Forget every element. Buffers already taken from the arena stay
    /// there until the arena is released.
    pub fn clear(&self) {
        self.first.set(None);
        self.last.set(None);
    }

    /// Number of buffers in the chain, recycled ones included.
    pub fn buffer_count(&self) -> usize {
        self.buffers().count()
    }

    /// Total slots across the chain.
    pub fn capacity(&self) -> usize {
        self.buffers().map(Buffer::capacity).sum()
    }

    /// Iterate over the elements in order.
    pub fn iter(&self) -> Iter<'a, T> {
        Iter {
            buffer: self.first.get(),
            index: 0,
        }
    }

    fn buffers(&self) -> impl Iterator<Item = &'a Buffer<'a, T>> {
        std::iter::successors(self.first.get(), |buffer| buffer.next.get())
    }

    fn seek(&self, index: usize) -> Option<(&'a Buffer<'a, T>, usize)> {
        let mut remaining = index;
        for buffer in self.buffers() {
            let used = buffer.used.get();
            if remaining < used {
                return Some((buffer, remaining));
            }
            remaining -= used;
        }
        None
    }

    /// The tail buffer, after linking a new one if the tail is full.
    /// `seed` fills the slots of a fresh buffer.
    fn tail_with_room(&self, seed: T) -> &'a Buffer<'a, T> {
        let last = self.last.get();
        if let Some(tail) = last.filter(|tail| tail.has_room()) {
            return tail;
        }

        let capacity = match last {
            Some(tail) => {
                tail.capacity() + tail.prev.get().map_or(INITIAL_CAPACITY, Buffer::capacity)
            }
            None => INITIAL_CAPACITY,
        };
        let slots = match self.arena.allocate_dynamic_with(
            capacity,
            mem::align_of::<Cell<T>>(),
            |_| Cell::new(seed),
        ) {
            Ok(slots) => slots,
            Err(err) => panic!("cannot allocate sequence buffer of {} slots: {}", capacity, err),
        };

        let buffer: &'a Buffer<'a, T> = self.arena.allocate(Buffer {
            slots,
            used: Cell::new(0),
            prev: Cell::new(last),
            next: Cell::new(None),
        });
        match last {
            Some(tail) => tail.next.set(Some(buffer)),
            None => self.first.set(Some(buffer)),
        }
        self.last.set(Some(buffer));
        buffer
    }

    /// Move an emptied buffer to the tail so later pushes reuse it.
    fn recycle(&self, buffer: &'a Buffer<'a, T>) {
        let Some(next) = buffer.next.get() else {
            return;
        };

        next.prev.set(buffer.prev.get());
        match buffer.prev.get() {
            Some(prev) => prev.next.set(Some(next)),
            None => self.first.set(Some(next)),
        }

        if let Some(tail) = self.last.get() {
            tail.next.set(Some(buffer));
        }
        buffer.prev.set(self.last.get());
        buffer.next.set(None);
        self.last.set(Some(buffer));
    }
}

impl<T: Copy> Extend<T> for Sequence<'_, T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.extend_from(iter);
    }
}

impl<'a, T: Copy> IntoIterator for &Sequence<'a, T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for Sequence<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Forward iterator over a [`Sequence`]; skips empty buffers.
pub struct Iter<'a, T> {
    buffer: Option<&'a Buffer<'a, T>>,
    index: usize,
}

impl<T: Copy> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            let buffer = self.buffer?;
            if self.index < buffer.used.get() {
                let value = buffer.slots[self.index].get();
                self.index += 1;
                return Some(value);
            }
            self.buffer = buffer.next.get();
            self.index = 0;
        }
    }
}
