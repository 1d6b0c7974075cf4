// This module implements the paged bump arena that is the only memory source for the
// operand graph, the segmented sequence and the printable tree. Memory comes in pages:
// small pages of a configured capacity serve every request below half a page, and each
// larger request gets a dedicated block allocated with exactly its layout. A small page is
// carved out of a single bumpalo chunk whose allocation limit is pinned so it never grows.
// bumpalo rounds chunk sizes up, so the page keeps its own budget of `page_size` bytes,
// measured from the chunk's remaining capacity, and refuses requests that would exceed it.
// bumpalo bumps downwards from the top of the chunk and aligns by rounding the cursor down,
// which is the cursor policy the representation relies on. Objects are never freed
// individually; every page is released at once when the arena is cleared or dropped. Only
// types that do not need drop may be placed in the arena, checked at compile time.

//! Paged bump arena.
//!
//! Every allocation returns a reference whose lifetime is tied to the arena
//! borrow, and whose address never changes until the arena is cleared or
//! dropped. Clearing takes `&mut self`, so the borrow checker rejects any
//! attempt to keep an arena reference across a clear.
//!
//! Values that need drop cannot be allocated:
//!
//! ```compile_fail
//! use pooled_ast::Arena;
//!
//! let arena = Arena::new();
//! let _ = arena.allocate(String::from("owned"));
//! ```

use super::error::{ArenaError, ArenaResult};
use bumpalo::Bump;
use log::{debug, trace, warn};
use std::alloc::{self, handle_alloc_error, Layout};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::ops::Range;
use std::ptr::NonNull;
use std::slice;
use std::str::Utf8Error;

/// Default capacity of a small page.
pub const DEFAULT_PAGE_SIZE: usize = 0x4000 - 0x20;

/// Smallest page capacity accepted by [`ArenaConfig::with_page_size`].
pub const MIN_PAGE_SIZE: usize = 64;

/// Arena tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaConfig {
    page_size: usize,
}

impl ArenaConfig {
    /// Configuration with a custom small-page capacity.
    pub fn with_page_size(page_size: usize) -> ArenaResult<Self> {
        if page_size < MIN_PAGE_SIZE {
            return Err(ArenaError::InvalidPageSize {
                page_size,
                minimum: MIN_PAGE_SIZE,
            });
        }
        Ok(Self { page_size })
    }

    /// Capacity of a small page in bytes.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Requests of at least this many bytes get a dedicated page.
    pub fn large_object_threshold(&self) -> usize {
        self.page_size / 2
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Kind of a page owned by the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Fixed-capacity page shared by many small objects.
    Small,
    /// Page holding a single oversized object.
    Large,
}

/// A page of `capacity` bytes carved out of a single bumpalo chunk.
///
/// bumpalo rounds chunk sizes up to its own size classes, so the chunk is
/// usually larger than the page. `capacity` is the budget actually handed
/// out: consumption is measured from the chunk's remaining capacity, which
/// includes alignment padding.
struct SmallPage {
    bump: Bump,
    capacity: usize,
    opened_with: usize,
    /// Lowest allocated address so far; bumpalo bumps down to it.
    cursor: Cell<Option<NonNull<u8>>>,
}

impl SmallPage {
    fn open(capacity: usize) -> Option<Self> {
        let bump = Bump::try_with_capacity(capacity).ok()?;
        // No second chunk: a full page must fail so the arena moves on.
        bump.set_allocation_limit(Some(bump.allocated_bytes()));
        let opened_with = bump.chunk_capacity();
        Some(Self {
            bump,
            capacity,
            opened_with,
            cursor: Cell::new(None),
        })
    }

    /// Bytes consumed so far, padding included.
    fn used(&self) -> usize {
        self.opened_with - self.bump.chunk_capacity()
    }

    fn try_alloc(&self, layout: Layout) -> Option<NonNull<u8>> {
        let needed = match self.cursor.get() {
            Some(cursor) => {
                let cursor = cursor.as_ptr() as usize;
                let start = cursor.checked_sub(layout.size())? & !(layout.align() - 1);
                cursor - start
            }
            // Nothing allocated yet: assume the worst padding for the chunk top.
            None => layout.size() + layout.align() - 1,
        };
        if self.used() + needed > self.capacity {
            return None;
        }

        let ptr = self.bump.try_alloc_layout(layout).ok()?;
        self.cursor.set(Some(ptr));
        Some(ptr)
    }
}

/// A block sized exactly to one oversized request.
struct LargeBlock {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl LargeBlock {
    fn new(layout: Layout) -> Option<Self> {
        let layout = Layout::from_size_align(layout.size().max(1), layout.align()).ok()?;
        // SAFETY: `layout` has a non-zero size.
        let ptr = NonNull::new(unsafe { alloc::alloc(layout) })?;
        Some(Self { ptr, layout })
    }
}

impl Drop for LargeBlock {
    fn drop(&mut self) {
        // SAFETY: `ptr` came from `alloc::alloc` with this exact layout and
        // is released only here.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

enum Page {
    Small(SmallPage),
    Large(LargeBlock),
}

impl Page {
    fn kind(&self) -> PageKind {
        match self {
            Page::Small(_) => PageKind::Small,
            Page::Large(_) => PageKind::Large,
        }
    }

    /// Usable capacity of the page.
    fn reserved(&self) -> usize {
        match self {
            Page::Small(page) => page.capacity,
            Page::Large(block) => block.layout.size(),
        }
    }

    /// Bytes obtained from the system allocator for this page.
    fn system_bytes(&self) -> usize {
        match self {
            Page::Small(page) => page.bump.allocated_bytes(),
            Page::Large(block) => block.layout.size(),
        }
    }
}

/// Allocation statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Number of small pages.
    pub small_pages: usize,

    /// Number of dedicated large pages.
    pub large_pages: usize,

    /// Number of successful allocations.
    pub allocations: usize,

    /// Bytes requested by callers, excluding alignment padding.
    pub bytes_requested: usize,

    /// Page capacity owned by the arena: `page_size` per small page plus
    /// the exact size of each large page.
    pub bytes_reserved: usize,

    /// Bytes obtained from the system allocator, including bumpalo's
    /// rounding of small-page chunks.
    pub system_bytes: usize,
}

impl fmt::Display for ArenaStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Arena Statistics:")?;
        writeln!(f, "  Small pages: {}", self.small_pages)?;
        writeln!(f, "  Large pages: {}", self.large_pages)?;
        writeln!(f, "  Allocations: {}", self.allocations)?;
        writeln!(f, "  Bytes requested: {}", self.bytes_requested)?;
        writeln!(f, "  Bytes reserved: {}", self.bytes_reserved)?;
        writeln!(f, "  System bytes: {}", self.system_bytes)
    }
}

/// Paged bump allocator.
///
/// The arena is single-threaded: it hands out memory through `&self` using
/// interior mutability and is therefore neither `Sync` nor meant to be
/// shared.
pub struct Arena {
    config: ArenaConfig,

    /// Small pages are appended, so the back is the current small page.
    /// Large pages are pushed to the front and never disturb it.
    pages: RefCell<VecDeque<Page>>,

    allocations: Cell<usize>,
    bytes_requested: Cell<usize>,
}

impl Arena {
    /// Create an empty arena with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ArenaConfig::default())
    }

    /// Create an empty arena. No page is reserved until the first allocation.
    pub fn with_config(config: ArenaConfig) -> Self {
        Self {
            config,
            pages: RefCell::new(VecDeque::new()),
            allocations: Cell::new(0),
            bytes_requested: Cell::new(0),
        }
    }

    /// The configuration this arena was created with.
    pub fn config(&self) -> ArenaConfig {
        self.config
    }

    /// Move `value` into the arena.
    ///
    /// Running out of memory is fatal.
    pub fn allocate<T>(&self, value: T) -> &mut T {
        const { assert!(!mem::needs_drop::<T>(), "arena values must not need drop") };

        let ptr = self.allocate_layout(Layout::new::<T>()).cast::<T>();
        // SAFETY: `ptr` is a fresh, exclusive, properly aligned block of
        // `size_of::<T>()` bytes that lives until the pages are released,
        // which requires `&mut self`.
        unsafe {
            ptr.as_ptr().write(value);
            &mut *ptr.as_ptr()
        }
    }

    /// Allocate `count` default-initialized elements aligned to at least
    /// `alignment` bytes.
    pub fn allocate_dynamic<T: Default>(
        &self,
        count: usize,
        alignment: usize,
    ) -> ArenaResult<&mut [T]> {
        self.allocate_dynamic_with(count, alignment, |_| T::default())
    }

    /// Allocate `count` elements, initializing element `i` with `fill(i)`.
    ///
    /// The effective alignment is the larger of `alignment` and the natural
    /// alignment of `T`. Fails when the total size overflows or when
    /// `alignment` is not a power of two.
    pub fn allocate_dynamic_with<T, F>(
        &self,
        count: usize,
        alignment: usize,
        mut fill: F,
    ) -> ArenaResult<&mut [T]>
    where
        F: FnMut(usize) -> T,
    {
        const { assert!(!mem::needs_drop::<T>(), "arena values must not need drop") };

        let layout = Self::array_layout::<T>(count, alignment)?;
        let ptr = self.allocate_layout(layout).cast::<T>();
        for index in 0..count {
            // SAFETY: `index < count` and the block holds `count` elements.
            unsafe { ptr.as_ptr().add(index).write(fill(index)) };
        }
        // SAFETY: all `count` elements were initialized above and the block
        // is exclusively ours.
        Ok(unsafe { slice::from_raw_parts_mut(ptr.as_ptr(), count) })
    }

    /// Copy a slice into the arena.
    pub fn allocate_slice_copy<T: Copy>(&self, values: &[T]) -> &mut [T] {
        match self.allocate_dynamic_with(values.len(), mem::align_of::<T>(), |i| values[i]) {
            Ok(copy) => copy,
            // An existing slice always has a representable layout.
            Err(err) => panic!("cannot copy slice into arena: {err}"),
        }
    }

    /// Copy `source[range]` into a terminator-suffixed arena buffer.
    pub fn copy_string(&self, source: &[u8], range: Range<usize>) -> ArenaResult<ArenaStr<'_>> {
        if range.start > range.end {
            return Err(ArenaError::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }
        if range.end > source.len() {
            return Err(ArenaError::OutOfBounds {
                end: range.end,
                len: source.len(),
            });
        }

        let bytes = &source[range];
        let copy = self.allocate_dynamic_with(bytes.len() + 1, 1, |i| {
            bytes.get(i).copied().unwrap_or(0)
        })?;
        Ok(ArenaStr { bytes_with_nul: copy })
    }

    /// Copy a whole string into the arena.
    pub fn copy_str(&self, text: &str) -> ArenaStr<'_> {
        match self.copy_string(text.as_bytes(), 0..text.len()) {
            Ok(copy) => copy,
            Err(err) => panic!("cannot copy string into arena: {err}"),
        }
    }

    /// Release every page. All previously returned references are gone by
    /// the time this can be called.
    pub fn clear(&mut self) {
        let pages = self.pages.get_mut();
        debug!(
            "Clearing arena: {} pages, {} allocations",
            pages.len(),
            self.allocations.get()
        );
        pages.clear();
        self.allocations.set(0);
        self.bytes_requested.set(0);
    }

    /// Number of pages currently owned.
    pub fn page_count(&self) -> usize {
        self.pages.borrow().len()
    }

    /// Number of small pages currently owned.
    pub fn small_page_count(&self) -> usize {
        self.count_pages(PageKind::Small)
    }

    /// Number of dedicated large pages currently owned.
    pub fn large_page_count(&self) -> usize {
        self.count_pages(PageKind::Large)
    }

    /// Page kinds in page-collection order.
    pub fn page_kinds(&self) -> Vec<PageKind> {
        self.pages.borrow().iter().map(Page::kind).collect()
    }

    /// Current allocation statistics.
    pub fn stats(&self) -> ArenaStats {
        let pages = self.pages.borrow();
        ArenaStats {
            small_pages: pages.iter().filter(|p| p.kind() == PageKind::Small).count(),
            large_pages: pages.iter().filter(|p| p.kind() == PageKind::Large).count(),
            allocations: self.allocations.get(),
            bytes_requested: self.bytes_requested.get(),
            bytes_reserved: pages.iter().map(Page::reserved).sum(),
            system_bytes: pages.iter().map(Page::system_bytes).sum(),
        }
    }

    fn count_pages(&self, kind: PageKind) -> usize {
        self.pages.borrow().iter().filter(|page| page.kind() == kind).count()
    }

    fn array_layout<T>(count: usize, alignment: usize) -> ArenaResult<Layout> {
        if !alignment.is_power_of_two() {
            return Err(ArenaError::InvalidAlignment { alignment });
        }

        let element_size = mem::size_of::<T>();
        let overflow = || {
            warn!("Rejected arena request: {} x {} bytes overflows", count, element_size);
            ArenaError::SizeOverflow { count, element_size }
        };
        let size = count.checked_mul(element_size).ok_or_else(overflow)?;
        Layout::from_size_align(size, alignment.max(mem::align_of::<T>())).map_err(|_| overflow())
    }

    fn allocate_layout(&self, layout: Layout) -> NonNull<u8> {
        let threshold = self.config.large_object_threshold();
        let ptr = if layout.size() < threshold && layout.align() <= threshold {
            self.allocate_small(layout)
        } else {
            self.allocate_large(layout)
        };

        match ptr {
            Some(ptr) => {
                self.allocations.set(self.allocations.get() + 1);
                self.bytes_requested.set(self.bytes_requested.get() + layout.size());
                ptr
            }
            None => handle_alloc_error(layout),
        }
    }

    fn allocate_small(&self, layout: Layout) -> Option<NonNull<u8>> {
        let mut pages = self.pages.borrow_mut();
        if let Some(Page::Small(page)) = pages.back() {
            if let Some(ptr) = page.try_alloc(layout) {
                return Some(ptr);
            }
        }

        let page = SmallPage::open(self.config.page_size)?;
        let ptr = page.try_alloc(layout)?;
        pages.push_back(Page::Small(page));
        trace!(
            "Opened small page #{} ({} bytes) for a {}-byte request",
            pages.len(),
            self.config.page_size,
            layout.size()
        );
        Some(ptr)
    }

    fn allocate_large(&self, layout: Layout) -> Option<NonNull<u8>> {
        let block = LargeBlock::new(layout)?;
        let ptr = block.ptr;
        debug!(
            "Opened large page for {} bytes aligned to {}",
            layout.size(),
            layout.align()
        );
        self.pages.borrow_mut().push_front(Page::Large(block));
        Some(ptr)
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Immutable byte string owned by an arena, stored with a trailing `0`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArenaStr<'a> {
    bytes_with_nul: &'a [u8],
}

impl<'a> ArenaStr<'a> {
    /// The copied bytes, without the terminator.
    pub fn as_bytes(&self) -> &'a [u8] {
        let bytes: &'a [u8] = self.bytes_with_nul;
        &bytes[..bytes.len() - 1]
    }

    /// The copied bytes including the terminator.
    pub fn as_bytes_with_nul(&self) -> &'a [u8] {
        self.bytes_with_nul
    }

    /// The copied bytes as UTF-8.
    pub fn to_str(&self) -> Result<&'a str, Utf8Error> {
        std::str::from_utf8(self.as_bytes())
    }

    /// Start address of the copy.
    pub fn as_ptr(&self) -> *const u8 {
        self.bytes_with_nul.as_ptr()
    }

    /// Length without the terminator.
    pub fn len(&self) -> usize {
        self.bytes_with_nul.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for ArenaStr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Debug for ArenaStr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(self.as_bytes()))
    }
}
