//! Chunked marking of very large flat containers (spec.md §4.8).
//!
//! Spec.md's motivating example (sectors, polyobjects, sidedefs of a game
//! level) is a host concern this crate never names; what it generalizes to
//! is: *any* flat, indexable source of managed references too large to
//! scan in one `PropagateMark` call. The host implements [`BulkSource`]
//! over its own flat array and registers it once; the collector allocates
//! a small sentinel object that drains it in bounded chunks across however
//! many Propagate steps it takes, re-queuing itself between chunks exactly
//! like any other gray object.

use crate::collector::Collector;
use crate::flags::ColorFlags;
use crate::header::GcHeader;
use crate::ptr::Gc;
use crate::trace::{Trace, Tracer};
use std::cell::Cell;

/// A flat, host-owned collection of managed references, scanned in
/// bounded chunks rather than all at once.
pub trait BulkSource {
    /// Number of elements in the source, as of *now* — re-read every time
    /// the sentinel resumes, so a source that grows between cycles is
    /// handled correctly on the next `mark_roots` reset.
    fn len(&self) -> usize;

    /// Mark every managed reference held by elements `start..end`.
    fn mark_range(&self, start: usize, end: usize, tracer: &Tracer);

    /// Approximate bytes one element is "worth", for step-cost accounting
    /// (spec.md §4.8: "returns the bytes covered this invocation"). A
    /// reasonable default for an unknown element type.
    fn element_cost(&self) -> usize {
        64
    }
}

/// The sentinel object itself. Never constructed directly by host code —
/// see `Collector::register_bulk_source`.
pub(crate) struct BulkCursor {
    source: Box<dyn BulkSource>,
    chunk_size: usize,
    cursor: Cell<usize>,
    /// Filled in immediately after allocation so `trace` can re-queue its
    /// own header (spec.md §4.1 "Black → Gray").
    self_header: Cell<*mut GcHeader>,
}

impl BulkCursor {
    pub(crate) fn new(source: Box<dyn BulkSource>, chunk_size: usize) -> Self {
        Self {
            source,
            chunk_size: chunk_size.max(1),
            cursor: Cell::new(0),
            self_header: Cell::new(std::ptr::null_mut()),
        }
    }

    pub(crate) fn bind_header(&self, header: *mut GcHeader) {
        self.self_header.set(header);
    }

    /// Reset the drain cursor to the start, invoked once per cycle at
    /// `Collector::mark_roots` (spec.md §4.3 step 3: "Reset its cursors").
    pub(crate) fn reset(&self) {
        self.cursor.set(0);
    }

    pub(crate) fn header(&self) -> *mut GcHeader {
        self.self_header.get()
    }
}

unsafe impl Trace for BulkCursor {
    fn trace(&self, tracer: &Tracer) {
        let len = self.source.len();
        let start = self.cursor.get();
        if start >= len {
            return;
        }
        let end = (start + self.chunk_size).min(len);
        self.source.mark_range(start, end, tracer);
        self.cursor.set(end);

        if end < len {
            let header = self.self_header.get();
            debug_assert!(!header.is_null(), "BulkCursor traced before bind_header");
            // SAFETY: `header` is this very object, already Black (the
            // driver blackens a gray object before invoking its mark
            // hook); it is not linked into the gray queue because it was
            // just popped off it.
            unsafe {
                tracer.requeue(header);
            }
        }
    }

    fn propagate_cost(&self, _default_cost: usize) -> usize {
        // Bytes covered *this* invocation, not the sentinel's own size —
        // the whole point of chunking is that the sentinel's own memory
        // footprint is irrelevant to the work it just did.
        let len = self.source.len();
        let covered = self.cursor.get().min(len);
        let prev = covered.saturating_sub(self.chunk_size);
        (covered - prev).max(1) * self.source.element_cost()
    }
}

impl Collector {
    /// Registers a flat source for chunked marking (spec.md §4.8). Returns
    /// a handle to the sentinel object itself — the collector retains its
    /// own copy in `bulk_sources` so the handle need not be kept alive by
    /// the host; it exists mainly for diagnostics.
    pub fn register_bulk_source(
        &mut self,
        source: Box<dyn BulkSource>,
        chunk_size: usize,
    ) -> Gc<BulkCursor> {
        let cursor = BulkCursor::new(source, chunk_size);
        let ptr = self.alloc_inner(cursor, ColorFlags::empty());
        let header = unsafe { &ptr.as_ref().header as *const GcHeader as *mut GcHeader };
        unsafe {
            ptr.as_ref().bind_header(header);
        }
        let handle = Gc::from_box(ptr);
        self.bulk_sources.push(handle);
        handle
    }
}
