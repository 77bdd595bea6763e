//! Managed reference types.
//!
//! `Gc<T>` is a bare, `Copy` handle into the heap — unlike the teacher
//! crate's `GcPtr<T>`, it carries **no** reference count and performs no
//! work on drop. Liveness here comes entirely from the tri-color
//! reachability computed each cycle (spec.md §3), never from a handle's own
//! lifetime; that is what "roots are enumerated explicitly by the host, not
//! discovered by stack scanning" (spec.md §1) requires. A `Gc<T>` obtained
//! from `Collector::alloc` stays valid for as long as some root chain
//! reaches it — callers that need a value to outlive a single stack frame
//! without being reachable from anywhere else must register it with
//! `Collector::add_soft_root`.
//!
//! `GcCell<T>` is the field type for a managed reference stored *inside*
//! another managed object. It is the only place a reference can be
//! mutated after construction, and routes every write through
//! `Collector::barrier` so the tri-color invariant (I3) is preserved.

use std::cell::Cell;
use std::ops::Deref;
use std::ptr::NonNull;

use crate::collector::Collector;
use crate::flags::ColorFlags;
use crate::header::{GcBox, GcHeader};
use crate::trace::{Trace, Tracer};

/// A bare managed reference. `Copy`, thin, and type-erased to a `GcHeader`
/// at the pointer-arithmetic level so the collector can walk it without
/// monomorphized code.
pub struct Gc<T> {
    ptr: NonNull<GcBox<T>>,
}

impl<T> Gc<T> {
    pub(crate) fn from_box(ptr: NonNull<GcBox<T>>) -> Self {
        Self { ptr }
    }

    /// Type-erased header pointer, used by the collector's mark/sweep/
    /// barrier internals.
    #[inline]
    pub fn header_ptr(self) -> *mut GcHeader {
        unsafe { &mut (*self.ptr.as_ptr()).header as *mut GcHeader }
    }

    #[inline]
    pub fn as_ptr(self) -> *const T {
        unsafe { &(*self.ptr.as_ptr()).data as *const T }
    }
}

impl<T: Trace> Gc<T> {
    /// Mints a `Gc<T>` over host-owned surrogate memory that is never
    /// tracked by any `Collector` (spec.md §3 `Released`, §9: "Objects
    /// carrying `Released` are not counted in `AllocBytes` and are skipped
    /// by the barrier... an escape hatch for host-managed memory that
    /// participates in the reference graph as a leaf only").
    ///
    /// The returned handle is not linked into any allocation list, is never
    /// charged to any collector's `AllocBytes`, and is never marked, swept,
    /// or freed by a `Collector` — `mark`/`barrier`/`trace` all check the
    /// `Released` bit first and no-op on it (spec.md §4.2). It type-checks
    /// like any other `Gc<T>` so it can sit in a `GcCell<T>` field, but its
    /// `data` must be kept alive by the host for as long as the stub might
    /// be dereferenced; pair every `released_stub` with a matching
    /// [`Gc::free_released_stub`] once the host is done with it.
    pub fn released_stub(data: T) -> Self {
        let ptr = GcBox::new(data, ColorFlags::empty());
        let header = unsafe { &ptr.as_ref().header as *const GcHeader as *mut GcHeader };
        unsafe {
            (*header).flags.insert(ColorFlags::RELEASED);
        }
        Self::from_box(ptr)
    }

    /// Frees a stub created by [`Gc::released_stub`]. No `Collector` ever
    /// does this on its own behalf — a `Released` object is, by
    /// definition, memory this crate never tracks — so reclaiming it is
    /// entirely the host's responsibility.
    ///
    /// # Safety
    /// `self` must have been produced by `released_stub` and must not be
    /// accessed (directly, or through any `GcCell` slot still holding it)
    /// after this call.
    pub unsafe fn free_released_stub(self) {
        let header = self.header_ptr();
        unsafe {
            debug_assert!((*header).flags.is_released());
            ((*header).vtable.drop_and_free)(header);
        }
    }
}

impl<T> Clone for Gc<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Gc<T> {}

impl<T> Deref for Gc<T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &(*self.ptr.as_ptr()).data }
    }
}

impl<T> PartialEq for Gc<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}
impl<T> Eq for Gc<T> {}

impl<T: std::fmt::Debug> std::fmt::Debug for Gc<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Gc").field(&**self).finish()
    }
}

/// A managed-reference field on a managed object. Interior mutability lets
/// `trace()` (which only ever gets `&self`) still null out a slot whose
/// target was euthanized (spec.md §4.2), and lets host setters route
/// through the write barrier.
pub struct GcCell<T> {
    slot: Cell<Option<Gc<T>>>,
}

impl<T> GcCell<T> {
    pub fn new(value: Option<Gc<T>>) -> Self {
        Self {
            slot: Cell::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> Option<Gc<T>> {
        self.slot.get()
    }

    /// Clear the slot without going through the barrier. Used internally
    /// by `Tracer::mark`/`Collector::mark` when the target has
    /// `EuthanizeMe` set (spec.md §4.2: "the slot participates in the
    /// graph only if its target is not scheduled for destruction").
    #[inline]
    pub(crate) fn clear(&self) {
        self.slot.set(None);
    }

    #[inline]
    pub(crate) fn set_raw(&self, value: Option<Gc<T>>) {
        self.slot.set(value);
    }
}

impl<T: Trace> Trace for GcCell<T> {
    fn trace(&self, tracer: &Tracer) {
        tracer.mark(self);
    }
}

impl<T: Trace> GcCell<T> {
    /// Host-facing store: `owner.field = value`. Emits `Barrier(owner,
    /// value)` before updating the slot, so the write can never create an
    /// unguarded black-to-white edge (spec.md §4.2, §6 `Barrier`).
    pub fn set<S: Trace>(&self, collector: &mut Collector, owner: Gc<S>, value: Option<Gc<T>>) {
        if let Some(target) = value {
            collector.barrier(owner, target);
        }
        self.slot.set(value);
    }
}

impl<T> std::fmt::Debug for GcCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcCell").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::GcOptions;

    struct Leaf;
    unsafe impl Trace for Leaf {
        const NO_TRACE: bool = true;
        fn trace(&self, _tracer: &Tracer) {}
    }

    #[test]
    fn released_stub_is_untracked_and_untouched_by_full_gc() {
        let mut gc = Collector::new(GcOptions::DEFAULT);
        let before_bytes = gc.bytes_allocated();
        let before_count = gc.allocation_count();

        let stub = Gc::released_stub(Leaf);

        // Not linked into the collector's allocation list, not charged to
        // AllocBytes — the collector has no idea it exists.
        assert_eq!(gc.bytes_allocated(), before_bytes);
        assert_eq!(gc.allocation_count(), before_count);

        let slot = GcCell::new(Some(stub));
        gc.mark(&slot); // no-op: Released short-circuits before shading.
        gc.full_gc(); // must not crash or try to sweep/free the stub.
        assert!(slot.get().is_some(), "mark must leave a Released slot untouched");

        unsafe {
            stub.free_released_stub();
        }
    }

    #[test]
    fn barrier_no_ops_on_a_released_destination() {
        let mut gc = Collector::new(GcOptions::DEFAULT);
        let owner = gc.alloc(Leaf);
        let stub = Gc::released_stub(Leaf);

        // Must not link the stub into anything or panic; Released targets
        // are skipped entirely (spec.md §4.2's Barrier contract exempts
        // Released destinations from the black/white bookkeeping).
        gc.barrier(owner, stub);

        unsafe {
            stub.free_released_stub();
        }
    }
}
