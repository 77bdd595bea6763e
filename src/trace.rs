//! The `Trace` trait and the `Tracer` used to drive a single object's
//! `PropagateMark` hook (spec.md §4.4, §6).

use crate::gray::GrayQueue;
use crate::header::GcHeader;
use crate::ptr::{Gc, GcCell};

/// Drives marking for the duration of one object's `PropagateMark` call.
/// Every `Tracer` is constructed by `Collector::propagate_mark` and only
/// ever exists while that object is being scanned, so `mark` never needs
/// to know the collector's `State` — shading a white child gray is always
/// correct the moment a black (being-scanned) object points to it.
pub struct Tracer {
    gray: *mut GrayQueue,
}

impl Tracer {
    /// # Safety
    /// `gray` must be valid for the lifetime of this `Tracer` and must not
    /// be aliased by any other live reference for that duration. Satisfied
    /// because the collector holds `&mut self` for the whole propagate
    /// step that constructs and drops the `Tracer`.
    pub(crate) unsafe fn new(gray: *mut GrayQueue) -> Self {
        Self { gray }
    }

    /// Mark the object referenced by `slot`, per spec.md §4.2:
    /// - a null slot is left alone,
    /// - a `Released` target is left alone,
    /// - a target with `EuthanizeMe` set has its slot cleared to null,
    /// - a white target is shaded gray and enqueued; gray/black targets
    ///   are left alone (idempotent — property P6).
    pub fn mark<T: Trace>(&self, slot: &GcCell<T>) {
        let Some(target) = slot.get() else {
            return;
        };
        let header = target.header_ptr();
        unsafe {
            if (*header).flags.is_released() {
                return;
            }
            if (*header).flags.is_euthanized() {
                slot.clear();
                return;
            }
            crate::mark::shade_gray(header, &mut *self.gray);
        }
    }

    /// Batched form of [`Tracer::mark`] (spec.md §4.2 `MarkArray`).
    pub fn mark_array<T: Trace>(&self, slots: &[GcCell<T>]) {
        for slot in slots {
            self.mark(slot);
        }
    }

    /// Mark a bare `Gc<T>` the host holds outside of any `GcCell` slot —
    /// the common shape for a root hook, which usually closes over a plain
    /// handle rather than a managed field. Unlike [`Tracer::mark`] there is
    /// no slot to null out if the target carries `EuthanizeMe`; the object
    /// is simply left unmarked; it is the host's responsibility to stop
    /// handing a euthanized handle to a root hook.
    pub fn mark_owned<T: Trace>(&self, target: Gc<T>) {
        let header = target.header_ptr();
        unsafe {
            if (*header).flags.is_released() || (*header).flags.is_euthanized() {
                return;
            }
            crate::mark::shade_gray(header, &mut *self.gray);
        }
    }

    pub(crate) fn queue_mut(&self) -> &mut GrayQueue {
        unsafe { &mut *self.gray }
    }

    /// Re-queue `header` (already Black, already popped off the gray
    /// queue head) as gray without touching its reachability from here.
    /// Used only by the bulk marker to re-queue itself when a chunk of its
    /// flat source is still unprocessed (spec.md §4.1 "Black → Gray",
    /// §4.8).
    ///
    /// # Safety
    /// `header` must be the object currently being scanned by the
    /// `PropagateMark` call this `Tracer` was built for, and must not
    /// already be linked into the gray queue.
    pub(crate) unsafe fn requeue(&self, header: *mut GcHeader) {
        unsafe {
            (*header).flags.black_to_gray();
            self.queue_mut().push(header);
        }
    }
}

/// Implemented by every type that can be stored inside a managed object
/// (spec.md §6 `Object::PropagateMark`).
///
/// # Safety
/// Implementations must call `tracer.mark(..)` (directly or through a
/// nested `Trace::trace`) on every `GcCell<_>` field the type owns.
/// Skipping one is a silent-data-loss bug (spec.md §7 "missing root"):
/// the referenced object can be collected out from under a live edge.
pub unsafe trait Trace {
    /// Set to `true` for types with no managed references at all, so the
    /// collector can skip calling `trace` entirely and treat the object as
    /// immediately black. Default `false` is always sound; this is purely
    /// an optimization hint (mirrors the teacher crate's `NO_TRACE`).
    const NO_TRACE: bool = false;

    fn trace(&self, tracer: &Tracer);

    /// Work cost charged to the current step for one `PropagateMark`
    /// invocation (spec.md §4.4, §6: "returns a cost estimate (default:
    /// `sizeof(*self)`)"). `default_cost` is the object's own in-memory
    /// size; almost every type should keep the default. The bulk marker
    /// (`bulk.rs`) overrides this to report the bytes actually covered by
    /// one chunk, since its true cost varies per invocation (spec.md §4.8).
    #[inline]
    fn propagate_cost(&self, default_cost: usize) -> usize {
        default_cost
    }
}

macro_rules! impl_no_trace {
    ($($ty:ty),* $(,)?) => {
        $(
            unsafe impl Trace for $ty {
                const NO_TRACE: bool = true;
                fn trace(&self, _tracer: &Tracer) {}
            }
        )*
    };
}

impl_no_trace!(
    (), i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char,
    String
);

unsafe impl<T> Trace for std::marker::PhantomData<T> {
    const NO_TRACE: bool = true;
    fn trace(&self, _tracer: &Tracer) {}
}

unsafe impl<T: Trace> Trace for Option<T> {
    const NO_TRACE: bool = T::NO_TRACE;
    fn trace(&self, tracer: &Tracer) {
        if let Some(value) = self {
            value.trace(tracer);
        }
    }
}

unsafe impl<T: Trace, E: Trace> Trace for Result<T, E> {
    const NO_TRACE: bool = T::NO_TRACE && E::NO_TRACE;
    fn trace(&self, tracer: &Tracer) {
        match self {
            Ok(v) => v.trace(tracer),
            Err(e) => e.trace(tracer),
        }
    }
}

unsafe impl<T: Trace> Trace for Vec<T> {
    const NO_TRACE: bool = T::NO_TRACE;
    fn trace(&self, tracer: &Tracer) {
        for item in self {
            item.trace(tracer);
        }
    }
}

unsafe impl<T: Trace> Trace for Box<T> {
    const NO_TRACE: bool = T::NO_TRACE;
    fn trace(&self, tracer: &Tracer) {
        (**self).trace(tracer);
    }
}

unsafe impl<T: Trace, const N: usize> Trace for [T; N] {
    const NO_TRACE: bool = T::NO_TRACE;
    fn trace(&self, tracer: &Tracer) {
        for item in self {
            item.trace(tracer);
        }
    }
}

unsafe impl<T: Trace> Trace for std::collections::VecDeque<T> {
    const NO_TRACE: bool = T::NO_TRACE;
    fn trace(&self, tracer: &Tracer) {
        for item in self {
            item.trace(tracer);
        }
    }
}
