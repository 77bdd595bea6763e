//! Core mark primitive shared by root enumeration, the `Tracer`, and the
//! write barrier (spec.md §4.2, §4.5's forward half, §6).

use crate::collector::{Collector, State};
use crate::error::GcDiagnostic;
use crate::gray::GrayQueue;
use crate::header::GcHeader;
use crate::ptr::{Gc, GcCell};
use crate::trace::{Trace, Tracer};

/// White → Gray, enqueue. No-op if `header` is not currently white (already
/// gray or black) — this is what makes repeated marking idempotent (P6).
///
/// # Safety
/// `header` must point at a live `GcHeader` not already linked into `gray`.
pub(crate) unsafe fn shade_gray(header: *mut GcHeader, gray: &mut GrayQueue) {
    unsafe {
        if (*header).flags.white_to_gray() {
            gray.push(header);
        }
    }
}

impl Collector {
    /// spec.md §6 `Mark(&slot)`, usable outside of a `PropagateMark` call
    /// (e.g. ad-hoc marking from host code that isn't routed through a
    /// registered root hook or a type's `trace`).
    pub fn mark<T: Trace>(&mut self, slot: &GcCell<T>) {
        let tracer = unsafe { Tracer::new(&mut self.gray as *mut GrayQueue) };
        tracer.mark(slot);
    }

    /// spec.md §4.2 `MarkArray`.
    pub fn mark_array<T: Trace>(&mut self, slots: &[GcCell<T>]) {
        let tracer = unsafe { Tracer::new(&mut self.gray as *mut GrayQueue) };
        tracer.mark_array(slots);
    }

    /// spec.md §4.2 `Barrier(src, dst)`: invoked by host code on every
    /// store `src.field = dst`. Contract: never call this with a null or
    /// `Released` `dst`.
    ///
    /// - During Propagate: forward barrier — shade `dst` gray immediately,
    ///   removing the black-to-white edge the store would otherwise create.
    /// - Otherwise: backward barrier — re-whiten `src`, an optimization
    ///   that keeps the barrier from re-firing on later writes through the
    ///   same source this cycle (spec.md §4.2).
    pub fn barrier<S: Trace, D: Trace>(&mut self, src: Gc<S>, dst: Gc<D>) {
        let dst_header = dst.header_ptr();
        unsafe {
            if (*dst_header).flags.is_released() {
                return;
            }
        }
        self.barrier_raw(src.header_ptr(), dst_header);
    }

    pub(crate) fn barrier_raw(&mut self, src_header: *mut GcHeader, dst_header: *mut GcHeader) {
        unsafe {
            if cfg!(feature = "debug-invariants")
                && self.state == State::Propagate
                && !(*src_header).flags.is_black()
            {
                // Precondition softly violated; spec.md §4.2 allows this
                // to be a debug-only assertion, not a hard failure.
                GcDiagnostic::BlackToWhiteEdge.warn();
            }

            match self.state {
                State::Propagate => {
                    shade_gray(dst_header, &mut self.gray);
                }
                State::Sweep | State::Pause | State::Finalize => {
                    (*src_header).flags.make_white(self.current_white);
                }
            }
        }
    }

    /// spec.md §6 `WriteBarrier(obj)`: re-shades `obj` conservatively
    /// without a distinguished source/destination pair. Used when a single
    /// object's reachability needs to be reasserted — e.g.
    /// `AddSoftRoot` shading the newly rooted object so an in-flight
    /// Propagate doesn't miss its outgoing references (spec.md §4.9).
    pub fn write_barrier<T: Trace>(&mut self, obj: Gc<T>) {
        let header = obj.header_ptr();
        unsafe {
            if (*header).flags.is_released() {
                return;
            }
            match self.state {
                State::Propagate => shade_gray(header, &mut self.gray),
                State::Sweep | State::Pause | State::Finalize => {
                    (*header).flags.make_white(self.current_white);
                }
            }
        }
    }
}
