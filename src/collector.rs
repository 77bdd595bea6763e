//! The state machine and driver (spec.md §4.9 is in `soft_root.rs`, §4.4/
//! §4.5/§4.10 live here; §4.6/§4.7/§4.2 are implemented in their own files
//! as additional `impl Collector` blocks).
//!
//! `Collector` is the single process-wide (or, for tests, per-context)
//! instance spec.md §3 describes. It is intentionally `!Sync`: every field
//! is a plain `Cell` or raw pointer, because spec.md §5 pins this design to
//! a single cooperative mutator thread with no suspension, cancellation, or
//! timeouts. Wrap it yourself (e.g. behind a `RefCell` or a single-threaded
//! executor) if your host needs to share it across API boundaries; never
//! move a `Collector` while a cycle is in progress mid-`Sweep`, since the
//! sweeper's cursor is an enum over "the list head" or "after this header",
//! not a raw self-pointer, so a move is actually safe — it is called out
//! here only because most real GCs get this wrong, and this one is
//! designed not to.

use std::cell::Cell;
use std::ptr::null_mut;

use crate::flags::ColorFlags;
use crate::gray::GrayQueue;
use crate::header::{GcBox, GcHeader};
use crate::options::GcOptions;
use crate::ptr::Gc;
use crate::roots::RootRegistry;
use crate::trace::Trace;

/// One of the four states spec.md §3 names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Pause,
    Propagate,
    Sweep,
    Finalize,
}

/// Where the sweeper currently is in the allocation list: either "the list
/// head itself" or "just after this header." Spec.md represents this as
/// the address of a `next` pointer; modeling it as an enum instead avoids
/// ever taking a pointer back into `Collector`'s own fields.
#[derive(Clone, Copy)]
pub(crate) enum SweepCursor {
    Head,
    After(*mut GcHeader),
}

pub struct Collector {
    pub(crate) alloc_bytes: usize,
    pub(crate) threshold: usize,
    pub(crate) estimate: usize,

    pub(crate) gray: GrayQueue,
    pub(crate) root: Cell<*mut GcHeader>,
    pub(crate) sweep_cursor: SweepCursor,

    pub(crate) current_white: ColorFlags,
    pub(crate) state: State,

    pub(crate) pause_percent: u32,
    pub(crate) step_mul_percent: u32,
    pub(crate) step_count: usize,

    pub(crate) check_time: u64,
    pub(crate) last_collect_time: u64,
    pub(crate) last_collect_alloc: usize,
    pub(crate) min_step_size: usize,
    pub(crate) final_gc: bool,

    pub(crate) roots: RootRegistry,
    pub(crate) soft_root_sentinel: Cell<*mut GcHeader>,
    pub(crate) bulk_sources: Vec<Gc<crate::bulk::BulkCursor>>,

    pub(crate) options: GcOptions,
}

impl Collector {
    pub fn new(options: GcOptions) -> Self {
        Self {
            alloc_bytes: 0,
            threshold: options.initial_threshold_bytes,
            estimate: 0,
            gray: GrayQueue::new(),
            root: Cell::new(null_mut()),
            sweep_cursor: SweepCursor::Head,
            current_white: ColorFlags::WHITE0,
            state: State::Pause,
            pause_percent: options.pause_percent,
            step_mul_percent: options.step_mul_percent,
            step_count: 0,
            check_time: 0,
            last_collect_time: 0,
            last_collect_alloc: 0,
            min_step_size: options.gc_step_size(),
            final_gc: false,
            roots: RootRegistry::new(),
            soft_root_sentinel: Cell::new(null_mut()),
            bulk_sources: Vec::new(),
            options,
        }
    }

    pub fn options(&self) -> &GcOptions {
        &self.options
    }

    /// Apply new `Pause`/`StepMul` tunables immediately — the next `Step`
    /// recomputes its budget from them without waiting for a cycle
    /// boundary (SPEC_FULL.md §4 "decay-free restart").
    pub fn set_pause_percent(&mut self, pause_percent: u32) {
        self.pause_percent = pause_percent.max(1);
    }

    pub fn set_step_mul_percent(&mut self, step_mul_percent: u32) {
        self.step_mul_percent = step_mul_percent.max(100);
    }

    pub fn pause_percent(&self) -> u32 {
        self.pause_percent
    }

    pub fn step_mul_percent(&self) -> u32 {
        self.step_mul_percent
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn bytes_allocated(&self) -> usize {
        self.alloc_bytes
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn estimate(&self) -> usize {
        self.estimate
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn min_step_size(&self) -> usize {
        self.min_step_size
    }

    pub fn roots_mut(&mut self) -> &mut RootRegistry {
        &mut self.roots
    }

    /// Host frame clock input (spec.md §6 `Host::CurrentTick`). Must be
    /// refreshed at least once per frame before `step`/`check_gc` run, or
    /// `elapsed` in the step formula is zero and every step becomes a full
    /// cycle (spec.md §9).
    pub fn set_check_time(&mut self, tick: u64) {
        self.check_time = tick;
    }

    pub fn check_time(&self) -> u64 {
        self.check_time
    }

    /// §4 C2: allocate a new managed object, link it at the head of the
    /// allocation list, color it current-white, and charge its size to
    /// `AllocBytes`.
    pub fn alloc<T: Trace>(&mut self, data: T) -> Gc<T> {
        let ptr = self.alloc_inner(data, ColorFlags::empty());
        Gc::from_box(ptr)
    }

    pub(crate) fn alloc_inner<T: Trace>(
        &mut self,
        data: T,
        extra_flags: ColorFlags,
    ) -> std::ptr::NonNull<GcBox<T>> {
        let ptr = GcBox::new(data, self.current_white);
        let size = unsafe { ptr.as_ref().header.size() };
        let header_ptr = unsafe { &ptr.as_ref().header as *const GcHeader as *mut GcHeader };

        unsafe {
            (*header_ptr).flags.insert(extra_flags);
            (*header_ptr).alloc_next.set(self.root.get());
        }
        self.root.set(header_ptr);
        self.alloc_bytes += size;

        ptr
    }

    /// Explicit teardown (spec.md §3 `EuthanizeMe`, §6 `Object::Destroy`):
    /// marks `obj` for collection regardless of reachability. Its mark
    /// hook is skipped from this point on and any slot still pointing at
    /// it is nulled out the next time that slot is marked (spec.md §4.2).
    /// The sweeper, not this call, runs the destructor and frees memory.
    pub fn euthanize<T: Trace>(&mut self, obj: Gc<T>) {
        unsafe {
            (*obj.header_ptr()).flags.insert(ColorFlags::EUTHANIZE_ME);
        }
    }

    /// Number of live allocation-list entries visible to the host. O(n);
    /// diagnostic use only (spec.md §6 console `count`). Excludes the
    /// soft-root sentinel: it is this crate's own internal bookkeeping
    /// marker, never something the host allocated, and — like its
    /// `AllocBytes` charge (see `add_soft_root`) — is not counted here.
    pub fn allocation_count(&self) -> usize {
        let mut count = 0;
        let mut cur = self.root.get();
        while !cur.is_null() {
            unsafe {
                if !(*cur).flags.is_fixed() {
                    count += 1;
                }
            }
            cur = unsafe { (*cur).alloc_next.get() };
        }
        count
    }

    /// spec.md §6 `CheckGC`: the once-per-frame host hook.
    pub fn check_gc(&mut self, tick: u64) {
        self.set_check_time(tick);
        if self.alloc_bytes >= self.threshold {
            self.step();
        }
    }

    /// spec.md §4.10 `FullGC`: force a stop-the-world collection.
    pub fn full_gc(&mut self) {
        self.final_gc = true;
        match self.state {
            State::Pause | State::Propagate => {
                self.gray.clear();
                self.sweep_cursor = SweepCursor::Head;
                self.state = State::Sweep;
            }
            State::Sweep | State::Finalize => {}
        }
        while self.state != State::Finalize {
            self.single_step();
        }
        self.single_step(); // Finalize -> Pause
        self.mark_roots();
        while self.state != State::Pause {
            self.single_step();
        }
        self.recompute_threshold();
        self.final_gc = false;
    }

    /// spec.md §4.7: `Step()` loops `SingleStep` until the computed budget
    /// is exhausted or a new Pause is reached.
    pub fn step(&mut self) {
        let step_size = crate::step::compute_step_size(self);
        let mut budget = step_size as isize;
        while budget > 0 && self.state != State::Pause {
            budget -= self.single_step() as isize;
        }
        self.recompute_threshold();
    }

    pub(crate) fn recompute_threshold(&mut self) {
        self.threshold = if self.state == State::Pause {
            ((self.estimate as u128 * self.pause_percent as u128) / 100) as usize
        } else {
            self.alloc_bytes
        };
    }

    /// One quantum of work, dispatched on the current state. Counts toward
    /// `StepCount` (spec.md §3); a `Pause` call resets the counter right
    /// back to 0 via `mark_roots`, so only Propagate/Sweep/Finalize calls
    /// actually accumulate within a cycle.
    pub(crate) fn single_step(&mut self) -> usize {
        self.step_count += 1;
        match self.state {
            State::Pause => {
                self.mark_roots();
                0
            }
            State::Propagate => {
                if self.gray.is_empty() {
                    self.enter_sweep();
                    0
                } else {
                    self.propagate_mark()
                }
            }
            State::Sweep => crate::sweep::sweep_step(self),
            State::Finalize => {
                self.state = State::Pause;
                self.last_collect_alloc = self.alloc_bytes;
                self.last_collect_time = self.check_time;
                log::debug!(
                    target: "frame_gc::collector",
                    "cycle complete: alloc={} estimate={} steps={}",
                    self.alloc_bytes, self.estimate, self.step_count
                );
                0
            }
        }
    }

    /// spec.md §4.3 `MarkRoot`: runs once at Pause → Propagate.
    pub(crate) fn mark_roots(&mut self) {
        self.gray.clear();
        let tracer = unsafe { crate::trace::Tracer::new(&mut self.gray as *mut GrayQueue) };

        self.roots.mark_all(&tracer);

        for bulk in &self.bulk_sources {
            let header = bulk.header_ptr();
            // SAFETY: freshly reset, not already queued (sweep re-whitened
            // it and it was popped off the queue by the end of the last
            // cycle).
            unsafe {
                crate::mark::shade_gray(header, &mut self.gray);
            }
            bulk.reset();
        }

        crate::soft_root::mark_soft_roots(self, &tracer);

        self.state = State::Propagate;
        self.step_count = 0;
        log::debug!(target: "frame_gc::collector", "Pause -> Propagate");
    }

    /// spec.md §4.4 `PropagateMark`.
    pub(crate) fn propagate_mark(&mut self) -> usize {
        let Some(header) = self.gray.pop() else {
            return 0;
        };
        unsafe {
            if !(*header).flags.is_gray() {
                crate::error::GcDiagnostic::GraySetNotGray.warn();
            }
            (*header).flags.gray_to_black();

            if (*header).flags.is_euthanized() {
                return (*header).size();
            }

            let vtable = (*header).vtable;
            (vtable.propagate_mark)(header, &mut self.gray as *mut GrayQueue)
        }
    }

    /// spec.md §4.5: the atomic Propagate → Sweep transition.
    pub(crate) fn enter_sweep(&mut self) {
        self.current_white = crate::flags::other_white(self.current_white);
        self.sweep_cursor = SweepCursor::Head;
        self.state = State::Sweep;
        self.estimate = self.alloc_bytes;
        self.min_step_size = crate::step::recompute_min_step_size(self);
        log::debug!(target: "frame_gc::collector", "Propagate -> Sweep");
    }

    /// Walk the allocation list, returning (predecessor-link, header) for
    /// the first header matching `pred`. `None` means not found.
    pub(crate) fn find_in_list(
        &self,
        mut pred: impl FnMut(*mut GcHeader) -> bool,
    ) -> Option<(SweepCursor, *mut GcHeader)> {
        let mut cursor = SweepCursor::Head;
        loop {
            let cur = match cursor {
                SweepCursor::Head => self.root.get(),
                SweepCursor::After(h) => unsafe { (*h).alloc_next.get() },
            };
            if cur.is_null() {
                return None;
            }
            if pred(cur) {
                return Some((cursor, cur));
            }
            cursor = SweepCursor::After(cur);
        }
    }

    pub(crate) fn unlink_after(&self, cursor: SweepCursor, header: *mut GcHeader) {
        let next = unsafe { (*header).alloc_next.get() };
        match cursor {
            SweepCursor::Head => self.root.set(next),
            SweepCursor::After(h) => unsafe { (*h).alloc_next.set(next) },
        }
    }

    pub(crate) fn link_at_head(&self, header: *mut GcHeader) {
        unsafe {
            (*header).alloc_next.set(self.root.get());
        }
        self.root.set(header);
    }

    pub(crate) fn link_after(&self, after: *mut GcHeader, header: *mut GcHeader) {
        unsafe {
            (*header).alloc_next.set((*after).alloc_next.get());
            (*after).alloc_next.set(header);
        }
    }
}

impl Drop for Collector {
    /// Frees every remaining allocation-list entry. If the soft-root
    /// sentinel is still linked (the host never called
    /// `del_soft_root_head`), it is freed here too — without
    /// `YES_REALLY_DELETE` acknowledgement, so the diagnostic fires
    /// (spec.md §3 `YesReallyDelete`, §7: defensive, logged, collector
    /// keeps going since this is shutdown anyway).
    fn drop(&mut self) {
        let sentinel = self.soft_root_sentinel.get();
        let mut cur = self.root.get();
        while !cur.is_null() {
            unsafe {
                let next = (*cur).alloc_next.get();
                if cur == sentinel {
                    crate::error::GcDiagnostic::SentinelDeletedWithoutConfirmation.warn();
                }
                ((*cur).vtable.drop_and_free)(cur);
                cur = next;
            }
        }
    }
}
