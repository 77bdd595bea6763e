//! Dynamically added/removed roots, distinguished by position in the
//! allocation list (spec.md §4.9).

use std::ptr::null_mut;

use crate::collector::Collector;
use crate::flags::ColorFlags;
use crate::ptr::Gc;
use crate::trace::{Trace, Tracer};

impl Collector {
    /// spec.md §4.9 `AddSoftRoot`. Creates the sentinel on first use,
    /// splicing it to the tail of the allocation list so "everything after
    /// the sentinel is a soft root" holds from then on.
    pub fn add_soft_root<T: Trace>(&mut self, obj: Gc<T>) {
        if self.soft_root_sentinel.get().is_null() {
            let sentinel_box = self.alloc_inner((), ColorFlags::FIXED);
            let header = unsafe { &sentinel_box.as_ref().header as *const _ as *mut _ };
            // The sentinel is bookkeeping, not a host-visible object — undo
            // `alloc_inner`'s `AllocBytes` charge so `Estimate`/`Threshold`
            // and the console `count` readout track only the objects the
            // host actually allocated (spec.md §3's accounting is phrased
            // entirely in terms of managed objects the host sees; the
            // sentinel is this crate's own internal marker for "everything
            // past here is a soft root").
            let size = unsafe { (*header).size() };
            self.alloc_bytes = self.alloc_bytes.saturating_sub(size);
            // Freshly allocated at the list head; move it to the tail.
            self.unlink_after(crate::collector::SweepCursor::Head, header);
            self.link_at_tail(header);
            self.soft_root_sentinel.set(header);
        }
        let sentinel = self.soft_root_sentinel.get();

        let header = obj.header_ptr();
        if let Some((cursor, found)) = self.find_in_list(|cur| cur == header) {
            self.unlink_after(cursor, found);
        }
        self.link_after(sentinel, header);
        unsafe {
            (*header).flags.insert(ColorFlags::ROOTED);
        }
        self.write_barrier(obj);
    }

    /// spec.md §4.9 `DelSoftRoot`. No-op if `obj` is not currently rooted.
    pub fn del_soft_root<T: Trace>(&mut self, obj: Gc<T>) {
        let header = obj.header_ptr();
        let rooted = unsafe { (*header).flags.contains(ColorFlags::ROOTED) };
        if !rooted {
            return;
        }
        unsafe {
            (*header).flags.remove(ColorFlags::ROOTED);
        }
        if let Some((cursor, found)) = self.find_in_list(|cur| cur == header) {
            self.unlink_after(cursor, found);
            self.link_at_head(found);
        }
    }

    /// spec.md §4.9 `DelSoftRootHead`: shutdown-only teardown of the
    /// sentinel itself. The sentinel is `Fixed`; freeing it here is the one
    /// sanctioned exception (`YES_REALLY_DELETE`), unlike every other path
    /// in this module which only ever relinks soft roots, never the
    /// sentinel.
    pub fn del_soft_root_head(&mut self) {
        let sentinel = self.soft_root_sentinel.get();
        if sentinel.is_null() {
            return;
        }
        debug_assert!(crate::flags::YES_REALLY_DELETE);
        if let Some((cursor, found)) = self.find_in_list(|cur| cur == sentinel) {
            self.unlink_after(cursor, found);
        }
        // No `AllocBytes` adjustment: the sentinel was never charged to it
        // (see `add_soft_root`), so there is nothing to give back here.
        unsafe {
            ((*sentinel).vtable.drop_and_free)(sentinel);
        }
        self.soft_root_sentinel.set(null_mut());
    }

    pub(crate) fn link_at_tail(&self, header: *mut crate::header::GcHeader) {
        unsafe {
            (*header).alloc_next.set(null_mut());
        }
        let mut cur = self.root.get();
        if cur.is_null() {
            self.root.set(header);
            return;
        }
        loop {
            let next = unsafe { (*cur).alloc_next.get() };
            if next.is_null() {
                unsafe {
                    (*cur).alloc_next.set(header);
                }
                return;
            }
            cur = next;
        }
    }
}

/// spec.md §4.3 step 4: walk `SoftRoots` and mark each object whose
/// `Rooted` bit is set and whose `EuthanizeMe` is clear.
pub(crate) fn mark_soft_roots(collector: &mut Collector, tracer: &Tracer) {
    let sentinel = collector.soft_root_sentinel.get();
    if sentinel.is_null() {
        return;
    }
    let mut cur = unsafe { (*sentinel).alloc_next.get() };
    while !cur.is_null() {
        let flags = unsafe { (*cur).flags.get() };
        if flags.contains(ColorFlags::ROOTED) && !flags.contains(ColorFlags::EUTHANIZE_ME) {
            unsafe {
                crate::mark::shade_gray(cur, tracer.queue_mut());
            }
        }
        cur = unsafe { (*cur).alloc_next.get() };
    }
}
