//! Type-erased object header and box layout.
//!
//! Mirrors the teacher crate's `GcHeader`/`GcBox<T>`/vtable split: a single
//! non-generic header type lets the collector walk the allocation list and
//! gray queue without knowing the concrete type of any object, while a
//! per-type vtable supplies the two polymorphic operations spec.md §6
//! requires of managed objects (`PropagateMark`, `Destroy`).

use std::alloc::Layout;
use std::cell::Cell;
use std::ptr::{NonNull, null_mut};

use crate::flags::{ColorFlags, Flags};
use crate::gray::GrayQueue;
use crate::trace::{Trace, Tracer};

/// Per-type operations the collector invokes through a header pointer.
pub struct GcVTable {
    /// Type-directed mark hook. Traces every `GcCell` field via the
    /// `Tracer` built on top of `gray`, and returns the work cost charged
    /// to the current step (spec.md §4.4); defaults to `size_of::<T>()`.
    pub propagate_mark: unsafe fn(*const GcHeader, *mut GrayQueue) -> usize,
    /// Runs `T`'s destructor and frees the box. Invoked by the sweeper when
    /// `EuthanizeMe` is clear (spec.md §4.6), and unconditionally when the
    /// owning `Collector` itself is dropped.
    pub drop_and_free: unsafe fn(*mut GcHeader),
    /// Frees the box *without* running `T`'s destructor. Invoked by the
    /// sweeper when `EuthanizeMe` is set: the host already tore the object
    /// down explicitly, so its Rust destructor must not run a second time
    /// (spec.md §4.6: "if `EuthanizeMe` is clear, invoke the destructor").
    pub dealloc_no_drop: unsafe fn(*mut GcHeader),
    /// Layout of the complete `GcBox<T>`, used for `AllocBytes` accounting.
    pub layout: Layout,
}

impl GcVTable {
    const fn new<T: Trace>() -> Self {
        const _: () = assert!(std::mem::offset_of!(GcBox<()>, header) == 0);

        unsafe fn propagate_mark_impl<T: Trace>(
            ptr: *const GcHeader,
            gray: *mut GrayQueue,
        ) -> usize {
            unsafe {
                let gc_box = (ptr as *const u8).sub(std::mem::offset_of!(GcBox<T>, header))
                    as *const GcBox<T>;
                if !T::NO_TRACE {
                    let tracer = Tracer::new(gray);
                    (*gc_box).data.trace(&tracer);
                }
                (*gc_box).data.propagate_cost(std::mem::size_of::<GcBox<T>>())
            }
        }

        unsafe fn drop_and_free_impl<T>(ptr: *mut GcHeader) {
            unsafe {
                let gc_box = (ptr as *mut u8).sub(std::mem::offset_of!(GcBox<T>, header))
                    as *mut GcBox<T>;
                drop(Box::from_raw(gc_box));
            }
        }

        unsafe fn dealloc_no_drop_impl<T>(ptr: *mut GcHeader) {
            unsafe {
                let gc_box = (ptr as *mut u8).sub(std::mem::offset_of!(GcBox<T>, header))
                    as *mut GcBox<T>;
                std::alloc::dealloc(gc_box as *mut u8, Layout::new::<GcBox<T>>());
            }
        }

        Self {
            propagate_mark: propagate_mark_impl::<T>,
            drop_and_free: drop_and_free_impl::<T>,
            dealloc_no_drop: dealloc_no_drop_impl::<T>,
            layout: Layout::new::<GcBox<T>>(),
        }
    }
}

/// Type-erased header shared by every managed object. Intrusive links make
/// the allocation list and gray queue self-contained: no side table, no
/// allocation during collection (spec.md §9 "Intrusive lists").
pub struct GcHeader {
    pub flags: Flags,
    /// Next pointer in the allocation list ("Root list" in spec.md §3).
    pub alloc_next: Cell<*mut GcHeader>,
    /// Next pointer in the gray queue; meaningful only while gray.
    pub gray_next: Cell<*mut GcHeader>,
    pub vtable: &'static GcVTable,
}

impl GcHeader {
    fn new(vtable: &'static GcVTable, current_white: ColorFlags) -> Self {
        Self {
            flags: Flags::new(current_white & crate::flags::WHITE_BITS),
            alloc_next: Cell::new(null_mut()),
            gray_next: Cell::new(null_mut()),
            vtable,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.vtable.layout.size()
    }
}

/// A garbage-collected object: header plus payload, `repr(C)` so the header
/// is always at offset 0 and pointer arithmetic between `*GcHeader` and
/// `*GcBox<T>` is sound.
#[repr(C)]
pub struct GcBox<T: ?Sized> {
    pub header: GcHeader,
    pub data: T,
}

impl<T: Trace> GcBox<T> {
    const VTABLE: GcVTable = GcVTable::new::<T>();

    /// Allocate a new `GcBox<T>`, colored with the collector's current
    /// white. The caller (the `Collector`) links it into the allocation
    /// list and updates `AllocBytes`.
    pub(crate) fn new(data: T, current_white: ColorFlags) -> NonNull<GcBox<T>> {
        let boxed = Box::new(GcBox {
            header: GcHeader::new(&Self::VTABLE, current_white),
            data,
        });
        NonNull::from(Box::leak(boxed))
    }
}
