//! frame-gc - an incremental, tri-color, mark-and-sweep garbage collector
//! for a game engine's scripting object model.
//!
//! The collector interleaves a small quantum of marking or sweeping work
//! with each simulation tick so that collection cost is amortized across
//! frames and bounded in proportion to the application's recent allocation
//! rate, rather than stopping the world to trace the whole heap at once.
//!
//! # Features
//!
//! - **Tri-color incremental marking**: objects are White (unvisited),
//!   Gray (visited, children unscanned), or Black (fully scanned); a
//!   write barrier preserves the invariant that no Black object points
//!   directly at a White one while marking is in progress.
//! - **Single-threaded, cooperative**: the collector runs synchronously on
//!   the mutator thread at well-defined points ([`Collector::check_gc`],
//!   [`Collector::full_gc`]); there is no background thread and no
//!   suspension.
//! - **Soft roots**: objects can be rooted and unrooted dynamically,
//!   distinguished from ordinary heap objects only by list position.
//! - **Bulk marking**: very large flat containers are drained in bounded
//!   chunks across however many steps it takes, instead of in one shot.
//!
//! # Example
//!
//! ```
//! use frame_gc::{Collector, GcCell, GcOptions, Gc, Trace, Tracer};
//!
//! struct Node {
//!     next: GcCell<Node>,
//! }
//!
//! unsafe impl Trace for Node {
//!     fn trace(&self, tracer: &Tracer) {
//!         tracer.mark(&self.next);
//!     }
//! }
//!
//! let mut gc = Collector::new(GcOptions::DEFAULT);
//! let tail = gc.alloc(Node { next: GcCell::new(None) });
//! let head = gc.alloc(Node { next: GcCell::new(Some(tail)) });
//! gc.roots_mut().register("chain", move |tracer| tracer.mark_owned(head));
//! gc.full_gc();
//! ```

mod bulk;
mod collector;
mod console;
mod error;
mod flags;
mod gray;
mod header;
mod mark;
mod options;
mod ptr;
mod roots;
mod soft_root;
mod step;
mod sweep;
mod trace;

pub use bulk::BulkSource;
pub use collector::{Collector, State};
pub use error::GcDiagnostic;
pub use options::GcOptions;
pub use ptr::{Gc, GcCell};
pub use roots::RootRegistry;
pub use trace::{Trace, Tracer};

#[cfg(test)]
mod tests {
    use super::*;

    struct Leaf;
    unsafe impl Trace for Leaf {
        const NO_TRACE: bool = true;
        fn trace(&self, _tracer: &Tracer) {}
    }

    struct Node {
        next: GcCell<Node>,
    }
    unsafe impl Trace for Node {
        fn trace(&self, tracer: &Tracer) {
            tracer.mark(&self.next);
        }
    }

    #[test]
    fn basic_allocation() {
        let mut gc = Collector::new(GcOptions::DEFAULT);
        let obj = gc.alloc(42i32);
        assert_eq!(*obj, 42);
    }

    #[test]
    fn unreachable_object_is_collected_by_full_gc() {
        let mut gc = Collector::new(GcOptions::DEFAULT);
        let before = gc.bytes_allocated();
        let _ = gc.alloc(Leaf);
        assert!(gc.bytes_allocated() > before);
        gc.full_gc();
        assert_eq!(gc.bytes_allocated(), before);
    }

    #[test]
    fn rooted_chain_survives_full_gc() {
        let mut gc = Collector::new(GcOptions::DEFAULT);
        let tail = gc.alloc(Node {
            next: GcCell::new(None),
        });
        let head = gc.alloc(Node {
            next: GcCell::new(Some(tail)),
        });
        gc.roots_mut().register("head", move |tracer| {
            tracer.mark_owned(head);
        });
        gc.full_gc();
        assert!(head.next.get().is_some());
    }
}
