//! End-to-end scenarios exercising the public API: incremental cycles,
//! garbage collection, the write barrier, explicit teardown, soft roots,
//! and chunked bulk marking.

use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

use frame_gc::{BulkSource, Collector, Gc, GcCell, GcOptions, State, Trace, Tracer};

struct Node {
    next: GcCell<Node>,
}

unsafe impl Trace for Node {
    fn trace(&self, tracer: &Tracer) {
        tracer.mark(&self.next);
    }
}

struct Leaf;

unsafe impl Trace for Leaf {
    const NO_TRACE: bool = true;
    fn trace(&self, _tracer: &Tracer) {}
}

struct Tracked {
    destroyed: Rc<Cell<bool>>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.destroyed.set(true);
    }
}

unsafe impl Trace for Tracked {
    const NO_TRACE: bool = true;
    fn trace(&self, _tracer: &Tracer) {}
}

/// Scenario 1 (spec.md §8): a long chain rooted at its head survives an
/// incremental run that visits at least two distinct non-Pause states
/// before returning to Pause, with no change in live bytes.
#[test]
fn two_phase_incremental_cycle_preserves_chain() {
    let mut gc = Collector::new(GcOptions::DEFAULT.with_min_object_size(1));

    let mut prev = None;
    for _ in 0..1000 {
        let node = gc.alloc(Node {
            next: GcCell::new(prev),
        });
        prev = Some(node);
    }
    let head = prev.unwrap();
    gc.roots_mut()
        .register("chain-head", move |tracer| tracer.mark_owned(head));

    let bytes_before = gc.bytes_allocated();

    // A huge `elapsed` drives the step formula's `target` term to ~0, so
    // the budget floors out at GCSTEPSIZE: many small steps instead of one
    // single full cycle.
    gc.set_check_time(1_000_000);

    let mut seen_states = HashSet::new();
    let mut iterations = 0;
    loop {
        gc.step();
        seen_states.insert(gc.state());
        iterations += 1;
        if gc.state() == State::Pause || iterations > 100_000 {
            break;
        }
    }

    assert_eq!(gc.state(), State::Pause);
    seen_states.remove(&State::Pause);
    assert!(
        seen_states.len() >= 2,
        "expected at least two distinct non-Pause states, saw {seen_states:?}"
    );
    assert_eq!(gc.allocation_count(), 1000);
    assert_eq!(gc.bytes_allocated(), bytes_before);
    assert!(head.next.get().is_some());
}

/// Scenario 2: an unrooted reference cycle is fully reclaimed.
#[test]
fn garbage_cycle_is_collected() {
    let mut gc = Collector::new(GcOptions::DEFAULT);

    let bytes_before = gc.bytes_allocated();
    let a = gc.alloc(Node {
        next: GcCell::new(None),
    });
    let b = gc.alloc(Node {
        next: GcCell::new(Some(a)),
    });
    a.next.set(&mut gc, a, Some(b));

    assert!(gc.bytes_allocated() > bytes_before);
    gc.full_gc();
    assert_eq!(gc.bytes_allocated(), bytes_before);
    assert_eq!(gc.allocation_count(), 0);
}

/// Scenario 3: a barrier-guarded write mid-Propagate keeps the new target
/// reachable through the rest of the cycle.
#[test]
fn barrier_preserves_invariant_across_a_write_mid_propagate() {
    let mut gc = Collector::new(GcOptions::DEFAULT.with_min_object_size(1));

    let x = gc.alloc(Node {
        next: GcCell::new(None),
    });
    gc.roots_mut().register("x", move |tracer| tracer.mark_owned(x));

    // Elapsed is huge relative to the tiny live set, so GCSTEPSIZE floors
    // the budget to less than one object's mark cost: the first `step()`
    // call does exactly `MarkRoot` (cost 0) then one `PropagateMark` (pops
    // and blackens `x`), and stops there because the gray queue is empty
    // and the budget has already gone negative.
    gc.set_check_time(1_000_000);
    gc.step();
    assert_eq!(gc.state(), State::Propagate);

    let y = gc.alloc(Node {
        next: GcCell::new(None),
    });
    x.next.set(&mut gc, x, Some(y));

    let mut iterations = 0;
    while gc.state() != State::Pause {
        gc.step();
        iterations += 1;
        assert!(iterations < 100_000, "cycle never reached Pause");
    }

    assert_eq!(gc.allocation_count(), 2);
    assert!(x.next.get() == Some(y));
}

/// Scenario 4: explicit teardown collects regardless of reachability,
/// skips the destructor, and nulls the root slot that pointed at it.
#[test]
fn euthanize_skips_destructor_and_nulls_root_slot() {
    let mut gc = Collector::new(GcOptions::DEFAULT);

    let destroyed = Rc::new(Cell::new(false));
    let z = gc.alloc(Tracked {
        destroyed: destroyed.clone(),
    });

    let root_cell = Rc::new(GcCell::new(Some(z)));
    let hook_cell = root_cell.clone();
    gc.roots_mut()
        .register("z-root", move |tracer| tracer.mark(&hook_cell));

    gc.euthanize(z);
    gc.full_gc();

    assert_eq!(gc.allocation_count(), 0);
    assert!(!destroyed.get(), "destructor must not run on a euthanized object");
    assert!(root_cell.get().is_none(), "Mark must null a slot whose target is euthanized");
}

/// Scenario 5: a soft-rooted object survives without any hard reference,
/// and is reclaimed once unrooted.
#[test]
fn soft_root_keeps_object_alive_until_removed() {
    let mut gc = Collector::new(GcOptions::DEFAULT);

    let s = gc.alloc(Leaf);
    gc.add_soft_root(s);
    gc.full_gc();
    assert_eq!(gc.allocation_count(), 1, "soft-rooted object should survive");

    gc.del_soft_root(s);
    gc.full_gc();
    assert_eq!(gc.allocation_count(), 0, "unrooted object should be collected");
}

struct Sectors {
    refs: Vec<(GcCell<Leaf>, GcCell<Leaf>)>,
    calls: Rc<Cell<usize>>,
}

impl BulkSource for Sectors {
    fn len(&self) -> usize {
        self.refs.len()
    }

    fn mark_range(&self, start: usize, end: usize, tracer: &Tracer) {
        for (a, b) in &self.refs[start..end] {
            tracer.mark(a);
            tracer.mark(b);
        }
        self.calls.set(self.calls.get() + 1);
    }
}

/// Scenario 6: a bulk source too large for one chunk re-queues itself
/// across multiple invocations of the same Propagate, and every element
/// it references survives.
#[test]
fn bulk_marker_drains_in_chunks_and_keeps_referents_alive() {
    let mut gc = Collector::new(GcOptions::DEFAULT);

    const SECTOR_COUNT: usize = 200;
    const CHUNK_SIZE: usize = 32;

    let mut refs = Vec::with_capacity(SECTOR_COUNT);
    for _ in 0..SECTOR_COUNT {
        let a = gc.alloc(Leaf);
        let b = gc.alloc(Leaf);
        refs.push((GcCell::new(Some(a)), GcCell::new(Some(b))));
    }

    let calls = Rc::new(Cell::new(0));
    let source = Sectors {
        refs,
        calls: calls.clone(),
    };
    let _sentinel = gc.register_bulk_source(Box::new(source), CHUNK_SIZE);

    gc.full_gc();

    let expected_chunks = SECTOR_COUNT.div_ceil(CHUNK_SIZE);
    assert_eq!(calls.get(), expected_chunks);
    assert!(expected_chunks - 1 >= SECTOR_COUNT / CHUNK_SIZE - 1);
    // +1 for the bulk-marker sentinel itself.
    assert_eq!(gc.allocation_count(), SECTOR_COUNT * 2 + 1);
}

/// P5 (spec.md §8): `AllocBytes` tracks the sum of sizes of linked
/// allocation-list entries.
#[test]
fn alloc_bytes_accounting_matches_allocations_and_frees() {
    let mut gc = Collector::new(GcOptions::DEFAULT);
    let start = gc.bytes_allocated();

    let a = gc.alloc(Leaf);
    let after_one = gc.bytes_allocated();
    assert!(after_one > start);

    let _b = gc.alloc(Leaf);
    let after_two = gc.bytes_allocated();
    assert_eq!(after_two - after_one, after_one - start);

    gc.add_soft_root(a);
    gc.full_gc();
    // `a` survives (soft root), `_b` does not.
    assert_eq!(gc.bytes_allocated(), after_one);
}

/// P6: marking a white object twice is the same as marking it once.
#[test]
fn mark_is_idempotent() {
    let mut gc = Collector::new(GcOptions::DEFAULT);
    let target: Gc<Leaf> = gc.alloc(Leaf);
    let slot = GcCell::new(Some(target));

    gc.mark(&slot);
    gc.mark(&slot);
    // Doesn't panic, doesn't double-link the gray queue; verified
    // end-to-end by running a full cycle without hanging or corrupting
    // the allocation list.
    gc.full_gc();
    assert_eq!(gc.allocation_count(), 0);
}
