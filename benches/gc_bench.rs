use criterion::{Criterion, criterion_group, criterion_main};
use frame_gc::{Collector, GcCell, GcOptions, Trace, Tracer};

struct Node {
    value: usize,
    next: GcCell<Node>,
}

unsafe impl Trace for Node {
    fn trace(&self, tracer: &Tracer) {
        tracer.mark(&self.next);
    }
}

fn bench_allocation(c: &mut Criterion) {
    c.bench_function("alloc_100k_ints", |b| {
        b.iter(|| {
            let mut gc = Collector::new(GcOptions::DEFAULT);
            for i in 0..100_000 {
                let _ = gc.alloc(i);
            }
            gc.full_gc();
        });
    });
}

fn bench_chain(c: &mut Criterion) {
    c.bench_function("alloc_trace_chain_10k", |b| {
        b.iter(|| {
            let mut gc = Collector::new(GcOptions::DEFAULT);
            let mut prev = None;
            for value in 0..10_000 {
                let node = gc.alloc(Node {
                    value,
                    next: GcCell::new(prev),
                });
                prev = Some(node);
            }
            gc.full_gc();
        });
    });
}

fn bench_incremental_steps(c: &mut Criterion) {
    c.bench_function("incremental_step_10k_chain", |b| {
        b.iter(|| {
            let mut gc = Collector::new(GcOptions::DEFAULT.with_step_mul_percent(100));
            let mut prev = None;
            for value in 0..10_000 {
                let node = gc.alloc(Node {
                    value,
                    next: GcCell::new(prev),
                });
                prev = Some(node);
            }
            let head = prev;
            gc.roots_mut().register("chain-head", move |tracer| {
                if let Some(head) = head {
                    tracer.mark_owned(head);
                }
            });
            for tick in 1..=1_000u64 {
                gc.check_gc(tick);
            }
        });
    });
}

criterion_group!(gc, bench_allocation, bench_chain, bench_incremental_steps);
criterion_main!(gc);
