//! Step-size controller: ties the per-step work budget to the measured
//! allocation rate (spec.md §4.7).

use crate::collector::Collector;

/// `gained / elapsed * StepMul / 100`, the "bytes per tick, scaled"
/// component shared by `compute_step_size` and `recompute_min_step_size`.
/// Returns `None` when the rate is undefined (`StepMul == 0` or
/// `elapsed == 0`), meaning the caller should treat the step size as
/// effectively infinite — one step finishes the whole cycle.
fn target_rate(collector: &Collector) -> Option<usize> {
    if collector.step_mul_percent == 0 {
        return None;
    }
    let elapsed = collector.check_time.saturating_sub(collector.last_collect_time);
    if elapsed == 0 {
        return None;
    }
    let alloc = collector.last_collect_alloc.min(collector.estimate);
    let gained = collector.alloc_bytes.saturating_sub(alloc);
    let target =
        (gained as u128 / elapsed as u128) * collector.step_mul_percent as u128 / 100;
    Some(target.min(usize::MAX as u128) as usize)
}

/// `Step()`'s work budget for this entry, recomputed every call (spec.md
/// §4.7): `max(MinStepSize, max(GCSTEPSIZE, target))`, or effectively
/// infinite if the allocation rate can't currently be measured.
pub(crate) fn compute_step_size(collector: &Collector) -> usize {
    match target_rate(collector) {
        None => usize::MAX,
        Some(target) => collector
            .min_step_size
            .max(collector.options.gc_step_size())
            .max(target),
    }
}

/// Captures the step-size floor at the Propagate → Sweep transition
/// (spec.md §4.5 step 4), so a mid-sweep drop in allocation rate can't
/// slow the sweeper down below what it was moving at when the sweep
/// began. Deliberately ignores the *previous* `MinStepSize` — it is being
/// replaced, not folded in.
pub(crate) fn recompute_min_step_size(collector: &Collector) -> usize {
    match target_rate(collector) {
        None => usize::MAX,
        Some(target) => collector.options.gc_step_size().max(target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::GcOptions;

    fn fresh(options: GcOptions) -> Collector {
        Collector::new(options)
    }

    #[test]
    fn zero_elapsed_is_infinite_step() {
        let c = fresh(GcOptions::DEFAULT);
        assert_eq!(compute_step_size(&c), usize::MAX);
    }

    #[test]
    fn zero_step_mul_is_infinite_step() {
        let mut c = fresh(GcOptions::DEFAULT);
        c.step_mul_percent = 0;
        c.check_time = 100;
        assert_eq!(compute_step_size(&c), usize::MAX);
    }

    #[test]
    fn floors_at_gcstepsize_when_rate_is_small() {
        let mut c = fresh(GcOptions::DEFAULT);
        c.check_time = 10;
        c.last_collect_time = 0;
        c.alloc_bytes = 10;
        c.estimate = 0;
        c.last_collect_alloc = 0;
        let size = compute_step_size(&c);
        assert!(size >= c.options.gc_step_size());
    }

    #[test]
    fn scales_with_allocation_rate() {
        let mut c = fresh(GcOptions::DEFAULT);
        c.check_time = 10;
        c.last_collect_time = 0;
        c.alloc_bytes = 1_000_000;
        c.estimate = 0;
        c.last_collect_alloc = 0;
        c.min_step_size = 0;
        let size = compute_step_size(&c);
        // gained=1_000_000, elapsed=10 -> 100_000/tick * 200% = 200_000
        assert_eq!(size, 200_000);
    }
}
