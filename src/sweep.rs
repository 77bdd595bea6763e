//! Limited-count traversal of the allocation list, freeing dead objects
//! (spec.md §4.6).

use crate::collector::{Collector, State, SweepCursor};
use crate::error::GcDiagnostic;
use crate::flags::ColorFlags;

/// Allocation-list entries examined per `SingleStep` call while sweeping.
/// Spec.md leaves this count to the implementer ("Limited-count
/// traversal"); this mirrors the batch size the Lua GC this design
/// descends from uses for the equivalent constant (`GCSWEEPMAX`).
const SWEEP_BATCH: usize = 40;

/// One `SingleStep` while `State == Sweep`. Advances the cursor by up to
/// `SWEEP_BATCH` entries, transitions to `Finalize` once the cursor runs
/// off the end of the list, and returns the step cost spec.md §4.6
/// defines: `(sweptCount - finalizedCount) * SweepCost + finalizedCount *
/// FinalizeCost`.
pub(crate) fn sweep_step(collector: &mut Collector) -> usize {
    let (swept, finalized) = sweep_list(collector, SWEEP_BATCH);
    let sweep_cost = collector.options.sweep_cost();
    let finalize_cost = collector.options.finalize_cost;
    (swept - finalized) * sweep_cost + finalized * finalize_cost
}

/// Core of `SweepList(pos, maxCount)`. Returns `(entries examined,
/// entries finalized)`. Transitions `collector.state` to `Finalize` if the
/// cursor reaches the end of the list within this call.
fn sweep_list(collector: &mut Collector, max_count: usize) -> (usize, usize) {
    let other_white = crate::flags::other_white(collector.current_white);
    let mut examined = 0;
    let mut finalized = 0;

    while examined < max_count {
        let cursor = collector.sweep_cursor;
        let cur = match cursor {
            SweepCursor::Head => collector.root.get(),
            SweepCursor::After(h) => unsafe { (*h).alloc_next.get() },
        };
        if cur.is_null() {
            collector.state = State::Finalize;
            break;
        }

        examined += 1;
        let flags = unsafe { (*cur).flags.get() };
        let is_live = flags.contains(ColorFlags::FIXED)
            || !crate::flags::is_dead(flags, other_white);

        if is_live {
            unsafe {
                (*cur).flags.make_white(collector.current_white);
            }
            collector.sweep_cursor = SweepCursor::After(cur);
        } else {
            if flags.contains(ColorFlags::CLEANUP) {
                GcDiagnostic::SweepAfterCleanup.warn();
            }
            collector.unlink_after(cursor, cur);

            let size = unsafe { (*cur).size() };
            let euthanized = flags.contains(ColorFlags::EUTHANIZE_ME);
            unsafe {
                (*cur).flags.insert(ColorFlags::CLEANUP);
                if euthanized {
                    ((*cur).vtable.dealloc_no_drop)(cur);
                } else {
                    ((*cur).vtable.drop_and_free)(cur);
                }
            }
            collector.alloc_bytes = match collector.alloc_bytes.checked_sub(size) {
                Some(v) => v,
                None => {
                    GcDiagnostic::NegativeAllocBytes.warn();
                    0
                }
            };
            // spec.md §3: "Estimate ... decremented by each sweep" — keeps
            // it a running lower-bound on live bytes instead of freezing it
            // at the pre-sweep total (spec.md §6 I6: Estimate non-increasing
            // during sweep).
            collector.estimate = collector.estimate.saturating_sub(size);
            finalized += 1;
            // cursor stays put: the unlink already advanced "next" at this
            // position, so the following iteration re-reads from the same
            // predecessor.
        }
    }

    (examined, finalized)
}
