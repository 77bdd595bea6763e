//! Runtime-tunable collector parameters (SPEC_FULL.md §A3).
//!
//! Gathers the tunables spec.md §3 names (`Pause`, `StepMul`, the step-size
//! floor, the per-object sweep/finalize cost constants) into a single
//! builder so a host can configure a `Collector` without reaching into its
//! internals. Every field has the default spec.md gives it.

/// `GCSTEPSIZE = 16 * sizeof(smallest object)` per spec.md §4.7. Since the
/// smallest managed object type is a host concern, the crate asks for it
/// once here rather than hard-coding a guess.
const DEFAULT_MIN_OBJECT_SIZE: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcOptions {
    /// Percent of estimated live bytes the heap may grow to before the
    /// next cycle is triggered again after reaching Pause. Default 150
    /// (spec.md §3).
    pub pause_percent: u32,
    /// Percent multiplier applied to the measured allocation rate when
    /// computing a step's work budget. Default 200 (spec.md §3).
    pub step_mul_percent: u32,
    /// Size in bytes of the smallest managed object in the host's type
    /// population. Used to derive `GCSTEPSIZE` and `SweepCost` (spec.md
    /// §4.6, §4.7).
    pub min_object_size: usize,
    /// Fixed cost charged per finalized (destructed) object during sweep
    /// (spec.md §4.6). Default 100.
    pub finalize_cost: usize,
    /// Initial `Threshold`, in bytes, before the first cycle's `Estimate`
    /// is available.
    pub initial_threshold_bytes: usize,
    /// Default chunk size for a bulk source when the caller does not pick
    /// one explicitly (spec.md §4.8).
    pub default_bulk_chunk_size: usize,
}

impl GcOptions {
    pub const DEFAULT: GcOptions = GcOptions {
        pause_percent: 150,
        step_mul_percent: 200,
        min_object_size: DEFAULT_MIN_OBJECT_SIZE,
        finalize_cost: 100,
        initial_threshold_bytes: 1024 * 1024,
        default_bulk_chunk_size: 32,
    };

    /// `GCSTEPSIZE`, spec.md §4.7: a hard floor on the per-step budget so
    /// a near-zero allocation rate doesn't stall collection indefinitely.
    #[inline]
    pub fn gc_step_size(&self) -> usize {
        16 * self.min_object_size
    }

    /// `SweepCost`, spec.md §4.6: cost of skipping one live object during
    /// sweep.
    #[inline]
    pub fn sweep_cost(&self) -> usize {
        (self.min_object_size / 4).max(1)
    }

    pub fn with_pause_percent(mut self, pause_percent: u32) -> Self {
        self.pause_percent = pause_percent.max(1);
        self
    }

    pub fn with_step_mul_percent(mut self, step_mul_percent: u32) -> Self {
        self.step_mul_percent = step_mul_percent.max(100);
        self
    }

    pub fn with_min_object_size(mut self, min_object_size: usize) -> Self {
        self.min_object_size = min_object_size.max(1);
        self
    }
}

impl Default for GcOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}
