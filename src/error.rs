//! Structured, non-fatal collector diagnostics (spec.md §7).
//!
//! None of these are ever returned as a `Result` from the public API: per
//! spec.md §7, invariant violations here are programmer errors that the
//! collector tolerates and self-heals from on the next cycle. They exist
//! so a host can log them with full context (via the `log` facade) rather
//! than the collector silently papering over a bug.

use thiserror::Error;

/// One diagnostic per invariant-violation bullet in spec.md §7.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GcDiagnostic {
    /// A popped "gray" object was not actually gray (invariant I2).
    #[error("popped object from the gray queue that was not colored gray")]
    GraySetNotGray,

    /// A black object was observed pointing at a white object during
    /// Propagate (invariant I3). Only checked when the `debug-invariants`
    /// feature is enabled, since the check itself costs a color read on
    /// every marked edge.
    #[error("black object holds a reference to a white object during Propagate")]
    BlackToWhiteEdge,

    /// The sweeper encountered an object that already carries `Cleanup`
    /// (it should have been unlinked and freed already).
    #[error("sweep encountered an object already marked Cleanup")]
    SweepAfterCleanup,

    /// A deallocation would have driven `AllocBytes` negative.
    #[error("deallocation would underflow AllocBytes")]
    NegativeAllocBytes,

    /// A `Fixed` sentinel was freed without the caller acknowledging it via
    /// `YES_REALLY_DELETE`. The only legitimate caller is
    /// `del_soft_root_head` at shutdown.
    #[error("deleted a Fixed sentinel without YES_REALLY_DELETE")]
    SentinelDeletedWithoutConfirmation,
}

impl GcDiagnostic {
    /// Log this diagnostic at `warn` level and continue. The collector
    /// never panics on these in release builds (spec.md §7: "defensive,
    /// logged, and execution continues").
    pub(crate) fn warn(self) {
        log::warn!(target: "frame_gc::invariant", "{self}");
    }
}
