//! Object header flag word and tri-color arithmetic.
//!
//! Color is encoded in three independent bits — `BLACK`, `WHITE0`, `WHITE1` —
//! with gray represented by convention as "none of the three set, and the
//! object is linked into the gray queue." The remaining bits are static
//! per-object attributes the collector consults on every mark/sweep/barrier
//! path: `FIXED`, `ROOTED`, `EUTHANIZE_ME`, `RELEASED`, `CLEANUP`, and
//! `YES_REALLY_DELETE`.

use std::cell::Cell;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ColorFlags: u8 {
        /// Reachable and fully scanned.
        const BLACK             = 0b0000_0001;
        /// Potentially unreachable under white-generation 0.
        const WHITE0             = 0b0000_0010;
        /// Potentially unreachable under white-generation 1.
        const WHITE1             = 0b0000_0100;
        /// Immortal sentinel: always white, never swept.
        const FIXED              = 0b0000_1000;
        /// Dynamically added soft root (position in the allocation list
        /// past the soft-root sentinel is what actually makes it a root;
        /// this bit is the fast-path check).
        const ROOTED             = 0b0001_0000;
        /// Explicitly destroyed by the host; collected regardless of
        /// reachability, mark hook skipped.
        const EUTHANIZE_ME       = 0b0010_0000;
        /// Memory not tracked by this collector; ignored by mark and barrier.
        const RELEASED           = 0b0100_0000;
        /// Set immediately before the destructor runs.
        const CLEANUP            = 0b1000_0000;
    }
}

/// Both white bits together; used to mask "what color is this" down to
/// the white subspace.
pub const WHITE_BITS: ColorFlags =
    ColorFlags::WHITE0.union(ColorFlags::WHITE1);

/// Suppresses the "deleting a sentinel" diagnostic. Kept as a free function
/// rather than a bit, since it is only ever checked at the single call site
/// that intentionally frees a `Fixed` sentinel (`SoftRootRegistry::del_head`).
pub const YES_REALLY_DELETE: bool = true;

/// An object's transitioned-atomic flag cell. Single-threaded, so a plain
/// `Cell` suffices — there is never a concurrent mutator.
#[derive(Debug)]
pub struct Flags(Cell<ColorFlags>);

impl Flags {
    #[inline]
    pub fn new(initial: ColorFlags) -> Self {
        Self(Cell::new(initial))
    }

    #[inline]
    pub fn get(&self) -> ColorFlags {
        self.0.get()
    }

    #[inline]
    pub fn set(&self, flags: ColorFlags) {
        self.0.set(flags);
    }

    #[inline]
    pub fn contains(&self, bits: ColorFlags) -> bool {
        self.0.get().contains(bits)
    }

    #[inline]
    pub fn insert(&self, bits: ColorFlags) {
        let mut f = self.0.get();
        f.insert(bits);
        self.0.set(f);
    }

    #[inline]
    pub fn remove(&self, bits: ColorFlags) {
        let mut f = self.0.get();
        f.remove(bits);
        self.0.set(f);
    }

    /// Current white bits only (0, 1, or 2 bits set — 2 only transiently
    /// during construction before `make_white` normalizes it).
    #[inline]
    pub fn white_bits(&self) -> ColorFlags {
        self.0.get() & WHITE_BITS
    }

    #[inline]
    pub fn is_white(&self) -> bool {
        !(self.0.get() & WHITE_BITS).is_empty()
    }

    #[inline]
    pub fn is_black(&self) -> bool {
        self.0.get().contains(ColorFlags::BLACK)
    }

    /// Gray is the absence of both Black and White; the object's presence
    /// on the gray queue is what actually makes it gray (invariant I2).
    #[inline]
    pub fn is_gray(&self) -> bool {
        let f = self.0.get();
        !f.contains(ColorFlags::BLACK) && (f & WHITE_BITS).is_empty()
    }

    /// White → Gray: clear current-white bit. Caller pushes onto the gray
    /// queue. Returns `true` iff a transition actually happened (the object
    /// was white) — callers use this to decide whether to enqueue.
    #[inline]
    pub fn white_to_gray(&self) -> bool {
        if self.is_white() {
            self.remove(WHITE_BITS);
            true
        } else {
            false
        }
    }

    /// Gray → Black: set the Black bit. Caller must already have popped the
    /// object off the queue head.
    #[inline]
    pub fn gray_to_black(&self) {
        self.insert(ColorFlags::BLACK);
    }

    /// Black → Gray: clear Black. Caller pushes back onto the gray queue.
    /// Used by the bulk marker to re-queue itself.
    #[inline]
    pub fn black_to_gray(&self) {
        self.remove(ColorFlags::BLACK);
    }

    /// `* → MakeWhite`: clear Black, set the given current-white bit.
    #[inline]
    pub fn make_white(&self, current_white: ColorFlags) {
        let mut f = self.0.get();
        f.remove(ColorFlags::BLACK | WHITE_BITS);
        f.insert(current_white & WHITE_BITS);
        self.0.set(f);
    }

    #[inline]
    pub fn is_fixed(&self) -> bool {
        self.contains(ColorFlags::FIXED)
    }

    #[inline]
    pub fn is_rooted(&self) -> bool {
        self.contains(ColorFlags::ROOTED)
    }

    #[inline]
    pub fn is_euthanized(&self) -> bool {
        self.contains(ColorFlags::EUTHANIZE_ME)
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.contains(ColorFlags::RELEASED)
    }
}

/// Flips only the two white bits of `current_white`, leaving any other bit
/// (there shouldn't be any set in a bare white mask, but this keeps the
/// operation total) untouched. §4.1 "OtherWhite".
#[inline]
pub fn other_white(current_white: ColorFlags) -> ColorFlags {
    (current_white ^ WHITE_BITS) & WHITE_BITS
}

/// An object is dead for sweep purposes iff it carries only the *previous*
/// cycle's white, i.e. `(flags ^ white_bits) & other_white_mask == 0`.
#[inline]
pub fn is_dead(flags: ColorFlags, other_white_mask: ColorFlags) -> bool {
    ((flags ^ WHITE_BITS) & other_white_mask).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_to_gray_then_black() {
        let f = Flags::new(ColorFlags::WHITE0);
        assert!(f.is_white());
        assert!(f.white_to_gray());
        assert!(f.is_gray());
        f.gray_to_black();
        assert!(f.is_black());
        assert!(!f.is_white());
    }

    #[test]
    fn white_to_gray_idempotent_on_non_white() {
        let f = Flags::new(ColorFlags::empty());
        assert!(!f.white_to_gray());
    }

    #[test]
    fn make_white_clears_black_and_sets_current() {
        let f = Flags::new(ColorFlags::BLACK);
        f.make_white(ColorFlags::WHITE1);
        assert!(!f.is_black());
        assert_eq!(f.white_bits(), ColorFlags::WHITE1);
    }

    #[test]
    fn other_white_flips_only_white_bits() {
        assert_eq!(other_white(ColorFlags::WHITE0), ColorFlags::WHITE1);
        assert_eq!(other_white(ColorFlags::WHITE1), ColorFlags::WHITE0);
    }

    #[test]
    fn is_dead_matches_other_white() {
        let white0 = ColorFlags::WHITE0;
        let other = other_white(white0);
        assert!(!is_dead(white0, other));
        assert!(is_dead(other, other));
    }
}
