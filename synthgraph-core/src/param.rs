//! Lock-free `f32` parameter cell.
//!
//! Parameters are the only state a control thread writes while the audio thread
//! is ticking. A `Param` stores the value as its raw bits in an `AtomicU32`, so a
//! single value can never be observed half-written. Several parameters updated
//! together are still independent stores; a block in progress may see some of
//! them updated and others not.

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

/// Atomic `f32`.
pub struct Param(AtomicU32);

impl Param {
    #[inline]
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    /// Current value (relaxed; audio-thread reads).
    #[inline]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Store a new value. Non-finite values are ignored.
    #[inline]
    pub fn set(&self, value: f32) {
        if value.is_finite() {
            self.0.store(value.to_bits(), Ordering::Relaxed);
        }
    }

    /// Store `value` clamped to `[lo, hi]`.
    #[inline]
    pub fn set_clamped(&self, value: f32, lo: f32, hi: f32) {
        self.set(value.clamp(lo, hi));
    }
}

impl Default for Param {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Param").field(&self.get()).finish()
    }
}

impl From<f32> for Param {
    fn from(v: f32) -> Self {
        Self::new(v)
    }
}
