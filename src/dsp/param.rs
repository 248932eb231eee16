//! Lock-free parameter storage shared between the audio and control threads.
//!
//! Each parameter is written by exactly one control thread and read by the
//! audio thread once per sample. Loads are relaxed: a stale read costs at
//! most one sample of the previous value.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use atomic_float::AtomicF32;

use crate::error::{FxError, Result};

/// Atomic f32 parameter value.
#[derive(Debug)]
pub struct AtomicParam {
    value: AtomicF32,
}

impl AtomicParam {
    pub fn new(value: f32) -> Self {
        Self {
            value: AtomicF32::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.value.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.value.store(value, Ordering::Relaxed);
    }
}

impl Default for AtomicParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Atomic on/off parameter value.
#[derive(Debug, Default)]
pub struct AtomicToggle {
    value: AtomicBool,
}

impl AtomicToggle {
    pub fn new(value: bool) -> Self {
        Self {
            value: AtomicBool::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.value.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::Relaxed);
    }

    /// Flip the value, returning the new state.
    #[inline]
    pub fn toggle(&self) -> bool {
        !self.value.fetch_xor(true, Ordering::Relaxed)
    }
}

/// Valid domain of a numeric parameter.
///
/// The lower bound is always inclusive. The upper bound is inclusive unless
/// the range was built with [`ParamRange::half_open`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    pub max_exclusive: bool,
}

impl ParamRange {
    /// `[min, max]`
    pub const fn inclusive(min: f32, max: f32) -> Self {
        Self {
            min,
            max,
            max_exclusive: false,
        }
    }

    /// `[min, max)`
    pub const fn half_open(min: f32, max: f32) -> Self {
        Self {
            min,
            max,
            max_exclusive: true,
        }
    }

    /// Check whether a value lies inside the range. NaN and infinities never do.
    pub fn contains(&self, value: f32) -> bool {
        if !value.is_finite() || value < self.min {
            return false;
        }
        if self.max_exclusive {
            value < self.max
        } else {
            value <= self.max
        }
    }

    /// Validate a value for `param` of `effect`, returning it unchanged on success.
    pub fn check(&self, effect: &'static str, param: &'static str, value: f32) -> Result<f32> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(FxError::ParameterOutOfRange {
                effect,
                param,
                value,
                range: *self,
            })
        }
    }
}

impl fmt::Display for ParamRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let close = if self.max_exclusive { ')' } else { ']' };
        write!(f, "[{}, {}{}", self.min, self.max, close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_param() {
        let param = AtomicParam::new(1.0);
        assert_eq!(param.get(), 1.0);
        param.set(2.5);
        assert_eq!(param.get(), 2.5);
    }

    #[test]
    fn test_atomic_toggle() {
        let flag = AtomicToggle::new(false);
        assert!(flag.toggle());
        assert!(flag.get());
        assert!(!flag.toggle());
        assert!(!flag.get());
    }

    #[test]
    fn test_range_bounds() {
        let inclusive = ParamRange::inclusive(0.0, 1.0);
        assert!(inclusive.contains(0.0));
        assert!(inclusive.contains(1.0));
        assert!(!inclusive.contains(1.0001));
        assert!(!inclusive.contains(-0.0001));
        assert!(!inclusive.contains(f32::NAN));

        let half_open = ParamRange::half_open(0.0, 1.0);
        assert!(half_open.contains(0.999));
        assert!(!half_open.contains(1.0));
        assert!(!half_open.contains(f32::INFINITY));
    }

    #[test]
    fn test_range_display() {
        assert_eq!(ParamRange::inclusive(0.0, 10.0).to_string(), "[0, 10]");
        assert_eq!(ParamRange::half_open(0.0, 1.0).to_string(), "[0, 1)");
    }

    #[test]
    fn test_check_reports_context() {
        let err = ParamRange::inclusive(0.0, 1.0)
            .check("chorus", "rate", 2.0)
            .unwrap_err();
        match err {
            FxError::ParameterOutOfRange { effect, param, .. } => {
                assert_eq!(effect, "chorus");
                assert_eq!(param, "rate");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
