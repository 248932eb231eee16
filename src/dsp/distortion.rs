//! Distortion Effect
//!
//! Drive into a clipper, blended with the dry signal.
//! Hard clipping at a fixed threshold by default, tanh soft clipping on request.

use std::sync::Arc;

use serde_json::{json, Value};

use super::effect::{unsupported, Effect, EffectControls, EffectKind, EffectParam, ParamValue};
use super::param::{AtomicParam, AtomicToggle, ParamRange};
use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Hard-clip threshold. Fixed, not exposed as a parameter.
pub const HARD_CLIP_THRESHOLD: f32 = 0.4;

/// Valid drive range
pub const GAIN_RANGE: ParamRange = ParamRange::inclusive(0.0, 10.0);

/// Valid dry/wet range
pub const MIX_RANGE: ParamRange = ParamRange::inclusive(0.0, 1.0);

const DEFAULT_GAIN: f32 = 10.0;
const DEFAULT_MIX: f32 = 1.0;

const NAME: &str = "distortion";

// ============================================================================
// Waveshaping
// ============================================================================

#[inline]
fn hard_clip(x: f32) -> f32 {
    x.clamp(-HARD_CLIP_THRESHOLD, HARD_CLIP_THRESHOLD)
}

/// `tanh` soft clip. Bounded by 1 in magnitude; in f32 it saturates to
/// exactly ±1 for large inputs (`|x|` above roughly 9).
#[inline]
fn soft_clip(x: f32) -> f32 {
    x.tanh()
}

// ============================================================================
// Distortion Effect
// ============================================================================

#[derive(Debug)]
struct DistortionParams {
    gain: AtomicParam,
    mix: AtomicParam,
    use_tanh: AtomicToggle,
}

/// Clipping distortion
///
/// # Parameters
/// - `gain`: Drive applied before clipping (0 to 10)
/// - `mix`: Dry/wet mix (0.0 = dry, 1.0 = wet)
/// - `use_tanh`: `tanh` soft clipping instead of hard clipping at ±0.4
///
/// Output is `mix * clip(gain * x) + (1 - mix) * x`. No state is carried
/// between samples.
#[derive(Debug)]
pub struct DistortionEffect {
    params: Arc<DistortionParams>,
}

impl DistortionEffect {
    /// Create a hard-clipping distortion
    ///
    /// # Errors
    /// `ParameterOutOfRange` if `gain` or `mix` is outside its domain.
    pub fn new(gain: f32, mix: f32) -> Result<Self> {
        let gain = GAIN_RANGE.check(NAME, "gain", gain)?;
        let mix = MIX_RANGE.check(NAME, "mix", mix)?;
        Ok(Self {
            params: Arc::new(DistortionParams {
                gain: AtomicParam::new(gain),
                mix: AtomicParam::new(mix),
                use_tanh: AtomicToggle::new(false),
            }),
        })
    }

    /// Select tanh soft clipping instead of hard clipping
    pub fn with_tanh(self, use_tanh: bool) -> Self {
        self.params.use_tanh.set(use_tanh);
        self
    }

    pub fn gain(&self) -> f32 {
        self.params.gain.get()
    }

    pub fn mix(&self) -> f32 {
        self.params.mix.get()
    }

    pub fn use_tanh(&self) -> bool {
        self.params.use_tanh.get()
    }

    /// Get a typed control handle
    pub fn distortion_controls(&self) -> DistortionControls {
        DistortionControls {
            params: Arc::clone(&self.params),
        }
    }
}

impl Default for DistortionEffect {
    fn default() -> Self {
        Self {
            params: Arc::new(DistortionParams {
                gain: AtomicParam::new(DEFAULT_GAIN),
                mix: AtomicParam::new(DEFAULT_MIX),
                use_tanh: AtomicToggle::new(false),
            }),
        }
    }
}

impl Effect for DistortionEffect {
    #[inline]
    fn process(&mut self, sample: f32) -> f32 {
        let gain = self.params.gain.get();
        let mix = self.params.mix.get();

        let scaled = gain * sample;
        let wet = if self.params.use_tanh.get() {
            soft_clip(scaled)
        } else {
            hard_clip(scaled)
        };

        mix * wet + (1.0 - mix) * sample
    }

    fn reset(&mut self) {
        // Stateless
    }

    fn kind(&self) -> EffectKind {
        EffectKind::Distortion
    }

    fn controls(&self) -> EffectControls {
        EffectControls::Distortion(self.distortion_controls())
    }
}

/// Control handle for a [`DistortionEffect`]
#[derive(Debug, Clone)]
pub struct DistortionControls {
    params: Arc<DistortionParams>,
}

impl DistortionControls {
    pub const PARAMS: &'static [EffectParam] =
        &[EffectParam::Gain, EffectParam::Mix, EffectParam::UseTanh];

    /// Set the drive
    ///
    /// # Arguments
    /// * `gain` - Drive in `[0, 10]`
    pub fn set_gain(&self, gain: f32) -> Result<()> {
        let gain = GAIN_RANGE.check(NAME, "gain", gain)?;
        self.params.gain.set(gain);
        tracing::debug!(gain, "distortion gain changed");
        Ok(())
    }

    pub fn gain(&self) -> f32 {
        self.params.gain.get()
    }

    /// Set the dry/wet mix
    ///
    /// # Arguments
    /// * `mix` - Mix in `[0, 1]`
    pub fn set_mix(&self, mix: f32) -> Result<()> {
        let mix = MIX_RANGE.check(NAME, "mix", mix)?;
        self.params.mix.set(mix);
        tracing::debug!(mix, "distortion mix changed");
        Ok(())
    }

    pub fn mix(&self) -> f32 {
        self.params.mix.get()
    }

    pub fn set_use_tanh(&self, use_tanh: bool) {
        self.params.use_tanh.set(use_tanh);
        tracing::debug!(use_tanh, "distortion clipping mode changed");
    }

    pub fn use_tanh(&self) -> bool {
        self.params.use_tanh.get()
    }

    pub(crate) fn set_param(&self, param: EffectParam, value: ParamValue) -> Result<()> {
        match param {
            EffectParam::Gain => self.set_gain(value.as_f32(param)?),
            EffectParam::Mix => self.set_mix(value.as_f32(param)?),
            EffectParam::UseTanh => {
                self.set_use_tanh(value.as_bool(param)?);
                Ok(())
            }
            _ => Err(unsupported(EffectKind::Distortion, param)),
        }
    }

    pub(crate) fn get_param(&self, param: EffectParam) -> Result<ParamValue> {
        match param {
            EffectParam::Gain => Ok(self.gain().into()),
            EffectParam::Mix => Ok(self.mix().into()),
            EffectParam::UseTanh => Ok(self.use_tanh().into()),
            _ => Err(unsupported(EffectKind::Distortion, param)),
        }
    }

    pub(crate) fn get_params(&self) -> Value {
        json!({
            "type": NAME,
            "gain": self.gain(),
            "mix": self.mix(),
            "tanh": self.use_tanh(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_distortion_new() {
        let dist = DistortionEffect::new(8.0, 1.0).unwrap();
        assert_eq!(dist.gain(), 8.0);
        assert_eq!(dist.mix(), 1.0);
        assert!(!dist.use_tanh());
    }

    #[test]
    fn test_distortion_new_rejects_out_of_range() {
        assert!(DistortionEffect::new(11.0, 1.0).is_err());
        assert!(DistortionEffect::new(1.0, -0.1).is_err());
        assert!(DistortionEffect::new(f32::NAN, 0.5).is_err());
    }

    #[test]
    fn test_hard_clip_threshold() {
        let mut dist = DistortionEffect::new(10.0, 1.0).unwrap();
        assert_abs_diff_eq!(dist.process(0.2), 0.4);
        assert_abs_diff_eq!(dist.process(-0.2), -0.4);
        // Below threshold passes through scaled
        assert_abs_diff_eq!(dist.process(0.03), 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_soft_clip() {
        let mut dist = DistortionEffect::new(10.0, 1.0).unwrap().with_tanh(true);
        assert_abs_diff_eq!(dist.process(0.1), 1.0_f32.tanh(), epsilon = 1e-6);
        assert!(dist.process(0.2) < 1.0);
        // f32 tanh saturates to exactly 1
        assert_eq!(dist.process(100.0), 1.0);
        assert_eq!(dist.process(-100.0), -1.0);
    }

    #[test]
    fn test_zero_mix_is_bypass() {
        let mut dist = DistortionEffect::new(10.0, 0.0).unwrap();
        for x in [-1.0, -0.3, 0.0, 0.05, 0.7, 1.0] {
            assert_eq!(dist.process(x), x);
        }
    }

    #[test]
    fn test_zero_gain_scales_dry_signal() {
        let mut dist = DistortionEffect::new(0.0, 0.25).unwrap();
        assert_abs_diff_eq!(dist.process(0.8), 0.6, epsilon = 1e-6);
    }

    #[test]
    fn test_half_mix_blend() {
        let mut dist = DistortionEffect::new(10.0, 0.5).unwrap();
        // wet = 0.4, dry = 0.5
        assert_abs_diff_eq!(dist.process(0.5), 0.45, epsilon = 1e-6);
    }

    #[test]
    fn test_controls_share_state() {
        let mut dist = DistortionEffect::new(10.0, 1.0).unwrap();
        let controls = dist.distortion_controls();

        controls.set_mix(0.0).unwrap();
        assert_eq!(dist.process(0.3), 0.3);

        controls.set_use_tanh(true);
        assert!(dist.use_tanh());
    }

    #[test]
    fn test_controls_reject_without_mutation() {
        let dist = DistortionEffect::new(5.0, 0.5).unwrap();
        let controls = dist.distortion_controls();

        assert!(controls.set_gain(10.5).is_err());
        assert!(controls.set_mix(1.5).is_err());
        assert_eq!(controls.gain(), 5.0);
        assert_eq!(controls.mix(), 0.5);
    }

    #[test]
    fn test_set_param_unsupported() {
        let dist = DistortionEffect::default();
        let controls = dist.controls();
        assert!(controls.set_param(EffectParam::Rate, 0.5_f32).is_err());
        assert!(controls.set_param(EffectParam::UseTanh, 1.0_f32).is_err());
        controls.set_param(EffectParam::UseTanh, true).unwrap();
        assert_eq!(
            controls.get_param(EffectParam::UseTanh).unwrap(),
            ParamValue::Toggle(true)
        );
    }

    #[test]
    fn test_get_params() {
        let dist = DistortionEffect::new(8.0, 1.0).unwrap();
        let params = dist.controls().get_params();
        assert_eq!(params["type"], "distortion");
        assert_eq!(params["gain"].as_f64().unwrap(), 8.0);
        assert_eq!(params["tanh"], false);
    }
}
