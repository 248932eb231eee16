//! Effect trait definition
//!
//! Every effect is split in two halves:
//! - the audio half implements [`Effect`] and is owned by the chain, which in
//!   turn is owned by the audio callback;
//! - the control half is an [`EffectControls`] handle holding only shared
//!   atomics, safe to clone and use from any thread.
//!
//! The control surface addresses effects through the closed [`EffectKind`] /
//! [`EffectControls`] tags and the [`EffectParam`] enum rather than by
//! downcasting.

use std::fmt;

use serde_json::Value;

use super::chain::ChainControls;
use super::chorus::ChorusControls;
use super::delay::DelayControls;
use super::distortion::DistortionControls;
use crate::error::{FxError, Result};

/// Base trait for all effects
///
/// # Real-time contract
/// [`Effect::process`] and [`Effect::begin_block`] run on the audio thread.
/// They must not allocate, free, lock, block, log, or panic.
pub trait Effect: Send {
    /// Transform one input sample into one output sample.
    fn process(&mut self, sample: f32) -> f32;

    /// Called once at the start of every audio callback, before any
    /// `process` call of that callback.
    ///
    /// Effects adopt state staged by their control handle here.
    fn begin_block(&mut self) {}

    /// Clear delay lines and oscillator state.
    ///
    /// Only call while no stream is running.
    fn reset(&mut self);

    /// Get the effect type tag
    fn kind(&self) -> EffectKind;

    /// Get a control handle sharing this effect's parameters
    fn controls(&self) -> EffectControls;
}

impl<E: Effect + ?Sized> Effect for Box<E> {
    fn process(&mut self, sample: f32) -> f32 {
        (**self).process(sample)
    }

    fn begin_block(&mut self) {
        (**self).begin_block()
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn kind(&self) -> EffectKind {
        (**self).kind()
    }

    fn controls(&self) -> EffectControls {
        (**self).controls()
    }
}

/// Closed set of effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Distortion,
    Chorus,
    Delay,
    /// A nested effect chain
    Chain,
}

impl EffectKind {
    /// Get string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectKind::Distortion => "distortion",
            EffectKind::Chorus => "chorus",
            EffectKind::Delay => "delay",
            EffectKind::Chain => "chain",
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            EffectKind::Distortion => "Distortion",
            EffectKind::Chorus => "Chorus",
            EffectKind::Delay => "Delay",
            EffectKind::Chain => "Chain",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every parameter reachable from the control surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectParam {
    /// Chain input gain (linear)
    InputGain,
    /// Distortion drive (linear)
    Gain,
    /// Distortion dry/wet
    Mix,
    /// Distortion soft (tanh) vs hard clipping
    UseTanh,
    /// Chorus LFO rate in Hz
    Rate,
    /// Chorus modulation depth in seconds
    Depth,
    /// Chorus modulation depth, percent convention (`depth = value / 100`)
    DepthPercent,
    /// Chorus base delay in seconds
    DelayBase,
    /// Delay line length in seconds
    DelayTime,
    /// Delay feedback coefficient
    Feedback,
}

impl EffectParam {
    /// Get the canonical parameter name
    pub fn name(&self) -> &'static str {
        match self {
            EffectParam::InputGain => "input_gain",
            EffectParam::Gain => "gain",
            EffectParam::Mix => "mix",
            EffectParam::UseTanh => "tanh",
            EffectParam::Rate => "rate",
            EffectParam::Depth => "depth",
            EffectParam::DepthPercent => "depth%",
            EffectParam::DelayBase => "delay_base",
            EffectParam::DelayTime => "delay_time",
            EffectParam::Feedback => "feedback",
        }
    }

    /// Parse a parameter name (case-insensitive, with a few aliases)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "input_gain" | "input-gain" => Some(EffectParam::InputGain),
            "gain" | "drive" => Some(EffectParam::Gain),
            "mix" => Some(EffectParam::Mix),
            "tanh" | "use_tanh" | "soft" => Some(EffectParam::UseTanh),
            "rate" => Some(EffectParam::Rate),
            "depth" => Some(EffectParam::Depth),
            "depth%" | "depth_percent" => Some(EffectParam::DepthPercent),
            "delay_base" | "base" => Some(EffectParam::DelayBase),
            "delay_time" | "time" | "delay-time" => Some(EffectParam::DelayTime),
            "feedback" | "fb" => Some(EffectParam::Feedback),
            _ => None,
        }
    }

    /// Whether the parameter is an on/off switch rather than a number
    pub fn is_toggle(&self) -> bool {
        matches!(self, EffectParam::UseTanh)
    }
}

impl fmt::Display for EffectParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value carried by a parameter get/set
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Toggle(bool),
}

impl ParamValue {
    /// Unwrap a numeric value for `param`
    pub fn as_f32(&self, param: EffectParam) -> Result<f32> {
        match self {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Toggle(_) => Err(FxError::ParameterType {
                param: param.name(),
                expected: "numeric",
            }),
        }
    }

    /// Unwrap an on/off value for `param`
    pub fn as_bool(&self, param: EffectParam) -> Result<bool> {
        match self {
            ParamValue::Toggle(v) => Ok(*v),
            ParamValue::Float(_) => Err(FxError::ParameterType {
                param: param.name(),
                expected: "on/off",
            }),
        }
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Toggle(value)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Toggle(true) => f.write_str("on"),
            ParamValue::Toggle(false) => f.write_str("off"),
        }
    }
}

pub(crate) fn unsupported(kind: EffectKind, param: EffectParam) -> FxError {
    FxError::UnsupportedParameter {
        effect: kind.as_str(),
        param: param.name().to_string(),
    }
}

/// Thread-safe control handle for one effect, tagged by kind
#[derive(Debug, Clone)]
pub enum EffectControls {
    Distortion(DistortionControls),
    Chorus(ChorusControls),
    Delay(DelayControls),
    Chain(ChainControls),
}

impl EffectControls {
    /// Get the effect type tag
    pub fn kind(&self) -> EffectKind {
        match self {
            EffectControls::Distortion(_) => EffectKind::Distortion,
            EffectControls::Chorus(_) => EffectKind::Chorus,
            EffectControls::Delay(_) => EffectKind::Delay,
            EffectControls::Chain(_) => EffectKind::Chain,
        }
    }

    /// Parameters this effect understands
    pub fn params(&self) -> &'static [EffectParam] {
        match self {
            EffectControls::Distortion(_) => DistortionControls::PARAMS,
            EffectControls::Chorus(_) => ChorusControls::PARAMS,
            EffectControls::Delay(_) => DelayControls::PARAMS,
            EffectControls::Chain(_) => ChainControls::PARAMS,
        }
    }

    /// Set a single parameter
    ///
    /// Out-of-range values and parameters the effect does not have are
    /// rejected; the effect keeps its previous value.
    pub fn set_param(&self, param: EffectParam, value: impl Into<ParamValue>) -> Result<()> {
        let value = value.into();
        match self {
            EffectControls::Distortion(c) => c.set_param(param, value),
            EffectControls::Chorus(c) => c.set_param(param, value),
            EffectControls::Delay(c) => c.set_param(param, value),
            EffectControls::Chain(c) => c.set_param(param, value),
        }
    }

    /// Read a single parameter
    pub fn get_param(&self, param: EffectParam) -> Result<ParamValue> {
        match self {
            EffectControls::Distortion(c) => c.get_param(param),
            EffectControls::Chorus(c) => c.get_param(param),
            EffectControls::Delay(c) => c.get_param(param),
            EffectControls::Chain(c) => c.get_param(param),
        }
    }

    /// Get all parameters as JSON (for listing)
    pub fn get_params(&self) -> Value {
        match self {
            EffectControls::Distortion(c) => c.get_params(),
            EffectControls::Chorus(c) => c.get_params(),
            EffectControls::Delay(c) => c.get_params(),
            EffectControls::Chain(c) => c.get_params(),
        }
    }

    pub fn as_distortion(&self) -> Option<&DistortionControls> {
        match self {
            EffectControls::Distortion(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_chorus(&self) -> Option<&ChorusControls> {
        match self {
            EffectControls::Chorus(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_delay(&self) -> Option<&DelayControls> {
        match self {
            EffectControls::Delay(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_chain(&self) -> Option<&ChainControls> {
        match self {
            EffectControls::Chain(c) => Some(c),
            _ => None,
        }
    }
}
