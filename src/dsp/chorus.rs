//! Chorus Effect
//!
//! A single voice read from a one-second delay line whose read position is
//! swept by a free-running sine LFO, mixed 50/50 with the dry signal.

use std::f64::consts::TAU;
use std::sync::Arc;

use serde_json::{json, Value};

use super::effect::{unsupported, Effect, EffectControls, EffectKind, EffectParam, ParamValue};
use super::param::{AtomicParam, ParamRange};
use crate::error::{FxError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Valid LFO rate range in Hz
pub const RATE_RANGE: ParamRange = ParamRange::inclusive(0.0, 1.0);

/// Valid modulation depth range in seconds
pub const DEPTH_RANGE: ParamRange = ParamRange::inclusive(0.0, 0.01);

/// Valid depth range for the percent convention (`depth = percent / 100`)
pub const DEPTH_PERCENT_RANGE: ParamRange = ParamRange::inclusive(0.0, 1.0);

/// Valid base delay range in seconds
pub const DELAY_BASE_RANGE: ParamRange = ParamRange::inclusive(0.0, 0.05);

const DEFAULT_RATE: f32 = 0.25;
const DEFAULT_DEPTH: f32 = 0.002;
const DEFAULT_DELAY_BASE: f32 = 0.01;

/// Fixed dry/wet blend; depth changes modulation amount only.
const BLEND: f32 = 0.5;

const NAME: &str = "chorus";

// ============================================================================
// Chorus Effect
// ============================================================================

#[derive(Debug)]
struct ChorusParams {
    rate: AtomicParam,
    depth: AtomicParam,
    delay_base: AtomicParam,
}

/// Modulated-delay chorus
///
/// # Parameters
/// - `rate`: LFO frequency in Hz (0 to 1)
/// - `depth`: Sweep amount in seconds (0 to 0.01)
/// - `delay_base`: Centre delay in seconds (0 to 0.05)
///
/// The delay line holds exactly one second of audio at the sample rate given
/// at construction and is never reallocated.
#[derive(Debug)]
pub struct ChorusEffect {
    params: Arc<ChorusParams>,
    sample_rate: u32,
    buffer: Vec<f32>,
    write_index: usize,
    /// LFO phase in [0, 1)
    phase: f64,
}

impl ChorusEffect {
    /// Create a chorus with default rate (0.25 Hz) and depth (2 ms)
    ///
    /// # Errors
    /// `InvalidSampleRate` if `sample_rate` is zero.
    pub fn new(sample_rate: u32) -> Result<Self> {
        Self::with_params(sample_rate, DEFAULT_RATE, DEFAULT_DEPTH)
    }

    /// Create a chorus with the given rate (Hz) and depth (seconds)
    pub fn with_params(sample_rate: u32, rate: f32, depth: f32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(FxError::InvalidSampleRate { sample_rate });
        }
        let rate = RATE_RANGE.check(NAME, "rate", rate)?;
        let depth = DEPTH_RANGE.check(NAME, "depth", depth)?;

        Ok(Self {
            params: Arc::new(ChorusParams {
                rate: AtomicParam::new(rate),
                depth: AtomicParam::new(depth),
                delay_base: AtomicParam::new(DEFAULT_DELAY_BASE),
            }),
            sample_rate,
            buffer: vec![0.0; sample_rate as usize],
            write_index: 0,
            phase: 0.0,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Current LFO phase in `[0, 1)`
    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn rate(&self) -> f32 {
        self.params.rate.get()
    }

    pub fn depth(&self) -> f32 {
        self.params.depth.get()
    }

    pub fn delay_base(&self) -> f32 {
        self.params.delay_base.get()
    }

    /// Get a typed control handle
    pub fn chorus_controls(&self) -> ChorusControls {
        ChorusControls {
            params: Arc::clone(&self.params),
        }
    }

    /// Current delay in whole samples, kept inside the delay line
    #[inline]
    fn delay_samples(&self) -> usize {
        let lfo = (TAU * self.phase).sin() as f32;
        let delay_time = self.params.delay_base.get() + self.params.depth.get() * lfo;

        let samples = (delay_time * self.sample_rate as f32).floor();
        if samples <= 0.0 {
            0
        } else {
            (samples as usize).min(self.buffer.len() - 1)
        }
    }

    #[inline]
    fn advance_phase(&mut self) {
        self.phase += self.params.rate.get() as f64 / self.sample_rate as f64;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
    }
}

impl Effect for ChorusEffect {
    fn process(&mut self, sample: f32) -> f32 {
        let delay_samples = self.delay_samples();
        self.advance_phase();

        let size = self.buffer.len();
        self.buffer[self.write_index] = sample;
        let read_index = (self.write_index + size - delay_samples) % size;
        let delayed = self.buffer[read_index];

        self.write_index = (self.write_index + 1) % size;
        BLEND * (sample + delayed)
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_index = 0;
        self.phase = 0.0;
    }

    fn kind(&self) -> EffectKind {
        EffectKind::Chorus
    }

    fn controls(&self) -> EffectControls {
        EffectControls::Chorus(self.chorus_controls())
    }
}

/// Control handle for a [`ChorusEffect`]
#[derive(Debug, Clone)]
pub struct ChorusControls {
    params: Arc<ChorusParams>,
}

impl ChorusControls {
    pub const PARAMS: &'static [EffectParam] = &[
        EffectParam::Rate,
        EffectParam::Depth,
        EffectParam::DepthPercent,
        EffectParam::DelayBase,
    ];

    /// Set the LFO rate in Hz, `[0, 1]`
    pub fn set_rate(&self, rate: f32) -> Result<()> {
        let rate = RATE_RANGE.check(NAME, "rate", rate)?;
        self.params.rate.set(rate);
        tracing::debug!(rate, "chorus rate changed");
        Ok(())
    }

    pub fn rate(&self) -> f32 {
        self.params.rate.get()
    }

    /// Set the modulation depth in seconds, `[0, 0.01]`
    pub fn set_depth(&self, depth: f32) -> Result<()> {
        let depth = DEPTH_RANGE.check(NAME, "depth", depth)?;
        self.params.depth.set(depth);
        tracing::debug!(depth, "chorus depth changed");
        Ok(())
    }

    /// Set the modulation depth using the percent convention
    ///
    /// The stored depth is `percent / 100` seconds, so `percent` in `[0, 1]`
    /// covers the same `[0, 0.01]` second domain as [`set_depth`](Self::set_depth).
    pub fn set_depth_percent(&self, percent: f32) -> Result<()> {
        let percent = DEPTH_PERCENT_RANGE.check(NAME, "depth%", percent)?;
        self.set_depth(percent / 100.0)
    }

    /// Modulation depth in seconds
    pub fn depth(&self) -> f32 {
        self.params.depth.get()
    }

    /// Set the centre delay in seconds, `[0, 0.05]`
    pub fn set_delay_base(&self, delay_base: f32) -> Result<()> {
        let delay_base = DELAY_BASE_RANGE.check(NAME, "delay_base", delay_base)?;
        self.params.delay_base.set(delay_base);
        tracing::debug!(delay_base, "chorus base delay changed");
        Ok(())
    }

    pub fn delay_base(&self) -> f32 {
        self.params.delay_base.get()
    }

    pub(crate) fn set_param(&self, param: EffectParam, value: ParamValue) -> Result<()> {
        match param {
            EffectParam::Rate => self.set_rate(value.as_f32(param)?),
            EffectParam::Depth => self.set_depth(value.as_f32(param)?),
            EffectParam::DepthPercent => self.set_depth_percent(value.as_f32(param)?),
            EffectParam::DelayBase => self.set_delay_base(value.as_f32(param)?),
            _ => Err(unsupported(EffectKind::Chorus, param)),
        }
    }

    pub(crate) fn get_param(&self, param: EffectParam) -> Result<ParamValue> {
        match param {
            EffectParam::Rate => Ok(self.rate().into()),
            EffectParam::Depth => Ok(self.depth().into()),
            EffectParam::DepthPercent => Ok((self.depth() * 100.0).into()),
            EffectParam::DelayBase => Ok(self.delay_base().into()),
            _ => Err(unsupported(EffectKind::Chorus, param)),
        }
    }

    pub(crate) fn get_params(&self) -> Value {
        json!({
            "type": NAME,
            "rate": self.rate(),
            "depth": self.depth(),
            "delay_base": self.delay_base(),
        })
    }
}
