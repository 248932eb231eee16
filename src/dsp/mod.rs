//! DSP Effects Library
//!
//! Per-sample effects and the chain that runs them.
//! All effects implement the `Effect` trait for uniform processing; each
//! hands out a control handle for adjusting parameters from another thread.

mod chain;
mod chorus;
mod delay;
mod distortion;
mod effect;
mod param;
mod slot;

pub use chain::{ChainControls, EffectChain, INPUT_GAIN_RANGE};
pub use chorus::{
    ChorusControls, ChorusEffect, DELAY_BASE_RANGE, DEPTH_PERCENT_RANGE, DEPTH_RANGE, RATE_RANGE,
};
pub use delay::{buffer_len, DelayControls, DelayEffect, DELAY_TIME_RANGE, FEEDBACK_RANGE};
pub use distortion::{
    DistortionControls, DistortionEffect, GAIN_RANGE, HARD_CLIP_THRESHOLD, MIX_RANGE,
};
pub use effect::{Effect, EffectControls, EffectKind, EffectParam, ParamValue};
pub use param::{AtomicParam, AtomicToggle, ParamRange};
pub use slot::{EffectSlot, SlotControls};
