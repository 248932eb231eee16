//! Stock effect rig
//!
//! Distortion, chorus and delay in that order, all bypassed at startup.

use crate::dsp::{ChorusEffect, DelayEffect, DistortionEffect, EffectChain};
use crate::error::Result;

const RIG_DISTORTION_GAIN: f32 = 8.0;
const RIG_DISTORTION_MIX: f32 = 1.0;

/// Build the default chain for `sample_rate`
pub fn build_default_chain(sample_rate: u32, input_gain: f32) -> Result<EffectChain> {
    let mut chain = EffectChain::new(input_gain)?;
    chain.add_effect(
        DistortionEffect::new(RIG_DISTORTION_GAIN, RIG_DISTORTION_MIX)?,
        "Distortion",
        false,
    );
    chain.add_effect(ChorusEffect::new(sample_rate)?, "Chorus", false);
    chain.add_effect(DelayEffect::new(sample_rate)?, "Delay", false);

    tracing::debug!(sample_rate, input_gain, slots = chain.len(), "default rig built");
    Ok(chain)
}
