//! Effect Chain management
//!
//! The input is scaled by the chain's input gain, then passed through every
//! slot in insertion order. Disabled slots pass the signal through.
//!
//! Slots are added during setup only. Control handles taken with
//! [`EffectChain::chain_controls`] see the slots present at that moment.

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};

use super::effect::{unsupported, Effect, EffectControls, EffectKind, EffectParam, ParamValue};
use super::param::{AtomicParam, ParamRange};
use super::slot::{EffectSlot, SlotControls};
use crate::error::Result;

/// Valid input gain range (linear)
pub const INPUT_GAIN_RANGE: ParamRange = ParamRange::inclusive(0.0, 10.0);

const DEFAULT_INPUT_GAIN: f32 = 1.0;

const NAME: &str = "chain";

/// Ordered chain of effect slots
pub struct EffectChain {
    input_gain: Arc<AtomicParam>,
    slots: Vec<EffectSlot>,
}

impl EffectChain {
    /// Create an empty chain
    ///
    /// # Arguments
    /// * `input_gain` - Linear gain applied before the first slot, `[0, 10]`
    pub fn new(input_gain: f32) -> Result<Self> {
        let input_gain = INPUT_GAIN_RANGE.check(NAME, "input_gain", input_gain)?;
        Ok(Self {
            input_gain: Arc::new(AtomicParam::new(input_gain)),
            slots: Vec::new(),
        })
    }

    /// Append an effect, returning its index
    pub fn add_effect(
        &mut self,
        effect: impl Effect + 'static,
        name: impl Into<String>,
        enabled: bool,
    ) -> usize {
        self.add_boxed(Box::new(effect), name, enabled)
    }

    /// Append an already boxed effect, returning its index
    pub fn add_boxed(
        &mut self,
        effect: Box<dyn Effect>,
        name: impl Into<String>,
        enabled: bool,
    ) -> usize {
        let slot = EffectSlot::new(effect, name, enabled);
        tracing::debug!(index = self.slots.len(), slot = slot.name(), enabled, "effect added");
        self.slots.push(slot);
        self.slots.len() - 1
    }

    pub fn set_input_gain(&self, gain: f32) -> Result<()> {
        let gain = INPUT_GAIN_RANGE.check(NAME, "input_gain", gain)?;
        self.input_gain.set(gain);
        Ok(())
    }

    pub fn input_gain(&self) -> f32 {
        self.input_gain.get()
    }

    /// Enable or disable the slot at `index`. Out-of-range indices are ignored.
    pub fn enable_effect(&self, index: usize, enabled: bool) -> bool {
        match self.slots.get(index) {
            Some(slot) => {
                slot.set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    /// Flip the slot at `index`, returning its new state
    pub fn toggle_effect(&self, index: usize) -> Option<bool> {
        self.slots.get(index).map(EffectSlot::toggle)
    }

    pub fn get_effect(&self, index: usize) -> Option<&dyn Effect> {
        self.slots.get(index).map(EffectSlot::effect)
    }

    pub fn get_effect_mut(&mut self, index: usize) -> Option<&mut dyn Effect> {
        self.slots.get_mut(index).map(EffectSlot::effect_mut)
    }

    pub fn slot(&self, index: usize) -> Option<&EffectSlot> {
        self.slots.get(index)
    }

    /// Get the number of slots in the chain
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the chain is empty
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterate over slots
    pub fn iter(&self) -> impl Iterator<Item = &EffectSlot> {
        self.slots.iter()
    }

    /// Get a control handle for the chain and every current slot
    pub fn chain_controls(&self) -> ChainControls {
        ChainControls {
            input_gain: Arc::clone(&self.input_gain),
            slots: self.slots.iter().map(EffectSlot::controls).collect(),
        }
    }
}

impl Default for EffectChain {
    fn default() -> Self {
        Self {
            input_gain: Arc::new(AtomicParam::new(DEFAULT_INPUT_GAIN)),
            slots: Vec::new(),
        }
    }
}

impl fmt::Debug for EffectChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectChain")
            .field("input_gain", &self.input_gain())
            .field("slots", &self.slots)
            .finish()
    }
}

impl Effect for EffectChain {
    #[inline]
    fn process(&mut self, sample: f32) -> f32 {
        let mut sample = sample * self.input_gain.get();
        for slot in &mut self.slots {
            sample = slot.process(sample);
        }
        sample
    }

    fn begin_block(&mut self) {
        for slot in &mut self.slots {
            slot.begin_block();
        }
    }

    fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.reset();
        }
    }

    fn kind(&self) -> EffectKind {
        EffectKind::Chain
    }

    fn controls(&self) -> EffectControls {
        EffectControls::Chain(self.chain_controls())
    }
}

/// Control handle for an [`EffectChain`]
///
/// Cheap to clone; every clone addresses the same chain.
#[derive(Debug, Clone)]
pub struct ChainControls {
    input_gain: Arc<AtomicParam>,
    slots: Arc<[SlotControls]>,
}

impl ChainControls {
    pub const PARAMS: &'static [EffectParam] = &[EffectParam::InputGain];

    /// Set the input gain, `[0, 10]`
    pub fn set_input_gain(&self, gain: f32) -> Result<()> {
        let gain = INPUT_GAIN_RANGE.check(NAME, "input_gain", gain)?;
        self.input_gain.set(gain);
        tracing::debug!(gain, "input gain changed");
        Ok(())
    }

    pub fn input_gain(&self) -> f32 {
        self.input_gain.get()
    }

    /// Flip the slot at `index`, returning its new state
    pub fn toggle_effect(&self, index: usize) -> Option<bool> {
        self.slots.get(index).map(SlotControls::toggle)
    }

    /// Enable or disable the slot at `index`. Returns false for an invalid index.
    pub fn enable_effect(&self, index: usize, enabled: bool) -> bool {
        match self.slots.get(index) {
            Some(slot) => {
                slot.set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    pub fn get_effect(&self, index: usize) -> Option<&EffectControls> {
        self.slots.get(index).map(SlotControls::effect)
    }

    pub fn slot(&self, index: usize) -> Option<&SlotControls> {
        self.slots.get(index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SlotControls> {
        self.slots.iter()
    }

    pub(crate) fn set_param(&self, param: EffectParam, value: ParamValue) -> Result<()> {
        match param {
            EffectParam::InputGain => self.set_input_gain(value.as_f32(param)?),
            _ => Err(unsupported(EffectKind::Chain, param)),
        }
    }

    pub(crate) fn get_param(&self, param: EffectParam) -> Result<ParamValue> {
        match param {
            EffectParam::InputGain => Ok(self.input_gain().into()),
            _ => Err(unsupported(EffectKind::Chain, param)),
        }
    }

    /// Serialize chain state to JSON
    pub(crate) fn get_params(&self) -> Value {
        let effects: Vec<Value> = self
            .slots
            .iter()
            .map(|slot| {
                json!({
                    "name": slot.name(),
                    "enabled": slot.is_enabled(),
                    "params": slot.effect().get_params(),
                })
            })
            .collect();

        json!({
            "type": NAME,
            "input_gain": self.input_gain(),
            "effects": effects,
        })
    }
}

impl fmt::Display for ChainControls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Input gain: {:.2}", self.input_gain())?;
        for (i, slot) in self.slots.iter().enumerate() {
            let state = if slot.is_enabled() {
                "Enabled"
            } else {
                "Disabled"
            };
            writeln!(f, "[{}] {} - {}", i + 1, slot.name(), state)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::chorus::ChorusEffect;
    use crate::dsp::delay::DelayEffect;
    use crate::dsp::distortion::DistortionEffect;
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;

    fn test_chain() -> EffectChain {
        let mut chain = EffectChain::new(1.0).unwrap();
        chain.add_effect(DistortionEffect::new(8.0, 1.0).unwrap(), "Distortion", false);
        chain.add_effect(ChorusEffect::new(48000).unwrap(), "Chorus", false);
        chain.add_effect(DelayEffect::new(48000).unwrap(), "Delay", false);
        chain
    }

    #[test]
    fn test_chain_creation() {
        let chain = EffectChain::default();
        assert!(chain.is_empty());
        assert_eq!(chain.input_gain(), 1.0);
        assert!(EffectChain::new(10.5).is_err());
    }

    #[test]
    fn test_add_effect_returns_index() {
        let mut chain = EffectChain::default();
        assert_eq!(chain.add_effect(DistortionEffect::default(), "A", true), 0);
        assert_eq!(chain.add_effect(DistortionEffect::default(), "B", true), 1);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.slot(1).unwrap().name(), "B");
    }

    #[test]
    fn test_all_disabled_is_identity() {
        let mut chain = test_chain();
        chain.begin_block();
        for x in [0.0, 0.1, -0.5, 0.99, -1.0] {
            assert_eq!(chain.process(x), x);
        }
    }

    #[test]
    fn test_input_gain_into_distortion() {
        let mut chain = EffectChain::new(2.0).unwrap();
        chain.add_effect(DistortionEffect::new(10.0, 1.0).unwrap(), "Distortion", true);
        assert_abs_diff_eq!(chain.process(0.1), 0.4);
    }

    #[test]
    fn test_toggle_twice_restores() {
        let chain = test_chain();
        assert_eq!(chain.toggle_effect(1), Some(true));
        assert_eq!(chain.toggle_effect(1), Some(false));
        assert!(!chain.slot(1).unwrap().is_enabled());
    }

    #[test]
    fn test_invalid_index_is_noop() {
        let chain = test_chain();
        assert_eq!(chain.toggle_effect(3), None);
        assert!(!chain.enable_effect(7, true));
        assert!(chain.get_effect(3).is_none());
        assert!(chain.iter().all(|slot| !slot.is_enabled()));
    }

    #[test]
    fn test_get_effect_kind() {
        let chain = test_chain();
        assert_eq!(chain.get_effect(0).unwrap().kind(), EffectKind::Distortion);
        assert_eq!(chain.get_effect(2).unwrap().kind(), EffectKind::Delay);

        let controls = chain.chain_controls();
        let delay = controls.get_effect(2).and_then(EffectControls::as_delay);
        assert!(delay.is_some());
        assert!(controls.get_effect(0).unwrap().as_chorus().is_none());
    }

    #[test]
    fn test_controls_drive_chain() {
        let mut chain = test_chain();
        let controls = chain.chain_controls();

        controls.set_input_gain(2.0).unwrap();
        assert!(controls.enable_effect(0, true));
        controls
            .get_effect(0)
            .unwrap()
            .set_param(EffectParam::Gain, 10.0_f32)
            .unwrap();
        assert_abs_diff_eq!(chain.process(0.1), 0.4);

        assert!(controls.set_input_gain(11.0).is_err());
        assert_eq!(chain.input_gain(), 2.0);
    }

    #[test]
    fn test_nested_chain() {
        let mut inner = EffectChain::new(2.0).unwrap();
        inner.add_effect(DistortionEffect::new(10.0, 1.0).unwrap(), "Inner", true);

        let mut outer = EffectChain::new(0.5).unwrap();
        outer.add_effect(inner, "Sub-chain", true);

        // 0.5 * 0.1 = 0.05, then 2 * 0.05 * 10 = 1.0 clipped to 0.4
        assert_abs_diff_eq!(outer.process(0.1), 0.4);

        let controls = outer.chain_controls();
        let inner = controls.get_effect(0).and_then(EffectControls::as_chain).unwrap();
        assert_eq!(inner.len(), 1);
        assert_eq!(inner.input_gain(), 2.0);
    }

    #[test]
    fn test_listing() {
        let chain = test_chain();
        let controls = chain.chain_controls();
        controls.set_input_gain(5.0).unwrap();
        controls.toggle_effect(2);

        let expected = "Input gain: 5.00\n\
                        [1] Distortion - Disabled\n\
                        [2] Chorus - Disabled\n\
                        [3] Delay - Enabled\n";
        assert_eq!(controls.to_string(), expected);
    }

    #[test]
    fn test_get_params_json() {
        let chain = test_chain();
        let params = chain.controls().get_params();
        assert_eq!(params["type"], "chain");
        assert_eq!(params["effects"].as_array().unwrap().len(), 3);
        assert_eq!(params["effects"][1]["name"], "Chorus");
        assert_eq!(params["effects"][2]["params"]["type"], "delay");
    }
}
