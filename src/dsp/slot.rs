//! Effect slot: one chain entry with a name and an enabled flag.

use std::fmt;
use std::sync::Arc;

use super::effect::{Effect, EffectControls};
use super::param::AtomicToggle;

/// A named, switchable effect inside a chain
///
/// A disabled slot passes samples through unchanged but still receives
/// `begin_block`, so staged state is picked up while bypassed.
pub struct EffectSlot {
    effect: Box<dyn Effect>,
    name: String,
    enabled: Arc<AtomicToggle>,
}

impl EffectSlot {
    pub fn new(effect: Box<dyn Effect>, name: impl Into<String>, enabled: bool) -> Self {
        Self {
            effect,
            name: name.into(),
            enabled: Arc::new(AtomicToggle::new(enabled)),
        }
    }

    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        if self.enabled.get() {
            self.effect.process(sample)
        } else {
            sample
        }
    }

    pub fn begin_block(&mut self) {
        self.effect.begin_block();
    }

    pub fn reset(&mut self) {
        self.effect.reset();
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Flip the enabled flag, returning the new state
    pub fn toggle(&self) -> bool {
        self.enabled.toggle()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn effect(&self) -> &dyn Effect {
        self.effect.as_ref()
    }

    pub fn effect_mut(&mut self) -> &mut dyn Effect {
        self.effect.as_mut()
    }

    /// Get a control handle sharing this slot's flag and parameters
    pub fn controls(&self) -> SlotControls {
        SlotControls {
            name: self.name.clone(),
            enabled: Arc::clone(&self.enabled),
            effect: self.effect.controls(),
        }
    }
}

impl fmt::Debug for EffectSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectSlot")
            .field("name", &self.name)
            .field("kind", &self.effect.kind())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Control-side view of an [`EffectSlot`]
#[derive(Debug, Clone)]
pub struct SlotControls {
    name: String,
    enabled: Arc<AtomicToggle>,
    effect: EffectControls,
}

impl SlotControls {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
        tracing::debug!(slot = %self.name, enabled, "effect enabled changed");
    }

    /// Flip the enabled flag, returning the new state
    pub fn toggle(&self) -> bool {
        let enabled = self.enabled.toggle();
        tracing::debug!(slot = %self.name, enabled, "effect toggled");
        enabled
    }

    pub fn effect(&self) -> &EffectControls {
        &self.effect
    }
}
