//! Delay Effect
//!
//! Single feedback delay line with a fixed 50% wet blend on the output.
//!
//! Changing the delay time swaps in a fresh zeroed buffer: the echo tail is
//! dropped and the write position restarts at zero. The new buffer is
//! allocated on the control thread and handed to the audio thread through a
//! lock-free queue; the audio thread hands the old one back the same way, so
//! neither allocation nor deallocation ever happens inside the callback.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{json, Value};

use super::effect::{unsupported, Effect, EffectControls, EffectKind, EffectParam, ParamValue};
use super::param::{AtomicParam, ParamRange};
use crate::error::{FxError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Valid delay time range in seconds
pub const DELAY_TIME_RANGE: ParamRange = ParamRange::inclusive(0.0, 1.0);

/// Valid feedback range. 1.0 and above would grow without bound.
pub const FEEDBACK_RANGE: ParamRange = ParamRange::half_open(0.0, 1.0);

const DEFAULT_DELAY_TIME: f32 = 0.15;
const DEFAULT_FEEDBACK: f32 = 0.6;

/// Fixed wet level on the output, independent of feedback.
const WET_LEVEL: f32 = 0.5;

/// Buffers in flight between the control and audio threads, each direction.
const RESIZE_QUEUE_CAPACITY: usize = 4;

const NAME: &str = "delay";

/// Delay line length in samples for a delay time, never less than one
pub fn buffer_len(delay_time: f32, sample_rate: u32) -> usize {
    let samples = (delay_time * sample_rate as f32).floor();
    if samples < 1.0 {
        1
    } else {
        samples as usize
    }
}

// ============================================================================
// Delay Effect
// ============================================================================

#[derive(Debug)]
struct DelayParams {
    delay_time: AtomicParam,
    feedback: AtomicParam,
}

/// Control-side ends of the buffer hand-over queues
struct ResizeQueue {
    staged: rtrb::Producer<Vec<f32>>,
    retired: rtrb::Consumer<Vec<f32>>,
}

/// Feedback delay
///
/// # Parameters
/// - `delay_time`: Delay line length in seconds (0 to 1, at least one sample)
/// - `feedback`: Amount of the delayed signal written back (0 to <1)
pub struct DelayEffect {
    params: Arc<DelayParams>,
    resize: Arc<Mutex<ResizeQueue>>,
    sample_rate: u32,
    buffer: Vec<f32>,
    write_index: usize,
    staged: rtrb::Consumer<Vec<f32>>,
    retired: rtrb::Producer<Vec<f32>>,
}

impl DelayEffect {
    /// Create a delay with default time (150 ms) and feedback (0.6)
    pub fn new(sample_rate: u32) -> Result<Self> {
        Self::with_params(sample_rate, DEFAULT_DELAY_TIME, DEFAULT_FEEDBACK)
    }

    /// Create a delay with the given time (seconds) and feedback
    ///
    /// # Errors
    /// `InvalidSampleRate` for a zero sample rate, `ParameterOutOfRange` for
    /// a delay time outside `[0, 1]` or feedback outside `[0, 1)`.
    pub fn with_params(sample_rate: u32, delay_time: f32, feedback: f32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(FxError::InvalidSampleRate { sample_rate });
        }
        let delay_time = DELAY_TIME_RANGE.check(NAME, "delay_time", delay_time)?;
        let feedback = FEEDBACK_RANGE.check(NAME, "feedback", feedback)?;

        let (staged_tx, staged_rx) = rtrb::RingBuffer::new(RESIZE_QUEUE_CAPACITY);
        let (retired_tx, retired_rx) = rtrb::RingBuffer::new(RESIZE_QUEUE_CAPACITY);

        Ok(Self {
            params: Arc::new(DelayParams {
                delay_time: AtomicParam::new(delay_time),
                feedback: AtomicParam::new(feedback),
            }),
            resize: Arc::new(Mutex::new(ResizeQueue {
                staged: staged_tx,
                retired: retired_rx,
            })),
            sample_rate,
            buffer: vec![0.0; buffer_len(delay_time, sample_rate)],
            write_index: 0,
            staged: staged_rx,
            retired: retired_tx,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length of the delay line currently in use, in samples
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Requested delay time in seconds
    pub fn delay_time(&self) -> f32 {
        self.params.delay_time.get()
    }

    pub fn feedback(&self) -> f32 {
        self.params.feedback.get()
    }

    /// Get a typed control handle
    pub fn delay_controls(&self) -> DelayControls {
        DelayControls {
            params: Arc::clone(&self.params),
            resize: Arc::clone(&self.resize),
            sample_rate: self.sample_rate,
        }
    }
}

impl fmt::Debug for DelayEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayEffect")
            .field("params", &self.params)
            .field("sample_rate", &self.sample_rate)
            .field("buffer_len", &self.buffer.len())
            .field("write_index", &self.write_index)
            .finish_non_exhaustive()
    }
}

impl Effect for DelayEffect {
    #[inline]
    fn process(&mut self, sample: f32) -> f32 {
        let feedback = self.params.feedback.get();

        let delayed = self.buffer[self.write_index];
        self.buffer[self.write_index] = sample + delayed * feedback;
        self.write_index = (self.write_index + 1) % self.buffer.len();

        sample + delayed * WET_LEVEL
    }

    fn begin_block(&mut self) {
        // Only adopt when the old buffer can be handed back.
        while !self.retired.is_full() {
            match self.staged.pop() {
                Ok(buffer) => {
                    let old = std::mem::replace(&mut self.buffer, buffer);
                    self.write_index = 0;
                    let _ = self.retired.push(old);
                }
                Err(_) => break,
            }
        }
    }

    fn reset(&mut self) {
        self.begin_block();
        self.buffer.fill(0.0);
        self.write_index = 0;
    }

    fn kind(&self) -> EffectKind {
        EffectKind::Delay
    }

    fn controls(&self) -> EffectControls {
        EffectControls::Delay(self.delay_controls())
    }
}

/// Control handle for a [`DelayEffect`]
#[derive(Clone)]
pub struct DelayControls {
    params: Arc<DelayParams>,
    resize: Arc<Mutex<ResizeQueue>>,
    sample_rate: u32,
}

impl DelayControls {
    pub const PARAMS: &'static [EffectParam] = &[EffectParam::DelayTime, EffectParam::Feedback];

    /// Change the delay time in seconds, `[0, 1]`
    ///
    /// A zeroed buffer of the new length is staged for the audio thread,
    /// which adopts it at the start of its next callback. The echo tail is
    /// lost at that point.
    ///
    /// # Errors
    /// `ParameterOutOfRange` for an invalid time, `ResizePending` if the
    /// audio thread has not yet picked up the previously staged buffers.
    pub fn set_delay_time(&self, delay_time: f32) -> Result<()> {
        let delay_time = DELAY_TIME_RANGE.check(NAME, "delay_time", delay_time)?;
        let len = buffer_len(delay_time, self.sample_rate);

        let mut queue = self.resize.lock().unwrap_or_else(PoisonError::into_inner);
        // Free buffers the audio thread has finished with.
        while queue.retired.pop().is_ok() {}

        if queue.staged.is_full() {
            tracing::warn!(delay_time, "delay buffer change still pending");
            return Err(FxError::ResizePending { effect: NAME });
        }
        queue
            .staged
            .push(vec![0.0; len])
            .map_err(|_| FxError::ResizePending { effect: NAME })?;

        self.params.delay_time.set(delay_time);
        tracing::debug!(delay_time, samples = len, "delay time changed");
        Ok(())
    }

    /// Requested delay time in seconds
    pub fn delay_time(&self) -> f32 {
        self.params.delay_time.get()
    }

    /// Set the feedback coefficient, `[0, 1)`
    pub fn set_feedback(&self, feedback: f32) -> Result<()> {
        let feedback = FEEDBACK_RANGE.check(NAME, "feedback", feedback)?;
        self.params.feedback.set(feedback);
        tracing::debug!(feedback, "delay feedback changed");
        Ok(())
    }

    pub fn feedback(&self) -> f32 {
        self.params.feedback.get()
    }

    pub(crate) fn set_param(&self, param: EffectParam, value: ParamValue) -> Result<()> {
        match param {
            EffectParam::DelayTime => self.set_delay_time(value.as_f32(param)?),
            EffectParam::Feedback => self.set_feedback(value.as_f32(param)?),
            _ => Err(unsupported(EffectKind::Delay, param)),
        }
    }

    pub(crate) fn get_param(&self, param: EffectParam) -> Result<ParamValue> {
        match param {
            EffectParam::DelayTime => Ok(self.delay_time().into()),
            EffectParam::Feedback => Ok(self.feedback().into()),
            _ => Err(unsupported(EffectKind::Delay, param)),
        }
    }

    pub(crate) fn get_params(&self) -> Value {
        json!({
            "type": NAME,
            "delay_time": self.delay_time(),
            "feedback": self.feedback(),
        })
    }
}

impl fmt::Debug for DelayControls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayControls")
            .field("params", &self.params)
            .field("sample_rate", &self.sample_rate)
            .finish_non_exhaustive()
    }
}
