//! Live Audio Host
//!
//! Opens an input and an output stream with `cpal`. The input callback copies
//! one channel into a lock-free ring; the output callback owns the effect
//! chain, pulls one input sample per frame, runs the chain and writes the
//! result to every output channel.
//!
//! Glitches (ring overruns, output underruns, backend errors) are only counted
//! inside the callbacks. A monitor thread reports them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};

use super::config::HostConfig;
use super::shutdown::ShutdownToken;
use crate::dsp::{Effect, EffectChain};
use crate::error::{FxError, Result};

// ============================================================================
// Stream Status
// ============================================================================

/// Glitch counters written from the audio callbacks
#[derive(Debug, Default)]
pub struct StreamStatus {
    overruns: AtomicU64,
    underruns: AtomicU64,
    stream_errors: AtomicU64,
}

impl StreamStatus {
    /// Input samples dropped because the ring was full
    #[inline]
    pub fn record_overrun(&self, samples: u64) {
        self.overruns.fetch_add(samples, Ordering::Relaxed);
    }

    /// Output frames rendered from silence because the ring was empty
    #[inline]
    pub fn record_underrun(&self, frames: u64) {
        self.underruns.fetch_add(frames, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_stream_error(&self) {
        self.stream_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            overruns: self.overruns.load(Ordering::Relaxed),
            underruns: self.underruns.load(Ordering::Relaxed),
            stream_errors: self.stream_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`StreamStatus`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub overruns: u64,
    pub underruns: u64,
    pub stream_errors: u64,
}

impl StatusSnapshot {
    /// Counts accumulated since `earlier`
    pub fn since(&self, earlier: &StatusSnapshot) -> StatusSnapshot {
        StatusSnapshot {
            overruns: self.overruns.saturating_sub(earlier.overruns),
            underruns: self.underruns.saturating_sub(earlier.underruns),
            stream_errors: self.stream_errors.saturating_sub(earlier.stream_errors),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.overruns == 0 && self.underruns == 0 && self.stream_errors == 0
    }
}

// ============================================================================
// Callback halves
// ============================================================================

/// Input callback state: extracts one channel into the ring
pub struct InputCapture {
    producer: rtrb::Producer<f32>,
    channel: usize,
    channels: usize,
    status: Arc<StreamStatus>,
}

impl InputCapture {
    pub fn new(
        producer: rtrb::Producer<f32>,
        channel: usize,
        channels: usize,
        status: Arc<StreamStatus>,
    ) -> Self {
        Self {
            producer,
            channel,
            channels: channels.max(1),
            status,
        }
    }

    /// Push the selected channel of an interleaved input buffer
    pub fn push<T>(&mut self, data: &[T])
    where
        T: SizedSample,
        f32: FromSample<T>,
    {
        let mut dropped = 0;
        for frame in data.chunks(self.channels) {
            if let Some(&sample) = frame.get(self.channel) {
                if self.producer.push(f32::from_sample(sample)).is_err() {
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            self.status.record_overrun(dropped);
        }
    }
}

/// Output callback state: owns the chain for the lifetime of the stream
pub struct CallbackProcessor {
    chain: EffectChain,
    input: rtrb::Consumer<f32>,
    status: Arc<StreamStatus>,
}

impl CallbackProcessor {
    pub fn new(chain: EffectChain, input: rtrb::Consumer<f32>, status: Arc<StreamStatus>) -> Self {
        Self {
            chain,
            input,
            status,
        }
    }

    /// Render one interleaved output buffer
    ///
    /// Missing input frames are processed as silence and counted.
    pub fn fill<T>(&mut self, data: &mut [T], channels: usize)
    where
        T: SizedSample + FromSample<f32>,
    {
        self.chain.begin_block();

        let mut missing = 0;
        for frame in data.chunks_mut(channels.max(1)) {
            let input = match self.input.pop() {
                Ok(sample) => sample,
                Err(_) => {
                    missing += 1;
                    0.0
                }
            };
            let output = T::from_sample(self.chain.process(input));
            frame.fill(output);
        }

        if missing > 0 {
            self.status.record_underrun(missing);
        }
    }

    pub fn chain(&self) -> &EffectChain {
        &self.chain
    }
}

// ============================================================================
// Devices
// ============================================================================

/// Stream direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

/// Summary of one audio device
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub direction: Direction,
    pub channels: u16,
    pub sample_rate: u32,
    pub sample_format: String,
    pub is_default: bool,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.is_default { " (default)" } else { "" };
        write!(
            f,
            "{}{} - {} ch, {} Hz, {}",
            self.name, marker, self.channels, self.sample_rate, self.sample_format
        )
    }
}

/// List input and output devices of the default host
pub fn list_devices() -> Result<Vec<DeviceInfo>> {
    let host = cpal::default_host();
    let default_input = host.default_input_device().and_then(|d| d.name().ok());
    let default_output = host.default_output_device().and_then(|d| d.name().ok());

    let mut devices = Vec::new();
    for device in host.input_devices()? {
        if let Some(info) = describe(&device, Direction::Input, default_input.as_deref()) {
            devices.push(info);
        }
    }
    for device in host.output_devices()? {
        if let Some(info) = describe(&device, Direction::Output, default_output.as_deref()) {
            devices.push(info);
        }
    }
    Ok(devices)
}

fn describe(
    device: &cpal::Device,
    direction: Direction,
    default_name: Option<&str>,
) -> Option<DeviceInfo> {
    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    let config = match direction {
        Direction::Input => device.default_input_config(),
        Direction::Output => device.default_output_config(),
    }
    .ok()?;

    Some(DeviceInfo {
        is_default: default_name == Some(name.as_str()),
        name,
        direction,
        channels: config.channels(),
        sample_rate: config.sample_rate().0,
        sample_format: format!("{:?}", config.sample_format()),
    })
}

fn find_device(host: &cpal::Host, direction: Direction, name: Option<&str>) -> Result<cpal::Device> {
    let Some(name) = name else {
        let device = match direction {
            Direction::Input => host.default_input_device(),
            Direction::Output => host.default_output_device(),
        };
        return device.ok_or(FxError::NoDevice {
            direction: direction.as_str(),
        });
    };

    let devices: Box<dyn Iterator<Item = cpal::Device>> = match direction {
        Direction::Input => Box::new(host.input_devices()?),
        Direction::Output => Box::new(host.output_devices()?),
    };
    for device in devices {
        if matches!(device.name(), Ok(ref n) if n == name) {
            return Ok(device);
        }
    }
    Err(FxError::DeviceNotFound {
        name: name.to_string(),
    })
}

// ============================================================================
// Audio Host
// ============================================================================

/// Running duplex session
///
/// Dropping the host cancels its shutdown token, stops the monitor and
/// closes both streams, which drops the chain.
pub struct AudioHost {
    _input: cpal::Stream,
    _output: cpal::Stream,
    status: Arc<StreamStatus>,
    shutdown: ShutdownToken,
    monitor: Option<JoinHandle<()>>,
}

impl AudioHost {
    /// Open both devices and start streaming through `chain`
    ///
    /// # Errors
    /// Device lookup, unsupported sample formats, and stream build/start
    /// failures are returned; nothing keeps running in that case.
    pub fn start(config: &HostConfig, chain: EffectChain, shutdown: ShutdownToken) -> Result<Self> {
        config.validate()?;

        let host = cpal::default_host();
        let input_device = find_device(&host, Direction::Input, config.input_device.as_deref())?;
        let output_device =
            find_device(&host, Direction::Output, config.output_device.as_deref())?;

        let input_supported = input_device.default_input_config()?;
        let output_supported = output_device.default_output_config()?;

        let input_channels = input_supported.channels();
        if config.input_channel >= input_channels {
            return Err(FxError::InvalidConfig {
                reason: format!(
                    "input channel {} requested but the device has {} channels",
                    config.input_channel, input_channels
                ),
            });
        }

        let input_config = cpal::StreamConfig {
            channels: input_channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(config.buffer_frames),
        };
        let output_config = cpal::StreamConfig {
            channels: output_supported.channels(),
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(config.buffer_frames),
        };

        let (mut producer, consumer) = rtrb::RingBuffer::new(config.ring_capacity);
        // One buffer of headroom so the output does not start empty.
        for _ in 0..config.buffer_frames {
            if producer.push(0.0).is_err() {
                break;
            }
        }

        let status = Arc::new(StreamStatus::default());
        let capture = InputCapture::new(
            producer,
            config.input_channel as usize,
            input_channels as usize,
            Arc::clone(&status),
        );
        let processor = CallbackProcessor::new(chain, consumer, Arc::clone(&status));

        let input = match input_supported.sample_format() {
            cpal::SampleFormat::F32 => {
                build_input_stream::<f32>(&input_device, &input_config, capture, &status)?
            }
            cpal::SampleFormat::I16 => {
                build_input_stream::<i16>(&input_device, &input_config, capture, &status)?
            }
            cpal::SampleFormat::U16 => {
                build_input_stream::<u16>(&input_device, &input_config, capture, &status)?
            }
            other => {
                return Err(FxError::UnsupportedFormat {
                    format: format!("{other:?} input"),
                })
            }
        };
        let output = match output_supported.sample_format() {
            cpal::SampleFormat::F32 => {
                build_output_stream::<f32>(&output_device, &output_config, processor, &status)?
            }
            cpal::SampleFormat::I16 => {
                build_output_stream::<i16>(&output_device, &output_config, processor, &status)?
            }
            cpal::SampleFormat::U16 => {
                build_output_stream::<u16>(&output_device, &output_config, processor, &status)?
            }
            other => {
                return Err(FxError::UnsupportedFormat {
                    format: format!("{other:?} output"),
                })
            }
        };

        input.play()?;
        output.play()?;

        tracing::info!(
            input = %input_device.name().unwrap_or_default(),
            output = %output_device.name().unwrap_or_default(),
            sample_rate = config.sample_rate,
            buffer_frames = config.buffer_frames,
            "audio streams started"
        );

        let monitor = {
            let status = Arc::clone(&status);
            let shutdown = shutdown.clone();
            let interval = Duration::from_millis(config.status_interval_ms);
            std::thread::Builder::new()
                .name("fxchain-monitor".to_string())
                .spawn(move || monitor_loop(&status, &shutdown, interval))?
        };

        Ok(Self {
            _input: input,
            _output: output,
            status,
            shutdown,
            monitor: Some(monitor),
        })
    }

    /// Current glitch counters
    pub fn status(&self) -> StatusSnapshot {
        self.status.snapshot()
    }

    /// Block until the shutdown token is cancelled
    pub fn wait(mut self) {
        self.join_monitor();
    }

    fn join_monitor(&mut self) {
        if let Some(handle) = self.monitor.take() {
            if handle.join().is_err() {
                tracing::error!("stream monitor thread panicked");
            }
        }
    }
}

impl Drop for AudioHost {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.join_monitor();
    }
}

fn build_input_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut capture: InputCapture,
    status: &Arc<StreamStatus>,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let status = Arc::clone(status);
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| capture.push(data),
        move |_: cpal::StreamError| status.record_stream_error(),
        None,
    )?;
    Ok(stream)
}

fn build_output_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut processor: CallbackProcessor,
    status: &Arc<StreamStatus>,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let status = Arc::clone(status);
    let channels = config.channels as usize;
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| processor.fill(data, channels),
        move |_: cpal::StreamError| status.record_stream_error(),
        None,
    )?;
    Ok(stream)
}

fn monitor_loop(status: &StreamStatus, shutdown: &ShutdownToken, interval: Duration) {
    let mut last = status.snapshot();
    while !shutdown.sleep(interval) {
        let now = status.snapshot();
        let delta = now.since(&last);
        if delta.overruns > 0 {
            tracing::warn!(samples = delta.overruns, total = now.overruns, "input overrun");
        }
        if delta.underruns > 0 {
            tracing::warn!(frames = delta.underruns, total = now.underruns, "output underrun");
        }
        if delta.stream_errors > 0 {
            tracing::warn!(
                count = delta.stream_errors,
                total = now.stream_errors,
                "audio backend reported stream errors"
            );
        }
        last = now;
    }

    let total = status.snapshot();
    tracing::info!(
        overruns = total.overruns,
        underruns = total.underruns,
        stream_errors = total.stream_errors,
        "audio streams stopping"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::DistortionEffect;

    fn ring(capacity: usize) -> (rtrb::Producer<f32>, rtrb::Consumer<f32>) {
        rtrb::RingBuffer::new(capacity)
    }

    #[test]
    fn test_capture_selects_channel() {
        let (producer, mut consumer) = ring(8);
        let status = Arc::new(StreamStatus::default());
        let mut capture = InputCapture::new(producer, 1, 2, Arc::clone(&status));

        capture.push(&[0.1f32, 0.2, 0.3, 0.4, 0.5, 0.6]);

        assert_eq!(consumer.pop().unwrap(), 0.2);
        assert_eq!(consumer.pop().unwrap(), 0.4);
        assert_eq!(consumer.pop().unwrap(), 0.6);
        assert!(consumer.pop().is_err());
        assert!(status.snapshot().is_clean());
    }

    #[test]
    fn test_capture_counts_overrun() {
        let (producer, _consumer) = ring(2);
        let status = Arc::new(StreamStatus::default());
        let mut capture = InputCapture::new(producer, 0, 1, Arc::clone(&status));

        capture.push(&[0.1f32, 0.2, 0.3, 0.4, 0.5]);
        assert_eq!(status.snapshot().overruns, 3);
    }

    #[test]
    fn test_capture_converts_integer_samples() {
        let (producer, mut consumer) = ring(4);
        let status = Arc::new(StreamStatus::default());
        let mut capture = InputCapture::new(producer, 0, 1, status);

        capture.push(&[0i16, i16::MIN]);
        assert_eq!(consumer.pop().unwrap(), 0.0);
        assert_eq!(consumer.pop().unwrap(), -1.0);
    }

    #[test]
    fn test_fill_fans_out_to_all_channels() {
        let (mut producer, consumer) = ring(8);
        let status = Arc::new(StreamStatus::default());

        let mut chain = EffectChain::new(2.0).unwrap();
        chain.add_effect(DistortionEffect::new(10.0, 1.0).unwrap(), "Distortion", true);
        let mut processor = CallbackProcessor::new(chain, consumer, Arc::clone(&status));

        producer.push(0.1).unwrap();
        producer.push(-0.01).unwrap();

        let mut out = [0.0f32; 4];
        processor.fill(&mut out, 2);

        assert_eq!(out[0], 0.4);
        assert_eq!(out[1], 0.4);
        assert!((out[2] + 0.2).abs() < 1e-6);
        assert_eq!(out[2], out[3]);
        assert!(status.snapshot().is_clean());
    }

    #[test]
    fn test_fill_counts_underrun() {
        let (mut producer, consumer) = ring(8);
        let status = Arc::new(StreamStatus::default());
        let mut processor =
            CallbackProcessor::new(EffectChain::default(), consumer, Arc::clone(&status));

        producer.push(0.5).unwrap();
        let mut out = [1.0f32; 3];
        processor.fill(&mut out, 1);

        assert_eq!(out, [0.5, 0.0, 0.0]);
        assert_eq!(status.snapshot().underruns, 2);
    }

    #[test]
    fn test_fill_integer_output() {
        let (mut producer, consumer) = ring(4);
        let status = Arc::new(StreamStatus::default());
        let mut processor = CallbackProcessor::new(EffectChain::default(), consumer, status);

        producer.push(0.0).unwrap();
        let mut out = [1i16; 2];
        processor.fill(&mut out, 2);
        assert_eq!(out, [0, 0]);
    }

    #[test]
    fn test_snapshot_delta() {
        let status = StreamStatus::default();
        status.record_underrun(4);
        let first = status.snapshot();
        status.record_underrun(2);
        status.record_stream_error();

        let delta = status.snapshot().since(&first);
        assert_eq!(delta.underruns, 2);
        assert_eq!(delta.stream_errors, 1);
        assert_eq!(delta.overruns, 0);
        assert!(!delta.is_clean());
    }
}
