//! Offline rendering through an effect chain
//!
//! Reads a WAV file, runs one of its channels through the chain block by
//! block, and writes a 32-bit float WAV at the same sample rate.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use super::config::RenderConfig;
use crate::dsp::{Effect, EffectChain};
use crate::error::{FxError, Result};

/// Summary of a completed render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStats {
    /// Frames processed
    pub frames: usize,
    /// Sample rate of input and output
    pub sample_rate: u32,
    /// Peak absolute input level of the processed channel
    pub peak_in: f32,
    /// Peak absolute output level
    pub peak_out: f32,
}

impl RenderStats {
    pub fn duration_secs(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }
}

/// Read the sample rate of a WAV file without decoding it
///
/// Chains are built for a fixed sample rate, so callers use this to build
/// one that matches the file.
pub fn wav_sample_rate(path: &Path) -> Result<u32> {
    let reader = open_wav(path)?;
    Ok(reader.spec().sample_rate)
}

/// Process `input` through `chain` and write the result to `output`
///
/// # Arguments
/// * `chain` - Chain built for the input file's sample rate
/// * `input` - Source WAV (8/16/24/32-bit integer or 32-bit float)
/// * `output` - Destination, written as 32-bit float
/// * `config` - Block size, source channel and output channel count
///
/// # Errors
/// * `InvalidAudio` - unreadable input or a channel index the file lacks
/// * `InvalidConfig` - zero block size or output channels
/// * `Io` - the output cannot be written
pub fn render_file(
    chain: &mut EffectChain,
    input: &Path,
    output: &Path,
    config: &RenderConfig,
) -> Result<RenderStats> {
    config.validate()?;

    let reader = open_wav(input)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    let channel = config.input_channel as usize;
    if channel >= channels {
        return Err(FxError::InvalidAudio {
            reason: format!(
                "{} has {} channel(s), channel {} requested",
                input.display(),
                channels,
                channel
            ),
            source: None,
        });
    }

    let interleaved = read_samples_as_f32(reader, spec)?;
    let source: Vec<f32> = interleaved
        .iter()
        .skip(channel)
        .step_by(channels)
        .copied()
        .collect();

    let out_spec = WavSpec {
        channels: config.output_channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(output, out_spec).map_err(write_error)?;

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        frames = source.len(),
        sample_rate = spec.sample_rate,
        "rendering"
    );

    let mut stats = RenderStats {
        frames: source.len(),
        sample_rate: spec.sample_rate,
        peak_in: 0.0,
        peak_out: 0.0,
    };

    for block in source.chunks(config.block_frames) {
        chain.begin_block();
        for &sample in block {
            let processed = chain.process(sample);
            stats.peak_in = stats.peak_in.max(sample.abs());
            stats.peak_out = stats.peak_out.max(processed.abs());
            for _ in 0..config.output_channels {
                writer.write_sample(processed).map_err(write_error)?;
            }
        }
    }

    writer.finalize().map_err(write_error)?;

    if stats.peak_out > 1.0 {
        tracing::warn!(peak = stats.peak_out, "output exceeds full scale");
    }
    tracing::info!(
        frames = stats.frames,
        peak_in = stats.peak_in,
        peak_out = stats.peak_out,
        "render complete"
    );

    Ok(stats)
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn open_wav(path: &Path) -> Result<WavReader<std::io::BufReader<std::fs::File>>> {
    WavReader::open(path).map_err(|e| FxError::InvalidAudio {
        reason: format!("failed to open {}", path.display()),
        source: Some(e),
    })
}

/// Read every sample and convert to f32 in `[-1, 1]`
fn read_samples_as_f32<R: std::io::Read>(mut reader: WavReader<R>, spec: WavSpec) -> Result<Vec<f32>> {
    let result: std::result::Result<Vec<f32>, hound::Error> = match (
        spec.sample_format,
        spec.bits_per_sample,
    ) {
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect(),
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| v as f32 / 128.0))
            .collect(),
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect(),
        // 24-bit stored as i32 in hound
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8_388_608.0))
            .collect(),
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2_147_483_648.0))
            .collect(),
        (format, bits) => {
            return Err(FxError::UnsupportedFormat {
                format: format!("{bits}-bit {format:?} audio"),
            })
        }
    };

    result.map_err(|e| FxError::InvalidAudio {
        reason: format!("failed to decode {}-bit samples", spec.bits_per_sample),
        source: Some(e),
    })
}

fn write_error(error: hound::Error) -> FxError {
    match error {
        hound::Error::IoError(e) => FxError::Io(e),
        other => FxError::InvalidAudio {
            reason: "failed to write output".to_string(),
            source: Some(other),
        },
    }
}
