//! Offline render tests
//!
//! Exercise the WAV renderer and the `render` command against real files.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use fxchain::cli::commands;
use fxchain::engine::{build_default_chain, render_file, EngineConfig, RenderConfig};

fn write_float_wav(path: &Path, sample_rate: u32, samples: &[f32]) {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

fn read_wav(path: &Path) -> (WavSpec, Vec<f32>) {
    let mut reader = WavReader::open(path).unwrap();
    let spec = reader.spec();
    let samples = reader.samples::<f32>().map(|s| s.unwrap()).collect();
    (spec, samples)
}

#[test]
fn test_default_rig_render_applies_input_gain() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");
    write_float_wav(&input, 44100, &[0.0, 0.1, -0.1, 0.05]);

    let mut chain = build_default_chain(44100, 2.0).unwrap();
    let stats = render_file(&mut chain, &input, &output, &RenderConfig::default()).unwrap();
    assert_eq!(stats.frames, 4);

    let (spec, samples) = read_wav(&output);
    assert_eq!(spec.sample_rate, 44100);
    assert_eq!(spec.channels, 2);
    assert_eq!(samples, vec![0.0, 0.0, 0.2, 0.2, -0.2, -0.2, 0.1, 0.1]);
}

#[test]
fn test_render_command_enables_distortion() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");
    write_float_wav(&input, 48000, &[0.5, -0.5, 0.001]);

    // Input gain 5 and distortion gain 8 clip everything but the last sample
    let config = EngineConfig::default();
    commands::render(&config, &input, &output, &[1]).unwrap();

    let (_, samples) = read_wav(&output);
    assert_eq!(samples.len(), 6);
    assert_eq!(samples[0], 0.4);
    assert_eq!(samples[2], -0.4);
    assert!((samples[4] - 0.04).abs() < 1e-6);
}

#[test]
fn test_render_command_rejects_unknown_slot() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.wav");
    write_float_wav(&input, 48000, &[0.0]);

    let config = EngineConfig::default();
    assert!(commands::render(&config, &input, &dir.path().join("a.wav"), &[4]).is_err());
    assert!(commands::render(&config, &input, &dir.path().join("b.wav"), &[0]).is_err());
}
