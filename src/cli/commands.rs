//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::io;
use std::path::Path;

use crate::cli::control::run_control_loop;
use crate::engine::{
    build_default_chain, list_devices, render_file, wav_sample_rate, AudioHost, Direction,
    EngineConfig, ShutdownToken,
};
use crate::error::{FxError, Result};

/// Stream live input through the default rig until the user quits.
pub fn run(config: &EngineConfig) -> Result<()> {
    let chain = build_default_chain(config.host.sample_rate, config.input_gain)?;
    let controls = chain.chain_controls();
    let shutdown = ShutdownToken::new();

    let host = AudioHost::start(&config.host, chain, shutdown.clone())?;

    let stdin = io::stdin();
    run_control_loop(&controls, stdin.lock(), io::stdout(), &shutdown)?;

    let status = host.status();
    host.wait();

    if !status.is_clean() {
        println!(
            "Session glitches: {} overrun, {} underrun, {} stream error(s)",
            status.overruns, status.underruns, status.stream_errors
        );
    }
    Ok(())
}

/// Render a WAV file through the default rig.
///
/// # Arguments
/// * `enable` - 1-based slot numbers to switch on before rendering
pub fn render(config: &EngineConfig, input: &Path, output: &Path, enable: &[usize]) -> Result<()> {
    let sample_rate = wav_sample_rate(input)?;
    let mut chain = build_default_chain(sample_rate, config.input_gain)?;

    for &slot in enable {
        let enabled = slot
            .checked_sub(1)
            .is_some_and(|index| chain.enable_effect(index, true));
        if !enabled {
            return Err(FxError::InvalidConfig {
                reason: format!("no effect at slot {slot} (chain has {})", chain.len()),
            });
        }
    }

    let stats = render_file(&mut chain, input, output, &config.render)?;

    println!("Rendered: {}", output.display());
    println!(
        "  {} frames ({:.2} s) at {} Hz",
        stats.frames,
        stats.duration_secs(),
        stats.sample_rate
    );
    println!("  Peak in: {:.3}  Peak out: {:.3}", stats.peak_in, stats.peak_out);

    Ok(())
}

/// Print available audio devices.
pub fn devices() -> Result<()> {
    let devices = list_devices()?;

    for direction in [Direction::Input, Direction::Output] {
        println!("{} devices:", direction.as_str());
        let mut any = false;
        for device in devices.iter().filter(|d| d.direction == direction) {
            println!("  {device}");
            any = true;
        }
        if !any {
            println!("  (none)");
        }
    }

    Ok(())
}
