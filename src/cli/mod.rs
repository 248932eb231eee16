//! CLI Module
//!
//! Command-line interface for the fxchain effect processor.

pub mod commands;
pub mod control;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::engine::EngineConfig;
use crate::error::Result;

/// fxchain - real-time guitar effect chain
#[derive(Parser, Debug)]
#[command(name = "fxchain")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Sample rate in Hz (live mode)
    #[arg(long, global = true)]
    pub sample_rate: Option<u32>,

    /// Device buffer size in frames (live mode)
    #[arg(long, global = true)]
    pub buffer_frames: Option<u32>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process live input and control the chain interactively (default)
    #[command(name = "run")]
    Run(RunArgs),

    /// Process a WAV file through the chain
    #[command(name = "render")]
    Render {
        /// Input WAV file
        input: PathBuf,

        /// Output WAV file (32-bit float)
        output: PathBuf,

        /// Slots to enable, 1-based (e.g. --enable 1,3)
        #[arg(short, long, value_delimiter = ',')]
        enable: Vec<usize>,

        /// Input gain applied before the first effect
        #[arg(short, long)]
        gain: Option<f32>,
    },

    /// List audio devices
    #[command(name = "devices")]
    Devices,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Output device name
    #[arg(long)]
    pub output_device: Option<String>,

    /// Input channel to process (0-based)
    #[arg(long)]
    pub input_channel: Option<u16>,
}

impl Cli {
    /// Build the engine configuration from the config file and flags
    ///
    /// Flags override file values; the result is validated.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };

        if let Some(sample_rate) = self.sample_rate {
            config.host.sample_rate = sample_rate;
        }
        if let Some(buffer_frames) = self.buffer_frames {
            config.host.buffer_frames = buffer_frames;
        }
        match &self.command {
            Some(Commands::Run(args)) => {
                if let Some(name) = &args.input_device {
                    config.host.input_device = Some(name.clone());
                }
                if let Some(name) = &args.output_device {
                    config.host.output_device = Some(name.clone());
                }
                if let Some(channel) = args.input_channel {
                    config.host.input_channel = channel;
                }
            }
            Some(Commands::Render {
                gain: Some(gain), ..
            }) => {
                config.input_gain = *gain;
            }
            _ => {}
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::try_parse_from(["fxchain"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "fxchain",
            "--sample-rate",
            "44100",
            "--buffer-frames",
            "128",
            "run",
            "--input-channel",
            "1",
        ])
        .unwrap();
        let config = cli.engine_config().unwrap();
        assert_eq!(config.host.sample_rate, 44100);
        assert_eq!(config.host.buffer_frames, 128);
        assert_eq!(config.host.input_channel, 1);
    }

    #[test]
    fn test_render_args() {
        let cli = Cli::try_parse_from([
            "fxchain", "render", "in.wav", "out.wav", "--enable", "1,3", "--gain", "2",
        ])
        .unwrap();
        match &cli.command {
            Some(Commands::Render { enable, .. }) => assert_eq!(enable, &[1, 3]),
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.engine_config().unwrap().input_gain, 2.0);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let cli = Cli::try_parse_from(["fxchain", "--sample-rate", "0"]).unwrap();
        assert!(cli.engine_config().is_err());
    }
}
