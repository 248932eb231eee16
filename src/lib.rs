//! fxchain - Real-Time Effect Chain
//!
//! A mono guitar-style effect chain (distortion, chorus, delay) that runs
//! inside a live audio callback while being adjusted from a control thread.
//!
//! # Architecture
//!
//! - `dsp`: per-sample effects, the chain, and their thread-safe control handles
//! - `engine`: live `cpal` host, offline WAV renderer, configuration
//! - `cli`: command-line front-end and the interactive control loop

pub mod cli;
pub mod dsp;
pub mod engine;
pub mod error;

pub use error::{FxError, Result};
