//! Audio Engine Module
//!
//! Everything around the effect chain:
//! - Live duplex streaming through `cpal`
//! - Offline WAV rendering
//! - Configuration and the stock rig
//! - Shutdown signalling

pub mod config;
pub mod host;
pub mod render;
pub mod rig;
pub mod shutdown;

pub use config::{EngineConfig, HostConfig, RenderConfig};
pub use host::{
    list_devices, AudioHost, CallbackProcessor, DeviceInfo, Direction, InputCapture,
    StatusSnapshot, StreamStatus,
};
pub use render::{render_file, wav_sample_rate, RenderStats};
pub use rig::build_default_chain;
pub use shutdown::ShutdownToken;
