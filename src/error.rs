//! Error handling for fxchain
//!
//! Configuration errors are returned at the setter boundary and never leave
//! the chain in a modified state. Stream errors are fatal to the audio
//! session only.

use thiserror::Error;

use crate::dsp::ParamRange;

/// Result type alias for fxchain operations
pub type Result<T> = std::result::Result<T, FxError>;

/// Main error type for fxchain operations
#[derive(Error, Debug)]
pub enum FxError {
    // Parameter Errors
    #[error("{effect} {param} = {value} is outside {range}")]
    ParameterOutOfRange {
        effect: &'static str,
        param: &'static str,
        value: f32,
        range: ParamRange,
    },

    #[error("{effect} has no parameter '{param}'")]
    UnsupportedParameter {
        effect: &'static str,
        param: String,
    },

    #[error("{param} expects a {expected} value")]
    ParameterType {
        param: &'static str,
        expected: &'static str,
    },

    #[error("Invalid sample rate: {sample_rate} Hz")]
    InvalidSampleRate { sample_rate: u32 },

    #[error("{effect} already has a buffer change waiting for the audio thread")]
    ResizePending { effect: &'static str },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // Device / Stream Errors
    #[error("No {direction} device available")]
    NoDevice { direction: &'static str },

    #[error("Audio device not found: {name}")]
    DeviceNotFound { name: String },

    #[error("Unsupported sample format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Failed to enumerate devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("Failed to read device name: {0}")]
    DeviceName(#[from] cpal::DeviceNameError),

    #[error("Failed to query device configuration: {0}")]
    DeviceConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("Failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    // File Errors
    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<hound::Error>,
    },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FxError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::ParameterOutOfRange { .. } => "PARAMETER_OUT_OF_RANGE",
            FxError::UnsupportedParameter { .. } => "UNSUPPORTED_PARAMETER",
            FxError::ParameterType { .. } => "PARAMETER_TYPE",
            FxError::InvalidSampleRate { .. } => "INVALID_SAMPLE_RATE",
            FxError::ResizePending { .. } => "RESIZE_PENDING",
            FxError::InvalidConfig { .. } => "INVALID_CONFIG",
            FxError::NoDevice { .. } => "NO_DEVICE",
            FxError::DeviceNotFound { .. } => "DEVICE_NOT_FOUND",
            FxError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            FxError::Devices(_) => "DEVICES_ERROR",
            FxError::DeviceName(_) => "DEVICE_NAME_ERROR",
            FxError::DeviceConfig(_) => "DEVICE_CONFIG_ERROR",
            FxError::BuildStream(_) => "BUILD_STREAM_ERROR",
            FxError::PlayStream(_) => "PLAY_STREAM_ERROR",
            FxError::InvalidAudio { .. } => "INVALID_AUDIO",
            FxError::Io(_) => "IO_ERROR",
            FxError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors leave the running session untouched; the caller can
    /// simply retry with different input.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FxError::ParameterOutOfRange { .. }
                | FxError::UnsupportedParameter { .. }
                | FxError::ParameterType { .. }
                | FxError::ResizePending { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            FxError::ParameterOutOfRange { .. } => vec![
                "Use 'show <n>' to see the valid range of each parameter",
                "The previous value is still in effect",
            ],
            FxError::UnsupportedParameter { .. } => {
                vec!["Use 'show <n>' to list the parameters of an effect"]
            }
            FxError::ResizePending { .. } => vec![
                "Wait a moment for the audio thread to pick up the last change",
                "Check that the audio stream is running",
            ],
            FxError::NoDevice { .. } | FxError::DeviceNotFound { .. } => vec![
                "Run 'fxchain-cli devices' to list available devices",
                "Check that the audio interface is connected",
            ],
            FxError::UnsupportedFormat { .. } => vec![
                "Supported sample formats: f32, i16, u16",
                "Try a different device or driver",
            ],
            FxError::BuildStream(_) | FxError::PlayStream(_) => vec![
                "Try a larger --buffer-frames value",
                "Try a sample rate the device supports natively",
            ],
            FxError::InvalidAudio { .. } => vec![
                "Convert the file to PCM or float WAV first",
                "Check if the file plays in another application",
            ],
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = FxError::InvalidSampleRate { sample_rate: 0 };
        assert_eq!(err.error_code(), "INVALID_SAMPLE_RATE");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_out_of_range_message() {
        let err = FxError::ParameterOutOfRange {
            effect: "distortion",
            param: "mix",
            value: 1.5,
            range: ParamRange::inclusive(0.0, 1.0),
        };
        assert_eq!(err.to_string(), "distortion mix = 1.5 is outside [0, 1]");
        assert!(err.is_recoverable());
        assert!(!err.recovery_suggestions().is_empty());
    }
}
