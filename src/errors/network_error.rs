//! Network-related error types.

use thiserror::Error;

/// Errors that can occur while building or evaluating a network.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Channel mismatch at {junction}: expected {expected}, got {actual}")]
    ChannelMismatch {
        junction: String,
        expected: usize,
        actual: usize,
    },

    #[error("Shape mismatch at {junction}: {left:?} vs {right:?}")]
    ShapeMismatch {
        junction: String,
        left: [usize; 4],
        right: [usize; 4],
    },

    #[error("Invalid input shape {dims:?}: height and width must be non-zero multiples of {multiple}")]
    InvalidInputShape { dims: [usize; 4], multiple: usize },

    #[error("{block}: output channels {channels} are not divisible by {divisor}")]
    IndivisibleChannels {
        block: &'static str,
        channels: usize,
        divisor: usize,
    },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NetworkError {
    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        NetworkError::InvalidConfig {
            message: message.into(),
        }
    }
}
