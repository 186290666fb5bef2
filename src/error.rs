// Error types for configuration and the teleop session

use std::io;

/// Rejected startup parameters
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("'frame_id' ({frame_id:?}) can only be set when 'stamped' is enabled")]
    FrameIdWithoutStamped { frame_id: String },

    #[error("repeat rate must be a positive number of Hz, got {0}")]
    InvalidRepeatRate(f64),
}

/// Anything that ends a teleop session early
#[derive(Debug, thiserror::Error)]
pub enum TeleopError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Terminal error: {0}")]
    Terminal(#[from] io::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] zenoh::Error),

    #[error("Failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Publish queue closed")]
    QueueClosed,

    #[error("Keyboard reader thread panicked")]
    ReaderPanicked,
}
