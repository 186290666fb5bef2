// Topics, rates, initial speeds and command line parameters
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::error::ConfigError;

// Publish loop frequency (Hz)
pub const DEFAULT_REPEAT_RATE: f64 = 10.0;

// Zenoh topic the commands go out on
pub const DEFAULT_TOPIC: &str = "cmd_vel";

// Messages buffered between the publish timer and the transport
pub const PUBLISH_QUEUE_DEPTH: usize = 10;

// Initial scale factors
pub const INITIAL_SPEED: f64 = 0.5; // linear
pub const INITIAL_TURN: f64 = 1.0; // angular

// Help banner is shown again after this many speed adjustments
pub const HELP_REPEAT_EVERY: u32 = 15;

// How long a single key read may block before the reader checks for shutdown
pub const KEY_POLL_INTERVAL: Duration = Duration::from_millis(100);

// Upper bound on waiting for the reader thread at shutdown
pub const READER_JOIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Keyboard teleoperation: publishes velocity commands from keystrokes
#[derive(Debug, Clone, Parser)]
#[command(name = "teleop-twist-keyboard", version)]
pub struct Args {
    /// Publish TwistStamped (header + twist) instead of a bare Twist
    #[arg(long)]
    pub stamped: bool,

    /// Frame id put in the header; only valid together with --stamped
    #[arg(long, default_value = "")]
    pub frame_id: String,

    /// Publish frequency in Hz
    #[arg(long, default_value_t = DEFAULT_REPEAT_RATE)]
    pub repeat_rate: f64,

    /// Zenoh key expression to publish on
    #[arg(long, default_value = DEFAULT_TOPIC)]
    pub topic: String,

    /// Optional zenoh configuration file (JSON5)
    #[arg(long)]
    pub zenoh_config: Option<PathBuf>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            stamped: false,
            frame_id: String::new(),
            repeat_rate: DEFAULT_REPEAT_RATE,
            topic: DEFAULT_TOPIC.to_string(),
            zenoh_config: None,
        }
    }
}

impl Args {
    /// Check parameter combinations and build the session configuration
    pub fn validate(self) -> Result<TeleopConfig, ConfigError> {
        if !self.stamped && !self.frame_id.is_empty() {
            return Err(ConfigError::FrameIdWithoutStamped {
                frame_id: self.frame_id,
            });
        }
        if !self.repeat_rate.is_finite() || self.repeat_rate <= 0.0 {
            return Err(ConfigError::InvalidRepeatRate(self.repeat_rate));
        }

        Ok(TeleopConfig {
            frame: self.stamped.then_some(self.frame_id),
            repeat_rate: self.repeat_rate,
            topic: self.topic,
            zenoh_config: self.zenoh_config,
        })
    }
}

/// Validated settings, fixed for the lifetime of a session
#[derive(Debug, Clone, PartialEq)]
pub struct TeleopConfig {
    /// `Some(frame_id)` when stamped messages are enabled
    pub frame: Option<String>,
    pub repeat_rate: f64,
    pub topic: String,
    pub zenoh_config: Option<PathBuf>,
}

impl TeleopConfig {
    pub fn stamped(&self) -> bool {
        self.frame.is_some()
    }

    /// Timer period derived from the repeat rate
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.repeat_rate)
    }
}
