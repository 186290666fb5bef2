// Message types published on the command topic

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

// Bare velocity command: linear xyz + angular xyz
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Twist {
    pub linear: Vector3,
    pub angular: Vector3,
}

impl Twist {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }
}

/// Wall-clock time split into seconds and nanoseconds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Time {
    pub sec: i32,
    pub nanosec: u32,
}

impl Time {
    pub fn now() -> Self {
        // A clock set before 1970 is reported as the epoch
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::from_epoch(since_epoch)
    }

    /// `sec` is an int32 on the wire; times past 2038 saturate
    pub fn from_epoch(since_epoch: Duration) -> Self {
        Self {
            sec: i32::try_from(since_epoch.as_secs()).unwrap_or(i32::MAX),
            nanosec: since_epoch.subsec_nanos(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Header {
    pub stamp: Time,
    pub frame_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TwistStamped {
    pub header: Header,
    pub twist: Twist,
}

/// What goes out on the wire each tick
// untagged: the payload is exactly a Twist or a TwistStamped
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OutgoingCommand {
    Stamped(TwistStamped),
    Bare(Twist),
}

impl OutgoingCommand {
    pub fn twist(&self) -> &Twist {
        match self {
            OutgoingCommand::Bare(twist) => twist,
            OutgoingCommand::Stamped(stamped) => &stamped.twist,
        }
    }

    pub fn header(&self) -> Option<&Header> {
        match self {
            OutgoingCommand::Bare(_) => None,
            OutgoingCommand::Stamped(stamped) => Some(&stamped.header),
        }
    }
}
