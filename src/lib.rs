// Keyboard teleoperation for mobile robots over zenoh
//
// keystroke -> keyboard::InputReader -> state::SharedState -> publisher::CommandPublisher -> zenoh

pub mod bindings;
pub mod config;
pub mod error;
pub mod keyboard;
pub mod messages;
pub mod publisher;
pub mod runtime;
pub mod state;
