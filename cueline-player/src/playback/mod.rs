//! Playback orchestration
//!
//! [`PlaybackController`] is the state machine behind every command; the
//! position clock task it spawns lives in `position`.

pub mod clock;
pub mod controller;
mod position;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{ClockStats, ControllerConfig, PlaybackController, TransportStatus};
