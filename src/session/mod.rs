//! Live recording session management
//!
//! This module provides the `RecordingSession` controller that manages:
//! - Device acquisition and exclusive stream ownership
//! - The continuous audio-activity loop
//! - The recorder's fragment pipeline and flush ordering
//! - Question navigation for the teleprompter flow
//! - The lifecycle state machine, including teardown on every exit path

mod config;
mod controller;
mod snapshot;
mod state;

pub use config::SessionConfig;
pub use controller::RecordingSession;
pub use snapshot::SessionSnapshot;
pub use state::SessionState;
