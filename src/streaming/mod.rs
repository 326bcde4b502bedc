/*!
 * Streaming Module
 *
 * Keeps a live camera preview running: opens the stream, forwards decoded
 * frames to the display and reconnects whenever the stream drops.
 */

pub mod supervisor;

pub use supervisor::StreamSupervisor;

use std::time::Duration;

use serde::Serialize;

use crate::video::{DisplayFrame, DISPLAY_HEIGHT, DISPLAY_WIDTH};

/// Connection state of the stream supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum StreamStatus {
    /// No supervisor task running
    #[default]
    Idle,
    /// Capture session being opened
    Opening,
    /// Frames flowing
    Connected,
    /// Waiting out the backoff before the next attempt
    Reconnecting,
}

/// Colour shown next to the status text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Indicator {
    Red,
    Yellow,
    Green,
    Orange,
}

impl StreamStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StreamStatus::Idle => "Stream: Disconnected",
            StreamStatus::Opening => "Connecting...",
            StreamStatus::Connected => "Connected",
            StreamStatus::Reconnecting => "Reconnecting...",
        }
    }

    pub fn indicator(&self) -> Indicator {
        match self {
            StreamStatus::Idle => Indicator::Red,
            StreamStatus::Opening => Indicator::Yellow,
            StreamStatus::Connected => Indicator::Green,
            StreamStatus::Reconnecting => Indicator::Orange,
        }
    }
}

/// Consumer of preview frames and connection status.
///
/// Called from the supervisor task; implementations hand the data over to
/// whatever thread renders it. A new frame replaces the previous one.
pub trait DisplaySink: Send + Sync + 'static {
    fn show_frame(&self, frame: DisplayFrame);
    fn show_status(&self, status: StreamStatus);
    fn clear_frame(&self);
}

/// Supervisor configuration
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Delay before each reconnect attempt
    pub backoff: Duration,
    /// Width of frames handed to the display
    pub display_width: u32,
    /// Height of frames handed to the display
    pub display_height: u32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(2),
            display_width: DISPLAY_WIDTH,
            display_height: DISPLAY_HEIGHT,
        }
    }
}

/// Stream statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct StreamStats {
    /// Sessions that opened successfully
    pub sessions_opened: u64,
    /// Failed open attempts
    pub open_failures: u64,
    /// Sessions ended by a failed frame pull
    pub read_failures: u64,
    /// Frames handed to the display
    pub frames_displayed: u64,
    /// Frames that could not be converted for display
    pub frames_skipped: u64,
    /// Seconds since the current supervisor task started
    pub uptime_secs: u64,
}
