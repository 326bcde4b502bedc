/*!
 * camwatch Library
 *
 * Latency sampling and a self-healing camera preview, each driven by a
 * cancellable background engine that hands its output to a sink.
 */

pub mod capture;
pub mod config;
pub mod endpoint;
pub mod engine;
pub mod history;
pub mod latency;
pub mod logging;
pub mod platform;
pub mod sinks;
pub mod streaming;
pub mod video;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use capture::{CaptureError, CaptureSession, CaptureSource, FfmpegCapture};
pub use endpoint::{Channel, ConfigError, Credentials, StreamEndpoint, StreamProfile, VendorPreset};
pub use engine::EngineState;
pub use history::BoundedHistory;
pub use latency::{ChartSink, LatencySample, LatencySampler, Probe, ProbeError, SystemPing};
pub use sinks::{WatchChart, WatchDisplay};
pub use streaming::{DisplaySink, StreamStatus, StreamSupervisor};
pub use video::{DisplayFrame, RawFrame};
