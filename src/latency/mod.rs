/*!
 * Latency Module
 *
 * Periodic round-trip sampling against a single host, retained as a bounded
 * history for the trend chart.
 */

pub mod probe;
pub mod sampler;

pub use probe::{parse_round_trip, Probe, ProbeError, SystemPing};
pub use sampler::LatencySampler;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::history::DEFAULT_HISTORY_CAPACITY;

/// One successful round-trip measurement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySample {
    pub timestamp: DateTime<Utc>,
    pub value_ms: f64,
}

impl LatencySample {
    /// Sample stamped with the current time. Negative values clamp to zero.
    pub fn now(value_ms: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            value_ms: value_ms.max(0.0),
        }
    }

    /// Text for the latency label, e.g. `Ping: 12.30 ms`
    pub fn label(&self) -> String {
        format!("Ping: {:.2} ms", self.value_ms)
    }
}

/// Consumer of the latency history.
///
/// Called from the sampler task after every recorded sample with the
/// complete, oldest-first history.
pub trait ChartSink: Send + Sync + 'static {
    fn redraw(&self, history: &[LatencySample]);
}

/// Sampler timing configuration
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Delay between probes
    pub interval: Duration,
    /// Upper bound on a single probe
    pub probe_timeout: Duration,
    /// Number of samples retained
    pub history_capacity: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            probe_timeout: Duration::from_secs(3),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// Sampler statistics
#[derive(Debug, Clone, Default)]
pub struct SamplerStats {
    /// Probes attempted
    pub probes: u64,
    /// Samples recorded
    pub samples: u64,
    /// Probes that produced no sample
    pub failures: u64,
}
