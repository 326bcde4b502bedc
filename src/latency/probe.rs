//! Round-trip probe primitive
//!
//! The sampler delegates measurement to an external `ping` and only parses
//! its textual output.

use std::future::Future;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::platform::single_ping_args;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("No target host configured")]
    NoTarget,

    #[error("Invalid target host: {0}")]
    InvalidTarget(String),

    #[error("Failed to launch probe: {0}")]
    Launch(#[source] std::io::Error),

    #[error("Probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("Probe exited with status {0:?}")]
    Exit(Option<i32>),

    #[error("No round-trip time in probe output")]
    Unparsable,
}

impl ProbeError {
    /// Whether the next attempt can plausibly succeed on its own.
    ///
    /// Every kind is absorbed by the sampler; persistent ones are logged
    /// louder.
    pub fn is_transient(&self) -> bool {
        match self {
            ProbeError::Launch(e) => e.kind() != std::io::ErrorKind::NotFound
                && e.kind() != std::io::ErrorKind::PermissionDenied,
            ProbeError::NoTarget | ProbeError::InvalidTarget(_) => false,
            ProbeError::Timeout(_) | ProbeError::Exit(_) | ProbeError::Unparsable => true,
        }
    }
}

/// Runs one reachability check against `host` and returns its raw output.
pub trait Probe: Send + Sync + 'static {
    fn probe(&self, host: &str) -> impl Future<Output = Result<String, ProbeError>> + Send;
}

/// Probe backed by the operating system's `ping`
#[derive(Debug, Clone)]
pub struct SystemPing {
    program: String,
}

impl SystemPing {
    pub fn new() -> Self {
        Self::with_program("ping")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SystemPing {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for SystemPing {
    async fn probe(&self, host: &str) -> Result<String, ProbeError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(ProbeError::NoTarget);
        }
        if host.starts_with('-') {
            return Err(ProbeError::InvalidTarget(host.to_string()));
        }

        let output = Command::new(&self.program)
            .args(single_ping_args(host))
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(ProbeError::Launch)?;

        if !output.status.success() {
            return Err(ProbeError::Exit(output.status.code()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(host, bytes = stdout.len(), "Probe finished");
        Ok(stdout)
    }
}

fn round_trip_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"time([=<])\s*(\d+\.?\d*)").expect("round-trip pattern is valid")
    })
}

/// Extract the round-trip time in milliseconds from probe output.
///
/// `time=12.3` yields 12.3. A less-than marker (`time<1ms`) only bounds the
/// value, so half the bound is reported.
pub fn parse_round_trip(output: &str) -> Option<f64> {
    let caps = round_trip_pattern().captures(output)?;
    let value: f64 = caps.get(2)?.as_str().parse().ok()?;
    match caps.get(1)?.as_str() {
        "<" => Some(value / 2.0),
        _ => Some(value),
    }
}
