/*!
 * Latency Sampler
 *
 * Probes the current target once per interval and records every parsed
 * round-trip time in a bounded history. Failed probes leave no trace beyond
 * the missing sample.
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::probe::{parse_round_trip, Probe, ProbeError};
use super::{ChartSink, LatencySample, SamplerConfig, SamplerStats};
use crate::engine::EngineState;
use crate::history::BoundedHistory;

#[derive(Debug, Default)]
struct SamplerCounters {
    probes: AtomicU64,
    samples: AtomicU64,
    failures: AtomicU64,
}

type SharedHistory = Arc<Mutex<BoundedHistory<LatencySample>>>;

fn lock(history: &SharedHistory) -> MutexGuard<'_, BoundedHistory<LatencySample>> {
    history.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Background round-trip sampler for one target host.
pub struct LatencySampler<P: Probe> {
    probe: Arc<P>,
    chart: Arc<dyn ChartSink>,
    config: SamplerConfig,
    state: EngineState,
    target: watch::Sender<String>,
    history: SharedHistory,
    counters: Arc<SamplerCounters>,
    task: Option<JoinHandle<()>>,
}

impl<P: Probe> LatencySampler<P> {
    pub fn new(probe: P, chart: Arc<dyn ChartSink>, config: SamplerConfig) -> Self {
        let history = BoundedHistory::new(config.history_capacity);
        let (target, _) = watch::channel(String::new());
        Self {
            probe: Arc::new(probe),
            chart,
            config,
            state: EngineState::new(),
            target,
            history: Arc::new(Mutex::new(history)),
            counters: Arc::new(SamplerCounters::default()),
            task: None,
        }
    }

    /// Point the sampler at `host` and start probing if not already running.
    ///
    /// A running sampler picks the new host up on its next iteration; no
    /// second task is spawned.
    pub fn start(&mut self, host: impl Into<String>) {
        self.set_target(host);

        let Some(state) = self.state.begin() else {
            debug!("Latency sampler already running");
            return;
        };

        info!(target_host = %self.target.borrow().as_str(), "Starting latency sampler");
        self.task = Some(tokio::spawn(Self::sample_loop(
            self.probe.clone(),
            self.chart.clone(),
            self.config.clone(),
            state,
            self.target.subscribe(),
            self.history.clone(),
            self.counters.clone(),
        )));
    }

    /// Change the probed host; takes effect on the next iteration.
    pub fn set_target(&self, host: impl Into<String>) {
        self.target.send_replace(host.into().trim().to_string());
    }

    pub fn target(&self) -> String {
        self.target.borrow().clone()
    }

    /// Request the loop to end and wait for it.
    pub async fn stop(&mut self) {
        self.state.request_stop();

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Sampler task join error: {}", e);
            }
            info!("Latency sampler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Oldest-first copy of the retained samples
    pub fn history(&self) -> Vec<LatencySample> {
        lock(&self.history).snapshot()
    }

    pub fn latest(&self) -> Option<LatencySample> {
        lock(&self.history).latest().cloned()
    }

    pub fn stats(&self) -> SamplerStats {
        SamplerStats {
            probes: self.counters.probes.load(Ordering::Relaxed),
            samples: self.counters.samples.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }

    async fn sample_loop(
        probe: Arc<P>,
        chart: Arc<dyn ChartSink>,
        config: SamplerConfig,
        state: EngineState,
        target: watch::Receiver<String>,
        history: SharedHistory,
        counters: Arc<SamplerCounters>,
    ) {
        info!(interval_ms = config.interval.as_millis() as u64, "Sampler loop started");

        while state.is_running() {
            let host = target.borrow().clone();
            counters.probes.fetch_add(1, Ordering::Relaxed);

            let measured = tokio::select! {
                _ = state.cancelled() => break,
                result = Self::measure(probe.as_ref(), &host, config.probe_timeout) => result,
            };

            match measured {
                Ok(value_ms) => {
                    let sample = LatencySample::now(value_ms);
                    debug!(host = %host, value_ms, "Latency sample");

                    let snapshot = {
                        let mut history = lock(&history);
                        history.push(sample);
                        history.snapshot()
                    };
                    counters.samples.fetch_add(1, Ordering::Relaxed);

                    if state.is_running() {
                        chart.redraw(&snapshot);
                    }
                }
                Err(e) => {
                    counters.failures.fetch_add(1, Ordering::Relaxed);
                    if e.is_transient() {
                        debug!(host = %host, "Latency unavailable: {}", e);
                    } else {
                        warn!(host = %host, "Latency unavailable: {}", e);
                    }
                }
            }

            if !state.sleep(config.interval).await {
                break;
            }
        }

        info!("Sampler loop stopped");
    }

    /// One probe, bounded by `timeout`, parsed into milliseconds.
    async fn measure(probe: &P, host: &str, timeout: Duration) -> Result<f64, ProbeError> {
        if host.is_empty() {
            return Err(ProbeError::NoTarget);
        }

        let output = tokio::time::timeout(timeout, probe.probe(host))
            .await
            .map_err(|_| ProbeError::Timeout(timeout))??;

        parse_round_trip(&output).ok_or(ProbeError::Unparsable)
    }
}

impl<P: Probe> Drop for LatencySampler<P> {
    fn drop(&mut self) {
        self.state.request_stop();
    }
}
