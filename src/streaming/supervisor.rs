/*!
 * Stream Supervisor
 *
 * Outer retry loop (open or back off) around an inner consume loop (pull
 * frames until the session fails). Every transient failure ends in a
 * `Reconnecting` status and another attempt; nothing escapes the task.
 */

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{DisplaySink, StreamStats, StreamStatus, SupervisorConfig};
use crate::capture::{CaptureError, CaptureSession, CaptureSource};
use crate::engine::EngineState;

/// Releases the wrapped session when dropped, whichever way the loop exits.
struct SessionGuard<S: CaptureSession>(S);

impl<S: CaptureSession> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.0
    }
}

impl<S: CaptureSession> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.0
    }
}

impl<S: CaptureSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.0.release();
    }
}

#[derive(Debug, Default)]
struct StreamCounters {
    sessions_opened: AtomicU64,
    open_failures: AtomicU64,
    read_failures: AtomicU64,
    frames_displayed: AtomicU64,
    frames_skipped: AtomicU64,
}

/// Why the consume loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsumeExit {
    Stopped,
    Dropped,
}

/// Keeps one capture session alive against a URL.
pub struct StreamSupervisor<C: CaptureSource> {
    source: Arc<C>,
    display: Arc<dyn DisplaySink>,
    config: SupervisorConfig,
    state: EngineState,
    counters: Arc<StreamCounters>,
    started_at: Option<Instant>,
    url: Option<String>,
    task: Option<JoinHandle<()>>,
}

impl<C: CaptureSource> StreamSupervisor<C> {
    pub fn new(source: C, display: Arc<dyn DisplaySink>, config: SupervisorConfig) -> Self {
        Self {
            source: Arc::new(source),
            display,
            config,
            state: EngineState::new(),
            counters: Arc::new(StreamCounters::default()),
            started_at: None,
            url: None,
            task: None,
        }
    }

    /// Replace any running session with one supervising `url`.
    pub async fn start(&mut self, url: impl Into<String>) {
        self.stop().await;

        let url = url.into();
        let Some(state) = self.state.begin() else {
            warn!("Stream supervisor already running");
            return;
        };

        info!("Starting stream supervisor");
        self.started_at = Some(Instant::now());
        self.url = Some(url.clone());
        self.task = Some(tokio::spawn(Self::supervise(
            self.source.clone(),
            url,
            self.display.clone(),
            self.config.clone(),
            state,
            self.counters.clone(),
        )));
    }

    /// Stop supervising and wait for the task to release its session.
    ///
    /// Safe to call when nothing is running. Once this returns the display
    /// receives no further frames and shows the disconnected status.
    pub async fn stop(&mut self) {
        self.state.request_stop();

        if let Some(task) = self.task.take() {
            debug!("Waiting for supervisor task to finish");
            if let Err(e) = task.await {
                warn!("Supervisor task join error: {}", e);
            }
            info!("Stream supervisor stopped");
        }

        self.started_at = None;
        self.display.clear_frame();
        self.display.show_status(StreamStatus::Idle);
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// URL of the current or most recent session
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn stats(&self) -> StreamStats {
        StreamStats {
            sessions_opened: self.counters.sessions_opened.load(Ordering::Relaxed),
            open_failures: self.counters.open_failures.load(Ordering::Relaxed),
            read_failures: self.counters.read_failures.load(Ordering::Relaxed),
            frames_displayed: self.counters.frames_displayed.load(Ordering::Relaxed),
            frames_skipped: self.counters.frames_skipped.load(Ordering::Relaxed),
            uptime_secs: self
                .started_at
                .map(|start| start.elapsed().as_secs())
                .unwrap_or(0),
        }
    }

    /// Outer retry loop
    async fn supervise(
        source: Arc<C>,
        url: String,
        display: Arc<dyn DisplaySink>,
        config: SupervisorConfig,
        state: EngineState,
        counters: Arc<StreamCounters>,
    ) {
        info!(backoff_ms = config.backoff.as_millis() as u64, "Supervisor loop started");

        while state.is_running() {
            display.show_status(StreamStatus::Opening);

            let opened = tokio::select! {
                _ = state.cancelled() => break,
                result = source.open(&url) => result,
            };

            match opened {
                Ok(session) => {
                    let mut session = SessionGuard(session);
                    if session.is_open() {
                        counters.sessions_opened.fetch_add(1, Ordering::Relaxed);
                        info!("Stream connected");
                        display.show_status(StreamStatus::Connected);

                        let exit =
                            Self::consume(&mut session, &display, &config, &state, &counters).await;
                        if exit == ConsumeExit::Stopped {
                            break;
                        }
                    } else {
                        counters.open_failures.fetch_add(1, Ordering::Relaxed);
                        warn!("Capture session opened but not ready");
                    }
                }
                Err(e) => {
                    counters.open_failures.fetch_add(1, Ordering::Relaxed);
                    Self::absorb("open", &e);
                }
            }

            if !state.is_running() {
                break;
            }
            display.show_status(StreamStatus::Reconnecting);
            if !state.sleep(config.backoff).await {
                break;
            }
        }

        info!("Supervisor loop stopped");
    }

    /// Inner consume loop; returns once the session fails or a stop arrives.
    async fn consume(
        session: &mut SessionGuard<C::Session>,
        display: &Arc<dyn DisplaySink>,
        config: &SupervisorConfig,
        state: &EngineState,
        counters: &StreamCounters,
    ) -> ConsumeExit {
        while state.is_running() && session.is_open() {
            let pulled = tokio::select! {
                _ = state.cancelled() => return ConsumeExit::Stopped,
                result = session.read_frame() => result,
            };

            let raw = match pulled {
                Ok(raw) => raw,
                Err(e) => {
                    counters.read_failures.fetch_add(1, Ordering::Relaxed);
                    Self::absorb("read", &e);
                    return ConsumeExit::Dropped;
                }
            };

            match raw.to_display(config.display_width, config.display_height) {
                Ok(frame) if state.is_running() => {
                    debug!(sequence = frame.sequence, "Displaying frame");
                    display.show_frame(frame);
                    counters.frames_displayed.fetch_add(1, Ordering::Relaxed);
                }
                Ok(_) => return ConsumeExit::Stopped,
                Err(e) => {
                    counters.frames_skipped.fetch_add(1, Ordering::Relaxed);
                    warn!(sequence = raw.sequence, "Skipping frame: {}", e);
                }
            }
        }

        if state.is_running() {
            counters.read_failures.fetch_add(1, Ordering::Relaxed);
            warn!("Capture session closed");
            ConsumeExit::Dropped
        } else {
            ConsumeExit::Stopped
        }
    }

    fn absorb(stage: &str, e: &CaptureError) {
        if e.is_transient() {
            warn!(stage, "Capture failed, will retry: {}", e);
        } else {
            error!(stage, "Capture unavailable, will keep retrying: {}", e);
        }
    }
}

impl<C: CaptureSource> Drop for StreamSupervisor<C> {
    fn drop(&mut self) {
        self.state.request_stop();
    }
}
