//! Recording doubles for the probe, capture and sink seams.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::capture::{CaptureError, CaptureSession, CaptureSource};
use crate::latency::{ChartSink, LatencySample, Probe, ProbeError};
use crate::streaming::{DisplaySink, StreamStatus};
use crate::video::{DisplayFrame, PixelFormat, RawFrame};

/// Probe answering from a fixed script, then failing.
#[derive(Clone, Default)]
pub struct ScriptedProbe {
    inner: Arc<ProbeScript>,
}

#[derive(Default)]
struct ProbeScript {
    outputs: Mutex<VecDeque<Result<String, ProbeError>>>,
    repeat: Option<String>,
    stalls: usize,
    calls: AtomicUsize,
    hosts: Mutex<Vec<String>>,
}

impl ScriptedProbe {
    pub fn new(outputs: Vec<Result<String, ProbeError>>) -> Self {
        Self {
            inner: Arc::new(ProbeScript {
                outputs: Mutex::new(outputs.into()),
                ..ProbeScript::default()
            }),
        }
    }

    /// Probe that always answers with `output`.
    pub fn repeating(output: &str) -> Self {
        Self {
            inner: Arc::new(ProbeScript {
                repeat: Some(output.to_string()),
                ..ProbeScript::default()
            }),
        }
    }

    /// Probe whose first `stalls` calls never answer, then answers `output`.
    pub fn stalling(stalls: usize, output: &str) -> Self {
        Self {
            inner: Arc::new(ProbeScript {
                repeat: Some(output.to_string()),
                stalls,
                ..ProbeScript::default()
            }),
        }
    }

    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    pub fn hosts(&self) -> Vec<String> {
        self.inner.hosts.lock().unwrap().clone()
    }
}

impl Probe for ScriptedProbe {
    async fn probe(&self, host: &str) -> Result<String, ProbeError> {
        let call = self.inner.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.hosts.lock().unwrap().push(host.to_string());
        if call < self.inner.stalls {
            std::future::pending::<()>().await;
        }
        let next = self.inner.outputs.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => match &self.inner.repeat {
                Some(output) => Ok(output.clone()),
                None => Err(ProbeError::Exit(Some(1))),
            },
        }
    }
}

#[derive(Default)]
pub struct RecordingChart {
    redraws: Mutex<Vec<Vec<LatencySample>>>,
}

impl RecordingChart {
    pub fn redraws(&self) -> usize {
        self.redraws.lock().unwrap().len()
    }

    pub fn last(&self) -> Vec<LatencySample> {
        self.redraws.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

impl ChartSink for RecordingChart {
    fn redraw(&self, history: &[LatencySample]) {
        self.redraws.lock().unwrap().push(history.to_vec());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    Frame { sequence: u64, width: u32, height: u32 },
    Status(StreamStatus),
    Cleared,
}

#[derive(Default)]
pub struct RecordingDisplay {
    events: Mutex<Vec<DisplayEvent>>,
}

impl RecordingDisplay {
    pub fn events(&self) -> Vec<DisplayEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn frames(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, DisplayEvent::Frame { .. }))
            .count()
    }

    pub fn statuses(&self) -> Vec<StreamStatus> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DisplayEvent::Status(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn last_status(&self) -> Option<StreamStatus> {
        self.statuses().last().copied()
    }
}

impl DisplaySink for RecordingDisplay {
    fn show_frame(&self, frame: DisplayFrame) {
        self.events.lock().unwrap().push(DisplayEvent::Frame {
            sequence: frame.sequence,
            width: frame.width(),
            height: frame.height(),
        });
    }

    fn show_status(&self, status: StreamStatus) {
        self.events.lock().unwrap().push(DisplayEvent::Status(status));
    }

    fn clear_frame(&self) {
        self.events.lock().unwrap().push(DisplayEvent::Cleared);
    }
}

/// What the next `open` call does.
#[derive(Debug, Clone)]
pub enum OpenOutcome {
    /// `open` returns an error
    Fail,
    /// `open` succeeds but the session reports not-ready
    NotReady,
    /// Session yields these steps, then a frame every 100ms forever
    Open(Vec<FrameStep>),
    /// Like `Open`, but `open` takes this long; the session counts as live
    /// from the moment the attempt starts
    Slow(Duration, Vec<FrameStep>),
}

#[derive(Debug, Clone, Copy)]
pub enum FrameStep {
    Frame,
    Drop,
}

/// Capture double counting opens, releases and concurrently live sessions.
#[derive(Clone, Default)]
pub struct MockCapture {
    inner: Arc<CaptureScript>,
}

#[derive(Default)]
struct CaptureScript {
    outcomes: Mutex<VecDeque<OpenOutcome>>,
    opens: AtomicUsize,
    releases: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl MockCapture {
    /// Plays `outcomes` in order; once exhausted every open fails.
    pub fn new(outcomes: Vec<OpenOutcome>) -> Self {
        Self {
            inner: Arc::new(CaptureScript {
                outcomes: Mutex::new(outcomes.into()),
                ..CaptureScript::default()
            }),
        }
    }

    pub fn opens(&self) -> usize {
        self.inner.opens.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.inner.releases.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.inner.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.inner.max_live.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.inner.urls.lock().unwrap().clone()
    }
}

impl CaptureSource for MockCapture {
    type Session = MockSession;

    async fn open(&self, url: &str) -> Result<MockSession, CaptureError> {
        self.inner.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.urls.lock().unwrap().push(url.to_string());

        let outcome = self
            .inner
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(OpenOutcome::Fail);

        let (delay, steps, open) = match outcome {
            OpenOutcome::Fail => {
                return Err(CaptureError::NotReady("connection refused".into()))
            }
            OpenOutcome::NotReady => (Duration::ZERO, VecDeque::new(), false),
            OpenOutcome::Open(steps) => (Duration::ZERO, steps.into(), true),
            OpenOutcome::Slow(delay, steps) => (delay, steps.into(), true),
        };

        let live = self.inner.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_live.fetch_max(live, Ordering::SeqCst);
        let mut pending = PendingOpen {
            script: self.inner.clone(),
            armed: true,
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        pending.armed = false;

        Ok(MockSession {
            script: self.inner.clone(),
            steps,
            open,
            released: false,
            sequence: 0,
        })
    }
}

/// Gives back the live slot of an open attempt dropped before it finished.
struct PendingOpen {
    script: Arc<CaptureScript>,
    armed: bool,
}

impl Drop for PendingOpen {
    fn drop(&mut self) {
        if self.armed {
            self.script.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

pub struct MockSession {
    script: Arc<CaptureScript>,
    steps: VecDeque<FrameStep>,
    open: bool,
    released: bool,
    sequence: u64,
}

impl MockSession {
    fn next_frame(&mut self) -> RawFrame {
        self.sequence += 1;
        RawFrame::new(vec![0u8; 16 * 8 * 3], 16, 8, PixelFormat::BGR24, self.sequence)
    }
}

impl CaptureSession for MockSession {
    fn is_open(&self) -> bool {
        self.open
    }

    async fn read_frame(&mut self) -> Result<RawFrame, CaptureError> {
        match self.steps.pop_front() {
            Some(FrameStep::Frame) => Ok(self.next_frame()),
            Some(FrameStep::Drop) => {
                self.open = false;
                Err(CaptureError::EndOfStream)
            }
            None => {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(self.next_frame())
            }
        }
    }

    fn release(&mut self) {
        self.open = false;
        if !self.released {
            self.released = true;
            self.script.releases.fetch_add(1, Ordering::SeqCst);
            self.script.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
