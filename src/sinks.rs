//! Channel-backed sinks
//!
//! Engines call the sinks from their own tasks; these implementations post
//! the data into `watch` channels so the rendering side always reads the
//! latest value and never sees a half-written one. Slow readers simply skip
//! intermediate updates.

use std::sync::Arc;

use tokio::sync::watch;

use crate::latency::{ChartSink, LatencySample};
use crate::streaming::{DisplaySink, StreamStatus};
use crate::video::DisplayFrame;

pub type LatestFrame = Option<Arc<DisplayFrame>>;

/// Display hand-off: latest frame plus connection status.
#[derive(Debug, Clone)]
pub struct WatchDisplay {
    frame_tx: watch::Sender<LatestFrame>,
    status_tx: watch::Sender<StreamStatus>,
}

impl WatchDisplay {
    pub fn new() -> Self {
        let (frame_tx, _) = watch::channel(None);
        let (status_tx, _) = watch::channel(StreamStatus::Idle);
        Self {
            frame_tx,
            status_tx,
        }
    }

    pub fn subscribe_frames(&self) -> watch::Receiver<LatestFrame> {
        self.frame_tx.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<StreamStatus> {
        self.status_tx.subscribe()
    }

    pub fn status(&self) -> StreamStatus {
        *self.status_tx.borrow()
    }
}

impl Default for WatchDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySink for WatchDisplay {
    fn show_frame(&self, frame: DisplayFrame) {
        self.frame_tx.send_replace(Some(Arc::new(frame)));
    }

    fn show_status(&self, status: StreamStatus) {
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }

    fn clear_frame(&self) {
        self.frame_tx.send_replace(None);
    }
}

/// Chart hand-off: latest history snapshot.
#[derive(Debug, Clone)]
pub struct WatchChart {
    tx: watch::Sender<Arc<[LatencySample]>>,
}

impl WatchChart {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Arc::from(Vec::<LatencySample>::new()));
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<[LatencySample]>> {
        self.tx.subscribe()
    }
}

impl Default for WatchChart {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartSink for WatchChart {
    fn redraw(&self, history: &[LatencySample]) {
        self.tx.send_replace(Arc::from(history));
    }
}

/// Tracks which published frame was last persisted.
///
/// Frames are compared by identity, not sequence number; sequences restart
/// with every capture session.
#[derive(Debug, Default)]
pub struct FrameCursor {
    last: Option<Arc<DisplayFrame>>,
}

impl FrameCursor {
    /// The current frame, unless it is the one last marked.
    pub fn unseen(&self, latest: &LatestFrame) -> Option<Arc<DisplayFrame>> {
        let frame = latest.as_ref()?;
        match &self.last {
            Some(last) if Arc::ptr_eq(last, frame) => None,
            _ => Some(frame.clone()),
        }
    }

    pub fn mark(&mut self, frame: Arc<DisplayFrame>) {
        self.last = Some(frame);
    }
}

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Text trend line of the most recent `width` samples.
pub fn sparkline(history: &[LatencySample], width: usize) -> String {
    let start = history.len().saturating_sub(width);
    let recent = &history[start..];

    let max = recent.iter().map(|s| s.value_ms).fold(0.0f64, f64::max);
    if max <= 0.0 {
        return BARS[0].to_string().repeat(recent.len());
    }

    recent
        .iter()
        .map(|s| {
            let level = (s.value_ms / max * (BARS.len() - 1) as f64).round() as usize;
            BARS[level.min(BARS.len() - 1)]
        })
        .collect()
}
