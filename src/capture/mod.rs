//! Capture primitive seam.
//!
//! A [`CaptureSource`] opens sessions against a stream URL; a
//! [`CaptureSession`] yields decoded frames until it fails. The stream
//! supervisor owns at most one session at a time and is responsible for
//! releasing it.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::video::RawFrame;

pub mod codec;
pub mod ffmpeg;

pub use codec::RawVideoCodec;
pub use ffmpeg::{FfmpegCapture, FfmpegConfig, FfmpegSession};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Failed to launch capture process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Stream not ready: {0}")]
    NotReady(String),

    #[error("No frame within {0:?} of opening")]
    OpenTimeout(Duration),

    #[error("End of stream")]
    EndOfStream,

    #[error("No frame within {0:?}")]
    ReadTimeout(Duration),

    #[error("Capture I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl CaptureError {
    /// Whether retrying the same URL can plausibly succeed.
    ///
    /// Both kinds are absorbed by the supervisor; a persistent failure (the
    /// capture program is missing) is only logged louder.
    pub fn is_transient(&self) -> bool {
        match self {
            CaptureError::Spawn(e) => e.kind() != std::io::ErrorKind::NotFound
                && e.kind() != std::io::ErrorKind::PermissionDenied,
            CaptureError::NotReady(_)
            | CaptureError::OpenTimeout(_)
            | CaptureError::EndOfStream
            | CaptureError::ReadTimeout(_)
            | CaptureError::Io(_)
            | CaptureError::Decode(_) => true,
        }
    }
}

/// One open capture attempt.
pub trait CaptureSession: Send + 'static {
    /// Whether the underlying resource reports itself ready.
    fn is_open(&self) -> bool;

    /// Pull the next decoded frame.
    fn read_frame(&mut self) -> impl Future<Output = Result<RawFrame, CaptureError>> + Send;

    /// Release the underlying resource. Must be idempotent.
    fn release(&mut self);
}

/// Opens capture sessions by URL.
pub trait CaptureSource: Send + Sync + 'static {
    type Session: CaptureSession;

    fn open(&self, url: &str) -> impl Future<Output = Result<Self::Session, CaptureError>> + Send;
}
