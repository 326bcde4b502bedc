//! FFmpeg-backed capture primitive
//!
//! Decodes the stream in an `ffmpeg` child process that writes packed
//! `bgr24` frames to stdout. The session is considered open once the first
//! frame has arrived.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, ChildStdout, Command};
use tokio_stream::StreamExt;
use tokio_util::codec::FramedRead;
use tracing::{debug, info};

use super::codec::RawVideoCodec;
use super::{CaptureError, CaptureSession, CaptureSource};
use crate::video::{RawFrame, DISPLAY_HEIGHT, DISPLAY_WIDTH};

/// FFmpeg decoder settings
#[derive(Debug, Clone)]
pub struct FfmpegConfig {
    /// Program to execute
    pub program: String,
    /// Decoded frame width handed to the supervisor; matching the display
    /// size leaves the supervisor nothing to resize
    pub decode_width: u32,
    /// Decoded frame height handed to the supervisor
    pub decode_height: u32,
    /// How long to wait for the first frame
    pub open_timeout: Duration,
    /// How long to wait for each following frame
    pub read_timeout: Duration,
    /// RTSP lower transport (`tcp` or `udp`)
    pub rtsp_transport: String,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            decode_width: DISPLAY_WIDTH,
            decode_height: DISPLAY_HEIGHT,
            open_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(5),
            rtsp_transport: "tcp".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FfmpegCapture {
    config: FfmpegConfig,
}

impl FfmpegCapture {
    pub fn new(config: FfmpegConfig) -> Self {
        Self { config }
    }

    /// Command line passed to the decoder for `url`
    pub fn command_args(&self, url: &str) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-nostdin"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        if url.starts_with("rtsp://") {
            args.push("-rtsp_transport".into());
            args.push(self.config.rtsp_transport.clone());
        }

        args.extend([
            "-i".to_string(),
            url.to_string(),
            "-an".to_string(),
            "-vf".to_string(),
            format!(
                "scale={}:{}",
                self.config.decode_width, self.config.decode_height
            ),
            "-pix_fmt".to_string(),
            "bgr24".to_string(),
            "-f".to_string(),
            "rawvideo".to_string(),
            "pipe:1".to_string(),
        ]);
        args
    }
}

impl CaptureSource for FfmpegCapture {
    type Session = FfmpegSession;

    async fn open(&self, url: &str) -> Result<FfmpegSession, CaptureError> {
        debug!(program = %self.config.program, "Spawning decoder");

        let mut child = Command::new(&self.config.program)
            .args(self.command_args(url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(CaptureError::Spawn)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CaptureError::NotReady("decoder stdout unavailable".into()))?;

        let codec = RawVideoCodec::new(self.config.decode_width, self.config.decode_height);
        let capacity = codec.frame_len();
        let mut frames = FramedRead::with_capacity(stdout, codec, capacity);

        // Dropping `child` on any error path below kills the decoder.
        let first = match tokio::time::timeout(self.config.open_timeout, frames.next()).await {
            Ok(Some(Ok(frame))) => frame,
            Ok(Some(Err(e))) => return Err(e),
            Ok(None) => {
                return Err(CaptureError::NotReady(
                    "decoder exited before the first frame".into(),
                ))
            }
            Err(_) => return Err(CaptureError::OpenTimeout(self.config.open_timeout)),
        };

        info!(
            width = self.config.decode_width,
            height = self.config.decode_height,
            "Decoder delivering frames"
        );

        Ok(FfmpegSession {
            child,
            frames,
            pending: Some(first),
            open: true,
            read_timeout: self.config.read_timeout,
        })
    }
}

pub struct FfmpegSession {
    child: Child,
    frames: FramedRead<ChildStdout, RawVideoCodec>,
    pending: Option<RawFrame>,
    open: bool,
    read_timeout: Duration,
}

impl CaptureSession for FfmpegSession {
    fn is_open(&self) -> bool {
        self.open
    }

    async fn read_frame(&mut self) -> Result<RawFrame, CaptureError> {
        if let Some(frame) = self.pending.take() {
            return Ok(frame);
        }
        if !self.open {
            return Err(CaptureError::EndOfStream);
        }

        let result = match tokio::time::timeout(self.read_timeout, self.frames.next()).await {
            Ok(Some(result)) => result,
            Ok(None) => Err(CaptureError::EndOfStream),
            Err(_) => Err(CaptureError::ReadTimeout(self.read_timeout)),
        };
        if result.is_err() {
            self.open = false;
        }
        result
    }

    fn release(&mut self) {
        self.open = false;
        self.pending = None;
        if let Err(e) = self.child.start_kill() {
            debug!(error = %e, "Decoder already gone");
        }
        // Reap without blocking; kill_on_drop covers anything still running.
        let _ = self.child.try_wait();
    }
}
