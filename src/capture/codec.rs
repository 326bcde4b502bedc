//! Splits a raw `bgr24` byte stream into fixed-size frames.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use super::CaptureError;
use crate::video::{PixelFormat, RawFrame};

#[derive(Debug, Clone)]
pub struct RawVideoCodec {
    width: u32,
    height: u32,
    frame_len: usize,
    sequence: u64,
}

impl RawVideoCodec {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_len: PixelFormat::BGR24.frame_len(width, height),
            sequence: 0,
        }
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }
}

impl Decoder for RawVideoCodec {
    type Item = RawFrame;
    type Error = CaptureError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<RawFrame>, CaptureError> {
        if self.frame_len == 0 {
            return Err(CaptureError::Decode("zero-sized frame geometry".into()));
        }
        if src.len() < self.frame_len {
            src.reserve(self.frame_len - src.len());
            return Ok(None);
        }

        let data = src.split_to(self.frame_len);
        self.sequence += 1;
        Ok(Some(RawFrame::new(
            data.to_vec(),
            self.width,
            self.height,
            PixelFormat::BGR24,
            self.sequence,
        )))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<RawFrame>, CaptureError> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(CaptureError::Decode(format!(
                "stream ended mid-frame ({} of {} bytes)",
                src.len(),
                self.frame_len
            ))),
        }
    }
}
