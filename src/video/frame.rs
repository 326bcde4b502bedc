/*!
 * Video Frame Representation
 *
 * Raw decoded frames as delivered by the capture primitive, and the
 * display-ready frames handed to the display sink.
 */

use std::time::{SystemTime, UNIX_EPOCH};

use image::imageops::{self, FilterType};
use image::RgbImage;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame data is {actual} bytes, expected {expected} for {width}x{height}")]
    SizeMismatch {
        actual: usize,
        expected: usize,
        width: u32,
        height: u32,
    },

    #[error("Zero-sized target resolution {0}x{1}")]
    EmptyTarget(u32, u32),
}

/// Pixel format for raw frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// BGR 24-bit, the decoder's native ordering
    BGR24,
    /// RGB 24-bit, what the display expects
    RGB24,
}

impl PixelFormat {
    /// Get bytes per pixel
    pub fn bytes_per_pixel(&self) -> usize {
        3
    }

    /// Byte length of a packed frame of the given size
    pub fn frame_len(&self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.bytes_per_pixel()
    }
}

/// Raw uncompressed video frame
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Frame pixel data
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel format
    pub format: PixelFormat,
    /// Timestamp in milliseconds since epoch
    pub timestamp_ms: u64,
    /// Frame sequence number within its capture session
    pub sequence: u64,
}

impl RawFrame {
    /// Create a new raw frame
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat, sequence: u64) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            data,
            width,
            height,
            format,
            timestamp_ms,
            sequence,
        }
    }

    /// Get expected data size for this frame
    pub fn expected_size(&self) -> usize {
        self.format.frame_len(self.width, self.height)
    }

    /// Validate frame data size
    pub fn is_valid(&self) -> bool {
        self.data.len() == self.expected_size()
    }

    /// Copy of this frame with BGR reordered to RGB
    pub fn bgr_to_rgb(&self) -> RawFrame {
        let data = match self.format {
            PixelFormat::BGR24 => self
                .data
                .chunks_exact(3)
                .flat_map(|px| [px[2], px[1], px[0]])
                .collect(),
            PixelFormat::RGB24 => self.data.clone(),
        };

        RawFrame {
            data,
            width: self.width,
            height: self.height,
            format: PixelFormat::RGB24,
            timestamp_ms: self.timestamp_ms,
            sequence: self.sequence,
        }
    }

    /// Resize to `width`x`height` and reorder channels for display.
    pub fn to_display(&self, width: u32, height: u32) -> Result<DisplayFrame, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::EmptyTarget(width, height));
        }
        if !self.is_valid() {
            return Err(FrameError::SizeMismatch {
                actual: self.data.len(),
                expected: self.expected_size(),
                width: self.width,
                height: self.height,
            });
        }

        let rgb = self.bgr_to_rgb();
        let image = RgbImage::from_raw(rgb.width, rgb.height, rgb.data).ok_or(
            FrameError::SizeMismatch {
                actual: self.data.len(),
                expected: self.expected_size(),
                width: self.width,
                height: self.height,
            },
        )?;

        let image = if image.dimensions() == (width, height) {
            image
        } else {
            imageops::resize(&image, width, height, FilterType::Triangle)
        };

        Ok(DisplayFrame {
            image,
            sequence: self.sequence,
            timestamp_ms: self.timestamp_ms,
        })
    }
}

/// Frame ready for the display sink
#[derive(Debug, Clone)]
pub struct DisplayFrame {
    pub image: RgbImage,
    pub sequence: u64,
    pub timestamp_ms: u64,
}

impl DisplayFrame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
