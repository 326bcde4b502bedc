/*!
 * Video Module
 *
 * Frame types and the resize/colour conversion applied before display.
 */

pub mod frame;

pub use frame::{DisplayFrame, FrameError, PixelFormat, RawFrame};

/// Width of the preview shown by the display sink
pub const DISPLAY_WIDTH: u32 = 700;

/// Height of the preview shown by the display sink
pub const DISPLAY_HEIGHT: u32 = 400;
