//! Raw and annotated video frames.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Bytes per pixel in a packed RGB24 buffer.
pub const RGB_CHANNELS: usize = 3;

/// Errors constructing a frame from raw pixel data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame buffer has {actual} bytes, expected {expected} for {width}x{height} RGB")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Frame dimensions {width}x{height} are too large")]
    TooLarge { width: u32, height: u32 },
}

/// A packed RGB24 image, row-major with no padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    /// Wraps a raw buffer, checking its length against the dimensions.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, FrameError> {
        let expected = Self::buffer_len(width, height)?;
        if pixels.len() != expected {
            return Err(FrameError::SizeMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A frame filled with a single color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self, FrameError> {
        let len = Self::buffer_len(width, height)?;
        let pixels = rgb.iter().copied().cycle().take(len).collect();
        Self::new(width, height, pixels)
    }

    /// Number of bytes an RGB24 buffer of this size occupies.
    pub fn buffer_len(width: u32, height: u32) -> Result<usize, FrameError> {
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(RGB_CHANNELS))
            .ok_or(FrameError::TooLarge { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    fn offset(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        let index = (y as usize) * (self.width as usize) + (x as usize);
        index.checked_mul(RGB_CHANNELS)
    }

    /// Reads one pixel; `None` when out of bounds.
    pub fn pixel(&self, x: i64, y: i64) -> Option<[u8; 3]> {
        let start = self.offset(x, y)?;
        match self.pixels.get(start..start + RGB_CHANNELS)? {
            [r, g, b] => Some([*r, *g, *b]),
            _ => None,
        }
    }

    /// Writes one pixel; silently clipped when out of bounds.
    pub fn put_pixel(&mut self, x: i64, y: i64, rgb: [u8; 3]) {
        if let Some(start) = self.offset(x, y) {
            if let Some(slot) = self.pixels.get_mut(start..start + RGB_CHANNELS) {
                slot.copy_from_slice(&rgb);
            }
        }
    }
}

/// The most recent annotated frame, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFrame {
    /// Sequence number assigned by the producer (starts at 0)
    pub index: u64,

    /// Annotated image
    pub image: Frame,

    /// Number of detections drawn on the image
    pub detections: usize,

    /// When the frame was captured
    pub captured_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_length() {
        assert!(Frame::new(2, 2, vec![0; 12]).is_ok());
        let err = Frame::new(2, 2, vec![0; 11]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::SizeMismatch {
                expected: 12,
                actual: 11,
                ..
            }
        ));
    }

    #[test]
    fn test_filled() {
        let f = Frame::filled(3, 2, [1, 2, 3]).unwrap();
        assert_eq!(f.pixels().len(), 18);
        assert_eq!(f.pixel(2, 1), Some([1, 2, 3]));
    }

    #[test]
    fn test_put_pixel_clips_out_of_bounds() {
        let mut f = Frame::filled(2, 2, [0, 0, 0]).unwrap();
        f.put_pixel(-1, 0, [9, 9, 9]);
        f.put_pixel(2, 0, [9, 9, 9]);
        f.put_pixel(0, 5, [9, 9, 9]);
        assert!(f.pixels().iter().all(|b| *b == 0));

        f.put_pixel(1, 1, [7, 8, 9]);
        assert_eq!(f.pixel(1, 1), Some([7, 8, 9]));
        assert_eq!(f.pixel(0, 0), Some([0, 0, 0]));
    }

    #[test]
    fn test_empty_frame() {
        let f = Frame::new(0, 0, Vec::new()).unwrap();
        assert_eq!(f.pixel(0, 0), None);
    }
}
