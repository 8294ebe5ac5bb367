//! In-memory rasters flowing through one cycle.
//!
//! - `Frame`: RGB8 still image as fetched from the camera. Owned by the
//!   cycle that fetched it and dropped at the end of that cycle.
//! - `AnnotatedFrame`: a frame with detection overlays burned in. Immutable
//!   after creation; consumed by the display surface and the artifact writer
//!   within the same cycle.

use anyhow::{anyhow, Result};
use std::time::SystemTime;

/// A decoded RGB8 still image.
pub struct Frame {
    pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Wall-clock capture time, used for artifact naming.
    pub captured_at: SystemTime,
}

impl Frame {
    /// Create a frame from raw RGB8 bytes. Length must be `width * height * 3`.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, captured_at: SystemTime) -> Result<Self> {
        let expected = rgb_len(width, height)?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                pixels.len()
            ));
        }
        Ok(Self {
            pixels,
            width,
            height,
            captured_at,
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// A frame with detection rectangles and labels drawn in.
///
/// Constructed only by the annotation renderer; there is no mutable access
/// to the pixel data afterwards.
pub struct AnnotatedFrame {
    pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at: SystemTime,
}

impl AnnotatedFrame {
    pub(crate) fn new(pixels: Vec<u8>, width: u32, height: u32, captured_at: SystemTime) -> Self {
        Self {
            pixels,
            width,
            height,
            captured_at,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

pub(crate) fn rgb_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(3))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}
