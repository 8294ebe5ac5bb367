use anyhow::Result;

use crate::detect::result::Detection;

/// Detector backend trait.
///
/// Implementations receive RGB8 pixels for one frame and return every
/// detection the model produced, unfiltered and in the model's native
/// output order. Confidence filtering happens in [`crate::Detector`], not
/// here, so all backends are thresholded uniformly.
///
/// Backends must treat the pixel slice as read-only and ephemeral; a frame
/// that yields nothing returns an empty list, not an error.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>>;

    /// Optional warm-up hook, called once before the loop starts.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
