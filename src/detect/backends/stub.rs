use std::collections::VecDeque;

use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoxRect, Detection};

/// Stub backend for testing and camera bring-up.
///
/// Without a script it reports a single "motion" detection whenever the
/// frame content changes (pixel hash differs from the previous frame),
/// which makes a `stub` model useful for checking the loop end to end
/// before a real model is wired in.
///
/// With a script it replays the given detection batches in order, one per
/// call, then returns empty batches.
pub struct StubBackend {
    last_hash: Option<[u8; 32]>,
    script: VecDeque<Vec<Detection>>,
    scripted: bool,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            last_hash: None,
            script: VecDeque::new(),
            scripted: false,
        }
    }

    /// Replay the given batches in order instead of hashing pixels.
    pub fn with_script(batches: Vec<Vec<Detection>>) -> Self {
        Self {
            last_hash: None,
            script: batches.into(),
            scripted: true,
        }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        if self.scripted {
            return Ok(self.script.pop_front().unwrap_or_default());
        }

        let current_hash: [u8; 32] = Sha256::digest(pixels).into();
        let motion = self.last_hash.is_some_and(|prev| prev != current_hash);
        self.last_hash = Some(current_hash);

        if motion {
            Ok(vec![Detection::new(
                "motion",
                0.85,
                BoxRect {
                    x: 0,
                    y: 0,
                    w: width,
                    h: height,
                },
            )])
        } else {
            Ok(Vec::new())
        }
    }
}
