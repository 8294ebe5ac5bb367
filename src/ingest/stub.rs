//! Stub frame source for tests and bring-up.

use std::collections::VecDeque;
use std::time::SystemTime;

use anyhow::{anyhow, Result};

use crate::frame::{rgb_len, Frame};

const STUB_WIDTH: u32 = 640;
const STUB_HEIGHT: u32 = 480;

/// One scripted fetch outcome.
pub enum ScriptedFetch {
    Frame(Frame),
    Fail(String),
}

/// Frame source that synthesizes frames, or replays a script.
///
/// Without a script every fetch succeeds with a flat synthetic frame whose
/// shade varies per call, so the stub detector backend sees changing
/// content. With a script, outcomes are replayed in order and the source
/// fails once the script is exhausted.
pub struct StubCameraSource {
    counter: u64,
    script: VecDeque<ScriptedFetch>,
    scripted: bool,
}

impl StubCameraSource {
    pub fn new() -> Self {
        Self {
            counter: 0,
            script: VecDeque::new(),
            scripted: false,
        }
    }

    pub fn with_script(script: Vec<ScriptedFetch>) -> Self {
        Self {
            counter: 0,
            script: script.into(),
            scripted: true,
        }
    }

    pub fn fetch(&mut self) -> Result<Frame> {
        if self.scripted {
            return match self.script.pop_front() {
                Some(ScriptedFetch::Frame(frame)) => Ok(frame),
                Some(ScriptedFetch::Fail(reason)) => Err(anyhow!("{}", reason)),
                None => Err(anyhow!("stub source script exhausted")),
            };
        }

        self.counter += 1;
        let shade = (self.counter * 29 % 251) as u8;
        let pixels = vec![shade; rgb_len(STUB_WIDTH, STUB_HEIGHT)?];
        Frame::new(pixels, STUB_WIDTH, STUB_HEIGHT, SystemTime::now())
    }
}

impl Default for StubCameraSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_frames_vary_between_calls() {
        let mut source = StubCameraSource::new();
        let a = source.fetch().unwrap();
        let b = source.fetch().unwrap();
        assert_ne!(a.pixels()[0], b.pixels()[0]);
    }

    #[test]
    fn script_replays_failures_then_exhausts() {
        let frame = Frame::new(vec![0u8; 12], 2, 2, SystemTime::now()).unwrap();
        let mut source = StubCameraSource::with_script(vec![
            ScriptedFetch::Fail("unreachable".into()),
            ScriptedFetch::Frame(frame),
        ]);
        assert!(source.fetch().is_err());
        assert!(source.fetch().is_ok());
        assert!(source.fetch().is_err());
    }
}
