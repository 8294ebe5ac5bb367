//! Speech backends.
//!
//! The speech engine is an external collaborator behind a narrow trait.
//! The production backend shells out to espeak-ng (or espeak); failure to
//! find either is reported at construction so the daemon can degrade to a
//! silent backend instead of crashing.

use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};

/// Words per minute, matching the usual announcement pacing.
const SPEECH_RATE: u32 = 150;

pub trait SpeechBackend: Send {
    fn name(&self) -> &'static str;

    /// Speak one utterance to completion. May block for its duration.
    fn speak(&mut self, text: &str) -> Result<()>;
}

/// espeak-ng / espeak via subprocess.
pub struct EspeakBackend {
    program: &'static str,
}

impl EspeakBackend {
    /// Probe for an available espeak binary.
    pub fn new() -> Result<Self> {
        for program in ["espeak-ng", "espeak"] {
            let available = Command::new(program)
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|status| status.success())
                .unwrap_or(false);
            if available {
                return Ok(Self { program });
            }
        }
        Err(anyhow!("neither espeak-ng nor espeak is available"))
    }
}

impl SpeechBackend for EspeakBackend {
    fn name(&self) -> &'static str {
        self.program
    }

    fn speak(&mut self, text: &str) -> Result<()> {
        let status = Command::new(self.program)
            .arg("-s")
            .arg(SPEECH_RATE.to_string())
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("run {}", self.program))?;
        if !status.success() {
            return Err(anyhow!("{} exited with {}", self.program, status));
        }
        Ok(())
    }
}

/// Silent backend used when no speech engine is available.
pub struct NullSpeech;

impl SpeechBackend for NullSpeech {
    fn name(&self) -> &'static str {
        "null"
    }

    fn speak(&mut self, text: &str) -> Result<()> {
        log::info!("announcement (no speech engine): {}", text);
        Ok(())
    }
}

/// Recording backend for tests. Optionally fails every utterance.
pub struct StubSpeech {
    transcript: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl StubSpeech {
    pub fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let transcript = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                transcript: transcript.clone(),
                fail: false,
            },
            transcript,
        )
    }

    pub fn failing() -> Self {
        Self {
            transcript: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        }
    }
}

impl SpeechBackend for StubSpeech {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn speak(&mut self, text: &str) -> Result<()> {
        if self.fail {
            return Err(anyhow!("stub speech failure"));
        }
        self.transcript
            .lock()
            .map_err(|_| anyhow!("transcript lock poisoned"))?
            .push(text.to_string());
        Ok(())
    }
}
