//! Dedicated speech worker.
//!
//! Speaking is the one slow, blocking external effect per cycle. It runs on
//! its own thread with a bounded handoff queue so the orchestration loop's
//! shutdown poll is never blocked by utterance duration: a full queue drops
//! the utterance with a warning, and shutdown waits only a bounded grace
//! period for an in-flight utterance before detaching the thread.

use std::sync::mpsc::{sync_channel, SyncSender, TrySendError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::speech::SpeechBackend;

/// Pending utterances beyond the one currently being spoken.
const QUEUE_DEPTH: usize = 2;

const SHUTDOWN_POLL: Duration = Duration::from_millis(20);

pub struct SpeechHandle {
    tx: Option<SyncSender<String>>,
    join: Option<JoinHandle<()>>,
    backend_name: &'static str,
}

impl SpeechHandle {
    pub fn spawn(mut backend: Box<dyn SpeechBackend>) -> Self {
        let backend_name = backend.name();
        let (tx, rx) = sync_channel::<String>(QUEUE_DEPTH);
        let join = std::thread::spawn(move || {
            for text in rx {
                if let Err(err) = backend.speak(&text) {
                    log::warn!("speech failed ({}): {:#}", backend.name(), err);
                }
            }
        });
        Self {
            tx: Some(tx),
            join: Some(join),
            backend_name,
        }
    }

    /// Queue an utterance without blocking. Returns false when it was
    /// dropped because the backend is stuck or the worker has died.
    pub fn say(&self, text: String) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        match tx.try_send(text) {
            Ok(()) => true,
            Err(TrySendError::Full(text)) => {
                log::warn!(
                    "speech queue full ({} backend busy), dropping: {}",
                    self.backend_name,
                    text
                );
                false
            }
            Err(TrySendError::Disconnected(text)) => {
                log::warn!("speech worker gone, dropping: {}", text);
                false
            }
        }
    }

    /// Close the queue and wait up to `grace` for queued utterances to
    /// finish. A wedged backend is detached rather than hanging exit.
    pub fn shutdown(mut self, grace: Duration) {
        self.tx.take();
        let Some(join) = self.join.take() else {
            return;
        };
        let deadline = Instant::now() + grace;
        while !join.is_finished() {
            if Instant::now() >= deadline {
                log::warn!(
                    "speech backend ({}) did not finish within {:?}, detaching",
                    self.backend_name,
                    grace
                );
                return;
            }
            std::thread::sleep(SHUTDOWN_POLL);
        }
        let _ = join.join();
    }
}
