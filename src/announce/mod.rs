//! Spoken-announcement policy.
//!
//! The announcer decides, per cycle, which detected labels are worth
//! vocalizing. Two failure modes are avoided: announcing a steady-state
//! object every cycle (auditory spam), and staying silent on an object that
//! genuinely re-entered the frame.
//!
//! Policy: edge-triggered. A label is announced only on its transition from
//! absent-in-the-previous-cycle to present, and a re-entry is additionally
//! gated by a cooldown since the label was last spoken. Continuous presence
//! never re-announces, no matter how much time passes.
//!
//! Announcement state lives only in this struct: initialized empty at
//! startup, owned by the loop thread, never persisted.

pub mod speech;
pub mod worker;

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

pub use speech::{EspeakBackend, NullSpeech, SpeechBackend, StubSpeech};
pub use worker::SpeechHandle;

pub struct Announcer {
    previous: BTreeSet<String>,
    last_spoken: HashMap<String, Instant>,
    cooldown: Duration,
}

impl Announcer {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            previous: BTreeSet::new(),
            last_spoken: HashMap::new(),
            cooldown,
        }
    }

    /// Feed one cycle's detected labels; returns the labels to speak now,
    /// sorted and deduplicated (three "person" boxes announce "person" once).
    pub fn observe<'a, I>(&mut self, labels: I, now: Instant) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let current: BTreeSet<String> = labels.into_iter().map(str::to_string).collect();

        let mut to_speak = Vec::new();
        for label in &current {
            if self.previous.contains(label) {
                continue;
            }
            let cooled_down = match self.last_spoken.get(label) {
                Some(last) => now.duration_since(*last) >= self.cooldown,
                None => true,
            };
            if cooled_down {
                to_speak.push(label.clone());
            }
        }

        for label in &to_speak {
            self.last_spoken.insert(label.clone(), now);
        }
        self.previous = current;
        to_speak
    }

    /// Merge one cycle's new labels into a single utterance.
    pub fn utterance(labels: &[String]) -> String {
        format!("I see {}", labels.join(", "))
    }
}
