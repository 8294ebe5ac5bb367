//! Persisted annotated frames.
//!
//! Artifacts are named `YYYYMMDD_HHMMSS_NN[_labels].jpg`: a local-time
//! capture stamp, a per-second sequence number so back-to-back cycles never
//! collide, and the sorted detected labels for human scanning. Names sort
//! lexically in capture order.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::frame::AnnotatedFrame;

const MAX_LABEL_SUFFIX: usize = 60;

pub struct ArtifactWriter {
    dir: PathBuf,
    last_stamp: String,
    seq: u32,
}

impl ArtifactWriter {
    /// Open the output directory, creating it if absent.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create output directory {}", dir.display()))?;
        Ok(Self {
            dir,
            last_stamp: String::new(),
            seq: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Encode the annotated frame as JPEG and write it under a fresh name.
    pub fn save(&mut self, frame: &AnnotatedFrame, labels: &[String]) -> Result<PathBuf> {
        let name = self.next_filename(frame.captured_at, labels);
        let path = self.dir.join(&name);
        image::save_buffer_with_format(
            &path,
            frame.pixels(),
            frame.width,
            frame.height,
            image::ExtendedColorType::Rgb8,
            image::ImageFormat::Jpeg,
        )
        .with_context(|| format!("write artifact {}", path.display()))?;
        Ok(path)
    }

    fn next_filename(&mut self, captured_at: SystemTime, labels: &[String]) -> String {
        let stamp = DateTime::<Local>::from(captured_at)
            .format("%Y%m%d_%H%M%S")
            .to_string();
        if stamp == self.last_stamp {
            self.seq += 1;
        } else {
            self.last_stamp = stamp.clone();
            self.seq = 0;
        }

        loop {
            let name = compose_filename(&stamp, self.seq, labels);
            // A previous run within the same second may have left this name.
            if !self.dir.join(&name).exists() {
                return name;
            }
            self.seq += 1;
        }
    }
}

fn compose_filename(stamp: &str, seq: u32, labels: &[String]) -> String {
    let suffix = label_suffix(labels);
    if suffix.is_empty() {
        format!("{}_{:02}.jpg", stamp, seq)
    } else {
        format!("{}_{:02}_{}.jpg", stamp, seq, suffix)
    }
}

/// Sorted, deduplicated, filesystem-safe label suffix.
fn label_suffix(labels: &[String]) -> String {
    let sorted: BTreeSet<&str> = labels.iter().map(String::as_str).collect();
    let mut suffix = String::new();
    for label in sorted {
        let safe: String = label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        if !suffix.is_empty() {
            suffix.push('-');
        }
        suffix.push_str(&safe);
        if suffix.len() >= MAX_LABEL_SUFFIX {
            suffix.truncate(MAX_LABEL_SUFFIX);
            break;
        }
    }
    suffix
}
