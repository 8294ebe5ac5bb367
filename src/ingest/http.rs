//! HTTP snapshot source.
//!
//! Fetches one still JPEG per call from a camera's `/capture` endpoint.
//! No retries happen here; a failed fetch surfaces as an error and the
//! orchestration loop's cadence is the retry policy.

use std::io::Read;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};

use crate::frame::Frame;

const MAX_JPEG_BYTES: u64 = 5 * 1024 * 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpCameraSource {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpCameraSource {
    pub fn new(endpoint: &str) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self {
            base_url: endpoint.trim_end_matches('/').to_string(),
            agent,
        }
    }

    /// Fetch and decode one snapshot.
    pub fn fetch(&mut self) -> Result<Frame> {
        let captured_at = SystemTime::now();
        let cache_buster = captured_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        // Cache-buster query parameter keeps proxies from replaying a stale still.
        let url = format!("{}/capture?_cb={}", self.base_url, cache_buster);

        let response = self
            .agent
            .get(&url)
            .call()
            .with_context(|| format!("fetch snapshot from {}", self.base_url))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_JPEG_BYTES + 1)
            .read_to_end(&mut bytes)
            .context("read snapshot body")?;
        if bytes.is_empty() {
            return Err(anyhow!("empty snapshot body"));
        }
        if bytes.len() as u64 > MAX_JPEG_BYTES {
            return Err(anyhow!("snapshot exceeded {} byte limit", MAX_JPEG_BYTES));
        }

        decode_jpeg(bytes, captured_at)
    }
}

fn decode_jpeg(bytes: Vec<u8>, captured_at: SystemTime) -> Result<Frame> {
    let decoded = image::load_from_memory(&bytes).context("decode snapshot jpeg")?;
    let rgb = decoded.into_rgb8();
    let (width, height) = rgb.dimensions();
    Frame::new(rgb.into_raw(), width, height, captured_at)
}
