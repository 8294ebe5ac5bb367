//! Frame ingestion sources.
//!
//! A `CameraSource` fetches one still frame on demand. The backend is
//! selected from the endpoint URL scheme:
//! - `http://` / `https://`: JPEG snapshot over HTTP
//! - `stub://`: synthetic frames (testing, bring-up)
//!
//! Sources never retry internally and never retain frames past handoff;
//! fetch cadence and failure policy belong to the orchestration loop.

pub mod http;
pub mod stub;

use anyhow::{anyhow, Context, Result};
use url::Url;

use crate::frame::Frame;

pub use http::HttpCameraSource;
pub use stub::{ScriptedFetch, StubCameraSource};

/// Scheme-dispatched frame source.
pub struct CameraSource {
    backend: CameraBackend,
    endpoint: String,
    frames_fetched: u64,
}

enum CameraBackend {
    Http(HttpCameraSource),
    Stub(StubCameraSource),
}

impl CameraSource {
    pub fn new(endpoint: &str) -> Result<Self> {
        let url = Url::parse(endpoint).context("parse camera endpoint")?;
        let backend = match url.scheme() {
            "http" | "https" => CameraBackend::Http(HttpCameraSource::new(endpoint)),
            "stub" => CameraBackend::Stub(StubCameraSource::new()),
            other => {
                return Err(anyhow!(
                    "unsupported camera scheme '{}'; expected http(s) or stub",
                    other
                ))
            }
        };
        Ok(Self {
            backend,
            endpoint: endpoint.to_string(),
            frames_fetched: 0,
        })
    }

    /// Wrap a scripted stub source (tests).
    pub fn from_stub(stub: StubCameraSource) -> Self {
        Self {
            backend: CameraBackend::Stub(stub),
            endpoint: "stub://scripted".to_string(),
            frames_fetched: 0,
        }
    }

    /// Fetch one frame.
    pub fn fetch(&mut self) -> Result<Frame> {
        let frame = match &mut self.backend {
            CameraBackend::Http(source) => source.fetch(),
            CameraBackend::Stub(source) => source.fetch(),
        }?;
        self.frames_fetched += 1;
        Ok(frame)
    }

    pub fn stats(&self) -> SourceStats {
        SourceStats {
            frames_fetched: self.frames_fetched,
            endpoint: self.endpoint.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_fetched: u64,
    pub endpoint: String,
}
