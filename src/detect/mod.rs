//! Object detection.
//!
//! `Detector` wraps a [`DetectorBackend`] and owns the configured
//! confidence threshold: everything downstream of it only ever sees
//! detections considered real. Backends are selected from the
//! `model_reference` configuration value.

pub mod backend;
pub mod backends;
pub mod result;

use anyhow::{Context, Result};

use crate::frame::Frame;

pub use backend::DetectorBackend;
pub use backends::StubBackend;
pub use result::{BoxRect, Detection};

/// Threshold-owning wrapper around a detector backend.
pub struct Detector {
    backend: Box<dyn DetectorBackend>,
    confidence_threshold: f32,
}

impl Detector {
    pub fn new(backend: Box<dyn DetectorBackend>, confidence_threshold: f32) -> Self {
        Self {
            backend,
            confidence_threshold,
        }
    }

    /// Resolve a backend from a model reference.
    ///
    /// `stub` selects the hashing stub backend; anything else is treated as
    /// a path to an ONNX model (requires the `backend-tract` feature).
    pub fn from_model_reference(model_reference: &str, confidence_threshold: f32) -> Result<Self> {
        let backend: Box<dyn DetectorBackend> = match model_reference {
            "stub" => Box::new(StubBackend::new()),
            #[cfg(feature = "backend-tract")]
            path => Box::new(backends::TractBackend::new(path)?),
            #[cfg(not(feature = "backend-tract"))]
            other => {
                return Err(anyhow::anyhow!(
                    "model reference '{}' requires the backend-tract feature",
                    other
                ))
            }
        };
        Ok(Self::new(backend, confidence_threshold))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Warm the backend up before the first cycle.
    pub fn warm_up(&mut self) -> Result<()> {
        self.backend
            .warm_up()
            .with_context(|| format!("warm up '{}' backend", self.backend.name()))
    }

    /// Run detection on a frame and drop everything below the threshold.
    ///
    /// An empty result is success; order is the backend's native order.
    pub fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let mut detections = self
            .backend
            .detect(frame.pixels(), frame.width, frame.height)
            .with_context(|| format!("'{}' backend failed", self.backend.name()))?;
        detections.retain(|d| d.confidence >= self.confidence_threshold);
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn frame() -> Frame {
        Frame::new(vec![0u8; 4 * 4 * 3], 4, 4, SystemTime::now()).unwrap()
    }

    fn rect() -> BoxRect {
        BoxRect {
            x: 0,
            y: 0,
            w: 2,
            h: 2,
        }
    }

    #[test]
    fn detector_filters_below_threshold() {
        let backend = StubBackend::with_script(vec![vec![
            Detection::new("person", 0.9, rect()),
            Detection::new("dog", 0.4, rect()),
            Detection::new("cat", 0.5, rect()),
        ]]);
        let mut detector = Detector::new(Box::new(backend), 0.5);

        let detections = detector.infer(&frame()).unwrap();
        let labels: Vec<_> = detections.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["person", "cat"]);
    }

    #[test]
    fn empty_batch_is_success() {
        let backend = StubBackend::with_script(vec![vec![]]);
        let mut detector = Detector::new(Box::new(backend), 0.5);
        assert!(detector.infer(&frame()).unwrap().is_empty());
    }

    #[test]
    fn stub_model_reference_resolves() {
        let detector = Detector::from_model_reference("stub", 0.5).unwrap();
        assert_eq!(detector.backend_name(), "stub");
    }
}
