//! lookout
//!
//! This crate implements `lookoutd`, a single-process watch daemon for a
//! network still camera. Each cycle it fetches one JPEG snapshot, runs
//! object detection, and publishes three synchronized outputs: an annotated
//! live view, a spoken announcement of newly detected object classes, and a
//! persisted annotated image.
//!
//! # Module Structure
//!
//! - `config`: file/env configuration and validation
//! - `frame`: `Frame` / `AnnotatedFrame` rasters, owned per cycle
//! - `ingest`: frame sources (HTTP snapshot, stub), scheme-dispatched
//! - `detect`: detector backends and the threshold-owning `Detector`
//! - `render`: pure annotation drawing
//! - `announce`: edge-triggered announcement policy and speech worker
//! - `artifact`: collision-free, sortable artifact persistence
//! - `display`: live view surface (window or headless)
//! - `runtime`: the orchestration state machine and cycle timer

pub mod announce;
pub mod artifact;
pub mod config;
pub mod detect;
pub mod display;
pub mod frame;
pub mod ingest;
pub mod render;
pub mod runtime;

pub use announce::{Announcer, EspeakBackend, NullSpeech, SpeechBackend, SpeechHandle, StubSpeech};
pub use artifact::ArtifactWriter;
pub use config::LookoutConfig;
pub use detect::{BoxRect, Detection, Detector, DetectorBackend, StubBackend};
pub use display::{DisplaySurface, HeadlessDisplay};
#[cfg(feature = "display-minifb")]
pub use display::WindowDisplay;
pub use frame::{AnnotatedFrame, Frame};
pub use ingest::{CameraSource, ScriptedFetch, StubCameraSource};
pub use render::render;
pub use runtime::{CycleReport, CycleTimer, SkipReason, WatchLoop};
