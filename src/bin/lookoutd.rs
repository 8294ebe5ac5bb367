//! lookoutd - still-camera watch daemon
//!
//! This daemon:
//! 1. Fetches one JPEG snapshot per cycle from the configured endpoint
//! 2. Runs object detection and drops detections below the threshold
//! 3. Shows the annotated frame in a live window
//! 4. Speaks newly appeared object classes (edge-triggered, cooldown-gated)
//! 5. Persists annotated frames under sortable, collision-free names
//!
//! Exit code is 0 on graceful shutdown (quit key or Ctrl-C), non-zero on
//! startup failure.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use lookout::announce::{Announcer, EspeakBackend, NullSpeech, SpeechBackend, SpeechHandle};
use lookout::artifact::ArtifactWriter;
use lookout::detect::Detector;
use lookout::display::{DisplaySurface, HeadlessDisplay};
use lookout::ingest::CameraSource;
use lookout::runtime::WatchLoop;
use lookout::LookoutConfig;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file path (JSON); overrides LOOKOUT_CONFIG.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Camera base URL (http(s):// snapshot endpoint, or stub://).
    #[arg(long)]
    endpoint: Option<String>,
    /// Minimum seconds between cycles.
    #[arg(long)]
    interval: Option<u64>,
    /// Minimum detection confidence to keep, in [0, 1].
    #[arg(long)]
    threshold: Option<f32>,
    /// Minimum seconds before re-announcing a label that left and returned.
    #[arg(long)]
    cooldown: Option<u64>,
    /// Directory for saved annotated frames.
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Detection model: "stub" or a path to an ONNX model.
    #[arg(long)]
    model: Option<String>,
    /// Run without a display window (quit via Ctrl-C).
    #[arg(long)]
    headless: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => LookoutConfig::load_with_path(Some(path))?,
        None => LookoutConfig::load()?,
    };
    apply_cli_overrides(&mut cfg, &args);
    cfg.validate()?;

    let source = CameraSource::new(&cfg.endpoint)?;

    let mut detector = Detector::from_model_reference(&cfg.model_reference, cfg.confidence_threshold)
        .context("load detection model")?;
    detector.warm_up()?;
    log::info!("detector backend: {}", detector.backend_name());

    let writer = ArtifactWriter::new(&cfg.output_directory)?;
    log::info!("saving artifacts to {}", writer.dir().display());

    // A missing speech engine degrades to silence; it never blocks startup.
    let backend: Box<dyn SpeechBackend> = match EspeakBackend::new() {
        Ok(espeak) => Box::new(espeak),
        Err(err) => {
            log::warn!("speech engine unavailable, running silent: {:#}", err);
            Box::new(NullSpeech)
        }
    };
    let speech = SpeechHandle::spawn(backend);

    let display = build_display(cfg.headless)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_handler = shutdown.clone();
    ctrlc::set_handler(move || {
        shutdown_handler.store(true, Ordering::SeqCst);
    })
    .context("set Ctrl-C handler")?;

    log::info!(
        "lookoutd running: endpoint={} interval={}s threshold={:.2} cooldown={}s",
        cfg.endpoint,
        cfg.capture_interval.as_secs(),
        cfg.confidence_threshold,
        cfg.announcement_cooldown.as_secs()
    );

    let mut watch = WatchLoop::new(
        source,
        detector,
        Announcer::new(cfg.announcement_cooldown),
        writer,
        speech,
        display,
        cfg.capture_interval,
        shutdown,
    );
    watch.run()?;
    watch.finish();

    log::info!("lookoutd shutdown complete");
    Ok(())
}

fn apply_cli_overrides(cfg: &mut LookoutConfig, args: &Args) {
    if let Some(endpoint) = &args.endpoint {
        cfg.endpoint = endpoint.clone();
    }
    if let Some(interval) = args.interval {
        cfg.capture_interval = Duration::from_secs(interval);
    }
    if let Some(threshold) = args.threshold {
        cfg.confidence_threshold = threshold;
    }
    if let Some(cooldown) = args.cooldown {
        cfg.announcement_cooldown = Duration::from_secs(cooldown);
    }
    if let Some(dir) = &args.out_dir {
        cfg.output_directory = dir.clone();
    }
    if let Some(model) = &args.model {
        cfg.model_reference = model.clone();
    }
    if args.headless {
        cfg.headless = true;
    }
}

#[cfg(feature = "display-minifb")]
fn build_display(headless: bool) -> Result<Box<dyn DisplaySurface>> {
    if headless {
        Ok(Box::new(HeadlessDisplay::new()))
    } else {
        Ok(Box::new(lookout::display::WindowDisplay::new(
            "lookout - q to quit",
        )))
    }
}

#[cfg(not(feature = "display-minifb"))]
fn build_display(headless: bool) -> Result<Box<dyn DisplaySurface>> {
    if !headless {
        log::warn!("built without display-minifb; running headless");
    }
    Ok(Box::new(HeadlessDisplay::new()))
}
