//! Orchestration loop.
//!
//! A single control thread drives the cycle state machine:
//!
//! `Idle -> Fetching -> Detecting -> Rendering -> Publishing -> Waiting -> Idle`
//!
//! with `ShuttingDown` terminal on a quit key or Ctrl-C. Cycles never
//! overlap; the `CycleTimer` enforces the configured minimum interval
//! between cycle starts, and the timer is advanced even on a failed fetch
//! so repeated failures cannot busy-spin. Per-cycle failures degrade the
//! cycle (recorded as `SkipReason`s in the `CycleReport`) and never
//! terminate the loop.
//!
//! Publishing fans out three independent effects (display update, artifact
//! save, spoken announcement); a failure in one never suppresses the
//! others. The cadence sleep is sliced so a shutdown request is honored
//! with sub-second latency.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::announce::{Announcer, SpeechHandle};
use crate::artifact::ArtifactWriter;
use crate::detect::{Detection, Detector};
use crate::display::DisplaySurface;
use crate::frame::{AnnotatedFrame, Frame};
use crate::ingest::CameraSource;
use crate::render::render;

const POLL_SLICE: Duration = Duration::from_millis(50);
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);
const SPEECH_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Enforces the minimum interval between cycle starts.
pub struct CycleTimer {
    interval: Duration,
    last_start: Option<Instant>,
}

impl CycleTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_start: None,
        }
    }

    /// Record that a cycle (successful or not) has begun.
    pub fn mark_cycle_start(&mut self, now: Instant) {
        self.last_start = Some(now);
    }

    /// Time remaining until the next cycle may start.
    pub fn time_until_next(&self, now: Instant) -> Duration {
        match self.last_start {
            Some(last) => {
                let next = last + self.interval;
                next.saturating_duration_since(now)
            }
            None => Duration::ZERO,
        }
    }
}

/// Why part of a cycle was skipped.
#[derive(Debug)]
pub enum SkipReason {
    Fetch(String),
    Detect(String),
    Save(String),
    Speech(String),
    Display(String),
}

impl SkipReason {
    fn describe(&self) -> (&'static str, &str) {
        match self {
            SkipReason::Fetch(err) => ("fetch", err),
            SkipReason::Detect(err) => ("detect", err),
            SkipReason::Save(err) => ("save", err),
            SkipReason::Speech(err) => ("speech", err),
            SkipReason::Display(err) => ("display", err),
        }
    }
}

/// What one pass through the state machine did.
#[derive(Debug)]
pub struct CycleReport {
    pub started_at: Instant,
    pub detections: usize,
    pub announced: Vec<String>,
    pub artifact: Option<PathBuf>,
    pub skips: Vec<SkipReason>,
}

impl CycleReport {
    fn started(started_at: Instant) -> Self {
        Self {
            started_at,
            detections: 0,
            announced: Vec::new(),
            artifact: None,
            skips: Vec::new(),
        }
    }

    fn skipped(started_at: Instant, reason: SkipReason) -> Self {
        let mut report = Self::started(started_at);
        report.skips.push(reason);
        report
    }
}

enum LoopState {
    Idle,
    Fetching,
    Detecting(Instant, Frame),
    Rendering(Instant, Frame, Vec<Detection>),
    Publishing(Instant, AnnotatedFrame, Vec<Detection>),
    Waiting(CycleReport),
    ShuttingDown,
}

pub struct WatchLoop {
    source: CameraSource,
    detector: Detector,
    announcer: Announcer,
    writer: ArtifactWriter,
    speech: SpeechHandle,
    display: Box<dyn DisplaySurface>,
    timer: CycleTimer,
    shutdown: Arc<AtomicBool>,
    cycles: u64,
    last_health_log: Instant,
}

impl WatchLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: CameraSource,
        detector: Detector,
        announcer: Announcer,
        writer: ArtifactWriter,
        speech: SpeechHandle,
        display: Box<dyn DisplaySurface>,
        capture_interval: Duration,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            source,
            detector,
            announcer,
            writer,
            speech,
            display,
            timer: CycleTimer::new(capture_interval),
            shutdown,
            cycles: 0,
            last_health_log: Instant::now(),
        }
    }

    /// Run until a shutdown request is observed.
    pub fn run(&mut self) -> Result<()> {
        self.run_inner(u64::MAX)?;
        Ok(())
    }

    /// Run at most `max_cycles` cycles, returning their reports. Used by
    /// tests; shutdown requests are still honored.
    pub fn run_for(&mut self, max_cycles: u64) -> Result<Vec<CycleReport>> {
        self.run_inner(max_cycles)
    }

    /// Stop the speech worker with a bounded wait.
    pub fn finish(self) {
        self.speech.shutdown(SPEECH_SHUTDOWN_GRACE);
    }

    fn run_inner(&mut self, max_cycles: u64) -> Result<Vec<CycleReport>> {
        let mut reports = Vec::new();
        let mut state = LoopState::Idle;
        loop {
            state = match state {
                LoopState::Idle => {
                    if self.shutdown_observed() {
                        LoopState::ShuttingDown
                    } else {
                        LoopState::Fetching
                    }
                }
                LoopState::Fetching => {
                    let started_at = Instant::now();
                    self.timer.mark_cycle_start(started_at);
                    match self.source.fetch() {
                        Ok(frame) => LoopState::Detecting(started_at, frame),
                        Err(err) => LoopState::Waiting(CycleReport::skipped(
                            started_at,
                            SkipReason::Fetch(format!("{:#}", err)),
                        )),
                    }
                }
                LoopState::Detecting(started_at, frame) => match self.detector.infer(&frame) {
                    Ok(detections) => LoopState::Rendering(started_at, frame, detections),
                    Err(err) => LoopState::Waiting(CycleReport::skipped(
                        started_at,
                        SkipReason::Detect(format!("{:#}", err)),
                    )),
                },
                LoopState::Rendering(started_at, frame, detections) => {
                    let annotated = render(&frame, &detections);
                    // The raw frame is dropped here; nothing outlives the cycle.
                    LoopState::Publishing(started_at, annotated, detections)
                }
                LoopState::Publishing(started_at, annotated, detections) => {
                    LoopState::Waiting(self.publish(started_at, annotated, detections))
                }
                LoopState::Waiting(report) => {
                    self.cycles += 1;
                    self.log_cycle(&report);
                    reports.push(report);
                    if self.cycles >= max_cycles {
                        LoopState::ShuttingDown
                    } else if self.wait_for_next_tick() {
                        LoopState::Idle
                    } else {
                        LoopState::ShuttingDown
                    }
                }
                LoopState::ShuttingDown => break,
            };
        }
        log::info!("watch loop stopped after {} cycles", self.cycles);
        Ok(reports)
    }

    /// Fan out the three independent per-cycle effects.
    fn publish(
        &mut self,
        started_at: Instant,
        annotated: AnnotatedFrame,
        detections: Vec<Detection>,
    ) -> CycleReport {
        let mut report = CycleReport::started(started_at);
        report.detections = detections.len();

        if let Err(err) = self.display.present(&annotated) {
            report
                .skips
                .push(SkipReason::Display(format!("{:#}", err)));
        }

        let labels: Vec<String> = detections.iter().map(|d| d.label.clone()).collect();
        if !detections.is_empty() {
            match self.writer.save(&annotated, &labels) {
                Ok(path) => report.artifact = Some(path),
                Err(err) => report.skips.push(SkipReason::Save(format!("{:#}", err))),
            }
        }

        let announced = self
            .announcer
            .observe(labels.iter().map(String::as_str), Instant::now());
        if !announced.is_empty() && !self.speech.say(Announcer::utterance(&announced)) {
            report
                .skips
                .push(SkipReason::Speech("utterance dropped, worker busy".into()));
        }
        report.announced = announced;

        report
    }

    fn log_cycle(&mut self, report: &CycleReport) {
        for skip in &report.skips {
            let (phase, err) = skip.describe();
            match skip {
                // A failing model suggests a deeper problem; log loudly.
                SkipReason::Detect(_) => log::error!("cycle {}: {} failed: {}", self.cycles, phase, err),
                _ => log::warn!("cycle {}: {} skipped: {}", self.cycles, phase, err),
            }
        }
        if !report.announced.is_empty() {
            log::info!("announced: {}", report.announced.join(", "));
        }
        if let Some(path) = &report.artifact {
            log::info!("saved {}", path.display());
        }
        log::debug!(
            "cycle {}: {} detections, {} skips",
            self.cycles,
            report.detections,
            report.skips.len()
        );

        if self.last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
            let stats = self.source.stats();
            log::info!(
                "source health: frames={} endpoint={}",
                stats.frames_fetched,
                stats.endpoint
            );
            self.last_health_log = Instant::now();
        }
    }

    /// Sliced cadence sleep; returns false when shutdown was requested.
    fn wait_for_next_tick(&mut self) -> bool {
        loop {
            if self.shutdown_observed() {
                return false;
            }
            let remaining = self.timer.time_until_next(Instant::now());
            if remaining.is_zero() {
                return true;
            }
            std::thread::sleep(remaining.min(POLL_SLICE));
        }
    }

    fn shutdown_observed(&mut self) -> bool {
        if self.shutdown.load(Ordering::SeqCst) {
            return true;
        }
        if self.display.quit_requested() {
            self.shutdown.store(true, Ordering::SeqCst);
            return true;
        }
        false
    }
}
