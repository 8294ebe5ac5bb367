//! End-to-end orchestration loop behavior with scripted collaborators.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use anyhow::{anyhow, Result};

use lookout::announce::{Announcer, SpeechBackend, SpeechHandle, StubSpeech};
use lookout::artifact::ArtifactWriter;
use lookout::detect::{BoxRect, Detection, Detector, DetectorBackend, StubBackend};
use lookout::display::{DisplaySurface, HeadlessDisplay};
use lookout::frame::{AnnotatedFrame, Frame};
use lookout::ingest::{CameraSource, ScriptedFetch, StubCameraSource};
use lookout::runtime::{SkipReason, WatchLoop};

const INTERVAL: Duration = Duration::from_millis(20);

fn frame() -> Frame {
    Frame::new(vec![60u8; 64 * 48 * 3], 64, 48, SystemTime::now()).unwrap()
}

fn detection(label: &str, confidence: f32) -> Detection {
    Detection::new(
        label,
        confidence,
        BoxRect {
            x: 8,
            y: 8,
            w: 20,
            h: 16,
        },
    )
}

struct Harness {
    watch: WatchLoop,
    transcript: Arc<Mutex<Vec<String>>>,
    shutdown: Arc<AtomicBool>,
}

fn harness(
    fetches: Vec<ScriptedFetch>,
    batches: Vec<Vec<Detection>>,
    out_dir: &Path,
    cooldown: Duration,
) -> Harness {
    let source = CameraSource::from_stub(StubCameraSource::with_script(fetches));
    let detector = Detector::new(Box::new(StubBackend::with_script(batches)), 0.5);
    let writer = ArtifactWriter::new(out_dir).unwrap();
    let (speech, transcript) = StubSpeech::new();
    let shutdown = Arc::new(AtomicBool::new(false));
    let watch = WatchLoop::new(
        source,
        detector,
        Announcer::new(cooldown),
        writer,
        SpeechHandle::spawn(Box::new(speech)),
        Box::new(HeadlessDisplay::new()),
        INTERVAL,
        shutdown.clone(),
    );
    Harness {
        watch,
        transcript,
        shutdown,
    }
}

#[test]
fn single_person_detection_announces_saves_and_displays() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = harness(
        vec![ScriptedFetch::Frame(frame())],
        vec![vec![detection("person", 0.9)]],
        dir.path(),
        Duration::from_secs(30),
    );

    let reports = h.watch.run_for(1).unwrap();
    h.watch.finish();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].detections, 1);
    assert_eq!(reports[0].announced, vec!["person".to_string()]);
    assert!(reports[0].skips.is_empty());

    let artifact = reports[0].artifact.as_ref().expect("artifact saved");
    assert!(artifact.exists());

    assert_eq!(*h.transcript.lock().unwrap(), vec!["I see person".to_string()]);
}

#[test]
fn unreachable_endpoint_skips_cycles_but_keeps_running() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = harness(
        vec![
            ScriptedFetch::Fail("connection refused".into()),
            ScriptedFetch::Fail("connection refused".into()),
            ScriptedFetch::Fail("connection refused".into()),
            ScriptedFetch::Frame(frame()),
        ],
        vec![vec![]],
        dir.path(),
        Duration::from_secs(30),
    );

    let reports = h.watch.run_for(4).unwrap();
    h.watch.finish();

    assert_eq!(reports.len(), 4);
    for report in &reports[..3] {
        assert!(matches!(report.skips.as_slice(), [SkipReason::Fetch(_)]));
        assert!(report.artifact.is_none());
    }
    // Cycle 4 fetched and processed normally.
    assert!(reports[3].skips.is_empty());

    assert!(h.transcript.lock().unwrap().is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn save_failure_does_not_suppress_announcement_or_next_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let mut h = harness(
        vec![
            ScriptedFetch::Frame(frame()),
            ScriptedFetch::Frame(frame()),
        ],
        vec![
            vec![detection("person", 0.9)],
            vec![detection("dog", 0.8)],
        ],
        &out,
        Duration::from_secs(30),
    );

    // Replace the output directory with a plain file so writes fail.
    std::fs::remove_dir(&out).unwrap();
    std::fs::write(&out, b"in the way").unwrap();

    let reports = h.watch.run_for(2).unwrap();
    h.watch.finish();

    assert!(matches!(reports[0].skips.as_slice(), [SkipReason::Save(_)]));
    assert!(reports[0].artifact.is_none());
    assert_eq!(reports[0].announced, vec!["person".to_string()]);

    // The next cycle proceeds and announces normally.
    assert_eq!(reports[1].announced, vec!["dog".to_string()]);

    assert_eq!(
        *h.transcript.lock().unwrap(),
        vec!["I see person".to_string(), "I see dog".to_string()]
    );
}

#[test]
fn detection_failure_skips_the_cycle_only() {
    struct FailOnceBackend {
        failed: bool,
    }
    impl DetectorBackend for FailOnceBackend {
        fn name(&self) -> &'static str {
            "fail-once"
        }
        fn detect(&mut self, _pixels: &[u8], _w: u32, _h: u32) -> Result<Vec<Detection>> {
            if self.failed {
                Ok(vec![detection("person", 0.9)])
            } else {
                self.failed = true;
                Err(anyhow!("model invocation failed"))
            }
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let source = CameraSource::from_stub(StubCameraSource::with_script(vec![
        ScriptedFetch::Frame(frame()),
        ScriptedFetch::Frame(frame()),
    ]));
    let detector = Detector::new(Box::new(FailOnceBackend { failed: false }), 0.5);
    let writer = ArtifactWriter::new(dir.path()).unwrap();
    let (speech, transcript) = StubSpeech::new();
    let mut watch = WatchLoop::new(
        source,
        detector,
        Announcer::new(Duration::from_secs(30)),
        writer,
        SpeechHandle::spawn(Box::new(speech)),
        Box::new(HeadlessDisplay::new()),
        INTERVAL,
        Arc::new(AtomicBool::new(false)),
    );

    let reports = watch.run_for(2).unwrap();
    watch.finish();

    assert!(matches!(reports[0].skips.as_slice(), [SkipReason::Detect(_)]));
    assert_eq!(reports[1].announced, vec!["person".to_string()]);
    assert_eq!(*transcript.lock().unwrap(), vec!["I see person".to_string()]);
}

#[test]
fn steady_presence_announces_once_and_saves_unique_names() {
    let dir = tempfile::tempdir().unwrap();
    let fetches = (0..10).map(|_| ScriptedFetch::Frame(frame())).collect();
    let batches = (0..10).map(|_| vec![detection("person", 0.9)]).collect();
    let mut h = harness(fetches, batches, dir.path(), Duration::from_secs(30));

    let reports = h.watch.run_for(10).unwrap();
    h.watch.finish();

    let total_announced: usize = reports.iter().map(|r| r.announced.len()).sum();
    assert_eq!(total_announced, 1);
    assert_eq!(h.transcript.lock().unwrap().len(), 1);

    let mut artifacts: Vec<_> = reports
        .iter()
        .map(|r| r.artifact.clone().expect("artifact per cycle"))
        .collect();
    let unique = artifacts.len();
    artifacts.sort();
    artifacts.dedup();
    assert_eq!(artifacts.len(), unique);
}

#[test]
fn cycle_starts_respect_the_capture_interval() {
    let dir = tempfile::tempdir().unwrap();
    let fetches = (0..4).map(|_| ScriptedFetch::Frame(frame())).collect();
    let batches = (0..4).map(|_| Vec::new()).collect();
    let mut h = harness(fetches, batches, dir.path(), Duration::from_secs(30));

    let reports = h.watch.run_for(4).unwrap();
    h.watch.finish();

    for pair in reports.windows(2) {
        let gap = pair[1].started_at.duration_since(pair[0].started_at);
        assert!(gap >= INTERVAL, "cycle gap {:?} below interval", gap);
    }
}

#[test]
fn quit_request_from_the_display_stops_the_loop() {
    struct QuitAfterPresents {
        presents: u32,
        quit_after: u32,
    }
    impl DisplaySurface for QuitAfterPresents {
        fn present(&mut self, _frame: &AnnotatedFrame) -> Result<()> {
            self.presents += 1;
            Ok(())
        }
        fn quit_requested(&mut self) -> bool {
            self.presents >= self.quit_after
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let fetches = (0..10).map(|_| ScriptedFetch::Frame(frame())).collect();
    let source = CameraSource::from_stub(StubCameraSource::with_script(fetches));
    let detector = Detector::new(Box::new(StubBackend::with_script(Vec::new())), 0.5);
    let writer = ArtifactWriter::new(dir.path()).unwrap();
    let (speech, _transcript) = StubSpeech::new();
    let shutdown = Arc::new(AtomicBool::new(false));
    let mut watch = WatchLoop::new(
        source,
        detector,
        Announcer::new(Duration::from_secs(30)),
        writer,
        SpeechHandle::spawn(Box::new(speech)),
        Box::new(QuitAfterPresents {
            presents: 0,
            quit_after: 2,
        }),
        INTERVAL,
        shutdown.clone(),
    );

    let started = std::time::Instant::now();
    let reports = watch.run_for(10).unwrap();
    watch.finish();

    // Quit surfaces during the cadence wait after the second present, not
    // after all ten scripted frames.
    assert_eq!(reports.len(), 2);
    assert!(shutdown.load(Ordering::SeqCst));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn dropped_utterance_is_recorded_as_a_speech_skip() {
    struct WedgedSpeech;
    impl SpeechBackend for WedgedSpeech {
        fn name(&self) -> &'static str {
            "wedged"
        }
        fn speak(&mut self, _text: &str) -> Result<()> {
            std::thread::sleep(Duration::from_secs(30));
            Ok(())
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let fetches = (0..4).map(|_| ScriptedFetch::Frame(frame())).collect();
    // A new label every cycle, so every cycle announces.
    let batches = vec![
        vec![detection("person", 0.9)],
        vec![detection("dog", 0.9)],
        vec![detection("cat", 0.9)],
        vec![detection("bird", 0.9)],
    ];
    let source = CameraSource::from_stub(StubCameraSource::with_script(fetches));
    let detector = Detector::new(Box::new(StubBackend::with_script(batches)), 0.5);
    let writer = ArtifactWriter::new(dir.path()).unwrap();
    let mut watch = WatchLoop::new(
        source,
        detector,
        Announcer::new(Duration::from_secs(30)),
        writer,
        SpeechHandle::spawn(Box::new(WedgedSpeech)),
        Box::new(HeadlessDisplay::new()),
        INTERVAL,
        Arc::new(AtomicBool::new(false)),
    );

    let reports = watch.run_for(4).unwrap();
    // The wedged worker thread is left to die with the process.

    // One utterance in flight plus two queued; the fourth cannot fit.
    assert!(reports[0].skips.is_empty());
    assert!(reports[1].skips.is_empty());
    assert!(reports[3]
        .skips
        .iter()
        .any(|s| matches!(s, SkipReason::Speech(_))));
    assert_eq!(reports[3].announced, vec!["bird".to_string()]);
}

#[test]
fn shutdown_request_stops_the_loop_promptly() {
    let dir = tempfile::tempdir().unwrap();
    let fetches = (0..100).map(|_| ScriptedFetch::Frame(frame())).collect();
    let batches = (0..100).map(|_| Vec::new()).collect();
    let mut h = harness(fetches, batches, dir.path(), Duration::from_secs(30));

    h.shutdown.store(true, Ordering::SeqCst);
    let reports = h.watch.run_for(100).unwrap();
    h.watch.finish();

    assert!(reports.is_empty());
}
