use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tonedrill::model::{Classifier, FixedClassifier};
use tonedrill::scoring::{CorrectnessLevel, ScoreEngine, Thresholds};
use tonedrill::session::{
    CaptureSource, MockCapture, Phase, SessionEngine, SessionRuntime, SessionSnapshot,
};
use tonedrill::types::{ClassifierOutput, ModelInput, TensorSpec};
use tonedrill::vocab;
use tonedrill::PipelineError;

const SAMPLE_RATE: u32 = 16_000;
const CHONG: usize = 196;

fn chong4_classifier() -> FixedClassifier {
    let mut tone = vec![0.0; vocab::TONE_COUNT];
    tone[vocab::tone_index(4).unwrap()] = 6.0;
    let mut syllables = vec![0.0; vocab::SYLLABLE_COUNT];
    syllables[CHONG] = 8.0;
    FixedClassifier::new(tone, syllables)
}

fn mock_capture(seconds: f32) -> MockCapture {
    let total = (SAMPLE_RATE as f32 * seconds) as usize;
    MockCapture::from_samples(SAMPLE_RATE, vec![0.1; total], 1_024)
}

fn engine_with<C: CaptureSource, M: Classifier>(
    capture: C,
    classifier: M,
) -> SessionEngine<C, M> {
    let mut engine = SessionEngine::new(
        capture,
        classifier,
        ScoreEngine::new(Thresholds::default()),
        TensorSpec::default(),
    );
    engine.set_target(vocab::parse_key("chong4").unwrap());
    engine
}

fn drain_capture<C: CaptureSource, M: Classifier>(engine: &mut SessionEngine<C, M>) {
    for _ in 0..64 {
        engine.poll();
    }
}

#[test]
fn correct_round_updates_the_tally() {
    let mut engine = engine_with(mock_capture(1.0), chong4_classifier());
    engine.begin_recording();
    assert_eq!(engine.phase(), Phase::Recording);
    drain_capture(&mut engine);
    let snapshot = engine.end_recording();
    assert_eq!(engine.phase(), Phase::Idle);
    let report = snapshot.report.expect("round should resolve with a report");
    assert_eq!(report.verdict.level, CorrectnessLevel::Perfect);
    assert_eq!(snapshot.tally.correct, 1);
    assert_eq!(snapshot.tally.attempted, 1);
}

#[test]
fn incorrect_round_counts_the_attempt_only() {
    let mut engine = engine_with(mock_capture(1.0), chong4_classifier());
    engine.set_target(vocab::parse_key("sa1").unwrap());
    engine.begin_recording();
    drain_capture(&mut engine);
    let snapshot = engine.end_recording();
    let report = snapshot.report.expect("round should resolve with a report");
    assert!(!report.verdict.level.counts_as_correct());
    assert_eq!(snapshot.tally.correct, 0);
    assert_eq!(snapshot.tally.attempted, 1);
}

struct CountingCapture {
    inner: MockCapture,
    starts: Arc<AtomicUsize>,
}

impl CaptureSource for CountingCapture {
    fn start(&mut self) -> Result<u32> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.inner.start()
    }

    fn recv_chunk(&mut self, timeout: Duration) -> Option<Vec<f32>> {
        self.inner.recv_chunk(timeout)
    }

    fn stop(&mut self) {
        self.inner.stop();
    }
}

#[test]
fn double_begin_recording_is_a_no_op() {
    let starts = Arc::new(AtomicUsize::new(0));
    let capture = CountingCapture {
        inner: mock_capture(0.5),
        starts: starts.clone(),
    };
    let mut engine = engine_with(capture, chong4_classifier());
    engine.begin_recording();
    let snapshot = engine.begin_recording();
    assert_eq!(snapshot.phase, Phase::Recording);
    assert!(snapshot.error.is_none());
    assert_eq!(starts.load(Ordering::SeqCst), 1, "microphone acquired once");
    drain_capture(&mut engine);
    let resolved = engine.end_recording();
    assert_eq!(resolved.tally.attempted, 1);
}

struct FailingClassifier;

impl Classifier for FailingClassifier {
    fn classify(&self, _input: &ModelInput) -> Result<ClassifierOutput, PipelineError> {
        Err(PipelineError::Inference("executor exploded".to_string()))
    }
}

#[test]
fn inference_failure_voids_the_attempt() {
    let mut engine = engine_with(mock_capture(0.5), FailingClassifier);
    engine.begin_recording();
    drain_capture(&mut engine);
    let snapshot = engine.end_recording();
    assert_eq!(engine.phase(), Phase::Idle);
    assert!(snapshot.report.is_none());
    let error = snapshot.error.expect("voided round should carry an error");
    assert!(error.contains("not counted"));
    assert_eq!(snapshot.tally.attempted, 0);
    assert_eq!(snapshot.tally.correct, 0);
}

struct DeniedCapture;

impl CaptureSource for DeniedCapture {
    fn start(&mut self) -> Result<u32> {
        anyhow::bail!("permission denied")
    }

    fn recv_chunk(&mut self, _timeout: Duration) -> Option<Vec<f32>> {
        None
    }

    fn stop(&mut self) {}
}

#[test]
fn capture_failure_reports_the_microphone_and_stays_idle() {
    let mut engine = engine_with(DeniedCapture, chong4_classifier());
    let snapshot = engine.begin_recording();
    assert_eq!(engine.phase(), Phase::Idle);
    let error = snapshot.error.expect("capture failure should be surfaced");
    assert!(error.contains("could not access microphone"));
}

#[test]
fn new_round_clears_the_verdict_but_not_the_tally() {
    let mut engine = engine_with(mock_capture(0.5), chong4_classifier());
    engine.begin_recording();
    drain_capture(&mut engine);
    let resolved = engine.end_recording();
    assert_eq!(resolved.tally.attempted, 1);
    let fresh = engine.new_round();
    assert!(fresh.report.is_none());
    assert_eq!(fresh.tally.attempted, 1);
}

#[test]
fn runtime_resolves_a_round_end_to_end() {
    let engine = engine_with(mock_capture(1.0), chong4_classifier());
    let runtime = SessionRuntime::launch(move || engine).unwrap();
    let controller = runtime.controller();

    let initial = runtime
        .recv_timeout(Duration::from_secs(5))
        .expect("initial snapshot");
    assert_eq!(initial.phase, Phase::Idle);
    assert_eq!(initial.target_key, "chong4");

    controller.begin_recording().unwrap();
    let recording = runtime
        .recv_timeout(Duration::from_secs(5))
        .expect("recording snapshot");
    assert_eq!(recording.phase, Phase::Recording);

    controller.end_recording().unwrap();
    let resolved = await_resolution(&runtime).expect("resolution snapshot");
    let report = resolved.report.expect("resolved round carries a report");
    assert!(report.verdict.level.counts_as_correct());
    assert_eq!(resolved.tally.attempted, 1);
    assert_eq!(resolved.tally.correct, 1);

    controller.shutdown().unwrap();
}

fn await_resolution(runtime: &SessionRuntime) -> Option<SessionSnapshot> {
    for _ in 0..100 {
        if let Some(snapshot) = runtime.recv_timeout(Duration::from_millis(100)) {
            if snapshot.report.is_some() || snapshot.error.is_some() {
                return Some(snapshot);
            }
        }
    }
    None
}
