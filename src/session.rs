//! Per-round orchestration: target prompt, recording state machine, tally.
//!
//! The session runs on a dedicated runtime thread commanded over channels,
//! so capture, decoding, inference and scoring never block the interactive
//! loop. One round at a time: `idle → recording → processing → idle`, with
//! out-of-order commands treated as no-ops rather than errors.

use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, error, info, warn};

use crate::audio::capture::{CaptureConfig, LiveCapture};
use crate::audio::conditioner;
use crate::model::Classifier;
use crate::scoring::{ScoreEngine, ScoreReport};
use crate::types::{AudioData, TensorSpec};
use crate::vocab::{self, Target};
use crate::PipelineResult;

const CAPTURE_POLL_MS: u64 = 20;

/// Abstraction over the microphone so the engine can run against recorded
/// chunks in tests.
pub trait CaptureSource {
    /// Begin streaming; returns the capture sample rate.
    fn start(&mut self) -> Result<u32>;
    fn recv_chunk(&mut self, timeout: Duration) -> Option<Vec<f32>>;
    fn stop(&mut self);
}

pub struct LiveCaptureSource {
    config: CaptureConfig,
    live: Option<LiveCapture>,
}

impl LiveCaptureSource {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config, live: None }
    }
}

impl CaptureSource for LiveCaptureSource {
    fn start(&mut self) -> Result<u32> {
        let live = LiveCapture::start(&self.config)?;
        let sample_rate = live.sample_rate();
        self.live = Some(live);
        Ok(sample_rate)
    }

    fn recv_chunk(&mut self, timeout: Duration) -> Option<Vec<f32>> {
        self.live
            .as_ref()
            .and_then(|capture| capture.recv_chunk(timeout))
    }

    fn stop(&mut self) {
        if let Some(capture) = self.live.take() {
            capture.stop();
        }
    }
}

/// Replays pre-chunked samples as if they came from a microphone.
pub struct MockCapture {
    sample_rate: u32,
    chunks: VecDeque<Vec<f32>>,
    started: bool,
}

impl MockCapture {
    pub fn from_samples(sample_rate: u32, samples: Vec<f32>, chunk_len: usize) -> Self {
        let mut chunks = VecDeque::new();
        if chunk_len == 0 {
            chunks.push_back(samples);
        } else {
            for chunk in samples.chunks(chunk_len) {
                chunks.push_back(chunk.to_vec());
            }
        }
        Self {
            sample_rate,
            chunks,
            started: false,
        }
    }
}

impl CaptureSource for MockCapture {
    fn start(&mut self) -> Result<u32> {
        self.started = true;
        Ok(self.sample_rate)
    }

    fn recv_chunk(&mut self, _timeout: Duration) -> Option<Vec<f32>> {
        if !self.started {
            return None;
        }
        self.chunks.pop_front()
    }

    fn stop(&mut self) {
        self.started = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Recording,
    Processing,
}

/// Running score for the session. Monotone; reset only by restarting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreTally {
    pub correct: u32,
    pub attempted: u32,
}

impl ScoreTally {
    fn record(&mut self, counts_as_correct: bool) {
        self.attempted += 1;
        if counts_as_correct {
            self.correct += 1;
        }
    }
}

/// Point-in-time view of the session handed to the front end.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub target_key: String,
    pub phase: Phase,
    pub tally: ScoreTally,
    /// Present once per resolved round.
    pub report: Option<ScoreReport>,
    /// The raw recording behind `report`, for replay or saving.
    pub attempt: Option<AudioData>,
    pub error: Option<String>,
}

/// The drill state machine. Owns the capture source, the classifier and the
/// score engine for the lifetime of the session.
pub struct SessionEngine<C: CaptureSource, M: Classifier> {
    capture: C,
    classifier: M,
    scorer: ScoreEngine,
    tensor: TensorSpec,
    target: Target,
    phase: Phase,
    tally: ScoreTally,
    buffer: Vec<f32>,
    capture_rate: Option<u32>,
    chunk_count: usize,
}

impl<C: CaptureSource, M: Classifier> SessionEngine<C, M> {
    pub fn new(capture: C, classifier: M, scorer: ScoreEngine, tensor: TensorSpec) -> Self {
        Self {
            capture,
            classifier,
            scorer,
            tensor,
            target: vocab::sample_target(),
            phase: Phase::Idle,
            tally: ScoreTally::default(),
            buffer: Vec::new(),
            capture_rate: None,
            chunk_count: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn target(&self) -> Target {
        self.target
    }

    /// Pin the practice target instead of sampling one. Used by tests and
    /// scripted drills.
    pub fn set_target(&mut self, target: Target) {
        self.target = target;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            target_key: self.target.key(),
            phase: self.phase,
            tally: self.tally,
            report: None,
            attempt: None,
            error: None,
        }
    }

    /// Sample a fresh target and clear the previous verdict. The tally is
    /// untouched. Ignored while a round is in flight.
    pub fn new_round(&mut self) -> SessionSnapshot {
        if self.phase != Phase::Idle {
            debug!(phase = ?self.phase, "new round ignored while a round is in flight");
            return self.snapshot();
        }
        self.target = vocab::sample_target();
        info!(target = %self.target.key(), "new practice target");
        self.snapshot()
    }

    /// Acquire the microphone and start buffering. A second call while
    /// recording or processing is a no-op. A capture failure leaves the
    /// session idle and reports it in the snapshot.
    pub fn begin_recording(&mut self) -> SessionSnapshot {
        if self.phase != Phase::Idle {
            debug!(phase = ?self.phase, "begin-recording is a no-op outside idle");
            return self.snapshot();
        }
        match self.capture.start() {
            Ok(sample_rate) => {
                self.capture_rate = Some(sample_rate);
                self.buffer.clear();
                self.chunk_count = 0;
                self.phase = Phase::Recording;
                info!(sample_rate, "microphone recording started");
                self.snapshot()
            }
            Err(err) => {
                error!(error = %err, "failed to start microphone capture");
                let mut snapshot = self.snapshot();
                snapshot.error = Some(format!("could not access microphone: {}", err));
                snapshot
            }
        }
    }

    /// Drain one pending capture chunk into the recording buffer.
    pub fn poll(&mut self) {
        if self.phase != Phase::Recording {
            return;
        }
        if let Some(chunk) = self
            .capture
            .recv_chunk(Duration::from_millis(CAPTURE_POLL_MS))
        {
            self.buffer.extend_from_slice(&chunk);
            self.chunk_count += 1;
            if self.chunk_count % 50 == 0 {
                debug!(
                    chunks = self.chunk_count,
                    samples = self.buffer.len(),
                    "capture progress"
                );
            }
        }
    }

    /// Release the microphone and move to processing. No-op unless recording.
    pub fn finish_capture(&mut self) -> SessionSnapshot {
        if self.phase != Phase::Recording {
            debug!(phase = ?self.phase, "end-recording is a no-op outside recording");
            return self.snapshot();
        }
        // Stop first so the callback side quiesces, then pick up whatever is
        // still queued.
        self.capture.stop();
        while let Some(chunk) = self
            .capture
            .recv_chunk(Duration::from_millis(CAPTURE_POLL_MS))
        {
            self.buffer.extend_from_slice(&chunk);
        }
        self.phase = Phase::Processing;
        info!(samples = self.buffer.len(), "recording stopped; scoring attempt");
        self.snapshot()
    }

    /// Run condition → classify → score over the buffered recording and
    /// return to idle. A success updates the tally; a failure voids the
    /// attempt and leaves the tally untouched.
    pub fn resolve_round(&mut self) -> SessionSnapshot {
        if self.phase != Phase::Processing {
            return self.snapshot();
        }
        let sample_rate = self.capture_rate.take().unwrap_or(self.tensor.sample_rate);
        let clip = AudioData {
            samples: std::mem::take(&mut self.buffer),
            sample_rate,
        };
        let outcome = self.run_pipeline(&clip);
        self.phase = Phase::Idle;
        match outcome {
            Ok(report) => {
                self.tally.record(report.verdict.level.counts_as_correct());
                info!(level = ?report.verdict.level, tally = ?self.tally, "attempt scored");
                let mut snapshot = self.snapshot();
                snapshot.report = Some(report);
                snapshot.attempt = Some(clip);
                snapshot
            }
            Err(err) => {
                warn!(error = %err, "attempt voided");
                let mut snapshot = self.snapshot();
                snapshot.error = Some(format!(
                    "attempt voided ({}); the round was not counted, record again",
                    err
                ));
                snapshot
            }
        }
    }

    /// Stop recording and score the attempt in one step.
    pub fn end_recording(&mut self) -> SessionSnapshot {
        self.finish_capture();
        self.resolve_round()
    }

    /// Drop an in-flight recording without scoring it. Used on shutdown.
    pub fn cancel_recording(&mut self) {
        if self.phase == Phase::Recording {
            self.capture.stop();
        }
        self.buffer.clear();
        self.capture_rate = None;
        self.phase = Phase::Idle;
    }

    fn run_pipeline(&self, clip: &AudioData) -> PipelineResult<ScoreReport> {
        let input = conditioner::condition(clip, &self.tensor)?;
        let output = self.classifier.classify(&input)?;
        Ok(self.scorer.score(&output, &self.target))
    }
}

#[derive(Clone, Copy, Debug)]
enum SessionCommand {
    NewRound,
    BeginRecording,
    EndRecording,
    Shutdown,
}

/// Cloneable handle used by the front end to drive the runtime thread.
#[derive(Clone)]
pub struct SessionController {
    tx: Sender<SessionCommand>,
}

impl SessionController {
    pub fn new_round(&self) -> Result<()> {
        self.send(SessionCommand::NewRound, "request a new round")
    }

    pub fn begin_recording(&self) -> Result<()> {
        self.send(SessionCommand::BeginRecording, "begin recording")
    }

    pub fn end_recording(&self) -> Result<()> {
        self.send(SessionCommand::EndRecording, "end recording")
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(SessionCommand::Shutdown, "shut the session down")
    }

    fn send(&self, command: SessionCommand, label: &str) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| anyhow!("failed to {}: session runtime is gone", label))
    }
}

/// Owns the runtime thread; snapshots stream back over a channel.
pub struct SessionRuntime {
    controller: SessionController,
    updates: Receiver<SessionSnapshot>,
    join: Option<JoinHandle<()>>,
}

impl SessionRuntime {
    /// Spawn the runtime thread. The engine is constructed by `build` on the
    /// thread itself: capture streams are tied to the thread that opens them,
    /// so only the builder crosses.
    pub fn launch<C, M, F>(build: F) -> Result<Self>
    where
        C: CaptureSource + 'static,
        M: Classifier + 'static,
        F: FnOnce() -> SessionEngine<C, M> + Send + 'static,
    {
        let (command_tx, command_rx) = channel();
        let (update_tx, update_rx) = channel();
        let join = thread::Builder::new()
            .name("drill-session".to_string())
            .spawn(move || run_loop(build(), command_rx, update_tx))
            .context("failed to spawn session runtime thread")?;
        info!("session runtime thread spawned");
        Ok(Self {
            controller: SessionController { tx: command_tx },
            updates: update_rx,
            join: Some(join),
        })
    }

    pub fn controller(&self) -> SessionController {
        self.controller.clone()
    }

    pub fn try_recv(&self) -> Option<SessionSnapshot> {
        self.updates.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<SessionSnapshot> {
        self.updates.recv_timeout(timeout).ok()
    }
}

impl Drop for SessionRuntime {
    fn drop(&mut self) {
        let _ = self.controller.shutdown();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

enum LoopExit {
    Finished,
    Shutdown,
}

fn run_loop<C: CaptureSource, M: Classifier>(
    mut engine: SessionEngine<C, M>,
    commands: Receiver<SessionCommand>,
    updates: Sender<SessionSnapshot>,
) {
    info!("session runtime thread running");
    let _ = updates.send(engine.snapshot());
    while let Ok(command) = commands.recv() {
        match command {
            SessionCommand::Shutdown => {
                engine.cancel_recording();
                break;
            }
            SessionCommand::NewRound => {
                let _ = updates.send(engine.new_round());
            }
            SessionCommand::EndRecording => {
                debug!("end-recording command while idle (no-op)");
            }
            SessionCommand::BeginRecording => {
                let snapshot = engine.begin_recording();
                let recording = snapshot.phase == Phase::Recording;
                let _ = updates.send(snapshot);
                if recording {
                    if let LoopExit::Shutdown = drive(&mut engine, &commands, &updates) {
                        break;
                    }
                }
            }
        }
    }
    info!("session runtime thread exiting");
}

fn drive<C: CaptureSource, M: Classifier>(
    engine: &mut SessionEngine<C, M>,
    commands: &Receiver<SessionCommand>,
    updates: &Sender<SessionSnapshot>,
) -> LoopExit {
    loop {
        if let Some(command) = poll_command(commands) {
            match command {
                SessionCommand::Shutdown => {
                    engine.cancel_recording();
                    return LoopExit::Shutdown;
                }
                SessionCommand::EndRecording => {
                    let _ = updates.send(engine.finish_capture());
                    let _ = updates.send(engine.resolve_round());
                    return LoopExit::Finished;
                }
                SessionCommand::BeginRecording => {
                    debug!("begin-recording while already recording (no-op)");
                }
                SessionCommand::NewRound => {
                    debug!("new-round ignored while recording");
                }
            }
        }
        engine.poll();
    }
}

fn poll_command(commands: &Receiver<SessionCommand>) -> Option<SessionCommand> {
    match commands.try_recv() {
        Ok(command) => Some(command),
        Err(TryRecvError::Empty) => None,
        Err(TryRecvError::Disconnected) => Some(SessionCommand::Shutdown),
    }
}
