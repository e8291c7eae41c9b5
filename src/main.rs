use std::fs;
use std::io::{self, BufRead};
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tonedrill::audio::capture::CaptureConfig;
use tonedrill::audio::{conditioner, decoder, encoder, playback};
use tonedrill::cli::{AttemptArgs, Cli, Command, DrillArgs, ModelArgs, PromptArgs};
use tonedrill::model::{Classifier, OnnxClassifier};
use tonedrill::scoring::{AxisAnalysis, ScoreEngine, ScoreReport};
use tonedrill::session::{
    LiveCaptureSource, Phase, ScoreTally, SessionEngine, SessionRuntime, SessionSnapshot,
};
use tonedrill::vocab::{self, PromptBook};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    match Cli::parse().command {
        Command::Drill(args) => run_drill(&args),
        Command::Attempt(args) => run_attempt(&args),
        Command::Prompt(args) => run_prompt(&args),
    }
}

fn run_drill(args: &DrillArgs) -> Result<()> {
    let classifier = load_classifier(&args.model)?;
    let tensor = classifier.spec().tensor.clone();
    let prompts = load_prompts(args.prompts.as_deref())?;
    if let Some(dir) = &args.save_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create save directory {}", dir.display()))?;
    }

    let capture_config = CaptureConfig {
        device_name: args.capture.device.clone(),
        latency_ms: args.capture.latency_range()?,
    };
    let scorer = ScoreEngine::new(args.score.thresholds()?);
    let runtime = SessionRuntime::launch(move || {
        SessionEngine::new(
            LiveCaptureSource::new(capture_config),
            classifier,
            scorer,
            tensor,
        )
    })?;
    let controller = runtime.controller();

    let initial = runtime
        .recv_timeout(Duration::from_secs(5))
        .context("session runtime produced no initial snapshot")?;
    println!("Press Enter to start/stop recording, 'n' for a new prompt, 'q' to quit.");
    announce(&prompts, &initial.target_key, initial.tally);

    let stdin = io::stdin();
    let mut recording = false;
    let mut attempt_index = 0usize;
    for line in stdin.lock().lines() {
        let line = line.context("failed to read from stdin")?;
        match line.trim() {
            "q" => break,
            "n" => {
                if recording {
                    println!("Finish the recording first.");
                    continue;
                }
                controller.new_round()?;
                if let Some(snapshot) = runtime.recv_timeout(Duration::from_secs(5)) {
                    announce(&prompts, &snapshot.target_key, snapshot.tally);
                }
            }
            "" => {
                if recording {
                    controller.end_recording()?;
                    recording = false;
                    match await_resolution(&runtime) {
                        Some(snapshot) => {
                            report_round(args, &prompts, &snapshot, &mut attempt_index)?;
                        }
                        None => println!("The scoring pipeline did not respond; try again."),
                    }
                } else {
                    controller.begin_recording()?;
                    match runtime.recv_timeout(Duration::from_secs(10)) {
                        Some(snapshot) if snapshot.phase == Phase::Recording => {
                            recording = true;
                            println!("Recording… press Enter to stop.");
                        }
                        Some(snapshot) => {
                            if let Some(error) = snapshot.error {
                                println!("{}", error);
                            }
                        }
                        None => println!("The microphone did not respond."),
                    }
                }
            }
            other => println!("Unrecognised command '{}'.", other),
        }
    }
    controller.shutdown()?;
    Ok(())
}

fn run_attempt(args: &AttemptArgs) -> Result<()> {
    let target = vocab::parse_key(&args.target)?;
    let classifier = load_classifier(&args.model)?;
    let audio = decoder::decode_file(&args.input)?;
    println!(
        "Loaded {} samples at {} Hz ({:.2}s)",
        audio.samples.len(),
        audio.sample_rate,
        audio.duration_secs()
    );
    let input = conditioner::condition(&audio, &classifier.spec().tensor)?;
    let output = classifier.classify(&input)?;
    let report = ScoreEngine::new(args.score.thresholds()?).score(&output, &target);
    print_report(&target.key(), &report);
    Ok(())
}

fn run_prompt(args: &PromptArgs) -> Result<()> {
    let prompts = load_prompts(args.prompts.as_deref())?;
    let target = vocab::sample_target();
    println!("Say: {}", prompts.describe(&target));
    Ok(())
}

fn load_classifier(args: &ModelArgs) -> Result<OnnxClassifier> {
    let path = args.source().resolve()?;
    OnnxClassifier::load(&path, args.spec())
}

fn load_prompts(path: Option<&Path>) -> Result<PromptBook> {
    match path {
        Some(path) => PromptBook::load(path),
        None => Ok(PromptBook::default()),
    }
}

/// Wait for the snapshot that resolves the in-flight round.
fn await_resolution(runtime: &SessionRuntime) -> Option<SessionSnapshot> {
    let deadline = Instant::now() + Duration::from_secs(60);
    while Instant::now() < deadline {
        if let Some(snapshot) = runtime.recv_timeout(Duration::from_millis(500)) {
            if snapshot.report.is_some() || snapshot.error.is_some() {
                return Some(snapshot);
            }
        }
    }
    None
}

fn report_round(
    args: &DrillArgs,
    prompts: &PromptBook,
    snapshot: &SessionSnapshot,
    attempt_index: &mut usize,
) -> Result<()> {
    if let Some(error) = &snapshot.error {
        println!("{}", error);
        return Ok(());
    }
    let Some(report) = &snapshot.report else {
        return Ok(());
    };
    print_report(&snapshot.target_key, report);
    println!("Score: {}/{}", snapshot.tally.correct, snapshot.tally.attempted);
    if let Some(attempt) = &snapshot.attempt {
        if let Some(dir) = &args.save_dir {
            *attempt_index += 1;
            let path = dir.join(format!(
                "attempt_{:03}_{}.wav",
                attempt_index, snapshot.target_key
            ));
            encoder::write_wav(attempt, &path)?;
            println!("Saved attempt to {}", path.display());
        }
        if args.replay {
            playback::play_clip(attempt)?;
        }
    }
    println!(
        "Same prompt: {}. Press Enter to retry, 'n' for a new one.",
        prompts.describe_key(&snapshot.target_key)
    );
    Ok(())
}

fn announce(prompts: &PromptBook, target_key: &str, tally: ScoreTally) {
    println!(
        "\nSay: {}   (score {}/{})",
        prompts.describe_key(target_key),
        tally.correct,
        tally.attempted
    );
}

fn print_report(target_key: &str, report: &ScoreReport) {
    println!("\nTarget: {}", target_key);
    println!("{}", report.verdict.message);
    print_axis("Tone", &report.tone, |index| {
        vocab::tone_label(index).map(|tone| format!("tone {}", tone))
    });
    print_axis("Sound", &report.sound, |index| {
        vocab::syllable_label(index).map(str::to_string)
    });
}

fn print_axis(
    name: &str,
    analysis: &AxisAnalysis,
    label_of: impl Fn(usize) -> Option<String>,
) {
    if analysis.top.is_empty() {
        println!("  {}: no usable prediction", name);
        return;
    }
    println!("  {} guesses:", name);
    for (rank, guess) in analysis.top.iter().enumerate() {
        let label = label_of(guess.index).unwrap_or_else(|| "?".to_string());
        println!(
            "    {}. {} ({:.2}%)",
            rank + 1,
            label,
            guess.probability * 100.0
        );
    }
}
