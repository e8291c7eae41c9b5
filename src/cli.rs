use std::ops::RangeInclusive;
use std::path::PathBuf;

use anyhow::{ensure, Result};
use clap::{Args, Parser, Subcommand};

use crate::model::fetch::{ModelSource, DEFAULT_FILENAME, DEFAULT_REPO};
use crate::model::ModelSpec;
use crate::scoring::Thresholds;
use crate::types::TensorSpec;

#[derive(Parser, Debug)]
#[command(
    name = "tonedrill",
    about = "Mandarin tone/syllable pronunciation drill"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the interactive microphone drill.
    Drill(DrillArgs),
    /// Score a recorded audio file against a target key.
    Attempt(AttemptArgs),
    /// Print a random practice prompt from the vocabulary.
    Prompt(PromptArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Local path to the ONNX classifier (skips the hub fetch).
    #[arg(long = "model-path")]
    pub model_path: Option<PathBuf>,
    /// Hub repository holding the classifier artifact.
    #[arg(long = "model-repo", default_value = DEFAULT_REPO)]
    pub model_repo: String,
    /// Artifact filename inside the repository.
    #[arg(long = "model-file", default_value = DEFAULT_FILENAME)]
    pub model_file: String,
    /// Name of the model's audio input tensor.
    #[arg(long = "input-name", default_value = "onnx::Unsqueeze_0")]
    pub input_name: String,
    /// Name of the tone output head.
    #[arg(long = "tone-output", default_value = "1425")]
    pub tone_output: String,
    /// Name of the syllable output head.
    #[arg(long = "sound-output", default_value = "1427")]
    pub sound_output: String,
}

impl ModelArgs {
    pub fn source(&self) -> ModelSource {
        ModelSource {
            path: self.model_path.clone(),
            repo: self.model_repo.clone(),
            filename: self.model_file.clone(),
        }
    }

    pub fn spec(&self) -> ModelSpec {
        ModelSpec {
            input_name: self.input_name.clone(),
            tone_output: self.tone_output.clone(),
            sound_output: self.sound_output.clone(),
            tensor: TensorSpec::default(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct CaptureArgs {
    /// Optional input device name.
    #[arg(long)]
    pub device: Option<String>,
    /// Minimum latency in milliseconds for capture buffering.
    #[arg(long = "latency-min")]
    pub latency_min: Option<u32>,
    /// Maximum latency in milliseconds for capture buffering.
    #[arg(long = "latency-max")]
    pub latency_max: Option<u32>,
}

impl CaptureArgs {
    pub fn latency_range(&self) -> Result<RangeInclusive<u32>> {
        match (self.latency_min, self.latency_max) {
            (Some(min), Some(max)) => {
                ensure!(min > 0, "latency_min must be positive");
                ensure!(max >= min, "latency_max must be >= latency_min");
                Ok(min..=max)
            }
            (None, None) => Ok(100..=200),
            _ => anyhow::bail!("provide both latency-min and latency-max or neither"),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    /// Target probability above which a correct round is called perfect.
    #[arg(long = "perfect-confidence", default_value_t = 0.70)]
    pub perfect_confidence: f32,
    /// Top-guess probability above which a wrong tone is named explicitly.
    #[arg(long = "confident-wrong", default_value_t = 0.60)]
    pub confident_wrong: f32,
    /// Runner-up probability above which a miss counts as a close call.
    #[arg(long = "close-call", default_value_t = 0.20)]
    pub close_call: f32,
}

impl ScoreArgs {
    pub fn thresholds(&self) -> Result<Thresholds> {
        for (label, value) in [
            ("perfect-confidence", self.perfect_confidence),
            ("confident-wrong", self.confident_wrong),
            ("close-call", self.close_call),
        ] {
            ensure!(
                (0.0..=1.0).contains(&value),
                "{} must be a probability in [0, 1], got {}",
                label,
                value
            );
        }
        Ok(Thresholds {
            perfect_confidence: self.perfect_confidence,
            confident_wrong: self.confident_wrong,
            close_call: self.close_call,
        })
    }
}

#[derive(Args, Debug, Clone)]
pub struct DrillArgs {
    #[command(flatten)]
    pub model: ModelArgs,
    #[command(flatten)]
    pub capture: CaptureArgs,
    #[command(flatten)]
    pub score: ScoreArgs,
    /// Prompt metadata JSON (characters/pinyin/speakers keyed by "chong4").
    #[arg(long)]
    pub prompts: Option<PathBuf>,
    /// Replay each attempt through the speakers after scoring.
    #[arg(long)]
    pub replay: bool,
    /// Keep each recorded attempt as a WAV file under this directory.
    #[arg(long = "save-dir")]
    pub save_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct AttemptArgs {
    /// Audio file containing the attempt (WAV, MP3, OGG, FLAC, ...).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
    /// Target key the attempt is scored against, e.g. "chong4".
    #[arg(long)]
    pub target: String,
    #[command(flatten)]
    pub model: ModelArgs,
    #[command(flatten)]
    pub score: ScoreArgs,
}

#[derive(Args, Debug, Clone)]
pub struct PromptArgs {
    /// Prompt metadata JSON (characters/pinyin/speakers keyed by "chong4").
    #[arg(long)]
    pub prompts: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn drill_defaults_match_the_shipped_artifact() {
        let cli = Cli::try_parse_from(["tonedrill", "drill"]).unwrap();
        let Command::Drill(args) = cli.command else {
            panic!("expected drill command");
        };
        assert_eq!(args.model.input_name, "onnx::Unsqueeze_0");
        assert_eq!(args.model.tone_output, "1425");
        assert_eq!(args.model.sound_output, "1427");
        let thresholds = args.score.thresholds().unwrap();
        assert!((thresholds.perfect_confidence - 0.70).abs() < 1e-6);
        assert!((thresholds.confident_wrong - 0.60).abs() < 1e-6);
        assert!((thresholds.close_call - 0.20).abs() < 1e-6);
        let range = args.capture.latency_range().unwrap();
        assert_eq!((*range.start(), *range.end()), (100, 200));
    }

    #[test]
    fn rejects_partial_latency_override() {
        let cli = Cli::try_parse_from(["tonedrill", "drill", "--latency-min", "150"]).unwrap();
        let Command::Drill(args) = cli.command else {
            panic!("expected drill command");
        };
        assert!(args.capture.latency_range().is_err());
    }

    #[test]
    fn rejects_out_of_range_thresholds() {
        let cli =
            Cli::try_parse_from(["tonedrill", "drill", "--close-call", "1.5"]).unwrap();
        let Command::Drill(args) = cli.command else {
            panic!("expected drill command");
        };
        assert!(args.score.thresholds().is_err());
    }

    #[test]
    fn attempt_requires_a_target_key() {
        assert!(Cli::try_parse_from(["tonedrill", "attempt", "clip.wav"]).is_err());
        let cli =
            Cli::try_parse_from(["tonedrill", "attempt", "clip.wav", "--target", "chong4"])
                .unwrap();
        let Command::Attempt(args) = cli.command else {
            panic!("expected attempt command");
        };
        assert_eq!(args.target, "chong4");
    }
}
