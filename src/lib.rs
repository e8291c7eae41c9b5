//! tonedrill: Mandarin tone/syllable pronunciation drill.
//!
//! A learner is shown a target syllable+tone, records an attempt through the
//! microphone, and the recording is classified against fixed tone (4-class)
//! and syllable (410-class) vocabularies by a pre-trained acoustic model.
//! The scored result is turned into ranked, learner-facing feedback and
//! folded into a running tally.

pub mod audio;
pub mod cli;
pub mod model;
pub mod scoring;
pub mod session;
pub mod types;
pub mod vocab;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Convenient alias for results returned by the drill pipeline.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Round-level failures raised between capture stop and verdict display.
///
/// None of these are fatal to the session: a failed round is voided (the
/// tally is untouched) and the learner is asked to record again.
#[derive(Debug, Clone)]
pub enum PipelineError {
    /// The recorded bytes could not be decoded as audio.
    Decode(String),
    /// The decoded audio has a channel count the downmixer does not handle.
    UnsupportedChannelLayout(usize),
    /// The classifier failed or returned malformed outputs.
    Inference(String),
    /// A score vector was empty or contained non-numeric entries.
    InvalidScores(String),
}

impl Display for PipelineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Decode(message) => {
                write!(f, "could not decode audio: {}", message)
            }
            PipelineError::UnsupportedChannelLayout(channels) => {
                write!(f, "unsupported channel layout: {} channels", channels)
            }
            PipelineError::Inference(message) => {
                write!(f, "classifier failure: {}", message)
            }
            PipelineError::InvalidScores(message) => {
                write!(f, "invalid score vector: {}", message)
            }
        }
    }
}

impl Error for PipelineError {}
