//! Shapes arbitrary recorded audio into the classifier's fixed input tensor.
//!
//! Decode (if needed), downmix, resample to the model rate, then fit to the
//! exact sample count: longer recordings lose their tail, shorter ones are
//! zero-padded. Silence is not special-cased; an all-near-zero tensor is
//! scored like any other attempt.

use crate::audio::{decoder, resample};
use crate::types::{AudioData, ModelInput, TensorSpec};
use crate::{PipelineError, PipelineResult};

/// Condition mono audio at an arbitrary rate into a model-ready tensor.
pub fn condition(audio: &AudioData, spec: &TensorSpec) -> PipelineResult<ModelInput> {
    let resampled = resample::linear_resample(&audio.samples, audio.sample_rate, spec.sample_rate)
        .map_err(|err| PipelineError::Decode(err.to_string()))?;
    ModelInput::new(fit_length(resampled, spec.sample_count), spec)
}

/// Condition encoded audio bytes, decoding them first.
pub fn condition_bytes(
    bytes: Vec<u8>,
    extension: Option<&str>,
    spec: &TensorSpec,
) -> PipelineResult<ModelInput> {
    let audio = decoder::decode_bytes(bytes, extension)?;
    condition(&audio, spec)
}

/// Collapse interleaved frames to mono.
///
/// One channel passes through, two channels average, anything else is
/// outside the supported layouts.
pub fn downmix(interleaved: &[f32], channels: usize) -> PipelineResult<Vec<f32>> {
    match channels {
        1 => Ok(interleaved.to_vec()),
        2 => Ok(interleaved
            .chunks_exact(2)
            .map(|frame| (frame[0] + frame[1]) * 0.5)
            .collect()),
        other => Err(PipelineError::UnsupportedChannelLayout(other)),
    }
}

fn fit_length(mut samples: Vec<f32>, count: usize) -> Vec<f32> {
    if samples.len() > count {
        samples.truncate(count);
    } else {
        samples.resize(count, 0.0);
    }
    samples
}
