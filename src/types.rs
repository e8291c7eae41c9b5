//! Core types exchanged across the drill pipeline.

use ndarray::Array2;
use serde::Deserialize;

use crate::vocab;
use crate::{PipelineError, PipelineResult};

/// Raw audio data representation (mono, f32 samples)
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Audio samples, normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g., 44100)
    pub sample_rate: u32,
}

impl AudioData {
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Shape contract for the classifier input tensor.
///
/// The defaults match the shipped artifact: two seconds of 16 kHz mono audio.
#[derive(Debug, Clone, Deserialize)]
pub struct TensorSpec {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,
}

impl Default for TensorSpec {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            sample_count: default_sample_count(),
        }
    }
}

fn default_sample_rate() -> u32 {
    16_000
}

fn default_sample_count() -> usize {
    32_000
}

/// Fixed-shape classifier input: single-precision floats, shape [1, N].
///
/// The constructor is the only way in; a sample count that disagrees with the
/// spec never reaches the model.
#[derive(Debug, Clone)]
pub struct ModelInput {
    samples: Array2<f32>,
}

impl ModelInput {
    pub fn new(samples: Vec<f32>, spec: &TensorSpec) -> PipelineResult<Self> {
        if samples.len() != spec.sample_count {
            return Err(PipelineError::Inference(format!(
                "input tensor holds {} samples, model expects {}",
                samples.len(),
                spec.sample_count
            )));
        }
        let samples = Array2::from_shape_vec((1, spec.sample_count), samples)
            .map_err(|err| PipelineError::Inference(err.to_string()))?;
        Ok(Self { samples })
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Flat copy of the tensor contents in row-major order.
    pub fn to_vec(&self) -> Vec<f32> {
        self.samples.iter().copied().collect()
    }
}

/// Raw logits returned by the classifier, one vector per output head.
#[derive(Debug, Clone)]
pub struct ClassifierOutput {
    tone_logits: Vec<f32>,
    syllable_logits: Vec<f32>,
}

impl ClassifierOutput {
    /// Shape-validated constructor; wrong head lengths are an inference
    /// failure, surfaced as a voided attempt rather than a scoring panic.
    pub fn new(tone_logits: Vec<f32>, syllable_logits: Vec<f32>) -> PipelineResult<Self> {
        if tone_logits.len() != vocab::TONE_COUNT {
            return Err(PipelineError::Inference(format!(
                "tone head returned {} logits, expected {}",
                tone_logits.len(),
                vocab::TONE_COUNT
            )));
        }
        if syllable_logits.len() != vocab::SYLLABLE_COUNT {
            return Err(PipelineError::Inference(format!(
                "syllable head returned {} logits, expected {}",
                syllable_logits.len(),
                vocab::SYLLABLE_COUNT
            )));
        }
        Ok(Self {
            tone_logits,
            syllable_logits,
        })
    }

    /// Bypasses shape validation. Scoring degrades malformed heads to an
    /// unknown analysis instead of failing, and tests exercise that path.
    pub fn from_raw(tone_logits: Vec<f32>, syllable_logits: Vec<f32>) -> Self {
        Self {
            tone_logits,
            syllable_logits,
        }
    }

    pub fn tone_logits(&self) -> &[f32] {
        &self.tone_logits
    }

    pub fn syllable_logits(&self) -> &[f32] {
        &self.syllable_logits
    }
}

#[cfg(test)]
mod tests {
    use super::{ClassifierOutput, ModelInput, TensorSpec};
    use crate::vocab;

    #[test]
    fn model_input_rejects_short_buffers() {
        let spec = TensorSpec::default();
        let result = ModelInput::new(vec![0.0; 100], &spec);
        assert!(result.is_err());
    }

    #[test]
    fn model_input_preserves_sample_order() {
        let spec = TensorSpec {
            sample_rate: 16_000,
            sample_count: 4,
        };
        let input = ModelInput::new(vec![0.1, 0.2, 0.3, 0.4], &spec).unwrap();
        assert_eq!(input.to_vec(), vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn classifier_output_rejects_wrong_head_lengths() {
        let tone = vec![0.0; vocab::TONE_COUNT];
        let syllables = vec![0.0; vocab::SYLLABLE_COUNT - 1];
        assert!(ClassifierOutput::new(tone, syllables).is_err());
    }
}
