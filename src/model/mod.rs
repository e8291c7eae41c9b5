//! Invocation of the pre-trained tone/syllable classifier.
//!
//! The model is an opaque ONNX artifact with one audio input and two output
//! heads. Tensor names are a contract with the artifact, not with this code,
//! so they are carried in [`ModelSpec`] rather than hard-coded.

pub mod fetch;

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tract_onnx::prelude::*;
use tracing::info;

use crate::types::{ClassifierOutput, ModelInput, TensorSpec};
use crate::{PipelineError, PipelineResult};

/// Graph-level contract with the model artifact: tensor names and shape.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelSpec {
    #[serde(default = "default_input_name")]
    pub input_name: String,
    #[serde(default = "default_tone_output")]
    pub tone_output: String,
    #[serde(default = "default_sound_output")]
    pub sound_output: String,
    #[serde(default)]
    pub tensor: TensorSpec,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            input_name: default_input_name(),
            tone_output: default_tone_output(),
            sound_output: default_sound_output(),
            tensor: TensorSpec::default(),
        }
    }
}

fn default_input_name() -> String {
    "onnx::Unsqueeze_0".to_string()
}

fn default_tone_output() -> String {
    "1425".to_string()
}

fn default_sound_output() -> String {
    "1427".to_string()
}

/// A ready-to-invoke classification capability.
///
/// Stateless per call; the session state machine guarantees only one
/// invocation is in flight at a time.
pub trait Classifier {
    fn classify(&self, input: &ModelInput) -> PipelineResult<ClassifierOutput>;
}

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// tract-onnx backed classifier over a local model artifact.
pub struct OnnxClassifier {
    plan: RunnableModel,
    spec: ModelSpec,
}

impl OnnxClassifier {
    /// Load and optimize the artifact, pinning the graph to the configured
    /// tensor names and input shape.
    pub fn load(path: &Path, spec: ModelSpec) -> Result<Self> {
        info!(path = %path.display(), input = %spec.input_name, "loading classifier artifact");
        let mut graph = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("failed to read ONNX model at {}", path.display()))?;
        graph
            .set_input_names([spec.input_name.as_str()])
            .with_context(|| format!("model has no input named '{}'", spec.input_name))?;
        graph
            .set_output_names([spec.tone_output.as_str(), spec.sound_output.as_str()])
            .with_context(|| {
                format!(
                    "model has no outputs named '{}' and '{}'",
                    spec.tone_output, spec.sound_output
                )
            })?;
        graph
            .set_input_fact(0, f32::fact([1, spec.tensor.sample_count]).into())
            .context("failed to fix the model input shape")?;
        let plan = graph
            .into_optimized()
            .context("failed to optimize the model graph")?
            .into_runnable()
            .context("failed to plan model execution")?;
        Ok(Self { plan, spec })
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&self, input: &ModelInput) -> PipelineResult<ClassifierOutput> {
        let tensor = Tensor::from_shape(&[1, self.spec.tensor.sample_count], &input.to_vec())
            .map_err(inference_error)?;
        let outputs = self
            .plan
            .run(tvec![tensor.into()])
            .map_err(inference_error)?;
        if outputs.len() != 2 {
            return Err(PipelineError::Inference(format!(
                "model returned {} outputs, expected 2",
                outputs.len()
            )));
        }
        let tone_logits = head_to_vec(&outputs[0])?;
        let syllable_logits = head_to_vec(&outputs[1])?;
        ClassifierOutput::new(tone_logits, syllable_logits)
    }
}

fn head_to_vec(value: &TValue) -> PipelineResult<Vec<f32>> {
    let view = value.to_array_view::<f32>().map_err(inference_error)?;
    Ok(view.iter().copied().collect())
}

fn inference_error(err: impl std::fmt::Display) -> PipelineError {
    PipelineError::Inference(err.to_string())
}

/// Classifier returning the same logits for every input.
///
/// Stands in for the ONNX artifact in tests and offline smoke runs.
#[derive(Debug, Clone)]
pub struct FixedClassifier {
    tone_logits: Vec<f32>,
    syllable_logits: Vec<f32>,
}

impl FixedClassifier {
    pub fn new(tone_logits: Vec<f32>, syllable_logits: Vec<f32>) -> Self {
        Self {
            tone_logits,
            syllable_logits,
        }
    }
}

impl Classifier for FixedClassifier {
    fn classify(&self, _input: &ModelInput) -> PipelineResult<ClassifierOutput> {
        ClassifierOutput::new(self.tone_logits.clone(), self.syllable_logits.clone())
    }
}
