//! Turns raw classifier logits into ranked, learner-facing feedback.
//!
//! Each attempt is scored on two independent axes (tone and syllable). Per
//! axis: stable softmax, descending ranking, correctness against the target,
//! and a near-miss check on the runner-up. The two analyses are then folded
//! into a single verdict whose wording depends on which axes matched and how
//! confident the classifier was.

use tracing::debug;

use crate::types::ClassifierOutput;
use crate::vocab::{self, Target};
use crate::{PipelineError, PipelineResult};

/// Ranked guesses kept for display per axis.
pub const TOP_DISPLAY: usize = 3;

/// Confidence cut-offs used by verdict synthesis. All tunable; the defaults
/// are the values the shipped classifier was calibrated against.
#[derive(Debug, Clone)]
pub struct Thresholds {
    /// Both target probabilities above this upgrade a correct round to
    /// "perfect".
    pub perfect_confidence: f32,
    /// A wrong top guess above this is called out explicitly.
    pub confident_wrong: f32,
    /// A runner-up matching the target above this counts as a close call.
    pub close_call: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            perfect_confidence: 0.70,
            confident_wrong: 0.60,
            close_call: 0.20,
        }
    }
}

/// How the attempt matched the target, coarsest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectnessLevel {
    Perfect,
    Good,
    ToneWrong,
    SoundWrong,
    BothWrong,
}

impl CorrectnessLevel {
    /// Whether the round counts toward the running score.
    pub fn counts_as_correct(self) -> bool {
        matches!(self, CorrectnessLevel::Perfect | CorrectnessLevel::Good)
    }
}

/// One ranked guess: class index in the head's output space plus its
/// softmax probability.
#[derive(Debug, Clone, Copy)]
pub struct RankedPrediction {
    pub index: usize,
    pub probability: f32,
}

/// Per-axis outcome. A malformed head degrades to the unknown state
/// (`predicted: None`, incorrect) instead of failing the round.
#[derive(Debug, Clone)]
pub struct AxisAnalysis {
    pub predicted: Option<String>,
    pub is_correct: bool,
    pub target_probability: f32,
    pub close_call: bool,
    pub top: Vec<RankedPrediction>,
}

impl AxisAnalysis {
    fn unknown() -> Self {
        Self {
            predicted: None,
            is_correct: false,
            target_probability: 0.0,
            close_call: false,
            top: Vec::new(),
        }
    }
}

/// The message shown to the learner plus its correctness level.
#[derive(Debug, Clone)]
pub struct FeedbackVerdict {
    pub level: CorrectnessLevel,
    pub message: String,
}

/// Full scoring result for one attempt.
#[derive(Debug, Clone)]
pub struct ScoreReport {
    pub tone: AxisAnalysis,
    pub sound: AxisAnalysis,
    pub verdict: FeedbackVerdict,
}

#[derive(Debug, Clone, Default)]
pub struct ScoreEngine {
    thresholds: Thresholds,
}

impl ScoreEngine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Score both heads against the target. Always completes: a round must
    /// resolve even when a head comes back unusable.
    pub fn score(&self, output: &ClassifierOutput, target: &Target) -> ScoreReport {
        let tone = self.analyze_axis(
            output.tone_logits(),
            vocab::TONE_COUNT,
            target.tone_output_index(),
            |index| vocab::tone_label(index).map(|tone| tone.to_string()),
        );
        let sound = self.analyze_axis(
            output.syllable_logits(),
            vocab::SYLLABLE_COUNT,
            target.syllable_index(),
            |index| vocab::syllable_label(index).map(str::to_string),
        );
        let verdict = self.synthesize(&tone, &sound, target);
        ScoreReport {
            tone,
            sound,
            verdict,
        }
    }

    fn analyze_axis(
        &self,
        logits: &[f32],
        expected_len: usize,
        target_index: usize,
        label_of: impl Fn(usize) -> Option<String>,
    ) -> AxisAnalysis {
        if logits.len() != expected_len {
            debug!(
                got = logits.len(),
                expected = expected_len,
                "head has wrong length; degrading to unknown analysis"
            );
            return AxisAnalysis::unknown();
        }
        let probabilities = match stable_softmax(logits) {
            Ok(probabilities) => probabilities,
            Err(err) => {
                debug!(error = %err, "head degraded to unknown analysis");
                return AxisAnalysis::unknown();
            }
        };
        if target_index >= probabilities.len() {
            debug!(
                target_index,
                classes = probabilities.len(),
                "target index outside head; degrading to unknown analysis"
            );
            return AxisAnalysis::unknown();
        }
        let ranked = rank(&probabilities);
        let predicted_index = ranked[0].index;
        let is_correct = predicted_index == target_index;
        let close_call = !is_correct
            && ranked
                .get(1)
                .map(|runner_up| {
                    runner_up.index == target_index
                        && runner_up.probability > self.thresholds.close_call
                })
                .unwrap_or(false);
        AxisAnalysis {
            predicted: label_of(predicted_index),
            is_correct,
            target_probability: probabilities[target_index],
            close_call,
            top: ranked.into_iter().take(TOP_DISPLAY).collect(),
        }
    }

    fn synthesize(
        &self,
        tone: &AxisAnalysis,
        sound: &AxisAnalysis,
        target: &Target,
    ) -> FeedbackVerdict {
        let level = match (tone.is_correct, sound.is_correct) {
            (true, true) => {
                if tone.target_probability > self.thresholds.perfect_confidence
                    && sound.target_probability > self.thresholds.perfect_confidence
                {
                    CorrectnessLevel::Perfect
                } else {
                    CorrectnessLevel::Good
                }
            }
            (false, true) => CorrectnessLevel::ToneWrong,
            (true, false) => CorrectnessLevel::SoundWrong,
            (false, false) => CorrectnessLevel::BothWrong,
        };
        let body = match level {
            CorrectnessLevel::Perfect => format!(
                "Excellent! \"{}\" with tone {} came through loud and clear.",
                target.syllable(),
                target.tone()
            ),
            CorrectnessLevel::Good => format!(
                "Correct: heard \"{}\" with tone {}.",
                target.syllable(),
                target.tone()
            ),
            CorrectnessLevel::ToneWrong => self.tone_wrong_message(tone, target),
            CorrectnessLevel::SoundWrong => format!(
                "Tone {} was right, but it sounded like \"{}\" instead of \"{}\".",
                target.tone(),
                heard(sound),
                target.syllable()
            ),
            CorrectnessLevel::BothWrong => both_wrong_message(tone, sound, target),
        };
        // At most one close-call prefix even when both axes qualify.
        let prefix = if tone.close_call || sound.close_call {
            "So close! "
        } else {
            ""
        };
        FeedbackVerdict {
            level,
            message: format!("{}{}", prefix, body),
        }
    }

    fn tone_wrong_message(&self, tone: &AxisAnalysis, target: &Target) -> String {
        let heard_probability = tone
            .top
            .first()
            .map(|guess| guess.probability)
            .unwrap_or(0.0);
        if heard_probability > self.thresholds.confident_wrong {
            format!(
                "Good \"{}\", but that was tone {} rather than tone {}.",
                target.syllable(),
                heard(tone),
                target.tone()
            )
        } else if tone.close_call {
            format!(
                "Good \"{}\", and you were close on the tone; aim for tone {}.",
                target.syllable(),
                target.tone()
            )
        } else {
            format!(
                "Heard \"{}\" with tone {}; give tone {} another try.",
                target.syllable(),
                heard(tone),
                target.tone()
            )
        }
    }
}

fn both_wrong_message(tone: &AxisAnalysis, sound: &AxisAnalysis, target: &Target) -> String {
    let mut message = format!(
        "Neither matched: that sounded like \"{}\" with tone {}. Try \"{}\" with tone {} again.",
        heard(sound),
        heard(tone),
        target.syllable(),
        target.tone()
    );
    if let Some(axis) = closer_axis(tone, sound) {
        message.push_str(&format!(" Your {} was the closer of the two.", axis));
    }
    message
}

/// Which axis had the target as its runner-up, preferring the higher
/// runner-up probability when both did.
fn closer_axis(tone: &AxisAnalysis, sound: &AxisAnalysis) -> Option<&'static str> {
    let runner_up = |analysis: &AxisAnalysis| {
        analysis
            .close_call
            .then(|| {
                analysis
                    .top
                    .get(1)
                    .map(|guess| guess.probability)
                    .unwrap_or(0.0)
            })
    };
    match (runner_up(tone), runner_up(sound)) {
        (Some(tone_p), Some(sound_p)) => Some(if tone_p >= sound_p { "tone" } else { "sound" }),
        (Some(_), None) => Some("tone"),
        (None, Some(_)) => Some("sound"),
        (None, None) => None,
    }
}

fn heard(analysis: &AxisAnalysis) -> String {
    analysis
        .predicted
        .clone()
        .unwrap_or_else(|| "unclear".to_string())
}

/// Numerically stable softmax: the running maximum is subtracted before
/// exponentiation so `exp` never overflows.
pub fn stable_softmax(logits: &[f32]) -> PipelineResult<Vec<f32>> {
    if logits.is_empty() {
        return Err(PipelineError::InvalidScores(
            "empty score vector".to_string(),
        ));
    }
    if logits.iter().any(|value| !value.is_finite()) {
        return Err(PipelineError::InvalidScores(
            "score vector contains non-finite entries".to_string(),
        ));
    }
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let scaled: Vec<f32> = logits.iter().map(|&value| (value - max).exp()).collect();
    let sum: f32 = scaled.iter().sum();
    Ok(scaled.into_iter().map(|value| value / sum).collect())
}

/// Rank classes by probability, descending. The sort is stable, so exact
/// ties keep their original index order.
pub fn rank(probabilities: &[f32]) -> Vec<RankedPrediction> {
    let mut ranked: Vec<RankedPrediction> = probabilities
        .iter()
        .copied()
        .enumerate()
        .map(|(index, probability)| RankedPrediction { index, probability })
        .collect();
    ranked.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::{rank, stable_softmax};

    #[test]
    fn softmax_sums_to_one() {
        let probabilities = stable_softmax(&[2.0, -1.0, 0.5, 3.5]).unwrap();
        let sum: f32 = probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probabilities.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn softmax_is_shift_invariant() {
        let base = stable_softmax(&[0.2, 1.4, -0.8]).unwrap();
        let shifted = stable_softmax(&[100.2, 101.4, 99.2]).unwrap();
        for (a, b) in base.iter().zip(shifted.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn softmax_survives_huge_logits() {
        let probabilities = stable_softmax(&[1_000.0, 999.0]).unwrap();
        assert!(probabilities.iter().all(|p| p.is_finite()));
        assert!(probabilities[0] > probabilities[1]);
    }

    #[test]
    fn softmax_rejects_empty_and_non_finite_input() {
        assert!(stable_softmax(&[]).is_err());
        assert!(stable_softmax(&[0.1, f32::NAN]).is_err());
        assert!(stable_softmax(&[f32::INFINITY, 0.0]).is_err());
    }

    #[test]
    fn ranking_is_descending_and_tie_stable() {
        let ranked = rank(&[0.1, 0.4, 0.4, 0.05]);
        let order: Vec<usize> = ranked.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![1, 2, 0, 3]);
    }
}
