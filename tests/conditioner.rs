use tonedrill::audio::conditioner;
use tonedrill::types::{AudioData, TensorSpec};

fn spec() -> TensorSpec {
    TensorSpec::default()
}

fn clip(samples: Vec<f32>, sample_rate: u32) -> AudioData {
    AudioData {
        samples,
        sample_rate,
    }
}

#[test]
fn output_is_always_the_model_sample_count() {
    for len in [1usize, 100, 16_000, 32_000, 48_000, 90_000] {
        let tensor = conditioner::condition(&clip(vec![0.1; len], 16_000), &spec()).unwrap();
        assert_eq!(tensor.sample_count(), 32_000, "input length {}", len);
    }
}

#[test]
fn padded_tail_is_exactly_zero() {
    let tensor = conditioner::condition(&clip(vec![0.3; 10_000], 16_000), &spec()).unwrap();
    let samples = tensor.to_vec();
    assert!(samples[..10_000].iter().all(|&s| (s - 0.3).abs() < 1e-6));
    assert!(samples[10_000..].iter().all(|&s| s == 0.0));
}

#[test]
fn truncation_keeps_the_resampled_head() {
    let mut samples = vec![0.7; 32_000];
    samples.extend(vec![-0.7; 16_000]);
    let tensor = conditioner::condition(&clip(samples, 16_000), &spec()).unwrap();
    assert!(tensor.to_vec().iter().all(|&s| (s - 0.7).abs() < 1e-6));
}

#[test]
fn high_rate_capture_is_resampled_before_fitting() {
    // Three seconds at 48 kHz resample to 48 000 samples at 16 kHz, which
    // then truncate to the two-second tensor.
    let tensor = conditioner::condition(&clip(vec![0.2; 144_000], 48_000), &spec()).unwrap();
    let samples = tensor.to_vec();
    assert_eq!(samples.len(), 32_000);
    assert!(samples.iter().all(|&s| (s - 0.2).abs() < 1e-5));
}

#[test]
fn low_rate_capture_pads_after_resampling() {
    // One second at 8 kHz becomes 16 000 samples at 16 kHz, then zero-pads.
    let tensor = conditioner::condition(&clip(vec![0.4; 8_000], 8_000), &spec()).unwrap();
    let samples = tensor.to_vec();
    assert!(samples[..16_000].iter().all(|&s| (s - 0.4).abs() < 1e-5));
    assert!(samples[16_000..].iter().all(|&s| s == 0.0));
}

#[test]
fn silence_conditions_to_a_valid_all_zero_tensor() {
    let tensor = conditioner::condition(&clip(vec![0.0; 4_000], 16_000), &spec()).unwrap();
    assert_eq!(tensor.sample_count(), 32_000);
    assert!(tensor.to_vec().iter().all(|&s| s == 0.0));
}
