use anyhow::{Context, Result};
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};

use crate::types::AudioData;

/// Play a mono clip through the default output device, blocking until done.
///
/// Used to replay the learner's own attempt after scoring.
pub fn play_clip(audio: &AudioData) -> Result<()> {
    let stereo = duplicate_to_stereo(&audio.samples);
    let (_stream, handle) =
        OutputStream::try_default().context("failed to open audio output stream")?;
    let sink = Sink::try_new(&handle).context("failed to create playback sink")?;
    sink.append(SamplesBuffer::new(2, audio.sample_rate, stereo));
    sink.set_volume(1.0);
    sink.sleep_until_end();
    Ok(())
}

pub fn duplicate_to_stereo(samples: &[f32]) -> Vec<f32> {
    let mut output = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        output.push(sample);
        output.push(sample);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::duplicate_to_stereo;

    #[test]
    fn replicates_each_sample_into_two_channels() {
        let stereo = duplicate_to_stereo(&[0.3, -0.3]);
        assert_eq!(stereo, vec![0.3, 0.3, -0.3, -0.3]);
    }
}
