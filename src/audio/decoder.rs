use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::conditioner;
use crate::types::AudioData;
use crate::{PipelineError, PipelineResult};

/// Decode encoded audio bytes to mono f32 samples at their native rate.
///
/// The container/codec is probed from the content, with `extension` as an
/// optional hint. Stereo is downmixed by averaging; other channel layouts
/// are rejected.
pub fn decode_bytes(bytes: Vec<u8>, extension: Option<&str>) -> PipelineResult<AudioData> {
    let source = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(decode_error)?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PipelineError::Decode("no audio track in input".to_string()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| PipelineError::Decode("sample rate not declared by input".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(decode_error)?;

    let mut samples = Vec::new();
    let mut interleaved: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(decode_error(err)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder.decode(&packet).map_err(decode_error)?;
        let spec = *decoded.spec();
        let channels = spec.channels.count();
        let buffer = interleaved
            .get_or_insert_with(|| SampleBuffer::new(decoded.capacity() as u64, spec));
        buffer.copy_interleaved_ref(decoded);
        samples.extend(conditioner::downmix(buffer.samples(), channels)?);
    }

    Ok(AudioData {
        samples,
        sample_rate,
    })
}

/// Decode an audio file to mono f32 samples, using its extension as a probe
/// hint.
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<AudioData> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read audio file {}", path.display()))?;
    let extension = path.extension().and_then(|ext| ext.to_str());
    decode_bytes(bytes, extension)
        .with_context(|| format!("failed to decode audio file {}", path.display()))
}

fn decode_error(err: SymphoniaError) -> PipelineError {
    PipelineError::Decode(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::decode_bytes;
    use crate::PipelineError;

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let result = decode_bytes(vec![0xde, 0xad, 0xbe, 0xef], None);
        assert!(matches!(result, Err(PipelineError::Decode(_))));
    }

    #[test]
    fn empty_input_is_a_decode_error() {
        assert!(decode_bytes(Vec::new(), Some("wav")).is_err());
    }
}
