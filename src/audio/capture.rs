use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleFormat, Stream, StreamConfig};

use crate::audio::conditioner;

#[derive(Clone, Debug)]
pub struct CaptureConfig {
    pub device_name: Option<String>,
    pub latency_ms: RangeInclusive<u32>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_name: None,
            latency_ms: 100..=200,
        }
    }
}

/// Exclusive hold on a microphone stream for the duration of one recording.
///
/// Chunks arrive mono at the device's native rate; the caller owns resampling.
/// Stopping releases the device immediately.
pub struct LiveCapture {
    stream: Stream,
    receiver: Receiver<Vec<f32>>,
    finished: Arc<AtomicBool>,
    sample_rate: u32,
}

impl LiveCapture {
    pub fn start(config: &CaptureConfig) -> Result<Self> {
        let device = select_device(config)?;
        let setup = build_stream(&device, config)?;
        setup
            .stream
            .play()
            .context("failed to start microphone stream")?;
        Ok(Self {
            stream: setup.stream,
            receiver: setup.receiver,
            finished: setup.finished,
            sample_rate: setup.sample_rate,
        })
    }

    pub fn recv_chunk(&self, timeout: Duration) -> Option<Vec<f32>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(chunk) => Some(chunk),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn stop(&self) {
        self.finished.store(true, Ordering::SeqCst);
        let _ = self.stream.pause();
    }
}

impl Drop for LiveCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

struct StreamSetup {
    stream: Stream,
    receiver: Receiver<Vec<f32>>,
    finished: Arc<AtomicBool>,
    sample_rate: u32,
}

fn select_device(config: &CaptureConfig) -> Result<Device> {
    let host = cpal::default_host();
    match config.device_name.as_deref() {
        Some(name) => host
            .input_devices()
            .context("listing input devices failed")?
            .find(|device| device.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| anyhow!("input device '{}' not found", name)),
        None => host
            .default_input_device()
            .context("no default input device available"),
    }
}

fn build_stream(device: &Device, config: &CaptureConfig) -> Result<StreamSetup> {
    let supported = device
        .default_input_config()
        .context("failed to query default input config")?;
    let channels = supported.channels() as usize;
    if !(1..=2).contains(&channels) {
        return Err(anyhow!(
            "input device offers {} channels; only mono and stereo are supported",
            channels
        ));
    }
    let stream_config = StreamConfig {
        channels: supported.channels(),
        sample_rate: supported.sample_rate(),
        buffer_size: BufferSize::Default,
    };
    let capacity = channel_capacity(stream_config.sample_rate.0, &config.latency_ms);
    let (sender, receiver) = mpsc::sync_channel::<Vec<f32>>(capacity);
    let finished = Arc::new(AtomicBool::new(false));
    let stream = build_input_stream(
        device,
        &stream_config,
        supported.sample_format(),
        sender,
        finished.clone(),
    )?;
    Ok(StreamSetup {
        stream,
        receiver,
        finished,
        sample_rate: stream_config.sample_rate.0,
    })
}

fn build_input_stream(
    device: &Device,
    config: &StreamConfig,
    format: SampleFormat,
    sender: SyncSender<Vec<f32>>,
    finished: Arc<AtomicBool>,
) -> Result<Stream> {
    let err_fn = |err| tracing::error!(error = %err, "microphone stream error");
    let channels = config.channels as usize;
    match format {
        SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _| forward_chunk(data, channels, &sender, &finished),
            err_fn,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _| {
                let converted: Vec<f32> = data
                    .iter()
                    .map(|&sample| sample as f32 / i16::MAX as f32)
                    .collect();
                forward_chunk(&converted, channels, &sender, &finished);
            },
            err_fn,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            config,
            move |data: &[u16], _| {
                let converted: Vec<f32> = data
                    .iter()
                    .map(|&sample| (sample as f32 / u16::MAX as f32) * 2.0 - 1.0)
                    .collect();
                forward_chunk(&converted, channels, &sender, &finished);
            },
            err_fn,
            None,
        ),
        other => return Err(anyhow!("unsupported input sample format {:?}", other)),
    }
    .map_err(|err| anyhow!(err))
    .context("failed to build input stream")
}

/// Downmix one callback buffer and queue it, dropping chunks once the
/// recording is finished or the queue is full.
fn forward_chunk(
    interleaved: &[f32],
    channels: usize,
    sender: &SyncSender<Vec<f32>>,
    finished: &AtomicBool,
) {
    if finished.load(Ordering::Relaxed) {
        return;
    }
    // Channel count was validated when the stream was built.
    if let Ok(mono) = conditioner::downmix(interleaved, channels) {
        let _ = sender.try_send(mono);
    }
}

/// Bound the chunk queue by the worst-case latency window.
fn channel_capacity(sample_rate: u32, latency_ms: &RangeInclusive<u32>) -> usize {
    let window_ms = u64::from(*latency_ms.end());
    let queued_frames = u64::from(sample_rate) * window_ms / 1000;
    (queued_frames / 1024).max(2) as usize
}

#[cfg(test)]
mod tests {
    use super::channel_capacity;

    #[test]
    fn channel_capacity_scales_with_latency() {
        let small = channel_capacity(16_000, &(100..=100));
        let large = channel_capacity(48_000, &(100..=400));
        assert!(small >= 2);
        assert!(large > small);
    }

    #[test]
    fn channel_capacity_never_drops_below_two_chunks() {
        assert_eq!(channel_capacity(8_000, &(1..=1)), 2);
    }
}
