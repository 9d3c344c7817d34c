use super::RENDER_QUANTUM;
use crate::error::AudioError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use ringbuf::{Consumer, HeapRb, Producer};
use std::sync::Arc;

/// Capture processing requested from the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureConstraints {
    pub echo_cancellation: bool,
    pub auto_gain_control: bool,
    pub noise_suppression: bool,
    /// Requested input latency in seconds; 0 asks for the smallest buffer.
    pub latency: f64,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            auto_gain_control: false,
            noise_suppression: true,
            latency: 0.0,
        }
    }
}

impl CaptureConstraints {
    /// Device buffer size in frames for the latency hint, bounded by what the
    /// device supports and never below one render quantum.
    pub fn buffer_frames(&self, sample_rate: u32, supported: &cpal::SupportedBufferSize) -> Option<u32> {
        let wanted = ((self.latency.max(0.0) * sample_rate as f64).round() as u32).max(RENDER_QUANTUM as u32);
        match *supported {
            cpal::SupportedBufferSize::Range { min, max } => Some(wanted.clamp(min, max.max(min))),
            cpal::SupportedBufferSize::Unknown => None,
        }
    }
}

/// A live mono capture: the ring the device callback fills, plus the device
/// stream that must stay alive for as long as samples are wanted.
pub struct MediaStream {
    consumer: Consumer<f32, Arc<HeapRb<f32>>>,
    sample_rate: u32,
    stream: Option<cpal::Stream>,
}

impl MediaStream {
    /// A stream fed by something other than a capture device.
    #[cfg(test)]
    pub(crate) fn from_consumer(consumer: Consumer<f32, Arc<HeapRb<f32>>>, sample_rate: u32) -> Self {
        Self {
            consumer,
            sample_rate,
            stream: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub(crate) fn into_parts(self) -> (Consumer<f32, Arc<HeapRb<f32>>>, Option<cpal::Stream>) {
        (self.consumer, self.stream)
    }
}

/// Something that can hand out a microphone stream.
pub trait MediaDevices {
    /// One-shot request for an audio-only stream, preferably at `sample_rate`.
    fn get_user_media(
        &mut self,
        constraints: &CaptureConstraints,
        sample_rate: u32,
    ) -> Result<MediaStream, AudioError>;
}

/// Microphone access through the default cpal host.
pub struct CpalMediaDevices {
    host: cpal::Host,
}

impl CpalMediaDevices {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }
}

impl Default for CpalMediaDevices {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaDevices for CpalMediaDevices {
    fn get_user_media(
        &mut self,
        constraints: &CaptureConstraints,
        sample_rate: u32,
    ) -> Result<MediaStream, AudioError> {
        start_capture(&self.host, constraints, sample_rate)
    }
}

/// Logs every input device the host knows about.
pub fn log_input_devices(host: &cpal::Host) {
    log::info!("--- AVAILABLE INPUT DEVICES ---");
    if let Ok(devices) = host.input_devices() {
        for (i, dev) in devices.enumerate() {
            let name = dev.name().unwrap_or_else(|_| "Unknown".into());
            log::info!("  [{}]: {}", i, name);
        }
    }
    log::info!("-------------------------------");
}

/// Starts audio capture on the default input device.
/// Supports every sample format cpal can convert and downmixes to mono.
fn start_capture(
    host: &cpal::Host,
    constraints: &CaptureConstraints,
    sample_rate: u32,
) -> Result<MediaStream, AudioError> {
    log_input_devices(host);

    let device = host.default_input_device().ok_or(AudioError::NoInputDevice)?;
    log::info!(
        "Selected input device: {}",
        device.name().unwrap_or_else(|_| "Unknown".into())
    );

    //
    // The host hands out raw input; there is no processing to switch on.
    //
    if constraints.echo_cancellation || constraints.noise_suppression {
        log::warn!(
            "Echo cancellation / noise suppression requested but not provided by the host; capturing unprocessed input"
        );
    }
    if constraints.auto_gain_control {
        log::warn!("Automatic gain control requested but not provided by the host");
    }

    //
    // Prefer the context's sample rate so no resampling is needed.
    //
    let default_config = device.default_input_config()?;
    let format = default_config.sample_format();
    let supported_config = if default_config.sample_rate().0 == sample_rate {
        default_config
    } else {
        let matching = device
            .supported_input_configs()?
            .find(|range| {
                range.sample_format() == format
                    && range.min_sample_rate().0 <= sample_rate
                    && sample_rate <= range.max_sample_rate().0
            })
            .map(|range| range.with_sample_rate(cpal::SampleRate(sample_rate)));

        match matching {
            Some(config) => config,
            None => {
                log::warn!(
                    "Input device cannot run at {}Hz, falling back to {}Hz",
                    sample_rate,
                    default_config.sample_rate().0
                );
                default_config
            }
        }
    };

    let mut config: cpal::StreamConfig = supported_config.config();
    if let Some(frames) = constraints.buffer_frames(config.sample_rate.0, supported_config.buffer_size()) {
        config.buffer_size = cpal::BufferSize::Fixed(frames);
    }
    let channels = config.channels as usize;

    log::info!(
        "Input config: {:?} @ {}Hz, Channels: {}, Buffer: {:?}",
        format,
        config.sample_rate.0,
        channels,
        config.buffer_size
    );

    //
    // Ring buffer holds a little under a second of mono audio.
    //
    let capacity = (config.sample_rate.0 as usize).max(RENDER_QUANTUM * 8);
    let (producer, consumer) = HeapRb::<f32>::new(capacity).split();

    let stream = match format {
        SampleFormat::F32 => build_input::<f32>(&device, &config, producer),
        SampleFormat::I16 => build_input::<i16>(&device, &config, producer),
        SampleFormat::U16 => build_input::<u16>(&device, &config, producer),
        SampleFormat::I32 => build_input::<i32>(&device, &config, producer),
        SampleFormat::F64 => build_input::<f64>(&device, &config, producer),
        other => Err(AudioError::UnsupportedFormat(other)),
    }?;

    stream.play()?;

    Ok(MediaStream {
        consumer,
        sample_rate: config.sample_rate.0,
        stream: Some(stream),
    })
}

fn build_input<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut producer: Producer<f32, Arc<HeapRb<f32>>>,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;
    let err_fn = |err| log::error!("Audio input error: {}", err);

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            for frame in data.chunks_exact(channels) {
                let _ = producer.push(downmix(frame));
            }
        },
        err_fn,
        None,
    )?;
    Ok(stream)
}

/// Mono average for stereo, first channel for anything wider.
fn downmix<T>(frame: &[T]) -> f32
where
    T: Sample,
    f32: FromSample<T>,
{
    match frame {
        [mono] => mono.to_sample::<f32>(),
        [left, right] => (left.to_sample::<f32>() + right.to_sample::<f32>()) * 0.5,
        [first, ..] => first.to_sample::<f32>(),
        [] => 0.0,
    }
}
