use super::context::{Destination, Renderer};
use crate::error::AudioError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};

/// The default output device of the host.
pub struct CpalDestination {
    device: cpal::Device,
    config: cpal::StreamConfig,
    format: SampleFormat,
    stream: Option<cpal::Stream>,
}

impl CpalDestination {
    pub fn open_default() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoOutputDevice)?;
        let supported = device.default_output_config()?;
        let format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        log::info!(
            "Output device: {} | {:?} @ {}Hz, Channels: {}",
            device.name().unwrap_or_else(|_| "Unknown".into()),
            format,
            config.sample_rate.0,
            config.channels
        );

        Ok(Self {
            device,
            config,
            format,
            stream: None,
        })
    }
}

impl Destination for CpalDestination {
    fn name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "Unknown".into())
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn start(&mut self, renderer: Renderer) -> Result<(), AudioError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let stream = match self.format {
            SampleFormat::F32 => build_output::<f32>(&self.device, &self.config, renderer),
            SampleFormat::I16 => build_output::<i16>(&self.device, &self.config, renderer),
            SampleFormat::U16 => build_output::<u16>(&self.device, &self.config, renderer),
            SampleFormat::I32 => build_output::<i32>(&self.device, &self.config, renderer),
            SampleFormat::F64 => build_output::<f64>(&self.device, &self.config, renderer),
            other => Err(AudioError::UnsupportedFormat(other)),
        }?;

        stream.play()?;
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(err) = stream.pause() {
                log::warn!("Failed to pause output stream: {}", err);
            }
        }
    }
}

fn build_output<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    renderer: Renderer,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let err_fn = |err| log::error!("Audio output error: {}", err);
    let mut scratch: Vec<f32> = Vec::new();

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            //
            // Render in f32, then convert to the device format.
            //
            scratch.resize(data.len(), 0.0);
            renderer.render(&mut scratch, channels);
            for (out, &sample) in data.iter_mut().zip(&scratch) {
                *out = T::from_sample(sample);
            }
        },
        err_fn,
        None,
    )?;
    Ok(stream)
}
