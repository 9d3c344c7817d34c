use super::node::{AudioNode, NodeKind, RenderInfo};
use crate::error::AnalyserError;
use crate::fft::{find_dft, DFTBase};
use num_complex::Complex32;
use ringbuf::{Consumer, HeapRb, Producer};
use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::Arc;

pub const MIN_FFT_SIZE: usize = 32;
pub const MAX_FFT_SIZE: usize = 32768;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyserOptions {
    pub fft_size: usize,
    pub min_decibels: f32,
    pub max_decibels: f32,
    pub smoothing_time_constant: f32,
}

impl Default for AnalyserOptions {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            min_decibels: -100.0,
            max_decibels: -30.0,
            smoothing_time_constant: 0.8,
        }
    }
}

impl AnalyserOptions {
    pub fn validate(&self) -> Result<(), AnalyserError> {
        let n = self.fft_size;
        if !n.is_power_of_two() || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&n) {
            return Err(AnalyserError::InvalidFftSize(n));
        }
        Ok(())
    }
}

/// Creates the two halves of an analyser: the pass-through tap that lives in
/// the render chain, and the reader used by the visualizer.
pub fn analyser(
    options: AnalyserOptions,
    sample_rate: u32,
) -> Result<(AnalyserTap, Analyser), AnalyserError> {
    options.validate()?;

    //
    // Ring holds 100 ms (at least 4 windows) so slow GUI frames only lose
    // samples the reader would skip anyway.
    //
    let capacity = (sample_rate as usize / 10).max(options.fft_size * 4);
    let (producer, consumer) = HeapRb::<f32>::new(capacity).split();

    Ok((AnalyserTap { producer }, Analyser::new(consumer, options)))
}

/// Render-side half: copies every sample it sees into the analysis ring.
pub struct AnalyserTap {
    producer: Producer<f32, Arc<HeapRb<f32>>>,
}

impl AudioNode for AnalyserTap {
    fn kind(&self) -> NodeKind {
        NodeKind::Analyser
    }

    fn process(&mut self, block: &mut [f32], _info: &RenderInfo) {
        // A full ring means the reader is behind; it discards the backlog.
        let _ = self.producer.push_slice(block);
    }
}

/// Reader half: windowed FFT over the most recent `fft_size` samples.
pub struct Analyser {
    consumer: Consumer<f32, Arc<HeapRb<f32>>>,
    fft_plan: Arc<dyn DFTBase>,
    options: AnalyserOptions,

    time_domain_buf: VecDeque<f32>,
    window: Vec<f32>,
    scratch: Vec<Complex32>,
    smoothed: Vec<f32>,
}

impl Analyser {
    fn new(consumer: Consumer<f32, Arc<HeapRb<f32>>>, options: AnalyserOptions) -> Self {
        let n = options.fft_size;
        let fft_plan = find_dft(n);
        debug_assert_eq!(fft_plan.size(), n);

        Self {
            consumer,
            fft_plan,
            options,
            time_domain_buf: VecDeque::from(vec![0.0; n]),
            window: blackman(n),
            scratch: vec![Complex32::default(); n],
            smoothed: vec![0.0; n / 2],
        }
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.options.fft_size / 2
    }

    pub fn algorithm_name(&self) -> String {
        self.fft_plan.name()
    }

    /// Moves freshly rendered samples into the sliding analysis window,
    /// keeping only the newest `fft_size` of them.
    fn ingest(&mut self) {
        //
        // A full ring has been refusing the newest samples; whatever it holds
        // is stale. Drop it and pick up fresh audio on the next frame.
        //
        if self.consumer.is_full() {
            let dropped = self.consumer.skip(self.consumer.len());
            log::debug!("Analyser fell behind, dropped {} samples", dropped);
            return;
        }

        let excess = self.consumer.len().saturating_sub(self.options.fft_size);
        self.consumer.skip(excess);

        while let Some(sample) = self.consumer.pop() {
            self.time_domain_buf.pop_front();
            self.time_domain_buf.push_back(sample);
        }
    }

    /// Fills `out` with the current spectrum, one byte per bin.
    ///
    /// Writes `min(out.len(), frequency_bin_count())` entries; anything
    /// beyond the bin count is left untouched.
    pub fn get_byte_frequency_data(&mut self, out: &mut [u8]) {
        self.ingest();
        self.update_spectrum();

        let AnalyserOptions {
            min_decibels,
            max_decibels,
            ..
        } = self.options;
        let range_scale = 255.0 / (max_decibels - min_decibels);

        for (byte, &mag) in out.iter_mut().zip(&self.smoothed) {
            let db = 20.0 * mag.log10();
            let scaled = (range_scale * (db - min_decibels)).floor();
            // -inf dB (exact silence) also lands on 0.
            *byte = if scaled.is_nan() {
                0
            } else {
                scaled.clamp(0.0, 255.0) as u8
            };
        }
    }

    /// Windowed FFT, magnitude normalization and temporal smoothing.
    fn update_spectrum(&mut self) {
        let n = self.options.fft_size;

        //
        // Apply window function and prepare complex FFT input.
        //
        for ((slot, &x), &w) in self
            .scratch
            .iter_mut()
            .zip(&self.time_domain_buf)
            .zip(&self.window)
        {
            *slot = Complex32::new(x * w, 0.0);
        }

        self.fft_plan.xform_inplace(&mut self.scratch);

        //
        // Blend with the previous frame.
        //
        let tau = self.options.smoothing_time_constant;
        for (prev, bin) in self.smoothed.iter_mut().zip(&self.scratch) {
            let mag = bin.norm() / n as f32;
            let next = tau * *prev + (1.0 - tau) * mag;
            *prev = if next.is_finite() { next } else { 0.0 };
        }
    }
}

/// Blackman window with α = 0.16.
fn blackman(n: usize) -> Vec<f32> {
    let a0 = 0.42;
    let a1 = 0.5;
    let a2 = 0.08;
    (0..n)
        .map(|i| {
            let phase = 2.0 * PI * i as f32 / n as f32;
            a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(fft_size: usize) -> AnalyserOptions {
        AnalyserOptions {
            fft_size,
            min_decibels: -100.0,
            max_decibels: 0.0,
            smoothing_time_constant: 0.0,
        }
    }

    fn info() -> RenderInfo {
        RenderInfo {
            current_time: 0.0,
            sample_rate: 48_000.0,
        }
    }

    #[test]
    fn rejects_invalid_fft_sizes() {
        for size in [0, 16, 100, 65536] {
            assert!(matches!(
                analyser(options(size), 48_000),
                Err(AnalyserError::InvalidFftSize(s)) if s == size
            ));
        }
        assert!(analyser(options(32), 48_000).is_ok());
    }

    #[test]
    fn bin_count_is_half_the_transform() {
        let (_, a) = analyser(options(256), 48_000).unwrap();
        assert_eq!(a.frequency_bin_count(), 128);
    }

    #[test]
    fn silence_yields_zero_bytes() {
        let (_, mut a) = analyser(options(256), 48_000).unwrap();
        let mut out = vec![7u8; 128];
        a.get_byte_frequency_data(&mut out);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let n = 256;
        let (mut tap, mut a) = analyser(options(n), 48_000).unwrap();

        let mut block: Vec<f32> = (0..n)
            .map(|i| (2.0 * PI * 16.0 * i as f32 / n as f32).sin())
            .collect();
        tap.process(&mut block, &info());

        let mut out = vec![0u8; n / 2];
        a.get_byte_frequency_data(&mut out);

        let peak = (0..out.len()).max_by_key(|&i| out[i]).unwrap();
        assert_eq!(peak, 16);
        // Blackman coherent gain 0.42: about −13.5 dB for a full-scale sine.
        assert!(out[16] > 200 && out[16] < 240);
        assert!(out[60] < out[16]);
    }

    #[test]
    fn tap_passes_audio_through() {
        let (mut tap, _a) = analyser(options(32), 48_000).unwrap();
        let mut block = [0.5, -0.5, 0.25];
        tap.process(&mut block, &info());
        assert_eq!(block, [0.5, -0.5, 0.25]);
    }

    #[test]
    fn short_output_buffer_is_filled_partially() {
        let (_, mut a) = analyser(options(64), 48_000).unwrap();
        let mut out = vec![9u8; 4];
        a.get_byte_frequency_data(&mut out);
        assert_eq!(out, vec![0; 4]);
    }

    fn sine(n: usize, amplitude: f32) -> Vec<f32> {
        (0..n)
            .map(|i| amplitude * (2.0 * PI * 16.0 * i as f32 / 256.0).sin())
            .collect()
    }

    #[test]
    fn window_holds_only_the_newest_samples() {
        let n = 256;
        let (mut tap, mut a) = analyser(options(n), 48_000).unwrap();

        // Loud audio followed by more than four windows of silence, all
        // arriving between two reads.
        tap.process(&mut sine(4 * n, 1.0), &info());
        tap.process(&mut vec![0.0; 4 * n + 128], &info());

        let mut out = vec![9u8; n / 2];
        a.get_byte_frequency_data(&mut out);
        assert!(out.iter().all(|&b| b == 0), "{:?}", out);
    }

    #[test]
    fn overflowing_ring_drops_stale_backlog() {
        let n = 256;
        let sample_rate = 8_000;
        let (mut tap, mut a) = analyser(options(n), sample_rate).unwrap();

        // 1024-sample ring: fill it with loud audio, then lose more.
        tap.process(&mut sine(1024, 1.0), &info());
        tap.process(&mut vec![0.0; 512], &info());

        let mut out = vec![0u8; n / 2];
        a.get_byte_frequency_data(&mut out);
        assert!(out.iter().all(|&b| b == 0));

        // Fresh audio after catching up is what gets analysed.
        tap.process(&mut sine(n, 1.0), &info());
        a.get_byte_frequency_data(&mut out);
        assert!(out[16] > 200);
    }
}
