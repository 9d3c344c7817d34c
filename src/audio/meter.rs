//! Raw input level tracking, measured at the head of the chain before any
//! EQ or volume is applied.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Samples below this magnitude count as silence (−80 dB).
const SILENCE_THRESHOLD: f32 = 0.0001;
const SILENCE_TIMEOUT: Duration = Duration::from_secs(2);

/// Counters the render thread bumps once per quantum and the GUI drains.
#[derive(Debug, Default)]
pub struct InputMeter {
    peak_bits: AtomicU32,
    samples: AtomicUsize,
    underruns: AtomicUsize,
}

/// What the input did since the previous [`InputMeter::take`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeterReading {
    pub peak: f32,
    pub samples: usize,
    pub underruns: usize,
}

impl InputMeter {
    /// Accounts for the `captured` samples of one pull.
    pub fn record(&self, captured: &[f32], underrun: bool) {
        let peak = captured.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        // Non-negative floats order the same way as their bit patterns.
        self.peak_bits.fetch_max(peak.to_bits(), Ordering::Relaxed);
        self.samples.fetch_add(captured.len(), Ordering::Relaxed);
        if underrun {
            self.underruns.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Returns and resets everything recorded so far.
    pub fn take(&self) -> MeterReading {
        MeterReading {
            peak: f32::from_bits(self.peak_bits.swap(0, Ordering::Relaxed)),
            samples: self.samples.swap(0, Ordering::Relaxed),
            underruns: self.underruns.swap(0, Ordering::Relaxed),
        }
    }
}

/// Silence detection over meter readings, with periodic stats logging.
#[derive(Debug)]
pub struct SignalMonitor {
    last_stats_time: Instant,
    samples_processed: usize,
    underruns: usize,
    max_input_peak: f32,
    no_signal_timer: Instant,
    is_silence: bool,
}

impl SignalMonitor {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_stats_time: now,
            samples_processed: 0,
            underruns: 0,
            max_input_peak: 0.0,
            no_signal_timer: now,
            is_silence: true,
        }
    }

    pub fn observe(&mut self, reading: MeterReading) {
        self.samples_processed += reading.samples;
        self.underruns += reading.underruns;
        self.max_input_peak = self.max_input_peak.max(reading.peak);

        //
        // Silence detection (−80 dB threshold, 2-second timeout).
        //
        if reading.peak > SILENCE_THRESHOLD {
            self.no_signal_timer = Instant::now();
            self.is_silence = false;
        } else if self.no_signal_timer.elapsed() > SILENCE_TIMEOUT {
            self.is_silence = true;
        }

        if self.last_stats_time.elapsed() > Duration::from_secs(1) {
            log::debug!(
                "Input | Processed: {} | Underruns: {} | Max Peak: {:.5} | Silence: {}",
                self.samples_processed,
                self.underruns,
                self.max_input_peak,
                self.is_silence
            );
            self.samples_processed = 0;
            self.underruns = 0;
            self.max_input_peak = 0.0;
            self.last_stats_time = Instant::now();
        }
    }

    pub fn is_silence(&self) -> bool {
        self.is_silence
    }
}

impl Default for SignalMonitor {
    fn default() -> Self {
        Self::new()
    }
}
