use super::meter::InputMeter;
use super::param::AudioParam;
use super::RENDER_QUANTUM;
use ringbuf::{Consumer, HeapRb};
use std::fmt;
use std::sync::Arc;

/// Identity of each stage in the signal chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    MediaStreamSource,
    Bass,
    Mid,
    Treble,
    Gain,
    Analyser,
    Destination,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::MediaStreamSource => "source",
            NodeKind::Bass => "bass",
            NodeKind::Mid => "mid",
            NodeKind::Treble => "treble",
            NodeKind::Gain => "gain",
            NodeKind::Analyser => "analyser",
            NodeKind::Destination => "destination",
        };
        f.write_str(name)
    }
}

/// Timing of the render quantum being processed.
#[derive(Debug, Clone, Copy)]
pub struct RenderInfo {
    /// Context time of the first frame in the block.
    pub current_time: f64,
    pub sample_rate: f32,
}

impl RenderInfo {
    pub fn frame_time(&self, frame: usize) -> f64 {
        self.current_time + frame as f64 / self.sample_rate as f64
    }
}

/// One mono processing stage running on the render thread.
pub trait AudioNode: Send {
    fn kind(&self) -> NodeKind;

    /// Processes `block` in place.
    fn process(&mut self, block: &mut [f32], info: &RenderInfo);
}

/// Linear gain applied per sample.
pub struct GainNode {
    gain: AudioParam,
    values: Vec<f32>,
}

impl GainNode {
    pub fn new(gain: AudioParam) -> Self {
        Self {
            gain,
            values: vec![0.0; RENDER_QUANTUM],
        }
    }
}

impl AudioNode for GainNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Gain
    }

    fn process(&mut self, block: &mut [f32], info: &RenderInfo) {
        if self.values.len() < block.len() {
            self.values.resize(block.len(), 0.0);
        }
        let values = &mut self.values[..block.len()];
        self.gain.fill_values(values, |i| info.frame_time(i));

        for (sample, &gain) in block.iter_mut().zip(values.iter()) {
            *sample *= gain;
        }
    }
}

/// Head of the chain: pulls captured mono samples from the input ring.
pub struct MediaStreamSource {
    consumer: Consumer<f32, Arc<HeapRb<f32>>>,
    meter: Arc<InputMeter>,
}

impl MediaStreamSource {
    pub(crate) fn new(consumer: Consumer<f32, Arc<HeapRb<f32>>>) -> Self {
        Self {
            consumer,
            meter: Arc::new(InputMeter::default()),
        }
    }

    /// Level of the raw captured input, before any processing.
    pub fn meter(&self) -> Arc<InputMeter> {
        self.meter.clone()
    }

    /// Drops everything queued except the newest `keep` samples; returns
    /// how many were dropped.
    pub fn discard_backlog(&mut self, keep: usize) -> usize {
        let excess = self.consumer.len().saturating_sub(keep);
        self.consumer.skip(excess)
    }

    /// Fills `block` with the next captured samples, padding with silence
    /// when the device has not delivered enough yet.
    pub fn pull(&mut self, block: &mut [f32]) {
        let read = self.consumer.pop_slice(block);
        let underrun = read < block.len();
        if underrun {
            block[read..].fill(0.0);
        }
        self.meter.record(&block[..read], underrun);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> RenderInfo {
        RenderInfo {
            current_time: 0.0,
            sample_rate: 48_000.0,
        }
    }

    #[test]
    fn gain_scales_samples() {
        let mut node = GainNode::new(AudioParam::new("gain", 0.5));
        let mut block = [1.0, -2.0, 0.25];
        node.process(&mut block, &info());
        assert_eq!(block, [0.5, -1.0, 0.125]);
    }

    #[test]
    fn source_pads_underrun_with_silence() {
        let (mut producer, consumer) = HeapRb::<f32>::new(16).split();
        producer.push_slice(&[0.1, 0.2]);

        let mut source = MediaStreamSource::new(consumer);
        let mut block = [9.0; 4];
        source.pull(&mut block);

        assert_eq!(block, [0.1, 0.2, 0.0, 0.0]);
        let reading = source.meter().take();
        assert_eq!(reading.samples, 2);
        assert_eq!(reading.underruns, 1);
        assert_eq!(reading.peak, 0.2);
    }

    #[test]
    fn discarding_backlog_keeps_newest_samples() {
        let (mut producer, consumer) = HeapRb::<f32>::new(16).split();
        producer.push_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        let mut source = MediaStreamSource::new(consumer);
        assert_eq!(source.discard_backlog(2), 3);
        assert_eq!(source.discard_backlog(2), 0);

        let mut block = [0.0; 2];
        source.pull(&mut block);
        assert_eq!(block, [4.0, 5.0]);
    }

    #[test]
    fn gain_follows_automation_within_a_block() {
        let gain = AudioParam::new("gain", 1.0);
        gain.set_target_at_time(0.0, 0.0, 0.0).unwrap();
        gain.set_target_at_time(2.0, 2.0 / 48_000.0, 0.0).unwrap();

        let mut node = GainNode::new(gain);
        let mut block = [1.0; 4];
        node.process(&mut block, &info());
        assert_eq!(block, [0.0, 0.0, 2.0, 2.0]);
    }

    #[test]
    fn gain_handles_blocks_longer_than_a_quantum() {
        let mut node = GainNode::new(AudioParam::new("gain", 3.0));
        let mut block = vec![1.0; RENDER_QUANTUM * 2 + 1];
        node.process(&mut block, &info());
        assert!(block.iter().all(|&s| s == 3.0));
    }

    #[test]
    fn frame_time_advances_by_sample_period() {
        let info = RenderInfo {
            current_time: 1.0,
            sample_rate: 100.0,
        };
        assert!((info.frame_time(50) - 1.5).abs() < 1e-12);
    }
}
