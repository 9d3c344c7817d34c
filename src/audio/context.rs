use super::capture::MediaStream;
use super::node::{AudioNode, MediaStreamSource, RenderInfo};
use super::RENDER_QUANTUM;
use crate::error::{AudioError, GraphError};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContextState {
    Suspended = 0,
    Running = 1,
    Closed = 2,
}

impl ContextState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ContextState::Running,
            2 => ContextState::Closed,
            _ => ContextState::Suspended,
        }
    }
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContextState::Suspended => "suspended",
            ContextState::Running => "running",
            ContextState::Closed => "closed",
        })
    }
}

/// Context time, counted in rendered frames.
#[derive(Debug, Clone)]
pub struct AudioClock {
    frames: Arc<AtomicU64>,
    sample_rate: f32,
}

impl AudioClock {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate,
        }
    }

    /// Seconds of audio rendered so far.
    pub fn current_time(&self) -> f64 {
        self.frames.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn advance(&self, frames: usize) {
        self.frames.fetch_add(frames as u64, Ordering::AcqRel);
    }
}

/// The connected chain, owned by the render thread once installed.
pub struct RenderChain {
    source: MediaStreamSource,
    nodes: Vec<Box<dyn AudioNode>>,
}

impl RenderChain {
    pub fn new(source: MediaStreamSource, nodes: Vec<Box<dyn AudioNode>>) -> Self {
        Self { source, nodes }
    }

    fn process(&mut self, block: &mut [f32], info: &RenderInfo) {
        self.source.pull(block);
        for node in &mut self.nodes {
            node.process(block, info);
        }
    }
}

/// Cloneable render entry point handed to the output device callback.
#[derive(Clone)]
pub struct Renderer {
    clock: AudioClock,
    state: Arc<AtomicU8>,
    chain: Arc<Mutex<Option<RenderChain>>>,
}

impl Renderer {
    /// Renders interleaved output for `channels` channels.
    ///
    /// Outputs silence and leaves the clock alone unless the context is
    /// running. Never blocks: if the chain is being swapped, this callback
    /// renders silence instead.
    pub fn render(&self, out: &mut [f32], channels: usize) {
        if channels == 0 {
            return;
        }
        if ContextState::from_u8(self.state.load(Ordering::Acquire)) != ContextState::Running {
            out.fill(0.0);
            return;
        }

        let mut slot = self.chain.try_lock();
        let mut block = [0.0f32; RENDER_QUANTUM];

        for chunk in out.chunks_mut(RENDER_QUANTUM * channels) {
            let frames = chunk.len() / channels;
            let block = &mut block[..frames];
            block.fill(0.0);

            if let Some(chain) = slot.as_deref_mut().and_then(Option::as_mut) {
                let info = RenderInfo {
                    current_time: self.clock.current_time(),
                    sample_rate: self.clock.sample_rate(),
                };
                chain.process(block, &info);
            }

            //
            // Fan the mono block out to every output channel.
            //
            for (frame, &sample) in chunk.chunks_mut(channels).zip(block.iter()) {
                frame.fill(sample);
            }
            self.clock.advance(frames);
        }
    }
}

/// Where rendered audio goes. Starting the destination is what makes a
/// suspended context run.
pub trait Destination {
    fn name(&self) -> String;
    fn sample_rate(&self) -> u32;
    fn start(&mut self, renderer: Renderer) -> Result<(), AudioError>;
    fn stop(&mut self);
}

/// A destination with no device behind it. Nothing pulls audio, so the
/// clock stays at zero; used when the host has no output device.
pub struct NullDestination {
    sample_rate: u32,
}

impl NullDestination {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl Destination for NullDestination {
    fn name(&self) -> String {
        "null".to_string()
    }
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
    fn start(&mut self, _renderer: Renderer) -> Result<(), AudioError> {
        Ok(())
    }
    fn stop(&mut self) {}
}

/// Owner of the real-time clock, the render chain and the output device.
pub struct AudioContext {
    clock: AudioClock,
    state: Arc<AtomicU8>,
    chain: Arc<Mutex<Option<RenderChain>>>,
    destination: Box<dyn Destination>,
    source_created: bool,
    input_streams: Vec<cpal::Stream>,
}

impl AudioContext {
    /// Creates a context in the suspended state; call [`resume`](Self::resume)
    /// before connecting anything.
    pub fn new(destination: Box<dyn Destination>) -> Self {
        let sample_rate = destination.sample_rate();
        log::info!(
            "Audio context created on '{}' @ {}Hz (suspended)",
            destination.name(),
            sample_rate
        );

        Self {
            clock: AudioClock::new(sample_rate as f32),
            state: Arc::new(AtomicU8::new(ContextState::Suspended as u8)),
            chain: Arc::new(Mutex::new(None)),
            destination,
            source_created: false,
            input_streams: Vec::new(),
        }
    }

    pub fn state(&self) -> ContextState {
        ContextState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn sample_rate(&self) -> u32 {
        self.destination.sample_rate()
    }

    pub fn current_time(&self) -> f64 {
        self.clock.current_time()
    }

    pub fn clock(&self) -> AudioClock {
        self.clock.clone()
    }

    pub fn renderer(&self) -> Renderer {
        Renderer {
            clock: self.clock.clone(),
            state: self.state.clone(),
            chain: self.chain.clone(),
        }
    }

    /// Starts the destination and moves the context to `Running`.
    pub fn resume(&mut self) -> Result<(), AudioError> {
        match self.state() {
            ContextState::Running => Ok(()),
            ContextState::Closed => Err(AudioError::ContextClosed),
            ContextState::Suspended => {
                self.destination.start(self.renderer())?;
                self.set_state(ContextState::Running);
                Ok(())
            }
        }
    }

    /// Stops the destination, releases the chain and every input stream.
    pub fn close(&mut self) {
        if self.state() == ContextState::Closed {
            return;
        }
        self.set_state(ContextState::Closed);
        self.destination.stop();
        self.chain.lock().take();
        self.input_streams.clear();
    }

    /// Wraps `stream` as the context's single media stream source.
    pub fn create_media_stream_source(
        &mut self,
        stream: MediaStream,
    ) -> Result<MediaStreamSource, AudioError> {
        if self.state() == ContextState::Closed {
            return Err(AudioError::ContextClosed);
        }
        if self.source_created {
            return Err(AudioError::SourceAlreadyCreated);
        }

        if stream.sample_rate() != self.sample_rate() {
            log::warn!(
                "Input runs at {}Hz but the context runs at {}Hz; audio will be pitch shifted",
                stream.sample_rate(),
                self.sample_rate()
            );
        }

        let (consumer, device_stream) = stream.into_parts();
        if let Some(device_stream) = device_stream {
            self.input_streams.push(device_stream);
        }
        self.source_created = true;
        Ok(MediaStreamSource::new(consumer))
    }

    /// Hands a fully connected chain to the render thread.
    ///
    /// Input queued while the devices were starting is dropped, so playback
    /// begins at the newest captured quantum.
    pub(crate) fn install(&self, mut chain: RenderChain) -> Result<(), GraphError> {
        if self.state() != ContextState::Running {
            return Err(GraphError::ContextNotRunning);
        }

        let dropped = chain.source.discard_backlog(RENDER_QUANTUM);
        if dropped > 0 {
            log::debug!("Dropped {} samples captured before the chain was installed", dropped);
        }
        *self.chain.lock() = Some(chain);
        Ok(())
    }

    fn set_state(&self, state: ContextState) {
        self.state.store(state as u8, Ordering::Release);
        log::info!("Audio context {}", state);
    }
}

impl Drop for AudioContext {
    fn drop(&mut self) {
        self.close();
    }
}
