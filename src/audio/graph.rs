use super::analyser::{analyser, Analyser};
use super::biquad::BiquadFilterNode;
use super::context::{AudioContext, ContextState, RenderChain};
use super::meter::{InputMeter, SignalMonitor};
use super::node::{AudioNode, GainNode, MediaStreamSource, NodeKind};
use super::param::AudioParam;
use crate::config::{BandConfig, EqualizerConfig};
use crate::controls::ControlId;
use crate::error::{AnalyserError, GraphError};
use std::sync::Arc;

/// Starting values for the four mutable parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialLevels {
    pub volume: f32,
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
}

/// The fixed equalizer chain:
/// source → bass → mid → treble → gain → analyser → destination.
///
/// Nodes are built up front and handed to the render thread on
/// [`connect`](Self::connect); only their parameter handles stay here.
pub struct SignalGraph {
    volume: AudioParam,
    bass: AudioParam,
    mid: AudioParam,
    treble: AudioParam,

    pending: Option<Vec<Box<dyn AudioNode>>>,
    analyser: Analyser,
    connections: Vec<(NodeKind, NodeKind)>,

    //
    // Raw input level, read from the connected source.
    //
    input_meter: Option<Arc<InputMeter>>,
    monitor: SignalMonitor,
}

impl SignalGraph {
    pub fn new(
        config: &EqualizerConfig,
        initial: InitialLevels,
        sample_rate: u32,
    ) -> Result<Self, AnalyserError> {
        let volume = AudioParam::new("gain", initial.volume);
        let bass = AudioParam::new("bass", initial.bass);
        let mid = AudioParam::new("mid", initial.mid);
        let treble = AudioParam::new("treble", initial.treble);

        let (tap, analyser) = analyser(config.analyser, sample_rate)?;

        let band = |role: NodeKind, cfg: &BandConfig, gain: &AudioParam| -> Box<dyn AudioNode> {
            Box::new(BiquadFilterNode::new(
                role,
                cfg.kind,
                cfg.frequency,
                cfg.q,
                gain.clone(),
            ))
        };

        let nodes: Vec<Box<dyn AudioNode>> = vec![
            band(NodeKind::Bass, &config.bass, &bass),
            band(NodeKind::Mid, &config.mid, &mid),
            band(NodeKind::Treble, &config.treble, &treble),
            Box::new(GainNode::new(volume.clone())),
            Box::new(tap),
        ];

        Ok(Self {
            volume,
            bass,
            mid,
            treble,
            pending: Some(nodes),
            analyser,
            connections: Vec::new(),
            input_meter: None,
            monitor: SignalMonitor::new(),
        })
    }

    /// The parameter a control drives.
    pub fn param(&self, id: ControlId) -> &AudioParam {
        match id {
            ControlId::Volume => &self.volume,
            ControlId::Bass => &self.bass,
            ControlId::Mid => &self.mid,
            ControlId::Treble => &self.treble,
        }
    }

    pub fn analyser(&self) -> &Analyser {
        &self.analyser
    }

    pub fn analyser_mut(&mut self) -> &mut Analyser {
        &mut self.analyser
    }

    /// Whether the microphone itself has been quiet for a while. Measured
    /// ahead of the EQ and volume, so a muted output still counts as signal.
    pub fn input_is_silent(&mut self) -> bool {
        let reading = self
            .input_meter
            .as_ref()
            .map(|meter| meter.take())
            .unwrap_or_default();
        self.monitor.observe(reading);
        self.monitor.is_silence()
    }

    pub fn is_connected(&self) -> bool {
        self.pending.is_none()
    }

    /// Every edge made by [`connect`](Self::connect), in order.
    pub fn connections(&self) -> &[(NodeKind, NodeKind)] {
        &self.connections
    }

    /// Wires `source` into the chain and hands the chain to the context.
    ///
    /// Happens once; the context must already be running.
    pub fn connect(&mut self, context: &AudioContext, source: MediaStreamSource) -> Result<(), GraphError> {
        if self.pending.is_none() {
            return Err(GraphError::AlreadyConnected);
        }
        if context.state() != ContextState::Running {
            return Err(GraphError::ContextNotRunning);
        }
        let nodes = self.pending.take().unwrap_or_default();

        let mut edges = Vec::with_capacity(nodes.len() + 1);
        let mut prev = NodeKind::MediaStreamSource;
        for node in &nodes {
            edges.push((prev, node.kind()));
            prev = node.kind();
        }
        edges.push((prev, NodeKind::Destination));

        let meter = source.meter();
        if let Err(err) = context.install(RenderChain::new(source, nodes)) {
            log::error!("Failed to install render chain: {}", err);
            return Err(err);
        }

        let route: Vec<String> = std::iter::once(NodeKind::MediaStreamSource)
            .chain(edges.iter().map(|&(_, to)| to))
            .map(|kind| kind.to_string())
            .collect();
        log::info!("Signal graph connected: {}", route.join(" -> "));

        self.connections = edges;
        self.input_meter = Some(meter);
        Ok(())
    }
}
