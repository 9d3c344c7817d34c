//! Everything the window owns: context, graph and controls, and the
//! startup sequence that ties them to the microphone.

use crate::audio::graph::InitialLevels;
use crate::audio::{AudioContext, ContextState, Destination, MediaDevices, SignalGraph};
use crate::config::EqualizerConfig;
use crate::controls::{ControlId, ControlSurface};
use crate::error::{AnalyserError, AudioError, GraphError};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    /// Microphone not requested yet.
    Pending,
    Connected,
    Failed(String),
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Pending => f.write_str("waiting for microphone"),
            SessionStatus::Connected => f.write_str("microphone connected"),
            SessionStatus::Failed(reason) => write!(f, "audio unavailable: {}", reason),
        }
    }
}

pub struct Session {
    config: EqualizerConfig,
    context: AudioContext,
    graph: SignalGraph,
    controls: ControlSurface,
    status: SessionStatus,
}

impl Session {
    /// Builds the graph from the controls' initial values and binds each
    /// control to its parameter. No audio flows until [`start`](Self::start).
    pub fn new(config: EqualizerConfig, destination: Box<dyn Destination>) -> Result<Self, AnalyserError> {
        let context = AudioContext::new(destination);
        let mut controls = ControlSurface::new(&config.controls);

        let initial = InitialLevels {
            volume: controls.parsed_value(ControlId::Volume) as f32,
            bass: controls.parsed_value(ControlId::Bass) as f32,
            mid: controls.parsed_value(ControlId::Mid) as f32,
            treble: controls.parsed_value(ControlId::Treble) as f32,
        };
        let graph = SignalGraph::new(&config, initial, context.sample_rate())?;

        for id in ControlId::ALL {
            // Fresh surface, so every control is still unbound.
            if let Err(err) = controls.bind(
                id,
                graph.param(id).clone(),
                context.clock(),
                config.time_constant,
            ) {
                log::warn!("{}", err);
            }
        }

        Ok(Self {
            config,
            context,
            graph,
            controls,
            status: SessionStatus::Pending,
        })
    }

    /// Acquires the microphone, resumes the context if it is suspended,
    /// then connects the stream into the graph.
    pub fn start(&mut self, devices: &mut dyn MediaDevices) -> Result<(), AudioError> {
        if self.graph.is_connected() {
            return Err(GraphError::AlreadyConnected.into());
        }

        let result = self.try_start(devices);
        match &result {
            Ok(()) => self.status = SessionStatus::Connected,
            Err(err) => {
                log::error!("Audio initialization failed: {}", err);
                self.status = SessionStatus::Failed(err.to_string());
            }
        }
        result
    }

    fn try_start(&mut self, devices: &mut dyn MediaDevices) -> Result<(), AudioError> {
        let stream = devices.get_user_media(&self.config.capture, self.context.sample_rate())?;

        if self.context.state() == ContextState::Suspended {
            self.context.resume()?;
        }

        let source = self.context.create_media_stream_source(stream)?;
        self.graph.connect(&self.context, source)?;
        Ok(())
    }

    /// Stops audio processing for good.
    pub fn shutdown(&mut self) {
        self.context.close();
    }

    pub fn config(&self) -> &EqualizerConfig {
        &self.config
    }

    pub fn context(&self) -> &AudioContext {
        &self.context
    }

    pub fn graph(&self) -> &SignalGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SignalGraph {
        &mut self.graph
    }

    pub fn controls(&self) -> &ControlSurface {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut ControlSurface {
        &mut self.controls
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::capture::{CaptureConstraints, MediaStream};
    use crate::audio::context::tests::RecordingDestination;
    use crate::audio::context::NullDestination;
    use crate::audio::node::NodeKind;
    use crate::config::Preset;
    use ringbuf::{HeapRb, Producer};
    use std::sync::Arc;

    /// Hands out one synthetic stream, or fails like a denied permission.
    struct MockDevices {
        producer: Option<Producer<f32, Arc<HeapRb<f32>>>>,
        stream: Option<MediaStream>,
        requests: Vec<CaptureConstraints>,
    }

    impl MockDevices {
        fn granting() -> Self {
            let (producer, consumer) = HeapRb::<f32>::new(48_000).split();
            Self {
                producer: Some(producer),
                stream: Some(MediaStream::from_consumer(consumer, 48_000)),
                requests: Vec::new(),
            }
        }

        fn denying() -> Self {
            Self {
                producer: None,
                stream: None,
                requests: Vec::new(),
            }
        }
    }

    impl MediaDevices for MockDevices {
        fn get_user_media(
            &mut self,
            constraints: &CaptureConstraints,
            _sample_rate: u32,
        ) -> Result<MediaStream, AudioError> {
            self.requests.push(*constraints);
            self.stream.take().ok_or(AudioError::NoInputDevice)
        }
    }

    fn session() -> Session {
        Session::new(Preset::Studio.config(), Box::new(NullDestination::new(48_000))).unwrap()
    }

    #[test]
    fn start_resumes_then_connects_full_chain_once() {
        let mut s = session();
        let mut devices = MockDevices::granting();
        assert_eq!(s.context().state(), ContextState::Suspended);

        s.start(&mut devices).unwrap();

        assert_eq!(s.context().state(), ContextState::Running);
        assert_eq!(*s.status(), SessionStatus::Connected);
        let route: Vec<NodeKind> = s.graph().connections().iter().map(|&(_, to)| to).collect();
        assert_eq!(
            route,
            vec![
                NodeKind::Bass,
                NodeKind::Mid,
                NodeKind::Treble,
                NodeKind::Gain,
                NodeKind::Analyser,
                NodeKind::Destination,
            ]
        );
        assert_eq!(devices.requests, vec![CaptureConstraints::default()]);
    }

    #[test]
    fn second_start_does_not_duplicate_connections() {
        let mut s = session();
        s.start(&mut MockDevices::granting()).unwrap();
        assert!(matches!(
            s.start(&mut MockDevices::granting()),
            Err(AudioError::Graph(GraphError::AlreadyConnected))
        ));
        assert_eq!(s.graph().connections().len(), 6);
        assert_eq!(*s.status(), SessionStatus::Connected);
    }

    #[test]
    fn denied_microphone_leaves_context_suspended() {
        let mut s = session();
        let err = s.start(&mut MockDevices::denying()).unwrap_err();
        assert!(matches!(err, AudioError::NoInputDevice));
        assert_eq!(s.context().state(), ContextState::Suspended);
        assert!(!s.graph().is_connected());
        assert!(matches!(s.status(), SessionStatus::Failed(_)));

        // The visualizer keeps drawing a flat spectrum.
        let bins = s.graph().analyser().frequency_bin_count();
        let mut out = vec![1u8; bins];
        s.graph_mut().analyser_mut().get_byte_frequency_data(&mut out);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn failed_resume_never_connects() {
        let (dest, events) = RecordingDestination::new(true);
        let mut s = Session::new(Preset::Studio.config(), Box::new(dest)).unwrap();

        assert!(s.start(&mut MockDevices::granting()).is_err());
        assert_eq!(*events.borrow(), vec!["start"]);
        assert!(!s.graph().is_connected());
    }

    #[test]
    fn flat_eq_passes_audio_through() {
        let mut s = session();
        let mut devices = MockDevices::granting();
        let mut producer = devices.producer.take().unwrap();
        s.start(&mut devices).unwrap();

        let input: Vec<f32> = (0..512).map(|i| (i as f32 * 0.05).sin() * 0.5).collect();
        producer.push_slice(&input);

        let mut out = vec![0.0f32; input.len()];
        s.context().renderer().render(&mut out, 1);
        for (o, i) in out.iter().zip(&input) {
            assert!((o - i).abs() < 1e-4);
        }
    }

    #[test]
    fn volume_slider_drives_gain_through_render_clock() {
        let mut s = session();
        let mut devices = MockDevices::granting();
        let mut producer = devices.producer.take().unwrap();
        s.start(&mut devices).unwrap();

        // Advance the clock a bit before moving the slider.
        let mut out = vec![0.0f32; 256];
        s.context().renderer().render(&mut out, 1);
        let anchor = s.context().current_time();

        s.controls_mut().control_mut(ControlId::Volume).input(0.5);
        let gain = s.graph().param(ControlId::Volume).clone();
        assert_eq!(gain.value_at(anchor), 1.0);

        // 0.1 s is twenty time constants: fully settled.
        producer.push_slice(&vec![1.0f32; 4800]);
        let mut out = vec![0.0f32; 4800];
        s.context().renderer().render(&mut out, 1);
        assert!(out[0] > 0.9);
        assert!((out[4799] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn input_captured_before_connecting_is_not_replayed() {
        let mut s = session();
        let mut devices = MockDevices::granting();
        let mut producer = devices.producer.take().unwrap();

        // Device starts filling the ring while the output is still opening.
        let backlog: Vec<f32> = (0..4800).map(|i| i as f32 / 4800.0).collect();
        producer.push_slice(&backlog);
        s.start(&mut devices).unwrap();

        let mut out = vec![0.0f32; 128];
        s.context().renderer().render(&mut out, 1);
        for (o, i) in out.iter().zip(&backlog[4800 - 128..]) {
            assert!((o - i).abs() < 1e-4);
        }
    }

    #[test]
    fn muted_output_still_reports_live_microphone() {
        let mut s = session();
        let mut devices = MockDevices::granting();
        let mut producer = devices.producer.take().unwrap();
        s.start(&mut devices).unwrap();
        assert!(s.graph_mut().input_is_silent());

        s.graph()
            .param(ControlId::Volume)
            .set_target_at_time(0.0, 0.0, 0.0)
            .unwrap();
        producer.push_slice(&vec![0.5f32; 256]);
        let mut out = vec![1.0f32; 256];
        s.context().renderer().render(&mut out, 1);

        assert!(out.iter().all(|&o| o == 0.0));
        assert!(!s.graph_mut().input_is_silent());
    }
}
