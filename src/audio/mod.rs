pub mod analyser;
pub mod biquad;
pub mod capture;
pub mod context;
pub mod graph;
pub mod meter;
pub mod node;
pub mod output;
pub mod param;

/// Frames processed per pass through the chain.
pub const RENDER_QUANTUM: usize = 128;

pub use capture::{CaptureConstraints, CpalMediaDevices, MediaDevices};
pub use context::{AudioClock, AudioContext, ContextState, Destination, NullDestination};
pub use graph::SignalGraph;
pub use output::CpalDestination;
pub use param::AudioParam;
