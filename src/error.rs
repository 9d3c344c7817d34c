use thiserror::Error;

/// Failures of the host audio layer: devices, streams and the context.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio input device found, check system settings")]
    NoInputDevice,

    #[error("no audio output device found")]
    NoOutputDevice,

    #[error("unsupported sample format: {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),

    #[error("failed to query default stream config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to query supported stream configs: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("audio context is closed")]
    ContextClosed,

    #[error("a media stream source was already created for this context")]
    SourceAlreadyCreated,

    #[error(transparent)]
    Graph(#[from] GraphError),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GraphError {
    #[error("audio context is not running")]
    ContextNotRunning,

    #[error("signal graph is already connected")]
    AlreadyConnected,
}

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ParamError {
    #[error("time constant must be finite and non-negative, got {0}")]
    InvalidTimeConstant(f64),

    #[error("start time must be finite and non-negative, got {0}")]
    InvalidStartTime(f64),

    #[error("target value must be finite, got {0}")]
    NonFiniteTarget(f32),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    #[error("control value {0:?} is not a number")]
    NotANumber(String),

    #[error("control `{0}` is already bound to a parameter")]
    AlreadyBound(&'static str),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AnalyserError {
    #[error("fft size must be a power of two in [32, 32768], got {0}")]
    InvalidFftSize(usize),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{band} frequency must be positive and finite, got {value}")]
    InvalidFrequency { band: &'static str, value: f32 },

    #[error("{band} Q must be positive and finite, got {value}")]
    InvalidQ { band: &'static str, value: f32 },

    #[error("parameter time constant must be non-negative, got {0}")]
    InvalidTimeConstant(f64),

    #[error("analyser decibel range is empty: [{min}, {max}]")]
    InvalidDecibelRange { min: f32, max: f32 },

    #[error("analyser smoothing must be within [0, 1], got {0}")]
    InvalidSmoothing(f32),

    #[error("control `{0}` has an empty range")]
    InvalidControlRange(&'static str),

    #[error(transparent)]
    Analyser(#[from] AnalyserError),
}
