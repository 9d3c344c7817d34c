use crate::audio::analyser::AnalyserOptions;
use crate::audio::biquad::FilterKind;
use crate::audio::CaptureConstraints;
use crate::controls::{ControlId, ControlSpec, ValueParse};
use crate::error::ConfigError;
use std::f32::consts::FRAC_1_SQRT_2;

/// Exponential smoothing time constant for control-driven changes, seconds.
pub const PARAM_TIME_CONSTANT: f64 = 0.005;

/// Named equalizer variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Preset {
    /// Narrow low/mid split, 256-point analyser.
    Studio,
    /// Wider band spacing, 512-point analyser.
    Broad,
}

impl Preset {
    pub fn config(self) -> EqualizerConfig {
        match self {
            Preset::Studio => EqualizerConfig {
                name: "studio",
                bass: BandConfig::new(FilterKind::LowShelf, 200.0),
                mid: BandConfig {
                    kind: FilterKind::Peaking,
                    frequency: 440.0,
                    q: FRAC_1_SQRT_2,
                },
                treble: BandConfig::new(FilterKind::HighShelf, 600.0),
                analyser: AnalyserOptions {
                    fft_size: 256,
                    ..AnalyserOptions::default()
                },
                bars: BarScale {
                    floor: 1.0,
                    amplitude: 0.5,
                },
                hue: HueMapping {
                    offset: -360.0,
                    scale: 450.0,
                },
                ..EqualizerConfig::base()
            },
            Preset::Broad => EqualizerConfig {
                name: "broad",
                bass: BandConfig::new(FilterKind::LowShelf, 120.0),
                mid: BandConfig {
                    kind: FilterKind::Peaking,
                    frequency: 1000.0,
                    q: 1.0,
                },
                treble: BandConfig::new(FilterKind::HighShelf, 3200.0),
                analyser: AnalyserOptions {
                    fft_size: 512,
                    ..AnalyserOptions::default()
                },
                bars: BarScale {
                    floor: 2.0,
                    amplitude: 0.45,
                },
                hue: HueMapping {
                    offset: 0.0,
                    scale: 300.0,
                },
                ..EqualizerConfig::base()
            },
        }
    }
}

/// Fixed topology of one equalizer band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandConfig {
    pub kind: FilterKind,
    pub frequency: f32,
    /// Only the peaking shape uses Q.
    pub q: f32,
}

impl BandConfig {
    pub fn new(kind: FilterKind, frequency: f32) -> Self {
        Self {
            kind,
            frequency,
            q: 1.0,
        }
    }
}

/// Bar half-height: `floor + (item / 255) * height * amplitude`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarScale {
    pub floor: f32,
    pub amplitude: f32,
}

/// Bar hue: `(y / height + offset) * scale`, wrapped onto the color wheel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HueMapping {
    pub offset: f32,
    pub scale: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlsConfig {
    pub volume: ControlSpec,
    pub bass: ControlSpec,
    pub mid: ControlSpec,
    pub treble: ControlSpec,
}

impl ControlsConfig {
    pub fn get(&self, id: ControlId) -> &ControlSpec {
        match id {
            ControlId::Volume => &self.volume,
            ControlId::Bass => &self.bass,
            ControlId::Mid => &self.mid,
            ControlId::Treble => &self.treble,
        }
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        let band = ControlSpec {
            min: -10.0,
            max: 10.0,
            step: 1.0,
            initial: 0.0,
            parse: ValueParse::Integer,
        };
        Self {
            volume: ControlSpec {
                min: 0.0,
                max: 2.0,
                step: 0.01,
                initial: 1.0,
                parse: ValueParse::Decimal,
            },
            bass: band,
            mid: band,
            treble: band,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqualizerConfig {
    pub name: &'static str,
    pub bass: BandConfig,
    pub mid: BandConfig,
    pub treble: BandConfig,
    pub analyser: AnalyserOptions,
    pub bars: BarScale,
    pub hue: HueMapping,
    pub time_constant: f64,
    pub capture: CaptureConstraints,
    pub controls: ControlsConfig,
}

impl EqualizerConfig {
    /// Settings shared by every preset.
    fn base() -> Self {
        Self {
            name: "base",
            bass: BandConfig::new(FilterKind::LowShelf, 200.0),
            mid: BandConfig::new(FilterKind::Peaking, 440.0),
            treble: BandConfig::new(FilterKind::HighShelf, 600.0),
            analyser: AnalyserOptions::default(),
            bars: BarScale {
                floor: 1.0,
                amplitude: 0.5,
            },
            hue: HueMapping {
                offset: 0.0,
                scale: 360.0,
            },
            time_constant: PARAM_TIME_CONSTANT,
            capture: CaptureConstraints::default(),
            controls: ControlsConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (band, cfg) in [("bass", &self.bass), ("mid", &self.mid), ("treble", &self.treble)] {
            if !(cfg.frequency.is_finite() && cfg.frequency > 0.0) {
                return Err(ConfigError::InvalidFrequency {
                    band,
                    value: cfg.frequency,
                });
            }
            if !(cfg.q.is_finite() && cfg.q > 0.0) {
                return Err(ConfigError::InvalidQ { band, value: cfg.q });
            }
        }

        if !(self.time_constant.is_finite() && self.time_constant >= 0.0) {
            return Err(ConfigError::InvalidTimeConstant(self.time_constant));
        }

        self.analyser.validate()?;
        let AnalyserOptions {
            min_decibels,
            max_decibels,
            smoothing_time_constant,
            ..
        } = self.analyser;
        if !(min_decibels < max_decibels) {
            return Err(ConfigError::InvalidDecibelRange {
                min: min_decibels,
                max: max_decibels,
            });
        }
        if !(0.0..=1.0).contains(&smoothing_time_constant) {
            return Err(ConfigError::InvalidSmoothing(smoothing_time_constant));
        }

        for id in ControlId::ALL {
            let spec = self.controls.get(id);
            if !(spec.min < spec.max) {
                return Err(ConfigError::InvalidControlRange(id.element_id()));
            }
        }
        Ok(())
    }
}
