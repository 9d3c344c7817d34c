//! User-facing controls and their one-way bindings to node parameters.

use crate::audio::{AudioClock, AudioParam};
use crate::config::ControlsConfig;
use crate::error::ControlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlId {
    Volume,
    Bass,
    Mid,
    Treble,
}

impl ControlId {
    pub const ALL: [ControlId; 4] = [
        ControlId::Volume,
        ControlId::Bass,
        ControlId::Mid,
        ControlId::Treble,
    ];

    pub fn element_id(self) -> &'static str {
        match self {
            ControlId::Volume => "volume",
            ControlId::Bass => "bass",
            ControlId::Mid => "mid",
            ControlId::Treble => "treble",
        }
    }
}

/// How a control's raw value is read as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueParse {
    Decimal,
    /// Truncated toward zero.
    Integer,
}

impl ValueParse {
    pub fn apply(self, raw: f64) -> f64 {
        match self {
            ValueParse::Decimal => raw,
            ValueParse::Integer => raw.trunc(),
        }
    }

    pub fn parse(self, text: &str) -> Result<f64, ControlError> {
        let raw: f64 = text
            .trim()
            .parse()
            .map_err(|_| ControlError::NotANumber(text.to_string()))?;
        if raw.is_nan() {
            return Err(ControlError::NotANumber(text.to_string()));
        }
        Ok(self.apply(raw))
    }
}

/// Range and parsing of one slider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSpec {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub initial: f64,
    pub parse: ValueParse,
}

type Listener = Box<dyn FnMut(f64)>;

/// One input control. Listeners receive every new value, parsed.
pub struct Control {
    id: ControlId,
    spec: ControlSpec,
    value: f64,
    listeners: Vec<Listener>,
    bound: bool,
}

impl Control {
    pub fn new(id: ControlId, spec: ControlSpec) -> Self {
        Self {
            id,
            spec,
            value: spec.initial,
            listeners: Vec::new(),
            bound: false,
        }
    }

    pub fn spec(&self) -> &ControlSpec {
        &self.spec
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn subscribe(&mut self, listener: impl FnMut(f64) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Input notification from a widget.
    pub fn input(&mut self, raw: f64) {
        self.value = raw;
        let parsed = self.spec.parse.apply(raw);
        log::trace!("{} <- {}", self.id.element_id(), parsed);
        for listener in &mut self.listeners {
            listener(parsed);
        }
    }

    /// Input notification carrying text, as typed into a field.
    pub fn input_text(&mut self, text: &str) -> Result<(), ControlError> {
        let value = self.spec.parse.parse(text).map_err(|err| {
            log::warn!("Rejected `{}` input: {}", self.id.element_id(), err);
            err
        })?;
        self.input(value);
        Ok(())
    }
}

/// The four controls, each bound to at most one parameter.
pub struct ControlSurface {
    controls: Vec<Control>,
}

impl ControlSurface {
    pub fn new(config: &ControlsConfig) -> Self {
        Self {
            controls: ControlId::ALL
                .iter()
                .map(|&id| Control::new(id, *config.get(id)))
                .collect(),
        }
    }

    pub fn control(&self, id: ControlId) -> &Control {
        &self.controls[id as usize]
    }

    pub fn control_mut(&mut self, id: ControlId) -> &mut Control {
        &mut self.controls[id as usize]
    }

    /// Current value of a control, as its parameter would receive it.
    pub fn parsed_value(&self, id: ControlId) -> f64 {
        let control = self.control(id);
        control.spec.parse.apply(control.value)
    }

    /// Routes every change of `id` to a smoothed retarget of `param`,
    /// anchored at the clock's current time.
    pub fn bind(
        &mut self,
        id: ControlId,
        param: AudioParam,
        clock: AudioClock,
        time_constant: f64,
    ) -> Result<(), ControlError> {
        let control = self.control_mut(id);
        if control.bound {
            return Err(ControlError::AlreadyBound(id.element_id()));
        }
        control.bound = true;

        control.subscribe(move |value| {
            let now = clock.current_time();
            if let Err(err) = param.set_target_at_time(value as f32, now, time_constant) {
                log::warn!("Ignoring {} = {}: {}", param.name(), value, err);
            }
        });
        log::debug!("Bound control `{}`", id.element_id());
        Ok(())
    }
}
