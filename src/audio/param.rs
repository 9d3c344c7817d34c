use crate::error::ParamError;
use parking_lot::Mutex;
use std::sync::Arc;

/// A pending exponential approach toward `target`, starting at `start_time`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TargetEvent {
    start_time: f64,
    start_value: f32,
    target: f32,
    time_constant: f64,
}

#[derive(Debug)]
struct Timeline {
    value: f32,
    event: Option<TargetEvent>,
}

impl Timeline {
    fn value_at(&self, time: f64) -> f32 {
        let Some(event) = self.event else {
            return self.value;
        };

        if time < event.start_time {
            return event.start_value;
        }
        if event.time_constant == 0.0 {
            return event.target;
        }

        let decay = (-(time - event.start_time) / event.time_constant).exp() as f32;
        event.target + (event.start_value - event.target) * decay
    }
}

/// Shared handle to one automatable node parameter.
///
/// The GUI thread schedules transitions, the render thread samples the
/// resulting curve. Clones refer to the same parameter.
#[derive(Debug, Clone)]
pub struct AudioParam {
    name: &'static str,
    timeline: Arc<Mutex<Timeline>>,
}

impl AudioParam {
    pub fn new(name: &'static str, value: f32) -> Self {
        Self {
            name,
            timeline: Arc::new(Mutex::new(Timeline { value, event: None })),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Value of the parameter curve at `time` seconds of context time.
    pub fn value_at(&self, time: f64) -> f32 {
        self.timeline.lock().value_at(time)
    }

    /// Samples the curve once per slot of `out` at `time_of(slot)`, taking
    /// the lock once for the whole block.
    pub fn fill_values(&self, out: &mut [f32], time_of: impl Fn(usize) -> f64) {
        let timeline = self.timeline.lock();
        for (i, value) in out.iter_mut().enumerate() {
            *value = timeline.value_at(time_of(i));
        }
    }

    /// Starts an exponential approach to `target` at `start_time`:
    /// `v(t) = target + (v(start) - target) * e^(-(t - start) / time_constant)`.
    ///
    /// Replaces any transition already in flight, continuing from wherever
    /// that transition would be at `start_time`.
    pub fn set_target_at_time(
        &self,
        target: f32,
        start_time: f64,
        time_constant: f64,
    ) -> Result<(), ParamError> {
        if !target.is_finite() {
            return Err(ParamError::NonFiniteTarget(target));
        }
        if !start_time.is_finite() || start_time < 0.0 {
            return Err(ParamError::InvalidStartTime(start_time));
        }
        if !time_constant.is_finite() || time_constant < 0.0 {
            return Err(ParamError::InvalidTimeConstant(time_constant));
        }

        let mut timeline = self.timeline.lock();
        let start_value = timeline.value_at(start_time);
        timeline.value = start_value;
        timeline.event = Some(TargetEvent {
            start_time,
            start_value,
            target,
            time_constant,
        });
        Ok(())
    }

    /// Target of the transition in flight, or the resting value.
    #[cfg(test)]
    pub fn target(&self) -> f32 {
        let timeline = self.timeline.lock();
        timeline.event.map_or(timeline.value, |e| e.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAU: f64 = 0.005;

    #[test]
    fn holds_initial_value_without_automation() {
        let p = AudioParam::new("gain", 0.75);
        assert_eq!(p.value_at(0.0), 0.75);
        assert_eq!(p.value_at(100.0), 0.75);
        assert_eq!(p.target(), 0.75);
    }

    #[test]
    fn approaches_target_exponentially() {
        let p = AudioParam::new("gain", 1.0);
        p.set_target_at_time(0.0, 2.0, TAU).unwrap();

        // No step at the anchor.
        assert_eq!(p.value_at(2.0), 1.0);
        assert_eq!(p.value_at(1.5), 1.0);

        let one_tau = p.value_at(2.0 + TAU);
        assert!((one_tau - (-1.0f32).exp()).abs() < 1e-5);

        let settled = p.value_at(2.0 + 20.0 * TAU);
        assert!(settled.abs() < 1e-6);
        assert_eq!(p.target(), 0.0);
    }

    #[test]
    fn retarget_continues_from_current_curve() {
        let p = AudioParam::new("bass", 0.0);
        p.set_target_at_time(10.0, 0.0, TAU).unwrap();
        let mid_way = p.value_at(TAU);

        p.set_target_at_time(-10.0, TAU, TAU).unwrap();
        assert!((p.value_at(TAU) - mid_way).abs() < 1e-5);
        assert!(p.value_at(TAU * 30.0) < -9.99);
    }

    #[test]
    fn zero_time_constant_jumps_at_start() {
        let p = AudioParam::new("gain", 0.0);
        p.set_target_at_time(3.0, 1.0, 0.0).unwrap();
        assert_eq!(p.value_at(0.5), 0.0);
        assert_eq!(p.value_at(1.0), 3.0);
    }

    #[test]
    fn rejects_invalid_automation() {
        let p = AudioParam::new("gain", 1.0);
        assert!(matches!(
            p.set_target_at_time(f32::NAN, 0.0, TAU),
            Err(ParamError::NonFiniteTarget(_))
        ));
        assert!(matches!(
            p.set_target_at_time(0.5, 0.0, -1.0),
            Err(ParamError::InvalidTimeConstant(_))
        ));
        assert!(matches!(
            p.set_target_at_time(0.5, f64::INFINITY, TAU),
            Err(ParamError::InvalidStartTime(_))
        ));
        assert_eq!(p.value_at(1.0), 1.0);
    }

    #[test]
    fn block_fill_matches_point_sampling() {
        let p = AudioParam::new("gain", 1.0);
        p.set_target_at_time(0.25, 0.001, TAU).unwrap();

        let rate = 48_000.0;
        let mut values = [0.0f32; 128];
        p.fill_values(&mut values, |i| i as f64 / rate);

        for (i, &v) in values.iter().enumerate() {
            assert_eq!(v, p.value_at(i as f64 / rate));
        }
        assert_eq!(values[0], 1.0);
        assert!(values[127] < 1.0);
    }
}
