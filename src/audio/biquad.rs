use super::node::{AudioNode, NodeKind, RenderInfo};
use super::param::AudioParam;
use std::f64::consts::PI;

/// Filter shapes offered by the equalizer bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowShelf,
    Peaking,
    HighShelf,
}

/// Normalized coefficients of H(z) = (b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Coefficients {
    /// Audio EQ Cookbook coefficients with shelf slope fixed at 1.
    /// `q` only affects the peaking shape.
    pub fn calculate(kind: FilterKind, sample_rate: f32, frequency: f32, q: f32, gain_db: f32) -> Self {
        let nyquist = sample_rate as f64 / 2.0;
        let f0 = (frequency as f64).clamp(0.0, nyquist);
        let a = 10f64.powf(gain_db as f64 / 40.0);
        let w0 = 2.0 * PI * f0 / sample_rate as f64;
        let (sin_w0, cos_w0) = w0.sin_cos();

        let (b0, b1, b2, a0, a1, a2) = match kind {
            FilterKind::Peaking => {
                let alpha = sin_w0 / (2.0 * q as f64);
                (
                    1.0 + alpha * a,
                    -2.0 * cos_w0,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w0,
                    1.0 - alpha / a,
                )
            }
            FilterKind::LowShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * (sin_w0 / 2.0 * 2f64.sqrt());
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
            FilterKind::HighShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * (sin_w0 / 2.0 * 2f64.sqrt());
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
        };

        // Normalize by a0.
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// One equalizer band: a biquad whose gain (dB) follows an [`AudioParam`].
///
/// Coefficients are refreshed once per block, and only when the gain moved.
pub struct BiquadFilterNode {
    role: NodeKind,
    kind: FilterKind,
    frequency: f32,
    q: f32,
    gain: AudioParam,

    coeffs: Option<Coefficients>,
    last_gain_db: f32,
    last_sample_rate: f32,

    //
    // Direct Form I history.
    //
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadFilterNode {
    pub fn new(role: NodeKind, kind: FilterKind, frequency: f32, q: f32, gain: AudioParam) -> Self {
        Self {
            role,
            kind,
            frequency,
            q,
            gain,
            coeffs: None,
            last_gain_db: 0.0,
            last_sample_rate: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn refresh(&mut self, info: &RenderInfo) -> Coefficients {
        let gain_db = self.gain.value_at(info.current_time);
        match self.coeffs {
            Some(c) if gain_db == self.last_gain_db && info.sample_rate == self.last_sample_rate => c,
            _ => {
                let c = Coefficients::calculate(
                    self.kind,
                    info.sample_rate,
                    self.frequency,
                    self.q,
                    gain_db,
                );
                self.coeffs = Some(c);
                self.last_gain_db = gain_db;
                self.last_sample_rate = info.sample_rate;
                c
            }
        }
    }
}

impl AudioNode for BiquadFilterNode {
    fn kind(&self) -> NodeKind {
        self.role
    }

    fn process(&mut self, block: &mut [f32], info: &RenderInfo) {
        let c = self.refresh(info);

        for sample in block.iter_mut() {
            let x0 = *sample as f64;
            let y0 = c.b0 * x0 + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

            self.x2 = self.x1;
            self.x1 = x0;
            self.y2 = self.y1;
            self.y1 = y0;

            *sample = y0 as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: f32 = 48_000.0;

    fn db_to_linear(db: f64) -> f64 {
        10f64.powf(db / 20.0)
    }

    fn magnitude(c: &Coefficients, sample_rate: f32, frequency: f32) -> f64 {
        let w = 2.0 * PI * frequency as f64 / sample_rate as f64;
        let (s1, c1) = w.sin_cos();
        let (s2, c2) = (2.0 * w).sin_cos();

        let num_re = c.b0 + c.b1 * c1 + c.b2 * c2;
        let num_im = -(c.b1 * s1 + c.b2 * s2);
        let den_re = 1.0 + c.a1 * c1 + c.a2 * c2;
        let den_im = -(c.a1 * s1 + c.a2 * s2);

        num_re.hypot(num_im) / den_re.hypot(den_im)
    }

    #[test]
    fn zero_gain_is_transparent_for_every_shape() {
        for kind in [FilterKind::LowShelf, FilterKind::Peaking, FilterKind::HighShelf] {
            let c = Coefficients::calculate(kind, FS, 440.0, std::f32::consts::FRAC_1_SQRT_2, 0.0);
            for f in [20.0, 440.0, 5_000.0, 20_000.0] {
                assert!((magnitude(&c, FS, f) - 1.0).abs() < 1e-9, "{:?} at {} Hz", kind, f);
            }
        }
    }

    #[test]
    fn low_shelf_reaches_full_gain_at_dc() {
        let c = Coefficients::calculate(FilterKind::LowShelf, FS, 200.0, 1.0, 6.0);
        assert!((magnitude(&c, FS, 0.0) - db_to_linear(6.0)).abs() < 1e-9);
        assert!((magnitude(&c, FS, 20_000.0) - 1.0).abs() < 0.01);
    }

    #[test]
    fn high_shelf_reaches_full_gain_at_nyquist() {
        let c = Coefficients::calculate(FilterKind::HighShelf, FS, 600.0, 1.0, -9.0);
        assert!((magnitude(&c, FS, FS / 2.0) - db_to_linear(-9.0)).abs() < 1e-9);
        assert!((magnitude(&c, FS, 10.0) - 1.0).abs() < 0.01);
    }

    #[test]
    fn peaking_hits_gain_at_center() {
        let c = Coefficients::calculate(FilterKind::Peaking, FS, 440.0, 1.0, 10.0);
        assert!((magnitude(&c, FS, 440.0) - db_to_linear(10.0)).abs() < 1e-6);
        assert!((magnitude(&c, FS, 15_000.0) - 1.0).abs() < 0.01);
    }

    #[test]
    fn boosted_low_shelf_amplifies_dc_signal() {
        let gain = AudioParam::new("bass", 6.0);
        let mut node = BiquadFilterNode::new(NodeKind::Bass, FilterKind::LowShelf, 200.0, 1.0, gain);
        let info = RenderInfo {
            current_time: 0.0,
            sample_rate: FS,
        };

        let mut block = vec![0.5f32; 4096];
        node.process(&mut block, &info);

        let settled = *block.last().unwrap() as f64;
        assert!((settled - 0.5 * db_to_linear(6.0)).abs() < 1e-3);
        assert_eq!(node.kind(), NodeKind::Bass);
    }

    #[test]
    fn coefficients_follow_gain_changes() {
        let gain = AudioParam::new("mid", 0.0);
        let mut node = BiquadFilterNode::new(NodeKind::Mid, FilterKind::Peaking, 440.0, 1.0, gain.clone());
        let info = RenderInfo {
            current_time: 0.0,
            sample_rate: FS,
        };

        let mut block = [0.0f32; 8];
        node.process(&mut block, &info);
        let flat = node.coeffs.unwrap();

        gain.set_target_at_time(12.0, 0.0, 0.0).unwrap();
        node.process(&mut block, &info);
        assert_ne!(node.coeffs.unwrap(), flat);
        assert_eq!(node.last_gain_db, 12.0);
    }
}
