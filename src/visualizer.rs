//! Mirrored frequency-bar rendering, independent of any drawing backend.

use crate::config::{BarScale, HueMapping};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An HSL fill color. Hue is in degrees and may lie outside [0, 360).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub hue: f32,
    pub saturation: f32,
    pub lightness: f32,
}

impl Hsl {
    pub fn vivid(hue: f32) -> Self {
        Self {
            hue,
            saturation: 1.0,
            lightness: 0.5,
        }
    }

    /// RGB bytes, with the hue wrapped onto the color wheel.
    pub fn to_rgb(self) -> (u8, u8, u8) {
        let h = self.hue.rem_euclid(360.0) / 60.0;
        let c = (1.0 - (2.0 * self.lightness - 1.0).abs()) * self.saturation;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let m = self.lightness - c / 2.0;

        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        let byte = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        (byte(r), byte(g), byte(b))
    }
}

/// A drawing surface measured in backing-store pixels.
pub trait Canvas {
    fn width(&self) -> f32;
    fn height(&self) -> f32;
    fn clear(&mut self);
    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Hsl);
}

/// Geometry of one frequency bin's bar pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub x: f32,
    pub width: f32,
    /// Extent above and below the vertical center.
    pub half_height: f32,
    pub hue: f32,
}

/// Maps a spectrum snapshot to bars on a `width` × `height` canvas.
pub fn layout_bars(spectrum: &[u8], width: f32, height: f32, scale: &BarScale, hue: &HueMapping) -> Vec<Bar> {
    if spectrum.is_empty() || width <= 0.0 || height <= 0.0 {
        return Vec::new();
    }

    let bar_width = width / spectrum.len() as f32;
    spectrum
        .iter()
        .enumerate()
        .map(|(i, &item)| {
            let y = scale.floor + (item as f32 / 255.0) * height * scale.amplitude;
            Bar {
                x: bar_width * i as f32,
                width: bar_width / 2.0,
                half_height: y,
                hue: (y / height + hue.offset) * hue.scale,
            }
        })
        .collect()
}

/// Clears `canvas` and draws every bin as two rectangles mirrored about the
/// vertical center. Returns the number of bars drawn.
pub fn draw_frame(canvas: &mut dyn Canvas, spectrum: &[u8], scale: &BarScale, hue: &HueMapping) -> usize {
    let (width, height) = (canvas.width(), canvas.height());
    canvas.clear();

    let bars = layout_bars(spectrum, width, height, scale, hue);
    let center = height / 2.0;
    for bar in &bars {
        let color = Hsl::vivid(bar.hue);
        canvas.fill_rect(bar.x, center, bar.width, bar.half_height, color);
        canvas.fill_rect(bar.x, center - bar.half_height, bar.width, bar.half_height, color);
    }
    bars.len()
}

/// Per-frame loop gate. Every tick checks the flag; once stopped it stays
/// stopped.
#[derive(Debug, Clone)]
pub struct RenderLoop {
    running: Arc<AtomicBool>,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Whether this frame should be drawn and the next one scheduled.
    pub fn tick(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            log::info!("Visualizer loop stopped");
        }
    }
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}
