/// Backing-store size of the visualizer canvas, kept in step with its
/// on-screen size and the display's pixel ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CanvasSurface {
    width: u32,
    height: u32,
}

impl CanvasSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sets the backing size to `css_size * pixel_ratio`, truncated to whole
    /// pixels. Returns whether the size changed.
    pub fn resize(&mut self, css_width: f32, css_height: f32, pixel_ratio: f32) -> bool {
        let width = to_pixels(css_width * pixel_ratio);
        let height = to_pixels(css_height * pixel_ratio);

        if (width, height) == (self.width, self.height) {
            return false;
        }

        log::debug!(
            "Canvas resized: {}x{} -> {}x{} (ratio {})",
            self.width,
            self.height,
            width,
            height,
            pixel_ratio
        );
        self.width = width;
        self.height = height;
        true
    }
}

fn to_pixels(v: f32) -> u32 {
    if v.is_finite() && v > 0.0 {
        v as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_by_pixel_ratio() {
        let mut surface = CanvasSurface::new();
        assert!(surface.resize(400.0, 150.0, 2.0));
        assert_eq!((surface.width(), surface.height()), (800, 300));
    }

    #[test]
    fn truncates_fractional_pixels() {
        let mut surface = CanvasSurface::new();
        surface.resize(300.5, 100.25, 1.5);
        assert_eq!((surface.width(), surface.height()), (450, 150));
    }

    #[test]
    fn repeated_resize_is_idempotent() {
        let mut surface = CanvasSurface::new();
        assert!(surface.resize(640.0, 480.0, 1.25));
        let first = surface;
        assert!(!surface.resize(640.0, 480.0, 1.25));
        assert_eq!(surface, first);
    }

    #[test]
    fn degenerate_sizes_collapse_to_zero() {
        let mut surface = CanvasSurface::new();
        surface.resize(100.0, 100.0, 1.0);
        surface.resize(-5.0, f32::NAN, 1.0);
        assert_eq!((surface.width(), surface.height()), (0, 0));
    }
}
