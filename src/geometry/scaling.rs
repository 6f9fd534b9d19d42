use super::BoundingBox;

/// Maps projected coordinates (meters) onto an image canvas (pixels)
///
/// The canvas y axis points down, so northings are flipped. The larger
/// dimension of the bounds fills the canvas minus its margins and the
/// drawing is centered in the remaining space.
#[derive(Debug, Clone)]
pub struct Scaler {
    /// Scale factor: pixels per meter
    scale: f64,
    offset_x: f64,
    offset_y: f64,
    canvas_width: f64,
    canvas_height: f64,
}

impl Scaler {
    /// Create a scaler with a band at the top reserved for a title
    ///
    /// # Arguments
    /// * `bounds` - Extent to fit, in meters
    /// * `canvas` - (width, height) in pixels
    /// * `margin` - Blank border on every side, in pixels
    /// * `top_band` - Extra space above the drawing, in pixels
    pub fn fit(bounds: &BoundingBox, canvas: (f64, f64), margin: f64, top_band: f64) -> Self {
        let (canvas_width, canvas_height) = canvas;
        let usable_width = (canvas_width - 2.0 * margin).max(1.0);
        let usable_height = (canvas_height - 2.0 * margin - top_band).max(1.0);

        let scale = (usable_width / bounds.width()).min(usable_height / bounds.height());

        let scaled_width = bounds.width() * scale;
        let scaled_height = bounds.height() * scale;

        let offset_x = margin + (usable_width - scaled_width) / 2.0 - bounds.min_x * scale;
        // y_px = offset_y - y * scale, so max_y lands at the top of the drawing area
        let offset_y =
            margin + top_band + (usable_height - scaled_height) / 2.0 + bounds.max_y * scale;

        Self {
            scale,
            offset_x,
            offset_y,
            canvas_width,
            canvas_height,
        }
    }

    /// Scale a point from meters to canvas pixels
    pub fn scale(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.scale + self.offset_x, self.offset_y - y * self.scale)
    }

    /// Scale a length from meters to pixels
    pub fn scale_length(&self, meters: f64) -> f64 {
        meters * self.scale
    }

    pub fn canvas(&self) -> (f64, f64) {
        (self.canvas_width, self.canvas_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaler_fits_and_flips() {
        let bounds = BoundingBox::new(0.0, 0.0, 10_000.0, 10_000.0).unwrap();
        let scaler = Scaler::fit(&bounds, (1000.0, 1000.0), 50.0, 0.0);

        // 10km fits 900px
        assert!((scaler.scale_length(10_000.0) - 900.0).abs() < 1e-9);

        let (x, y) = scaler.scale(0.0, 0.0);
        assert!((x - 50.0).abs() < 1e-9);
        assert!((y - 950.0).abs() < 1e-9);

        let (x, y) = scaler.scale(10_000.0, 10_000.0);
        assert!((x - 950.0).abs() < 1e-9);
        assert!((y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_scaler_centers_narrow_bounds() {
        let bounds = BoundingBox::new(0.0, 0.0, 1_000.0, 4_000.0).unwrap();
        let scaler = Scaler::fit(&bounds, (1000.0, 1000.0), 0.0, 200.0);

        // Height limits: 800px for 4km
        let (x_min, y_top) = scaler.scale(0.0, 4_000.0);
        let (x_max, y_bottom) = scaler.scale(1_000.0, 0.0);
        assert!((y_top - 200.0).abs() < 1e-9);
        assert!((y_bottom - 1000.0).abs() < 1e-9);
        assert!(((x_min + x_max) / 2.0 - 500.0).abs() < 1e-9);
    }
}
