use iced::{Point, Rectangle, Size, Vector};

const MIN_ZOOM: f32 = 0.05;
const MAX_ZOOM: f32 = 50.0;

/// Zoom and pan of the image inside the canvas.
///
/// The image is first fitted to the canvas, then scaled by `zoom` around the
/// canvas centre and shifted by `pan` screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub zoom: f32,
    pub pan: Vector,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Vector::new(0.0, 0.0),
        }
    }
}

impl Viewport {
    fn fit(canvas: Size, image: Size) -> f32 {
        if image.width <= 0.0 || image.height <= 0.0 {
            return 1.0;
        }
        (canvas.width / image.width).min(canvas.height / image.height)
    }

    /// Screen pixels per image pixel
    pub fn scale(&self, canvas: Size, image: Size) -> f32 {
        Self::fit(canvas, image) * self.zoom
    }

    fn centre(canvas: Size) -> Point {
        Point::new(canvas.width / 2.0, canvas.height / 2.0)
    }

    /// Image-space point to canvas-space point
    pub fn to_screen(&self, canvas: Size, image: Size, p: Point) -> Point {
        let scale = self.scale(canvas, image);
        Self::centre(canvas)
            + self.pan
            + Vector::new(
                (p.x - image.width / 2.0) * scale,
                (p.y - image.height / 2.0) * scale,
            )
    }

    /// Canvas-space point to image-space point
    pub fn to_image(&self, canvas: Size, image: Size, p: Point) -> Point {
        let scale = self.scale(canvas, image);
        let rel = p - Self::centre(canvas) - self.pan;
        Point::new(
            rel.x / scale + image.width / 2.0,
            rel.y / scale + image.height / 2.0,
        )
    }

    /// Screen rectangle covered by the image-space rectangle
    pub fn rect_to_screen(&self, canvas: Size, image: Size, rect: Rectangle) -> Rectangle {
        let scale = self.scale(canvas, image);
        let top_left = self.to_screen(canvas, image, rect.position());
        Rectangle::new(top_left, Size::new(rect.width * scale, rect.height * scale))
    }

    /// Zoom by `factor` keeping the point `offset` from the canvas centre fixed
    pub fn zoom_at(&mut self, factor: f32, offset: Vector) {
        let target = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let factor = target / self.zoom;
        self.pan = offset * (1.0 - factor) + self.pan * factor;
        self.zoom = target;
    }

    pub fn pan_by(&mut self, delta: Vector) {
        self.pan = self.pan + delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const CANVAS: Size = Size::new(800.0, 600.0);
    const IMAGE: Size = Size::new(400.0, 400.0);

    #[test]
    fn image_is_fitted_and_centred() {
        let vp = Viewport::default();
        assert_abs_diff_eq!(vp.scale(CANVAS, IMAGE), 1.5);

        let centre = vp.to_screen(CANVAS, IMAGE, Point::new(200.0, 200.0));
        assert_eq!(centre, Point::new(400.0, 300.0));
    }

    #[test]
    fn screen_and_image_coordinates_invert() {
        let mut vp = Viewport::default();
        vp.pan_by(Vector::new(30.0, -12.0));
        vp.zoom_at(1.25, Vector::new(50.0, 20.0));

        let p = Point::new(123.0, 45.0);
        let back = vp.to_image(CANVAS, IMAGE, vp.to_screen(CANVAS, IMAGE, p));
        assert_abs_diff_eq!(back.x, p.x, epsilon = 1e-3);
        assert_abs_diff_eq!(back.y, p.y, epsilon = 1e-3);
    }

    #[test]
    fn zoom_keeps_point_under_cursor() {
        let mut vp = Viewport::default();
        let cursor = Point::new(600.0, 100.0);
        let before = vp.to_image(CANVAS, IMAGE, cursor);

        vp.zoom_at(1.25, cursor - Point::new(400.0, 300.0));
        let after = vp.to_image(CANVAS, IMAGE, cursor);
        assert_abs_diff_eq!(before.x, after.x, epsilon = 1e-3);
        assert_abs_diff_eq!(before.y, after.y, epsilon = 1e-3);
        assert_abs_diff_eq!(vp.zoom, 1.25);

        vp.zoom_at(0.8, Vector::new(0.0, 0.0));
        assert_abs_diff_eq!(vp.zoom, 1.0, epsilon = 1e-6);
    }
}
