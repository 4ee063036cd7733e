use egui::{Pos2, Rect, Vec2};

pub const MIN_ZOOM: f32 = 0.2;
pub const MAX_ZOOM: f32 = 3.0;
pub const ZOOM_STEP: f32 = 0.1;
/// Breathing room around the canvas when fitting it to the container.
pub const FIT_PADDING: f32 = 30.0;

/// Largest zoom that shows the whole canvas inside the container with
/// padding on every side. Never upscales past 1:1.
pub fn fit_factor(canvas: Vec2, container: Vec2) -> f32 {
    let avail_w = (container.x - 2.0 * FIT_PADDING).max(1.0);
    let avail_h = (container.y - 2.0 * FIT_PADDING).max(1.0);
    (avail_w / canvas.x).min(avail_h / canvas.y).min(1.0)
}

/// Maps between document coordinates (canvas pixels) and screen coordinates.
/// The canvas is always centered in the container; zoom is the only state.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    zoom: f32,
    container: Rect,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self {
            zoom: 1.0,
            container: Rect::ZERO,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom - ZOOM_STEP);
    }

    pub fn reset_zoom(&mut self) {
        self.zoom = 1.0;
    }

    /// Fit the canvas to the current container. The result may sit below the
    /// manual zoom range for very large canvases; stepping afterwards pulls
    /// the zoom back into range.
    pub fn zoom_to_fit(&mut self, canvas: Vec2) {
        self.zoom = fit_factor(canvas, self.container.size());
    }

    pub fn set_container(&mut self, container: Rect) {
        self.container = container;
    }

    pub fn container(&self) -> Rect {
        self.container
    }

    /// Screen rectangle the canvas occupies, centered in the container.
    pub fn canvas_rect(&self, canvas: Vec2) -> Rect {
        Rect::from_center_size(self.container.center(), canvas * self.zoom)
    }

    pub fn doc_to_screen(&self, canvas: Vec2, point: Pos2) -> Pos2 {
        self.canvas_rect(canvas).min + point.to_vec2() * self.zoom
    }

    pub fn screen_to_doc(&self, canvas: Vec2, point: Pos2) -> Pos2 {
        ((point - self.canvas_rect(canvas).min) / self.zoom).to_pos2()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{pos2, vec2};

    #[test]
    fn fit_keeps_padding_and_never_upscales() {
        // 1600x1200 canvas in an 800x600 container: 540/1200 wins
        let f = fit_factor(vec2(1600.0, 1200.0), vec2(800.0, 600.0));
        assert!((f - 0.45).abs() < 1e-6);

        // Small canvas stays at 1:1
        let f = fit_factor(vec2(100.0, 100.0), vec2(800.0, 600.0));
        assert_eq!(f, 1.0);
    }

    #[test]
    fn zoom_steps_clamp_to_range() {
        let mut vp = Viewport::new();
        vp.set_zoom(2.95);
        vp.zoom_in();
        assert_eq!(vp.zoom(), MAX_ZOOM);
        vp.set_zoom(0.25);
        vp.zoom_out();
        vp.zoom_out();
        assert_eq!(vp.zoom(), MIN_ZOOM);
    }

    #[test]
    fn screen_doc_round_trip() {
        let mut vp = Viewport::new();
        vp.set_container(Rect::from_min_size(pos2(100.0, 50.0), vec2(1000.0, 700.0)));
        vp.set_zoom(0.5);
        let canvas = vec2(800.0, 600.0);

        let doc = pos2(400.0, 300.0);
        let screen = vp.doc_to_screen(canvas, doc);
        // Canvas center maps to container center
        assert_eq!(screen, vp.container().center());
        assert_eq!(vp.screen_to_doc(canvas, screen), doc);
    }
}
