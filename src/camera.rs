/// Horizontal viewport offset into the world
/// - `scroll` stays inside `[0, max_scroll()]` after every mutation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    scroll: f32,
    world_width: f32,
    viewport_width: f32,
}

impl Camera {
    pub fn new(world_width: f32, viewport_width: f32) -> Self {
        Camera {
            scroll: 0.0,
            world_width: sane(world_width),
            viewport_width: sane(viewport_width),
        }
    }

    pub fn scroll(&self) -> f32 {
        self.scroll
    }

    pub fn viewport_width(&self) -> f32 {
        self.viewport_width
    }

    /// Pinned to 0 when the viewport is wider than the world
    pub fn max_scroll(&self) -> f32 {
        (self.world_width - self.viewport_width).max(0.0)
    }

    pub fn scroll_by(&mut self, delta: f32) {
        self.scroll_to(self.scroll + delta);
    }

    pub fn scroll_to(&mut self, scroll: f32) {
        if scroll.is_nan() {
            return;
        }
        self.scroll = scroll.clamp(0.0, self.max_scroll());
    }

    /// Put `x` (world space) in the middle of the viewport, as far as bounds allow
    pub fn center_on(&mut self, x: f32) {
        self.scroll_to(x - self.viewport_width / 2.0);
    }

    /// Where along the scrollable range we are, 0 when nothing scrolls
    pub fn fraction(&self) -> f32 {
        let max = self.max_scroll();
        if max > 0.0 {
            self.scroll / max
        } else {
            0.0
        }
    }

    /// New world / viewport extents keeping the relative scroll position
    pub fn resized(&self, world_width: f32, viewport_width: f32) -> Camera {
        let mut camera = Camera::new(world_width, viewport_width);
        camera.scroll_to(self.fraction() * camera.max_scroll());
        camera
    }
}

fn sane(length: f32) -> f32 {
    if length.is_finite() {
        length.max(0.0)
    } else {
        0.0
    }
}
