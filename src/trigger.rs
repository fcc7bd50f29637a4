use crate::content::Content;
use crate::engine::{Point, Rect, Size};
use crate::events::GalleryEvent;
use std::f32::consts::PI;

pub const HOVER_MS: f32 = 200.0;
pub const HOVER_LIFT: f32 = 20.0;
pub const HOVER_SCALE: f32 = 1.05;
pub const BUMP_MS: f32 = 240.0;
pub const BUMP_SCALE: f32 = 0.08;
pub const BUMP_LIFT: f32 = 12.0;

/// Ease-out cubic tween of a single value toward a target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    from: f32,
    to: f32,
    elapsed_ms: f32,
    duration_ms: f32,
}

impl Tween {
    pub fn at_rest(value: f32, duration_ms: f32) -> Self {
        Tween {
            from: value,
            to: value,
            elapsed_ms: duration_ms,
            duration_ms,
        }
    }

    pub fn value(&self) -> f32 {
        let t = if self.duration_ms > 0.0 {
            (self.elapsed_ms / self.duration_ms).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let eased = 1.0 - (1.0 - t).powi(3);
        self.from + (self.to - self.from) * eased
    }

    /// Retarget from wherever the value currently is
    pub fn head_to(&mut self, to: f32) {
        if (to - self.to).abs() > f32::EPSILON {
            self.from = self.value();
            self.to = to;
            self.elapsed_ms = 0.0;
        }
    }

    pub fn advance(&mut self, delta_ms: f32) {
        self.elapsed_ms = (self.elapsed_ms + delta_ms.max(0.0)).min(self.duration_ms);
    }
}

/// Image drawn inside a region once its own texture has resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub key: String,
    pub path: String,
    /// center in world space
    pub anchor: Point,
    pub max_size: Size,
}

impl Thumbnail {
    /// Fit `natural` inside `max_size` keeping aspect, plus a few pixels of
    /// bleed so the image covers the painting's inner frame
    pub fn fitted_size(&self, natural: Size) -> Option<Size> {
        if natural.width <= 0.0 || natural.height <= 0.0 {
            return None;
        }
        let scale = (self.max_size.width / natural.width).min(self.max_size.height / natural.height);
        let scale_x = scale + 10.0 / natural.width;
        let scale_y = scale + 8.0 / natural.height;
        Some(natural.scaled(scale_x, scale_y))
    }
}

/// Caption painted on a region
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub center: Point,
    pub font_size: f32,
    pub max_width: f32,
}

/// A clickable / collidable area bound to one piece of content
#[derive(Debug, Clone)]
pub struct TriggerRegion {
    pub index: usize,
    /// resting bounds in world space
    pub bounds: Rect,
    pub content: Content,
    pub enabled: bool,
    pub thumbnail: Option<Thumbnail>,
    pub label: Option<Label>,
    hover: Tween,
    bump_ms: Option<f32>,
}

impl TriggerRegion {
    pub fn new(
        index: usize,
        bounds: Rect,
        content: Content,
        thumbnail: Option<Thumbnail>,
        label: Option<Label>,
    ) -> Self {
        TriggerRegion {
            index,
            bounds,
            content,
            enabled: true,
            thumbnail,
            label,
            hover: Tween::at_rest(0.0, HOVER_MS),
            bump_ms: None,
        }
    }

    pub fn is_activatable(&self) -> bool {
        self.enabled && !self.content.is_empty()
    }

    /// 0 at rest, 1 fully hovered
    pub fn hover_amount(&self) -> f32 {
        self.hover.value()
    }

    /// 0 outside the acknowledgement animation, peaks at 1 halfway
    pub fn bump_amount(&self) -> f32 {
        self.bump_ms
            .map(|elapsed| ((elapsed / BUMP_MS).clamp(0.0, 1.0) * PI).sin())
            .unwrap_or(0.0)
    }

    pub fn is_bumping(&self) -> bool {
        self.bump_ms.is_some()
    }

    /// Vertical offset and scale the region is drawn with right now
    pub fn display_offset(&self) -> (f32, f32) {
        let hover = self.hover_amount();
        let lift = -HOVER_LIFT * hover;
        let scale = 1.0 + (HOVER_SCALE - 1.0) * hover;
        (lift, scale)
    }

    /// Where the region is drawn (and clicked) including hover
    pub fn display_bounds(&self) -> Rect {
        let (lift, scale) = self.display_offset();
        self.bounds.translated(0.0, lift).scaled_about_center(scale)
    }

    fn start_bump(&mut self) {
        self.bump_ms = Some(0.0);
    }

    fn advance(&mut self, delta_ms: f32, hovered: bool) {
        self.hover.head_to(if hovered { 1.0 } else { 0.0 });
        self.hover.advance(delta_ms);
        if let Some(elapsed) = self.bump_ms {
            let elapsed = elapsed + delta_ms.max(0.0);
            self.bump_ms = if elapsed >= BUMP_MS { None } else { Some(elapsed) };
        }
    }

    /// Carry interaction state over to the same region after a relayout
    pub fn inherit(&mut self, previous: &TriggerRegion) {
        self.enabled = previous.enabled;
        self.hover = previous.hover;
        self.bump_ms = previous.bump_ms;
    }
}

/// Platformer contact test: the player's head reached the block's
/// underside this step, coming from below
/// - rising (top moved up)
/// - horizontal overlap
/// - top was at or below the block bottom before and at or above it now
pub fn hits_from_below(previous: &Rect, current: &Rect, block: &Rect) -> bool {
    let rising = current.top() < previous.top();
    let overlaps_x = current.left() < block.right() && current.right() > block.left();
    let was_below = previous.top() >= block.bottom();
    let reached = current.top() <= block.bottom() && current.bottom() > block.bottom();
    rising && overlaps_x && was_below && reached
}

/// All regions of the scene plus the "a modal is open" switch
#[derive(Debug, Clone, Default)]
pub struct Triggers {
    regions: Vec<TriggerRegion>,
    suspended: bool,
}

impl Triggers {
    pub fn new(regions: Vec<TriggerRegion>) -> Self {
        Triggers {
            regions,
            suspended: false,
        }
    }

    pub fn regions(&self) -> &[TriggerRegion] {
        &self.regions
    }

    /// True between an activation and the shell's re-enable
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Topmost activatable region under `point` (world space)
    pub fn hit_test(&self, point: Point) -> Option<usize> {
        self.regions
            .iter()
            .rev()
            .find(|region| region.is_activatable() && region.display_bounds().contains(point))
            .map(|region| region.index)
    }

    /// Activate region `index`
    /// - disables every region
    /// - starts its acknowledgement bump
    /// - returns the one event to publish
    /// A disabled or empty region is a no-op
    pub fn activate(&mut self, index: usize) -> Option<GalleryEvent> {
        let event = {
            let region = self.regions.get(index)?;
            if self.suspended || !region.is_activatable() {
                return None;
            }
            GalleryEvent::from_content(&region.content)?
        };
        for region in self.regions.iter_mut() {
            region.enabled = false;
        }
        self.suspended = true;
        if let Some(region) = self.regions.get_mut(index) {
            region.start_bump();
        }
        Some(event)
    }

    /// Only ever called on behalf of the shell once its modal closed
    pub fn enable_all(&mut self) {
        for region in self.regions.iter_mut() {
            region.enabled = true;
        }
        self.suspended = false;
    }

    /// Advance hover / bump animations, `hover` is the pointer in world space
    pub fn advance(&mut self, delta_ms: f32, hover: Option<Point>) {
        let hovered = hover.and_then(|point| self.hit_test(point));
        for region in self.regions.iter_mut() {
            region.advance(delta_ms, hovered == Some(region.index));
        }
    }

    /// Relayout: take new geometry, keep interaction state
    pub fn relayout(&mut self, mut regions: Vec<TriggerRegion>) {
        for (new, old) in regions.iter_mut().zip(self.regions.iter()) {
            new.inherit(old);
        }
        self.regions = regions;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Project;
    use approx::assert_relative_eq;

    fn rect(x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect::new(Point { x, y }, Size { width: w, height: h })
    }

    fn project() -> Project {
        Project {
            title: "Thing".to_string(),
            image: "./thing.png".to_string(),
            description: "d".to_string(),
            external_url: "https://example.com".to_string(),
            tags: vec![],
        }
    }

    fn triggers() -> Triggers {
        Triggers::new(vec![
            TriggerRegion::new(0, rect(0.0, 0.0, 100.0, 100.0), Content::About, None, None),
            TriggerRegion::new(1, rect(200.0, 0.0, 100.0, 100.0), Content::Project(project()), None, None),
            TriggerRegion::new(2, rect(400.0, 0.0, 100.0, 100.0), Content::Empty, None, None),
            TriggerRegion::new(3, rect(600.0, 0.0, 100.0, 100.0), Content::Contact, None, None),
        ])
    }

    #[test]
    fn activation_fires_once_until_reenabled() {
        let mut triggers = triggers();
        assert_eq!(triggers.activate(1), Some(GalleryEvent::ShowProject(project())));
        assert!(triggers.is_suspended());
        assert!(triggers.regions().iter().all(|region| !region.enabled));

        assert_eq!(triggers.activate(0), None);
        assert_eq!(triggers.activate(1), None);
        assert_eq!(triggers.activate(3), None);

        triggers.enable_all();
        assert_eq!(triggers.activate(3), Some(GalleryEvent::ShowContact));
    }

    #[test]
    fn empty_regions_never_activate() {
        let mut triggers = triggers();
        assert_eq!(triggers.activate(2), None);
        assert!(!triggers.is_suspended());
        assert_eq!(triggers.hit_test(Point { x: 450.0, y: 50.0 }), None);
    }

    #[test]
    fn disabled_regions_are_not_hit() {
        let mut triggers = triggers();
        let point = Point { x: 50.0, y: 50.0 };
        assert_eq!(triggers.hit_test(point), Some(0));
        triggers.activate(0);
        assert_eq!(triggers.hit_test(point), None);
    }

    #[test]
    fn bump_plays_and_finishes_without_reenabling() {
        let mut triggers = triggers();
        triggers.activate(0);
        triggers.advance(BUMP_MS / 2.0, None);
        assert_relative_eq!(triggers.regions()[0].bump_amount(), 1.0, epsilon = 1e-4);
        triggers.advance(BUMP_MS, None);
        assert!(!triggers.regions()[0].is_bumping());
        assert!(triggers.is_suspended());
    }

    #[test]
    fn hover_eases_in_and_out() {
        let mut triggers = triggers();
        let over = Some(Point { x: 50.0, y: 50.0 });
        triggers.advance(HOVER_MS / 2.0, over);
        let halfway = triggers.regions()[0].hover_amount();
        assert!(halfway > 0.5 && halfway < 1.0);
        triggers.advance(HOVER_MS, over);
        assert_relative_eq!(triggers.regions()[0].hover_amount(), 1.0);
        let (lift, scale) = triggers.regions()[0].display_offset();
        assert_relative_eq!(lift, -HOVER_LIFT);
        assert_relative_eq!(scale, HOVER_SCALE);
        triggers.advance(HOVER_MS, None);
        assert_relative_eq!(triggers.regions()[0].hover_amount(), 0.0);
    }

    #[test]
    fn head_bump_from_below_counts() {
        let block = rect(100.0, 100.0, 50.0, 50.0);
        let previous = rect(110.0, 160.0, 20.0, 40.0);
        let current = rect(110.0, 145.0, 20.0, 40.0);
        assert!(hits_from_below(&previous, &current, &block));
    }

    #[test]
    fn overlap_without_bottom_contact_does_not_count() {
        let block = rect(100.0, 100.0, 50.0, 50.0);
        // walked in from the side at block height
        let previous = rect(70.0, 110.0, 20.0, 40.0);
        let current = rect(85.0, 108.0, 20.0, 40.0);
        assert!(current.intersects(&block));
        assert!(!hits_from_below(&previous, &current, &block));

        // falling onto the top
        let previous = rect(110.0, 50.0, 20.0, 40.0);
        let current = rect(110.0, 65.0, 20.0, 40.0);
        assert!(current.intersects(&block));
        assert!(!hits_from_below(&previous, &current, &block));

        // rising below but off to the side
        let previous = rect(160.0, 160.0, 20.0, 40.0);
        let current = rect(160.0, 145.0, 20.0, 40.0);
        assert!(!hits_from_below(&previous, &current, &block));
    }

    #[test]
    fn thumbnail_fits_inside_max_box() {
        let thumbnail = Thumbnail {
            key: "project_1".to_string(),
            path: "./thing.png".to_string(),
            anchor: Point::default(),
            max_size: Size { width: 100.0, height: 50.0 },
        };
        let fitted = thumbnail
            .fitted_size(Size { width: 400.0, height: 100.0 })
            .expect("non empty image");
        assert_relative_eq!(fitted.width, 110.0);
        assert_relative_eq!(fitted.height, 33.0);
        assert_eq!(thumbnail.fitted_size(Size::default()), None);
    }

    #[test]
    fn relayout_keeps_disabled_flags() {
        let mut triggers = triggers();
        triggers.activate(1);
        let fresh = vec![
            TriggerRegion::new(0, rect(0.0, 0.0, 10.0, 10.0), Content::About, None, None),
            TriggerRegion::new(1, rect(20.0, 0.0, 10.0, 10.0), Content::Project(project()), None, None),
        ];
        triggers.relayout(fresh);
        assert!(triggers.is_suspended());
        assert!(triggers.regions().iter().all(|region| !region.enabled));
        assert!(triggers.regions()[1].is_bumping());
    }
}
