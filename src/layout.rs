use crate::config::{defaults, Variant};
use crate::content::{Content, Project};
use crate::engine::{Point, Rect, Size};
use crate::trigger::{Label, Thumbnail, TriggerRegion};

// native pixel sizes of the artwork
const BACKGROUND_SIZE: Size = Size { width: 12288.0, height: 1024.0 };
const PAINTING_SIZE: Size = Size { width: 1536.0, height: 1024.0 };
const ROPE_SIZE: Size = Size { width: 1536.0, height: 1024.0 };
const WINDOW_SIZE: Size = Size { width: 500.0, height: 500.0 };
const BLOCK_SIZE: Size = Size { width: 128.0, height: 128.0 };

// scale factors relative to the background scale
const PAINTING_SCALE: f32 = 0.5 * 1.2;
const ROPE_SCALE_X: f32 = 0.25 * 1.5;
const ROPE_SCALE_Y: f32 = 0.25 * 1.3;
const WINDOW_SCALE: f32 = 0.5 * 1.3;
const BLOCK_SCALE: f32 = 0.9;

// vertical placement as a share of the viewport height
const PAINTING_LINE: f32 = 0.45;
const ROPE_MARGIN: f32 = 0.02;
const GALLERY_FLOOR: f32 = 0.96;
const PLATFORM_FLOOR: f32 = 0.85;

/// Inputs a layout depends on besides the viewport
#[derive(Debug, Clone, Copy)]
pub struct LayoutSpec {
    pub variant: Variant,
    pub region_count: usize,
    /// height of the avatar, blocks float just out of head reach
    pub avatar_height: f32,
    pub jump_height: f32,
}

/// Everything positioned in world space for one viewport size
#[derive(Debug, Clone)]
pub struct Layout {
    pub viewport: Size,
    pub scale: f32,
    pub world_width: f32,
    pub spacing: f32,
    pub ground_y: f32,
    pub background: Rect,
    pub regions: Vec<TriggerRegion>,
    /// decorative, never interactive
    pub ropes: Vec<Rect>,
    pub windows: Vec<Rect>,
}

/// Region 0 is About, the last one Contact, projects fill the middle in order
/// - missing projects leave `Empty` slots, surplus projects are dropped
pub fn assign_contents(region_count: usize, projects: &[Project]) -> Vec<Content> {
    let region_count = region_count.clamp(defaults::MIN_REGION_COUNT, defaults::MAX_REGION_COUNT);
    let middle = region_count - 2;
    if projects.len() > middle {
        log!(
            "{} projects but only {} slots, the rest is not shown",
            projects.len(),
            middle
        );
    }
    let mut contents = Vec::with_capacity(region_count);
    contents.push(Content::About);
    contents.extend((0..middle).map(|i| {
        projects
            .get(i)
            .cloned()
            .map(Content::Project)
            .unwrap_or(Content::Empty)
    }));
    contents.push(Content::Contact);
    contents
}

fn sane(length: f32) -> f32 {
    if length.is_finite() {
        length.max(0.0)
    } else {
        0.0
    }
}

impl Layout {
    pub fn new(viewport: Size, spec: &LayoutSpec, projects: &[Project]) -> Layout {
        let viewport = Size {
            width: sane(viewport.width),
            height: sane(viewport.height),
        };
        let height = viewport.height;
        let scale = height / BACKGROUND_SIZE.height;
        let world_width = BACKGROUND_SIZE.width * scale;
        let count = spec
            .region_count
            .clamp(defaults::MIN_REGION_COUNT, defaults::MAX_REGION_COUNT);
        let spacing = world_width / count as f32;
        let background = Rect::new(Point::default(), BACKGROUND_SIZE.scaled(scale, scale));
        let contents = assign_contents(count, projects);

        let (ground_y, regions) = match spec.variant {
            Variant::Gallery => (
                height * GALLERY_FLOOR,
                Self::paintings(contents, scale, spacing, height),
            ),
            Variant::Platformer => {
                let ground_y = height * PLATFORM_FLOOR;
                (ground_y, Self::blocks(contents, scale, spacing, ground_y, spec))
            }
        };

        let (ropes, windows) = match spec.variant {
            Variant::Gallery => Self::decorations(count, scale, spacing, height),
            Variant::Platformer => (Vec::new(), Vec::new()),
        };

        Layout {
            viewport,
            scale,
            world_width,
            spacing,
            ground_y,
            background,
            regions,
            ropes,
            windows,
        }
    }

    fn center_x(spacing: f32, index: usize) -> f32 {
        spacing * index as f32 + spacing / 2.0
    }

    fn paintings(contents: Vec<Content>, scale: f32, spacing: f32, height: f32) -> Vec<TriggerRegion> {
        let size = PAINTING_SIZE.scaled(scale * PAINTING_SCALE, scale * PAINTING_SCALE);
        let painting_y = height * PAINTING_LINE;
        contents
            .into_iter()
            .enumerate()
            .map(|(index, content)| {
                let x = Self::center_x(spacing, index);
                let bounds = Rect::centered(Point { x, y: painting_y }, size);
                let thumbnail = match &content {
                    Content::Project(project) if !project.image.is_empty() => Some(Thumbnail {
                        key: format!("project_{}", index),
                        path: project.image.clone(),
                        anchor: Point {
                            x,
                            y: painting_y - size.height * 0.1 + 50.0,
                        },
                        max_size: size.scaled(0.7, 0.5),
                    }),
                    _ => None,
                };
                let label = Self::label(&content, Point { x, y: painting_y + size.height * 0.35 }, size.width);
                TriggerRegion::new(index, bounds, content, thumbnail, label)
            })
            .collect()
    }

    fn blocks(
        contents: Vec<Content>,
        scale: f32,
        spacing: f32,
        ground_y: f32,
        spec: &LayoutSpec,
    ) -> Vec<TriggerRegion> {
        let size = BLOCK_SIZE.scaled(scale * BLOCK_SCALE, scale * BLOCK_SCALE);
        // bottom edge sits inside the jump's reach but above a standing head
        let bottom = ground_y - spec.avatar_height - spec.jump_height * 0.6;
        contents
            .into_iter()
            .enumerate()
            .map(|(index, content)| {
                let x = Self::center_x(spacing, index);
                let bounds = Rect::new(
                    Point {
                        x: x - size.width / 2.0,
                        y: bottom - size.height,
                    },
                    size,
                );
                let label = Self::label(
                    &content,
                    Point {
                        x,
                        y: bounds.top() - size.height * 0.4,
                    },
                    spacing * 0.8,
                );
                TriggerRegion::new(index, bounds, content, None, label)
            })
            .collect()
    }

    fn label(content: &Content, center: Point, width: f32) -> Option<Label> {
        let text = content.label();
        if text.is_empty() {
            return None;
        }
        Some(Label {
            text,
            center,
            font_size: (width * 0.08).floor(),
            max_width: width * 0.8,
        })
    }

    fn decorations(count: usize, scale: f32, spacing: f32, height: f32) -> (Vec<Rect>, Vec<Rect>) {
        let rope_size = ROPE_SIZE.scaled(scale * ROPE_SCALE_X, scale * ROPE_SCALE_Y);
        let rope_y = height - rope_size.height / 2.0 - height * ROPE_MARGIN;
        let window_size = WINDOW_SIZE.scaled(scale * WINDOW_SCALE, scale * WINDOW_SCALE);
        let window_y = height * PAINTING_LINE;

        let ropes = (0..count)
            .map(|index| Rect::centered(Point { x: Self::center_x(spacing, index), y: rope_y }, rope_size))
            .collect();
        // one window between each pair of paintings
        let windows = (0..count.saturating_sub(1))
            .map(|index| {
                let x = Self::center_x(spacing, index) + spacing / 2.0;
                Rect::centered(Point { x, y: window_y }, window_size)
            })
            .collect();
        (ropes, windows)
    }
}
