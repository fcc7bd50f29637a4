use crate::assets::{self, keys, AssetStore, Sized2d};
use crate::browser;
use crate::camera::Camera;
use crate::config::{defaults, SceneConfig, Variant};
use crate::content::Project;
use crate::controller::{ControlFrame, Controller, InputSource, Intent, JoystickState};
use crate::engine::input::InputState;
#[cfg(debug_assertions)]
use crate::engine::DebugDraw;
use crate::engine::{Game, Point, Rect, Renderer, Size};
use crate::events::{EventBus, GalleryEvent};
use crate::layout::{Layout, LayoutSpec};
use crate::sprite::player::Player;
use crate::sprite::state::JumpArc;
use crate::sprite::Sheet;
use crate::trigger::{self, hits_from_below, Triggers};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::channel::mpsc::UnboundedReceiver;
use futures::join;
use std::cell::RefCell;
use std::rc::Rc;
use web_sys::HtmlImageElement;

/// ┌───────────────────── Scene Architecture Overview ───────────────────────┐
/// │                                                                         │
/// │    ┌─────────────┐          ┌─────────────┐          ┌─────────────┐    │
/// │    │  engine.rs  │  input   │controller.rs│  frame   │   game.rs   │    │
/// │    │  GameLoop   ├─────────►│ Controller  ├─────────►│ World::step │    │
/// │    │  raf + dt   │          │  read()     │          │             │    │
/// │    └─────────────┘          └─────────────┘          └──────┬──────┘    │
/// │                                                             │           │
/// │                                   ┌─────────────┐      ┌────┴─────┐     │
/// │                                   │  events.rs  │ event│ Triggers │     │
/// │                                   │  EventBus   │◄─────┤ activate │     │
/// │                                   └──────┬──────┘      └──────────┘     │
/// │                                          ▼                              │
/// │                                     page shell (modal)                  │
/// │                                          │ enable_triggers()            │
/// │                                          ▼                              │
/// │                                   ShellCommand channel → Scene          │
/// │                                                                         │
/// ├──────────────────────── Call Sequence ──────────────────────────────────┤
/// │  1. Scene drains shell commands (re-enable, resize)                     │
/// │  2. Controller turns raw input into a ControlFrame                      │
/// │  3. World::step moves camera / player, runs the state machine,          │
/// │     tests clicks and head bumps, advances hover / bump animations       │
/// │  4. at most one GalleryEvent goes out on the bus                        │
/// └─────────────────────────────────────────────────────────────────────────┘
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShellCommand {
    EnableTriggers,
    Resize(Size),
}

/// Pure scene state: no DOM, no images
pub struct World {
    config: SceneConfig,
    projects: Vec<Project>,
    layout: Layout,
    triggers: Triggers,
    camera: Camera,
    player: Player,
}

impl World {
    pub fn new(config: SceneConfig, projects: Vec<Project>, viewport: Size, sheet: Rc<Sheet>) -> World {
        let config = config.sanitized();
        let arc = JumpArc {
            duration_ms: config.jump_duration_ms,
            height: config.jump_height,
        };
        let mut player = Player::new(sheet, 0.0, 0.0, arc);
        let mut layout = Layout::new(viewport, &Self::layout_spec(&config, &player), &projects);
        let triggers = Triggers::new(std::mem::take(&mut layout.regions));
        let camera = Camera::new(layout.world_width, layout.viewport.width);

        let start_x = match config.variant {
            Variant::Gallery => Self::centered_x(&camera, &player),
            Variant::Platformer => layout.spacing * 0.1,
        };
        player.place(start_x, layout.ground_y);

        World {
            config,
            projects,
            layout,
            triggers,
            camera,
            player,
        }
    }

    fn layout_spec(config: &SceneConfig, player: &Player) -> LayoutSpec {
        LayoutSpec {
            variant: config.variant,
            region_count: config.region_count,
            avatar_height: player.bounding_box().size.height,
            jump_height: config.jump_height,
        }
    }

    /// Gallery avatar walks in place at the middle of the screen
    fn centered_x(camera: &Camera, player: &Player) -> f32 {
        camera.scroll() + camera.viewport_width() / 2.0 - player.bounding_box().size.width / 2.0
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn triggers(&self) -> &Triggers {
        &self.triggers
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    fn speed(&self) -> f32 {
        match self.config.variant {
            Variant::Gallery => self.config.scroll_speed,
            Variant::Platformer => self.config.run_speed,
        }
    }

    fn to_world(&self, screen: Point) -> Point {
        Point {
            x: screen.x + self.camera.scroll(),
            y: screen.y,
        }
    }

    /// The shell closed its modal
    pub fn enable_triggers(&mut self) {
        self.triggers.enable_all();
    }

    /// One fixed step: `(world, input, dt) -> (world', event)`
    pub fn step(mut self, frame: &ControlFrame, delta_ms: f32) -> (World, Option<GalleryEvent>) {
        let suspended = self.triggers.is_suspended();
        // a modal is open: nothing moves until the shell re-enables us
        let (intent, jump) = if suspended {
            (Intent::Idle, false)
        } else {
            (frame.intent, frame.jump)
        };
        let speed = self.speed();
        let displacement = intent.displacement(speed);

        self.player.apply_intent(intent.normalized(speed), self.config.deadzone);
        if jump {
            self.player.jump();
        }
        // after the state change, cells of different states differ in size
        match self.config.variant {
            Variant::Gallery => {
                self.camera.scroll_by(displacement);
                let x = Self::centered_x(&self.camera, &self.player);
                self.player.place(x, self.layout.ground_y);
            }
            Variant::Platformer => {
                let max_x = self.layout.world_width - self.player.bounding_box().size.width;
                self.player.walk(displacement, 0.0, max_x.max(0.0));
            }
        }

        let previous = self.player.bounding_box();
        self.player.update(delta_ms);
        let current = self.player.bounding_box();
        if self.config.variant == Variant::Platformer {
            self.camera.center_on(current.center().x);
        }

        let mut event = None;
        if self.config.variant == Variant::Platformer {
            let bumped = self
                .triggers
                .regions()
                .iter()
                .find(|region| hits_from_below(&previous, &current, &region.bounds))
                .map(|region| region.index);
            if let Some(index) = bumped {
                // every block is solid, empty or disabled ones just don't fire
                self.player.bump_head();
                event = self.triggers.activate(index);
            }
        }

        for click in &frame.clicks {
            if event.is_some() || self.triggers.is_suspended() {
                break;
            }
            if let Some(index) = self.triggers.hit_test(self.to_world(*click)) {
                event = self.triggers.activate(index);
            }
        }

        let hover = if self.triggers.is_suspended() {
            None
        } else {
            frame.hover.map(|point| self.to_world(point))
        };
        self.triggers.advance(delta_ms, hover);

        (self, event)
    }

    /// Relayout for a new viewport, keeping where we were
    pub fn resized(mut self, viewport: Size) -> World {
        let old_world_width = self.layout.world_width;
        let mut layout = Layout::new(viewport, &Self::layout_spec(&self.config, &self.player), &self.projects);
        self.triggers.relayout(std::mem::take(&mut layout.regions));
        self.camera = self.camera.resized(layout.world_width, layout.viewport.width);

        let x = match self.config.variant {
            Variant::Gallery => Self::centered_x(&self.camera, &self.player),
            Variant::Platformer => {
                let fraction = if old_world_width > 0.0 {
                    self.player.position().x / old_world_width
                } else {
                    0.0
                };
                let max_x = (layout.world_width - self.player.bounding_box().size.width).max(0.0);
                (fraction * layout.world_width).clamp(0.0, max_x)
            }
        };
        self.player.place(x, layout.ground_y);
        self.layout = layout;
        self
    }
}

/// Everything needed before assets are in
pub struct Mount {
    pub config: SceneConfig,
    pub bus: EventBus,
    pub commands: UnboundedReceiver<ShellCommand>,
    pub supports_touch: bool,
    pub viewport: Size,
}

pub enum Gallery {
    /// Assets are being requested, transitions to `Loaded` once
    Loading(Mount),

    /// Playable scene
    Loaded(Box<Scene>),
}

impl Gallery {
    pub fn new(mount: Mount) -> Self {
        Gallery::Loading(mount)
    }

    async fn load_sprite_sheet(path: &str) -> Result<Sheet> {
        browser::fetch_json::<Sheet>(path)
            .await
            .with_context(|| format!("Failed to load sprite sheet from : {}", path))
    }
}

#[async_trait(?Send)]
impl Game for Gallery {
    async fn initialize(self) -> Result<Box<dyn Game>> {
        match self {
            // sheet and every manifest image load side by side, total time
            // is the slowest of them
            Gallery::Loading(mount) => {
                let entries = assets::manifest_entries();
                let (sheet_result, assets) = join!(
                    Self::load_sprite_sheet(&mount.config.sheet_path),
                    assets::load_all(&entries),
                );
                let sheet = sheet_result.unwrap_or_else(|err| {
                    error!("{:#}", err);
                    Sheet::default()
                });
                let projects = mount.config.projects();
                let world = World::new(mount.config.clone(), projects, mount.viewport, Rc::new(sheet));
                let controller = Controller::new(mount.supports_touch, mount.viewport, world.config());
                let thumbnails = Rc::new(RefCell::new(AssetStore::default()));
                Scene::request_thumbnails(&world, &thumbnails);
                log!("Gallery ready : {} regions", world.triggers().regions().len());

                Ok(Box::new(Gallery::Loaded(Box::new(Scene {
                    world: Some(world),
                    controller,
                    assets,
                    thumbnails,
                    bus: mount.bus,
                    commands: mount.commands,
                }))))
            }
            Gallery::Loaded(_) => Err(anyhow!("Gallery is already initialized")),
        }
    }

    fn update(&mut self, input: &mut InputState, delta_ms: f32) {
        if let Gallery::Loaded(scene) = self {
            scene.update(input, delta_ms);
        }
    }

    fn draw(&self, renderer: &Renderer) {
        if let Gallery::Loaded(scene) = self {
            scene.draw(renderer);
        }
    }
}

pub struct Scene {
    // Option so the consuming `World::step` can be called through &mut
    world: Option<World>,
    controller: Controller,
    assets: AssetStore<HtmlImageElement>,
    thumbnails: Rc<RefCell<AssetStore<HtmlImageElement>>>,
    bus: EventBus,
    commands: UnboundedReceiver<ShellCommand>,
}

impl Scene {
    /// Each thumbnail shows up as soon as its own image resolves
    fn request_thumbnails(world: &World, store: &Rc<RefCell<AssetStore<HtmlImageElement>>>) {
        for thumbnail in world.triggers().regions().iter().filter_map(|region| region.thumbnail.clone()) {
            let store = store.clone();
            browser::spawn_local(async move {
                let outcome = assets::load(&thumbnail.key, &thumbnail.path).await;
                store.borrow_mut().record(&thumbnail.key, &thumbnail.path, outcome);
            });
        }
    }

    fn drain_commands(&mut self) {
        while let Ok(Some(command)) = self.commands.try_next() {
            match command {
                ShellCommand::EnableTriggers => {
                    if let Some(world) = self.world.as_mut() {
                        world.enable_triggers();
                    }
                }
                ShellCommand::Resize(viewport) => {
                    self.controller.resize(viewport);
                    self.world = self.world.take().map(|world| world.resized(viewport));
                }
            }
        }
    }

    fn update(&mut self, input: &mut InputState, delta_ms: f32) {
        self.drain_commands();
        let frame = self.controller.read(input);
        if let Some(world) = self.world.take() {
            let (world, event) = world.step(&frame, delta_ms);
            self.world = Some(world);
            if let Some(event) = event {
                self.bus.publish(&event);
            }
        }
    }

    fn banner(&self, variant: Variant) -> &'static str {
        match (variant, self.controller.source()) {
            (Variant::Gallery, InputSource::KeyboardOrDrag) => {
                "Click on paintings to view projects | Use Arrow Keys or Drag to Navigate"
            }
            (Variant::Gallery, InputSource::Joystick) => "Tap paintings to view projects | Use the joystick to move",
            (Variant::Platformer, InputSource::KeyboardOrDrag) => {
                "Jump into the blocks | Arrow Keys to walk, Space to jump"
            }
            (Variant::Platformer, InputSource::Joystick) => "Jump into the blocks | Joystick to walk, button to jump",
        }
    }

    fn draw(&self, renderer: &Renderer) {
        let Some(world) = self.world.as_ref() else {
            return;
        };
        let layout = world.layout();
        let variant = world.config().variant;
        let viewport = layout.viewport;
        let scroll = world.camera().scroll();
        let visible = |rect: &Rect| rect.right() >= scroll && rect.left() <= scroll + viewport.width;
        let draw_at = |key: &str, rect: &Rect| {
            if let Some(image) = self.assets.get(key) {
                renderer.draw_image(image, &rect.translated(-scroll, 0.0));
            }
        };

        // Draw order matters : background -> foreground
        renderer.clear(&Rect::new(Point::default(), viewport));
        draw_at(keys::BACKGROUND, &layout.background);
        for window in layout.windows.iter().filter(|rect| visible(rect)) {
            draw_at(keys::WINDOW, window);
        }

        let thumbnails = self.thumbnails.borrow();
        for region in world.triggers().regions() {
            let (lift, hover_scale) = region.display_offset();
            let bump = region.bump_amount();
            let rect = match variant {
                Variant::Gallery => region.display_bounds().scaled_about_center(1.0 + trigger::BUMP_SCALE * bump),
                Variant::Platformer => region.display_bounds().translated(0.0, -trigger::BUMP_LIFT * bump),
            };
            if !visible(&rect) {
                continue;
            }
            match variant {
                Variant::Gallery => draw_at(keys::PAINTING, &rect),
                Variant::Platformer => draw_at(keys::BLOCK, &rect),
            }

            // thumbnails pop in whenever their image resolves
            if let Some(thumbnail) = &region.thumbnail {
                if let Some(image) = thumbnails.get(&thumbnail.key) {
                    if let Some(size) = thumbnail.fitted_size(image.natural_size()) {
                        let anchor = Point {
                            x: thumbnail.anchor.x - scroll,
                            y: thumbnail.anchor.y + lift,
                        };
                        renderer.draw_image(image, &Rect::centered(anchor, size.scaled(hover_scale, hover_scale)));
                    }
                }
            }

            if let Some(label) = &region.label {
                let center = Point {
                    x: label.center.x - scroll,
                    y: label.center.y + lift,
                };
                renderer.draw_label(&label.text, center, label.font_size, label.max_width);
            }

            #[cfg(debug_assertions)]
            rect.translated(-scroll, 0.0).draw_debug(renderer);
        }

        for rope in layout.ropes.iter().filter(|rect| visible(rect)) {
            draw_at(keys::ROPE, rope);
        }

        world.player().draw(renderer, self.assets.get(keys::PLAYER), scroll);

        renderer.draw_banner(self.banner(variant), Point { x: viewport.width / 2.0, y: 30.0 });

        if let Some(joystick) = self.controller.joystick() {
            self.draw_touch_controls(renderer, joystick);
        }
    }

    fn draw_touch_controls(&self, renderer: &Renderer, joystick: &JoystickState) {
        let radius = joystick.radius;
        if joystick.is_active() {
            let base = Rect::centered(joystick.base, Size { width: radius * 2.0, height: radius * 2.0 });
            let knob = Rect::centered(joystick.knob(), Size { width: radius, height: radius });
            match (self.assets.get(keys::JOYSTICK_BASE), self.assets.get(keys::JOYSTICK_KNOB)) {
                (Some(base_image), Some(knob_image)) => {
                    renderer.draw_image(base_image, &base);
                    renderer.draw_image(knob_image, &knob);
                }
                _ => {
                    renderer.fill_circle(joystick.base, radius, "rgba(255, 255, 255, 0.25)");
                    renderer.fill_circle(joystick.knob(), radius / 2.0, "rgba(255, 255, 255, 0.6)");
                }
            }
        }
        renderer.fill_circle(
            self.controller.jump_button(),
            defaults::JUMP_BUTTON_RADIUS,
            "rgba(255, 255, 255, 0.35)",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Content, CATALOG};
    use crate::engine::FRAME_SIZE;
    use crate::events::EventKind;
    use crate::trigger::TriggerRegion;
    use approx::assert_abs_diff_eq;

    const VIEWPORT: Size = Size {
        width: 1280.0,
        height: 1024.0,
    };

    fn world(variant: Variant) -> World {
        let config = SceneConfig {
            variant,
            ..SceneConfig::default()
        };
        World::new(config, CATALOG.clone(), VIEWPORT, Rc::new(Sheet::default()))
    }

    fn run(world: World, frame: &ControlFrame, steps: usize) -> (World, Vec<GalleryEvent>) {
        let mut world = world;
        let mut events = Vec::new();
        for _ in 0..steps {
            let (next, event) = world.step(frame, FRAME_SIZE);
            world = next;
            events.extend(event);
        }
        (world, events)
    }

    fn click_on(world: &World, region: &TriggerRegion) -> ControlFrame {
        let center = region.bounds.center();
        ControlFrame {
            clicks: vec![Point {
                x: center.x - world.camera().scroll(),
                y: center.y,
            }],
            ..ControlFrame::default()
        }
    }

    #[test]
    fn keyboard_scrolls_camera_within_bounds() {
        let right = ControlFrame {
            intent: Intent::Velocity(1.0),
            ..ControlFrame::default()
        };
        let (world, _) = run(world(Variant::Gallery), &right, 10);
        assert_abs_diff_eq!(world.camera().scroll(), 100.0, epsilon = 1e-3);

        let (world, _) = run(world, &right, 10_000);
        assert_abs_diff_eq!(world.camera().scroll(), world.camera().max_scroll());

        let left = ControlFrame {
            intent: Intent::Velocity(-1.0),
            ..ControlFrame::default()
        };
        let (world, _) = run(world, &left, 10_000);
        assert_eq!(world.camera().scroll(), 0.0);
    }

    #[test]
    fn gallery_avatar_stays_centered_and_faces_motion() {
        let left = ControlFrame {
            intent: Intent::Offset(-5.0),
            ..ControlFrame::default()
        };
        let right = ControlFrame {
            intent: Intent::Offset(50.0),
            ..ControlFrame::default()
        };
        let (world, _) = run(world(Variant::Gallery), &right, 3);
        let player_center = world.player().bounding_box().center().x;
        assert_abs_diff_eq!(
            player_center - world.camera().scroll(),
            VIEWPORT.width / 2.0,
            epsilon = 1e-3
        );
        assert!(!world.player().facing().is_flipped());
        let (world, _) = run(world, &left, 1);
        assert!(world.player().facing().is_flipped());
    }

    #[test]
    fn click_opens_exactly_one_modal() {
        let world = world(Variant::Gallery);
        let about = world.triggers().regions()[0].clone();
        let frame = click_on(&world, &about);
        let (world, events) = run(world, &frame, 1);
        assert_eq!(events, vec![GalleryEvent::ShowAbout]);

        // second click while the modal is open does nothing
        let (mut world, events) = run(world, &frame, 5);
        assert!(events.is_empty());

        world.enable_triggers();
        let (_, events) = run(world, &frame, 1);
        assert_eq!(events, vec![GalleryEvent::ShowAbout]);
    }

    #[test]
    fn project_region_carries_its_payload() {
        let right = ControlFrame {
            intent: Intent::Velocity(1.0),
            ..ControlFrame::default()
        };
        let (world, _) = run(world(Variant::Gallery), &right, 60);
        let region = world.triggers().regions()[2].clone();
        let frame = click_on(&world, &region);
        let (_, events) = run(world, &frame, 1);
        assert_eq!(events, vec![GalleryEvent::ShowProject(CATALOG[1].clone())]);
        assert_eq!(events[0].kind(), EventKind::ShowProject);
    }

    #[test]
    fn input_is_frozen_while_a_modal_is_open() {
        let world = world(Variant::Gallery);
        let about = world.triggers().regions()[0].clone();
        let click = click_on(&world, &about);
        let (world, _) = run(world, &click, 1);
        let scroll = world.camera().scroll();
        let right = ControlFrame {
            intent: Intent::Velocity(1.0),
            jump: true,
            ..ControlFrame::default()
        };
        let (world, _) = run(world, &right, 30);
        assert_eq!(world.camera().scroll(), scroll);
        assert_eq!(world.player().mode(), crate::sprite::player::AnimationMode::Idle);
    }

    #[test]
    fn gallery_jump_lands_on_time() {
        let jump = ControlFrame {
            jump: true,
            ..ControlFrame::default()
        };
        let ground = world(Variant::Gallery).layout().ground_y;
        let (world, _) = run(world(Variant::Gallery), &jump, 1);
        assert!(world.player().position().y < ground);
        // 600ms at 60 steps per second is 36 steps
        let (world, _) = run(world, &ControlFrame::default(), 33);
        assert!(world.player().position().y < ground);
        let (world, _) = run(world, &ControlFrame::default(), 3);
        assert_eq!(world.player().position().y, ground);
        assert_eq!(world.player().mode(), crate::sprite::player::AnimationMode::Idle);
    }

    /// Walk under block `index` and jump into it
    fn bump_block(world: World, index: usize) -> (World, Vec<GalleryEvent>) {
        let target = world.triggers().regions()[index].bounds.center().x;
        let mut world = world;
        let mut events = Vec::new();
        for _ in 0..10_000 {
            let center = world.player().bounding_box().center().x;
            if (center - target).abs() < world.config().run_speed {
                break;
            }
            let frame = ControlFrame {
                intent: Intent::Velocity((target - center).signum()),
                ..ControlFrame::default()
            };
            let (next, event) = world.step(&frame, FRAME_SIZE);
            world = next;
            events.extend(event);
        }
        assert!(events.is_empty(), "walking under blocks never triggers them");
        let jump = ControlFrame {
            jump: true,
            ..ControlFrame::default()
        };
        let (world, mut jumped) = run(world, &jump, 1);
        let (world, rest) = run(world, &ControlFrame::default(), 60);
        jumped.extend(rest);
        (world, jumped)
    }

    #[test]
    fn platformer_block_fires_when_hit_from_below() {
        let (world, events) = bump_block(world(Variant::Platformer), 1);
        assert_eq!(events, vec![GalleryEvent::ShowProject(CATALOG[0].clone())]);
        assert_eq!(world.player().position().y, world.layout().ground_y);
        assert!(world.triggers().is_suspended());
    }

    #[test]
    fn platformer_camera_follows_player() {
        let right = ControlFrame {
            intent: Intent::Velocity(1.0),
            ..ControlFrame::default()
        };
        let (world, _) = run(world(Variant::Platformer), &right, 300);
        let center = world.player().bounding_box().center().x;
        assert_abs_diff_eq!(
            center - world.camera().scroll(),
            VIEWPORT.width / 2.0,
            epsilon = 1e-2
        );
    }

    #[test]
    fn platformer_jump_in_empty_space_fires_nothing() {
        let world = world(Variant::Platformer);
        let jump = ControlFrame {
            jump: true,
            ..ControlFrame::default()
        };
        // starting spot is between the left edge and the first block
        let (_, events) = run(world, &jump, 60);
        assert!(events.is_empty());
    }

    #[test]
    fn resize_keeps_scroll_fraction_and_modal_state() {
        let right = ControlFrame {
            intent: Intent::Velocity(1.0),
            ..ControlFrame::default()
        };
        let (world, _) = run(world(Variant::Gallery), &right, 100);
        let fraction = world.camera().fraction();
        let contact = world.triggers().regions()[7].clone();
        let click = click_on(&world, &contact);
        let (world, _) = run(world, &click, 1);

        let world = world.resized(Size { width: 800.0, height: 512.0 });
        assert_abs_diff_eq!(world.camera().fraction(), fraction, epsilon = 1e-4);
        assert!(world.triggers().is_suspended());
        assert_abs_diff_eq!(world.layout().world_width, 6144.0);
        assert_eq!(world.triggers().regions().len(), 8);
        assert!(matches!(world.triggers().regions()[7].content, Content::Contact));
    }
}
