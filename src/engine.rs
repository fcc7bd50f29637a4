use crate::browser::{self, LoopClosure};
use gloo_events::EventListener;
use anyhow::{anyhow, Error, Result};
// wasm is single threaded, so Rc RefCell / Cell instead of Arc Mutex
use async_trait::async_trait;
use futures::channel::mpsc::UnboundedReceiver;
use futures::channel::oneshot::channel;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::{
    // unchecked_ref (unsafe) cast from Javascript type to Rust type
    // - we create the closures ourselves and know their exact signature
    JsCast,
    JsValue,
};
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use self::input::{InputEvent, InputState};

#[async_trait(?Send)]
pub trait Game {
    /// Consumes the loading state, returns the playable one
    async fn initialize(self) -> Result<Box<dyn Game>>
    where
        Self: Sized;
    /// One fixed step, `delta_ms` is always `FRAME_SIZE`
    fn update(&mut self, input: &mut InputState, delta_ms: f32);
    fn draw(&self, renderer: &Renderer);
}

// length of a frame in milliseconds
pub const FRAME_SIZE: f32 = 1.0 / 60.0 * 1000.0;
// after a hidden tab comes back we drop the backlog instead of replaying it
const MAX_STEPS_PER_FRAME: u32 = 10;

pub struct GameLoop {
    last_frame: f64,
    accumulated_delta: f32,
}

type SharedLoopClosure = Rc<RefCell<Option<LoopClosure>>>;

impl GameLoop {
    /// Drive `game` from requestAnimationFrame until `running` is cleared
    /// - `events` are drained into the input state once per animation frame
    pub async fn start(
        game: impl Game + 'static,
        mut events: UnboundedReceiver<InputEvent>,
        running: Rc<Cell<bool>>,
    ) -> Result<()> {
        let mut game = game.initialize().await?;
        if !running.get() {
            // torn down while assets were still loading
            return Ok(());
        }
        let mut game_loop = GameLoop {
            last_frame: browser::now()?,
            accumulated_delta: 0.0,
        };
        let renderer = Renderer {
            context: browser::context()?,
        };
        let mut input = InputState::default();

        let f: SharedLoopClosure = Rc::new(RefCell::new(None));
        let g = f.clone();
        *g.borrow_mut() = Some(browser::create_raf_closure(move |perf: f64| {
            if !running.get() {
                // dropping the closure ends the loop, it is never requested again
                f.borrow_mut().take();
                return;
            }
            input::process_input(&mut input, &mut events);

            game_loop.accumulated_delta += (perf - game_loop.last_frame) as f32;
            let mut steps = 0;
            while game_loop.accumulated_delta > FRAME_SIZE {
                if steps < MAX_STEPS_PER_FRAME {
                    game.update(&mut input, FRAME_SIZE);
                    steps += 1;
                }
                game_loop.accumulated_delta -= FRAME_SIZE;
            }
            game_loop.last_frame = perf;
            game.draw(&renderer);

            if let Some(closure) = f.borrow().as_ref() {
                if let Err(err) = browser::request_animation_frame(closure) {
                    error!("GameLoop: {:#}", err);
                }
            }
        }));

        browser::request_animation_frame(
            g.borrow()
                .as_ref()
                .ok_or_else(|| anyhow!("GameLoop: Loop is None"))?,
        )?;

        Ok(())
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn distance(&self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn scaled(&self, x: f32, y: f32) -> Size {
        Size {
            width: self.width * x,
            height: self.height * y,
        }
    }
}

/// Axis aligned box, `position` is the top left corner
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub position: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(position: Point, size: Size) -> Self {
        Rect { position, size }
    }

    pub fn centered(center: Point, size: Size) -> Self {
        Rect {
            position: Point {
                x: center.x - size.width / 2.0,
                y: center.y - size.height / 2.0,
            },
            size,
        }
    }

    pub fn left(&self) -> f32 {
        self.position.x
    }

    pub fn right(&self) -> f32 {
        self.position.x + self.size.width
    }

    pub fn top(&self) -> f32 {
        self.position.y
    }

    pub fn bottom(&self) -> f32 {
        self.position.y + self.size.height
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.position.x + self.size.width / 2.0,
            y: self.position.y + self.size.height / 2.0,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Rect {
        Rect {
            position: Point {
                x: self.position.x + dx,
                y: self.position.y + dy,
            },
            size: self.size,
        }
    }

    /// Same center, size multiplied by `factor`
    pub fn scaled_about_center(&self, factor: f32) -> Rect {
        Rect::centered(self.center(), self.size.scaled(factor, factor))
    }
}

pub struct Renderer {
    context: CanvasRenderingContext2d,
}

impl Renderer {
    pub fn clear(&self, rect: &Rect) {
        self.context.clear_rect(
            rect.position.x.into(),
            rect.position.y.into(),
            rect.size.width.into(),
            rect.size.height.into(),
        );
    }

    pub fn draw_image(&self, image: &HtmlImageElement, destination: &Rect) {
        if let Err(err) = self
            .context
            .draw_image_with_html_image_element_and_dw_and_dh(
                image,
                destination.position.x.into(),
                destination.position.y.into(),
                destination.size.width.into(),
                destination.size.height.into(),
            )
        {
            error!("draw_image failed : {:#?}", err);
        }
    }

    /// Draw a sheet cell, mirrored around its vertical axis when `flipped`
    pub fn draw_sprite(
        &self,
        image: &HtmlImageElement,
        frame: &Rect,
        destination: &Rect,
        flipped: bool,
    ) {
        self.context.save();
        let _ = self
            .context
            .translate(destination.position.x.into(), destination.position.y.into());
        if flipped {
            let _ = self.context.translate(destination.size.width.into(), 0.0);
            let _ = self.context.scale(-1.0, 1.0);
        }
        if let Err(err) = self
            .context
            .draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                image,
                frame.position.x.into(),
                frame.position.y.into(),
                frame.size.width.into(),
                frame.size.height.into(),
                0.0,
                0.0,
                destination.size.width.into(),
                destination.size.height.into(),
            )
        {
            error!("draw_sprite failed : {:#?}", err);
        }
        self.context.restore();
    }

    /// Pixel-font label with a hard drop shadow, centered on `center`
    pub fn draw_label(&self, text: &str, center: Point, font_size: f32, max_width: f32) {
        self.context.save();
        self.context
            .set_font(&format!("{}px \"Press Start 2P\", cursive", font_size.floor()));
        self.context.set_text_align("center");
        self.context.set_text_baseline("middle");
        self.context.set_line_width(4.0);
        self.context.set_stroke_style_str("#000000");
        let lines = wrap_words(text, font_size, max_width);
        let rows = label_rows(center.y, lines.len(), font_size * LABEL_LINE_HEIGHT);
        for (line, y) in lines.iter().zip(rows) {
            self.context.set_fill_style_str("#000000");
            let _ = self.context.fill_text(line, (center.x + 3.0).into(), (y + 3.0).into());
            let _ = self.context.stroke_text(line, center.x.into(), y.into());
            self.context.set_fill_style_str("#ffffff");
            let _ = self.context.fill_text(line, center.x.into(), y.into());
        }
        self.context.restore();
    }

    /// Screen-fixed banner at the top of the viewport
    pub fn draw_banner(&self, text: &str, center: Point) {
        self.context.save();
        self.context.set_font("16px \"Press Start 2P\", cursive");
        self.context.set_text_align("center");
        self.context.set_text_baseline("middle");
        let width = self
            .context
            .measure_text(text)
            .map(|metrics| metrics.width() as f32)
            .unwrap_or(text.len() as f32 * 16.0);
        self.context.set_fill_style_str("rgba(0, 0, 0, 0.7)");
        self.context.fill_rect(
            (center.x - width / 2.0 - 20.0).into(),
            (center.y - 18.0).into(),
            (width + 40.0).into(),
            36.0,
        );
        self.context.set_fill_style_str("#ffffff");
        let _ = self.context.fill_text(text, center.x.into(), center.y.into());
        self.context.restore();
    }

    pub fn fill_circle(&self, center: Point, radius: f32, color: &str) {
        self.context.begin_path();
        self.context.set_fill_style_str(color);
        if self
            .context
            .arc(
                center.x.into(),
                center.y.into(),
                radius.max(0.0).into(),
                0.0,
                std::f64::consts::TAU,
            )
            .is_ok()
        {
            self.context.fill();
        }
    }

    #[cfg(debug_assertions)]
    pub fn draw_rect(&self, rect: &Rect) {
        self.context.set_stroke_style_str("#FF0000");
        self.context.begin_path();
        self.context.rect(
            rect.position.x.into(),
            rect.position.y.into(),
            rect.size.width.into(),
            rect.size.height.into(),
        );
        self.context.stroke();
    }
}

const LABEL_LINE_HEIGHT: f32 = 1.4;

/// Baselines for `rows` wrapped lines, the block as a whole centered on `center_y`
pub fn label_rows(center_y: f32, rows: usize, line_height: f32) -> Vec<f32> {
    let first = center_y - rows.saturating_sub(1) as f32 * line_height / 2.0;
    (0..rows).map(|row| first + row as f32 * line_height).collect()
}

/// Greedy word wrap using a fixed glyph advance (the pixel font is monospace)
pub fn wrap_words(text: &str, font_size: f32, max_width: f32) -> Vec<String> {
    let advance = font_size.max(1.0);
    let max_chars = ((max_width / advance).floor() as usize).max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.len()
        } else {
            current.len() + 1 + word.len()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Outline boxes, debug builds only
#[cfg(debug_assertions)]
pub trait DebugDraw {
    fn draw_debug(&self, renderer: &Renderer);
}

#[cfg(debug_assertions)]
impl DebugDraw for Rect {
    fn draw_debug(&self, renderer: &Renderer) {
        renderer.draw_rect(self);
    }
}

/// Asynchronously load an image from a given source path
/// # Arguments
/// * `source` - string slice to path/url
/// # Returns
/// * `Ok(HtmlImageElement)` - on load success
/// * `Err` - on load fail
pub async fn load_image(source: &str) -> Result<HtmlImageElement> {
    let image = browser::new_image()?;
    let (tx, rx) = channel::<Result<(), Error>>();
    let success_tx = Rc::new(RefCell::new(Some(tx)));
    let error_tx = success_tx.clone();

    let success_callback = browser::closure_once(move || {
        if let Some(tx) = success_tx.borrow_mut().take() {
            let _ = tx.send(Ok(()));
        }
    });

    let error_callback = browser::closure_once(move |err: JsValue| {
        if let Some(tx) = error_tx.borrow_mut().take() {
            let _ = tx.send(Err(anyhow!(
                "[engine.rs::load_image] Error loading image: {:#?}",
                err
            )));
        }
    });

    image.set_onload(Some(success_callback.as_ref().unchecked_ref()));
    image.set_onerror(Some(error_callback.as_ref().unchecked_ref()));
    image.set_src(source);

    // keep callback alive until image is loaded or errors
    success_callback.forget();
    error_callback.forget();

    // ?? - Result<Result<(), Error>, oneshot::Canceled>
    // - first ? yields the channel result
    // - second ? yields the image load result
    rx.await??;

    Ok(image)
}

pub mod input {
    use super::*;
    use futures::channel::mpsc::{unbounded, UnboundedSender};
    use std::collections::HashSet;
    use gloo_events::EventListenerOptions;
    use web_sys::{Event, EventTarget, KeyboardEvent, PointerEvent};

    pub const ARROW_LEFT: &str = "ArrowLeft";
    pub const ARROW_RIGHT: &str = "ArrowRight";
    pub const ARROW_UP: &str = "ArrowUp";
    pub const SPACE: &str = "Space";

    /// `PointerEvent.pointerId`, one per finger / mouse
    pub type PointerId = i32;

    /// Raw DOM input, already reduced to what the scene needs
    #[derive(Debug, Clone, PartialEq)]
    pub enum InputEvent {
        KeyDown(String),
        KeyUp(String),
        PointerDown { id: PointerId, at: Point, touch: bool },
        PointerMove { id: PointerId, at: Point, touch: bool },
        PointerUp { id: PointerId, at: Point },
        /// left the canvas or was cancelled by the browser
        PointerLeave { id: PointerId },
    }

    /// Pointer transitions in the order they happened since the last step
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum PointerEdge {
        Down { id: PointerId, at: Point },
        Move { id: PointerId, at: Point },
        Up { id: PointerId, at: Point },
        /// the pointer is gone without a release on the canvas
        Leave { id: PointerId },
    }

    #[derive(Debug, Default)]
    pub struct InputState {
        pressed: HashSet<String>,
        hover: Option<Point>,
        edges: Vec<PointerEdge>,
    }

    impl InputState {
        pub fn is_pressed(&self, code: &str) -> bool {
            self.pressed.contains(code)
        }

        /// Mouse position for hover effects, `None` for touch or off canvas
        pub fn hover(&self) -> Option<Point> {
            self.hover
        }

        pub fn take_edges(&mut self) -> Vec<PointerEdge> {
            std::mem::take(&mut self.edges)
        }

        pub fn apply(&mut self, event: InputEvent) {
            match event {
                InputEvent::KeyDown(code) => {
                    self.pressed.insert(code);
                }
                InputEvent::KeyUp(code) => {
                    self.pressed.remove(&code);
                }
                InputEvent::PointerDown { id, at, touch } => {
                    self.hover = if touch { None } else { Some(at) };
                    self.edges.push(PointerEdge::Down { id, at });
                }
                InputEvent::PointerMove { id, at, touch } => {
                    self.hover = if touch { None } else { Some(at) };
                    self.edges.push(PointerEdge::Move { id, at });
                }
                InputEvent::PointerUp { id, at } => {
                    self.edges.push(PointerEdge::Up { id, at });
                }
                InputEvent::PointerLeave { id } => {
                    self.hover = None;
                    self.edges.push(PointerEdge::Leave { id });
                }
            }
        }
    }

    pub fn process_input(state: &mut InputState, receiver: &mut UnboundedReceiver<InputEvent>) {
        loop {
            match receiver.try_next() {
                Ok(Some(event)) => state.apply(event),
                // channel closed or empty
                Ok(None) | Err(_) => break,
            }
        }
    }

    fn pointer_at(event: &PointerEvent) -> Point {
        Point {
            x: event.offset_x() as f32,
            y: event.offset_y() as f32,
        }
    }

    fn is_scene_key(code: &str) -> bool {
        matches!(code, ARROW_LEFT | ARROW_RIGHT | ARROW_UP | SPACE)
    }

    fn send(sender: &UnboundedSender<InputEvent>, event: InputEvent) {
        if let Err(err) = sender.unbounded_send(event) {
            error!("Could not queue input event : {:#?}", err);
        }
    }

    /// Register keyboard listeners on the window and pointer listeners on
    /// the canvas, all feeding one channel
    /// - the returned listeners unregister themselves when dropped
    pub fn prepare_input() -> Result<(UnboundedReceiver<InputEvent>, Vec<EventListener>)> {
        let (sender, receiver) = unbounded::<InputEvent>();
        let window: EventTarget = browser::window()?.into();
        let canvas: EventTarget = browser::canvas()?.into();
        let mut listeners = Vec::new();

        // arrow keys and space would scroll the page otherwise
        let tx = sender.clone();
        listeners.push(EventListener::new_with_options(
            &window,
            "keydown",
            EventListenerOptions::enable_prevent_default(),
            move |event: &Event| {
                if let Some(event) = event.dyn_ref::<KeyboardEvent>() {
                    let code = event.code();
                    if is_scene_key(&code) {
                        event.prevent_default();
                        send(&tx, InputEvent::KeyDown(code));
                    }
                }
            },
        ));

        let tx = sender.clone();
        listeners.push(EventListener::new(&window, "keyup", move |event: &Event| {
            if let Some(event) = event.dyn_ref::<KeyboardEvent>() {
                let code = event.code();
                if is_scene_key(&code) {
                    send(&tx, InputEvent::KeyUp(code));
                }
            }
        }));

        let tx = sender.clone();
        listeners.push(EventListener::new(&canvas, "pointerdown", move |event: &Event| {
            if let Some(event) = event.dyn_ref::<PointerEvent>() {
                let touch = event.pointer_type() == "touch";
                send(
                    &tx,
                    InputEvent::PointerDown {
                        id: event.pointer_id(),
                        at: pointer_at(event),
                        touch,
                    },
                );
            }
        }));

        let tx = sender.clone();
        listeners.push(EventListener::new(&canvas, "pointermove", move |event: &Event| {
            if let Some(event) = event.dyn_ref::<PointerEvent>() {
                let touch = event.pointer_type() == "touch";
                send(
                    &tx,
                    InputEvent::PointerMove {
                        id: event.pointer_id(),
                        at: pointer_at(event),
                        touch,
                    },
                );
            }
        }));

        let tx = sender.clone();
        listeners.push(EventListener::new(&canvas, "pointerup", move |event: &Event| {
            if let Some(event) = event.dyn_ref::<PointerEvent>() {
                send(
                    &tx,
                    InputEvent::PointerUp {
                        id: event.pointer_id(),
                        at: pointer_at(event),
                    },
                );
            }
        }));

        for kind in ["pointerleave", "pointercancel"] {
            let tx = sender.clone();
            listeners.push(EventListener::new(&canvas, kind, move |event: &Event| {
                if let Some(event) = event.dyn_ref::<PointerEvent>() {
                    send(&tx, InputEvent::PointerLeave { id: event.pointer_id() });
                }
            }));
        }

        Ok((receiver, listeners))
    }

}
