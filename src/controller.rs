use crate::config::{defaults, SceneConfig};
use crate::engine::input::{InputState, PointerEdge, PointerId, ARROW_LEFT, ARROW_RIGHT, ARROW_UP, SPACE};
use crate::engine::{Point, Size};

// joystick zone: left part of the screen, lower half
const JOYSTICK_ZONE_WIDTH: f32 = 0.4;
const JOYSTICK_ZONE_TOP: f32 = 0.5;
const JUMP_BUTTON_MARGIN: f32 = 80.0;

/// Where movement comes from, fixed at mount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    /// touch devices
    Joystick,
    /// everything else: arrow keys while held, pointer drag otherwise
    KeyboardOrDrag,
}

/// Horizontal intent for one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    Idle,
    /// keyboard (-1/0/+1) or joystick ([-1, 1]), scaled by a speed later
    Velocity(f32),
    /// pointer drag, pixels to move this step
    Offset(f32),
}

impl Intent {
    /// Normalized [-1, 1] value driving run/idle and facing
    /// - offsets are measured against `speed` (what one keyboard step moves)
    pub fn normalized(&self, speed: f32) -> f32 {
        match *self {
            Intent::Idle => 0.0,
            Intent::Velocity(value) => value.clamp(-1.0, 1.0),
            Intent::Offset(delta) if speed > 0.0 => (delta / speed).clamp(-1.0, 1.0),
            Intent::Offset(delta) => delta.signum(),
        }
    }

    /// Pixels to move this step
    pub fn displacement(&self, speed: f32) -> f32 {
        match *self {
            Intent::Idle => 0.0,
            Intent::Velocity(value) => value.clamp(-1.0, 1.0) * speed,
            Intent::Offset(delta) => delta,
        }
    }
}

/// Everything the world update needs from input for one step
#[derive(Debug, Clone, PartialEq)]
pub struct ControlFrame {
    pub intent: Intent,
    /// jump edge, true only on the step the press happened
    pub jump: bool,
    /// completed taps / clicks in screen space
    pub clicks: Vec<Point>,
    /// mouse position in screen space
    pub hover: Option<Point>,
}

impl Default for ControlFrame {
    fn default() -> Self {
        ControlFrame {
            intent: Intent::Idle,
            jump: false,
            clicks: Vec::new(),
            hover: None,
        }
    }
}

/// Virtual analog stick, created on touch devices only
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoystickState {
    pub base: Point,
    pub displacement: Point,
    pub radius: f32,
    /// finger holding the stick, `None` while released
    pub pointer: Option<PointerId>,
}

impl JoystickState {
    pub fn new(radius: f32) -> Self {
        JoystickState {
            base: Point::default(),
            displacement: Point::default(),
            radius: if radius > 0.0 { radius } else { defaults::JOYSTICK_RADIUS },
            pointer: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.pointer.is_some()
    }

    pub fn press(&mut self, pointer: PointerId, at: Point) {
        self.base = at;
        self.displacement = Point::default();
        self.pointer = Some(pointer);
    }

    /// Knob follows its own finger but never leaves the base circle
    pub fn drag(&mut self, pointer: PointerId, to: Point) {
        if self.pointer != Some(pointer) {
            return;
        }
        let dx = to.x - self.base.x;
        let dy = to.y - self.base.y;
        let length = (dx * dx + dy * dy).sqrt();
        let (dx, dy) = if length > self.radius && length > 0.0 {
            (dx / length * self.radius, dy / length * self.radius)
        } else {
            (dx, dy)
        };
        self.displacement = Point { x: dx, y: dy };
    }

    /// Only the finger that pressed the stick lets go of it
    pub fn release(&mut self, pointer: PointerId) {
        if self.pointer == Some(pointer) {
            self.displacement = Point::default();
            self.pointer = None;
        }
    }

    /// Per axis force in [-1, 1]
    pub fn force(&self) -> Point {
        Point {
            x: (self.displacement.x / self.radius).clamp(-1.0, 1.0),
            y: (self.displacement.y / self.radius).clamp(-1.0, 1.0),
        }
    }

    pub fn knob(&self) -> Point {
        Point {
            x: self.base.x + self.displacement.x,
            y: self.base.y + self.displacement.y,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    pointer: PointerId,
    start: Point,
    last: Point,
    travelled: f32,
}

/// Turns raw pointer / key state into a `ControlFrame` per step
#[derive(Debug)]
pub struct Controller {
    source: InputSource,
    viewport: Size,
    click_slop: f32,
    joystick: JoystickState,
    drag: Option<Drag>,
    jump_held: bool,
    jump_pointer: Option<PointerId>,
}

impl Controller {
    pub fn new(supports_touch: bool, viewport: Size, config: &SceneConfig) -> Self {
        Controller {
            source: if supports_touch {
                InputSource::Joystick
            } else {
                InputSource::KeyboardOrDrag
            },
            viewport,
            click_slop: config.click_slop,
            joystick: JoystickState::new(config.joystick_radius),
            drag: None,
            jump_held: false,
            jump_pointer: None,
        }
    }

    pub fn source(&self) -> InputSource {
        self.source
    }

    pub fn joystick(&self) -> Option<&JoystickState> {
        match self.source {
            InputSource::Joystick => Some(&self.joystick),
            InputSource::KeyboardOrDrag => None,
        }
    }

    pub fn resize(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    /// Screen-space center of the touch jump button
    pub fn jump_button(&self) -> Point {
        Point {
            x: self.viewport.width - JUMP_BUTTON_MARGIN,
            y: self.viewport.height - JUMP_BUTTON_MARGIN,
        }
    }

    fn in_joystick_zone(&self, at: Point) -> bool {
        at.x <= self.viewport.width * JOYSTICK_ZONE_WIDTH && at.y >= self.viewport.height * JOYSTICK_ZONE_TOP
    }

    fn on_jump_button(&self, at: Point) -> bool {
        at.distance(self.jump_button()) <= defaults::JUMP_BUTTON_RADIUS
    }

    /// Let go of everything `pointer` holds, returns its drag if it had one
    fn release(&mut self, pointer: PointerId) -> Option<Drag> {
        self.joystick.release(pointer);
        if self.jump_pointer == Some(pointer) {
            self.jump_pointer = None;
        }
        match self.drag {
            Some(drag) if drag.pointer == pointer => self.drag.take(),
            _ => None,
        }
    }

    /// Consume this step's input
    pub fn read(&mut self, input: &mut InputState) -> ControlFrame {
        let mut clicks = Vec::new();
        let mut drag_delta = 0.0;
        let mut jump_button_edge = false;

        for edge in input.take_edges() {
            match edge {
                PointerEdge::Down { id, at } => {
                    let touch = self.source == InputSource::Joystick;
                    if touch && !self.joystick.is_active() && self.in_joystick_zone(at) {
                        self.joystick.press(id, at);
                    } else if touch && self.on_jump_button(at) {
                        jump_button_edge |= self.jump_pointer.is_none();
                        self.jump_pointer = Some(id);
                    } else if self.drag.is_none() {
                        self.drag = Some(Drag {
                            pointer: id,
                            start: at,
                            last: at,
                            travelled: 0.0,
                        });
                    }
                }
                PointerEdge::Move { id, at } => {
                    if self.joystick.pointer == Some(id) {
                        self.joystick.drag(id, at);
                    } else if let Some(drag) = self.drag.as_mut().filter(|drag| drag.pointer == id) {
                        drag_delta += drag.last.x - at.x;
                        drag.last = at;
                        drag.travelled = drag.travelled.max(drag.start.distance(at));
                    }
                }
                PointerEdge::Up { id, at } => {
                    if let Some(drag) = self.release(id) {
                        let travelled = drag.travelled.max(drag.start.distance(at));
                        if travelled < self.click_slop {
                            clicks.push(drag.start);
                        }
                    }
                }
                PointerEdge::Leave { id } => {
                    // off canvas: drop whatever it held, never a click
                    self.release(id);
                }
            }
        }

        let intent = match self.source {
            InputSource::Joystick => {
                let force = self.joystick.force().x;
                if force == 0.0 {
                    Intent::Idle
                } else {
                    Intent::Velocity(force)
                }
            }
            InputSource::KeyboardOrDrag => {
                let left = input.is_pressed(ARROW_LEFT);
                let right = input.is_pressed(ARROW_RIGHT);
                if left || right {
                    // both held cancel out, keyboard still owns the step
                    Intent::Velocity(f32::from(right as u8) - f32::from(left as u8))
                } else if drag_delta != 0.0 {
                    Intent::Offset(drag_delta)
                } else {
                    Intent::Idle
                }
            }
        };

        let jump_key = input.is_pressed(SPACE) || input.is_pressed(ARROW_UP);
        let jump = (jump_key && !self.jump_held) || jump_button_edge;
        self.jump_held = jump_key;

        ControlFrame {
            intent,
            jump,
            clicks,
            hover: match self.source {
                InputSource::Joystick => None,
                InputSource::KeyboardOrDrag => input.hover(),
            },
        }
    }
}
