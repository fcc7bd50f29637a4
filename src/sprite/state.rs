/// All code relating to individual states is behind this module and keeps
/// invalid states unrepresentable: a transition is only reachable through
/// the methods below
/// - PUBLIC  : PlayerState and PlayerContext
/// - PRIVATE : context mutators
use crate::engine::{Point, Rect, Size};
use crate::sprite::{self, SpriteState};
use std::f32::consts::PI;

pub enum IsJumping {
    Done(PlayerState<sprite::Idle>),
    InProgress(PlayerState<sprite::Jumping>),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Facing {
    /// sprite drawn as authored
    Right,
    /// sprite mirrored
    Left,
}

impl Facing {
    /// Sign of the intent, `None` keeps whatever we faced last frame
    pub fn from_intent(intent: f32) -> Option<Facing> {
        if intent > 0.0 {
            Some(Facing::Right)
        } else if intent < 0.0 {
            Some(Facing::Left)
        } else {
            None
        }
    }

    pub fn is_flipped(&self) -> bool {
        *self == Facing::Left
    }
}

/// Time driven jump, the height is a function of elapsed time only
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct JumpArc {
    pub duration_ms: f32,
    pub height: f32,
}

impl JumpArc {
    pub fn progress(&self, elapsed_ms: f32) -> f32 {
        (elapsed_ms / self.duration_ms).clamp(0.0, 1.0)
    }

    /// How far above the ground the feet are after `elapsed_ms`
    pub fn offset(&self, elapsed_ms: f32) -> f32 {
        (self.progress(elapsed_ms) * PI).sin() * self.height
    }
}

#[derive(Debug, Copy, Clone)]
/// Shared data for :
/// - physics : feet position + ground line + jump clock
/// - display : animation clock + frame + facing
pub struct PlayerContext {
    pub frame: u8,
    pub animation_ms: f32,
    /// x is the left edge, y the feet
    pub position: Point,
    pub ground_y: f32,
    pub facing: Facing,
    pub jump_elapsed_ms: f32,
    pub arc: JumpArc,
    pub bounding_box_size: Size,
}

#[derive(Debug, Copy, Clone)]
pub struct PlayerState<S> {
    context: PlayerContext,
    // type level tag only, never read
    _state: S,
}

/// generic methods shared between all states
impl<S> PlayerState<S> {
    pub fn context(&self) -> &PlayerContext {
        &self.context
    }

    pub fn turn(mut self, facing: Facing) -> Self {
        self.context.facing = facing;
        self
    }

    /// Horizontal move, the left edge stays within `[min_x, max_x]`
    pub fn walk(mut self, dx: f32, min_x: f32, max_x: f32) -> Self {
        self.context = self.context.walk(dx, min_x, max_x);
        self
    }

    /// Layout changed: new feet position and ground line
    pub fn place(mut self, x: f32, ground_y: f32) -> Self {
        let lift = self.context.ground_y - self.context.position.y;
        self.context.ground_y = ground_y;
        self.context.position = Point {
            x,
            y: ground_y - lift,
        };
        self
    }
}

impl PlayerState<sprite::Idle> {
    pub fn new(x: f32, ground_y: f32, arc: JumpArc, bounding_box_size: Size) -> Self {
        PlayerState {
            context: PlayerContext {
                frame: 0,
                animation_ms: 0.0,
                position: Point { x, y: ground_y },
                ground_y,
                facing: Facing::Right,
                jump_elapsed_ms: 0.0,
                arc,
                bounding_box_size,
            },
            _state: sprite::Idle,
        }
    }

    pub fn update(mut self, delta_ms: f32) -> Self {
        self.context = self.context.animate::<sprite::Idle>(delta_ms).grounded();
        self
    }

    pub fn run(self, size: Size) -> PlayerState<sprite::Running> {
        PlayerState {
            context: self
                .context
                .on_state_transition()
                .with_bounding_box_size(size),
            _state: sprite::Running,
        }
    }

    pub fn jump(self, size: Size) -> PlayerState<sprite::Jumping> {
        PlayerState {
            context: self
                .context
                .on_state_transition()
                .start_jump()
                .with_bounding_box_size(size),
            _state: sprite::Jumping,
        }
    }
}

impl PlayerState<sprite::Running> {
    pub fn update(mut self, delta_ms: f32) -> Self {
        self.context = self.context.animate::<sprite::Running>(delta_ms).grounded();
        self
    }

    pub fn stop(self, size: Size) -> PlayerState<sprite::Idle> {
        PlayerState {
            context: self
                .context
                .on_state_transition()
                .with_bounding_box_size(size),
            _state: sprite::Idle,
        }
    }

    pub fn jump(self, size: Size) -> PlayerState<sprite::Jumping> {
        PlayerState {
            context: self
                .context
                .on_state_transition()
                .start_jump()
                .with_bounding_box_size(size),
            _state: sprite::Jumping,
        }
    }
}

impl PlayerState<sprite::Jumping> {
    /// Returns an enum because a jump can:
    /// - End      (Done)
    /// - Continue (InProgress)
    pub fn update(mut self, delta_ms: f32) -> IsJumping {
        self.context = self.context.animate::<sprite::Jumping>(delta_ms).advance_jump(delta_ms);
        if self.context.jump_elapsed_ms >= self.context.arc.duration_ms {
            IsJumping::Done(self.land())
        } else {
            IsJumping::InProgress(self)
        }
    }

    /// Head hit something: skip to the mirrored point of the descent
    /// - same height, now falling, lands on schedule
    pub fn bump_head(mut self) -> Self {
        let half = self.context.arc.duration_ms / 2.0;
        if self.context.jump_elapsed_ms < half {
            self.context.jump_elapsed_ms = self.context.arc.duration_ms - self.context.jump_elapsed_ms;
        }
        self
    }

    pub fn is_rising(&self) -> bool {
        self.context.jump_elapsed_ms < self.context.arc.duration_ms / 2.0
    }

    pub fn land(self) -> PlayerState<sprite::Idle> {
        PlayerState {
            context: self.context.on_state_transition().grounded(),
            _state: sprite::Idle,
        }
    }
}

impl PlayerContext {
    pub fn bounding_box(&self) -> Rect {
        Rect::new(
            Point {
                x: self.position.x,
                y: self.position.y - self.bounding_box_size.height,
            },
            self.bounding_box_size,
        )
    }

    /// ::animate per step
    /// - advance the animation clock -> frame to render
    fn animate<S: SpriteState>(mut self, delta_ms: f32) -> Self {
        self.animation_ms += delta_ms.max(0.0);
        self.frame = S::frame_at(self.animation_ms);
        self
    }

    fn advance_jump(mut self, delta_ms: f32) -> Self {
        self.jump_elapsed_ms = (self.jump_elapsed_ms + delta_ms.max(0.0)).min(self.arc.duration_ms);
        self.position.y = self.ground_y - self.arc.offset(self.jump_elapsed_ms);
        self
    }

    fn grounded(mut self) -> Self {
        self.position.y = self.ground_y;
        self.jump_elapsed_ms = 0.0;
        self
    }

    fn walk(mut self, dx: f32, min_x: f32, max_x: f32) -> Self {
        let max_x = max_x.max(min_x);
        if dx.is_finite() {
            self.position.x = (self.position.x + dx).clamp(min_x, max_x);
        }
        self
    }

    /// ::on_state_transition -> we must :
    /// - WARN: reset to frame 0 on transition
    ///     - each state has its own frame count
    ///     - else we risk reading a frame the next state doesn't have
    fn on_state_transition(mut self) -> Self {
        self.frame = 0;
        self.animation_ms = 0.0;
        self
    }

    fn start_jump(mut self) -> Self {
        self.jump_elapsed_ms = 0.0;
        self
    }

    /// update bounding box size field
    fn with_bounding_box_size(mut self, size: Size) -> Self {
        self.bounding_box_size = size;
        self
    }
}
