#[cfg(debug_assertions)]
use crate::engine::DebugDraw;
use crate::engine::{Point, Rect, Renderer, Size};
use crate::sprite::state::{Facing, IsJumping, JumpArc, PlayerContext, PlayerState};
use crate::sprite::{Idle, Jumping, Running, Sheet, SpriteState};
use std::rc::Rc;
use web_sys::HtmlImageElement;

/// ┌──────────────── State Transition Flow ──────────────────┐
/// │  From State  →  Event   →  To State                     │
/// ├─────────────────────────────────────────────────────────┤
/// │  Idle        →  Run     →  Running                      │
/// │  Running     →  Stop    →  Idle                         │
/// │  Idle        →  Jump    →  Jumping                      │
/// │  Running     →  Jump    →  Jumping                      │
/// │  -------        ------                                  │
/// │  Jumping     →  Update  →  Idle (when the arc is over)  │
/// │  any         →  Walk / Turn / Place → same state        │
/// │  Jumping     →  BumpHead → Jumping (descending)         │
/// └─────────────────────────────────────────────────────────┘
#[derive(Debug, Clone, Copy)]
pub enum Event {
    Run,
    Stop,
    Jump,
    BumpHead,
    Turn(Facing),
    Walk { dx: f32, min_x: f32, max_x: f32 },
    Place { x: f32, ground_y: f32 },
    Update { delta_ms: f32 },
}

/// Which frame sequence is playing, for callers that don't care about
/// type states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationMode {
    Idle,
    Run,
    Jump,
}

#[derive(Debug, Copy, Clone)]
enum PlayerStateMachine {
    Idle(PlayerState<Idle>),
    Running(PlayerState<Running>),
    Jumping(PlayerState<Jumping>),
}

impl From<PlayerState<Idle>> for PlayerStateMachine {
    fn from(state: PlayerState<Idle>) -> Self {
        PlayerStateMachine::Idle(state)
    }
}

impl From<PlayerState<Running>> for PlayerStateMachine {
    fn from(state: PlayerState<Running>) -> Self {
        PlayerStateMachine::Running(state)
    }
}

impl From<PlayerState<Jumping>> for PlayerStateMachine {
    fn from(state: PlayerState<Jumping>) -> Self {
        PlayerStateMachine::Jumping(state)
    }
}

impl From<IsJumping> for PlayerStateMachine {
    fn from(is_jumping: IsJumping) -> Self {
        match is_jumping {
            IsJumping::Done(idle_state) => idle_state.into(),
            IsJumping::InProgress(jumping_state) => jumping_state.into(),
        }
    }
}

/// Apply a state-preserving operation to whichever state we are in
macro_rules! each_state {
    ($machine:expr, $state:ident => $body:expr) => {
        match $machine {
            PlayerStateMachine::Idle($state) => $body.into(),
            PlayerStateMachine::Running($state) => $body.into(),
            PlayerStateMachine::Jumping($state) => $body.into(),
        }
    };
}

impl PlayerStateMachine {
    // CONSUMING self (state instance) and returning a new Self (state)
    // - the old state can't be reached afterwards
    fn transition(self, event: Event, sheet: &Sheet) -> Self {
        use PlayerStateMachine::*;
        match (self, event) {
            (Idle(state), Event::Run) => state.run(Self::get_size_for_state::<crate::sprite::Running>(sheet)).into(),
            (Running(state), Event::Stop) => {
                state.stop(Self::get_size_for_state::<crate::sprite::Idle>(sheet)).into()
            }
            (Idle(state), Event::Jump) => state.jump(Self::get_size_for_state::<crate::sprite::Jumping>(sheet)).into(),
            (Running(state), Event::Jump) => {
                state.jump(Self::get_size_for_state::<crate::sprite::Jumping>(sheet)).into()
            }
            (Jumping(state), Event::BumpHead) => state.bump_head().into(),
            (Idle(state), Event::Update { delta_ms }) => state.update(delta_ms).into(),
            (Running(state), Event::Update { delta_ms }) => state.update(delta_ms).into(),
            (Jumping(state), Event::Update { delta_ms }) => state.update(delta_ms).into(),
            (machine, Event::Turn(facing)) => each_state!(machine, state => state.turn(facing)),
            (machine, Event::Walk { dx, min_x, max_x }) => {
                each_state!(machine, state => state.walk(dx, min_x, max_x))
            }
            (machine, Event::Place { x, ground_y }) => {
                each_state!(machine, state => state.place(x, ground_y))
            }
            // everything else (Run while Running, Jump while Jumping, ...)
            // keeps the current state
            _ => self,
        }
    }

    fn get_size_for_state<S: SpriteState>(sheet: &Sheet) -> Size {
        sheet
            .frames
            .get(&S::frame_key(1))
            .map(|cell| Size {
                width: cell.frame.w,
                height: cell.frame.h,
            })
            .unwrap_or_else(|| S::metadata().default_size)
    }

    fn context(&self) -> &PlayerContext {
        use PlayerStateMachine::*;
        match self {
            Idle(state) => state.context(),
            Running(state) => state.context(),
            Jumping(state) => state.context(),
        }
    }
}

/// The avatar: state machine plus the atlas it animates from
/// - the atlas is shared, resizes rebuild the world but not the sheet
pub struct Player {
    state: PlayerStateMachine,
    sheet: Rc<Sheet>,
}

/// Player
/// - update() -> transition(Event::Update)
/// - every other verb -> transition(Event::...)
impl Player {
    pub fn new(sheet: Rc<Sheet>, x: f32, ground_y: f32, arc: JumpArc) -> Self {
        if sheet.frames.is_empty() {
            log!("Warning: empty sprite sheet, using default avatar sizes");
        }
        let bounding_box_size = PlayerStateMachine::get_size_for_state::<Idle>(&sheet);
        Player {
            state: PlayerStateMachine::Idle(PlayerState::new(x, ground_y, arc, bounding_box_size)),
            sheet,
        }
    }

    fn send(&mut self, event: Event) {
        self.state = self.state.transition(event, &self.sheet);
    }

    pub fn update(&mut self, delta_ms: f32) {
        self.send(Event::Update { delta_ms });
    }

    /// Idle <-> Running from the intent magnitude, ignored mid-air
    pub fn apply_intent(&mut self, intent: f32, deadzone: f32) {
        let moving = intent.abs() > deadzone;
        match (self.mode(), moving) {
            (AnimationMode::Idle, true) => self.send(Event::Run),
            (AnimationMode::Run, false) => self.send(Event::Stop),
            _ => {}
        }
        if let Some(facing) = Facing::from_intent(intent) {
            if facing != self.facing() {
                self.send(Event::Turn(facing));
            }
        }
    }

    pub fn jump(&mut self) {
        self.send(Event::Jump);
    }

    pub fn walk(&mut self, dx: f32, min_x: f32, max_x: f32) {
        self.send(Event::Walk { dx, min_x, max_x });
    }

    pub fn place(&mut self, x: f32, ground_y: f32) {
        self.send(Event::Place { x, ground_y });
    }

    /// Returns true when the head bump was taken (we were rising)
    pub fn bump_head(&mut self) -> bool {
        if self.is_rising() {
            self.send(Event::BumpHead);
            true
        } else {
            false
        }
    }

    pub fn is_rising(&self) -> bool {
        match self.state {
            PlayerStateMachine::Jumping(state) => state.is_rising(),
            _ => false,
        }
    }

    pub fn mode(&self) -> AnimationMode {
        match self.state {
            PlayerStateMachine::Idle(_) => AnimationMode::Idle,
            PlayerStateMachine::Running(_) => AnimationMode::Run,
            PlayerStateMachine::Jumping(_) => AnimationMode::Jump,
        }
    }

    // Law of Demeter: callers ask the player, not the context behind it
    pub fn position(&self) -> Point {
        self.state.context().position
    }

    pub fn facing(&self) -> Facing {
        self.state.context().facing
    }

    pub fn frame(&self) -> u8 {
        self.state.context().frame
    }

    pub fn ground_y(&self) -> f32 {
        self.state.context().ground_y
    }

    pub fn bounding_box(&self) -> Rect {
        self.state.context().bounding_box()
    }

    pub fn get_current_frame_name(&self) -> String {
        let frame = self.frame();
        match self.mode() {
            AnimationMode::Idle => Idle::current_frame_name(frame),
            AnimationMode::Run => Running::current_frame_name(frame),
            AnimationMode::Jump => Jumping::current_frame_name(frame),
        }
    }

    /// Draw at `bounding_box - scroll`, nothing when the image or the cell
    /// is missing
    pub fn draw(&self, renderer: &Renderer, image: Option<&HtmlImageElement>, scroll: f32) {
        let destination = self.bounding_box().translated(-scroll, 0.0);
        if let (Some(image), Some(cell)) = (image, self.sheet.frames.get(&self.get_current_frame_name())) {
            let frame = Rect::new(
                Point {
                    x: cell.frame.x,
                    y: cell.frame.y,
                },
                Size {
                    width: cell.frame.w,
                    height: cell.frame.h,
                },
            );
            renderer.draw_sprite(image, &frame, &destination, self.facing().is_flipped());
        }

        #[cfg(debug_assertions)]
        destination.draw_debug(renderer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::{Cell, SheetRect};

    const ARC: JumpArc = JumpArc {
        duration_ms: 600.0,
        height: 100.0,
    };

    fn player() -> Player {
        Player::new(Rc::new(Sheet::default()), 0.0, 400.0, ARC)
    }

    #[test]
    fn intent_above_deadzone_runs_and_below_idles() {
        let mut player = player();
        player.apply_intent(0.05, 0.1);
        assert_eq!(player.mode(), AnimationMode::Idle);
        player.apply_intent(0.5, 0.1);
        assert_eq!(player.mode(), AnimationMode::Run);
        player.apply_intent(-0.05, 0.1);
        assert_eq!(player.mode(), AnimationMode::Idle);
    }

    #[test]
    fn facing_changes_only_on_non_zero_intent() {
        let mut player = player();
        assert_eq!(player.facing(), Facing::Right);
        player.apply_intent(-1.0, 0.1);
        assert_eq!(player.facing(), Facing::Left);
        player.apply_intent(0.0, 0.1);
        assert_eq!(player.facing(), Facing::Left);
        player.apply_intent(1.0, 0.1);
        assert_eq!(player.facing(), Facing::Right);
    }

    #[test]
    fn jump_is_ignored_mid_air_and_returns_to_idle() {
        let mut player = player();
        player.jump();
        assert_eq!(player.mode(), AnimationMode::Jump);
        player.update(300.0);
        let apex = player.position().y;
        player.jump();
        assert_eq!(player.position().y, apex);
        player.apply_intent(1.0, 0.1);
        assert_eq!(player.mode(), AnimationMode::Jump);
        player.update(300.0);
        assert_eq!(player.mode(), AnimationMode::Idle);
        assert_eq!(player.position().y, 400.0);
    }

    #[test]
    fn bump_head_only_while_rising() {
        let mut player = player();
        assert!(!player.bump_head());
        player.jump();
        player.update(100.0);
        assert!(player.bump_head());
        assert!(!player.bump_head());
    }

    #[test]
    fn bounding_box_comes_from_sheet_when_present() {
        let mut sheet = Sheet::default();
        sheet.frames.insert(
            "Idle (1).png".to_string(),
            Cell {
                frame: SheetRect {
                    x: 0.0,
                    y: 0.0,
                    w: 40.0,
                    h: 80.0,
                },
            },
        );
        let player = Player::new(Rc::new(sheet), 10.0, 400.0, ARC);
        let bounds = player.bounding_box();
        assert_eq!(bounds.size, Size { width: 40.0, height: 80.0 });
        assert_eq!(bounds.top(), 320.0);
        assert_eq!(player.get_current_frame_name(), "Idle (1).png");
    }

    #[test]
    fn place_keeps_height_above_ground() {
        let mut player = player();
        player.jump();
        player.update(150.0);
        let lift = player.ground_y() - player.position().y;
        player.place(50.0, 200.0);
        assert_eq!(player.position().x, 50.0);
        assert!((200.0 - player.position().y - lift).abs() < 1e-3);
    }
}
