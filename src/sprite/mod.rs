// ┌──────────────────────────────────────────────────────────────────────────┐
// │                      Directory Structure                                 │
// ├───────────────────┬──────────────────────────────────────────────────────┤
// │ src/sprite/       │ Avatar animation + movement                          │
// │ ├── mod.rs        │ SpriteState trait, atlas (Sheet) format, markers     │
// │ ├── state.rs      │ PlayerState<S> type states + shared PlayerContext    │
// │ └── player.rs     │ PlayerStateMachine enum + Player (sheet + image)     │
// └───────────────────┴──────────────────────────────────────────────────────┘
pub mod player;
pub mod state;

use crate::engine::Size;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// TexturePacker "hash" atlas, e.g. `"Run (3).png": { "frame": {..} }`
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Sheet {
    pub frames: HashMap<String, Cell>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Cell {
    pub frame: SheetRect,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct SheetRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// Playback settings of one animation
#[derive(Debug, Clone, Copy)]
pub struct SpriteMetadata {
    pub frame_count: u8,
    pub frame_ms: f32,
    /// one-shot animations hold their last frame
    pub looping: bool,
    /// used when the atlas has no cell for the state
    pub default_size: Size,
}

/// Static description of an animation state, frames are 1-based in the atlas
pub trait SpriteState {
    fn name() -> &'static str;
    fn metadata() -> SpriteMetadata;

    fn total_frames() -> u8 {
        Self::metadata().frame_count
    }

    fn frame_key(index: u8) -> String {
        format!("{} ({}).png", Self::name(), index)
    }

    /// Frame index (0-based) after `elapsed_ms` in this state
    fn frame_at(elapsed_ms: f32) -> u8 {
        let metadata = Self::metadata();
        let count = u32::from(metadata.frame_count.max(1));
        let ticks = (elapsed_ms.max(0.0) / metadata.frame_ms) as u32;
        let frame = if metadata.looping {
            ticks % count
        } else {
            ticks.min(count - 1)
        };
        frame as u8
    }

    fn current_frame_name(frame: u8) -> String {
        Self::frame_key(frame.saturating_add(1))
    }
}

const AVATAR_SIZE: Size = Size {
    width: 96.0,
    height: 128.0,
};

#[derive(Debug, Copy, Clone)]
pub struct Idle;

#[derive(Debug, Copy, Clone)]
pub struct Running;

#[derive(Debug, Copy, Clone)]
pub struct Jumping;

impl SpriteState for Idle {
    fn name() -> &'static str {
        "Idle"
    }

    fn metadata() -> SpriteMetadata {
        SpriteMetadata {
            frame_count: 10,
            frame_ms: 100.0,
            looping: true,
            default_size: AVATAR_SIZE,
        }
    }
}

impl SpriteState for Running {
    fn name() -> &'static str {
        "Run"
    }

    fn metadata() -> SpriteMetadata {
        SpriteMetadata {
            frame_count: 8,
            frame_ms: 75.0,
            looping: true,
            default_size: AVATAR_SIZE,
        }
    }
}

impl SpriteState for Jumping {
    fn name() -> &'static str {
        "Jump"
    }

    fn metadata() -> SpriteMetadata {
        // 12 frames spread over the default 600ms arc
        SpriteMetadata {
            frame_count: 12,
            frame_ms: 50.0,
            looping: false,
            default_size: AVATAR_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_names_are_one_based() {
        assert_eq!(Running::current_frame_name(0), "Run (1).png");
        assert_eq!(Idle::frame_key(10), "Idle (10).png");
    }

    #[test]
    fn looping_states_wrap() {
        assert_eq!(Running::frame_at(0.0), 0);
        assert_eq!(Running::frame_at(75.0 * 8.0), 0);
        assert_eq!(Running::frame_at(75.0 * 9.0 + 1.0), 1);
    }

    #[test]
    fn one_shot_jump_holds_last_frame() {
        assert_eq!(Jumping::frame_at(10_000.0), 11);
        assert_eq!(Jumping::frame_at(-5.0), 0);
    }
}
