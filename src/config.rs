use crate::content::Project;
use serde::Deserialize;

/// Tuning constants, all lengths in css pixels and all durations in ms
pub mod defaults {
    pub const REGION_COUNT: usize = 8;
    pub const MIN_REGION_COUNT: usize = 2;
    pub const MAX_REGION_COUNT: usize = 32;
    pub const SCROLL_SPEED: f32 = 10.0;
    pub const RUN_SPEED: f32 = 6.0;
    pub const DEADZONE: f32 = 0.1;
    pub const JUMP_DURATION_MS: f32 = 600.0;
    pub const JUMP_HEIGHT: f32 = 140.0;
    pub const JOYSTICK_RADIUS: f32 = 60.0;
    pub const JUMP_BUTTON_RADIUS: f32 = 44.0;
    pub const CLICK_SLOP: f32 = 6.0;
    pub const SHEET_PATH: &str = "player.json";
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Variant {
    /// camera scrolls, paintings are clicked
    #[default]
    Gallery,
    /// avatar walks, blocks are bumped from below
    Platformer,
}

/// Scene settings handed over by the page shell
/// - every field is optional on the JS side
#[derive(Debug, Deserialize, Clone)]
#[serde(default, rename_all = "camelCase")]
pub struct SceneConfig {
    pub variant: Variant,
    pub region_count: usize,
    pub scroll_speed: f32,
    pub run_speed: f32,
    pub deadzone: f32,
    pub jump_duration_ms: f32,
    pub jump_height: f32,
    pub joystick_radius: f32,
    pub click_slop: f32,
    pub sheet_path: String,
    /// `None` falls back to the built-in catalog
    pub projects: Option<Vec<Project>>,
    /// `None` probes the browser
    pub supports_touch: Option<bool>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            variant: Variant::default(),
            region_count: defaults::REGION_COUNT,
            scroll_speed: defaults::SCROLL_SPEED,
            run_speed: defaults::RUN_SPEED,
            deadzone: defaults::DEADZONE,
            jump_duration_ms: defaults::JUMP_DURATION_MS,
            jump_height: defaults::JUMP_HEIGHT,
            joystick_radius: defaults::JOYSTICK_RADIUS,
            click_slop: defaults::CLICK_SLOP,
            sheet_path: defaults::SHEET_PATH.to_string(),
            projects: None,
            supports_touch: None,
        }
    }
}

impl SceneConfig {
    /// Pull every value back into a range the update step can't trip over
    /// - About + Contact need at least two regions
    /// - non finite / non positive durations and speeds get their defaults
    pub fn sanitized(mut self) -> Self {
        fn positive(value: f32, fallback: f32) -> f32 {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                fallback
            }
        }

        self.region_count = self
            .region_count
            .clamp(defaults::MIN_REGION_COUNT, defaults::MAX_REGION_COUNT);
        self.scroll_speed = positive(self.scroll_speed, defaults::SCROLL_SPEED);
        self.run_speed = positive(self.run_speed, defaults::RUN_SPEED);
        self.jump_duration_ms = positive(self.jump_duration_ms, defaults::JUMP_DURATION_MS);
        self.jump_height = positive(self.jump_height, defaults::JUMP_HEIGHT);
        self.joystick_radius = positive(self.joystick_radius, defaults::JOYSTICK_RADIUS);
        self.click_slop = positive(self.click_slop, defaults::CLICK_SLOP);
        self.deadzone = if self.deadzone.is_finite() {
            self.deadzone.clamp(0.0, 0.9)
        } else {
            defaults::DEADZONE
        };
        self
    }

    pub fn projects(&self) -> Vec<Project> {
        self.projects
            .clone()
            .unwrap_or_else(|| crate::content::CATALOG.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitized_restores_broken_values() {
        let config = SceneConfig {
            region_count: 0,
            scroll_speed: -4.0,
            jump_duration_ms: f32::NAN,
            deadzone: 3.0,
            ..SceneConfig::default()
        }
        .sanitized();

        assert_eq!(config.region_count, 2);
        assert_eq!(config.scroll_speed, defaults::SCROLL_SPEED);
        assert_eq!(config.jump_duration_ms, defaults::JUMP_DURATION_MS);
        assert_eq!(config.deadzone, 0.9);
    }

    #[test]
    fn region_count_is_capped() {
        let config = SceneConfig {
            region_count: usize::MAX,
            ..SceneConfig::default()
        }
        .sanitized();
        assert_eq!(config.region_count, defaults::MAX_REGION_COUNT);

        let config = SceneConfig {
            region_count: 1_000_000,
            ..SceneConfig::default()
        }
        .sanitized();
        assert_eq!(config.region_count, defaults::MAX_REGION_COUNT);
    }

    #[test]
    fn defaults_survive_sanitizing() {
        let config = SceneConfig::default().sanitized();
        assert_eq!(config.region_count, 8);
        assert_eq!(config.jump_duration_ms, 600.0);
        assert_eq!(config.deadzone, 0.1);
        assert_eq!(config.projects().len(), 6);
    }
}
