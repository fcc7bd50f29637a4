use crate::engine::{self, Size};
use anyhow::Result;
use futures::future::join_all;
use std::collections::HashMap;
use std::fmt;
use web_sys::HtmlImageElement;

pub mod keys {
    pub const BACKGROUND: &str = "background";
    pub const PAINTING: &str = "painting";
    pub const ROPE: &str = "rope";
    pub const WINDOW: &str = "window";
    pub const BLOCK: &str = "block";
    pub const PLAYER: &str = "player";
    pub const JOYSTICK_BASE: &str = "joystick_base";
    pub const JOYSTICK_KNOB: &str = "joystick_knob";
}

/// A logical image the scene draws, registered once at bootstrap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetEntry {
    pub key: &'static str,
    pub path: &'static str,
}

pub const MANIFEST: [AssetEntry; 8] = [
    AssetEntry { key: keys::BACKGROUND, path: "./background.png" },
    AssetEntry { key: keys::PAINTING, path: "./painting.png" },
    AssetEntry { key: keys::ROPE, path: "./rope.png" },
    AssetEntry { key: keys::WINDOW, path: "./window.png" },
    AssetEntry { key: keys::BLOCK, path: "./block.png" },
    AssetEntry { key: keys::PLAYER, path: "./player.png" },
    AssetEntry { key: keys::JOYSTICK_BASE, path: "./joystick_base.png" },
    AssetEntry { key: keys::JOYSTICK_KNOB, path: "./joystick_knob.png" },
];

/// The only failure the scene knows about, never fatal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLoadFailure {
    pub key: String,
    pub path: String,
}

impl fmt::Display for AssetLoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to load asset '{}' from {}", self.key, self.path)
    }
}

impl std::error::Error for AssetLoadFailure {}

/// Anything with a decoded pixel size
pub trait Sized2d {
    fn natural_size(&self) -> Size;
}

impl Sized2d for HtmlImageElement {
    fn natural_size(&self) -> Size {
        Size {
            width: self.natural_width() as f32,
            height: self.natural_height() as f32,
        }
    }
}

/// Loaded images by key
/// - generic so scene logic can be tested without a DOM
/// - a key that failed stays absent, drawing simply skips it
#[derive(Debug)]
pub struct AssetStore<I> {
    loaded: HashMap<String, I>,
    failures: Vec<AssetLoadFailure>,
}

impl<I> Default for AssetStore<I> {
    fn default() -> Self {
        AssetStore {
            loaded: HashMap::new(),
            failures: Vec::new(),
        }
    }
}

impl<I> AssetStore<I> {
    pub fn get(&self, key: &str) -> Option<&I> {
        self.loaded.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.loaded.contains_key(key)
    }

    pub fn failures(&self) -> &[AssetLoadFailure] {
        &self.failures
    }

    /// Record one load outcome, logging failures and carrying on
    pub fn record(&mut self, key: &str, path: &str, outcome: Result<I>) {
        match outcome {
            Ok(image) => {
                self.loaded.insert(key.to_string(), image);
            }
            Err(err) => {
                let failure = AssetLoadFailure {
                    key: key.to_string(),
                    path: path.to_string(),
                };
                error!("{} : {:#}", failure, err);
                self.failures.push(failure);
            }
        }
    }
}

/// Load an image, with the key in the error context
pub async fn load(key: &str, path: &str) -> Result<HtmlImageElement> {
    use anyhow::Context;
    engine::load_image(path)
        .await
        .with_context(|| format!("loading '{}'", key))
}

/// Request every entry at once and wait for all of them
/// - total time is the slowest asset, not the sum
pub async fn load_all(entries: &[(String, String)]) -> AssetStore<HtmlImageElement> {
    let outcomes = join_all(entries.iter().map(|(key, path)| load(key, path))).await;
    let mut store = AssetStore::default();
    for ((key, path), outcome) in entries.iter().zip(outcomes) {
        store.record(key, path, outcome);
    }
    log!(
        "Assets loaded : {} ok, {} failed",
        store.loaded.len(),
        store.failures.len()
    );
    store
}

pub fn manifest_entries() -> Vec<(String, String)> {
    MANIFEST
        .iter()
        .map(|entry| (entry.key.to_string(), entry.path.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn failures_are_kept_and_scene_continues() {
        let mut store: AssetStore<Size> = AssetStore::default();
        store.record(keys::BACKGROUND, "./background.png", Ok(Size { width: 1.0, height: 1.0 }));
        store.record(keys::ROPE, "./rope.png", Err(anyhow!("404")));

        assert!(store.contains(keys::BACKGROUND));
        assert!(store.get(keys::ROPE).is_none());
        assert_eq!(
            store.failures(),
            &[AssetLoadFailure {
                key: keys::ROPE.to_string(),
                path: "./rope.png".to_string()
            }]
        );
    }

    #[test]
    fn manifest_keys_are_unique() {
        let mut keys: Vec<_> = MANIFEST.iter().map(|entry| entry.key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), MANIFEST.len());
    }

    #[test]
    fn failure_message_names_key_and_path() {
        let failure = AssetLoadFailure {
            key: "window".to_string(),
            path: "./window.png".to_string(),
        };
        assert_eq!(failure.to_string(), "failed to load asset 'window' from ./window.png");
    }
}
