//! Supervising frame loop around the renderer, plus the pieces the
//! `marcher` binary wires together: config hot reload and PNG snapshots.
#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::cast_possible_truncation)]

pub mod harness;
pub mod snapshot;
pub mod watcher;

use anyhow::Result;
use scene::SceneId;

pub use harness::{Checkpoint, Harness, HarnessConfig, RunSummary};
pub use watcher::ConfigWatcher;

/// Parses a scene by name, or by index wrapping onto the scene list.
///
/// # Errors
///
/// Fails for a name that is neither a number nor a known scene.
pub fn parse_scene(s: &str) -> Result<SceneId> {
    if let Ok(index) = s.trim().parse::<i64>() {
        return Ok(SceneId::from_index_wrapping(index));
    }
    Ok(s.trim().parse::<SceneId>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_indices_wrap() {
        assert_eq!(parse_scene("0").unwrap(), SceneId::Morph);
        assert_eq!(parse_scene("-1").unwrap(), SceneId::Chrome);
        assert_eq!(parse_scene("13").unwrap(), SceneId::Pillars);
        assert_eq!(parse_scene(" textured ").unwrap(), SceneId::Textured);
        assert!(parse_scene("teapot").is_err());
    }
}
