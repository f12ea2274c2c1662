use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use anyhow::{Context, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use render::RenderConfig;
use tracing::{error, info, warn};

/// Watches a render config file and sends every version that parses and
/// validates. Dropping it stops the watch.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl ConfigWatcher {
    /// Watches the directory holding `path`, so editors that replace the
    /// file instead of writing it in place are still seen.
    ///
    /// # Errors
    ///
    /// Fails when the platform watcher cannot be created or the directory
    /// cannot be watched.
    pub fn start(path: &Path, updates: Sender<RenderConfig>) -> Result<Self> {
        let path = path
            .canonicalize()
            .with_context(|| format!("resolving {}", path.display()))?;
        let dir = path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        let target = path.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !touches(&event, &target) {
                    return;
                }
                match RenderConfig::from_path(&target) {
                    Ok(config) => {
                        if updates.send(config).is_err() {
                            warn!("config receiver dropped; ignoring change");
                        }
                    }
                    Err(e) => warn!("rejected config change in {}: {e}", target.display()),
                }
            }
            Err(e) => error!("error watching config: {e:?}"),
        })?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("watching {}", dir.display()))?;
        info!("watching {} for config changes", path.display());
        Ok(Self {
            _watcher: watcher,
            path,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A create or modify event naming `target`.
fn touches(event: &Event, target: &Path) -> bool {
    (event.kind.is_modify() || event.kind.is_create())
        && event.paths.iter().any(|p| p == target)
}
