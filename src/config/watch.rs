//! Configuration file reload
//!
//! Watches the config file's directory so editors that replace the file
//! instead of writing in place are picked up too.

use crate::config::Config;
use crate::error::{AnalyzerError, Result};
use log::{info, warn};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};

/// Keeps the underlying watcher alive; dropping it stops reloads
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl ConfigWatcher {
    /// Watch `path` and call `on_change` with every valid reloaded config.
    pub fn spawn<F>(path: &Path, on_change: F) -> Result<Self>
    where
        F: Fn(Config) + Send + 'static,
    {
        let target = path.to_path_buf();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if is_relevant(&event, &target) => match reload(&target) {
                Ok(Some(config)) => {
                    info!("Reloaded configuration from {:?}", target);
                    on_change(config);
                }
                Ok(None) => {}
                Err(e) => warn!("Ignoring configuration reload from {:?}: {}", target, e),
            },
            Ok(_) => {}
            Err(e) => warn!("Configuration watch error: {}", e),
        })
        .map_err(|e| AnalyzerError::Config(e.to_string()))?;

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| AnalyzerError::Config(e.to_string()))?;

        Ok(Self {
            _watcher: watcher,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Whether `event` touches the watched file's contents
fn is_relevant(event: &Event, target: &Path) -> bool {
    let touches_content = matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_));
    touches_content
        && event
            .paths
            .iter()
            .any(|p| p.file_name().is_some() && p.file_name() == target.file_name())
}

/// Load and validate `path`; `None` when the file vanished.
fn reload(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }
    let config = Config::load(path)?;
    config.validate()?;
    Ok(Some(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::tests::temp_dir;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    fn event(kind: EventKind, path: &Path) -> Event {
        Event::new(kind).add_path(path.to_path_buf())
    }

    #[test]
    fn only_content_changes_to_target_are_relevant() {
        let target = Path::new("/etc/fps-analyzer.toml");
        assert!(is_relevant(&event(EventKind::Modify(ModifyKind::Any), target), target));
        assert!(is_relevant(&event(EventKind::Create(CreateKind::File), target), target));
        assert!(!is_relevant(&event(EventKind::Remove(RemoveKind::File), target), target));
        assert!(!is_relevant(
            &event(EventKind::Modify(ModifyKind::Any), Path::new("/etc/other.toml")),
            target
        ));
    }

    #[test]
    fn reload_validates() {
        let dir = temp_dir("reload");
        let path = dir.path().join("fps-analyzer.toml");
        assert!(reload(&path).unwrap().is_none());

        std::fs::write(&path, "[analyzer]\nsensitivity_percent = 2.5\n").unwrap();
        let cfg = reload(&path).unwrap().unwrap();
        assert_eq!(cfg.analyzer.sensitivity_percent, 2.5);

        std::fs::write(&path, "[analyzer]\nsensitivity_percent = 250.0\n").unwrap();
        assert!(reload(&path).is_err());
    }
}
