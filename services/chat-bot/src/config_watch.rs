//! Config hot reload by polling the file's modification time.

use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use chatcollect_types::{ConfigError, GameConfig};
use tracing::{info, warn};

use crate::actor::Mailbox;

/// Tracks the last observed modification time of a config file.
#[derive(Debug)]
pub struct ConfigWatcher {
    path: PathBuf,
    last_seen: Option<SystemTime>,
}

impl ConfigWatcher {
    /// Start watching `path`, treating its current contents as already loaded.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_seen = modified(&path);
        Self { path, last_seen }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the file if it changed since the last poll.
    pub fn poll(&mut self) -> Option<Result<GameConfig, ConfigError>> {
        let current = modified(&self.path)?;
        if self.last_seen.is_some_and(|seen| current <= seen) {
            return None;
        }
        self.last_seen = Some(current);
        Some(GameConfig::load(&self.path))
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

/// Poll forever, pushing every valid new document to the engine. Invalid documents are
/// logged and the running config is kept.
pub async fn watch(mut watcher: ConfigWatcher, mailbox: Mailbox, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        match watcher.poll() {
            None => {}
            Some(Ok(config)) => {
                info!(path = %watcher.path().display(), "config changed; reloading");
                mailbox.reload_config(config).await;
            }
            Some(Err(err)) => {
                warn!(path = %watcher.path().display(), error = %err, "ignoring invalid config");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bump_mtime(path: &Path, secs: u64) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(secs))
            .unwrap();
    }

    #[test]
    fn test_poll_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatcollect_config.json");
        fs::write(&path, r#"{"commands": {"loot": "!bake"}}"#).unwrap();

        let mut watcher = ConfigWatcher::new(&path);
        assert!(watcher.poll().is_none());

        fs::write(&path, r#"{"commands": {"loot": "!grab"}}"#).unwrap();
        bump_mtime(&path, 5);
        let config = watcher.poll().unwrap().unwrap();
        assert_eq!(config.commands.loot, "!grab");
        assert!(watcher.poll().is_none());
    }

    #[test]
    fn test_invalid_document_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatcollect_config.json");
        let mut watcher = ConfigWatcher::new(&path);
        assert!(watcher.poll().is_none());

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(watcher.poll(), Some(Err(ConfigError::Json(_)))));
    }
}
