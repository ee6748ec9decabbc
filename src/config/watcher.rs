//! Config file watcher.
//!
//! Detects edits made to the config file by other processes. Detection only: the
//! handler runs on the notify thread and must do nothing but flag the change.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config as NotifyConfig, Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Config path has no file name: {}", .0.display())]
    NoFileName(PathBuf),

    #[error("Failed to create file watcher: {0}")]
    Backend(#[source] notify::Error),

    #[error("Failed to watch {}: {source}", path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Keeps the underlying watcher alive for as long as the store wants notifications
pub struct ConfigWatcher {
    _watcher: Box<dyn Watcher + Send>,
    path: PathBuf,
}

impl std::fmt::Debug for ConfigWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigWatcher")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn make_event_handler<F>(
    filename: OsString,
    on_change: F,
) -> impl Fn(std::result::Result<Event, notify::Error>) + Send + 'static
where
    F: Fn() + Send + Sync + 'static,
{
    move |result| {
        let event = match result {
            Ok(event) => event,
            Err(e) => {
                debug!("Config watcher error: {}", e);
                return;
            }
        };

        // Create covers editors that save by renaming a new file over the old one
        if !matches!(
            event.kind,
            EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
        ) {
            return;
        }

        let touches_config = event
            .paths
            .iter()
            .any(|p| p.file_name().map(|f| f == filename).unwrap_or(false));

        if touches_config {
            on_change();
        }
    }
}

impl ConfigWatcher {
    /// Watch `config_path`. The file does not need to exist yet: the parent directory
    /// is watched and events are filtered by file name.
    pub fn new<F>(config_path: &Path, on_change: F) -> Result<Self, WatchError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let filename = config_path
            .file_name()
            .ok_or_else(|| WatchError::NoFileName(config_path.to_path_buf()))?
            .to_os_string();

        let parent_dir = match config_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        // Both backends need their own handler, so share the callback
        let on_change = Arc::new(on_change);

        let native = {
            let cb = Arc::clone(&on_change);
            notify::recommended_watcher(make_event_handler(filename.clone(), move || (*cb)()))
        };

        let mut watcher: Box<dyn Watcher + Send> = match native {
            Ok(w) => {
                debug!("Config watcher: using native backend");
                Box::new(w)
            }
            Err(e) => {
                warn!("Config watcher: native backend unavailable ({}); polling instead", e);
                let cb = Arc::clone(&on_change);
                let poll = PollWatcher::new(
                    make_event_handler(filename, move || (*cb)()),
                    NotifyConfig::default().with_poll_interval(Duration::from_millis(500)),
                )
                .map_err(WatchError::Backend)?;
                Box::new(poll)
            }
        };

        watcher
            .watch(&parent_dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Watch {
                path: parent_dir.clone(),
                source,
            })?;

        info!("Watching {} for external changes", config_path.display());
        Ok(Self {
            _watcher: watcher,
            path: config_path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;
    use tempfile::TempDir;

    #[test]
    fn test_external_write_is_detected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kestrel.conf");
        std::fs::write(&path, "[kestrel]\n").unwrap();

        let seen = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&seen);
        let _watcher =
            ConfigWatcher::new(&path, move || flag.store(true, Ordering::SeqCst)).unwrap();

        std::fs::write(&path, "[kestrel]\nfont = \"Monospace 9\"\n").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while !seen.load(Ordering::SeqCst) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(seen.load(Ordering::SeqCst));
    }

    #[test]
    fn test_path_without_file_name_is_rejected() {
        assert!(matches!(
            ConfigWatcher::new(Path::new("/"), || {}),
            Err(WatchError::NoFileName(_))
        ));
    }
}
