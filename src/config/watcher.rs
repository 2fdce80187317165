//! Hot reload of the configuration file.
//!
//! # Design Decisions
//! - Editors emit several events per save; a reload is forwarded only when
//!   the validated result differs from the last one forwarded
//! - An invalid file keeps the current configuration running

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::DispatchConfig;

/// Watches one configuration file and forwards changed configurations.
pub struct ConfigWatcher {
    reloader: Reloader,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end for reloaded configurations.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<DispatchConfig>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let reloader = Reloader {
            path: path.to_path_buf(),
            last: Mutex::new(load_config(path).ok()),
            tx,
        };
        (Self { reloader }, rx)
    }

    /// Start watching. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.reloader.path.clone();
        let reloader = self.reloader;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    reloader.reload();
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

struct Reloader {
    path: PathBuf,
    last: Mutex<Option<DispatchConfig>>,
    tx: mpsc::UnboundedSender<DispatchConfig>,
}

impl Reloader {
    /// Load the file and forward it if it changed. Returns true when forwarded.
    fn reload(&self) -> bool {
        let config = match load_config(&self.path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(path = ?self.path, error = %e, "Config reload rejected, keeping current configuration");
                return false;
            }
        };

        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if last.as_ref() == Some(&config) {
            tracing::debug!(path = ?self.path, "Config file touched without changes");
            return false;
        }

        tracing::info!(path = ?self.path, "Config file changed, reloading");
        *last = Some(config.clone());
        self.tx.send(config).is_ok()
    }
}
