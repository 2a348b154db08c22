//! Build context containing configuration and state for a build.

use crate::config::FlowConfig;
use crate::mode::Mode;
use crate::server::{LiveReload, ReloadKind};
use std::path::{Path, PathBuf};

/// Build context containing configuration, mode and paths.
///
/// The context is created once per process and shared by reference with
/// every task. It is never mutated after construction.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The loaded configuration
    config: FlowConfig,
    /// Project root directory (where assetflow.toml is located)
    project_root: PathBuf,
    /// Active mode
    mode: Mode,
    /// Live reload channel, present when the dev server runs
    live_reload: Option<LiveReload>,
}

impl BuildContext {
    /// Create a new build context.
    pub fn new(config: FlowConfig, project_root: PathBuf, mode: Mode) -> Self {
        Self { config, project_root, mode, live_reload: None }
    }

    /// Get the configuration.
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Active mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Get the source directory (resolved to absolute path).
    pub fn src_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.src)
    }

    /// Get the output directory (resolved to absolute path).
    pub fn dist_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.dist)
    }

    /// Path inside the source directory.
    pub fn src_path(&self, relative: &str) -> PathBuf {
        self.src_dir().join(relative)
    }

    /// Path inside the output directory.
    pub fn dist_path(&self, relative: &str) -> PathBuf {
        self.dist_dir().join(relative)
    }

    /// Attach a live reload channel.
    pub fn with_live_reload(mut self, live_reload: LiveReload) -> Self {
        self.live_reload = Some(live_reload);
        self
    }

    /// Live reload channel, if the dev server is part of this run.
    pub fn live_reload(&self) -> Option<&LiveReload> {
        self.live_reload.as_ref()
    }

    /// Push a reload notification if a dev server is listening.
    pub fn notify_reload(&self, kind: ReloadKind) {
        if let Some(live_reload) = &self.live_reload {
            live_reload.notify(kind);
        }
    }

    /// Resolve a path relative to the project root.
    ///
    /// If the path is absolute, returns it unchanged.
    /// If relative, joins it with the project root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}
