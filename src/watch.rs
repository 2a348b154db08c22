//! Watch mode: source change events mapped to reaction chains.
//!
//! The registrar holds a fixed table of bindings. Each binding pairs a set
//! of glob patterns (relative to the source directory) with a reaction
//! [`Task`]. A debounced batch of changed paths triggers every matching
//! binding at most once, in table order, one after another on the watch
//! thread. A failing reaction is logged and watching continues.

use crate::build::sources::{expand_braces, MATCH_OPTIONS};
use crate::build::{BuildContext, Runner, Task, TaskError, TaskOutput};
use crate::layout::STYLES_DIR;
use crate::lint::lint_styles;
use crate::server::ReloadKind;
use crate::tasks::images::{copy_images, image_glob};
use crate::tasks::scripts::compile_scripts;
use crate::tasks::styles::compile_styles;
use crate::tasks::templates::compile_templates;
use glob::Pattern;
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEventKind, Debouncer};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;
use thiserror::Error;

/// Error during watch setup.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),
    /// Failed to add watch path
    #[error("Failed to watch path: {0}")]
    WatchPath(#[source] notify::Error),
    /// Channel receive error
    #[error("Watch channel error: {0}")]
    ChannelError(String),
    /// Source directory not found
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    /// A binding pattern is not a valid glob
    #[error("Invalid watch pattern '{pattern}': {source}")]
    Pattern {
        /// Offending pattern
        pattern: String,
        /// Underlying error
        #[source]
        source: glob::PatternError,
    },
}

/// One row of the subscription table.
#[derive(Debug, Clone)]
pub struct Binding {
    name: &'static str,
    patterns: Vec<Pattern>,
    reaction: Task,
}

impl Binding {
    /// Create a binding. Patterns may use `{a,b}` alternatives.
    pub fn new(name: &'static str, patterns: &[&str], reaction: Task) -> Result<Self, WatchError> {
        let mut compiled = Vec::new();
        for pattern in patterns {
            for expanded in expand_braces(pattern) {
                let glob = Pattern::new(&expanded)
                    .map_err(|source| WatchError::Pattern { pattern: expanded.clone(), source })?;
                compiled.push(glob);
            }
        }
        Ok(Self { name, patterns: compiled, reaction })
    }

    /// Binding name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Reaction chain.
    pub fn reaction(&self) -> &Task {
        &self.reaction
    }

    /// Whether a path relative to the source directory matches.
    pub fn matches(&self, relative: &Path) -> bool {
        self.patterns.iter().any(|p| p.matches_path_with(relative, MATCH_OPTIONS))
    }
}

fn reload_full(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    ctx.notify_reload(ReloadKind::Full);
    Ok(TaskOutput::default())
}

/// The default subscription table.
pub fn default_bindings() -> Result<Vec<Binding>, WatchError> {
    let styles = format!("{}/**/*.scss", STYLES_DIR);
    let images = image_glob();

    Ok(vec![
        Binding::new(
            "templates",
            &["**/*.html"],
            Task::series(vec![
                Task::leaf("compile_templates", compile_templates),
                Task::leaf("reload", reload_full),
            ]),
        )?,
        Binding::new(
            "styles",
            &[&styles],
            Task::series(vec![
                Task::leaf("lint_styles", lint_styles),
                Task::leaf("compile_styles", compile_styles),
            ]),
        )?,
        Binding::new("scripts", &["**/*.js"], Task::leaf("compile_scripts", compile_scripts))?,
        Binding::new(
            "images",
            &[&images],
            Task::series(vec![
                Task::leaf("copy_images", copy_images),
                Task::leaf("reload", reload_full),
            ]),
        )?,
    ])
}

/// Tracks bindings whose last reaction failed, for recovery reporting.
#[derive(Debug, Default)]
pub struct FailureTracker {
    failing: HashSet<&'static str>,
}

impl FailureTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reaction outcome. Returns true when the binding had failed
    /// before and has now succeeded.
    pub fn update(&mut self, binding: &'static str, success: bool) -> bool {
        if success {
            self.failing.remove(binding)
        } else {
            self.failing.insert(binding);
            false
        }
    }
}

/// Outcome of one triggered binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    /// Binding name
    pub binding: &'static str,
    /// Whether the chain succeeded
    pub success: bool,
    /// Whether this success ends an earlier failure
    pub recovered: bool,
}

/// Subscription table bound to a source directory.
#[derive(Debug)]
pub struct Registrar {
    src_dir: PathBuf,
    canonical_src: Option<PathBuf>,
    bindings: Vec<Binding>,
    tracker: FailureTracker,
}

impl Registrar {
    /// Registrar with the default table.
    pub fn new(src_dir: PathBuf) -> Result<Self, WatchError> {
        Ok(Self::with_bindings(src_dir, default_bindings()?))
    }

    /// Registrar with a custom table.
    pub fn with_bindings(src_dir: PathBuf, bindings: Vec<Binding>) -> Self {
        let canonical_src = src_dir.canonicalize().ok();
        Self { src_dir, canonical_src, bindings, tracker: FailureTracker::new() }
    }

    /// Registered bindings, in table order.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    fn relative<'p>(&self, path: &'p Path) -> Option<&'p Path> {
        path.strip_prefix(&self.src_dir)
            .ok()
            .or_else(|| self.canonical_src.as_ref().and_then(|c| path.strip_prefix(c).ok()))
    }

    /// Bindings matched by a batch of changed paths, each once, in table
    /// order. Paths outside the source directory are ignored.
    pub fn triggered(&self, paths: &[PathBuf]) -> Vec<&Binding> {
        let relative: Vec<&Path> = paths.iter().filter_map(|p| self.relative(p)).collect();
        self.bindings.iter().filter(|b| relative.iter().any(|r| b.matches(r))).collect()
    }

    /// Run the reactions for a batch of changed paths.
    pub fn dispatch(&mut self, ctx: &BuildContext, paths: &[PathBuf]) -> Vec<Reaction> {
        let triggered: Vec<(&'static str, Task)> = self
            .triggered(paths)
            .into_iter()
            .map(|b| (b.name, b.reaction.clone()))
            .collect();

        let mut reactions = Vec::with_capacity(triggered.len());
        for (binding, task) in triggered {
            let report = Runner::new(ctx).run(&task);
            let success = report.is_success();
            if let Some(error) = &report.error {
                tracing::error!(binding, "{}", error);
            }
            let recovered = self.tracker.update(binding, success);
            if recovered {
                tracing::info!(binding, "Recovered");
            }
            reactions.push(Reaction { binding, success, recovered });
        }
        reactions
    }

    /// Start watching the source directory.
    ///
    /// Every setup failure is reported here, before any event is awaited.
    pub fn start(self, debounce: Duration) -> Result<WatchSession, WatchError> {
        if !self.src_dir.exists() {
            return Err(WatchError::SourceNotFound(self.src_dir.clone()));
        }

        let (tx, rx) = channel();
        let mut debouncer = new_debouncer(debounce, tx).map_err(WatchError::WatcherInit)?;
        debouncer
            .watcher()
            .watch(&self.src_dir, RecursiveMode::Recursive)
            .map_err(WatchError::WatchPath)?;

        tracing::info!("Watching {} for changes...", self.src_dir.display());
        Ok(WatchSession { registrar: self, _debouncer: debouncer, events: rx })
    }
}

/// A registrar with a live file watcher behind it.
pub struct WatchSession {
    registrar: Registrar,
    _debouncer: Debouncer<RecommendedWatcher>,
    events: Receiver<DebounceEventResult>,
}

impl WatchSession {
    /// Dispatch every debounced batch. Blocks until the event channel
    /// closes.
    pub fn run(mut self, ctx: &BuildContext) -> Result<(), WatchError> {
        loop {
            match self.events.recv() {
                Ok(Ok(events)) => {
                    let paths: Vec<PathBuf> = events
                        .into_iter()
                        .filter(|e| matches!(e.kind, DebouncedEventKind::Any))
                        .map(|e| e.path)
                        .collect();
                    for path in &paths {
                        tracing::debug!(path = %path.display(), "changed");
                    }
                    self.registrar.dispatch(ctx, &paths);
                }
                Ok(Err(error)) => {
                    tracing::warn!("Watch error: {:?}", error);
                }
                Err(e) => return Err(WatchError::ChannelError(e.to_string())),
            }
        }
    }
}

/// Build the default registrar for the configured source directory and
/// start watching it.
pub fn start_watcher(ctx: &BuildContext) -> Result<WatchSession, TaskError> {
    let debounce = Duration::from_millis(u64::from(ctx.config().watch.debounce_ms));
    Registrar::new(ctx.src_dir())
        .and_then(|registrar| registrar.start(debounce))
        .map_err(|e| TaskError::Service(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use crate::mode::Mode;
    use crate::server::LiveReload;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn names(bindings: &[&Binding]) -> Vec<&'static str> {
        bindings.iter().map(|b| b.name()).collect()
    }

    fn registrar() -> Registrar {
        Registrar::new(PathBuf::from("/project/src")).unwrap()
    }

    #[test]
    fn test_default_table_order() {
        let registrar = registrar();
        let all: Vec<&Binding> = registrar.bindings().iter().collect();
        assert_eq!(names(&all), vec!["templates", "styles", "scripts", "images"]);
        assert_eq!(
            registrar.bindings()[1].reaction().leaf_names(),
            vec!["lint_styles", "compile_styles"]
        );
    }

    #[test]
    fn test_binding_patterns() {
        let registrar = registrar();
        let matching = |rel: &str| {
            let triggered = registrar.triggered(&[PathBuf::from("/project/src").join(rel)]);
            names(&triggered)
        };

        assert_eq!(matching("index.html"), vec!["templates"]);
        assert_eq!(matching("pages/about/team.html"), vec!["templates"]);
        assert_eq!(matching("styles/main.scss"), vec!["styles"]);
        assert_eq!(matching("styles/blocks/_buttons.scss"), vec!["styles"]);
        assert_eq!(matching("js/app.js"), vec!["scripts"]);
        assert_eq!(matching("scripts/mainSlider.js"), vec!["scripts"]);
        assert_eq!(matching("assets/icons/logo.svg"), vec!["images"]);
        assert_eq!(matching("assets/photo.jpg"), vec!["images"]);
        assert!(matching("assets/photo.gif").is_empty());
        assert!(matching("main.scss").is_empty());
    }

    #[test]
    fn test_paths_outside_source_are_ignored() {
        let registrar = registrar();
        assert!(registrar.triggered(&[PathBuf::from("/project/dist/index.html")]).is_empty());
    }

    #[test]
    fn test_each_binding_fires_once_in_table_order() {
        let registrar = registrar();
        let src = PathBuf::from("/project/src");
        let batch = vec![
            src.join("assets/a.png"),
            src.join("js/a.js"),
            src.join("js/b.js"),
            src.join("styles/main.scss"),
            src.join("index.html"),
        ];
        assert_eq!(
            names(&registrar.triggered(&batch)),
            vec!["templates", "styles", "scripts", "images"]
        );
    }

    #[test]
    fn test_failure_tracker() {
        let mut tracker = FailureTracker::new();
        assert!(!tracker.update("styles", true));
        assert!(!tracker.update("styles", false));
        assert!(!tracker.update("scripts", false));
        assert!(!tracker.update("styles", false));
        assert!(tracker.update("styles", true));
        assert!(!tracker.update("styles", true));
        assert!(tracker.update("scripts", true));
    }

    #[test]
    fn test_dispatch_reports_failure_and_recovery() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        let ctx = BuildContext::new(default_config(), temp.path().to_path_buf(), Mode::Bare);

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let flaky = Task::leaf("flaky", move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(TaskError::Service("boom".to_string()))
            } else {
                Ok(TaskOutput::default())
            }
        });
        let mut registrar =
            Registrar::with_bindings(src.clone(), vec![Binding::new("data", &["*.txt"], flaky).unwrap()]);

        let batch = vec![src.join("a.txt"), src.join("b.txt")];
        let first = registrar.dispatch(&ctx, &batch);
        assert_eq!(first, vec![Reaction { binding: "data", success: false, recovered: false }]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let second = registrar.dispatch(&ctx, &batch);
        assert_eq!(second, vec![Reaction { binding: "data", success: true, recovered: true }]);

        let third = registrar.dispatch(&ctx, &batch);
        assert_eq!(third, vec![Reaction { binding: "data", success: true, recovered: false }]);

        assert!(registrar.dispatch(&ctx, &[src.join("a.md")]).is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_template_binding_sends_full_reload() {
        let temp = TempDir::new().unwrap();
        let pages = temp.path().join("src/pages");
        fs::create_dir_all(&pages).unwrap();
        fs::write(pages.join("index.html"), "<p>{{ mode }}</p>\n").unwrap();

        let reload = LiveReload::new();
        let ctx = BuildContext::new(default_config(), temp.path().to_path_buf(), Mode::Dev)
            .with_live_reload(reload.clone());
        let mut registrar = Registrar::new(ctx.src_dir()).unwrap();

        let reactions = registrar.dispatch(&ctx, &[pages.join("index.html")]);
        assert_eq!(reactions.len(), 1);
        assert!(reactions[0].success);
        assert_eq!(reload.last_kind(), Some(ReloadKind::Full));
        assert_eq!(fs::read_to_string(temp.path().join("dist/index.html")).unwrap(), "<p>dev</p>\n");
    }

    #[test]
    fn test_missing_source_dir() {
        let ctx = BuildContext::new(default_config(), PathBuf::from("/nonexistent/project"), Mode::Bare);
        let registrar = Registrar::new(ctx.src_dir()).unwrap();
        assert!(matches!(registrar.start(Duration::from_millis(10)), Err(WatchError::SourceNotFound(_))));
        assert!(matches!(start_watcher(&ctx), Err(TaskError::Service(_))));
    }

    #[test]
    fn test_start_reports_setup_before_blocking() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        let ctx = BuildContext::new(default_config(), temp.path().to_path_buf(), Mode::Bare);

        let session = start_watcher(&ctx).unwrap();
        drop(session);
    }
}
