//! Build pipeline orchestration.
//!
//! The two entry points are task graphs: `build` cleans the output
//! directory and then runs every compile and copy step side by side;
//! `serve` runs `build` and then the dev server next to the watcher.

use crate::build::{BuildContext, RunReport, Runner, Task, TaskError, TaskOutput};
use crate::lint::lint_styles;
use crate::server::{start_server, LiveReload};
use crate::tasks::clean::clean;
use crate::tasks::images::copy_images;
use crate::tasks::scripts::compile_scripts;
use crate::tasks::styles::compile_styles;
use crate::tasks::templates::compile_templates;
use crate::tasks::vendor::{vendor_assets, vendor_css, vendor_js};
use crate::watch::start_watcher;

/// The `build` graph.
pub fn build_graph() -> Task {
    Task::series(vec![
        Task::leaf("clean", clean),
        Task::parallel(vec![
            Task::leaf("copy_images", copy_images),
            Task::leaf("compile_templates", compile_templates),
            Task::leaf("lint_styles", lint_styles),
            Task::leaf("compile_styles", compile_styles),
            Task::leaf("vendor_css", vendor_css),
            Task::leaf("compile_scripts", compile_scripts),
            Task::leaf("vendor_js", vendor_js),
            Task::leaf("vendor_assets", vendor_assets),
        ]),
    ])
}

/// The `serve` graph.
pub fn serve_graph() -> Task {
    Task::series(vec![
        build_graph(),
        Task::leaf("services", run_services),
    ])
}

/// Leaf body: run the dev server next to the watcher.
///
/// Both are set up before either starts blocking, so a taken port or a
/// missing source directory fails the leaf at once. When the watcher
/// stops, the server is stopped too and the watcher's error is returned.
fn run_services(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let server = start_server(ctx)?;
    let session = start_watcher(ctx)?;

    std::thread::scope(|scope| {
        scope.spawn(|| server.serve());
        let watched = session.run(ctx);
        server.stop();
        watched
    })
    .map_err(|e| TaskError::Service(e.to_string()))?;
    Ok(TaskOutput::default())
}

/// Build pipeline for executing the entry points.
pub struct BuildPipeline {
    /// Build context
    context: BuildContext,
}

impl BuildPipeline {
    /// Create a new build pipeline.
    pub fn new(context: BuildContext) -> Self {
        Self { context }
    }

    /// Run a one-shot build.
    pub fn build(&self) -> RunReport {
        tracing::debug!(mode = self.context.mode().as_str(), "running build");
        Runner::new(&self.context).run(&build_graph())
    }

    /// Build, then serve and watch until the process is interrupted.
    ///
    /// A live reload channel is attached when the context has none.
    pub fn serve(&self) -> RunReport {
        let context = match self.context.live_reload() {
            Some(_) => self.context.clone(),
            None => self.context.clone().with_live_reload(LiveReload::new()),
        };
        Runner::new(&context).run(&serve_graph())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildError;
    use crate::config::default_config;
    use crate::mode::Mode;
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_build_graph_shape() {
        let graph = build_graph();
        assert_eq!(
            graph.leaf_names(),
            vec![
                "clean",
                "copy_images",
                "compile_templates",
                "lint_styles",
                "compile_styles",
                "vendor_css",
                "compile_scripts",
                "vendor_js",
                "vendor_assets",
            ]
        );
        match graph {
            Task::Series(children) => {
                assert!(matches!(children[0], Task::Leaf { name: "clean", .. }));
                assert!(matches!(&children[1], Task::Parallel(leaves) if leaves.len() == 8));
            }
            other => panic!("expected series, got {:?}", other),
        }
    }

    #[test]
    fn test_serve_graph_runs_build_first() {
        let names = serve_graph().leaf_names();
        assert_eq!(names.len(), 10);
        assert_eq!(names[0], "clean");
        assert_eq!(names[9], "services");
    }

    #[test]
    fn test_empty_project_fails_without_cancelling_siblings() {
        let temp = TempDir::new().unwrap();
        let context = BuildContext::new(default_config(), temp.path().to_path_buf(), Mode::Bare);
        let report = BuildPipeline::new(context).build();

        assert!(!report.is_success());
        assert_eq!(report.result.tasks.len(), 9);
        assert!(report.result.get("copy_images").unwrap().status.is_success());
        assert!(report.result.get("compile_styles").unwrap().status.is_failure());
        assert!(report.result.get("compile_scripts").unwrap().status.is_failure());
        assert!(matches!(report.error, Some(BuildError::TaskFailed { .. })));
    }

    #[test]
    fn test_unsafe_clean_stops_the_build() {
        let temp = TempDir::new().unwrap();
        let mut config = default_config();
        config.paths.dist = ".".into();
        let context = BuildContext::new(config, temp.path().to_path_buf(), Mode::Bare);
        let report = BuildPipeline::new(context).build();

        assert_eq!(report.error.as_ref().map(BuildError::task), Some("clean"));
        assert_eq!(report.result.tasks.len(), 1);
        assert!(temp.path().exists());
    }

    /// Run the services leaf on its own thread and wait a bounded time.
    fn run_services_within(ctx: BuildContext, limit: Duration) -> RunReport {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let report = Runner::new(&ctx).run(&Task::leaf("services", run_services));
            let _ = tx.send(report);
        });
        rx.recv_timeout(limit).expect("services did not return")
    }

    #[test]
    fn test_services_surface_a_taken_port() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src")).unwrap();
        let taken = TcpListener::bind("127.0.0.1:0").unwrap();

        let mut config = default_config();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = taken.local_addr().unwrap().port();
        let context = BuildContext::new(config, temp.path().to_path_buf(), Mode::Bare);

        let report = run_services_within(context, Duration::from_secs(5));
        assert_eq!(report.error.as_ref().map(BuildError::task), Some("services"));
        assert!(report.result.get("services").unwrap().status.is_failure());
    }

    #[test]
    fn test_services_surface_a_missing_source_dir() {
        let temp = TempDir::new().unwrap();
        let mut config = default_config();
        config.server.port = 0;
        let context = BuildContext::new(config, temp.path().to_path_buf(), Mode::Bare);

        let report = run_services_within(context, Duration::from_secs(5));
        assert_eq!(report.error.as_ref().map(BuildError::task), Some("services"));
    }
}
