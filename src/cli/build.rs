//! Command implementations (build, serve, tasks)

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::build::{build_graph, serve_graph, BuildContext, BuildPipeline, RunReport, TaskStatus};
use crate::config::{default_config, find_config, load_config, merge_cli_overrides, CliOverrides};
use crate::mode::Mode;

/// Flags shared by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Explicit config file
    pub config: Option<PathBuf>,
    /// Mode override
    pub mode: Option<Mode>,
}

/// Load the configuration, apply overrides and build the context.
///
/// The project root is the directory holding assetflow.toml, or the
/// working directory when there is none.
fn load_context(options: &GlobalOptions, overrides: &CliOverrides) -> Result<BuildContext, ExitCode> {
    let cwd = std::env::current_dir().unwrap_or_default();
    let config_path = options.config.clone().or_else(find_config);

    let (mut config, project_root) = match config_path {
        Some(path) => {
            tracing::debug!("Using config: {}", path.display());
            let config = load_config(Some(&path)).map_err(|e| {
                eprintln!("Error loading config: {}", e);
                ExitCode::from(EXIT_ERROR)
            })?;
            (config, project_root_of(&path, &cwd))
        }
        None => {
            tracing::debug!("No assetflow.toml found, using defaults");
            (default_config(), cwd)
        }
    };

    merge_cli_overrides(&mut config, overrides);
    let errors = config.validate();
    if !errors.is_empty() {
        for error in errors {
            eprintln!("Error: {}", error);
        }
        return Err(ExitCode::from(EXIT_INVALID_ARGS));
    }

    let mode = options.mode.unwrap_or_else(Mode::from_env);
    Ok(BuildContext::new(config, project_root, mode))
}

fn project_root_of(config_path: &Path, cwd: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => cwd.join(parent),
        _ => cwd.to_path_buf(),
    }
}

/// Print the run summary and map it to an exit code.
fn finish(report: RunReport) -> ExitCode {
    if report.is_success() {
        println!("{}", report.result.summary());
        return ExitCode::from(EXIT_SUCCESS);
    }

    eprintln!("{}", report.result.summary());
    for failure in report.result.failures() {
        if let TaskStatus::Failed(message) = &failure.status {
            eprintln!("  {}: {}", failure.task, message);
        }
    }
    ExitCode::from(EXIT_ERROR)
}

/// Run the build command
pub fn run_build(options: &GlobalOptions, overrides: &CliOverrides) -> ExitCode {
    let context = match load_context(options, overrides) {
        Ok(context) => context,
        Err(code) => return code,
    };

    tracing::info!(
        "Building {} -> {} ({} mode)",
        context.src_dir().display(),
        context.dist_dir().display(),
        context.mode()
    );
    finish(BuildPipeline::new(context).build())
}

/// Run the serve command
///
/// Blocks until interrupted; returns only when the build or a service
/// fails.
pub fn run_serve(options: &GlobalOptions, overrides: &CliOverrides) -> ExitCode {
    let context = match load_context(options, overrides) {
        Ok(context) => context,
        Err(code) => return code,
    };

    tracing::info!("Press Ctrl+C to stop");
    finish(BuildPipeline::new(context).serve())
}

/// Run the tasks command
pub fn run_tasks() -> ExitCode {
    println!("build");
    print!("{}", build_graph().describe());
    println!();
    println!("serve");
    print!("{}", serve_graph().describe());
    ExitCode::from(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_root_of() {
        let cwd = Path::new("/work");
        assert_eq!(project_root_of(Path::new("assetflow.toml"), cwd), PathBuf::from("/work"));
        assert_eq!(project_root_of(Path::new("site/assetflow.toml"), cwd), PathBuf::from("/work/site"));
        assert_eq!(project_root_of(Path::new("/srv/site/assetflow.toml"), cwd), PathBuf::from("/srv/site"));
    }

    #[test]
    fn test_load_context_with_explicit_config() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("assetflow.toml");
        std::fs::write(&path, "[paths]\ndist = \"public\"\n").unwrap();

        let options = GlobalOptions { config: Some(path), mode: Some(Mode::Prod) };
        let overrides = CliOverrides { port: Some(4000), ..Default::default() };
        let context = load_context(&options, &overrides).unwrap();

        assert_eq!(context.project_root(), temp.path());
        assert_eq!(context.dist_dir(), temp.path().join("public"));
        assert_eq!(context.mode(), Mode::Prod);
        assert_eq!(context.config().server.port, 4000);
    }

    #[test]
    fn test_load_context_rejects_invalid_override() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("assetflow.toml");
        std::fs::write(&path, "").unwrap();

        let options = GlobalOptions { config: Some(path), mode: Some(Mode::Bare) };
        let overrides = CliOverrides { port: Some(0), ..Default::default() };
        assert!(load_context(&options, &overrides).is_err());
    }
}
