//! Style sheet linting.
//!
//! Checks every `styles/**/*.scss` file against the rule file named by
//! `lint.config_file`, prints a stylish report and fails when any
//! violation has error severity.

pub mod config;
pub mod rules;

pub use config::{LintSettings, Rule, RuleSetting, Severity};
pub use rules::{format_stylish, lint_source, FileReport, Violation};

use crate::build::{BuildContext, SourceSet, TaskError, TaskOutput};
use crate::layout::STYLES_DIR;
use std::fs;

/// Lint the style sources.
pub fn lint_styles(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let settings = LintSettings::load(&ctx.resolve_path(&ctx.config().lint.config_file))?;
    let files = SourceSet::new(ctx.src_dir()).include(&format!("{}/**/*.scss", STYLES_DIR)).resolve()?;

    let mut reports = Vec::with_capacity(files.len());
    for file in &files {
        let text = fs::read_to_string(&file.path).map_err(|e| TaskError::io(&file.path, e))?;
        let violations = lint_source(&text, &settings);
        let path = file.path.strip_prefix(ctx.project_root()).unwrap_or(file.path.as_path()).to_path_buf();
        reports.push(FileReport { path, violations });
    }

    let report = format_stylish(&reports);
    if !report.is_empty() {
        print!("{}", report);
    }

    let errors: usize = reports.iter().map(FileReport::error_count).sum();
    let warnings: usize = reports.iter().map(FileReport::warning_count).sum();
    tracing::debug!(files = files.len(), errors, warnings, "linted style sheets");

    if errors > 0 {
        return Err(TaskError::Lint { errors, warnings });
    }
    Ok(TaskOutput::default())
}
