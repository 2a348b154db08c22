//! Build result types.
//!
//! Contains types for representing the outcome of task graph runs.

use std::path::PathBuf;
use std::time::Duration;

/// Status of a single task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task succeeded
    Success,
    /// Task failed with error
    Failed(String),
}

impl TaskStatus {
    /// Check if the status indicates success.
    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Success)
    }

    /// Check if the status indicates failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::Failed(_))
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// What a leaf task produced.
#[derive(Debug, Clone, Default)]
pub struct TaskOutput {
    /// Files written
    pub outputs: Vec<PathBuf>,
    /// Non-fatal problems
    pub warnings: Vec<String>,
}

impl TaskOutput {
    /// Output listing the files written.
    pub fn files(outputs: Vec<PathBuf>) -> Self {
        Self { outputs, warnings: vec![] }
    }

    /// Output with a single warning and no files.
    pub fn warning(message: impl Into<String>) -> Self {
        Self { outputs: vec![], warnings: vec![message.into()] }
    }

    /// Append a warning.
    pub fn with_warning(mut self, message: impl Into<String>) -> Self {
        self.warnings.push(message.into());
        self
    }
}

/// Result of running a single leaf task.
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Leaf task name
    pub task: String,
    /// Status
    pub status: TaskStatus,
    /// Output files produced
    pub outputs: Vec<PathBuf>,
    /// Duration
    pub duration: Duration,
    /// Warning messages (if any)
    pub warnings: Vec<String>,
}

impl TaskResult {
    /// Create a successful result.
    pub fn success(task: String, output: TaskOutput, duration: Duration) -> Self {
        Self {
            task,
            status: TaskStatus::Success,
            outputs: output.outputs,
            duration,
            warnings: output.warnings,
        }
    }

    /// Create a failed result.
    pub fn failed(task: String, error: String, duration: Duration) -> Self {
        Self { task, status: TaskStatus::Failed(error), outputs: vec![], duration, warnings: vec![] }
    }

    /// Check if this result is successful.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Result of a complete graph run.
#[derive(Debug, Default, Clone)]
pub struct BuildResult {
    /// Results for each leaf, in completion order
    pub tasks: Vec<TaskResult>,
    /// Total duration
    pub total_duration: Duration,
}

impl BuildResult {
    /// Create a new empty build result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task result.
    pub fn add_result(&mut self, result: TaskResult) {
        self.tasks.push(result);
    }

    /// Look up the result of a task by name (last run wins).
    pub fn get(&self, task: &str) -> Option<&TaskResult> {
        self.tasks.iter().rev().find(|r| r.task == task)
    }

    /// Get the number of successful tasks.
    pub fn success_count(&self) -> usize {
        self.tasks.iter().filter(|r| r.status.is_success()).count()
    }

    /// Get the number of failed tasks.
    pub fn failed_count(&self) -> usize {
        self.tasks.iter().filter(|r| r.status.is_failure()).count()
    }

    /// Total number of warnings across tasks.
    pub fn warning_count(&self) -> usize {
        self.tasks.iter().map(|r| r.warnings.len()).sum()
    }

    /// Check if the overall run succeeded (no failures).
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// All files written.
    pub fn all_outputs(&self) -> Vec<&PathBuf> {
        self.tasks.iter().flat_map(|r| r.outputs.iter()).collect()
    }

    /// Get failed task results.
    pub fn failures(&self) -> Vec<&TaskResult> {
        self.tasks.iter().filter(|r| r.status.is_failure()).collect()
    }

    /// One-line summary of the run.
    pub fn summary(&self) -> String {
        let mut summary = if self.is_success() {
            format!(
                "Finished {} task{} in {}",
                self.success_count(),
                if self.success_count() == 1 { "" } else { "s" },
                format_duration(self.total_duration)
            )
        } else {
            format!(
                "Failed: {} of {} task{} in {}",
                self.failed_count(),
                self.tasks.len(),
                if self.tasks.len() == 1 { "" } else { "s" },
                format_duration(self.total_duration)
            )
        };
        let warnings = self.warning_count();
        if warnings > 0 {
            summary.push_str(&format!(
                " ({} warning{})",
                warnings,
                if warnings == 1 { "" } else { "s" }
            ));
        }
        summary
    }
}

/// Format duration for display
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status() {
        assert!(TaskStatus::Success.is_success());
        assert!(!TaskStatus::Success.is_failure());
        assert!(TaskStatus::Failed("boom".to_string()).is_failure());
        assert_eq!(TaskStatus::Failed("boom".to_string()).to_string(), "failed: boom");
    }

    #[test]
    fn test_task_result_success_keeps_output() {
        let output = TaskOutput::files(vec![PathBuf::from("dist/js/main.min.js")])
            .with_warning("transpiler disabled");
        let result = TaskResult::success("compile_scripts".to_string(), output, Duration::ZERO);
        assert!(result.is_success());
        assert_eq!(result.outputs.len(), 1);
        assert_eq!(result.warnings, vec!["transpiler disabled".to_string()]);
    }

    #[test]
    fn test_build_result_counts() {
        let mut result = BuildResult::new();
        result.add_result(TaskResult::success(
            "clean".to_string(),
            TaskOutput::default(),
            Duration::ZERO,
        ));
        result.add_result(TaskResult::success(
            "compile_styles".to_string(),
            TaskOutput::warning("syntax error"),
            Duration::ZERO,
        ));
        result.add_result(TaskResult::failed(
            "lint_styles".to_string(),
            "2 errors".to_string(),
            Duration::ZERO,
        ));

        assert_eq!(result.success_count(), 2);
        assert_eq!(result.failed_count(), 1);
        assert_eq!(result.warning_count(), 1);
        assert!(!result.is_success());
        assert_eq!(result.failures()[0].task, "lint_styles");
        assert!(result.get("compile_styles").is_some());
    }

    #[test]
    fn test_summary() {
        let mut result = BuildResult::new();
        result.add_result(TaskResult::success(
            "clean".to_string(),
            TaskOutput::default(),
            Duration::ZERO,
        ));
        result.total_duration = Duration::from_millis(42);
        assert_eq!(result.summary(), "Finished 1 task in 42ms");

        result.add_result(TaskResult::failed("x".to_string(), "e".to_string(), Duration::ZERO));
        assert!(result.summary().starts_with("Failed: 1 of 2 tasks"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_millis(1000)), "1.00s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }
}
