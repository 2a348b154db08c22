//! Task graph composition and execution.
//!
//! A [`Task`] is a leaf step, a sequence of tasks, or a parallel set of
//! tasks. Graphs are built once and never mutated.
//!
//! # Execution
//!
//! - **Series**: run children in order; stop at the first failure.
//! - **Parallel**: start every child on its own scoped thread and wait for
//!   all of them. Siblings are not cancelled when one fails; the first
//!   failure observed is returned once every child has finished.
//!
//! # Example
//!
//! ```ignore
//! use assetflow::build::{Runner, Task};
//!
//! let graph = Task::series(vec![clean, Task::parallel(vec![styles, scripts])]);
//! let report = Runner::new(&ctx).run(&graph);
//! println!("{}", report.result.summary());
//! ```

use crate::build::{BuildContext, BuildError, BuildResult, TaskError, TaskOutput, TaskResult};
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Body of a leaf task.
pub type LeafFn = dyn Fn(&BuildContext) -> Result<TaskOutput, TaskError> + Send + Sync;

/// A node in the task graph.
#[derive(Clone)]
pub enum Task {
    /// A single step
    Leaf {
        /// Task name
        name: &'static str,
        /// Step body
        run: Arc<LeafFn>,
    },
    /// Children run one after another
    Series(Vec<Task>),
    /// Children run concurrently
    Parallel(Vec<Task>),
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Task::Leaf { name, .. } => write!(f, "Leaf({})", name),
            Task::Series(children) => f.debug_tuple("Series").field(children).finish(),
            Task::Parallel(children) => f.debug_tuple("Parallel").field(children).finish(),
        }
    }
}

impl Task {
    /// Create a leaf task.
    pub fn leaf<F>(name: &'static str, run: F) -> Self
    where
        F: Fn(&BuildContext) -> Result<TaskOutput, TaskError> + Send + Sync + 'static,
    {
        Task::Leaf { name, run: Arc::new(run) }
    }

    /// Compose tasks in sequence.
    pub fn series(children: Vec<Task>) -> Self {
        Task::Series(children)
    }

    /// Compose tasks in parallel.
    pub fn parallel(children: Vec<Task>) -> Self {
        Task::Parallel(children)
    }

    /// Leaf names in declaration order (depth first).
    pub fn leaf_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        self.collect_leaves(&mut names);
        names
    }

    fn collect_leaves(&self, names: &mut Vec<&'static str>) {
        match self {
            Task::Leaf { name, .. } => names.push(name),
            Task::Series(children) | Task::Parallel(children) => {
                for child in children {
                    child.collect_leaves(names);
                }
            }
        }
    }

    /// Render the graph as an indented tree.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        self.describe_into(&mut out, "", "");
        out
    }

    fn describe_into(&self, out: &mut String, lead: &str, child_lead: &str) {
        let label = match self {
            Task::Leaf { name, .. } => name.to_string(),
            Task::Series(_) => "series".to_string(),
            Task::Parallel(_) => "parallel".to_string(),
        };
        let _ = writeln!(out, "{}{}", lead, label);

        if let Task::Series(children) | Task::Parallel(children) = self {
            for (i, child) in children.iter().enumerate() {
                let last = i + 1 == children.len();
                let branch = if last { "└── " } else { "├── " };
                let next = if last { "    " } else { "│   " };
                child.describe_into(
                    out,
                    &format!("{}{}", child_lead, branch),
                    &format!("{}{}", child_lead, next),
                );
            }
        }
    }
}

/// Outcome of running a graph: per-leaf results plus the first failure.
#[derive(Debug)]
pub struct RunReport {
    /// Results of every leaf that ran
    pub result: BuildResult,
    /// First failure observed, if any
    pub error: Option<BuildError>,
}

impl RunReport {
    /// Whether the run succeeded.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Convert to a `Result`, dropping the per-leaf results on failure.
    pub fn into_result(self) -> Result<BuildResult, BuildError> {
        match self.error {
            None => Ok(self.result),
            Some(e) => Err(e),
        }
    }
}

/// Executes task graphs against a build context.
pub struct Runner<'a> {
    context: &'a BuildContext,
    results: Mutex<BuildResult>,
}

impl<'a> Runner<'a> {
    /// Create a runner.
    pub fn new(context: &'a BuildContext) -> Self {
        Self { context, results: Mutex::new(BuildResult::new()) }
    }

    /// Run a graph to completion.
    pub fn run(self, task: &Task) -> RunReport {
        let start = Instant::now();
        let error = self.execute(task).err();
        let mut result = self.results.into_inner().unwrap_or_else(|e| e.into_inner());
        result.total_duration = start.elapsed();
        RunReport { result, error }
    }

    fn execute(&self, task: &Task) -> Result<(), BuildError> {
        match task {
            Task::Leaf { name, run } => self.execute_leaf(name, run.as_ref()),
            Task::Series(children) => {
                for child in children {
                    self.execute(child)?;
                }
                Ok(())
            }
            Task::Parallel(children) => self.execute_parallel(children),
        }
    }

    fn execute_parallel(&self, children: &[Task]) -> Result<(), BuildError> {
        if children.len() == 1 {
            return self.execute(&children[0]);
        }

        let first_error: Mutex<Option<BuildError>> = Mutex::new(None);

        std::thread::scope(|s| {
            for child in children {
                let first_error = &first_error;
                s.spawn(move || {
                    if let Err(e) = self.execute(child) {
                        let mut slot = lock(first_error);
                        if slot.is_none() {
                            *slot = Some(e);
                        }
                    }
                });
            }
        });

        match first_error.into_inner().unwrap_or_else(|e| e.into_inner()) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn execute_leaf(&self, name: &'static str, run: &LeafFn) -> Result<(), BuildError> {
        let start = Instant::now();
        tracing::info!("Starting '{}'...", name);

        let outcome = run(self.context);
        let duration = start.elapsed();

        match outcome {
            Ok(output) => {
                for warning in &output.warnings {
                    tracing::warn!(task = name, "{}", warning);
                }
                tracing::info!(
                    "Finished '{}' after {}",
                    name,
                    crate::build::format_duration(duration)
                );
                lock(&self.results).add_result(TaskResult::success(
                    name.to_string(),
                    output,
                    duration,
                ));
                Ok(())
            }
            Err(e) => {
                tracing::error!("'{}' errored after {}: {}", name, crate::build::format_duration(duration), e);
                lock(&self.results).add_result(TaskResult::failed(
                    name.to_string(),
                    e.to_string(),
                    duration,
                ));
                Err(BuildError::TaskFailed { task: name.to_string(), source: e })
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
