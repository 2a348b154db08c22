//! Output directory removal.

use crate::build::{BuildContext, TaskError, TaskOutput};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Delete the whole output directory. A missing directory is not an error.
///
/// Refuses when the output directory is, or contains, the source
/// directory or the project root.
pub fn clean(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let dist = ctx.dist_dir();
    let target = comparable(&dist);
    let inside = |path: &Path| comparable(path).starts_with(&target);
    if inside(&ctx.src_dir()) || inside(ctx.project_root()) {
        return Err(TaskError::UnsafeClean(dist));
    }

    match fs::remove_dir_all(&dist) {
        Ok(()) => {
            tracing::debug!(path = %dist.display(), "removed output directory");
            Ok(TaskOutput::default())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(TaskOutput::default()),
        Err(e) => Err(TaskError::io(&dist, e)),
    }
}

/// Canonical form of `path` when it exists, otherwise the path with `.`
/// and `..` resolved lexically.
fn comparable(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
