//! Page rendering.
//!
//! Every top-level `pages/*.html` file is a page. Files in subdirectories
//! of `pages/` are layouts and partials; they are only reachable through
//! `{% extends %}` and `{% include %}`. Templates see one variable, `mode`
//! (`"dev"`, `"prod"` or empty).

use crate::build::{BuildContext, SourceSet, TaskError, TaskOutput};
use crate::layout::{PAGES_DIR, PAGE_EXTENSION};
use minijinja::{context, path_loader, Environment};
use std::fs;

/// Render every page into the output root.
pub fn compile_templates(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let pages = SourceSet::new(ctx.src_dir())
        .with_base(PAGES_DIR)
        .include(&format!("{}/*.{}", PAGES_DIR, PAGE_EXTENSION))
        .resolve()?;
    if pages.is_empty() {
        return Ok(TaskOutput::default());
    }

    let mut env = Environment::new();
    env.set_loader(path_loader(ctx.src_path(PAGES_DIR)));
    env.set_keep_trailing_newline(true);

    let dist = ctx.dist_dir();
    fs::create_dir_all(&dist).map_err(|e| TaskError::io(&dist, e))?;

    let mut written = Vec::with_capacity(pages.len());
    for page in &pages {
        let name = page.relative.to_string_lossy().replace('\\', "/");
        let html = env
            .get_template(&name)
            .and_then(|template| template.render(context! { mode => ctx.mode().as_str() }))
            .map_err(|source| TaskError::Template { name: name.clone(), source })?;

        let target = dist.join(&page.relative);
        fs::write(&target, html).map_err(|e| TaskError::io(&target, e))?;
        tracing::debug!(page = %name, "rendered page");
        written.push(target);
    }

    Ok(TaskOutput::files(written))
}
