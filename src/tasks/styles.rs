//! Style sheet compilation.
//!
//! `styles/main.scss` is compiled with glob imports expanded, then run
//! through the style stage plan:
//!
//! | Stage | Modes |
//! |---|---|
//! | `px-to-rem` | prod |
//! | `autoprefix` | prod |
//! | `group-media` | prod |
//! | `minify` | prod |
//! | `sourcemap` | dev |
//!
//! The result is written to `dist/styles/main.min.css` and pushed to the
//! dev server as a style-only reload.

use crate::build::{
    Asset, AssetKind, BuildContext, Origin, StagePlan, TaskError, TaskOutput,
};
use crate::layout::{OUT_STYLES_DIR, STYLES_ENTRY, STYLE_BUNDLE};
use crate::mode::ModeSet;
use crate::server::ReloadKind;
use crate::tasks::attach_source_map;
use crate::transform::{css, px_to_rem, sass};

/// Stages applied after compilation.
pub fn style_plan() -> StagePlan {
    StagePlan::new()
        .stage("px-to-rem", ModeSet::PROD, px_to_rem_stage)
        .stage("autoprefix", ModeSet::PROD, autoprefix_stage)
        .stage("group-media", ModeSet::PROD, group_media_stage)
        .stage("minify", ModeSet::PROD, minify_stage)
        .stage("sourcemap", ModeSet::DEV, attach_source_map)
}

/// Compile the entry style sheet.
///
/// A Sass syntax error is reported as a warning and nothing is written,
/// unless `styles.fail_on_error` is set.
pub fn compile_styles(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let entry = ctx.src_path(STYLES_ENTRY);
    if !entry.is_file() {
        return Err(TaskError::MissingSource(entry));
    }

    let sheet = match sass::compile(&entry) {
        Ok(sheet) => sheet,
        Err(message) if ctx.config().styles.fail_on_error => return Err(TaskError::Style(message)),
        Err(message) => return Ok(TaskOutput::warning(format!("Style compilation failed: {}", message))),
    };

    let origins = sheet
        .loaded
        .into_iter()
        .map(|(path, content)| Origin { path, content, first_line: None })
        .collect();
    let asset = Asset { origins, ..Asset::new(STYLE_BUNDLE, AssetKind::Css, sheet.css) };

    let asset = style_plan().active(ctx.mode()).apply(asset, ctx)?;
    let written = asset.write_to(&ctx.dist_path(OUT_STYLES_DIR))?;
    ctx.notify_reload(ReloadKind::Css);
    Ok(TaskOutput::files(written))
}

fn px_to_rem_stage(mut asset: Asset, ctx: &BuildContext) -> Result<Asset, TaskError> {
    asset.contents = px_to_rem(&asset.contents, f64::from(ctx.config().styles.rem_base));
    Ok(asset)
}

fn autoprefix_stage(mut asset: Asset, ctx: &BuildContext) -> Result<Asset, TaskError> {
    let targets = css::targets(&ctx.config().styles.browsers)?;
    asset.contents = css::autoprefix(&asset.contents, targets)?;
    Ok(asset)
}

fn group_media_stage(mut asset: Asset, _ctx: &BuildContext) -> Result<Asset, TaskError> {
    asset.contents = css::group_media(&asset.contents)?;
    Ok(asset)
}

fn minify_stage(mut asset: Asset, ctx: &BuildContext) -> Result<Asset, TaskError> {
    let targets = css::targets(&ctx.config().styles.browsers)?;
    asset.contents = css::minify(&asset.contents, targets)?;
    Ok(asset)
}
