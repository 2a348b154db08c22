//! Script bundling.

use crate::build::{Asset, AssetKind, BuildContext, SourceSet, StagePlan, TaskError, TaskOutput};
use crate::layout::{OUT_JS_DIR, SCRIPTS_GLOB, SCRIPT_BUNDLE, SLIDER_SCRIPT};
use crate::mode::{Mode, ModeSet};
use crate::server::ReloadKind;
use crate::tasks::attach_source_map;
use crate::transform::script;

/// Ordered script list: generic scripts, then the slider.
pub fn script_sources(ctx: &BuildContext) -> SourceSet {
    SourceSet::new(ctx.src_dir()).include(SCRIPTS_GLOB).include(SLIDER_SCRIPT)
}

/// Stages applied to the concatenated bundle.
pub fn script_plan() -> StagePlan {
    StagePlan::new()
        .stage("transpile", ModeSet::PROD, transpile_stage)
        .stage("minify", ModeSet::PROD, minify_stage)
        .stage("sourcemap", ModeSet::DEV, attach_source_map)
}

/// Concatenate, transform and write `dist/js/main.min.js`.
pub fn compile_scripts(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let paths = script_sources(ctx).paths()?;
    let asset = Asset::concat_files(SCRIPT_BUNDLE, AssetKind::Js, &paths)?;

    let asset = script_plan().active(ctx.mode()).apply(asset, ctx)?;
    let written = asset.write_to(&ctx.dist_path(OUT_JS_DIR))?;
    ctx.notify_reload(ReloadKind::Full);

    let mut output = TaskOutput::files(written);
    if ctx.mode() == Mode::Prod && ctx.config().scripts.transpiler.is_empty() {
        output = output.with_warning("No transpiler configured; bundle was not down-levelled");
    }
    Ok(output)
}

fn transpile_stage(mut asset: Asset, ctx: &BuildContext) -> Result<Asset, TaskError> {
    asset.contents = script::transpile(&asset.contents, &ctx.config().scripts.transpiler)?;
    Ok(asset)
}

fn minify_stage(mut asset: Asset, _ctx: &BuildContext) -> Result<Asset, TaskError> {
    asset.contents = script::minify(&asset.contents);
    Ok(asset)
}
