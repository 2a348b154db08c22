//! Third-party assets: the slider widget and the utility library.

use crate::build::{Asset, AssetKind, BuildContext, SourceSet, TaskError, TaskOutput};
use crate::layout::{
    OUT_JS_DIR, OUT_STYLES_DIR, VENDOR_SCRIPT_BUNDLE, VENDOR_STYLE_BUNDLE, WIDGET_DIR,
    WIDGET_SCRIPT,
};
use crate::tasks::copy_files;
use crate::transform::css;
use std::fs;
use std::path::PathBuf;

/// Copy the widget's fonts and images next to the style bundles.
///
/// The widget's own top-level style sheets and scripts are bundled
/// separately and are not copied.
pub fn vendor_assets(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let files = SourceSet::new(ctx.src_dir())
        .with_base(WIDGET_DIR)
        .include(&format!("{}/**/*.*", WIDGET_DIR))
        .exclude(&format!("{}/*.{{css,js}}", WIDGET_DIR))
        .resolve()?;
    let written = copy_files(&files, &ctx.dist_path(OUT_STYLES_DIR))?;
    Ok(TaskOutput::files(written))
}

/// Concatenate and minify the widget style sheets.
pub fn vendor_css(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let paths = SourceSet::new(ctx.src_dir()).include(&format!("{}/*.css", WIDGET_DIR)).paths()?;
    let mut asset = Asset::concat_files(VENDOR_STYLE_BUNDLE, AssetKind::Css, &paths)?;

    let targets = css::targets(&ctx.config().styles.browsers)?;
    asset.contents = css::minify(&asset.contents, targets)?;

    let written = asset.write_to(&ctx.dist_path(OUT_STYLES_DIR))?;
    Ok(TaskOutput::files(written))
}

/// Concatenate the utility library and the widget script.
pub fn vendor_js(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let utility = load_utility_lib(ctx)?;
    let widget = ctx.src_path(WIDGET_SCRIPT);
    if !widget.is_file() {
        return Err(TaskError::MissingSource(widget));
    }
    let widget_text = fs::read_to_string(&widget).map_err(|e| TaskError::io(&widget, e))?;

    let asset = Asset::concat(VENDOR_SCRIPT_BUNDLE, AssetKind::Js, &[utility, (widget, widget_text)]);
    let written = asset.write_to(&ctx.dist_path(OUT_JS_DIR))?;
    Ok(TaskOutput::files(written))
}

/// Whether the utility library location is a remote URL.
pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn load_utility_lib(ctx: &BuildContext) -> Result<(PathBuf, String), TaskError> {
    let location = &ctx.config().paths.utility_lib;

    if is_remote(location) {
        tracing::debug!(url = %location, "fetching utility library");
        let fetch_error = |message: String| TaskError::Fetch { url: location.clone(), message };
        let text = ureq::get(location)
            .call()
            .map_err(|e| fetch_error(e.to_string()))?
            .into_string()
            .map_err(|e| fetch_error(e.to_string()))?;
        return Ok((PathBuf::from(location), text));
    }

    let path = ctx.resolve_path(&PathBuf::from(location));
    if !path.is_file() {
        return Err(TaskError::MissingSource(path));
    }
    let text = fs::read_to_string(&path).map_err(|e| TaskError::io(&path, e))?;
    Ok((path, text))
}
