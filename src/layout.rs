//! Fixed project layout.
//!
//! The pipeline serves one directory layout. Paths here are relative to the
//! configured source or output root.

/// Raster and vector images.
pub const ASSETS_DIR: &str = "assets";
/// Image extensions copied by the image task and watched for changes.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "png", "svg"];

/// Style sheet sources.
pub const STYLES_DIR: &str = "styles";
/// Entry style sheet that imports everything else.
pub const STYLES_ENTRY: &str = "styles/main.scss";

/// Pages rendered to top-level markup files. Subdirectories hold partials.
pub const PAGES_DIR: &str = "pages";
/// Extension of page templates.
pub const PAGE_EXTENSION: &str = "html";

/// Generic scripts, bundled first in file-name order.
pub const SCRIPTS_GLOB: &str = "js/*.js";
/// Slider script, bundled after the generic scripts.
pub const SLIDER_SCRIPT: &str = "scripts/mainSlider.js";

/// Third-party UI widget (fonts, images, style sheet and script).
pub const WIDGET_DIR: &str = "js/vendors/slick";
/// Widget script appended after the utility library.
pub const WIDGET_SCRIPT: &str = "js/vendors/slick/slick.min.js";

/// Output directory for copied images.
pub const OUT_IMAGES_DIR: &str = "images";
/// Output directory for style bundles and widget assets.
pub const OUT_STYLES_DIR: &str = "styles";
/// Output directory for script bundles.
pub const OUT_JS_DIR: &str = "js";

/// Compiled style bundle.
pub const STYLE_BUNDLE: &str = "main.min.css";
/// Compiled script bundle.
pub const SCRIPT_BUNDLE: &str = "main.min.js";
/// Vendor style bundle.
pub const VENDOR_STYLE_BUNDLE: &str = "vendors.min.css";
/// Vendor script bundle.
pub const VENDOR_SCRIPT_BUNDLE: &str = "vendors.min.js";
