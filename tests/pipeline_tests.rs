//! End-to-end tests for the build pipeline and the watch chains.
//!
//! Each test lays out a small site in a temporary directory and runs the
//! real task graph against it.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use sha2::{Digest, Sha256};
use tempfile::TempDir;

use assetflow::build::{BuildContext, BuildPipeline};
use assetflow::config::{default_config, FlowConfig};
use assetflow::mode::Mode;
use assetflow::watch::Registrar;

// ============================================================================
// Test Utilities
// ============================================================================

fn write(root: &Path, rel: &str, content: &[u8]) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

/// Lay out a complete site.
fn create_site() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    write(
        root,
        "src/styles/main.scss",
        b"@import \"buttons\";\n\n.page {\n  margin: 0 auto;\n  padding: 24px;\n}\n\n@media (max-width: 600px) {\n  .page {\n    padding: 8px;\n  }\n}\n",
    );
    write(
        root,
        "src/styles/_buttons.scss",
        b".button {\n  border-radius: 4px;\n  user-select: none;\n}\n\n@media (max-width: 600px) {\n  .button {\n    width: 100%;\n  }\n}\n",
    );
    write(root, "src/js/zeta.js", b"var zeta = 1;\n");
    write(root, "src/scripts/mainSlider.js", b"var slider = zeta + 1;\n");
    write(root, "src/pages/index.html", b"<html><body class=\"{{ mode }}\">Home</body></html>\n");
    write(root, "src/assets/logo.svg", b"<svg></svg>");
    write(root, "src/assets/photos/hero.png", &[0x89, b'P', b'N', b'G', 0, 1, 2, 3]);
    write(root, "src/assets/notes.txt", b"not an image");
    write(root, "src/js/vendors/slick/slick.min.js", b"window.slick = {};\n");
    write(root, "src/js/vendors/slick/slick.css", b".slick-slider { position: relative; }\n");
    write(root, "src/js/vendors/slick/fonts/slick.woff", b"font");
    write(root, "node_modules/jquery/dist/jquery.min.js", b"window.jQuery = {};\n");

    temp
}

fn config() -> FlowConfig {
    let mut config = default_config();
    config.scripts.transpiler = vec![];
    config.styles.browsers = vec!["safari 12".to_string()];
    config
}

fn context(root: &Path, mode: Mode) -> BuildContext {
    BuildContext::new(config(), root.to_path_buf(), mode)
}

fn build(root: &Path, mode: Mode) {
    let report = BuildPipeline::new(context(root, mode)).build();
    assert!(report.is_success(), "build failed: {:?}", report.error);
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

/// Hash of every file under `dir`, keyed by relative path.
fn tree_digest(dir: &Path) -> Vec<(String, String)> {
    let pattern = format!("{}/**/*", dir.display());
    let mut entries: Vec<(String, String)> = glob::glob(&pattern)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .map(|p| {
            let rel = p.strip_prefix(dir).unwrap().to_string_lossy().replace('\\', "/");
            let digest = Sha256::digest(fs::read(&p).unwrap());
            let hex = digest.iter().map(|b| format!("{:02x}", b)).collect::<String>();
            (rel, hex)
        })
        .collect();
    entries.sort();
    entries
}

// ============================================================================
// Build
// ============================================================================

#[test]
fn test_bare_build_writes_every_output() {
    let temp = create_site();
    let root = temp.path();
    build(root, Mode::Bare);

    let files: Vec<String> = tree_digest(&root.join("dist")).into_iter().map(|(rel, _)| rel).collect();
    assert_eq!(
        files,
        vec![
            "images/logo.svg",
            "images/photos/hero.png",
            "index.html",
            "js/main.min.js",
            "js/vendors.min.js",
            "styles/fonts/slick.woff",
            "styles/main.min.css",
            "styles/vendors.min.css",
        ]
    );
    assert_eq!(read(root, "dist/index.html"), "<html><body class=\"\">Home</body></html>\n");
    assert_eq!(read(root, "dist/js/vendors.min.js"), "window.jQuery = {};\n\nwindow.slick = {};\n");
}

#[test]
fn test_build_is_idempotent() {
    let temp = create_site();
    let root = temp.path();

    build(root, Mode::Prod);
    let first = tree_digest(&root.join("dist"));
    write(root, "dist/stale.txt", b"left over");
    build(root, Mode::Prod);
    let second = tree_digest(&root.join("dist"));

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_script_bundle_follows_declared_order() {
    let temp = create_site();
    let root = temp.path();
    write(root, "src/js/alpha.js", b"var alpha = 0;\n");
    build(root, Mode::Bare);

    let bundle = read(root, "dist/js/main.min.js");
    let alpha = bundle.find("var alpha").unwrap();
    let zeta = bundle.find("var zeta").unwrap();
    let slider = bundle.find("var slider").unwrap();
    assert!(alpha < zeta);
    assert!(zeta < slider, "slider must come last even though it sorts first by name");
}

#[test]
fn test_unset_mode_compiles_imports_without_extras() {
    let temp = create_site();
    let root = temp.path();
    build(root, Mode::Bare);

    let css = read(root, "dist/styles/main.min.css");
    assert!(css.contains(".button"));
    assert!(css.contains(".page"));
    assert!(css.contains("padding: 24px"));
    assert!(!css.contains("-webkit-"));
    assert!(!css.contains("sourceMappingURL"));
    assert!(!root.join("dist/styles/main.min.css.map").exists());
    assert!(!root.join("dist/js/main.min.js.map").exists());
}

#[test]
fn test_prod_styles_are_prefixed_and_use_rem() {
    let temp = create_site();
    let root = temp.path();
    build(root, Mode::Prod);

    let css = read(root, "dist/styles/main.min.css");
    assert!(css.contains("-webkit-user-select:none"), "{}", css);
    assert!(css.contains("padding:1.5rem"), "{}", css);
    assert!(!css.contains('\n'));

    let preludes = Regex::new(r"@media[^{]*").unwrap();
    let declarations = preludes.replace_all(&css, "");
    assert!(!declarations.contains("px"), "{}", css);

    // Both 600px queries end up in one block after the plain rules.
    assert_eq!(css.matches("@media").count(), 1);
    assert!(css.find("@media").unwrap() > css.find(".page{").unwrap());

    let js = read(root, "dist/js/main.min.js");
    assert!(!js.contains("sourceMappingURL"));
}

#[test]
fn test_dev_build_emits_maps_without_minifying() {
    let temp = create_site();
    let root = temp.path();
    build(root, Mode::Dev);

    let css = read(root, "dist/styles/main.min.css");
    assert!(css.contains("padding: 24px"));
    assert!(css.ends_with("/*# sourceMappingURL=main.min.css.map */"));
    assert!(root.join("dist/styles/main.min.css.map").is_file());

    let js = read(root, "dist/js/main.min.js");
    assert!(js.starts_with("var zeta = 1;\n"));
    assert!(js.ends_with("//# sourceMappingURL=main.min.js.map"));

    let map: serde_json::Value = serde_json::from_str(&read(root, "dist/js/main.min.js.map")).unwrap();
    assert_eq!(map["version"], 3);
    assert_eq!(map["file"], "main.min.js");
    assert_eq!(map["sources"].as_array().unwrap().len(), 2);

    assert_eq!(read(root, "dist/index.html"), "<html><body class=\"dev\">Home</body></html>\n");
}

#[test]
fn test_lint_error_fails_build() {
    let temp = create_site();
    let root = temp.path();
    write(root, ".scss-config.yml", b"rules:\n  no-important: 2\n");
    write(root, "src/styles/_extra.scss", b".x {\n  color: red !important;\n}\n");

    let report = BuildPipeline::new(context(root, Mode::Bare)).build();
    assert!(!report.is_success());
    assert_eq!(report.error.as_ref().map(|e| e.task()), Some("lint_styles"));
    // Siblings still ran to completion.
    assert!(root.join("dist/styles/main.min.css").is_file());
    assert!(root.join("dist/js/main.min.js").is_file());
}

#[test]
fn test_style_syntax_error_is_not_fatal_by_default() {
    let temp = create_site();
    let root = temp.path();
    write(root, "src/styles/main.scss", b".page {\n  color: red;\n");

    let report = BuildPipeline::new(context(root, Mode::Bare)).build();
    assert!(report.is_success(), "{:?}", report.error);
    assert_eq!(report.result.get("compile_styles").unwrap().warnings.len(), 1);
    assert!(!root.join("dist/styles/main.min.css").exists());

    let mut config = config();
    config.styles.fail_on_error = true;
    let report = BuildPipeline::new(BuildContext::new(config, root.to_path_buf(), Mode::Bare)).build();
    assert_eq!(report.error.as_ref().map(|e| e.task()), Some("compile_styles"));
}

// ============================================================================
// Watch chains
// ============================================================================

#[test]
fn test_lint_error_gates_style_compilation_in_watch_chain() {
    let temp = create_site();
    let root = temp.path();
    write(root, ".scss-config.yml", b"rules:\n  no-important: 2\n");
    build(root, Mode::Bare);
    let before = read(root, "dist/styles/main.min.css");

    let ctx = context(root, Mode::Bare);
    let mut registrar = Registrar::new(ctx.src_dir()).unwrap();

    let buttons = write(
        root,
        "src/styles/_buttons.scss",
        b".button {\n  border-radius: 4px !important;\n}\n",
    );
    let reactions = registrar.dispatch(&ctx, &[buttons.clone()]);
    assert_eq!(reactions.len(), 1);
    assert_eq!(reactions[0].binding, "styles");
    assert!(!reactions[0].success);
    assert_eq!(read(root, "dist/styles/main.min.css"), before);

    write(root, "src/styles/_buttons.scss", b".button {\n  border-radius: 2px;\n}\n");
    let reactions = registrar.dispatch(&ctx, &[buttons]);
    assert!(reactions[0].success);
    assert!(reactions[0].recovered);
    let after = read(root, "dist/styles/main.min.css");
    assert!(after.contains("border-radius: 2px"));
}

#[test]
fn test_watch_batch_runs_each_chain_once() {
    let temp = create_site();
    let root = temp.path();
    build(root, Mode::Bare);

    let ctx = context(root, Mode::Bare);
    let mut registrar = Registrar::new(ctx.src_dir()).unwrap();

    write(root, "src/js/zeta.js", b"var zeta = 2;\n");
    let logo = write(root, "src/assets/new.png", b"png");
    let batch = vec![root.join("src/js/zeta.js"), root.join("src/scripts/mainSlider.js"), logo];

    let reactions = registrar.dispatch(&ctx, &batch);
    let bindings: Vec<&str> = reactions.iter().map(|r| r.binding).collect();
    assert_eq!(bindings, vec!["scripts", "images"]);
    assert!(reactions.iter().all(|r| r.success));
    assert!(read(root, "dist/js/main.min.js").contains("var zeta = 2;"));
    assert!(root.join("dist/images/new.png").is_file());
}
