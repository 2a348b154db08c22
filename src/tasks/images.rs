//! Image copying.

use crate::build::{BuildContext, SourceSet, TaskError, TaskOutput};
use crate::layout::{ASSETS_DIR, IMAGE_EXTENSIONS, OUT_IMAGES_DIR};
use crate::tasks::copy_files;

/// Glob (relative to the source root) of the images to copy.
pub fn image_glob() -> String {
    format!("{}/**/*.{{{}}}", ASSETS_DIR, IMAGE_EXTENSIONS.join(","))
}

/// Copy images to `dist/images`, keeping their path below `assets/`.
pub fn copy_images(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let files =
        SourceSet::new(ctx.src_dir()).with_base(ASSETS_DIR).include(&image_glob()).resolve()?;
    let written = copy_files(&files, &ctx.dist_path(OUT_IMAGES_DIR))?;
    tracing::debug!(count = written.len(), "copied images");
    Ok(TaskOutput::files(written))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use crate::mode::Mode;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_image_glob() {
        assert_eq!(image_glob(), "assets/**/*.{jpg,png,svg}");
    }

    #[test]
    fn test_copy_images_filters_extensions() {
        let temp = TempDir::new().unwrap();
        let assets = temp.path().join("src/assets");
        fs::create_dir_all(assets.join("icons")).unwrap();
        fs::write(assets.join("hero.jpg"), b"jpg").unwrap();
        fs::write(assets.join("icons/arrow.svg"), b"<svg/>").unwrap();
        fs::write(assets.join("notes.txt"), b"no").unwrap();

        let ctx = BuildContext::new(default_config(), temp.path().to_path_buf(), Mode::Bare);
        let output = copy_images(&ctx).unwrap();

        let images = temp.path().join("dist/images");
        assert_eq!(output.outputs.len(), 2);
        assert!(images.join("hero.jpg").exists());
        assert!(images.join("icons/arrow.svg").exists());
        assert!(!images.join("notes.txt").exists());
    }

    #[test]
    fn test_copy_images_without_assets_dir() {
        let temp = TempDir::new().unwrap();
        let ctx = BuildContext::new(default_config(), temp.path().to_path_buf(), Mode::Bare);
        assert!(copy_images(&ctx).unwrap().outputs.is_empty());
    }
}
