//! Leaf task bodies.
//!
//! Every task reads from the source tree and writes to its own disjoint
//! part of the output tree, so leaves can run side by side without
//! coordination.

pub mod clean;
pub mod images;
pub mod scripts;
pub mod styles;
pub mod templates;
pub mod vendor;

use crate::build::{Asset, BuildContext, SourceFile, TaskError};
use crate::transform::SourceMap;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Copy files into `out_dir`, preserving their relative paths.
///
/// Copies run on the rayon pool. Returns the written paths in input order.
pub fn copy_files(files: &[SourceFile], out_dir: &Path) -> Result<Vec<PathBuf>, TaskError> {
    files
        .par_iter()
        .map(|file| {
            let target = out_dir.join(&file.relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| TaskError::io(parent, e))?;
            }
            fs::copy(&file.path, &target).map_err(|e| TaskError::io(&file.path, e))?;
            Ok(target)
        })
        .collect()
}

/// Stage that attaches a source map and links it from the asset.
pub fn attach_source_map(mut asset: Asset, ctx: &BuildContext) -> Result<Asset, TaskError> {
    let map = SourceMap::build(&asset.name, &asset.contents, &asset.origins, &ctx.src_dir());
    let comment = asset.map_comment();
    asset.contents.push('\n');
    asset.contents.push_str(&comment);
    asset.source_map = Some(map);
    Ok(asset)
}
