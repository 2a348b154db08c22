//! Build system for assetflow.
//!
//! Turns the source tree into the output tree by running task graphs.
//!
//! # Overview
//!
//! The build consists of:
//! - **Sources**: ordered source sets of literal paths and globs
//! - **Stages**: mode-tagged transformations applied to in-flight assets
//! - **Graph**: leaf tasks composed in series and in parallel
//! - **Pipeline**: the `build` and `serve` entry points
//!
//! # Example
//!
//! ```ignore
//! use assetflow::build::{BuildContext, BuildPipeline};
//! use assetflow::config::load_config;
//! use assetflow::mode::Mode;
//!
//! let config = load_config(None)?;
//! let context = BuildContext::new(config, project_root, Mode::from_env());
//! let report = BuildPipeline::new(context).build();
//!
//! println!("{}", report.result.summary());
//! ```

pub mod asset;
pub mod context;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod result;
pub mod sources;
pub mod stage;

pub use asset::*;
pub use context::*;
pub use error::*;
pub use graph::*;
pub use pipeline::*;
pub use result::*;
pub use sources::{SourceFile, SourceSet};
pub use stage::*;
