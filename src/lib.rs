//! assetflow - front-end asset pipeline
//!
//! This library provides functionality to:
//! - Compile SCSS into one style sheet, with px to rem conversion,
//!   prefixing, media query grouping and minification in production
//! - Bundle scripts in declared order, down-level and minify them
//! - Render HTML page templates and copy images and vendor files
//! - Lint style sheets against a sass-lint style rule file
//! - Serve the output directory with live reload while watching sources

pub mod build;
pub mod cli;
pub mod config;
pub mod layout;
pub mod lint;
pub mod mode;
pub mod server;
pub mod tasks;
pub mod transform;
pub mod watch;
