//! Configuration module for the asset pipeline
//!
//! Provides types and loading for `assetflow.toml` project configuration.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
