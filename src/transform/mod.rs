//! Text transformations applied by the asset tasks.
//!
//! Each module wraps one delegate (Sass compiler, CSS processor, script
//! tools) or implements a small transformation of its own. Functions here
//! are pure text-in, text-out; tasks wire them into stage plans.

pub mod css;
pub mod px2rem;
pub mod sass;
pub mod script;
pub mod sourcemap;

pub use px2rem::px_to_rem;
pub use sourcemap::SourceMap;
