//! Source map decoding and source path policy.

pub mod filters;
pub mod sourcemap;

pub use filters::{classify, destination_for};
pub use sourcemap::{SourceEntry, SourceMapDocument};
