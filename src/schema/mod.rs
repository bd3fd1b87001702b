//! Schema module - Declaration types for vector species.

mod config;
mod segments;

pub use config::*;
pub use segments::*;
