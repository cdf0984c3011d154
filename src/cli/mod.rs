//! CLI command handling

pub mod commands;
pub mod output;

pub use commands::*;
pub use output::*;
