//! CLI commands module.

mod analyze;
mod config;
mod tree;
mod util;

pub use analyze::AnalyzeCommand;
pub use config::ConfigCommand;
pub use tree::TreeCommand;

pub(crate) use util::*;
