//! Support library for the `misclass` command line tool.
//!
//! Holds everything the binary needs besides argument parsing: analysis
//! profiles stored in `~/.misclass/config.yaml`, dataset files in YAML or
//! JSON, and YAML/JSON output.

pub mod config;
pub mod dataset;
pub mod output;

pub use config::{load_config, Config, Profile};
pub use dataset::{load_dataset, parse_dataset, DatasetError, DatasetFile, InputKind, LabelValue};
pub use output::{Output, OutputFormat};
