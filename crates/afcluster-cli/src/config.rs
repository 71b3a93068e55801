//! Layered configuration: built-in defaults, an optional TOML file, command-line flags and
//! `--set KEY=VALUE` overrides, in increasing precedence.

mod builder;
mod defaults;
mod environment;
mod file;
mod models;

pub use builder::{CliOverrides, build_config};
pub use models::{AppConfig, PredictionConfig};
