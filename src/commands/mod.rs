//! CLI command handlers for autopush.
//!
//! - [`run`] - Analyze, commit, and push a repository
//! - [`analyze`] - Classify a directory without touching git
//! - [`config`] - Show, set, or reset configuration values

mod analyze;
mod config;
mod run;

pub use analyze::{analyze_command, analyze_to_json, AnalysisReport};
pub use config::{
    config_display_command, config_reset_command, config_set_command, config_to_toml_string,
    reset_config_at, set_config_value_at,
};
pub use run::{run_command, system_runner_for};
