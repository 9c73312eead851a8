//! Config command handler.
//!
//! Displays, modifies, and resets the autopush configuration file.

use crate::config::{config_path, load_config_from, save_config_to, Config};
use crate::error::Result;
use crate::output::{print_info, print_success, BOLD, CYAN, GRAY, RESET};
use crate::prompt::Prompter;
use std::path::Path;

/// Display the configuration file and its effective values.
pub fn config_display_command() -> Result<()> {
    let path = config_path()?;
    let config = load_config_from(&path)?;
    print_config(&path, &config);
    Ok(())
}

/// Set one configuration value.
pub fn config_set_command(key: &str, value: &str) -> Result<()> {
    let path = config_path()?;
    set_config_value_at(&path, key, value)?;
    print_success(&format!("Set {} = {}", key, value));
    Ok(())
}

/// Restore every value to its default, asking first unless `yes`.
pub fn config_reset_command(yes: bool, prompter: &dyn Prompter) -> Result<()> {
    if !yes && !prompter.confirm("Reset configuration to defaults?", false) {
        print_info("Reset cancelled");
        return Ok(());
    }
    let path = config_path()?;
    reset_config_at(&path)?;
    print_success(&format!("Configuration reset: {}", path.display()));
    Ok(())
}

/// Update `key` in the file at `path`, leaving other keys untouched.
pub fn set_config_value_at(path: &Path, key: &str, value: &str) -> Result<Config> {
    let mut config = load_config_from(path)?;
    config.set_value(key, value)?;
    save_config_to(path, &config)?;
    Ok(config)
}

pub fn reset_config_at(path: &Path) -> Result<()> {
    save_config_to(path, &Config::default())
}

fn print_config(path: &Path, config: &Config) {
    println!("{BOLD}# autopush config{RESET}");
    println!("{GRAY}# {}{RESET}", path.display());
    println!();
    for line in config_to_toml_string(config).lines() {
        match line.split_once(" = ") {
            Some((key, value)) => println!("{CYAN}{}{RESET} = {}", key, value),
            None => println!("{}", line),
        }
    }
}

/// Convert a Config to bare `key = value` TOML lines.
pub fn config_to_toml_string(config: &Config) -> String {
    format!(
        "default_commit_message = {}\n\
         auto_open_browser = {}\n\
         debug_logging = {}\n\
         command_timeout_secs = {}\n\
         max_output_bytes = {}",
        toml::Value::String(config.default_commit_message.clone()),
        config.auto_open_browser,
        config.debug_logging,
        config.command_timeout_secs,
        config.max_output_bytes
    )
}
