//! Run command handler: the default `autopush <repo>` workflow.

use crate::command::SystemRunner;
use crate::config::Config;
use crate::error::Result;
use crate::output::print_warning;
use crate::platform::PlatformDescriptor;
use crate::prompt::TerminalPrompter;
use crate::runner::{RunOptions, RunOutcome, Runner};
use crate::signal::SignalHandler;
use std::path::Path;
use std::time::Duration;

/// Build the system runner with the configured limits.
pub fn system_runner_for(config: &Config) -> SystemRunner {
    SystemRunner::new(
        Duration::from_secs(config.command_timeout_secs),
        config.max_output_bytes,
    )
}

/// Run the full push workflow against `repo` on the real terminal.
pub fn run_command(repo: &Path, options: &RunOptions, config: Config) -> Result<RunOutcome> {
    let commands = system_runner_for(&config);
    let prompter = TerminalPrompter;
    let platform = PlatformDescriptor::detect();
    tracing::debug!(family = %platform.family, "detected platform");

    let signal = match SignalHandler::new() {
        Ok(handler) => handler,
        Err(e) => {
            print_warning(&format!("Ctrl+C will not stop the run cleanly: {}", e));
            SignalHandler::detached()
        }
    };

    let mut runner =
        Runner::new(&commands, &prompter, config, platform).with_signal_handler(signal);
    Ok(runner.run(repo, options))
}
