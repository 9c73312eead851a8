//! autopush CLI entry point.
//!
//! Parses command-line arguments and dispatches to the command handlers.

use autopush::commands::{
    analyze_command, config_display_command, config_reset_command, config_set_command,
    run_command,
};
use autopush::config::{load_config, Config};
use autopush::logging::init_logging;
use autopush::output::{print_error, print_warning};
use autopush::prompt::TerminalPrompter;
use autopush::{Result, RunOptions};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "autopush")]
#[command(
    version,
    about = "Analyze a directory, then stage, commit, and push it to GitHub",
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true,
    after_help = "EXAMPLES:
    # Commit and push everything in the current directory
    autopush .

    # Non-interactive commit with a message to a specific branch
    autopush ~/code/app -m \"Update docs\" -b main -y

    # Inspect a directory without touching git
    autopush analyze ~/code/app --json"
)]
struct Cli {
    /// Path to the repository (or directory to turn into one)
    #[arg(required = true)]
    repo: Option<PathBuf>,

    /// Commit message (prompts with a timestamped default when omitted)
    #[arg(short, long)]
    message: Option<String>,

    /// Branch to push (prompts with the current branch when omitted)
    #[arg(short, long)]
    branch: Option<String>,

    /// Push with --force-with-lease (always asks for confirmation)
    #[arg(short, long)]
    force: bool,

    /// Answer yes to step confirmations (never to a force push)
    #[arg(short = 'y', long)]
    yes: bool,

    /// Do not open the repository in a browser after pushing
    #[arg(long)]
    no_browser: bool,

    /// Print debug diagnostics on stderr
    #[arg(long)]
    debug: bool,

    /// Also append diagnostics to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a directory and print the recommendation
    Analyze {
        /// Directory to analyze
        path: PathBuf,

        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// View, modify, or reset configuration values
    #[command(after_help = "CONFIG FILE:
    ~/.config/autopush/config.toml

    Created with defaults and comments on first use.")]
    Config {
        #[command(subcommand)]
        subcommand: Option<ConfigSubcommand>,
    },
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Set a configuration value
    Set {
        /// Key to set (e.g. auto_open_browser)
        key: String,
        /// New value
        value: String,
    },

    /// Reset configuration to default values
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

impl Cli {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            message: self.message.clone(),
            branch: self.branch.clone(),
            force: self.force,
            assume_yes: self.yes,
            open_browser: !self.no_browser,
        }
    }
}

/// Dispatch the parsed command. Returns the process exit code.
fn dispatch(cli: &Cli, config: Result<Config>) -> Result<i32> {
    match &cli.command {
        Some(Commands::Analyze { path, json }) => analyze_command(path, *json).map(|_| 0),
        Some(Commands::Config { subcommand }) => match subcommand {
            None => config_display_command(),
            Some(ConfigSubcommand::Set { key, value }) => config_set_command(key, value),
            Some(ConfigSubcommand::Reset { yes }) => {
                config_reset_command(*yes, &TerminalPrompter)
            }
        }
        .map(|_| 0),
        None => {
            let Some(repo) = &cli.repo else {
                let _ = Cli::command().print_help();
                return Ok(1);
            };
            let outcome = run_command(repo, &cli.run_options(), config?)?;
            Ok(outcome.exit_code())
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let config = load_config();
    let debug = cli.debug || config.as_ref().is_ok_and(|c| c.debug_logging);
    if let Err(e) = init_logging(debug, cli.log_file.as_deref()) {
        print_warning(&e.to_string());
    }

    match dispatch(&cli, config) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            print_error(&e.to_string());
            std::process::exit(1);
        }
    }
}
