pub mod classify;
pub mod command;
pub mod commands;
pub mod config;
pub mod error;
pub mod gh;
pub mod git;
pub mod locks;
pub mod logging;
pub mod output;
pub mod platform;
pub mod progress;
pub mod prompt;
pub mod results;
pub mod runner;
pub mod signal;
pub mod sync;

#[cfg(test)]
mod test_utils;

pub use classify::{classify, DirectoryAnalysis, FolderType};
pub use command::{CommandResult, CommandRunner, SystemRunner};
pub use config::Config;
pub use error::{AutopushError, Result};
pub use platform::{PlatformDescriptor, PlatformFamily};
pub use results::ExecutionResults;
pub use runner::{RunOptions, RunOutcome, Runner};
pub use sync::{BranchSyncResolver, SyncStrategy};
