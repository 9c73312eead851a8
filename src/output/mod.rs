//! Terminal output formatting for autopush.
//!
//! - [`banner`] - Phase banners and footers
//! - [`messages`] - Error, warning, and info messages
//! - [`analysis`] - Directory classification report
//! - [`summary`] - End-of-run step summary

pub mod analysis;
pub mod banner;
pub mod messages;
pub mod summary;

/// ANSI color codes for terminal output.
pub mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const RED: &str = "\x1b[31m";
    pub const GRAY: &str = "\x1b[90m";
}

pub use colors::*;

pub use analysis::print_directory_analysis;
pub use banner::{print_phase_banner, print_phase_footer, BannerColor};
pub use messages::{
    print_error, print_info, print_interrupted, print_nothing_to_commit, print_success,
    print_warning,
};
pub use summary::print_execution_summary;
