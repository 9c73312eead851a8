//! Basic message output functions.

use super::colors::*;

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{RED}{BOLD}Error:{RESET} {}", msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    println!("{YELLOW}Warning:{RESET} {}", msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    println!("{CYAN}Info:{RESET} {}", msg);
}

pub fn print_success(msg: &str) {
    println!("{GREEN}\u{2714}{RESET} {}", msg);
}

pub fn print_nothing_to_commit() {
    println!("{GREEN}Nothing to commit.{RESET} The working tree is clean.");
}

/// Print interruption message when the user presses Ctrl+C.
pub fn print_interrupted() {
    println!();
    println!("{YELLOW}Interrupted.{RESET} Remaining steps were skipped.");
}
