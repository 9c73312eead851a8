//! Directory classification report.

use std::path::Path;

use super::colors::*;
use crate::classify::DirectoryAnalysis;
use crate::platform::PlatformDescriptor;

fn yes_no(value: bool) -> String {
    if value {
        format!("{GREEN}yes{RESET}")
    } else {
        format!("{GRAY}no{RESET}")
    }
}

/// Print the classifier result for `path` as a labelled block.
pub fn print_directory_analysis(
    path: &Path,
    analysis: &DirectoryAnalysis,
    platform: &PlatformDescriptor,
) {
    println!("{BOLD}Directory:{RESET} {}", path.display());
    println!(
        "{BOLD}Platform:{RESET}  {} {GRAY}({}){RESET}",
        platform.family, platform.shell_hint
    );
    println!("{BOLD}Type:{RESET}      {CYAN}{}{RESET}", analysis.folder_type);
    println!();
    println!("  Git repository     {}", yes_no(analysis.is_git_repo));
    println!("  Inside a repo      {}", yes_no(analysis.is_nested_repo));
    println!("  System folder      {}", yes_no(analysis.is_system_folder));
    println!("  Empty              {}", yes_no(analysis.is_empty));
    println!("  Source files       {}", yes_no(analysis.has_source_files));
    println!("  Init recommended   {}", yes_no(analysis.git_init_recommended));
    println!();

    if let Some(warning) = &analysis.warning_message {
        println!("{YELLOW}{BOLD}!{RESET} {YELLOW}{}{RESET}", warning);
    }
    println!("{BLUE}→{RESET} {}", analysis.action_recommendation);
    println!();
}
