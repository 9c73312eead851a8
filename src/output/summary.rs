//! End-of-run summary.

use super::colors::*;
use crate::results::ExecutionResults;

/// One summary line per step, without color codes.
pub fn summary_lines(results: &ExecutionResults) -> Vec<String> {
    results
        .iter()
        .map(|(step, ok)| {
            let mark = if ok { "\u{2714}" } else { "\u{2718}" };
            format!("{} {}", mark, step.label())
        })
        .collect()
}

/// Print which of the six workflow steps completed.
pub fn print_execution_summary(results: &ExecutionResults) {
    println!();
    println!("{BOLD}Summary{RESET}");
    for (step, ok) in results.iter() {
        if ok {
            println!("  {GREEN}\u{2714}{RESET} {}", step.label());
        } else {
            println!("  {GRAY}\u{2718} {}{RESET}", step.label());
        }
    }
    println!(
        "{DIM}{}/{} steps completed{RESET}",
        results.completed_count(),
        results.iter().count()
    );
}
