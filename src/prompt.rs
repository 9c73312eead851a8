use std::io::{self, BufRead, Write};

use crate::output::{BOLD, CYAN, GRAY, RESET, YELLOW};

/// Interactive questions asked during a run.
///
/// The terminal implementation reads stdin; tests script the answers.
pub trait Prompter {
    /// Ask a yes/no question.
    fn confirm(&self, question: &str, default: bool) -> bool;

    /// Ask the user to pick one option. `None` means the menu was dismissed.
    fn select(&self, question: &str, options: &[&str]) -> Option<usize>;

    /// Ask for free text, returning `default` on empty input.
    fn input(&self, question: &str, default: &str) -> String;
}

/// Prompter backed by stdin/stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

fn read_line() -> Option<String> {
    let _ = io::stdout().flush();
    let mut input = String::new();
    match io::stdin().lock().read_line(&mut input) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(input),
    }
}

/// Interpret a yes/no answer. Unrecognized input yields `None`.
pub fn parse_yes_no(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// A parsed menu answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// 0-based index of the chosen option
    Chosen(usize),
    /// Empty input or `q`
    Dismissed,
    /// Anything that should be asked again
    Invalid,
}

/// Interpret a menu answer given as a 1-based number.
pub fn parse_selection(input: &str, option_count: usize) -> Selection {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("q") {
        return Selection::Dismissed;
    }
    match trimmed.parse::<usize>() {
        Ok(n) if n >= 1 && n <= option_count => Selection::Chosen(n - 1),
        _ => Selection::Invalid,
    }
}

impl Prompter for TerminalPrompter {
    fn confirm(&self, question: &str, default: bool) -> bool {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            print!("{CYAN}?{RESET} {} {GRAY}{}{RESET} ", question, hint);

            let Some(input) = read_line() else {
                return default;
            };
            if input.trim().is_empty() {
                return default;
            }
            match parse_yes_no(&input) {
                Some(answer) => return answer,
                None => println!("{YELLOW}Please answer y or n{RESET}"),
            }
        }
    }

    fn select(&self, question: &str, options: &[&str]) -> Option<usize> {
        println!("{CYAN}?{RESET} {}", question);
        println!();

        for (i, option) in options.iter().enumerate() {
            println!("    {BOLD}{}{RESET}. {}", i + 1, option);
        }

        loop {
            println!();
            print!(
                "{GRAY}Enter choice [1-{}], or press Enter to cancel:{RESET} ",
                options.len()
            );

            let input = read_line()?;
            match parse_selection(&input, options.len()) {
                Selection::Chosen(index) => return Some(index),
                Selection::Dismissed => return None,
                Selection::Invalid => println!(
                    "{YELLOW}Please enter a number between 1 and {}{RESET}",
                    options.len()
                ),
            }
        }
    }

    fn input(&self, question: &str, default: &str) -> String {
        print!("{CYAN}?{RESET} {} {GRAY}[{}]{RESET} ", question, default);

        match read_line() {
            Some(input) if !input.trim().is_empty() => input.trim().to_string(),
            _ => default.to_string(),
        }
    }
}

/// Print info about what will happen
pub fn print_action(message: &str) {
    println!("{CYAN}→{RESET} {}", message);
}
