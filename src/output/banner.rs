//! Phase banners framing each step of a run.

use terminal_size::{terminal_size, Width};

use super::colors::*;

const DEFAULT_TERMINAL_WIDTH: u16 = 80;
const MIN_BANNER_WIDTH: usize = 20;
const MAX_BANNER_WIDTH: usize = 72;

/// Color options for phase banners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BannerColor {
    /// Starting a step
    Cyan,
    /// Run finished cleanly
    Green,
    /// Run failed
    Red,
    /// Run stopped early
    Yellow,
}

impl BannerColor {
    pub fn ansi_code(&self) -> &'static str {
        match self {
            BannerColor::Cyan => CYAN,
            BannerColor::Green => GREEN,
            BannerColor::Red => RED,
            BannerColor::Yellow => YELLOW,
        }
    }
}

fn banner_width() -> usize {
    terminal_size()
        .map(|(Width(w), _)| w as usize)
        .unwrap_or(DEFAULT_TERMINAL_WIDTH as usize)
        .clamp(MIN_BANNER_WIDTH, MAX_BANNER_WIDTH)
}

/// `━━━ NAME ━━━` padded to `width` characters, without color codes.
fn format_banner(phase_name: &str, width: usize) -> String {
    let label = format!(" {} ", phase_name);
    let remaining = width.saturating_sub(label.chars().count());
    let left = remaining / 2;
    format!("{}{}{}", "━".repeat(left), label, "━".repeat(remaining - left))
}

/// Print a color-coded phase banner sized to the terminal.
pub fn print_phase_banner(phase_name: &str, color: BannerColor) {
    println!(
        "{}{BOLD}{}{RESET}",
        color.ansi_code(),
        format_banner(phase_name, banner_width())
    );
}

/// Print the bottom border matching [`print_phase_banner`].
pub fn print_phase_footer(color: BannerColor) {
    println!("{}{BOLD}{}{RESET}", color.ansi_code(), "━".repeat(banner_width()));
    println!();
}
