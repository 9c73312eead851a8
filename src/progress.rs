use crate::output::{GREEN, RED, RESET};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use terminal_size::{terminal_size, Width};

const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
const DEFAULT_TERMINAL_WIDTH: u16 = 80;
// Spinner (2) + " [HH:MM:SS]" (11) + " failed: " (9)
const SPINNER_OVERHEAD: usize = 22;

fn get_terminal_width() -> usize {
    terminal_size()
        .map(|(Width(w), _)| w as usize)
        .unwrap_or(DEFAULT_TERMINAL_WIDTH as usize)
}

fn format_elapsed(elapsed: Duration) -> String {
    let hours = elapsed.as_secs() / 3600;
    let mins = (elapsed.as_secs() % 3600) / 60;
    let secs = elapsed.as_secs() % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

/// Spinner with an elapsed-time counter, shown while a network-bound git
/// or gh command runs (fetch, pull, push, repo create).
pub struct CommandSpinner {
    spinner: Arc<ProgressBar>,
    label: String,
    stop_flag: Arc<AtomicBool>,
    timer_thread: Option<JoinHandle<()>>,
    start_time: Instant,
}

impl CommandSpinner {
    pub fn new(label: &str) -> Self {
        let spinner = Arc::new(ProgressBar::new_spinner());
        let style = ProgressStyle::default_spinner()
            .tick_chars(SPINNER_CHARS)
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message(format!("{} [00:00:00]", label));
        spinner.enable_steady_tick(Duration::from_millis(80));

        let stop_flag = Arc::new(AtomicBool::new(false));
        let start_time = Instant::now();

        let spinner_clone = Arc::clone(&spinner);
        let stop_flag_clone = Arc::clone(&stop_flag);
        let label_owned = label.to_string();

        let timer_thread = thread::spawn(move || {
            while !stop_flag_clone.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(250));

                if stop_flag_clone.load(Ordering::Relaxed) {
                    break;
                }

                spinner_clone.set_message(format!(
                    "{} [{}]",
                    label_owned,
                    format_elapsed(start_time.elapsed())
                ));
            }
        });

        Self {
            spinner,
            label: label.to_string(),
            stop_flag,
            timer_thread: Some(timer_thread),
            start_time,
        }
    }

    fn stop_timer(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.timer_thread.take() {
            let _ = handle.join();
        }
    }

    /// Clear the spinner line without printing a final message.
    pub fn clear(&mut self) {
        self.stop_timer();
        self.spinner.finish_and_clear();
    }

    pub fn finish_success(&mut self) {
        self.stop_timer();
        let elapsed = self.start_time.elapsed();
        self.spinner.finish_and_clear();
        println!(
            "{GREEN}\u{2714} {} ({}.{:01}s){RESET}",
            self.label,
            elapsed.as_secs(),
            elapsed.subsec_millis() / 100
        );
    }

    pub fn finish_error(&mut self, error: &str) {
        self.stop_timer();
        let available = get_terminal_width()
            .saturating_sub(self.label.chars().count() + SPINNER_OVERHEAD);
        let truncated = truncate_message(error, available.max(20));
        self.spinner.finish_and_clear();
        println!("{RED}\u{2718} {} failed: {}{RESET}", self.label, truncated);
    }
}

impl Drop for CommandSpinner {
    fn drop(&mut self) {
        self.stop_timer();
        self.spinner.finish_and_clear();
    }
}

/// First line of `message`, cut to `max_len` characters with an ellipsis.
pub fn truncate_message(message: &str, max_len: usize) -> String {
    let first_line = message.lines().next().unwrap_or(message);
    let cleaned = first_line.trim();

    if cleaned.chars().count() <= max_len {
        cleaned.to_string()
    } else if max_len < 4 {
        "...".to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}
