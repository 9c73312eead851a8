//! Ctrl+C handling.
//!
//! The push workflow is a sequence of short git/gh commands, so an
//! interrupt is observed between steps instead of killing a command
//! halfway through a commit or push.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{AutopushError, Result};

/// Records SIGINT in a shared flag that the runner polls between steps.
#[derive(Clone, Default)]
pub struct SignalHandler {
    shutdown_flag: Arc<AtomicBool>,
}

impl SignalHandler {
    /// Registers the process-wide SIGINT handler.
    ///
    /// # Errors
    ///
    /// Fails if a handler was already registered for this process.
    pub fn new() -> Result<Self> {
        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let flag_clone = Arc::clone(&shutdown_flag);

        ctrlc::set_handler(move || {
            flag_clone.store(true, Ordering::SeqCst);
        })
        .map_err(|e| AutopushError::SignalHandler(e.to_string()))?;

        Ok(Self { shutdown_flag })
    }

    /// A handler not wired to any signal; used where interrupts are ignored.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag.load(Ordering::SeqCst)
    }

    /// Marks shutdown as requested, as if Ctrl+C had been pressed.
    pub fn request_shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_handler_starts_clear() {
        let handler = SignalHandler::detached();
        assert!(!handler.is_shutdown_requested());
    }

    #[test]
    fn test_clones_share_the_flag() {
        let handler = SignalHandler::detached();
        let clone = handler.clone();

        std::thread::spawn(move || clone.request_shutdown())
            .join()
            .unwrap();

        assert!(handler.is_shutdown_requested());
    }
}
