//! Signal handling for graceful shutdown.
//!
//! Centralized Ctrl+C handling: an `AtomicBool` flag shared across worker
//! threads signals that shutdown has been requested. The pipeline checks
//! the flag between stages and aborts cleanly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shutdown coordinator wrapping a shared atomic flag.
///
/// `ShutdownHandler` is cheap to clone; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a handler with the flag initially unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Manually request a shutdown.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Get a clone of the flag for passing into the pipeline config.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

/// Install a Ctrl+C handler and return its shutdown handler.
///
/// # Errors
///
/// Returns an error if the process-wide signal handler cannot be
/// installed (it can only be set once).
pub fn install_handler() -> Result<ShutdownHandler, ctrlc::Error> {
    let handler = ShutdownHandler::new();
    let flag = handler.get_flag();
    ctrlc::set_handler(move || {
        eprintln!("Interrupted. Cleaning up...");
        flag.store(true, Ordering::SeqCst);
    })?;
    log::debug!("Signal handler installed");
    Ok(handler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_round_trip() {
        let handler = ShutdownHandler::new();
        assert!(!handler.is_shutdown_requested());
        handler.request_shutdown();
        assert!(handler.is_shutdown_requested());
    }

    #[test]
    fn test_clones_share_flag() {
        let handler = ShutdownHandler::new();
        let clone = handler.clone();
        clone.request_shutdown();
        assert!(handler.is_shutdown_requested());
    }

    #[test]
    fn test_external_flag_observes_request() {
        let handler = ShutdownHandler::new();
        let flag = handler.get_flag();
        handler.request_shutdown();
        assert!(flag.load(Ordering::SeqCst));
    }
}
