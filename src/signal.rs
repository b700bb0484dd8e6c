//! Ctrl+C handling for action batches.
//!
//! The handler owns an `AtomicBool` that is raised on interrupt. The same
//! flag is handed to the engine as its cancel token, so a running batch
//! finishes the file in hand and records every remaining file as skipped.
//!
//! ```rust,no_run
//! use dupemark::actions::LocalFileOps;
//! use dupemark::engine::Engine;
//! use dupemark::signal::install_handler;
//! use std::sync::Arc;
//!
//! let handler = install_handler().expect("Failed to install signal handler");
//! let engine = Engine::new(Arc::new(LocalFileOps::new())).with_cancel_flag(handler.get_flag());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared interrupt flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once Ctrl+C was pressed or [`Self::request_shutdown`] called.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clone of the flag, for the engine or a worker thread.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Error type for signal handler installation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(String),
}

/// Outcome of the one installation attempt made per process.
static GLOBAL_HANDLER: OnceLock<Result<ShutdownHandler, String>> = OnceLock::new();

/// Install the process-wide Ctrl+C handler.
///
/// Only the first call registers the hook. Later calls (tests running
/// `run_app` in parallel) get the same handler back with its flag cleared,
/// or the same error.
///
/// # Errors
///
/// Returns `InstallFailed` if another Ctrl+C handler was registered outside
/// this module.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    let installed = GLOBAL_HANDLER.get_or_init(|| {
        let handler = ShutdownHandler::new();
        let flag = handler.get_flag();
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
            let _ = writeln!(
                std::io::stderr(),
                "\nInterrupted. Finishing the current file..."
            );
            let _ = std::io::stderr().flush();
            log::info!("Interrupt received, cancelling");
        })
        .map(|()| handler)
        .map_err(|e| e.to_string())
    });
    reuse(installed)
}

fn reuse(installed: &Result<ShutdownHandler, String>) -> Result<ShutdownHandler, SignalError> {
    match installed {
        Ok(handler) => {
            handler.reset();
            Ok(handler.clone())
        }
        Err(reason) => Err(SignalError::InstallFailed(reason.clone())),
    }
}
