#![deny(missing_docs)]
//! Shared logging utilities for the webm2mp4 workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase,
//! a thread-local run context that tags log lines emitted while a conversion
//! run is being processed, and a minimal test initializer for the global logger.

use std::cell::Cell;

#[doc(hidden)]
pub use log as __log;

thread_local! {
    /// Identifier of the conversion run processed by the current thread, if any.
    static CURRENT_RUN: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Marks the current thread as working on conversion run `run_id`.
///
/// Every `engine_*` macro invoked on this thread is prefixed with `[run N]`
/// until [`clear_run_context`] is called.
pub fn set_run_context(run_id: u64) {
    CURRENT_RUN.with(|v| v.set(Some(run_id)));
}

/// Clears the run context of the current thread.
pub fn clear_run_context() {
    CURRENT_RUN.with(|v| v.set(None));
}

/// Returns the run the current thread is working on, if any.
pub fn current_run() -> Option<u64> {
    CURRENT_RUN.with(|v| v.get())
}

#[doc(hidden)]
pub fn run_prefix() -> String {
    match current_run() {
        Some(run_id) => format!("[run {run_id}] "),
        None => String::new(),
    }
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        $crate::__log::trace!("{}{}", $crate::run_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        $crate::__log::info!("{}{}", $crate::run_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        $crate::__log::debug!("{}{}", $crate::run_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        $crate::__log::warn!("{}{}", $crate::run_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        $crate::__log::error!("{}{}", $crate::run_prefix(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
