//! Internal logging facilities. This module (re)exports the five logging
//! macros: `error!`, `warn!`, `info!`, `debug!` and `trace!` where `error!`
//! represents the highest-priority log messages and `trace!` the lowest.
//!
//! Logging is _disabled_ by default. Messages are enabled/disabled with:
//!
//!  - `enable_logging()`: turns on all log messages
//!  - `disable_logging()`: turns off all log messages
//!  - `set_log_level(level)`: enables only messages with priority at least `level`
//!
//! Not to be confused with _reporting_, which records model-level data about
//! running simulations.

use env_logger::{Builder, WriteStyle};
pub use log::{debug, error, info, trace, warn, LevelFilter};

use std::sync::atomic::{AtomicBool, Ordering};

static LOGGER_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Enables the logger with no level filter / full logging. Equivalent to
/// `set_log_level(LevelFilter::Trace)`.
pub fn enable_logging() {
    set_log_level(LevelFilter::Trace);
}

/// Disables logging completely. Equivalent to `set_log_level(LevelFilter::Off)`.
pub fn disable_logging() {
    set_log_level(LevelFilter::Off);
}

/// Sets the global log level, installing the global logger on first use.
/// A filter level of `LevelFilter::Off` disables logging.
pub fn set_log_level(level: LevelFilter) {
    if !LOGGER_INSTALLED.swap(true, Ordering::SeqCst) {
        // The logger is installed once with an open filter; level changes
        // afterwards happen through log::set_max_level.
        let logger = Builder::new()
            .filter_level(LevelFilter::Trace)
            .write_style(WriteStyle::Auto)
            .build();
        if log::set_boxed_logger(Box::new(logger)).is_err() {
            // A logger was installed elsewhere (e.g. by a test harness);
            // max-level filtering below still applies.
        }
    }
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_level_updates_max_level() {
        set_log_level(LevelFilter::Warn);
        assert_eq!(log::max_level(), LevelFilter::Warn);
        disable_logging();
        assert_eq!(log::max_level(), LevelFilter::Off);
    }
}
