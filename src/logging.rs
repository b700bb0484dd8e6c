//! Logging setup for dupemark.
//!
//! Structured logging goes through the `log` facade with an `env_logger`
//! backend writing to stderr, so listings on stdout stay clean. The level
//! comes from, in priority order:
//!
//! 1. `RUST_LOG` (full `env_logger` filter syntax)
//! 2. `--quiet` (errors only) or `-v` / `-vv` (debug / trace)
//! 3. Info
//!
//! Debug builds prefix records with a timestamp; verbose runs add the module
//! path.
//!
//! ```rust,no_run
//! use dupemark::logging::init_logging;
//!
//! init_logging(1, false);
//! log::debug!("Now visible");
//! ```

use std::env;
use std::io::Write;

use env_logger::Builder;
use log::LevelFilter;

/// Initialize logging from CLI verbosity flags.
///
/// Later calls are ignored with a debug message, so tests and embedders can
/// call it freely.
pub fn init_logging(verbose: u8, quiet: bool) {
    let from_env = env::var("RUST_LOG").is_ok();
    let level = level_for(verbose, quiet);

    let mut builder = Builder::new();
    if from_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(level);
    }

    let with_module = verbose >= 1;
    let with_time = cfg!(debug_assertions);
    builder.format(move |buf, record| {
        let style = buf.default_level_style(record.level());
        if with_time {
            write!(buf, "{} ", buf.timestamp_seconds())?;
        }
        write!(buf, "{style}{:<5}{style:#} ", record.level())?;
        if with_module {
            write!(buf, "[{}] ", record.module_path().unwrap_or("unknown"))?;
        }
        writeln!(buf, "{}", record.args())
    });

    match builder.try_init() {
        Ok(()) if from_env => log::debug!("Logging configured from RUST_LOG"),
        Ok(()) => log::debug!("Logging initialized at level: {:?}", level),
        Err(e) => log::debug!("Logger already initialized: {}", e),
    }
}

/// Level selected by the CLI flags alone.
#[must_use]
pub fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
