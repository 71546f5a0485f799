//! Logging configuration for the `sputnik` binary.
//!
//! This module provides utilities for initializing and configuring logging
//! using the `log` and `env_logger` crates.
//!
//! # Usage
//!
//! ```rust,ignore
//! mod logging;
//!
//! // Initialize with default level (Warn)
//! logging::init();
//!
//! // Or initialize with a specific level, driven by `-v`/`-vv`
//! logging::init_with_level(log::LevelFilter::Debug);
//! ```
//!
//! # Log Levels
//!
//! - `error!` - unrecoverable failures (integrity check failed, link error)
//! - `warn!`  - recoverable problems (linker warning, missing symbol)
//! - `info!`  - high-level progress, named by the library currently being processed
//! - `debug!` - per-file compile/rename detail
//!
//! Set `RUST_LOG` to override the level picked by `-v` at runtime, e.g.
//! `RUST_LOG=sputnik=trace sputnik prebuild -c config_builder.json`.

use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize logging with sensible defaults (Warn level).
///
/// This only initializes once; subsequent calls are no-ops.
pub fn init() {
    init_with_level(LevelFilter::Warn);
}

/// Initialize logging with a specific level.
///
/// This only initializes once; subsequent calls are no-ops.
pub fn init_with_level(level: LevelFilter) {
    INIT.call_once(|| {
        Builder::new()
            .filter_level(level)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{:5}] {}:{} - {}",
                    record.level(),
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0),
                    record.args()
                )
            })
            .init();
    });
}

/// Initialize logging from the `RUST_LOG` environment variable.
///
/// Falls back to Warn level when `RUST_LOG` is unset.
pub fn init_from_env() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    });
}

/// Initialize logging for tests: test-friendly output, suppressed unless
/// `RUST_LOG` is explicitly set.
pub fn init_test() {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .is_test(true)
        .try_init();
}
