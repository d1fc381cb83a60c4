//! Common utilities for the command line interface.

use tracing::level_filters::LevelFilter;

pub mod args;
pub mod ir_dump;
pub mod output;
pub mod scan;

/// Installs the global tracing subscriber writing to stderr, with the
/// level derived from the `--debug`/`--quiet` flags. Safe to call more
/// than once; later calls are ignored.
pub fn init_tracing(debug: bool, quiet: bool) {
    let level = if quiet {
        LevelFilter::OFF
    } else if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
