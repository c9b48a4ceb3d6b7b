//! Tracing subscriber setup.
//!
//! Log events go to stderr so stdout carries only the reports.

use std::io::IsTerminal;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Maps the `-v` count to a default filter.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "platesplit=warn",
        1 => "platesplit=info",
        2 => "platesplit=debug",
        _ => "platesplit=trace",
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides the verbosity.
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .without_time();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init();
}
