//! Diagnostic logging setup
//!
//! Compact `tracing` lines on stderr, so stdout stays clean for command
//! output. `RECPLAY_LOG` takes an `EnvFilter` directive and wins over `-v`.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive
pub const LOG_ENV: &str = "RECPLAY_LOG";

/// Filter directive for a `-v` count
pub fn default_directive(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    // Keep HTTP internals quiet below trace.
    if verbosity >= 2 {
        format!("recplay={level},{level}")
    } else {
        format!("recplay={level},hyper=warn,reqwest=warn,warn")
    }
}

fn build_filter(verbosity: u8) -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(directive) if !directive.trim().is_empty() => EnvFilter::try_new(&directive)
            .unwrap_or_else(|e| {
                eprintln!("Ignoring invalid {}: {}", LOG_ENV, e);
                EnvFilter::new(default_directive(verbosity))
            }),
        _ => EnvFilter::new(default_directive(verbosity)),
    }
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init_logging(verbosity: u8) {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(verbosity >= 2)
        .with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(build_filter(verbosity))
        .with(fmt_layer)
        .try_init();
}
