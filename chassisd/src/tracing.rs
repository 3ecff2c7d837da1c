//! Logging setup.
//!
//! Modules log through [`prelude`] so the macros read the same everywhere.
//! The daemon calls [`init_journald_or_stdout`] once at startup.

use time::macros::format_description;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, time::LocalTime},
    prelude::*,
};

pub mod prelude {
    #[allow(unused_imports)]
    pub use tracing::{debug, error, info, trace, warn};
}

const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Log to the systemd journal when it is reachable, to stdout otherwise.
///
/// `RUST_LOG` overrides the default `info` filter in both cases.
pub fn init_journald_or_stdout() {
    match tracing_journald::layer() {
        Ok(journald) => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(journald.with_syslog_identifier("chassisd".into()))
                .init();
        }
        Err(_) => init_stdout(),
    }
}

/// Human-readable output with local timestamps.
pub fn init_stdout() {
    let timer = LocalTime::new(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
    ));

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_timer(timer).with_target(false))
        .init();
}
