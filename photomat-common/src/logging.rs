//! Logging initialisation
//!
//! Verbosity levels select which parts of the booth log at which level.
//! Each level includes everything below it:
//!
//! | Level | Adds                                    |
//! |-------|-----------------------------------------|
//! | 0     | warnings and errors only                |
//! | 1     | state machine transitions               |
//! | 2     | per-tick progress of the state machine  |
//! | 3     | GPIO activity (buttons, camera trigger) |
//! | 4     | video slot activity                     |
//! | 5     | everything at debug level               |
//!
//! `RUST_LOG` takes precedence over the verbosity level when set.

use crate::{Error, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Highest meaningful verbosity level
pub const MAX_VERBOSITY: u8 = 5;

/// Build the default filter directive string for a verbosity level
pub fn filter_for_verbosity(verbosity: u8) -> String {
    let mut directives = vec![if verbosity == 0 { "warn" } else { "info" }.to_string()];

    if verbosity >= 2 {
        directives.push("photomat_ctl::scheduler=trace".to_string());
    }
    if verbosity >= 3 {
        directives.push("photomat_ctl::gpio=debug".to_string());
    }
    if verbosity >= 4 {
        directives.push("photomat_ctl::playback=debug".to_string());
    }
    if verbosity >= MAX_VERBOSITY {
        directives.push("photomat_ctl=debug".to_string());
        directives.push("photomat_common=debug".to_string());
    }

    directives.join(",")
}

/// Install the global tracing subscriber
pub fn init_logging(verbosity: u8) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_for_verbosity(verbosity)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to initialise logging: {}", e)))
}
