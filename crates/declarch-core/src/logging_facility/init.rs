//! Subscriber installation for binaries.
//!
//! Logs always go to stderr so that command output on stdout stays
//! machine-readable (`declarch diff --json`, `declarch log --json`).

use std::sync::Once;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

/// Output shape of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Pretty text at debug level, for interactive use
    Development,
    /// One JSON object per line at info level, for scheduled runs
    Production,
    /// Bare registry; tests install their own layer via `init_test_capture()`
    Test,
}

impl Profile {
    /// Filter used when `RUST_LOG` is unset
    pub fn default_directive(&self) -> &'static str {
        match self {
            Profile::Development => "declarch=debug",
            Profile::Production | Profile::Test => "declarch=info",
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.default_directive()))
    }
}

static INSTALLED: Once = Once::new();

/// Install the global subscriber for `profile`. Only the first call has
/// any effect.
pub fn init(profile: Profile) {
    INSTALLED.call_once(|| {
        let builder = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(profile.filter());
        match profile {
            Profile::Development => builder.init(),
            Profile::Production => builder.json().init(),
            Profile::Test => tracing_subscriber::registry().init(),
        }
    });
}
