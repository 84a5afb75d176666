use std::io;
use tracing_subscriber::{fmt, EnvFilter};

/// Snapshot of the logging-related settings, taken from the loaded
/// configuration before the subscriber is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Filter used when `RUST_LOG` is not set.
    pub default_filter: String,
    /// Emit JSON lines instead of the compact human format.
    pub json: bool,
}

impl LogSettings {
    /// `debug_mode` turns on debug output for our own crates while keeping
    /// the HTTP stack at info.
    pub fn from_debug_mode(debug_mode: bool, json: bool) -> Self {
        let default_filter = if debug_mode {
            "debug,hyper=info,reqwest=info,tower_http=debug"
        } else {
            "info,tower_http=info,axum=info"
        };
        Self { default_filter: default_filter.to_string(), json }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self::from_debug_mode(false, false)
    }
}

/// Initialize tracing subscriber with sensible defaults and stdout writer.
/// - Respects `RUST_LOG` if set
/// - Falls back to `info,tower_http=info,axum=info`
/// - Writes to stdout to improve visibility in environments that hide stderr
pub fn init_logging_default() {
    init_logging(&LogSettings::default());
}

/// Initialize the global subscriber from a settings snapshot.
/// Calling it twice is harmless; the second call is ignored.
pub fn init_logging(settings: &LogSettings) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.default_filter));
    if settings.json {
        let _ = fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .with_writer(io::stdout)
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .with_writer(io::stdout)
            .try_init();
    }
}
