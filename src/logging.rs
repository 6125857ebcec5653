//! `tracing` subscriber setup.
//!
//! Output goes to stderr so it never mixes with anything the plugin host
//! reads from stdout. Levels come from `RUST_LOG`:
//!
//! ```bash
//! RUST_LOG=konnect_provider::client=debug ./terraform-provider-konnect
//! ```
//!
//! The token is never recorded; client spans carry only the base URL and the
//! runtime group name.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter, Layer};

const DEFAULT_LEVEL: &str = "info";

/// Install the global subscriber at `info` unless `RUST_LOG` says otherwise.
///
/// Call once, early in `main`, before the provider is configured.
///
/// # Example
///
/// ```no_run
/// use konnect_provider::{init_logging, KonnectProvider};
///
/// #[tokio::main]
/// async fn main() {
///     init_logging();
///     tracing::info!("provider starting");
///
///     let provider = KonnectProvider::new();
///     // hand `provider` to the plugin host
/// #   let _ = provider;
/// }
/// ```
///
/// # Panics
///
/// Panics if a global subscriber is already installed. Use
/// [`try_init_logging`] where that can happen, e.g. in tests.
pub fn init_logging() {
    init_logging_with_default(DEFAULT_LEVEL);
}

/// Install the global subscriber, using `default_level` when `RUST_LOG` is
/// unset or unparsable.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logging_with_default(default_level: &str) {
    subscriber(default_level).init();
}

/// Install the global subscriber if none is installed yet.
///
/// Returns whether this call installed it.
pub fn try_init_logging() -> bool {
    install(DEFAULT_LEVEL).is_ok()
}

fn install(default_level: &str) -> Result<(), TryInitError> {
    subscriber(default_level).try_init()
}

fn subscriber(default_level: &str) -> impl tracing::Subscriber + Send + Sync + 'static {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_filter(filter);

    Registry::default().with(stderr)
}
