use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_DIRECTIVES: &str = "info,account_server=debug,mongodb=warn";

/// JSON lines on stdout; `RUST_LOG` replaces the default directives.
pub fn init_logging() -> Result<(), SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
