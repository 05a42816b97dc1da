use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_DIRECTIVES: &str = "info,persistence=info,sqlx=warn,sea_orm=warn";

/// Install the daemon's subscriber: one JSON object per event on stdout.
///
/// `RUST_LOG` replaces [`DEFAULT_DIRECTIVES`] wholesale.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let json = fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_target(true)
        .with_ansi(false);

    tracing_subscriber::registry().with(filter).with(json).init();
}
