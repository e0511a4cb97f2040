use tracing::Subscriber;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Registry};

/// Bunyan-formatted JSON logs on stdout, filtered by `RUST_LOG` (default `INFO`).
pub fn get_subscriber(
    app_name: String,
    default_filter: &str,
) -> impl Subscriber + Send + Sync + 'static {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let formatting_layer = BunyanFormattingLayer::new(app_name, std::io::stdout);
    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
}

/// Installs `subscriber` globally. `log` records (actix's request logger)
/// are forwarded into it as well.
pub fn init_subscriber(
    subscriber: impl Subscriber + Send + Sync + 'static,
) -> Result<(), TryInitError> {
    subscriber.try_init()
}
