//! Application-wide structured logging setup.
//!
//! All `tracing` events are formatted as Bunyan JSON lines. Span fields are
//! carried onto every event inside the span by [`JsonStorageLayer`], so the
//! `user_id` recorded by the auth extractor shows up on handler logs.
//! `log` records from dependencies are bridged through [`LogTracer`].

use tracing::Subscriber;
use tracing::subscriber::set_global_default;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, Registry, fmt::MakeWriter, layer::SubscriberExt};

/// Composes the subscriber without installing it.
///
/// `env_filter` is the fallback directive when `RUST_LOG` is unset.
///
/// # Example
/// ```rust,no_run
/// use dispatch_server::{get_subscriber, init_subscriber};
///
/// let subscriber = get_subscriber("dispatch".into(), "info".into(), std::io::stdout);
/// init_subscriber(subscriber);
/// ```
pub fn get_subscriber<Sink>(
    name: String,
    env_filter: String,
    sink: Sink,
) -> impl Subscriber + Send + Sync
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));
    let formatting_layer = BunyanFormattingLayer::new(name, sink);

    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
}

/// Installs `subscriber` as the global default and redirects `log` records into it.
///
/// Call once per process; a second call is ignored with a warning.
pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) {
    if let Err(e) = LogTracer::init() {
        eprintln!("log bridge already installed: {e}");
    }
    if let Err(e) = set_global_default(subscriber) {
        eprintln!("tracing subscriber already installed: {e}");
    }
}
