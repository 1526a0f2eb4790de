use crate::config::{TracingConfig, TracingFormat};
use tracing_subscriber::EnvFilter;

/// Installs the process-wide tracing subscriber. Call once, from `main`.
pub fn init_tracing(config: &TracingConfig) {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    match config.format {
        TracingFormat::Compact => subscriber.compact().init(),
        TracingFormat::Json => subscriber.json().init(),
    }
}
