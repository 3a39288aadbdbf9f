pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod server;
pub mod tools;
pub mod transcription;
pub mod ui;

/// Install the stderr `tracing` subscriber. `RUST_LOG` wins over `default`.
pub fn init_tracing(default: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
