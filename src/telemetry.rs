use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing::Subscriber;
use tracing::subscriber::set_global_default;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

use crate::error::{DashboardError, Result};

/// Build a subscriber that appends plain-text events to `log_file`.
///
/// The terminal is owned by the dashboard, so nothing is written to stdout.
pub fn get_subscriber(env_filter: &str, log_file: &Path) -> Result<impl Subscriber + Send + Sync> {
    // RUST_LOG wins over the given default
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|err| {
            DashboardError::Config(format!("cannot open log file {}: {err}", log_file.display()))
        })?;

    let formatting_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);

    Ok(Registry::default().with(env_filter).with(formatting_layer))
}

pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) -> Result<()> {
    set_global_default(subscriber)
        .map_err(|err| DashboardError::Config(format!("failed to set subscriber: {err}")))
}
