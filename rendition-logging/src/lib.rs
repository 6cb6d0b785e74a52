//! Structured logging setup for rendition services
//!
//! Every writer targets stderr: the media processor prints its reports as
//! JSON on stdout.

use rendition_config::LogFormat;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// `RUST_LOG` when set and valid, otherwise `default_level`
fn level_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// JSON lines with source location, one object per event.
///
/// The service name is recorded on the startup event only.
pub fn init_logging(service_name: &str, default_level: &str) {
    tracing_subscriber::registry()
        .with(level_filter(default_level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    tracing::info!(service = service_name, format = "json", "Logging initialized");
}

/// Human-readable output for local runs
pub fn init_console_logging(service_name: &str, default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(level_filter(default_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::info!(service = service_name, format = "console", "Logging initialized");
}

/// Install the subscriber selected by `LOG_FORMAT`
pub fn init_from_format(service_name: &str, default_level: &str, format: LogFormat) {
    match format {
        LogFormat::Json => init_logging(service_name, default_level),
        LogFormat::Console => init_console_logging(service_name, default_level),
    }
}
