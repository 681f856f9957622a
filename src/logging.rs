//! Structured logging setup and log-safe formatting helpers

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `LoggingConfig::level` when set. Calling this twice is
/// harmless; the second installation attempt is ignored.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_lowercase()));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Plain => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Mask a phone number for logs, keeping the country prefix and last 3 digits.
pub fn mask_phone_number(phone: &str) -> String {
    let len = phone.chars().count();
    if len <= 6 {
        return "*".repeat(len);
    }
    let head: String = phone.chars().take(3).collect();
    let tail: String = phone.chars().skip(len - 3).collect();
    format!("{}{}{}", head, "*".repeat(len - 6), tail)
}
