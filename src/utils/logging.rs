use std::str::FromStr;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialise tracing. Un niveau simple ("debug") garde les crates bruyantes à info,
/// une directive complète ("info,sea_orm=debug") est respectée telle quelle.
pub fn setup_logging(log_level: &str, json_format: bool) {
    let normalized = log_level.trim();
    let filter_spec = if normalized.contains(',') || normalized.contains('=') {
        normalized.to_string()
    } else {
        format!("{},sqlx=warn,sea_orm=info,actix_server=info", normalized)
    };
    let filter = EnvFilter::from_str(&filter_spec).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry().with(filter);

    if json_format {
        subscriber
            .with(fmt::layer().json().with_target(false).with_current_span(false))
            .init();
    } else {
        subscriber.with(fmt::layer().with_target(true).compact()).init();
    }

    tracing::info!(filter = %filter_spec, json = json_format, "Logging initialized");
}
