/*!
 * Logging functionality for tellbridge.
 *
 * This module provides tracing setup and span helpers used by the
 * platform and accessory adapters.
 */
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Initialize the logging system with default configuration
pub fn init() -> Result<()> {
    init_with_filter("info")
}

/// Initialize the logging system from the logging section of the config
pub fn init_from_config(config: &LoggingConfig) -> Result<()> {
    init_with(&config.level, config.with_target)
}

/// Initialize the logging system with a specific filter
///
/// # Arguments
///
/// * `filter` - The log filter string (e.g., "info", "debug", "tellbridge_devices=trace")
pub fn init_with_filter(filter: &str) -> Result<()> {
    init_with(filter, true)
}

fn init_with(filter: &str, with_target: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(with_target))
        .with(filter)
        .try_init()
        .map_err(|e| Error::runtime(format!("Failed to initialize logging: {}", e)))?;

    Ok(())
}

/// A type alias for a tracing span
pub type Span = tracing::Span;

/// Create a span for one accessory
///
/// # Arguments
///
/// * `name` - The accessory display name
/// * `id` - The vendor id, if known
pub fn accessory_span(name: &str, id: Option<&str>) -> Span {
    match id {
        Some(id) => tracing::info_span!("accessory", name = %name, id = %id),
        None => tracing::info_span!("accessory", name = %name),
    }
}

/// Create a span for an operation
///
/// # Arguments
///
/// * `name` - The name of the operation
/// * `accessory` - The accessory performing the operation
pub fn operation_span(name: &str, accessory: &str) -> Span {
    tracing::info_span!("operation", name = %name, accessory = %accessory)
}
