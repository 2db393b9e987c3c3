/*!
 * tellbridge core
 *
 * This crate provides the ambient pieces shared by the tellbridge crates:
 * configuration, logging, error types and small value types.
 */

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod prelude;
pub mod types;
pub mod utils;

/// Re-export of dependencies that are part of the public API
pub mod deps {
    pub use serde;
    pub use tokio;
    pub use tracing;
}

/// tellbridge core crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library initialization
pub fn init() -> Result<(), error::Error> {
    logging::init()?;
    tracing::info!("tellbridge core {} initialized", VERSION);
    Ok(())
}
