/*!
 * Prelude module for tellbridge core.
 *
 * Re-exports the types most crates in the workspace need.
 */

// Re-export error types
pub use crate::error::{Error, Result};

// Re-export core types
pub use crate::types::{Id, Value};

// Re-export config types
pub use crate::config::{
    BridgeConfig, Config, ConfigBuilder, Credentials, DeviceOverride, LocalConfig, SharedConfig,
};

// Re-export utility functions
pub use crate::utils::throttled;

// Re-export logging helpers
pub use crate::logging::{accessory_span, operation_span};
pub use tracing::{debug, error, info, trace, warn};

// Re-export core initialization
pub use crate::init;
