/*!
 * tellbridge devices
 *
 * This crate maps Telldus devices and sensors to HomeKit-style accessories
 * and relays characteristic reads and writes to the Telldus APIs.
 */

#![warn(missing_docs)]

// Re-export core types
pub use tellbridge_core::prelude;

pub mod accessory;
pub mod adapter;
pub mod api;
pub mod codec;
pub mod device;
pub mod platform;
pub mod registry;
pub mod resolver;

#[cfg(any(feature = "local", feature = "live"))]
pub mod protocols;

pub use accessory::{CharacteristicKind, Service, ServiceKind};
pub use adapter::AccessoryAdapter;
pub use api::{SharedApi, TelldusApi};
pub use device::{DeviceError, VendorDevice};
pub use platform::Platform;

/// tellbridge devices crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the device system
pub fn init() -> Result<(), tellbridge_core::error::Error> {
    tracing::info!("tellbridge devices {} initialized", VERSION);
    Ok(())
}

/// Names of the API clients compiled into this build
pub fn available_clients() -> Vec<&'static str> {
    let mut clients = vec!["memory"];

    #[cfg(feature = "local")]
    clients.push("local");

    #[cfg(feature = "live")]
    clients.push("live");

    clients
}
