/*!
 * Device resolver.
 *
 * Applies the manual overrides from the configuration to a vendor record and
 * decides whether the record becomes an accessory at all.
 */
use tracing::{debug, info};

use tellbridge_core::{config::DeviceOverride, types::Id};

use crate::device::VendorDevice;

/// Model and manufacturer used when the vendor does not report one
pub const UNKNOWN: &str = "unknown";

/// A vendor record with its final identity
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDevice {
    /// Vendor identifier, also the accessory serial number
    pub id: Id,
    /// Display name
    pub name: String,
    /// Model used for registry lookup
    pub model: String,
    /// Manufacturer shown in the identification service
    pub manufacturer: String,
    /// The raw vendor record
    pub device: VendorDevice,
}

impl ResolvedDevice {
    /// Resolve a record without any override
    pub fn from_vendor(device: VendorDevice) -> Self {
        let (model, manufacturer) = split_model(device.model.as_deref());
        Self {
            id: device.id.clone(),
            name: device.display_name().unwrap_or_default().trim().to_string(),
            model,
            manufacturer,
            device,
        }
    }

    /// Whether the vendor record is a sensor rather than a controllable device
    pub fn is_sensor(&self) -> bool {
        self.device.kind.is_none()
    }
}

/// Split `model:manufacturer`
fn split_model(model: Option<&str>) -> (String, String) {
    let mut parts = model.unwrap_or_default().splitn(2, ':');
    let model = parts.next().map(str::trim).filter(|m| !m.is_empty());
    let manufacturer = parts.next().map(str::trim).filter(|m| !m.is_empty());
    (
        model.unwrap_or(UNKNOWN).to_string(),
        manufacturer.unwrap_or(UNKNOWN).to_string(),
    )
}

/// Find the override that applies to a vendor record
///
/// Cloud overrides are keyed by `id`. Local overrides are keyed by
/// `local_id` and the listing type, since sensor and device ids overlap on
/// a TellStick.
pub fn find_override<'a>(
    device: &VendorDevice,
    overrides: &'a [DeviceOverride],
    local: bool,
) -> Option<&'a DeviceOverride> {
    overrides.iter().find(|o| {
        if local {
            o.local_id.as_ref() == Some(&device.id) && o.kind == device.kind
        } else {
            o.id.as_ref() == Some(&device.id)
        }
    })
}

/// Resolve a vendor record into an accessory identity
///
/// Returns `None` when an override disables the record or when the vendor
/// reports no name. An override name only renames a named record.
pub fn resolve(
    device: VendorDevice,
    overrides: &[DeviceOverride],
    local: bool,
) -> Option<ResolvedDevice> {
    let found = find_override(&device, overrides, local);

    if found.map_or(false, |o| o.disabled) {
        info!("Device {} is disabled by configuration", device);
        return None;
    }

    if device.display_name().is_none() {
        info!("Skipping device {} without a name", device.id);
        return None;
    }

    let mut resolved = ResolvedDevice::from_vendor(device);

    if let Some(o) = found {
        debug!("Applying override to device {}", resolved.id);
        if let Some(name) = o.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            resolved.name = name.to_string();
        }
        if let Some(model) = &o.model {
            resolved.model = model.clone();
        }
        if let Some(manufacturer) = &o.manufacturer {
            resolved.manufacturer = manufacturer.clone();
        }
    }

    Some(resolved)
}
