/*!
 * Model registry for tellbridge.
 *
 * A static table from Telldus models, sensor protocols and device types to
 * the accessory services that represent them.
 */
use std::fmt;

use tracing::trace;
use uuid::Uuid;

use crate::accessory::{CharacteristicKind as C, ServiceKind as S, ServiceTemplate};
use crate::device::methods;
use crate::resolver::ResolvedDevice;

/// How a registry entry selects devices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKey {
    /// Exact model string
    Model(&'static str),
    /// Exact sensor protocol string
    Protocol(&'static str),
    /// Device type, optionally requiring dimming support
    DeviceType {
        /// Upper-case device-type UUID
        device_type: &'static str,
        /// Only match devices that support the dim command
        dimmer: bool,
    },
}

/// The strategy that produced a registry match, highest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchStrategy {
    /// Model or sensor protocol matched
    ModelOrProtocol,
    /// Device type matched and the device dims
    DeviceTypeDimmer,
    /// Device type matched
    DeviceType,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStrategy::ModelOrProtocol => write!(f, "model/protocol"),
            MatchStrategy::DeviceTypeDimmer => write!(f, "device type (dimmer)"),
            MatchStrategy::DeviceType => write!(f, "device type"),
        }
    }
}

/// One row of the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelRegistryEntry {
    /// Selection key
    pub key: MatchKey,
    /// Services attached on a match
    pub templates: &'static [ServiceTemplate],
}

/// A successful registry lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryMatch {
    /// Services to attach
    pub templates: &'static [ServiceTemplate],
    /// Which rule matched
    pub strategy: MatchStrategy,
}

/// Telldus device-type identifiers
pub mod device_types {
    /// Alarm sensor
    pub const ALARM: &str = "00000001-0001-1000-2005-ACCA54000000";
    /// Door/window sensor
    pub const DOOR_WINDOW: &str = "00000004-0001-1000-2005-ACCA54000000";
    /// Light
    pub const LIGHT: &str = "00000005-0001-1000-2005-ACCA54000000";
    /// Switch/outlet
    pub const SWITCH_OUTLET: &str = "00000010-0001-1000-2005-ACCA54000000";
    /// Thermostat
    pub const THERMOSTAT: &str = "00000011-0001-1000-2005-ACCA54000000";
    /// Window covering
    pub const WINDOW_COVERING: &str = "00000013-0001-1000-2005-ACCA54000000";
}

const SWITCH: &[ServiceTemplate] = &[ServiceTemplate::new(S::Lightbulb, &[C::On])];
const DIMMER: &[ServiceTemplate] =
    &[ServiceTemplate::new(S::Lightbulb, &[C::On, C::Brightness])];
const OUTLET: &[ServiceTemplate] = &[ServiceTemplate::new(S::Outlet, &[C::On, C::OutletInUse])];
const TEMPERATURE: &[ServiceTemplate] =
    &[ServiceTemplate::new(S::TemperatureSensor, &[C::CurrentTemperature])];
const TEMPERATURE_HUMIDITY: &[ServiceTemplate] = &[
    ServiceTemplate::new(S::TemperatureSensor, &[C::CurrentTemperature]),
    ServiceTemplate::new(S::HumiditySensor, &[C::CurrentRelativeHumidity]),
];
const CONTACT: &[ServiceTemplate] =
    &[ServiceTemplate::new(S::ContactSensor, &[C::ContactSensorState])];
const SECURITY: &[ServiceTemplate] = &[ServiceTemplate::new(
    S::SecuritySystem,
    &[C::SecuritySystemCurrentState, C::SecuritySystemTargetState],
)];
const WINDOW_COVERING: &[ServiceTemplate] = &[ServiceTemplate::new(
    S::WindowCovering,
    &[C::CurrentPosition, C::TargetPosition, C::PositionState],
)];
const THERMOSTAT: &[ServiceTemplate] = &[ServiceTemplate::new(
    S::Thermostat,
    &[C::CurrentTemperature, C::TargetTemperature],
)];

const fn model(name: &'static str, templates: &'static [ServiceTemplate]) -> ModelRegistryEntry {
    ModelRegistryEntry {
        key: MatchKey::Model(name),
        templates,
    }
}

const fn device_type(
    device_type: &'static str,
    dimmer: bool,
    templates: &'static [ServiceTemplate],
) -> ModelRegistryEntry {
    ModelRegistryEntry {
        key: MatchKey::DeviceType { device_type, dimmer },
        templates,
    }
}

/// The built-in table
pub const BUILTIN_ENTRIES: &[ModelRegistryEntry] = &[
    model("selflearning-switch", SWITCH),
    model("codeswitch", SWITCH),
    model("selflearning-dimmer", DIMMER),
    model("temperature", TEMPERATURE),
    // oregon protocol sensor models
    model("EA4C", TEMPERATURE),
    model("1A2D", TEMPERATURE_HUMIDITY),
    model("F824", TEMPERATURE_HUMIDITY),
    model("temperaturehumidity", TEMPERATURE_HUMIDITY),
    model("window-covering", WINDOW_COVERING),
    // mandolyn sensors report a bare numeric model
    ModelRegistryEntry {
        key: MatchKey::Protocol("mandolyn"),
        templates: TEMPERATURE_HUMIDITY,
    },
    device_type(device_types::LIGHT, true, DIMMER),
    device_type(device_types::LIGHT, false, SWITCH),
    device_type(device_types::SWITCH_OUTLET, false, OUTLET),
    device_type(device_types::DOOR_WINDOW, false, CONTACT),
    device_type(device_types::ALARM, false, SECURITY),
    device_type(device_types::WINDOW_COVERING, false, WINDOW_COVERING),
    device_type(device_types::THERMOSTAT, false, THERMOSTAT),
];

/// Normalise a vendor device type for comparison
///
/// Vendor data is inconsistent about case; UUID-shaped values are also
/// normalised to the hyphenated form.
pub fn normalize_device_type(device_type: &str) -> String {
    let trimmed = device_type.trim();
    match Uuid::parse_str(trimmed) {
        Ok(uuid) => uuid.hyphenated().to_string().to_uppercase(),
        Err(_) => trimmed.to_uppercase(),
    }
}

/// Whether a command mask includes dimming
pub fn is_dimmer(methods_mask: u32) -> bool {
    methods_mask & methods::SUPPORTED & methods::DIM == methods::DIM
}

/// Model registry
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    entries: Vec<ModelRegistryEntry>,
}

impl ModelRegistry {
    /// Create a registry holding the built-in table
    pub fn new() -> Self {
        Self {
            entries: BUILTIN_ENTRIES.to_vec(),
        }
    }

    /// Create an empty registry
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an entry; earlier entries win within a strategy
    pub fn with_entry(mut self, entry: ModelRegistryEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// All entries in table order
    pub fn entries(&self) -> &[ModelRegistryEntry] {
        &self.entries
    }

    /// Model names that can be used in manual overrides
    pub fn known_models(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter_map(|e| match e.key {
                MatchKey::Model(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    /// Find the services for a resolved device
    ///
    /// Model or sensor-protocol matches beat device-type matches; a
    /// device-type entry that requires dimming beats a plain one.
    pub fn resolve(&self, device: &ResolvedDevice) -> Option<RegistryMatch> {
        let found = self
            .match_model_or_protocol(device)
            .map(|t| (t, MatchStrategy::ModelOrProtocol))
            .or_else(|| {
                self.match_device_type(device, true)
                    .map(|t| (t, MatchStrategy::DeviceTypeDimmer))
            })
            .or_else(|| {
                self.match_device_type(device, false)
                    .map(|t| (t, MatchStrategy::DeviceType))
            });

        found.map(|(templates, strategy)| {
            trace!("Device {} matched by {}", device.id, strategy);
            RegistryMatch {
                templates,
                strategy,
            }
        })
    }

    fn match_model_or_protocol(&self, device: &ResolvedDevice) -> Option<&'static [ServiceTemplate]> {
        let by_model = self.entries.iter().find_map(|e| match e.key {
            MatchKey::Model(m) if m == device.model => Some(e.templates),
            _ => None,
        });

        by_model.or_else(|| {
            let protocol = device.device.protocol.as_deref()?;
            self.entries.iter().find_map(|e| match e.key {
                MatchKey::Protocol(p) if p == protocol => Some(e.templates),
                _ => None,
            })
        })
    }

    fn match_device_type(
        &self,
        device: &ResolvedDevice,
        dimmer: bool,
    ) -> Option<&'static [ServiceTemplate]> {
        let device_type = normalize_device_type(device.device.device_type.as_deref()?);
        if dimmer && !is_dimmer(device.device.methods) {
            return None;
        }

        self.entries.iter().find_map(|e| match e.key {
            MatchKey::DeviceType {
                device_type: t,
                dimmer: d,
            } if d == dimmer && normalize_device_type(t) == device_type => Some(e.templates),
            _ => None,
        })
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::VendorDevice;

    fn resolved(device: VendorDevice) -> ResolvedDevice {
        ResolvedDevice::from_vendor(device)
    }

    #[test]
    fn test_model_match() {
        let registry = ModelRegistry::new();
        let found = registry
            .resolve(&resolved(VendorDevice::new(1u64, "Lamp").with_model("selflearning-dimmer:nexa")))
            .unwrap();
        assert_eq!(found.strategy, MatchStrategy::ModelOrProtocol);
        assert_eq!(found.templates, DIMMER);
    }

    #[test]
    fn test_sensor_model_beats_device_type() {
        let device = VendorDevice::new(1u64, "Porch")
            .with_model("temperature")
            .with_device_type(device_types::LIGHT)
            .as_device(methods::TURNON | methods::TURNOFF | methods::DIM);
        let found = ModelRegistry::new().resolve(&resolved(device)).unwrap();
        assert_eq!(found.strategy, MatchStrategy::ModelOrProtocol);
        assert_eq!(found.templates, TEMPERATURE);
    }

    #[test]
    fn test_protocol_match() {
        let sensor = VendorDevice::new(5u64, "Attic")
            .with_model("1")
            .with_protocol("mandolyn");
        let found = ModelRegistry::new().resolve(&resolved(sensor)).unwrap();
        assert_eq!(found.strategy, MatchStrategy::ModelOrProtocol);
        assert_eq!(found.templates.len(), 2);
    }

    #[test]
    fn test_device_type_dimmer_precedence() {
        let dimmer = VendorDevice::new(2u64, "Spot")
            .with_device_type(device_types::LIGHT.to_lowercase())
            .as_device(methods::TURNON | methods::TURNOFF | methods::DIM);
        let found = ModelRegistry::new().resolve(&resolved(dimmer)).unwrap();
        assert_eq!(found.strategy, MatchStrategy::DeviceTypeDimmer);
        assert_eq!(found.templates, DIMMER);

        let switch = VendorDevice::new(3u64, "Ceiling")
            .with_device_type(device_types::LIGHT)
            .as_device(methods::TURNON | methods::TURNOFF);
        let found = ModelRegistry::new().resolve(&resolved(switch)).unwrap();
        assert_eq!(found.strategy, MatchStrategy::DeviceType);
        assert_eq!(found.templates, SWITCH);
    }

    #[test]
    fn test_device_type_only() {
        let outlet = VendorDevice::new(4u64, "Heater")
            .with_device_type(device_types::SWITCH_OUTLET)
            .as_device(methods::TURNON | methods::TURNOFF | methods::DIM);
        let found = ModelRegistry::new().resolve(&resolved(outlet)).unwrap();
        assert_eq!(found.strategy, MatchStrategy::DeviceType);
        assert_eq!(found.templates, OUTLET);
    }

    #[test]
    fn test_no_match() {
        let device = VendorDevice::new(9u64, "Mystery")
            .with_model("bell")
            .with_device_type("not-a-type");
        assert!(ModelRegistry::new().resolve(&resolved(device)).is_none());
        assert!(ModelRegistry::empty()
            .resolve(&resolved(VendorDevice::new(1u64, "x").with_model("codeswitch")))
            .is_none());
    }

    #[test]
    fn test_normalize_device_type() {
        assert_eq!(
            normalize_device_type(" 00000005-0001-1000-2005-acca54000000 "),
            device_types::LIGHT
        );
        assert_eq!(
            normalize_device_type("00000005000110002005acca54000000"),
            device_types::LIGHT
        );
        assert_eq!(normalize_device_type("light"), "LIGHT");
    }

    #[test]
    fn test_is_dimmer() {
        assert!(is_dimmer(methods::TURNON | methods::DIM));
        assert!(!is_dimmer(methods::TURNON | methods::TURNOFF));
        assert!(!is_dimmer(0));
    }

    #[test]
    fn test_known_models_and_extension() {
        let registry = ModelRegistry::new().with_entry(ModelRegistryEntry {
            key: MatchKey::Model("custom-switch"),
            templates: SWITCH,
        });
        let models = registry.known_models();
        assert!(models.contains(&"selflearning-dimmer"));
        assert!(models.contains(&"custom-switch"));
        assert!(!models.contains(&"mandolyn"));
    }
}
