/*!
 * Accessory protocol vocabulary.
 *
 * Service and characteristic kinds the bridge can publish, their value
 * formats and bounds, and the service templates the model registry hands
 * out. Kinds carry the short HomeKit type code of the corresponding
 * service or characteristic.
 */
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use tellbridge_core::types::Value;

/// A service (logical function group) on an accessory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceKind {
    /// Identification service; every accessory has exactly one
    AccessoryInformation,
    /// Light bulb
    Lightbulb,
    /// Power outlet
    Outlet,
    /// Temperature sensor
    TemperatureSensor,
    /// Relative humidity sensor
    HumiditySensor,
    /// Door/window contact sensor
    ContactSensor,
    /// Alarm system
    SecuritySystem,
    /// Blinds, awnings and other up/down devices
    WindowCovering,
    /// Thermostat
    Thermostat,
}

impl ServiceKind {
    /// Short HomeKit service type code
    pub fn type_code(&self) -> u32 {
        match self {
            ServiceKind::AccessoryInformation => 0x3E,
            ServiceKind::Lightbulb => 0x43,
            ServiceKind::Outlet => 0x47,
            ServiceKind::TemperatureSensor => 0x8A,
            ServiceKind::HumiditySensor => 0x82,
            ServiceKind::ContactSensor => 0x80,
            ServiceKind::SecuritySystem => 0x7E,
            ServiceKind::WindowCovering => 0x8C,
            ServiceKind::Thermostat => 0x4A,
        }
    }

    /// Full HomeKit UUID of the service type
    pub fn type_uuid(&self) -> String {
        hap_uuid(self.type_code())
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single readable and/or writable property of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CharacteristicKind {
    /// Manufacturer (identification)
    Manufacturer,
    /// Model (identification)
    Model,
    /// Serial number (identification)
    SerialNumber,
    /// Display name (identification)
    Name,
    /// Power state
    On,
    /// Brightness percentage
    Brightness,
    /// Measured temperature
    CurrentTemperature,
    /// Thermostat set point
    TargetTemperature,
    /// Measured relative humidity
    CurrentRelativeHumidity,
    /// Contact detected (0) or not detected (1)
    ContactSensorState,
    /// Current alarm state
    SecuritySystemCurrentState,
    /// Requested alarm state
    SecuritySystemTargetState,
    /// Current covering position
    CurrentPosition,
    /// Requested covering position
    TargetPosition,
    /// Covering movement: 0 closing, 1 opening, 2 stopped
    PositionState,
    /// Whether something draws power from the outlet
    OutletInUse,
}

impl CharacteristicKind {
    /// Short HomeKit characteristic type code
    pub fn type_code(&self) -> u32 {
        match self {
            CharacteristicKind::Manufacturer => 0x20,
            CharacteristicKind::Model => 0x21,
            CharacteristicKind::SerialNumber => 0x30,
            CharacteristicKind::Name => 0x23,
            CharacteristicKind::On => 0x25,
            CharacteristicKind::Brightness => 0x08,
            CharacteristicKind::CurrentTemperature => 0x11,
            CharacteristicKind::TargetTemperature => 0x35,
            CharacteristicKind::CurrentRelativeHumidity => 0x10,
            CharacteristicKind::ContactSensorState => 0x6A,
            CharacteristicKind::SecuritySystemCurrentState => 0x66,
            CharacteristicKind::SecuritySystemTargetState => 0x67,
            CharacteristicKind::CurrentPosition => 0x6D,
            CharacteristicKind::TargetPosition => 0x7C,
            CharacteristicKind::PositionState => 0x72,
            CharacteristicKind::OutletInUse => 0x26,
        }
    }

    /// Full HomeKit UUID of the characteristic type
    pub fn type_uuid(&self) -> String {
        hap_uuid(self.type_code())
    }

    /// Default properties of the characteristic
    pub fn props(&self) -> CharacteristicProps {
        use CharacteristicKind::*;

        match self {
            Manufacturer | Model | SerialNumber | Name => CharacteristicProps::read(ValueFormat::String),
            On => CharacteristicProps::read_write(ValueFormat::Bool),
            Brightness => CharacteristicProps::read_write(ValueFormat::Int).with_bounds(0.0, 100.0),
            // widened from the protocol default so outdoor and freezer sensors fit
            CurrentTemperature | TargetTemperature => {
                CharacteristicProps::read(ValueFormat::Float).with_bounds(-40.0, 999.0)
            }
            CurrentRelativeHumidity => {
                CharacteristicProps::read(ValueFormat::Float).with_bounds(0.0, 100.0)
            }
            ContactSensorState => CharacteristicProps::read(ValueFormat::UInt8).with_bounds(0.0, 1.0),
            SecuritySystemCurrentState => {
                CharacteristicProps::read_write(ValueFormat::UInt8).with_bounds(0.0, 4.0)
            }
            SecuritySystemTargetState => {
                CharacteristicProps::read_write(ValueFormat::UInt8).with_bounds(0.0, 3.0)
            }
            CurrentPosition => CharacteristicProps::read(ValueFormat::UInt8).with_bounds(0.0, 100.0),
            TargetPosition => {
                CharacteristicProps::read_write(ValueFormat::UInt8).with_bounds(0.0, 100.0)
            }
            PositionState => CharacteristicProps::read(ValueFormat::UInt8).with_bounds(0.0, 2.0),
            OutletInUse => CharacteristicProps::read(ValueFormat::Bool),
        }
    }

    /// Every characteristic kind
    pub const ALL: [CharacteristicKind; 16] = [
        CharacteristicKind::Manufacturer,
        CharacteristicKind::Model,
        CharacteristicKind::SerialNumber,
        CharacteristicKind::Name,
        CharacteristicKind::On,
        CharacteristicKind::Brightness,
        CharacteristicKind::CurrentTemperature,
        CharacteristicKind::TargetTemperature,
        CharacteristicKind::CurrentRelativeHumidity,
        CharacteristicKind::ContactSensorState,
        CharacteristicKind::SecuritySystemCurrentState,
        CharacteristicKind::SecuritySystemTargetState,
        CharacteristicKind::CurrentPosition,
        CharacteristicKind::TargetPosition,
        CharacteristicKind::PositionState,
        CharacteristicKind::OutletInUse,
    ];

    /// Whether the characteristic is part of the identification service
    pub fn is_identification(&self) -> bool {
        matches!(
            self,
            CharacteristicKind::Manufacturer
                | CharacteristicKind::Model
                | CharacteristicKind::SerialNumber
                | CharacteristicKind::Name
        )
    }
}

impl fmt::Display for CharacteristicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for CharacteristicKind {
    type Err = String;

    /// Parse a characteristic name, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CharacteristicKind::ALL
            .iter()
            .find(|kind| kind.to_string().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("Unknown characteristic: {}", s))
    }
}

/// Wire format of a characteristic value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueFormat {
    /// Boolean
    Bool,
    /// Signed integer
    Int,
    /// Unsigned 8-bit integer
    UInt8,
    /// Floating point
    Float,
    /// UTF-8 string
    String,
}

impl ValueFormat {
    /// Encode a boolean in this format
    pub fn encode_bool(&self, value: bool) -> Value {
        match self {
            ValueFormat::Bool => Value::Bool(value),
            ValueFormat::Float => Value::Float(if value { 1.0 } else { 0.0 }),
            ValueFormat::String => Value::String(value.to_string()),
            ValueFormat::Int | ValueFormat::UInt8 => Value::Integer(i64::from(value)),
        }
    }

    /// Encode a number in this format
    pub fn encode_number(&self, value: f64) -> Value {
        match self {
            ValueFormat::Float => Value::Float(value),
            ValueFormat::Bool => Value::Bool(value != 0.0),
            ValueFormat::String => Value::String(value.to_string()),
            ValueFormat::Int | ValueFormat::UInt8 => Value::Integer(value.round() as i64),
        }
    }
}

/// Format, bounds and access of a characteristic
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CharacteristicProps {
    /// Value format
    pub format: ValueFormat,
    /// Minimum value, for numeric formats
    pub min_value: Option<f64>,
    /// Maximum value, for numeric formats
    pub max_value: Option<f64>,
    /// Whether the host may write the characteristic
    pub writable: bool,
}

impl CharacteristicProps {
    /// Read-only properties
    pub fn read(format: ValueFormat) -> Self {
        Self {
            format,
            min_value: None,
            max_value: None,
            writable: false,
        }
    }

    /// Read-write properties
    pub fn read_write(format: ValueFormat) -> Self {
        Self {
            writable: true,
            ..Self::read(format)
        }
    }

    /// Set numeric bounds
    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    /// Replace the value format
    pub fn with_format(mut self, format: ValueFormat) -> Self {
        self.format = format;
        self
    }

    /// Whether `value` lies within the bounds
    pub fn in_bounds(&self, value: f64) -> bool {
        !value.is_nan()
            && self.min_value.map_or(true, |min| value >= min)
            && self.max_value.map_or(true, |max| value <= max)
    }

    /// Map NaN and out-of-range readings to 0; in-range values pass through
    pub fn sanitize(&self, value: f64) -> f64 {
        if self.in_bounds(value) {
            value
        } else {
            0.0
        }
    }
}

/// A service kind together with the characteristics wired on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceTemplate {
    /// The service kind
    pub service: ServiceKind,
    /// Characteristics in registration order
    pub characteristics: &'static [CharacteristicKind],
}

impl ServiceTemplate {
    /// Create a template
    pub const fn new(service: ServiceKind, characteristics: &'static [CharacteristicKind]) -> Self {
        Self {
            service,
            characteristics,
        }
    }

    /// Whether the template wires `kind`
    pub fn has(&self, kind: CharacteristicKind) -> bool {
        self.characteristics.contains(&kind)
    }
}

/// A characteristic as published to the host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Characteristic {
    /// Kind
    pub kind: CharacteristicKind,
    /// Properties
    pub props: CharacteristicProps,
    /// Initial value, when known without a remote call
    pub value: Option<Value>,
}

/// A service as published to the host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
    /// Kind
    pub kind: ServiceKind,
    /// Characteristics
    pub characteristics: Vec<Characteristic>,
}

impl Service {
    /// Look up a characteristic on the service
    pub fn characteristic(&self, kind: CharacteristicKind) -> Option<&Characteristic> {
        self.characteristics.iter().find(|c| c.kind == kind)
    }
}

fn hap_uuid(code: u32) -> String {
    format!("{:08X}-0000-1000-8000-0026BB765291", code)
}
