/*!
 * Vendor device model and device errors.
 *
 * This module defines the records returned by the Telldus APIs (devices and
 * sensors share one shape), the Telldus command bitmask, and the error type
 * used throughout the crate.
 */
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use tellbridge_core::{error::Error as CoreError, types::Id};

use crate::accessory::CharacteristicKind;

/// Error type for device operations
#[derive(Error, Debug)]
pub enum DeviceError {
    /// The vendor API reported an error; the message is passed through as-is
    #[error("Telldus API error: {0}")]
    Api(String),

    /// Authentication against the vendor API failed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Transport error talking to the vendor API
    #[error("HTTP error: {0}")]
    Http(String),

    /// The vendor response could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// The characteristic cannot be written
    #[error("Characteristic {0} is read-only")]
    ReadOnly(CharacteristicKind),

    /// The accessory does not expose the characteristic
    #[error("Characteristic {0} is not supported by this accessory")]
    UnsupportedCharacteristic(CharacteristicKind),

    /// The value does not fit the characteristic
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(CharacteristicKind, String),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

/// Result type for device operations
pub type Result<T> = std::result::Result<T, DeviceError>;

impl DeviceError {
    /// Create a new vendor API error
    pub fn api<S: AsRef<str>>(msg: S) -> Self {
        DeviceError::Api(msg.as_ref().to_string())
    }

    /// Create a new decode error
    pub fn decode<S: AsRef<str>>(msg: S) -> Self {
        DeviceError::Decode(msg.as_ref().to_string())
    }
}

impl From<serde_json::Error> for DeviceError {
    fn from(err: serde_json::Error) -> Self {
        DeviceError::Decode(err.to_string())
    }
}

#[cfg(any(feature = "local", feature = "live"))]
impl From<reqwest::Error> for DeviceError {
    fn from(err: reqwest::Error) -> Self {
        DeviceError::Http(err.to_string())
    }
}

/// Telldus command ("method") bits
pub mod methods {
    /// Turn on
    pub const TURNON: u32 = 1;
    /// Turn off
    pub const TURNOFF: u32 = 2;
    /// Ring a bell
    pub const BELL: u32 = 4;
    /// Toggle
    pub const TOGGLE: u32 = 8;
    /// Dim to a level 0..=255
    pub const DIM: u32 = 16;
    /// Send learn signal
    pub const LEARN: u32 = 32;
    /// Execute a scene
    pub const EXECUTE: u32 = 64;
    /// Move up (open)
    pub const UP: u32 = 128;
    /// Move down (close)
    pub const DOWN: u32 = 256;
    /// Stop moving
    pub const STOP: u32 = 512;

    /// Every command the bridge knows how to drive; requested on listing calls
    pub const SUPPORTED: u32 = TURNON | TURNOFF | DIM | UP | DOWN | STOP;
}

/// State value the vendor uses for "no value"
pub const UNDEFINED_STATE_VALUE: &str = "unde";

/// Listing type of controllable devices
pub const DEVICE_KIND: &str = "device";

/// One named reading of a sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Reading name (`temp`, `humidity`, ...)
    #[serde(default)]
    pub name: Option<String>,

    /// Reading value as sent by the vendor
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub value: Option<String>,

    /// Vendor scale code
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub scale: Option<String>,
}

impl DataPoint {
    /// Create a data point with a name and value
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value.into()),
            scale: None,
        }
    }

    /// Create an unnamed data point
    pub fn unnamed<V: Into<String>>(value: V) -> Self {
        Self {
            name: None,
            value: Some(value.into()),
            scale: None,
        }
    }
}

/// A device or sensor record as returned by the vendor API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorDevice {
    /// Vendor identifier
    pub id: Id,

    /// Display name
    #[serde(default)]
    pub name: Option<String>,

    /// Model string, possibly `model:manufacturer`
    #[serde(default)]
    pub model: Option<String>,

    /// Radio protocol (sensors)
    #[serde(default)]
    pub protocol: Option<String>,

    /// Listing type (`device`, `group`, ...); absent for sensors
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    /// Vendor device-type identifier (UUID-like)
    #[serde(default, rename = "deviceType", alias = "devicetype")]
    pub device_type: Option<String>,

    /// Supported command bitmask
    #[serde(default, deserialize_with = "lenient::number")]
    pub methods: u32,

    /// Current state code (last command applied)
    #[serde(default, deserialize_with = "lenient::number")]
    pub state: u32,

    /// Auxiliary state value (dim level, ...)
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub statevalue: Option<String>,

    /// Sensor readings
    #[serde(default)]
    pub data: Vec<DataPoint>,

    /// When the sensor last reported
    #[serde(
        default,
        rename = "lastUpdated",
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_updated: Option<DateTime<Utc>>,
}

impl VendorDevice {
    /// Create a bare record with an id and a name
    pub fn new<I: Into<Id>, S: Into<String>>(id: I, name: S) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            model: None,
            protocol: None,
            kind: None,
            device_type: None,
            methods: 0,
            state: 0,
            statevalue: None,
            data: Vec::new(),
            last_updated: None,
        }
    }

    /// Set the model string
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the protocol string
    pub fn with_protocol<S: Into<String>>(mut self, protocol: S) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    /// Mark the record as a controllable device with the given command mask
    pub fn as_device(mut self, methods: u32) -> Self {
        self.kind = Some(DEVICE_KIND.to_string());
        self.methods = methods;
        self
    }

    /// Set the device type
    pub fn with_device_type<S: Into<String>>(mut self, device_type: S) -> Self {
        self.device_type = Some(device_type.into());
        self
    }

    /// Set the state code and state value
    pub fn with_state<S: Into<String>>(mut self, state: u32, statevalue: Option<S>) -> Self {
        self.state = state;
        self.statevalue = statevalue.map(Into::into);
        self
    }

    /// Append a sensor reading
    pub fn with_data_point(mut self, point: DataPoint) -> Self {
        self.data.push(point);
        self
    }

    /// The display name, if present and non-empty
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.trim().is_empty())
    }

    /// The state value, unless absent or the undefined sentinel
    pub fn state_value(&self) -> Option<&str> {
        self.statevalue
            .as_deref()
            .filter(|v| *v != UNDEFINED_STATE_VALUE && !v.is_empty())
    }

    /// Whether every bit of `method` is in the supported command mask
    pub fn supports(&self, method: u32) -> bool {
        self.methods & method == method
    }

    /// Whether the record is a controllable device the bridge should load
    pub fn is_controllable(&self) -> bool {
        self.kind.as_deref() == Some(DEVICE_KIND) && self.methods != 0
    }

    /// Find a reading by name, falling back to a fixed position
    pub fn data_point(&self, name: &str, fallback_index: usize) -> Option<&DataPoint> {
        self.data
            .iter()
            .find(|p| p.name.as_deref() == Some(name))
            .or_else(|| self.data.get(fallback_index))
    }
}

impl fmt::Display for VendorDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (id {}, model {})",
            self.name.as_deref().unwrap_or("<unnamed>"),
            self.id,
            self.model.as_deref().unwrap_or("<none>")
        )
    }
}

/// Deserializers for fields the vendor sends as either strings or numbers
mod lenient {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
        Bool(bool),
    }

    pub fn string_or_number<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Option<String>, D::Error> {
        Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
            Raw::Str(s) => s,
            Raw::Int(i) => i.to_string(),
            Raw::Float(f) => f.to_string(),
            Raw::Bool(b) => b.to_string(),
        }))
    }

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u32, D::Error> {
        use serde::de::Error;

        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(0),
            Some(Raw::Int(i)) => u32::try_from(i).map_err(D::Error::custom),
            Some(Raw::Str(s)) if s.trim().is_empty() => Ok(0),
            Some(Raw::Str(s)) => s.trim().parse().map_err(D::Error::custom),
            Some(Raw::Float(f)) => Ok(f as u32),
            Some(Raw::Bool(b)) => Ok(u32::from(b)),
        }
    }
}
