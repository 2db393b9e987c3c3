/*!
 * Value codec.
 *
 * Pure conversions between Telldus state encodings and accessory value
 * ranges. Nothing here talks to the network.
 */
use crate::device::{methods, VendorDevice};

/// Data point name of temperature readings
pub const TEMPERATURE_TAG: &str = "temp";
/// Data point name of humidity readings
pub const HUMIDITY_TAG: &str = "humidity";

const TEMPERATURE_INDEX: usize = 0;
const HUMIDITY_INDEX: usize = 1;

/// Security system state codes
pub mod security {
    /// Armed, night mode; also reported when the state is unknown
    pub const NIGHT_ARM: u8 = 2;
    /// Disarmed
    pub const DISARMED: u8 = 3;
}

/// Position state reported for emulated window coverings
pub const POSITION_STOPPED: u8 = 2;

/// Convert a 0..=255 dim level to a 0..=100 percentage
pub fn bits_to_percentage(value: u8) -> u8 {
    (f64::from(value) / 255.0 * 100.0).round() as u8
}

/// Convert a 0..=100 percentage to a 0..=255 dim level
///
/// Values above 100 saturate at 255.
pub fn percentage_to_bits(value: u8) -> u8 {
    (f64::from(value.min(100)) * 255.0 / 100.0).round() as u8
}

/// Power state: anything but the last command being "off" counts as on
pub fn decode_on(device: &VendorDevice) -> bool {
    device.state != methods::TURNOFF
}

/// Brightness percentage of a dimmer
///
/// Fully on reads as 100, a dimmed state reads its level, anything else
/// (off, undefined level, garbage) reads as 0.
pub fn decode_brightness(device: &VendorDevice) -> u8 {
    match device.state {
        methods::TURNON => 100,
        methods::DIM => device
            .state_value()
            .and_then(parse_level)
            .map(bits_to_percentage)
            .unwrap_or(0),
        _ => 0,
    }
}

/// Contact sensor state: 1 (contact not detected) when the last event was "on"
pub fn decode_contact(device: &VendorDevice) -> u8 {
    u8::from(device.state == methods::TURNON)
}

/// Security system state
///
/// "off" means disarmed, a dimmed state carries the alarm state code in its
/// value, anything else is reported as armed (night).
pub fn decode_security(device: &VendorDevice) -> u8 {
    match device.state {
        methods::TURNOFF => security::DISARMED,
        methods::DIM => device
            .state_value()
            .and_then(parse_level)
            .unwrap_or(security::NIGHT_ARM),
        _ => security::NIGHT_ARM,
    }
}

/// Temperature reading; NaN when missing or unparseable
pub fn decode_temperature(sensor: &VendorDevice) -> f64 {
    read_data_point(sensor, TEMPERATURE_TAG, TEMPERATURE_INDEX)
}

/// Relative humidity reading; NaN when missing or unparseable
pub fn decode_humidity(sensor: &VendorDevice) -> f64 {
    read_data_point(sensor, HUMIDITY_TAG, HUMIDITY_INDEX)
}

/// A reading that is not a number is reported as 0
pub fn or_zero(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

fn read_data_point(sensor: &VendorDevice, tag: &str, index: usize) -> f64 {
    sensor
        .data_point(tag, index)
        .and_then(|p| p.value.as_deref())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

fn parse_level(value: &str) -> Option<u8> {
    let value = value.trim();
    value
        .parse::<u8>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().map(|f| f.clamp(0.0, 255.0).round() as u8))
}
