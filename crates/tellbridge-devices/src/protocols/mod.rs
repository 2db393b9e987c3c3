/*!
 * Telldus API clients for tellbridge.
 *
 * This module contains the HTTP implementations of [`TelldusApi`](crate::api::TelldusApi)
 * and the response handling they share.
 */
use serde::de::DeserializeOwned;
use serde_json::Value as Json;

use crate::api::ApiOptions;
use crate::device::{DeviceError, Result, VendorDevice};

#[cfg(feature = "live")]
pub mod live;
#[cfg(feature = "local")]
pub mod local;

#[cfg(feature = "live")]
pub use live::LiveApiClient;
#[cfg(feature = "local")]
pub use local::LocalApiClient;

/// Listing key of device replies
pub(crate) const DEVICE_LIST_KEY: &str = "device";
/// Listing key of sensor replies
pub(crate) const SENSOR_LIST_KEY: &str = "sensor";

/// Build the HTTP client used by both implementations
pub(crate) fn http_client(options: &ApiOptions) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(options.timeout).build()?)
}

/// Read a reply body, turning vendor `{"error": ...}` replies into errors
///
/// The vendor sometimes reports errors with a 200 status, so the body is
/// inspected before the status code.
pub(crate) async fn read_reply(response: reqwest::Response) -> Result<Json> {
    let status = response.status();
    let text = response.text().await?;

    let body: Option<Json> = serde_json::from_str(&text).ok();
    if let Some(message) = body.as_ref().and_then(vendor_error) {
        return Err(DeviceError::Api(message));
    }
    if !status.is_success() {
        return Err(DeviceError::Http(format!("Unexpected status {}", status)));
    }

    body.ok_or_else(|| DeviceError::decode(format!("Reply is not JSON: {}", text)))
}

fn vendor_error(body: &Json) -> Option<String> {
    match body.get("error")? {
        Json::String(message) => Some(message.clone()),
        Json::Null => None,
        other => Some(other.to_string()),
    }
}

/// Decode a `{"device": [...]}` or `{"sensor": [...]}` listing
pub(crate) fn decode_listing(body: Json, key: &str) -> Result<Vec<VendorDevice>> {
    match body {
        Json::Object(mut map) => match map.remove(key) {
            Some(Json::Null) | None => Ok(Vec::new()),
            Some(list) => Ok(serde_json::from_value(list)?),
        },
        other => Err(DeviceError::decode(format!(
            "Expected a {} listing, got {}",
            key, other
        ))),
    }
}

/// Decode a single record
pub(crate) fn decode_record<T: DeserializeOwned>(body: Json) -> Result<T> {
    Ok(serde_json::from_value(body)?)
}

/// Check a command reply for `{"status": "success"}`
pub(crate) fn decode_status(body: &Json) -> Result<()> {
    match body.get("status").and_then(Json::as_str) {
        Some("success") => Ok(()),
        Some(other) => Err(DeviceError::api(format!("Command failed: {}", other))),
        None => Err(DeviceError::decode(format!("Missing command status in {}", body))),
    }
}
