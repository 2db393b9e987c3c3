/*!
 * Local TellStick REST API client.
 *
 * Talks to `http://<host>/api/` with a bearer token issued by the TellStick.
 */
use async_trait::async_trait;
use serde_json::Value as Json;
use tracing::{debug, trace};
use url::Url;

use tellbridge_core::types::Id;

use super::{
    decode_listing, decode_record, decode_status, http_client, read_reply, DEVICE_LIST_KEY,
    SENSOR_LIST_KEY,
};
use crate::api::{ApiOptions, TelldusApi};
use crate::device::{DeviceError, Result, VendorDevice};

/// Local TellStick API client
#[derive(Debug)]
pub struct LocalApiClient {
    base_url: Url,
    access_token: String,
    options: ApiOptions,
    http: reqwest::Client,
}

impl LocalApiClient {
    /// Create a client for a TellStick on the local network
    ///
    /// `host` is an IP address or host name; a full `http://` URL is also
    /// accepted.
    pub fn new<S: Into<String>>(host: &str, access_token: S, options: ApiOptions) -> Result<Self> {
        let base = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", host.trim_end_matches('/'))
        };
        let base_url = Url::parse(&format!("{}/api/", base))
            .map_err(|e| DeviceError::Http(format!("Invalid TellStick address {}: {}", host, e)))?;

        Ok(Self {
            base_url,
            access_token: access_token.into(),
            http: http_client(&options)?,
            options,
        })
    }

    /// The API root requests are made against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Json> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| DeviceError::Http(e.to_string()))?;
        trace!("GET {} {:?}", url, query);

        let response = self
            .http
            .get(url)
            .query(query)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        read_reply(response).await
    }

    async fn command(&self, path: &str, query: &[(&str, String)]) -> Result<()> {
        debug!("Local command {} {:?}", path, query);
        decode_status(&self.get(path, query).await?)
    }

    fn methods(&self) -> String {
        self.options.supported_methods.to_string()
    }
}

#[async_trait]
impl TelldusApi for LocalApiClient {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn login(&self, _token: &str, _token_secret: &str) -> Result<String> {
        // the bearer token is the only credential
        Ok(self.base_url.host_str().unwrap_or_default().to_string())
    }

    async fn list_sensors(&self) -> Result<Vec<VendorDevice>> {
        let body = self
            .get("sensors/list", &[("includeValues", "1".to_string())])
            .await?;
        decode_listing(body, SENSOR_LIST_KEY)
    }

    async fn list_devices(&self) -> Result<Vec<VendorDevice>> {
        let body = self
            .get(
                "devices/list",
                &[
                    ("supportedMethods", self.methods()),
                    ("extras", "devicetype".to_string()),
                ],
            )
            .await?;
        decode_listing(body, DEVICE_LIST_KEY)
    }

    async fn device_info(&self, id: &Id) -> Result<VendorDevice> {
        let body = self
            .get(
                "device/info",
                &[
                    ("id", id.to_string()),
                    ("supportedMethods", self.methods()),
                    ("extras", "devicetype".to_string()),
                ],
            )
            .await?;
        decode_record(body)
    }

    async fn sensor_info(&self, id: &Id) -> Result<VendorDevice> {
        let body = self.get("sensor/info", &[("id", id.to_string())]).await?;
        decode_record(body)
    }

    async fn on_off(&self, id: &Id, on: bool) -> Result<()> {
        let path = if on { "device/turnOn" } else { "device/turnOff" };
        self.command(path, &[("id", id.to_string())]).await
    }

    async fn dim(&self, id: &Id, level: u8) -> Result<()> {
        self.command(
            "device/dim",
            &[("id", id.to_string()), ("level", level.to_string())],
        )
        .await
    }

    async fn up_down(&self, id: &Id, up: bool) -> Result<()> {
        let path = if up { "device/up" } else { "device/down" };
        self.command(path, &[("id", id.to_string())]).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::device::methods;

    async fn client(server: &MockServer) -> LocalApiClient {
        LocalApiClient::new(&server.uri(), "secret", ApiOptions::default()).unwrap()
    }

    #[test]
    fn test_base_url() {
        let client = LocalApiClient::new("192.168.1.20", "t", ApiOptions::default()).unwrap();
        assert_eq!(client.base_url().as_str(), "http://192.168.1.20/api/");

        let client = LocalApiClient::new("http://tellstick.lan/", "t", ApiOptions::default()).unwrap();
        assert_eq!(client.base_url().as_str(), "http://tellstick.lan/api/");
    }

    #[tokio::test]
    async fn test_list_devices() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/devices/list"))
            .and(query_param("supportedMethods", "915"))
            .and(query_param("extras", "devicetype"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "device": [
                    {"id": 2, "name": "Lamp", "type": "device", "methods": 19,
                     "state": 16, "statevalue": "128", "deviceType": "00000005-0001-1000-2005-ACCA54000000"},
                    {"id": 3, "name": "Group", "type": "group", "methods": 3}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let devices = client(&server).await.list_devices().await.unwrap();
        assert_eq!(devices.len(), 2);
        assert!(devices[0].supports(methods::DIM));
        assert!(!devices[1].is_controllable());
    }

    #[tokio::test]
    async fn test_sensor_info() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/sensor/info"))
            .and(query_param("id", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1, "name": "Outside", "protocol": "fineoffset",
                "model": "temperaturehumidity",
                "data": [{"name": "temp", "value": "21.5"}, {"name": "humidity", "value": "60"}]
            })))
            .mount(&server)
            .await;

        let sensor = client(&server).await.sensor_info(&Id::from(1u64)).await.unwrap();
        assert_eq!(sensor.display_name(), Some("Outside"));
        assert_eq!(sensor.data.len(), 2);
    }

    #[tokio::test]
    async fn test_dim_command() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/device/dim"))
            .and(query_param("id", "2"))
            .and(query_param("level", "128"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).await.dim(&Id::from(2u64), 128).await.unwrap();
    }

    #[tokio::test]
    async fn test_vendor_error_passes_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/device/turnOn"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"error": "Device \"9\" not found!"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .on_off(&Id::from(9u64), true)
            .await
            .unwrap_err();
        match err {
            DeviceError::Api(message) => assert_eq!(message, "Device \"9\" not found!"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/sensors/list"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let err = client(&server).await.list_sensors().await.unwrap_err();
        assert!(matches!(err, DeviceError::Http(_)));
    }
}
