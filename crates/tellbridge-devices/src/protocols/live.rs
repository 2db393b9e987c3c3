/*!
 * Telldus Live cloud API client.
 *
 * Requests are signed with OAuth 1.0a (HMAC-SHA1) using the consumer key
 * pair from the configuration and the token pair passed to `login`.
 */
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use serde_json::Value as Json;
use sha1::Sha1;
use tokio::sync::RwLock;
use tracing::{debug, info, trace};
use url::Url;

use tellbridge_core::types::Id;

use super::{
    decode_listing, decode_record, decode_status, http_client, read_reply, DEVICE_LIST_KEY,
    SENSOR_LIST_KEY,
};
use crate::api::{ApiOptions, TelldusApi};
use crate::device::{DeviceError, Result, VendorDevice};

/// Default Telldus Live JSON API root
pub const DEFAULT_BASE_URL: &str = "https://pa-api.telldus.com/json/";

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, Clone)]
struct TokenPair {
    token: String,
    secret: String,
}

#[derive(Debug, Deserialize)]
struct Profile {
    #[serde(default)]
    email: Option<String>,
}

/// Telldus Live API client
#[derive(Debug)]
pub struct LiveApiClient {
    base_url: Url,
    public_key: String,
    private_key: String,
    tokens: RwLock<Option<TokenPair>>,
    options: ApiOptions,
    http: reqwest::Client,
}

impl LiveApiClient {
    /// Create a client for the public Telldus Live endpoint
    pub fn new<S: Into<String>>(public_key: S, private_key: S, options: ApiOptions) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, public_key, private_key, options)
    }

    /// Create a client for a custom API root
    pub fn with_base_url<S: Into<String>>(
        base_url: &str,
        public_key: S,
        private_key: S,
        options: ApiOptions,
    ) -> Result<Self> {
        let base = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&base)
            .map_err(|e| DeviceError::Http(format!("Invalid API address {}: {}", base, e)))?;

        Ok(Self {
            base_url,
            public_key: public_key.into(),
            private_key: private_key.into(),
            tokens: RwLock::new(None),
            http: http_client(&options)?,
            options,
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Json> {
        let tokens = self
            .tokens
            .read()
            .await
            .clone()
            .ok_or_else(|| DeviceError::Authentication("Not logged in".to_string()))?;
        self.signed_get(path, query, &tokens).await
    }

    async fn signed_get(
        &self,
        path: &str,
        query: &[(&str, String)],
        tokens: &TokenPair,
    ) -> Result<Json> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| DeviceError::Http(e.to_string()))?;

        let mut oauth = vec![
            ("oauth_consumer_key", self.public_key.clone()),
            ("oauth_nonce", nonce()),
            ("oauth_signature_method", "HMAC-SHA1".to_string()),
            ("oauth_timestamp", chrono::Utc::now().timestamp().to_string()),
            ("oauth_token", tokens.token.clone()),
            ("oauth_version", "1.0".to_string()),
        ];

        let params: Vec<(&str, &str)> = query
            .iter()
            .chain(oauth.iter())
            .map(|(k, v)| (*k, v.as_str()))
            .collect();
        let signature = sign(
            "GET",
            url.as_str(),
            &params,
            &self.private_key,
            &tokens.secret,
        )?;
        oauth.push(("oauth_signature", signature));

        let authorization = format!(
            "OAuth {}",
            oauth
                .iter()
                .map(|(k, v)| format!("{}=\"{}\"", k, urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join(", ")
        );
        trace!("GET {} {:?}", url, query);

        let response = self
            .http
            .get(url)
            .query(query)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await?;
        read_reply(response).await
    }

    async fn command(&self, path: &str, query: &[(&str, String)]) -> Result<()> {
        debug!("Live command {} {:?}", path, query);
        decode_status(&self.get(path, query).await?)
    }

    fn methods(&self) -> String {
        self.options.supported_methods.to_string()
    }
}

/// Compute an OAuth 1.0a HMAC-SHA1 signature
fn sign(
    method: &str,
    url: &str,
    params: &[(&str, &str)],
    consumer_secret: &str,
    token_secret: &str,
) -> Result<String> {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (urlencoding::encode(k).into_owned(), urlencoding::encode(v).into_owned()))
        .collect();
    encoded.sort();
    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let base = format!(
        "{}&{}&{}",
        method,
        urlencoding::encode(url),
        urlencoding::encode(&normalized)
    );
    let key = format!(
        "{}&{}",
        urlencoding::encode(consumer_secret),
        urlencoding::encode(token_secret)
    );

    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| DeviceError::Authentication(e.to_string()))?;
    mac.update(base.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[async_trait]
impl TelldusApi for LiveApiClient {
    fn name(&self) -> &'static str {
        "live"
    }

    async fn login(&self, token: &str, token_secret: &str) -> Result<String> {
        let tokens = TokenPair {
            token: token.to_string(),
            secret: token_secret.to_string(),
        };

        let body = self
            .signed_get("user/profile", &[], &tokens)
            .await
            .map_err(|e| match e {
                DeviceError::Api(message) | DeviceError::Http(message) => {
                    DeviceError::Authentication(message)
                }
                other => other,
            })?;
        let profile: Profile = decode_record(body)?;
        let email = profile
            .email
            .ok_or_else(|| DeviceError::Authentication("Profile has no e-mail".to_string()))?;

        *self.tokens.write().await = Some(tokens);
        info!("Logged in to Telldus Live as {}", email);
        Ok(email)
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
    use wiremock::matchers::{header_regex, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> LiveApiClient {
        LiveApiClient::with_base_url(&server.uri(), "public", "private", ApiOptions::default())
            .unwrap()
    }

    #[test]
    fn test_sign_known_vector() {
        let params = [
            ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
            ("include_entities", "true"),
            ("oauth_consumer_key", "xvz1evFS4wEEPTGEFPHBog"),
            ("oauth_nonce", "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1318622958"),
            ("oauth_token", "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb"),
            ("oauth_version", "1.0"),
        ];
        let signature = sign(
            "POST",
            "https://api.twitter.com/1.1/statuses/update.json",
            &params,
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
            "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
        )
        .unwrap();
        assert_eq!(signature, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn test_nonce() {
        let a = nonce();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, nonce());
    }

    #[tokio::test]
    async fn test_requires_login() {
        let server = MockServer::start().await;
        let err = client(&server).list_devices().await.unwrap_err();
        assert!(matches!(err, DeviceError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_login_and_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/profile"))
            .and(header_regex(
                "authorization",
                r#"^OAuth oauth_consumer_key="public", .*oauth_token="token".*oauth_signature=""#,
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"email": "me@example.com"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sensors/list"))
            .and(query_param("includeValues", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sensor": [{"id": "1", "name": "Outside", "model": "temperature",
                            "data": [{"name": "temp", "value": "21.5"}]}]
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        assert_eq!(client.login("token", "secret").await.unwrap(), "me@example.com");

        let sensors = client.list_sensors().await.unwrap();
        assert_eq!(sensors.len(), 1);
        assert_eq!(sensors[0].id, Id::from("1"));
    }

    #[tokio::test]
    async fn test_login_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "Invalid token"})))
            .mount(&server)
            .await;

        let client = client(&server);
        let err = client.login("bad", "bad").await.unwrap_err();
        assert!(matches!(err, DeviceError::Authentication(ref m) if m == "Invalid token"));
        assert!(matches!(
            client.list_sensors().await,
            Err(DeviceError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_up_down_command() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"email": "me@example.com"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/device/down"))
            .and(query_param("id", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        client.login("token", "secret").await.unwrap();
        client.up_down(&Id::from(5u64), false).await.unwrap();
    }
}
