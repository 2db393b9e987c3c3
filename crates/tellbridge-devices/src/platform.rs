/*!
 * Platform controller.
 *
 * Entry point of the bridge: authenticates against the vendor API, lists
 * sensors and devices, and turns every accepted record into an
 * [`AccessoryAdapter`].
 */
use futures::try_join;
use tracing::{debug, error, info, Instrument};

use tellbridge_core::{
    config::{Credentials, SharedConfig},
    logging::operation_span,
};

use crate::adapter::AccessoryAdapter;
use crate::api::SharedApi;
use crate::device::{Result, VendorDevice};
use crate::registry::ModelRegistry;
use crate::resolver::{resolve, ResolvedDevice};

/// The bridge platform
#[derive(Debug)]
pub struct Platform {
    api: SharedApi,
    config: SharedConfig,
    registry: ModelRegistry,
}

impl Platform {
    /// Create a platform over an API client and a configuration
    pub fn new<C: Into<SharedConfig>>(api: SharedApi, config: C) -> Self {
        Self {
            api,
            config: config.into(),
            registry: ModelRegistry::new(),
        }
    }

    /// Replace the model registry
    pub fn with_registry(mut self, registry: ModelRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// The shared API client
    pub fn api(&self) -> &SharedApi {
        &self.api
    }

    /// The model registry
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Authenticate with the cloud API
    ///
    /// Returns the account e-mail, or `None` in local mode where the bearer
    /// token needs no login.
    pub async fn login(&self) -> Result<Option<String>> {
        match self.config.get().credentials()? {
            Credentials::Local { host, .. } => {
                debug!("Local mode, using TellStick at {}", host);
                Ok(None)
            }
            Credentials::Live {
                token,
                token_secret,
                ..
            } => match self.api.login(&token, &token_secret).await {
                Ok(email) => {
                    info!("Logged in with user {}", email);
                    Ok(Some(email))
                }
                Err(e) => {
                    error!("Failed to log in: {}", e);
                    Err(e)
                }
            },
        }
    }

    /// List every accessory the bridge exposes
    ///
    /// Sensors come first, then controllable devices. Device details are
    /// fetched one at a time; any failed call aborts the listing.
    pub async fn list_accessories(&self) -> Result<Vec<AccessoryAdapter>> {
        let span = operation_span("list accessories", self.api.name());

        async move {
            let (sensors, devices) = try_join!(self.api.list_sensors(), self.api.list_devices())?;
            debug!("Listed {} sensors and {} devices", sensors.len(), devices.len());

            let mut accessories: Vec<AccessoryAdapter> = sensors
                .into_iter()
                .filter_map(|sensor| self.accept(sensor))
                .map(|sensor| self.adapter(sensor))
                .collect();

            for device in devices.into_iter().filter(VendorDevice::is_controllable) {
                let mut info = self.api.device_info(&device.id).await?;
                if info.kind.is_none() {
                    info.kind = device.kind;
                }
                if let Some(resolved) = self.accept(info) {
                    accessories.push(self.adapter(resolved));
                }
            }

            Ok(accessories)
        }
        .instrument(span)
        .await
    }

    /// Log in, then list accessories
    pub async fn load_accessories(&self) -> Result<Vec<AccessoryAdapter>> {
        self.login().await?;

        match self.list_accessories().await {
            Ok(accessories) => {
                info!("Loaded {} accessories", accessories.len());
                Ok(accessories)
            }
            Err(e) => {
                error!("Failed to load accessories: {}", e);
                Err(e)
            }
        }
    }

    fn accept(&self, device: VendorDevice) -> Option<ResolvedDevice> {
        let config = self.config.get();
        resolve(device, &config.unknown_accessories, config.is_local())
    }

    fn adapter(&self, device: ResolvedDevice) -> AccessoryAdapter {
        debug!("Creating accessory {} ({})", device.name, device.id);
        let local = self.config.get().is_local();
        AccessoryAdapter::new(device, &self.registry, self.api.clone(), local)
            .with_dim_delay(self.config.get().dim_delay())
    }
}
