/*!
 * Vendor API boundary for tellbridge.
 *
 * This module defines the async trait every Telldus API client implements,
 * plus an in-memory implementation used by tests and dry runs.
 */
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tellbridge_core::types::Id;

use crate::device::{methods, Result, VendorDevice};

/// Default timeout for one vendor request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client options shared by the HTTP implementations
#[derive(Debug, Clone)]
pub struct ApiOptions {
    /// Timeout for a single request
    pub timeout: Duration,
    /// Command mask sent as `supportedMethods`
    pub supported_methods: u32,
}

impl ApiOptions {
    /// Creates a new instance with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the command mask requested on listing and info calls
    pub fn with_supported_methods(mut self, mask: u32) -> Self {
        self.supported_methods = mask;
        self
    }
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            supported_methods: methods::SUPPORTED,
        }
    }
}

/// A Telldus API client
///
/// Every call is a single remote request. Errors reported by the vendor are
/// returned as [`DeviceError::Api`](crate::device::DeviceError::Api) with the
/// vendor message unchanged.
#[async_trait]
pub trait TelldusApi: Send + Sync + Debug {
    /// Short name of the client, for logging
    fn name(&self) -> &'static str;

    /// Authenticate with an OAuth token pair; returns the account e-mail
    async fn login(&self, token: &str, token_secret: &str) -> Result<String>;

    /// List all sensors with their latest readings
    async fn list_sensors(&self) -> Result<Vec<VendorDevice>>;

    /// List all devices
    async fn list_devices(&self) -> Result<Vec<VendorDevice>>;

    /// Fetch the current record of one device
    async fn device_info(&self, id: &Id) -> Result<VendorDevice>;

    /// Fetch the current record of one sensor
    async fn sensor_info(&self, id: &Id) -> Result<VendorDevice>;

    /// Turn a device on or off
    async fn on_off(&self, id: &Id, on: bool) -> Result<()>;

    /// Dim a device to a level in 0..=255
    async fn dim(&self, id: &Id, level: u8) -> Result<()>;

    /// Move a device up (open) or down (close)
    async fn up_down(&self, id: &Id, up: bool) -> Result<()>;
}

/// API client shared by the platform and every accessory
pub type SharedApi = Arc<dyn TelldusApi>;

/// In-memory Telldus API
pub mod memory {
    use std::collections::HashSet;

    use tokio::sync::RwLock;
    use tracing::debug;

    use super::*;
    use crate::device::DeviceError;

    /// A command received by [`MemoryApi`]
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Command {
        /// `on_off`
        OnOff(Id, bool),
        /// `dim`
        Dim(Id, u8),
        /// `up_down`
        UpDown(Id, bool),
    }

    /// Operations that can be made to fail
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Operation {
        /// `login`
        Login,
        /// `list_sensors`
        ListSensors,
        /// `list_devices`
        ListDevices,
        /// `device_info`
        DeviceInfo,
        /// `sensor_info`
        SensorInfo,
        /// Any command
        Command,
    }

    #[derive(Debug, Default)]
    struct State {
        sensors: Vec<VendorDevice>,
        devices: Vec<VendorDevice>,
        commands: Vec<Command>,
        info_requests: Vec<Id>,
        failing: HashSet<Operation>,
    }

    /// Vendor API backed by in-memory records
    ///
    /// Commands update the stored device state the way a TellStick does and
    /// are recorded for inspection.
    #[derive(Debug, Default)]
    pub struct MemoryApi {
        email: String,
        state: RwLock<State>,
    }

    impl MemoryApi {
        /// Create an API with the given listings
        pub fn new(sensors: Vec<VendorDevice>, devices: Vec<VendorDevice>) -> Self {
            Self {
                email: "user@example.com".to_string(),
                state: RwLock::new(State {
                    sensors,
                    devices,
                    ..Default::default()
                }),
            }
        }

        /// Make an operation fail with a vendor error
        pub async fn fail(&self, operation: Operation) {
            self.state.write().await.failing.insert(operation);
        }

        /// Commands received so far
        pub async fn commands(&self) -> Vec<Command> {
            self.state.read().await.commands.clone()
        }

        /// Ids passed to `device_info`, in call order
        pub async fn info_requests(&self) -> Vec<Id> {
            self.state.read().await.info_requests.clone()
        }

        /// Replace the stored record of a device or sensor
        pub async fn update(&self, record: VendorDevice) {
            let mut state = self.state.write().await;
            let list = if record.kind.is_some() {
                &mut state.devices
            } else {
                &mut state.sensors
            };
            match list.iter().position(|d| d.id == record.id) {
                Some(index) => list[index] = record,
                None => list.push(record),
            }
        }

        async fn check(&self, operation: Operation) -> Result<()> {
            if self.state.read().await.failing.contains(&operation) {
                return Err(DeviceError::api(format!("{:?} failed", operation)));
            }
            Ok(())
        }

        async fn command(&self, command: Command) -> Result<()> {
            self.check(Operation::Command).await?;
            debug!("Memory API command {:?}", command);

            let mut state = self.state.write().await;
            let (id, code, value) = match &command {
                Command::OnOff(id, on) => {
                    (id, if *on { methods::TURNON } else { methods::TURNOFF }, None)
                }
                Command::Dim(id, level) => (id, methods::DIM, Some(level.to_string())),
                Command::UpDown(id, up) => (id, if *up { methods::UP } else { methods::DOWN }, None),
            };
            let device = state
                .devices
                .iter_mut()
                .find(|d| &d.id == id)
                .ok_or_else(|| DeviceError::api(format!("Device {} not found", id)))?;
            device.state = code;
            device.statevalue = value;

            state.commands.push(command);
            Ok(())
        }
    }

    #[async_trait]
    impl TelldusApi for MemoryApi {
        fn name(&self) -> &'static str {
            "memory"
        }

        async fn login(&self, _token: &str, _token_secret: &str) -> Result<String> {
            self.check(Operation::Login).await?;
            Ok(self.email.clone())
        }

        async fn list_sensors(&self) -> Result<Vec<VendorDevice>> {
            self.check(Operation::ListSensors).await?;
            Ok(self.state.read().await.sensors.clone())
        }

        async fn list_devices(&self) -> Result<Vec<VendorDevice>> {
            self.check(Operation::ListDevices).await?;
            Ok(self.state.read().await.devices.clone())
        }

        async fn device_info(&self, id: &Id) -> Result<VendorDevice> {
            self.check(Operation::DeviceInfo).await?;
            let mut state = self.state.write().await;
            state.info_requests.push(id.clone());
            state
                .devices
                .iter()
                .find(|d| &d.id == id)
                .cloned()
                .ok_or_else(|| DeviceError::api(format!("Device {} not found", id)))
        }

        async fn sensor_info(&self, id: &Id) -> Result<VendorDevice> {
            self.check(Operation::SensorInfo).await?;
            self.state
                .read()
                .await
                .sensors
                .iter()
                .find(|d| &d.id == id)
                .cloned()
                .ok_or_else(|| DeviceError::api(format!("Sensor {} not found", id)))
        }

        async fn on_off(&self, id: &Id, on: bool) -> Result<()> {
            self.command(Command::OnOff(id.clone(), on)).await
        }

        async fn dim(&self, id: &Id, level: u8) -> Result<()> {
            self.command(Command::Dim(id.clone(), level)).await
        }

        async fn up_down(&self, id: &Id, up: bool) -> Result<()> {
            self.command(Command::UpDown(id.clone(), up)).await
        }
    }

}
