/*!
 * Accessory adapter.
 *
 * One adapter per accepted vendor record. It builds the accessory's service
 * list from the registry match and relays characteristic reads and writes
 * to the vendor API, one remote call per operation.
 */
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn, Instrument};

use tellbridge_core::{
    logging::{accessory_span, operation_span, Span},
    types::{Id, Value},
    utils::throttled,
};

use crate::accessory::{
    Characteristic, CharacteristicKind, CharacteristicProps, Service, ServiceKind,
    ServiceTemplate, ValueFormat,
};
use crate::api::SharedApi;
use crate::codec;
use crate::device::{DeviceError, Result, VendorDevice};
use crate::registry::{MatchStrategy, ModelRegistry};
use crate::resolver::ResolvedDevice;

/// Default delay after a dim command
pub const DEFAULT_DIM_DELAY: Duration = Duration::from_millis(1000);

const IDENTIFICATION: [CharacteristicKind; 4] = [
    CharacteristicKind::Manufacturer,
    CharacteristicKind::Model,
    CharacteristicKind::SerialNumber,
    CharacteristicKind::Name,
];

/// A vendor device exposed as an accessory
pub struct AccessoryAdapter {
    device: ResolvedDevice,
    templates: &'static [ServiceTemplate],
    strategy: Option<MatchStrategy>,
    props: BTreeMap<CharacteristicKind, CharacteristicProps>,
    api: SharedApi,
    dim_delay: Duration,
    target_position: Mutex<u8>,
}

impl AccessoryAdapter {
    /// Create the adapter for a resolved device
    ///
    /// Devices the registry does not know are still exposed with the
    /// identification service only, and a diagnostic is logged. `local`
    /// selects how the diagnostic tells the user to key an override.
    pub fn new(
        device: ResolvedDevice,
        registry: &ModelRegistry,
        api: SharedApi,
        local: bool,
    ) -> Self {
        let found = registry.resolve(&device);
        if found.is_none() {
            warn!("{}", unmapped_diagnostic(&device, registry, local));
        }

        let templates = found.map(|m| m.templates).unwrap_or(&[]);
        let props = IDENTIFICATION
            .iter()
            .chain(templates.iter().flat_map(|t| t.characteristics.iter()))
            .map(|kind| (*kind, kind.props()))
            .collect();

        Self {
            device,
            templates,
            strategy: found.map(|m| m.strategy),
            props,
            api,
            dim_delay: DEFAULT_DIM_DELAY,
            target_position: Mutex::new(0),
        }
    }

    /// Set the delay applied after dim commands
    pub fn with_dim_delay(mut self, delay: Duration) -> Self {
        self.dim_delay = delay;
        self
    }

    /// Override the value format the host expects for a characteristic
    pub fn with_format(mut self, kind: CharacteristicKind, format: ValueFormat) -> Self {
        if let Some(props) = self.props.get_mut(&kind) {
            *props = props.with_format(format);
        }
        self
    }

    /// Vendor identifier, also the serial number
    pub fn id(&self) -> &Id {
        &self.device.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.device.name
    }

    /// Resolved model
    pub fn model(&self) -> &str {
        &self.device.model
    }

    /// Resolved manufacturer
    pub fn manufacturer(&self) -> &str {
        &self.device.manufacturer
    }

    /// The vendor record the accessory was built from
    pub fn device(&self) -> &VendorDevice {
        &self.device.device
    }

    /// How the registry matched the device, if it did
    pub fn strategy(&self) -> Option<MatchStrategy> {
        self.strategy
    }

    /// Whether the accessory exposes anything beyond identification
    pub fn is_mapped(&self) -> bool {
        !self.templates.is_empty()
    }

    /// Whether the accessory exposes a characteristic
    pub fn has(&self, kind: CharacteristicKind) -> bool {
        self.props.contains_key(&kind)
    }

    /// Properties of an exposed characteristic
    pub fn props(&self, kind: CharacteristicKind) -> Option<CharacteristicProps> {
        self.props.get(&kind).copied()
    }

    /// The identification service followed by the function services
    pub fn services(&self) -> Vec<Service> {
        let identification = Service {
            kind: ServiceKind::AccessoryInformation,
            characteristics: IDENTIFICATION
                .iter()
                .map(|kind| self.characteristic(*kind, self.identification(*kind)))
                .collect(),
        };

        std::iter::once(identification)
            .chain(self.templates.iter().map(|t| Service {
                kind: t.service,
                characteristics: t
                    .characteristics
                    .iter()
                    .map(|kind| self.characteristic(*kind, self.initial_value(*kind)))
                    .collect(),
            }))
            .collect()
    }

    fn characteristic(&self, kind: CharacteristicKind, value: Option<Value>) -> Characteristic {
        Characteristic {
            kind,
            props: self.props(kind).unwrap_or_else(|| kind.props()),
            value,
        }
    }

    fn identification(&self, kind: CharacteristicKind) -> Option<Value> {
        match kind {
            CharacteristicKind::Manufacturer => Some(Value::from(self.manufacturer())),
            CharacteristicKind::Model => Some(Value::from(self.model())),
            CharacteristicKind::SerialNumber => Some(Value::from(self.id().as_str())),
            CharacteristicKind::Name => Some(Value::from(self.name())),
            _ => None,
        }
    }

    /// Value to seed a characteristic with, decoded from the listing record
    ///
    /// Only identification, On and Brightness are known without a remote
    /// call.
    pub fn initial_value(&self, kind: CharacteristicKind) -> Option<Value> {
        let props = self.props(kind)?;
        match kind {
            CharacteristicKind::On => Some(props.format.encode_bool(codec::decode_on(self.device()))),
            CharacteristicKind::Brightness => Some(
                props
                    .format
                    .encode_number(f64::from(codec::decode_brightness(self.device()))),
            ),
            kind if kind.is_identification() => self.identification(kind),
            _ => None,
        }
    }

    /// Identify the accessory
    pub fn identify(&self) {
        info!("Hi! I am {} ({})", self.name(), self.id());
    }

    /// Read a characteristic
    pub async fn get(&self, kind: CharacteristicKind) -> Result<Value> {
        let props = self
            .props(kind)
            .ok_or(DeviceError::UnsupportedCharacteristic(kind))?;
        let span = self.operation_span(&format!("get {}", kind));

        async move {
            let value = self.read(kind, props).await;
            match &value {
                Ok(v) => debug!("Get {} = {}", kind, v),
                Err(e) => warn!("Get {} failed: {}", kind, e),
            }
            value
        }
        .instrument(span)
        .await
    }

    /// Write a characteristic
    pub async fn set(&self, kind: CharacteristicKind, value: Value) -> Result<()> {
        let props = self
            .props(kind)
            .ok_or(DeviceError::UnsupportedCharacteristic(kind))?;
        if !props.writable {
            return Err(DeviceError::ReadOnly(kind));
        }
        let span = self.operation_span(&format!("set {}", kind));

        async move {
            debug!("Set {} = {}", kind, value);
            let result = self.write(kind, props, &value).await;
            if let Err(e) = &result {
                warn!("Set {} failed: {}", kind, e);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn read(&self, kind: CharacteristicKind, props: CharacteristicProps) -> Result<Value> {
        use CharacteristicKind::*;

        let value = match kind {
            On => props.format.encode_bool(codec::decode_on(&self.fetch_device().await?)),
            Brightness => props
                .format
                .encode_number(f64::from(codec::decode_brightness(&self.fetch_device().await?))),
            ContactSensorState => props
                .format
                .encode_number(f64::from(codec::decode_contact(&self.fetch_device().await?))),
            SecuritySystemCurrentState | SecuritySystemTargetState => {
                let code = f64::from(codec::decode_security(&self.fetch_device().await?));
                let code = if props.in_bounds(code) {
                    code
                } else {
                    debug!("Security state {} out of range", code);
                    f64::from(codec::security::NIGHT_ARM)
                };
                props.format.encode_number(code)
            }
            CurrentTemperature | TargetTemperature => {
                let reading = codec::decode_temperature(&self.fetch_sensor().await?);
                props.format.encode_number(props.sanitize(reading))
            }
            CurrentRelativeHumidity => {
                let reading = codec::decode_humidity(&self.fetch_sensor().await?);
                props.format.encode_number(props.sanitize(reading))
            }
            CurrentPosition | TargetPosition => {
                props.format.encode_number(f64::from(*self.target_position.lock().await))
            }
            PositionState => props.format.encode_number(f64::from(codec::POSITION_STOPPED)),
            OutletInUse => props.format.encode_bool(true),
            Manufacturer | Model | SerialNumber | Name => self
                .identification(kind)
                .ok_or(DeviceError::UnsupportedCharacteristic(kind))?,
        };
        Ok(value)
    }

    async fn write(
        &self,
        kind: CharacteristicKind,
        props: CharacteristicProps,
        value: &Value,
    ) -> Result<()> {
        use CharacteristicKind::*;

        match kind {
            On => {
                let on = value
                    .as_bool()
                    .ok_or_else(|| invalid(kind, value))?;
                let current = self.fetch_device().await?;
                if on && self.has(Brightness) && codec::decode_on(&current) {
                    debug!("Already on, keeping the current dim level");
                    return Ok(());
                }
                self.api.on_off(self.id(), on).await
            }
            Brightness => {
                let level = codec::percentage_to_bits(bounded(kind, props, value)?);
                throttled(self.dim_delay, self.api.dim(self.id(), level)).await
            }
            SecuritySystemCurrentState | SecuritySystemTargetState => {
                let code = bounded(kind, props, value)?;
                self.api.dim(self.id(), code).await
            }
            TargetPosition => {
                let target = bounded(kind, props, value)?;
                *self.target_position.lock().await = target;
                self.api.up_down(self.id(), target > 0).await
            }
            _ => Err(DeviceError::ReadOnly(kind)),
        }
    }

    async fn fetch_device(&self) -> Result<VendorDevice> {
        self.api.device_info(self.id()).await
    }

    async fn fetch_sensor(&self) -> Result<VendorDevice> {
        let sensor = self.api.sensor_info(self.id()).await?;
        if let Some(updated) = sensor.last_updated {
            debug!("Sensor {} last reported at {}", sensor.id, updated);
        }
        Ok(sensor)
    }

    /// Tracing span covering this accessory
    pub fn span(&self) -> Span {
        accessory_span(self.name(), Some(self.id().as_str()))
    }

    fn operation_span(&self, name: &str) -> Span {
        self.span().in_scope(|| operation_span(name, self.name()))
    }
}

impl fmt::Debug for AccessoryAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessoryAdapter")
            .field("id", &self.device.id)
            .field("name", &self.device.name)
            .field("model", &self.device.model)
            .field("strategy", &self.strategy)
            .field("api", &self.api.name())
            .finish()
    }
}

fn invalid(kind: CharacteristicKind, value: &Value) -> DeviceError {
    DeviceError::InvalidValue(kind, value.to_string())
}

/// Integer value within the characteristic bounds
fn bounded(kind: CharacteristicKind, props: CharacteristicProps, value: &Value) -> Result<u8> {
    let number = value.as_integer().ok_or_else(|| invalid(kind, value))?;
    if !props.in_bounds(number as f64) {
        return Err(invalid(kind, value));
    }
    u8::try_from(number).map_err(|_| invalid(kind, value))
}

/// Message logged for devices the registry cannot map
///
/// The suggested override uses the keys the active mode matches on: `id`
/// for the cloud, `local_id` and `type` for a local TellStick.
pub fn unmapped_diagnostic(
    device: &ResolvedDevice,
    registry: &ModelRegistry,
    local: bool,
) -> String {
    let key = if local {
        format!(
            "\"local_id\": {}, \"type\": {}",
            device.id,
            device
                .device
                .kind
                .as_deref()
                .map_or_else(|| "null".to_string(), |kind| format!("{:?}", kind))
        )
    } else {
        format!("\"id\": {}", device.id)
    };
    format!(
        "Unknown model {:?} for device {} ({}). The device is exposed without services. \
         Valid models are: {}. To set the model manually, add to the configuration:\n\
         \"unknown_accessories\": [{{ {}, \"model\": \"MODEL\", \"manufacturer\": \"unknown\" }}]",
        device.model,
        device.name,
        device.id,
        registry.known_models().join(", "),
        key
    )
}
