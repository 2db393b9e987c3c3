//! End-to-end tests of the platform over the in-memory Telldus API

use std::sync::Arc;
use std::time::Duration;

use tellbridge_core::config::{BridgeConfig, Config, DeviceOverride, LocalConfig};
use tellbridge_core::types::{Id, Value};
use tellbridge_devices::accessory::{CharacteristicKind, ServiceKind};
use tellbridge_devices::api::memory::{Command, MemoryApi, Operation};
use tellbridge_devices::device::{methods, DataPoint, DeviceError, VendorDevice};
use tellbridge_devices::registry::{device_types, MatchStrategy};
use tellbridge_devices::{AccessoryAdapter, Platform};

fn cloud_config() -> Config {
    Config {
        public_key: Some("pub".into()),
        private_key: Some("priv".into()),
        token: Some("tok".into()),
        token_secret: Some("secret".into()),
        bridge: BridgeConfig {
            dim_delay_ms: 0,
            ..BridgeConfig::default()
        },
        ..Config::default()
    }
}

fn outside() -> VendorDevice {
    VendorDevice::new(1u64, "Outside")
        .with_model("temperature")
        .with_protocol("fineoffset")
        .with_data_point(DataPoint::unnamed("21.5"))
}

fn lamp() -> VendorDevice {
    VendorDevice::new(2u64, "Lamp")
        .with_model("selflearning-dimmer:nexa")
        .as_device(methods::TURNON | methods::TURNOFF | methods::DIM)
        .with_state(methods::DIM, Some("128"))
}

fn outlet() -> VendorDevice {
    VendorDevice::new(3u64, "Heater")
        .with_model("unknown-outlet")
        .with_device_type(device_types::SWITCH_OUTLET)
        .as_device(methods::TURNON | methods::TURNOFF)
        .with_state(methods::TURNON, None::<String>)
}

fn blind() -> VendorDevice {
    VendorDevice::new(4u64, "Blind")
        .with_model("window-covering")
        .as_device(methods::UP | methods::DOWN | methods::STOP)
}

fn find<'a>(accessories: &'a [AccessoryAdapter], name: &str) -> &'a AccessoryAdapter {
    accessories
        .iter()
        .find(|a| a.name() == name)
        .unwrap_or_else(|| panic!("no accessory named {}", name))
}

async fn load(api: &Arc<MemoryApi>, config: Config) -> Vec<AccessoryAdapter> {
    Platform::new(api.clone(), config)
        .load_accessories()
        .await
        .unwrap()
}

#[test_log::test(tokio::test)]
async fn test_sensor_temperature() {
    let api = Arc::new(MemoryApi::new(vec![outside()], vec![]));
    let accessories = load(&api, cloud_config()).await;

    assert_eq!(accessories.len(), 1);
    let sensor = &accessories[0];
    let services = sensor.services();
    assert_eq!(services[1].kind, ServiceKind::TemperatureSensor);
    assert_eq!(
        sensor.get(CharacteristicKind::CurrentTemperature).await.unwrap(),
        Value::Float(21.5)
    );
}

#[test_log::test(tokio::test)]
async fn test_dimmer_brightness() {
    let api = Arc::new(MemoryApi::new(vec![], vec![lamp()]));
    let accessories = load(&api, cloud_config()).await;

    let lamp = find(&accessories, "Lamp");
    assert_eq!(lamp.manufacturer(), "nexa");
    assert_eq!(
        lamp.get(CharacteristicKind::Brightness).await.unwrap(),
        Value::Integer(50)
    );
    assert_eq!(lamp.get(CharacteristicKind::On).await.unwrap(), Value::Bool(true));
}

#[tokio::test]
async fn test_sensors_come_first_and_devices_are_fetched_in_order() {
    let api = Arc::new(MemoryApi::new(
        vec![outside()],
        vec![lamp(), outlet(), blind()],
    ));
    let accessories = load(&api, cloud_config()).await;

    let names: Vec<&str> = accessories.iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["Outside", "Lamp", "Heater", "Blind"]);
    assert_eq!(
        api.info_requests().await,
        vec![Id::from(2u64), Id::from(3u64), Id::from(4u64)]
    );
}

#[tokio::test]
async fn test_disabled_override_omits_device() {
    let api = Arc::new(MemoryApi::new(vec![outside()], vec![lamp(), outlet()]));
    let config = Config {
        unknown_accessories: vec![DeviceOverride {
            id: Some(Id::from(2u64)),
            disabled: true,
            ..Default::default()
        }],
        ..cloud_config()
    };
    let accessories = load(&api, config).await;

    assert!(accessories.iter().all(|a| a.id() != &Id::from(2u64)));
    assert_eq!(accessories.len(), 2);
}

#[tokio::test]
async fn test_nameless_device_is_omitted() {
    let mut nameless = outlet();
    nameless.name = Some(String::new());
    let api = Arc::new(MemoryApi::new(vec![], vec![nameless]));

    assert!(load(&api, cloud_config()).await.is_empty());
}

#[tokio::test]
async fn test_override_name_keeps_nameless_device_omitted() {
    let mut nameless = outlet();
    nameless.name = Some(String::new());
    let api = Arc::new(MemoryApi::new(vec![], vec![nameless]));
    let config = Config {
        unknown_accessories: vec![DeviceOverride {
            id: Some(Id::from(3u64)),
            name: Some("Heater".into()),
            ..Default::default()
        }],
        ..cloud_config()
    };

    assert!(load(&api, config).await.is_empty());
}

#[tokio::test]
async fn test_sensor_model_beats_device_type() {
    let sensor = outside().with_device_type(device_types::LIGHT);
    let api = Arc::new(MemoryApi::new(vec![sensor], vec![]));
    let accessories = load(&api, cloud_config()).await;

    assert_eq!(accessories[0].strategy(), Some(MatchStrategy::ModelOrProtocol));
    assert!(accessories[0].has(CharacteristicKind::CurrentTemperature));
    assert!(!accessories[0].has(CharacteristicKind::On));
}

#[tokio::test]
async fn test_listing_error_aborts() {
    let api = Arc::new(MemoryApi::new(vec![outside()], vec![lamp()]));
    api.fail(Operation::ListSensors).await;

    let result = Platform::new(api.clone(), cloud_config())
        .load_accessories()
        .await;
    assert!(matches!(result, Err(DeviceError::Api(_))));
}

#[tokio::test]
async fn test_device_info_error_aborts() {
    let api = Arc::new(MemoryApi::new(vec![outside()], vec![lamp()]));
    api.fail(Operation::DeviceInfo).await;

    let result = Platform::new(api.clone(), cloud_config())
        .list_accessories()
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_login_failure_aborts_loading() {
    let api = Arc::new(MemoryApi::new(vec![outside()], vec![]));
    api.fail(Operation::Login).await;

    let result = Platform::new(api.clone(), cloud_config())
        .load_accessories()
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_turn_on_lit_dimmer_keeps_level() {
    let api = Arc::new(MemoryApi::new(vec![], vec![lamp()]));
    let accessories = load(&api, cloud_config()).await;
    let lamp = find(&accessories, "Lamp");

    lamp.set(CharacteristicKind::On, Value::Bool(true)).await.unwrap();
    assert!(api.commands().await.is_empty());

    lamp.set(CharacteristicKind::On, Value::Bool(false)).await.unwrap();
    lamp.set(CharacteristicKind::On, Value::Bool(true)).await.unwrap();
    assert_eq!(
        api.commands().await,
        vec![
            Command::OnOff(Id::from(2u64), false),
            Command::OnOff(Id::from(2u64), true)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_brightness_set_dims_and_settles() {
    let api = Arc::new(MemoryApi::new(vec![], vec![lamp()]));
    let mut config = cloud_config();
    config.bridge.dim_delay_ms = 1000;
    let accessories = load(&api, config).await;
    let lamp = find(&accessories, "Lamp");

    let start = tokio::time::Instant::now();
    lamp.set(CharacteristicKind::Brightness, Value::Integer(100))
        .await
        .unwrap();
    assert!(start.elapsed() >= Duration::from_millis(1000));
    assert_eq!(api.commands().await, vec![Command::Dim(Id::from(2u64), 255)]);
}

#[tokio::test]
async fn test_window_covering_caches_target() {
    let api = Arc::new(MemoryApi::new(vec![], vec![blind()]));
    let accessories = load(&api, cloud_config()).await;
    let blind = find(&accessories, "Blind");

    blind
        .set(CharacteristicKind::TargetPosition, Value::Integer(100))
        .await
        .unwrap();
    assert_eq!(
        blind.get(CharacteristicKind::CurrentPosition).await.unwrap(),
        Value::Integer(100)
    );
    assert_eq!(api.commands().await, vec![Command::UpDown(Id::from(4u64), true)]);
}

#[tokio::test]
async fn test_outlet_in_use() {
    let api = Arc::new(MemoryApi::new(vec![], vec![outlet()]));
    let accessories = load(&api, cloud_config()).await;
    let heater = find(&accessories, "Heater");

    assert_eq!(heater.strategy(), Some(MatchStrategy::DeviceType));
    assert_eq!(
        heater.get(CharacteristicKind::OutletInUse).await.unwrap(),
        Value::Bool(true)
    );
    assert_eq!(heater.get(CharacteristicKind::On).await.unwrap(), Value::Bool(true));
}

#[tokio::test]
async fn test_unmapped_device_keeps_identification() {
    let bell = VendorDevice::new(9u64, "Door bell")
        .with_model("bell")
        .as_device(methods::BELL);
    let api = Arc::new(MemoryApi::new(vec![], vec![bell]));
    let accessories = load(&api, cloud_config()).await;

    assert_eq!(accessories.len(), 1);
    assert!(!accessories[0].is_mapped());
    let services = accessories[0].services();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].kind, ServiceKind::AccessoryInformation);
}

#[tokio::test]
async fn test_local_mode_overrides() {
    let api = Arc::new(MemoryApi::new(vec![outside()], vec![lamp()]));
    let config = Config {
        local: Some(LocalConfig {
            ip_address: Some("10.0.0.2".into()),
            access_token: Some("token".into()),
        }),
        unknown_accessories: vec![DeviceOverride {
            local_id: Some(Id::from(2u64)),
            kind: Some("device".into()),
            name: Some("Ceiling".into()),
            ..Default::default()
        }],
        bridge: BridgeConfig {
            dim_delay_ms: 0,
            ..BridgeConfig::default()
        },
        ..Config::default()
    };
    let accessories = load(&api, config).await;

    let names: Vec<&str> = accessories.iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["Outside", "Ceiling"]);
}
