use std::sync::Arc;

use tellbridge_core::config::{Config, LocalConfig};
use tellbridge_core::types::Value;
use tellbridge_devices::api::memory::MemoryApi;
use tellbridge_devices::device::{methods, DataPoint, VendorDevice};
use tellbridge_devices::registry::device_types;
use tellbridge_devices::{CharacteristicKind, Platform};

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize the logger
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // A TellStick with one sensor and three devices
    let sensors = vec![VendorDevice::new(1u64, "Outside")
        .with_model("temperaturehumidity")
        .with_protocol("fineoffset")
        .with_data_point(DataPoint::new("temp", "21.5"))
        .with_data_point(DataPoint::new("humidity", "60"))];
    let devices = vec![
        VendorDevice::new(2u64, "Lamp")
            .with_model("selflearning-dimmer:nexa")
            .as_device(methods::TURNON | methods::TURNOFF | methods::DIM)
            .with_state(methods::DIM, Some("128")),
        VendorDevice::new(3u64, "Heater")
            .with_device_type(device_types::SWITCH_OUTLET)
            .as_device(methods::TURNON | methods::TURNOFF),
        VendorDevice::new(4u64, "Door bell")
            .with_model("bell")
            .as_device(methods::BELL),
    ];
    let api = Arc::new(MemoryApi::new(sensors, devices));

    // Local mode needs no login
    let config = Config {
        local: Some(LocalConfig {
            ip_address: Some("192.168.1.20".to_string()),
            access_token: Some("demo".to_string()),
        }),
        ..Config::default()
    };
    let platform = Platform::new(api.clone(), config);
    let accessories = platform.load_accessories().await?;

    for accessory in &accessories {
        let services: Vec<String> = accessory
            .services()
            .iter()
            .map(|s| s.kind.to_string())
            .collect();
        info!("{} ({}): {}", accessory.name(), accessory.id(), services.join(", "));
    }

    // Read and write a few characteristics
    let outside = &accessories[0];
    info!(
        "Outside temperature: {}",
        outside.get(CharacteristicKind::CurrentTemperature).await?
    );

    let lamp = &accessories[1];
    info!("Lamp brightness: {}", lamp.get(CharacteristicKind::Brightness).await?);
    lamp.set(CharacteristicKind::Brightness, Value::Integer(75)).await?;
    info!("Lamp brightness: {}", lamp.get(CharacteristicKind::Brightness).await?);
    lamp.identify();

    info!("Commands sent: {:?}", api.commands().await);
    Ok(())
}
