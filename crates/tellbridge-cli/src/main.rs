/*!
 * tellbridge command line.
 *
 * Loads the bridge configuration, connects to the Telldus API it selects and
 * lists, reads or writes accessories the way a hosting runtime would.
 */
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use tellbridge_core::config::{Config, ConfigBuilder, Credentials};
use tellbridge_core::logging;
use tellbridge_core::types::Value;
use tellbridge_devices::api::{ApiOptions, SharedApi};
use tellbridge_devices::protocols::{LiveApiClient, LocalApiClient};
use tellbridge_devices::{AccessoryAdapter, CharacteristicKind, Platform};

/// Prefix of configuration environment variables
const ENV_PREFIX: &str = "TELLBRIDGE";

#[derive(Parser, Debug)]
#[command(name = "tellbridge", version, about = "Expose Telldus devices as HomeKit-style accessories")]
struct Cli {
    /// Configuration file (JSON, TOML or YAML)
    #[arg(short, long, env = "TELLBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, overrides the configured level (e.g. `debug`, `tellbridge_devices=trace`)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every accessory and its services
    List {
        /// Print the services as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Read a characteristic
    Get {
        /// Vendor id of the accessory
        id: String,
        /// Characteristic name (e.g. On, Brightness, CurrentTemperature)
        characteristic: CharacteristicKind,
    },
    /// Write a characteristic
    Set {
        /// Vendor id of the accessory
        id: String,
        /// Characteristic name (e.g. On, Brightness, TargetPosition)
        characteristic: CharacteristicKind,
        /// New value: true/false or a number
        value: String,
    },
    /// Log an identification greeting from an accessory
    Identify {
        /// Vendor id of the accessory
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = ConfigBuilder::new().with_environment_prefix(ENV_PREFIX);
    if let Some(path) = &cli.config {
        builder = builder.with_config_file(path);
    }
    let config = builder.build().context("Failed to load configuration")?;

    match &cli.log_level {
        Some(filter) => logging::init_with_filter(filter)?,
        None => logging::init_from_config(&config.logging)?,
    }
    tellbridge_devices::init()?;

    let api = build_api(&config)?;
    let platform = Platform::new(api, config);
    let accessories = platform.load_accessories().await?;

    match cli.command {
        Command::List { json } => list(&accessories, json)?,
        Command::Get { id, characteristic } => {
            let value = find(&accessories, &id)?.get(characteristic).await?;
            println!("{}", value);
        }
        Command::Set {
            id,
            characteristic,
            value,
        } => {
            find(&accessories, &id)?
                .set(characteristic, parse_value(&value))
                .await?;
            println!("ok");
        }
        Command::Identify { id } => find(&accessories, &id)?.identify(),
    }

    Ok(())
}

/// Create the API client for the configured mode
fn build_api(config: &Config) -> Result<SharedApi> {
    let options = ApiOptions::default().with_timeout(config.request_timeout());

    let api: SharedApi = match config.credentials()? {
        Credentials::Local { host, access_token } => {
            Arc::new(LocalApiClient::new(&host, access_token, options)?)
        }
        Credentials::Live {
            public_key,
            private_key,
            ..
        } => Arc::new(LiveApiClient::new(public_key, private_key, options)?),
    };
    debug!("Using the {} API", api.name());
    Ok(api)
}

fn find<'a>(accessories: &'a [AccessoryAdapter], id: &str) -> Result<&'a AccessoryAdapter> {
    accessories
        .iter()
        .find(|a| a.id().as_str() == id)
        .ok_or_else(|| anyhow!("No accessory with id {}", id))
}

fn list(accessories: &[AccessoryAdapter], json: bool) -> Result<()> {
    if json {
        let listing: Vec<_> = accessories
            .iter()
            .map(|a| {
                serde_json::json!({
                    "id": a.id().as_str(),
                    "name": a.name(),
                    "services": a.services(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for accessory in accessories {
        let services: Vec<String> = accessory
            .services()
            .iter()
            .skip(1)
            .map(|s| s.kind.to_string())
            .collect();
        println!(
            "{:>6}  {:<24} {}/{}  [{}]",
            accessory.id().as_str(),
            accessory.name(),
            accessory.model(),
            accessory.manufacturer(),
            services.join(", ")
        );
    }
    Ok(())
}

/// Interpret a command line value
fn parse_value(raw: &str) -> Value {
    let raw = raw.trim();
    match raw.to_ascii_lowercase().as_str() {
        "true" | "on" => return Value::Bool(true),
        "false" | "off" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::Float(f);
    }
    Value::from(raw)
}
