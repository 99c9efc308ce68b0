//! Configuration loading

use anyhow::Result;
use homegate_core::{Accessory, AccessoryCategory, AccessoryInfo};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// Accessories enumerated into the registry at startup
    #[serde(default, rename = "accessory")]
    pub accessories: Vec<AccessoryConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Bind address for web server
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8082".to_string()
}

/// Identity of the bridge accessory itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_bridge_name")]
    pub name: String,
    #[serde(default = "default_bridge_manufacturer")]
    pub manufacturer: String,
    #[serde(default = "default_bridge_model")]
    pub model: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            name: default_bridge_name(),
            manufacturer: default_bridge_manufacturer(),
            model: default_bridge_model(),
        }
    }
}

fn default_bridge_name() -> String {
    "SmartHome Bridge".to_string()
}

fn default_bridge_manufacturer() -> String {
    "SmartHome".to_string()
}

fn default_bridge_model() -> String {
    "Bridge v1.0".to_string()
}

impl BridgeConfig {
    /// The bridge accessory (aid 1)
    pub fn to_accessory(&self) -> Accessory {
        Accessory::new(
            1,
            AccessoryCategory::Bridge,
            AccessoryInfo {
                name: self.name.clone(),
                manufacturer: self.manufacturer.clone(),
                model: self.model.clone(),
                serial_number: String::new(),
                firmware_revision: env!("CARGO_PKG_VERSION").to_string(),
            },
        )
    }
}

/// A bridged accessory declared in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessoryConfig {
    /// Accessory instance id (aid)
    pub id: u64,
    pub category: AccessoryCategory,
    pub name: String,
    /// Defaults to the bridge manufacturer
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub firmware: Option<String>,
    /// Give a lightbulb a brightness characteristic
    #[serde(default)]
    pub dimmable: bool,
}

impl AccessoryConfig {
    pub fn to_accessory(&self, bridge: &BridgeConfig) -> Accessory {
        let info = AccessoryInfo {
            name: self.name.clone(),
            manufacturer: self
                .manufacturer
                .clone()
                .unwrap_or_else(|| bridge.manufacturer.clone()),
            model: self.model.clone().unwrap_or_default(),
            serial_number: self
                .serial
                .clone()
                .unwrap_or_else(|| format!("HG-{:06}", self.id)),
            firmware_revision: self.firmware.clone().unwrap_or_else(|| "1.0.0".to_string()),
        };

        let accessory = Accessory::for_category(self.id, self.category, info);
        if self.dimmable {
            accessory.with_brightness(100)
        } else {
            accessory
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}
