//! Discovery sources
//!
//! Real mDNS browsing belongs to the HAP stack; the registry only needs
//! something that yields would-be-discovered devices.

use homegate_core::AccessoryCategory;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// A device seen during discovery but not yet paired
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub category: AccessoryCategory,
    pub model: String,
    pub manufacturer: String,
    pub paired: bool,
}

/// Something that can enumerate unpaired devices
pub trait DiscoverySource: Send + Sync {
    fn discover(&self) -> impl Future<Output = Vec<DiscoveredDevice>> + Send;
}

/// Fixed placeholder source
#[derive(Debug, Clone, Copy, Default)]
pub struct MockDiscovery;

impl DiscoverySource for MockDiscovery {
    async fn discover(&self) -> Vec<DiscoveredDevice> {
        vec![
            DiscoveredDevice {
                id: "homekit_light_001".to_string(),
                name: "Living Room Light".to_string(),
                category: AccessoryCategory::Lightbulb,
                model: "Philips Hue".to_string(),
                manufacturer: "Signify".to_string(),
                paired: false,
            },
            DiscoveredDevice {
                id: "homekit_switch_001".to_string(),
                name: "Bedroom Switch".to_string(),
                category: AccessoryCategory::Switch,
                model: "Eve Energy".to_string(),
                manufacturer: "Elgato".to_string(),
                paired: false,
            },
        ]
    }
}
