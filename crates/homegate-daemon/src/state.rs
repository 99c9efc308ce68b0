//! Application state management

use anyhow::Result;
use homegate_core::Accessory;
use homegate_registry::{AccessoryHandle, DeviceRegistry, MockDiscovery};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::Config;

/// Shared application state
pub struct AppState {
    /// Device registry
    pub registry: Arc<DeviceRegistry>,
    /// Source used by the discover endpoint
    pub discovery: MockDiscovery,
}

impl AppState {
    /// Create new application state, enumerating the bridge and its
    /// configured accessories into the registry
    pub async fn new(config: &Config) -> Result<Arc<Self>> {
        let registry = Arc::new(DeviceRegistry::new());

        let accessories: Vec<Accessory> = std::iter::once(config.bridge.to_accessory())
            .chain(config.accessories.iter().map(|a| a.to_accessory(&config.bridge)))
            .collect();

        let mut exposed = 0;
        for accessory in accessories {
            let aid = accessory.id;
            let category = accessory.category;
            let handle: AccessoryHandle = Arc::new(Mutex::new(accessory));
            match registry.register_accessory(handle).await {
                Ok(Some(_)) => exposed += 1,
                Ok(None) => info!(aid, category = %category, "Accessory not exposed"),
                Err(e) => warn!(aid, error = %e, "Failed to register accessory"),
            }
        }
        info!(count = exposed, "Accessories enumerated");

        Ok(Arc::new(Self {
            registry,
            discovery: MockDiscovery,
        }))
    }
}
