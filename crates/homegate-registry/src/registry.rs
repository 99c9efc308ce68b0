//! Concurrent device registry
//!
//! One reader/writer lock guards the record map and the parallel map of
//! live accessory handles. Every mutation holds the write lock for a single
//! map operation only. Command execution waits on the target accessory
//! without holding the map, then applies the command and refreshes the
//! cached record under the write lock, so commands on one device never
//! interleave and a removed device is never mutated.

use homegate_core::{assemble, Accessory, CommandError, Params};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info};

use crate::discovery::{DiscoveredDevice, DiscoverySource};
use crate::record::{DeviceRecord, ServiceInfo};

/// Shared handle to a live accessory owned by the HAP stack
pub type AccessoryHandle = Arc<Mutex<Accessory>>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),
    #[error("Device {0} has no live accessory")]
    AccessoryNotFound(String),
    #[error("Characteristic {characteristic} not found on device {device}")]
    CharacteristicNotFound {
        device: String,
        characteristic: String,
    },
    #[error("Device already exists: {0}")]
    AlreadyExists(String),
    #[error("Discovery already in progress")]
    DiscoveryInProgress,
    #[error(transparent)]
    Command(#[from] CommandError),
}

impl RegistryError {
    /// Whether this error means a device or characteristic is missing
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotFound(_) | Self::AccessoryNotFound(_) | Self::CharacteristicNotFound { .. }
        )
    }
}

/// Registry change notifications
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// Device paired or enumerated
    DeviceAdded(DeviceRecord),
    /// Characteristic set or command executed
    DeviceUpdated(DeviceRecord),
    DeviceUnpaired(String),
    DeviceRemoved(String),
    DiscoveryStarted,
    DiscoveryCompleted { found: usize },
}

#[derive(Default)]
struct Inner {
    devices: HashMap<String, DeviceRecord>,
    accessories: HashMap<String, AccessoryHandle>,
}

/// Device registry service
pub struct DeviceRegistry {
    inner: RwLock<Inner>,
    discovering: AtomicBool,
    event_tx: broadcast::Sender<RegistryEvent>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            inner: RwLock::new(Inner::default()),
            discovering: AtomicBool::new(false),
            event_tx,
        }
    }

    /// Subscribe to registry events
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.event_tx.subscribe()
    }

    /// Snapshot of all records, ordered by id
    pub async fn list(&self) -> Vec<DeviceRecord> {
        let mut devices: Vec<_> = self.inner.read().await.devices.values().cloned().collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        devices
    }

    pub async fn get(&self, id: &str) -> Result<DeviceRecord, RegistryError> {
        self.inner
            .read()
            .await
            .devices
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::DeviceNotFound(id.to_string()))
    }

    /// Insert a standalone record; ids are never overwritten
    pub async fn register(&self, record: DeviceRecord) -> Result<(), RegistryError> {
        {
            let mut inner = self.inner.write().await;
            if inner.devices.contains_key(&record.id) {
                return Err(RegistryError::AlreadyExists(record.id));
            }
            inner.devices.insert(record.id.clone(), record.clone());
        }

        info!(device = %record.id, "Device registered");
        let _ = self.event_tx.send(RegistryEvent::DeviceAdded(record));
        Ok(())
    }

    /// Pair a device by id, creating its standalone record.
    ///
    /// The setup code is handed to the HAP stack, which owns pairing
    /// security; the registry does not inspect it.
    pub async fn pair(&self, id: &str, name: &str) -> Result<DeviceRecord, RegistryError> {
        let record = DeviceRecord::paired(id, name);
        self.register(record.clone()).await?;
        Ok(record)
    }

    /// Register a live accessory enumerated from the HAP stack.
    ///
    /// Accessories without a canonical type are skipped and yield `None`.
    pub async fn register_accessory(
        &self,
        handle: AccessoryHandle,
    ) -> Result<Option<DeviceRecord>, RegistryError> {
        let (category, descriptor) = {
            let accessory = handle.lock().await;
            (accessory.category, assemble(&accessory))
        };
        let Some(descriptor) = descriptor else {
            debug!(category = %category, "Skipping accessory without canonical type");
            return Ok(None);
        };

        let record = DeviceRecord::from_descriptor(category, descriptor);
        {
            let mut inner = self.inner.write().await;
            if inner.devices.contains_key(&record.id) {
                return Err(RegistryError::AlreadyExists(record.id));
            }
            inner.devices.insert(record.id.clone(), record.clone());
            inner.accessories.insert(record.id.clone(), handle);
        }

        info!(device = %record.id, name = %record.name, "Accessory registered");
        let _ = self.event_tx.send(RegistryEvent::DeviceAdded(record.clone()));
        Ok(Some(record))
    }

    /// Clear the paired flag, keeping the record. Returns whether the device existed.
    pub async fn unpair(&self, id: &str) -> bool {
        let found = match self.inner.write().await.devices.get_mut(id) {
            Some(device) => {
                device.paired = false;
                true
            }
            None => false,
        };

        if found {
            info!(device = %id, "Device unpaired");
            let _ = self.event_tx.send(RegistryEvent::DeviceUnpaired(id.to_string()));
        }
        found
    }

    /// Remove a record and its live accessory. Returns whether the device existed.
    pub async fn remove(&self, id: &str) -> bool {
        let removed = {
            let mut inner = self.inner.write().await;
            let had_accessory = inner.accessories.remove(id).is_some();
            inner.devices.remove(id).is_some() || had_accessory
        };

        if removed {
            info!(device = %id, "Device removed from registry");
            let _ = self.event_tx.send(RegistryEvent::DeviceRemoved(id.to_string()));
        }
        removed
    }

    pub async fn characteristics(&self, id: &str) -> Result<BTreeMap<String, Value>, RegistryError> {
        Ok(self.get(id).await?.characteristics)
    }

    pub async fn characteristic(&self, id: &str, name: &str) -> Result<Value, RegistryError> {
        let inner = self.inner.read().await;
        let device = inner
            .devices
            .get(id)
            .ok_or_else(|| RegistryError::DeviceNotFound(id.to_string()))?;
        device
            .characteristics
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::CharacteristicNotFound {
                device: id.to_string(),
                characteristic: name.to_string(),
            })
    }

    /// Upsert a characteristic value and mark the device as seen
    pub async fn set_characteristic(
        &self,
        id: &str,
        name: &str,
        value: Value,
    ) -> Result<DeviceRecord, RegistryError> {
        let record = {
            let mut inner = self.inner.write().await;
            let device = inner
                .devices
                .get_mut(id)
                .ok_or_else(|| RegistryError::DeviceNotFound(id.to_string()))?;
            device.characteristics.insert(name.to_string(), value);
            device.touch();
            device.clone()
        };

        debug!(device = %id, characteristic = %name, "Characteristic updated");
        let _ = self.event_tx.send(RegistryEvent::DeviceUpdated(record.clone()));
        Ok(record)
    }

    /// Service groups for a device, derived from its native category
    pub async fn services(&self, id: &str) -> Result<Vec<ServiceInfo>, RegistryError> {
        let record = self.get(id).await?;
        Ok(ServiceInfo::for_category(record.category))
    }

    /// Execute an abstract command against the device's live accessory,
    /// then refresh the cached record from the accessory's new state.
    pub async fn execute_command(
        &self,
        id: &str,
        command: &str,
        params: &Params,
    ) -> Result<DeviceRecord, RegistryError> {
        let handle = {
            let inner = self.inner.read().await;
            if !inner.devices.contains_key(id) {
                return Err(RegistryError::DeviceNotFound(id.to_string()));
            }
            inner
                .accessories
                .get(id)
                .cloned()
                .ok_or_else(|| RegistryError::AccessoryNotFound(id.to_string()))?
        };

        let mut accessory = handle.lock().await;
        let record = {
            // The device may have been removed while we waited for the
            // accessory; check again before anything is applied.
            let mut inner = self.inner.write().await;
            let registered = inner
                .accessories
                .get(id)
                .is_some_and(|current| Arc::ptr_eq(current, &handle));
            let device = match inner.devices.get_mut(id) {
                Some(device) if registered => device,
                _ => return Err(RegistryError::DeviceNotFound(id.to_string())),
            };

            homegate_core::execute(&mut accessory, command, params)?;
            match assemble(&accessory) {
                Some(descriptor) => device.refresh(descriptor),
                None => device.touch(),
            }
            device.clone()
        };
        drop(accessory);

        debug!(device = %id, command = %command, "Command executed");
        let _ = self.event_tx.send(RegistryEvent::DeviceUpdated(record.clone()));
        Ok(record)
    }

    /// Run discovery, rejecting overlapping runs instead of queueing them
    pub async fn discover<S: DiscoverySource>(
        &self,
        source: &S,
    ) -> Result<Vec<DiscoveredDevice>, RegistryError> {
        let _guard = DiscoveryGuard::acquire(&self.discovering)?;
        let _ = self.event_tx.send(RegistryEvent::DiscoveryStarted);
        info!("Starting device discovery");

        let discovered = source.discover().await;

        info!(found = discovered.len(), "Discovery complete");
        let _ = self.event_tx.send(RegistryEvent::DiscoveryCompleted {
            found: discovered.len(),
        });
        Ok(discovered)
    }

    /// Whether a discovery run is in flight
    pub fn is_discovering(&self) -> bool {
        self.discovering.load(Ordering::Acquire)
    }
}

/// Holds the discovering flag; clears it on drop, including when the
/// discovering future is cancelled.
struct DiscoveryGuard<'a>(&'a AtomicBool);

impl<'a> DiscoveryGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, RegistryError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| RegistryError::DiscoveryInProgress)
    }
}

impl Drop for DiscoveryGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::MockDiscovery;
    use homegate_core::{AccessoryCategory, AccessoryInfo};
    use serde_json::json;
    use tokio::sync::Notify;

    fn handle(accessory: Accessory) -> AccessoryHandle {
        Arc::new(Mutex::new(accessory))
    }

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => Params::new(),
        }
    }

    async fn registry_with_bulb() -> (DeviceRegistry, AccessoryHandle) {
        let registry = DeviceRegistry::new();
        let bulb = handle(
            Accessory::for_category(2, AccessoryCategory::Lightbulb, AccessoryInfo::named("Kitchen"))
                .with_brightness(100),
        );
        registry.register_accessory(bulb.clone()).await.unwrap();
        (registry, bulb)
    }

    /// Discovery source that blocks until released
    #[derive(Default)]
    struct GatedDiscovery {
        entered: Notify,
        release: Notify,
    }

    impl DiscoverySource for GatedDiscovery {
        async fn discover(&self) -> Vec<DiscoveredDevice> {
            self.entered.notify_one();
            self.release.notified().await;
            Vec::new()
        }
    }

    #[tokio::test]
    async fn test_pair_and_get() {
        let registry = DeviceRegistry::new();
        registry.pair("homekit_light_001", "Desk Lamp").await.unwrap();

        let record = registry.get("homekit_light_001").await.unwrap();
        assert_eq!(record.name, "Desk Lamp");
        assert!(record.paired);
        assert_eq!(registry.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_pair_rejected() {
        let registry = DeviceRegistry::new();
        registry.pair("dev", "First").await.unwrap();
        let err = registry.pair("dev", "Second").await.unwrap_err();
        assert_eq!(err, RegistryError::AlreadyExists("dev".to_string()));
        assert_eq!(registry.get("dev").await.unwrap().name, "First");
    }

    #[tokio::test]
    async fn test_get_missing() {
        let registry = DeviceRegistry::new();
        let err = registry.get("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_remove_then_get() {
        let (registry, _bulb) = registry_with_bulb().await;
        assert!(registry.remove("homekit:2").await);
        assert!(matches!(
            registry.get("homekit:2").await,
            Err(RegistryError::DeviceNotFound(_))
        ));
        let err = registry.execute_command("homekit:2", "turn_on", &Params::new()).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!registry.remove("homekit:2").await);
    }

    #[tokio::test]
    async fn test_unpair_keeps_record() {
        let registry = DeviceRegistry::new();
        registry.pair("dev", "Lamp").await.unwrap();
        assert!(registry.unpair("dev").await);
        let record = registry.get("dev").await.unwrap();
        assert!(!record.paired);
        assert!(!registry.unpair("missing").await);
    }

    #[tokio::test]
    async fn test_characteristics() {
        let registry = DeviceRegistry::new();
        registry.pair("dev", "Lamp").await.unwrap();

        let all = registry.characteristics("dev").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(registry.characteristic("dev", "on").await.unwrap(), json!(false));

        let err = registry.characteristic("dev", "hue").await.unwrap_err();
        assert!(matches!(err, RegistryError::CharacteristicNotFound { .. }));
        let err = registry.characteristic("other", "on").await.unwrap_err();
        assert!(matches!(err, RegistryError::DeviceNotFound(_)));
    }

    #[tokio::test]
    async fn test_set_characteristic_updates_last_seen() {
        let registry = DeviceRegistry::new();
        registry.pair("dev", "Lamp").await.unwrap();
        let before = registry.get("dev").await.unwrap().last_seen;

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let record = registry.set_characteristic("dev", "brightness", json!(42)).await.unwrap();

        assert!(record.last_seen > before);
        assert_eq!(registry.characteristic("dev", "brightness").await.unwrap(), json!(42));
    }

    #[tokio::test]
    async fn test_set_characteristic_missing_device() {
        let registry = DeviceRegistry::new();
        let err = registry.set_characteristic("ghost", "on", json!(true)).await.unwrap_err();
        assert_eq!(err, RegistryError::DeviceNotFound("ghost".to_string()));
    }

    #[tokio::test]
    async fn test_register_accessory_skips_unmapped() {
        let registry = DeviceRegistry::new();
        let bridge = handle(Accessory::for_category(1, AccessoryCategory::Bridge, AccessoryInfo::default()));
        assert!(registry.register_accessory(bridge).await.unwrap().is_none());
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_register_accessory_duplicate() {
        let (registry, bulb) = registry_with_bulb().await;
        let err = registry.register_accessory(bulb).await.unwrap_err();
        assert_eq!(err, RegistryError::AlreadyExists("homekit:2".to_string()));
    }

    #[tokio::test]
    async fn test_execute_command_refreshes_record() {
        let (registry, bulb) = registry_with_bulb().await;

        let record = registry.execute_command("homekit:2", "turn_on", &Params::new()).await.unwrap();
        assert_eq!(record.characteristics["state"], json!(true));
        assert_eq!(bulb.lock().await.lightbulb.as_ref().map(|l| l.on), Some(true));

        let record = registry
            .execute_command("homekit:2", "set_brightness", &params(json!({"brightness": 150})))
            .await
            .unwrap();
        assert_eq!(record.characteristics["brightness"], json!(150));

        let record = registry.execute_command("homekit:2", "toggle", &Params::new()).await.unwrap();
        assert_eq!(record.characteristics["state"], json!(false));
        assert_eq!(registry.get("homekit:2").await.unwrap(), record);
    }

    #[tokio::test]
    async fn test_execute_command_on_paired_record() {
        let registry = DeviceRegistry::new();
        registry.pair("demo", "Demo").await.unwrap();
        let err = registry.execute_command("demo", "turn_on", &Params::new()).await.unwrap_err();
        assert_eq!(err, RegistryError::AccessoryNotFound("demo".to_string()));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_execute_command_errors_pass_through() {
        let (registry, _bulb) = registry_with_bulb().await;

        let err = registry.execute_command("homekit:2", "dance", &Params::new()).await.unwrap_err();
        assert_eq!(err, RegistryError::Command(CommandError::UnknownCommand("dance".to_string())));

        let err = registry.execute_command("homekit:2", "lock", &Params::new()).await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Command(CommandError::UnsupportedCommand { .. })
        ));
    }

    #[tokio::test]
    async fn test_execute_command_updates_last_seen() {
        let (registry, _bulb) = registry_with_bulb().await;
        let before = registry.get("homekit:2").await.unwrap().last_seen;

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let record = registry.execute_command("homekit:2", "turn_on", &Params::new()).await.unwrap();

        assert!(record.last_seen > before);
        assert_eq!(registry.get("homekit:2").await.unwrap().last_seen, record.last_seen);
    }

    #[tokio::test]
    async fn test_remove_during_command_leaves_accessory_untouched() {
        let (registry, bulb) = registry_with_bulb().await;
        let registry = Arc::new(registry);

        let held = bulb.lock().await;
        let pending = {
            let registry = registry.clone();
            tokio::spawn(async move {
                registry.execute_command("homekit:2", "turn_on", &Params::new()).await
            })
        };
        // Let the command resolve its handle and block on the accessory.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(registry.remove("homekit:2").await);
        drop(held);

        let err = pending.await.unwrap().unwrap_err();
        assert_eq!(err, RegistryError::DeviceNotFound("homekit:2".to_string()));
        assert_eq!(bulb.lock().await.lightbulb.as_ref().map(|l| l.on), Some(false));
    }

    #[tokio::test]
    async fn test_concurrent_toggles_serialize() {
        let (registry, bulb) = registry_with_bulb().await;
        let registry = Arc::new(registry);

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..10 {
            let registry = registry.clone();
            tasks.spawn(async move {
                registry.execute_command("homekit:2", "toggle", &Params::new()).await
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        // An even number of toggles ends where it started.
        assert_eq!(bulb.lock().await.lightbulb.as_ref().map(|l| l.on), Some(false));
        assert_eq!(registry.characteristic("homekit:2", "state").await.unwrap(), json!(false));
    }

    #[tokio::test]
    async fn test_services() {
        let (registry, _bulb) = registry_with_bulb().await;
        let services = registry.services("homekit:2").await.unwrap();
        assert_eq!(services[0].service_type, "lightbulb");
        assert!(registry.services("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_discovery_conflict() {
        let registry = Arc::new(DeviceRegistry::new());
        let source = Arc::new(GatedDiscovery::default());

        let first = {
            let registry = registry.clone();
            let source = source.clone();
            tokio::spawn(async move { registry.discover(source.as_ref()).await })
        };
        source.entered.notified().await;
        assert!(registry.is_discovering());

        let err = registry.discover(&MockDiscovery).await.unwrap_err();
        assert_eq!(err, RegistryError::DiscoveryInProgress);

        source.release.notify_one();
        assert!(first.await.unwrap().unwrap().is_empty());
        assert!(!registry.is_discovering());

        let found = registry.discover(&MockDiscovery).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_discovery_releases_guard() {
        let registry = DeviceRegistry::new();
        let source = GatedDiscovery::default();
        {
            let run = registry.discover(&source);
            tokio::pin!(run);
            tokio::select! {
                _ = &mut run => panic!("gated discovery finished early"),
                _ = source.entered.notified() => {}
            }
            assert!(registry.is_discovering());
        }
        assert!(!registry.is_discovering());
        assert!(registry.discover(&MockDiscovery).await.is_ok());
    }

    #[tokio::test]
    async fn test_events() {
        let registry = DeviceRegistry::new();
        let mut rx = registry.subscribe();

        registry.pair("dev", "Lamp").await.unwrap();
        registry.remove("dev").await;

        assert!(matches!(rx.recv().await.unwrap(), RegistryEvent::DeviceAdded(r) if r.id == "dev"));
        assert!(matches!(rx.recv().await.unwrap(), RegistryEvent::DeviceRemoved(id) if id == "dev"));
    }
}
