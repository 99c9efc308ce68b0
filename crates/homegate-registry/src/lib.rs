//! Homegate Registry - Concurrent device registry for the gateway
//!
//! This crate owns all shared mutable state:
//! - Registry records for paired and enumerated devices
//! - Live accessory handles, with per-accessory command serialization
//! - The non-reentrant discovery guard

pub mod discovery;
pub mod record;
pub mod registry;

pub use discovery::{DiscoveredDevice, DiscoverySource, MockDiscovery};
pub use record::{DeviceRecord, ServiceInfo};
pub use registry::{AccessoryHandle, DeviceRegistry, RegistryError, RegistryEvent};
