//! Registry record types

use chrono::{DateTime, Utc};
use homegate_core::{AccessoryCategory, DeviceDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A device as tracked by the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: String,
    pub name: String,
    /// Native accessory category
    #[serde(rename = "type")]
    pub category: AccessoryCategory,
    pub model: String,
    pub manufacturer: String,
    pub firmware_version: String,
    pub paired: bool,
    pub reachable: bool,
    /// Named characteristic values, settable independently of any live accessory
    pub characteristics: BTreeMap<String, Value>,
    pub last_seen: DateTime<Utc>,
    /// Canonical descriptor, present only for records backed by a live accessory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<DeviceDescriptor>,
}

impl DeviceRecord {
    /// Create the standalone record produced by pairing.
    ///
    /// Paired records are not backed by a live accessory.
    pub fn paired(id: &str, name: &str) -> Self {
        let characteristics = BTreeMap::from([
            ("on".to_string(), Value::from(false)),
            ("brightness".to_string(), Value::from(100)),
        ]);
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category: AccessoryCategory::Lightbulb,
            model: "Generic HomeKit Device".to_string(),
            manufacturer: "HomeKit".to_string(),
            firmware_version: "1.0.0".to_string(),
            paired: true,
            reachable: true,
            characteristics,
            last_seen: Utc::now(),
            descriptor: None,
        }
    }

    /// Create a record for an enumerated accessory from its descriptor
    pub fn from_descriptor(category: AccessoryCategory, descriptor: DeviceDescriptor) -> Self {
        let mut record = Self {
            id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            category,
            model: descriptor.metadata.model.clone(),
            manufacturer: descriptor.metadata.manufacturer.clone(),
            firmware_version: descriptor.metadata.firmware.clone(),
            paired: true,
            reachable: true,
            characteristics: BTreeMap::new(),
            last_seen: Utc::now(),
            descriptor: None,
        };
        record.refresh(descriptor);
        record
    }

    /// Replace the cached descriptor and upsert its attributes as characteristics
    pub fn refresh(&mut self, descriptor: DeviceDescriptor) {
        for attribute in &descriptor.attributes {
            self.characteristics
                .insert(attribute.name.clone(), attribute.value.into());
        }
        self.descriptor = Some(descriptor);
        self.touch();
    }

    /// Update the last seen timestamp
    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }
}

/// A service group and the characteristics it carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    #[serde(rename = "type")]
    pub service_type: String,
    pub characteristics: Vec<String>,
}

impl ServiceInfo {
    /// Service groups for a native accessory category
    pub fn for_category(category: AccessoryCategory) -> Vec<Self> {
        category
            .services()
            .into_iter()
            .map(|(service_type, characteristics)| Self {
                service_type: service_type.to_string(),
                characteristics: characteristics.into_iter().map(str::to_string).collect(),
            })
            .collect()
    }
}
