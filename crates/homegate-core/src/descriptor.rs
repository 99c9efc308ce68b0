//! Canonical device descriptors

use serde::{Deserialize, Serialize};

use crate::accessory::Accessory;
use crate::attribute::{extract_attributes, Attribute};
use crate::device_type::{classify, supported_commands, DeviceType};

/// Identifies the source protocol in descriptors and device ids
pub const PROTOCOL: &str = "homekit";

/// Native identity of the accessory behind a descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceMetadata {
    /// Native accessory id (aid)
    pub aid: u64,
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
    pub firmware: String,
}

/// Protocol-agnostic view of a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub name: String,
    pub protocol: String,
    pub attributes: Vec<Attribute>,
    /// Declared commands, a function of `device_type` only
    pub commands: Vec<String>,
    pub metadata: DeviceMetadata,
}

/// Globally unique device id for a native accessory id
pub fn device_id(aid: u64) -> String {
    format!("{}:{}", PROTOCOL, aid)
}

/// Build the canonical descriptor for an accessory.
///
/// Returns `None` for accessories whose category has no canonical type.
pub fn assemble(accessory: &Accessory) -> Option<DeviceDescriptor> {
    let device_type = classify(accessory)?;
    let info = &accessory.info;

    Some(DeviceDescriptor {
        id: device_id(accessory.id),
        device_type,
        name: info.name.clone(),
        protocol: PROTOCOL.to_string(),
        attributes: extract_attributes(accessory),
        commands: supported_commands(device_type)
            .iter()
            .map(|c| c.to_string())
            .collect(),
        metadata: DeviceMetadata {
            aid: accessory.id,
            manufacturer: info.manufacturer.clone(),
            model: info.model.clone(),
            serial: info.serial_number.clone(),
            firmware: info.firmware_revision.clone(),
        },
    })
}
