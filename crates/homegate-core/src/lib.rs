//! Homegate Core - Accessory model, command dispatch, and device normalization
//!
//! This crate provides the protocol-independent heart of the gateway:
//! - An in-memory model of HomeKit accessories and their services
//! - Capability probing and capability-based command dispatch
//! - Normalization of native accessories into canonical device descriptors

pub mod accessory;
pub mod attribute;
pub mod capability;
pub mod command;
pub mod descriptor;
pub mod device_type;

pub use accessory::{Accessory, AccessoryCategory, AccessoryInfo};
pub use attribute::{extract_attributes, Attribute, AttributeValue, SemanticType};
pub use capability::{probe, Capability, CapabilitySet};
pub use command::{dispatch, execute, Command, CommandError, Params, EXECUTABLE_COMMANDS};
pub use descriptor::{assemble, device_id, DeviceDescriptor, DeviceMetadata, PROTOCOL};
pub use device_type::{classify, supported_commands, DeviceType};
