//! Uniform attribute snapshots read from accessory services

use serde::{Deserialize, Serialize};

use crate::accessory::{Accessory, DoorState, LockState};

/// Semantic meaning of an attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Boolean,
    Percentage,
    Temperature,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl From<AttributeValue> for serde_json::Value {
    fn from(value: AttributeValue) -> Self {
        match value {
            AttributeValue::Bool(b) => b.into(),
            AttributeValue::Int(i) => i.into(),
            AttributeValue::Float(f) => f.into(),
        }
    }
}

/// A named, typed value read from an accessory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
    #[serde(rename = "type")]
    pub kind: SemanticType,
}

impl Attribute {
    fn new(name: &str, value: AttributeValue, kind: SemanticType) -> Self {
        Self {
            name: name.to_string(),
            value,
            kind,
        }
    }
}

/// Read the current values of every supported service.
///
/// Services the accessory lacks contribute nothing.
pub fn extract_attributes(accessory: &Accessory) -> Vec<Attribute> {
    use AttributeValue::{Bool, Float, Int};
    use SemanticType::{Boolean, Percentage, Temperature};

    let mut attributes = Vec::new();

    // One power state per accessory, read from the service power commands act on.
    let power = accessory
        .lightbulb
        .as_ref()
        .map(|light| light.on)
        .or_else(|| accessory.outlet.as_ref().map(|outlet| outlet.on))
        .or_else(|| accessory.switch.as_ref().map(|switch| switch.on));
    if let Some(on) = power {
        attributes.push(Attribute::new("state", Bool(on), Boolean));
    }
    if let Some(brightness) = accessory.lightbulb.as_ref().and_then(|light| light.brightness) {
        attributes.push(Attribute::new("brightness", Int(brightness), Percentage));
    }
    if let Some(thermostat) = &accessory.thermostat {
        attributes.push(Attribute::new(
            "current_temperature",
            Float(thermostat.current_temperature),
            Temperature,
        ));
        attributes.push(Attribute::new(
            "target_temperature",
            Float(thermostat.target_temperature),
            Temperature,
        ));
    }
    if let Some(sensor) = &accessory.temperature_sensor {
        attributes.push(Attribute::new("temperature", Float(sensor.current_temperature), Temperature));
    }
    if let Some(sensor) = &accessory.humidity_sensor {
        attributes.push(Attribute::new(
            "humidity",
            Float(sensor.current_relative_humidity),
            Percentage,
        ));
    }
    if let Some(lock) = &accessory.lock_mechanism {
        attributes.push(Attribute::new(
            "locked",
            Bool(lock.current_state == LockState::Secured),
            Boolean,
        ));
    }
    if let Some(door) = &accessory.garage_door_opener {
        attributes.push(Attribute::new("open", Bool(door.current_state == DoorState::Open), Boolean));
    }
    if let Some(covering) = &accessory.window_covering {
        attributes.push(Attribute::new("position", Int(covering.current_position), Percentage));
    }

    attributes
}
