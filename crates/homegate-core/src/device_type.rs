//! Canonical device types and the commands each type declares

use serde::{Deserialize, Serialize};

use crate::accessory::{Accessory, AccessoryCategory};

/// Protocol-agnostic device type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Light,
    DimmerLight,
    Plug,
    Switch,
    Thermostat,
    TemperatureSensor,
    HumiditySensor,
    ContactSensor,
    MotionSensor,
    OccupancySensor,
    LeakSensor,
    SmokeSensor,
    DoorLock,
    GarageDoor,
    WindowCovering,
    Fan,
}

impl DeviceType {
    pub const ALL: [DeviceType; 16] = [
        Self::Light,
        Self::DimmerLight,
        Self::Plug,
        Self::Switch,
        Self::Thermostat,
        Self::TemperatureSensor,
        Self::HumiditySensor,
        Self::ContactSensor,
        Self::MotionSensor,
        Self::OccupancySensor,
        Self::LeakSensor,
        Self::SmokeSensor,
        Self::DoorLock,
        Self::GarageDoor,
        Self::WindowCovering,
        Self::Fan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::DimmerLight => "dimmer_light",
            Self::Plug => "plug",
            Self::Switch => "switch",
            Self::Thermostat => "thermostat",
            Self::TemperatureSensor => "temperature_sensor",
            Self::HumiditySensor => "humidity_sensor",
            Self::ContactSensor => "contact_sensor",
            Self::MotionSensor => "motion_sensor",
            Self::OccupancySensor => "occupancy_sensor",
            Self::LeakSensor => "leak_sensor",
            Self::SmokeSensor => "smoke_sensor",
            Self::DoorLock => "door_lock",
            Self::GarageDoor => "garage_door",
            Self::WindowCovering => "window_covering",
            Self::Fan => "fan",
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a native accessory to its canonical type.
///
/// `None` means the accessory should not be exposed at all. HomeKit has
/// no native dimmer category, so `DimmerLight` is never produced here.
pub fn classify(accessory: &Accessory) -> Option<DeviceType> {
    let device_type = match accessory.category {
        AccessoryCategory::Lightbulb => DeviceType::Light,
        AccessoryCategory::Outlet => DeviceType::Plug,
        AccessoryCategory::Switch => DeviceType::Switch,
        AccessoryCategory::Thermostat => DeviceType::Thermostat,
        AccessoryCategory::TemperatureSensor => DeviceType::TemperatureSensor,
        AccessoryCategory::HumiditySensor => DeviceType::HumiditySensor,
        AccessoryCategory::ContactSensor => DeviceType::ContactSensor,
        AccessoryCategory::MotionSensor => DeviceType::MotionSensor,
        AccessoryCategory::OccupancySensor => DeviceType::OccupancySensor,
        AccessoryCategory::LeakSensor => DeviceType::LeakSensor,
        AccessoryCategory::SmokeSensor => DeviceType::SmokeSensor,
        AccessoryCategory::DoorLock => DeviceType::DoorLock,
        AccessoryCategory::GarageDoorOpener => DeviceType::GarageDoor,
        AccessoryCategory::WindowCovering => DeviceType::WindowCovering,
        AccessoryCategory::Fan => DeviceType::Fan,
        _ => return None,
    };
    Some(device_type)
}

/// Commands a device type declares.
///
/// This is a static table and may name commands the dispatcher cannot
/// execute yet (`set_mode`, `set_speed`).
pub fn supported_commands(device_type: DeviceType) -> &'static [&'static str] {
    match device_type {
        DeviceType::Light => &["turn_on", "turn_off", "toggle", "set_brightness"],
        DeviceType::DimmerLight => &["turn_on", "turn_off", "set_brightness"],
        DeviceType::Plug | DeviceType::Switch => &["turn_on", "turn_off", "toggle"],
        DeviceType::Thermostat => &["set_temperature", "set_mode"],
        DeviceType::DoorLock => &["lock", "unlock"],
        DeviceType::GarageDoor => &["open", "close"],
        DeviceType::WindowCovering => &["open", "close", "set_position"],
        DeviceType::Fan => &["turn_on", "turn_off", "set_speed"],
        _ => &[],
    }
}
