//! In-memory model of native HomeKit accessories
//!
//! An [`Accessory`] mirrors what the HAP stack exposes for a paired or
//! bridged device: a stable numeric id, a native category, the
//! accessory-information service, and zero or more optional services.
//! Sharing and locking are left to the owner (see the registry crate).

use serde::{Deserialize, Serialize};

/// Native HomeKit accessory category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessoryCategory {
    Other,
    Bridge,
    Fan,
    GarageDoorOpener,
    Lightbulb,
    DoorLock,
    Outlet,
    Switch,
    Thermostat,
    TemperatureSensor,
    HumiditySensor,
    ContactSensor,
    MotionSensor,
    OccupancySensor,
    LeakSensor,
    SmokeSensor,
    SecuritySystem,
    Door,
    Window,
    WindowCovering,
    ProgrammableSwitch,
    AirPurifier,
    Television,
}

impl AccessoryCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Other => "other",
            Self::Bridge => "bridge",
            Self::Fan => "fan",
            Self::GarageDoorOpener => "garage_door_opener",
            Self::Lightbulb => "lightbulb",
            Self::DoorLock => "door_lock",
            Self::Outlet => "outlet",
            Self::Switch => "switch",
            Self::Thermostat => "thermostat",
            Self::TemperatureSensor => "temperature_sensor",
            Self::HumiditySensor => "humidity_sensor",
            Self::ContactSensor => "contact_sensor",
            Self::MotionSensor => "motion_sensor",
            Self::OccupancySensor => "occupancy_sensor",
            Self::LeakSensor => "leak_sensor",
            Self::SmokeSensor => "smoke_sensor",
            Self::SecuritySystem => "security_system",
            Self::Door => "door",
            Self::Window => "window",
            Self::WindowCovering => "window_covering",
            Self::ProgrammableSwitch => "programmable_switch",
            Self::AirPurifier => "air_purifier",
            Self::Television => "television",
        }
    }

    /// HAP services an accessory of this category exposes, as
    /// `(service type, characteristic names)` pairs. The
    /// accessory-information service is always last.
    pub fn services(&self) -> Vec<(&'static str, Vec<&'static str>)> {
        let primary: Option<(&'static str, Vec<&'static str>)> = match self {
            Self::Lightbulb => Some(("lightbulb", vec!["on", "brightness", "hue", "saturation"])),
            Self::Outlet => Some(("outlet", vec!["on", "outlet-in-use"])),
            Self::Switch => Some(("switch", vec!["on"])),
            Self::Fan => Some(("fan", vec!["on", "rotation-speed"])),
            Self::Thermostat => Some((
                "thermostat",
                vec![
                    "current-temperature",
                    "target-temperature",
                    "current-heating-cooling-state",
                    "target-heating-cooling-state",
                    "temperature-display-units",
                ],
            )),
            Self::TemperatureSensor => Some(("temperature-sensor", vec!["current-temperature"])),
            Self::HumiditySensor => {
                Some(("humidity-sensor", vec!["current-relative-humidity"]))
            }
            Self::ContactSensor => Some(("contact-sensor", vec!["contact-sensor-state"])),
            Self::MotionSensor => Some(("motion-sensor", vec!["motion-detected"])),
            Self::OccupancySensor => Some(("occupancy-sensor", vec!["occupancy-detected"])),
            Self::LeakSensor => Some(("leak-sensor", vec!["leak-detected"])),
            Self::SmokeSensor => Some(("smoke-sensor", vec!["smoke-detected"])),
            Self::DoorLock => Some((
                "lock-mechanism",
                vec!["lock-current-state", "lock-target-state"],
            )),
            Self::GarageDoorOpener => Some((
                "garage-door-opener",
                vec!["current-door-state", "target-door-state", "obstruction-detected"],
            )),
            Self::WindowCovering => Some((
                "window-covering",
                vec!["current-position", "target-position", "position-state"],
            )),
            _ => None,
        };

        let mut services: Vec<_> = primary.into_iter().collect();
        services.push((
            "accessory-information",
            vec!["identify", "manufacturer", "model", "name", "serial-number", "firmware-revision"],
        ));
        services
    }
}

impl std::fmt::Display for AccessoryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accessory-information service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessoryInfo {
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub firmware_revision: String,
}

impl AccessoryInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lightbulb {
    pub on: bool,
    /// Present only on dimmable bulbs
    pub brightness: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outlet {
    pub on: bool,
    pub in_use: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Switch {
    pub on: bool,
}

/// Temperatures are in degrees Celsius, as HAP reports them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Thermostat {
    pub current_temperature: f64,
    pub target_temperature: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemperatureSensor {
    pub current_temperature: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HumiditySensor {
    pub current_relative_humidity: f64,
}

/// Lock mechanism state, using the HAP ordinals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum LockState {
    Unsecured = 0,
    #[default]
    Secured = 1,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LockMechanism {
    pub current_state: LockState,
    pub target_state: LockState,
}

/// Garage door state, using the HAP ordinals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum DoorState {
    Open = 0,
    #[default]
    Closed = 1,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GarageDoorOpener {
    pub current_state: DoorState,
    pub target_state: DoorState,
}

/// Positions are percentages, 0 fully closed and 100 fully open
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowCovering {
    pub current_position: i64,
    pub target_position: i64,
}

/// A native accessory as exposed by the HAP stack
#[derive(Debug, Clone, PartialEq)]
pub struct Accessory {
    /// Accessory instance id (aid), stable for the lifetime of the pairing
    pub id: u64,
    pub category: AccessoryCategory,
    pub info: AccessoryInfo,
    pub lightbulb: Option<Lightbulb>,
    pub outlet: Option<Outlet>,
    pub switch: Option<Switch>,
    pub thermostat: Option<Thermostat>,
    pub temperature_sensor: Option<TemperatureSensor>,
    pub humidity_sensor: Option<HumiditySensor>,
    pub lock_mechanism: Option<LockMechanism>,
    pub garage_door_opener: Option<GarageDoorOpener>,
    pub window_covering: Option<WindowCovering>,
}

impl Accessory {
    /// Create an accessory with no services besides accessory-information
    pub fn new(id: u64, category: AccessoryCategory, info: AccessoryInfo) -> Self {
        Self {
            id,
            category,
            info,
            lightbulb: None,
            outlet: None,
            switch: None,
            thermostat: None,
            temperature_sensor: None,
            humidity_sensor: None,
            lock_mechanism: None,
            garage_door_opener: None,
            window_covering: None,
        }
    }

    /// Create an accessory with the standard services for its category
    pub fn for_category(id: u64, category: AccessoryCategory, info: AccessoryInfo) -> Self {
        let mut accessory = Self::new(id, category, info);
        match category {
            AccessoryCategory::Lightbulb => accessory.lightbulb = Some(Lightbulb::default()),
            AccessoryCategory::Outlet => accessory.outlet = Some(Outlet::default()),
            AccessoryCategory::Switch => accessory.switch = Some(Switch::default()),
            AccessoryCategory::Thermostat => {
                accessory.thermostat = Some(Thermostat {
                    current_temperature: 20.0,
                    target_temperature: 20.0,
                })
            }
            AccessoryCategory::TemperatureSensor => {
                accessory.temperature_sensor = Some(TemperatureSensor {
                    current_temperature: 20.0,
                })
            }
            AccessoryCategory::HumiditySensor => {
                accessory.humidity_sensor = Some(HumiditySensor {
                    current_relative_humidity: 50.0,
                })
            }
            AccessoryCategory::DoorLock => accessory.lock_mechanism = Some(LockMechanism::default()),
            AccessoryCategory::GarageDoorOpener => {
                accessory.garage_door_opener = Some(GarageDoorOpener::default())
            }
            AccessoryCategory::WindowCovering => {
                accessory.window_covering = Some(WindowCovering::default())
            }
            _ => {}
        }
        accessory
    }

    /// Add a brightness characteristic, creating the lightbulb service if needed
    pub fn with_brightness(mut self, brightness: i64) -> Self {
        self.lightbulb.get_or_insert_with(Lightbulb::default).brightness = Some(brightness);
        self
    }
}
