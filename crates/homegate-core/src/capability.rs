//! Capability probing
//!
//! Capabilities reflect which optional services are structurally present
//! on an accessory, never their current values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::accessory::Accessory;

/// A controllable or readable aspect of an accessory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Lightbulb on/off
    Light,
    /// Outlet on/off
    Outlet,
    /// Plain switch on/off
    Switch,
    /// Lightbulb with a brightness characteristic
    Dimmable,
    /// Thermostat with a target temperature
    Thermostatic,
    /// Lock mechanism with a target state
    Lockable,
    /// Garage door opener with a target door state
    Openable,
    /// Window covering with a target position
    Positionable,
    TemperatureSensing,
    HumiditySensing,
}

impl Capability {
    /// Whether this capability carries a boolean on/off state
    pub fn is_switchable(&self) -> bool {
        matches!(self, Self::Light | Self::Outlet | Self::Switch)
    }
}

pub type CapabilitySet = BTreeSet<Capability>;

/// Determine which capabilities an accessory exposes
pub fn probe(accessory: &Accessory) -> CapabilitySet {
    let mut caps = CapabilitySet::new();

    if let Some(light) = &accessory.lightbulb {
        caps.insert(Capability::Light);
        if light.brightness.is_some() {
            caps.insert(Capability::Dimmable);
        }
    }
    if accessory.outlet.is_some() {
        caps.insert(Capability::Outlet);
    }
    if accessory.switch.is_some() {
        caps.insert(Capability::Switch);
    }
    if accessory.thermostat.is_some() {
        caps.insert(Capability::Thermostatic);
    }
    if accessory.lock_mechanism.is_some() {
        caps.insert(Capability::Lockable);
    }
    if accessory.garage_door_opener.is_some() {
        caps.insert(Capability::Openable);
    }
    if accessory.window_covering.is_some() {
        caps.insert(Capability::Positionable);
    }
    if accessory.temperature_sensor.is_some() {
        caps.insert(Capability::TemperatureSensing);
    }
    if accessory.humidity_sensor.is_some() {
        caps.insert(Capability::HumiditySensing);
    }

    caps
}
