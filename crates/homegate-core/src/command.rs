//! Capability-based command dispatch
//!
//! An abstract command is resolved against the capabilities an accessory
//! actually exposes. Every command owns an ordered list of
//! `(capability, handler)` routes; the first route whose capability is
//! present wins, so ambiguous commands such as `open` (garage door or
//! window covering) always resolve the same way.
//!
//! The executable command set here is deliberately independent of the
//! commands a device type *declares* (see [`crate::device_type`]).

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::accessory::{Accessory, DoorState, LockState};
use crate::capability::{probe, Capability};

/// Untyped command parameters, as received from the API
pub type Params = serde_json::Map<String, Value>;

/// Commands the dispatcher can execute
pub const EXECUTABLE_COMMANDS: &[&str] = &[
    "turn_on",
    "turn_off",
    "toggle",
    "set_brightness",
    "set_temperature",
    "lock",
    "unlock",
    "open",
    "close",
    "set_position",
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error("Accessory {accessory} does not support {command}")]
    UnsupportedCommand { accessory: u64, command: &'static str },
    #[error("Invalid {parameter} parameter for {command}")]
    InvalidParameter {
        command: &'static str,
        parameter: &'static str,
    },
}

/// A validated command with its typed parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    TurnOn,
    TurnOff,
    Toggle,
    /// Brightness percentage, truncated but not clamped
    SetBrightness(i64),
    SetTemperature(f64),
    Lock,
    Unlock,
    Open,
    Close,
    /// Target position percentage, truncated but not clamped
    SetPosition(i64),
}

type Handler = fn(&mut Accessory, Command) -> Option<()>;

struct Route {
    capability: Capability,
    apply: Handler,
}

const POWER_ROUTES: &[Route] = &[
    Route { capability: Capability::Light, apply: set_light_power },
    Route { capability: Capability::Outlet, apply: set_outlet_power },
    Route { capability: Capability::Switch, apply: set_switch_power },
];

const BRIGHTNESS_ROUTES: &[Route] = &[Route {
    capability: Capability::Dimmable,
    apply: set_brightness,
}];

const TEMPERATURE_ROUTES: &[Route] = &[Route {
    capability: Capability::Thermostatic,
    apply: set_target_temperature,
}];

const LOCK_ROUTES: &[Route] = &[Route {
    capability: Capability::Lockable,
    apply: set_lock_target,
}];

const DOOR_ROUTES: &[Route] = &[
    Route { capability: Capability::Openable, apply: set_garage_door_target },
    Route { capability: Capability::Positionable, apply: set_covering_target },
];

const POSITION_ROUTES: &[Route] = &[Route {
    capability: Capability::Positionable,
    apply: set_covering_target,
}];

impl Command {
    /// Resolve a command name and its parameters.
    ///
    /// Parameters are validated here, before any capability is consulted.
    pub fn parse(name: &str, params: &Params) -> Result<Self, CommandError> {
        let command = match name {
            "turn_on" => Self::TurnOn,
            "turn_off" => Self::TurnOff,
            "toggle" => Self::Toggle,
            "set_brightness" => {
                Self::SetBrightness(number_param(params, "set_brightness", "brightness")? as i64)
            }
            "set_temperature" => {
                Self::SetTemperature(number_param(params, "set_temperature", "temperature")?)
            }
            "lock" => Self::Lock,
            "unlock" => Self::Unlock,
            "open" => Self::Open,
            "close" => Self::Close,
            "set_position" => {
                Self::SetPosition(number_param(params, "set_position", "position")? as i64)
            }
            other => return Err(CommandError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TurnOn => "turn_on",
            Self::TurnOff => "turn_off",
            Self::Toggle => "toggle",
            Self::SetBrightness(_) => "set_brightness",
            Self::SetTemperature(_) => "set_temperature",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::Open => "open",
            Self::Close => "close",
            Self::SetPosition(_) => "set_position",
        }
    }

    /// Capabilities this command can act on, in priority order
    pub fn priority(&self) -> Vec<Capability> {
        self.routes().iter().map(|r| r.capability).collect()
    }

    fn routes(&self) -> &'static [Route] {
        match self {
            Self::TurnOn | Self::TurnOff | Self::Toggle => POWER_ROUTES,
            Self::SetBrightness(_) => BRIGHTNESS_ROUTES,
            Self::SetTemperature(_) => TEMPERATURE_ROUTES,
            Self::Lock | Self::Unlock => LOCK_ROUTES,
            Self::Open | Self::Close => DOOR_ROUTES,
            Self::SetPosition(_) => POSITION_ROUTES,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse and execute a named command against an accessory
pub fn execute(accessory: &mut Accessory, name: &str, params: &Params) -> Result<(), CommandError> {
    let command = Command::parse(name, params)?;
    dispatch(accessory, command)
}

/// Apply a parsed command to the first matching capability
pub fn dispatch(accessory: &mut Accessory, command: Command) -> Result<(), CommandError> {
    let caps = probe(accessory);
    for route in command.routes() {
        if caps.contains(&route.capability) && (route.apply)(accessory, command).is_some() {
            return Ok(());
        }
    }
    Err(CommandError::UnsupportedCommand {
        accessory: accessory.id,
        command: command.name(),
    })
}

fn number_param(
    params: &Params,
    command: &'static str,
    parameter: &'static str,
) -> Result<f64, CommandError> {
    params
        .get(parameter)
        .and_then(Value::as_f64)
        .ok_or(CommandError::InvalidParameter { command, parameter })
}

fn next_power(command: Command, current: bool) -> Option<bool> {
    match command {
        Command::TurnOn => Some(true),
        Command::TurnOff => Some(false),
        Command::Toggle => Some(!current),
        _ => None,
    }
}

fn log_power(kind: &str, aid: u64, command: Command, on: bool) {
    match command {
        Command::Toggle => info!(accessory = aid, on, "Toggled {}", kind),
        _ if on => info!(accessory = aid, "Turned on {}", kind),
        _ => info!(accessory = aid, "Turned off {}", kind),
    }
}

fn set_light_power(acc: &mut Accessory, command: Command) -> Option<()> {
    let light = acc.lightbulb.as_mut()?;
    light.on = next_power(command, light.on)?;
    log_power("lightbulb", acc.id, command, light.on);
    Some(())
}

fn set_outlet_power(acc: &mut Accessory, command: Command) -> Option<()> {
    let outlet = acc.outlet.as_mut()?;
    outlet.on = next_power(command, outlet.on)?;
    log_power("outlet", acc.id, command, outlet.on);
    Some(())
}

fn set_switch_power(acc: &mut Accessory, command: Command) -> Option<()> {
    let switch = acc.switch.as_mut()?;
    switch.on = next_power(command, switch.on)?;
    log_power("switch", acc.id, command, switch.on);
    Some(())
}

fn set_brightness(acc: &mut Accessory, command: Command) -> Option<()> {
    let Command::SetBrightness(level) = command else {
        return None;
    };
    let brightness = acc.lightbulb.as_mut()?.brightness.as_mut()?;
    *brightness = level;
    info!(accessory = acc.id, brightness = level, "Set lightbulb brightness");
    Some(())
}

fn set_target_temperature(acc: &mut Accessory, command: Command) -> Option<()> {
    let Command::SetTemperature(target) = command else {
        return None;
    };
    acc.thermostat.as_mut()?.target_temperature = target;
    info!(accessory = acc.id, "Set thermostat target temperature to {:.1}", target);
    Some(())
}

fn set_lock_target(acc: &mut Accessory, command: Command) -> Option<()> {
    let target = match command {
        Command::Lock => LockState::Secured,
        Command::Unlock => LockState::Unsecured,
        _ => return None,
    };
    acc.lock_mechanism.as_mut()?.target_state = target;
    match target {
        LockState::Secured => info!(accessory = acc.id, "Locked door lock"),
        LockState::Unsecured => info!(accessory = acc.id, "Unlocked door lock"),
    }
    Some(())
}

fn set_garage_door_target(acc: &mut Accessory, command: Command) -> Option<()> {
    let target = match command {
        Command::Open => DoorState::Open,
        Command::Close => DoorState::Closed,
        _ => return None,
    };
    acc.garage_door_opener.as_mut()?.target_state = target;
    match target {
        DoorState::Open => info!(accessory = acc.id, "Opening garage door"),
        DoorState::Closed => info!(accessory = acc.id, "Closing garage door"),
    }
    Some(())
}

fn set_covering_target(acc: &mut Accessory, command: Command) -> Option<()> {
    let position = match command {
        Command::Open => 100,
        Command::Close => 0,
        Command::SetPosition(position) => position,
        _ => return None,
    };
    acc.window_covering.as_mut()?.target_position = position;
    info!(accessory = acc.id, position, "Set window covering target position");
    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessory::{AccessoryCategory, AccessoryInfo, GarageDoorOpener, WindowCovering};
    use serde_json::json;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => Params::new(),
        }
    }

    fn accessory(category: AccessoryCategory) -> Accessory {
        Accessory::for_category(10, category, AccessoryInfo::named("Test"))
    }

    #[test]
    fn test_turn_on_then_toggle() {
        let mut bulb = accessory(AccessoryCategory::Lightbulb);
        execute(&mut bulb, "turn_on", &Params::new()).unwrap();
        assert_eq!(bulb.lightbulb.as_ref().map(|l| l.on), Some(true));

        execute(&mut bulb, "toggle", &Params::new()).unwrap();
        assert_eq!(bulb.lightbulb.as_ref().map(|l| l.on), Some(false));
    }

    #[test]
    fn test_power_priority_prefers_light() {
        let mut acc = accessory(AccessoryCategory::Lightbulb);
        acc.switch = Some(Default::default());
        execute(&mut acc, "turn_on", &Params::new()).unwrap();
        assert_eq!(acc.lightbulb.as_ref().map(|l| l.on), Some(true));
        assert_eq!(acc.switch.as_ref().map(|s| s.on), Some(false));
    }

    #[test]
    fn test_toggle_switch() {
        let mut switch = accessory(AccessoryCategory::Switch);
        execute(&mut switch, "toggle", &Params::new()).unwrap();
        assert_eq!(switch.switch.as_ref().map(|s| s.on), Some(true));
    }

    #[test]
    fn test_turn_off_outlet() {
        let mut outlet = accessory(AccessoryCategory::Outlet);
        execute(&mut outlet, "turn_on", &Params::new()).unwrap();
        execute(&mut outlet, "turn_off", &Params::new()).unwrap();
        assert_eq!(outlet.outlet.as_ref().map(|o| o.on), Some(false));
    }

    #[test]
    fn test_brightness_is_not_clamped() {
        // Out-of-range values are stored as given; see DESIGN.md.
        let mut bulb = accessory(AccessoryCategory::Lightbulb).with_brightness(50);
        execute(&mut bulb, "set_brightness", &params(json!({"brightness": 150}))).unwrap();
        assert_eq!(bulb.lightbulb.as_ref().and_then(|l| l.brightness), Some(150));
    }

    #[test]
    fn test_brightness_truncates() {
        let mut bulb = accessory(AccessoryCategory::Lightbulb).with_brightness(50);
        execute(&mut bulb, "set_brightness", &params(json!({"brightness": 42.9}))).unwrap();
        assert_eq!(bulb.lightbulb.as_ref().and_then(|l| l.brightness), Some(42));
    }

    #[test]
    fn test_brightness_requires_dimmable() {
        let mut bulb = accessory(AccessoryCategory::Lightbulb);
        let err = execute(&mut bulb, "set_brightness", &params(json!({"brightness": 10}))).unwrap_err();
        assert_eq!(
            err,
            CommandError::UnsupportedCommand {
                accessory: 10,
                command: "set_brightness"
            }
        );
    }

    #[test]
    fn test_missing_brightness_parameter() {
        let mut bulb = accessory(AccessoryCategory::Lightbulb).with_brightness(50);
        let err = execute(&mut bulb, "set_brightness", &Params::new()).unwrap_err();
        assert!(matches!(err, CommandError::InvalidParameter { parameter: "brightness", .. }));
    }

    #[test]
    fn test_position_wrong_type() {
        let mut covering = accessory(AccessoryCategory::WindowCovering);
        let err = execute(&mut covering, "set_position", &params(json!({"position": "bright"}))).unwrap_err();
        assert_eq!(
            err,
            CommandError::InvalidParameter {
                command: "set_position",
                parameter: "position"
            }
        );
    }

    #[test]
    fn test_set_position_not_clamped() {
        let mut covering = accessory(AccessoryCategory::WindowCovering);
        execute(&mut covering, "set_position", &params(json!({"position": -20}))).unwrap();
        assert_eq!(covering.window_covering.as_ref().map(|w| w.target_position), Some(-20));
    }

    #[test]
    fn test_set_temperature() {
        let mut thermostat = accessory(AccessoryCategory::Thermostat);
        execute(&mut thermostat, "set_temperature", &params(json!({"temperature": 21.5}))).unwrap();
        assert_eq!(thermostat.thermostat.as_ref().map(|t| t.target_temperature), Some(21.5));
    }

    #[test]
    fn test_lock_unlock() {
        let mut lock = accessory(AccessoryCategory::DoorLock);
        execute(&mut lock, "unlock", &Params::new()).unwrap();
        assert_eq!(lock.lock_mechanism.as_ref().map(|l| l.target_state), Some(LockState::Unsecured));
        execute(&mut lock, "lock", &Params::new()).unwrap();
        assert_eq!(lock.lock_mechanism.as_ref().map(|l| l.target_state as u8), Some(1));
    }

    #[test]
    fn test_open_close_window_covering() {
        let mut covering = accessory(AccessoryCategory::WindowCovering);
        execute(&mut covering, "open", &Params::new()).unwrap();
        assert_eq!(covering.window_covering.as_ref().map(|w| w.target_position), Some(100));
        execute(&mut covering, "close", &Params::new()).unwrap();
        assert_eq!(covering.window_covering.as_ref().map(|w| w.target_position), Some(0));
    }

    #[test]
    fn test_open_prefers_garage_door() {
        let mut acc = accessory(AccessoryCategory::GarageDoorOpener);
        acc.window_covering = Some(WindowCovering::default());
        execute(&mut acc, "open", &Params::new()).unwrap();
        assert_eq!(
            acc.garage_door_opener.as_ref().map(|g| g.target_state as u8),
            Some(DoorState::Open as u8)
        );
        assert_eq!(acc.window_covering.as_ref().map(|w| w.target_position), Some(0));

        acc.garage_door_opener = Some(GarageDoorOpener {
            current_state: DoorState::Open,
            target_state: DoorState::Open,
        });
        execute(&mut acc, "close", &Params::new()).unwrap();
        assert_eq!(acc.garage_door_opener.as_ref().map(|g| g.target_state), Some(DoorState::Closed));
    }

    #[test]
    fn test_unknown_command() {
        let mut bulb = accessory(AccessoryCategory::Lightbulb);
        let err = execute(&mut bulb, "set_mode", &Params::new()).unwrap_err();
        assert_eq!(err, CommandError::UnknownCommand("set_mode".to_string()));
    }

    #[test]
    fn test_unsupported_leaves_accessory_untouched() {
        let mut sensor = accessory(AccessoryCategory::TemperatureSensor);
        let before = sensor.clone();
        let err = execute(&mut sensor, "turn_on", &Params::new()).unwrap_err();
        assert!(matches!(err, CommandError::UnsupportedCommand { command: "turn_on", .. }));
        assert_eq!(sensor, before);
    }

    #[test]
    fn test_every_executable_command_parses() {
        let all = params(json!({"brightness": 1, "temperature": 1.0, "position": 1}));
        for name in EXECUTABLE_COMMANDS {
            let command = Command::parse(name, &all).unwrap();
            assert_eq!(command.name(), *name);
            assert!(!command.priority().is_empty());
        }
    }
}
