use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ZoneType {
    Main,
    Bar,
    ViewingArea,
    Patio,
    Dining,
    #[serde(other)]
    Other,
}

impl ZoneType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneType::Main => "main",
            ZoneType::Bar => "bar",
            ZoneType::ViewingArea => "viewing_area",
            ZoneType::Patio => "patio",
            ZoneType::Dining => "dining",
            ZoneType::Other => "other",
        }
    }
}

impl Default for ZoneType {
    fn default() -> Self {
        ZoneType::Other
    }
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ZoneType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "main" => Ok(ZoneType::Main),
            "bar" => Ok(ZoneType::Bar),
            "viewing_area" => Ok(ZoneType::ViewingArea),
            "patio" => Ok(ZoneType::Patio),
            "dining" => Ok(ZoneType::Dining),
            "other" => Ok(ZoneType::Other),
            other => Err(format!("unknown zone type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Cable,
    Satellite,
    Streaming,
    Ambient,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Cable => "cable",
            DeviceType::Satellite => "satellite",
            DeviceType::Streaming => "streaming",
            DeviceType::Ambient => "ambient",
        }
    }

    /// Devices that can carry a live game.
    pub fn carries_games(&self) -> bool {
        !matches!(self, DeviceType::Ambient)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cable" => Ok(DeviceType::Cable),
            "satellite" => Ok(DeviceType::Satellite),
            "streaming" => Ok(DeviceType::Streaming),
            "ambient" => Ok(DeviceType::Ambient),
            other => Err(format!("unknown device type: {other}")),
        }
    }
}

/// Preset families with their own channel numbering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChannelCategory {
    Cable,
    Satellite,
}

impl fmt::Display for ChannelCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelCategory::Cable => f.write_str("cable"),
            ChannelCategory::Satellite => f.write_str("satellite"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Output {
    pub number: u32,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub zone_type: ZoneType,
    #[serde(default = "default_true")]
    pub schedulable: bool,
    #[serde(default)]
    pub manual_override_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub physical_group: Option<String>,
    #[serde(default)]
    pub current_input: Option<u32>,
}

impl Output {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            label: None,
            zone: None,
            zone_type: ZoneType::Other,
            schedulable: true,
            manual_override_until: None,
            physical_group: None,
            current_input: None,
        }
    }

    /// An output a bartender pinned stays untouched until the override lapses.
    pub fn is_protected(&self, now: DateTime<Utc>) -> bool {
        self.manual_override_until
            .map(|until| until > now)
            .unwrap_or(false)
    }

    pub fn display_name(&self) -> String {
        match &self.label {
            Some(label) => format!("TV {} ({label})", self.number),
            None => format!("TV {}", self.number),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Input {
    pub number: u32,
    #[serde(default)]
    pub label: Option<String>,
    pub device_type: DeviceType,
    #[serde(default = "default_true")]
    pub can_change_channel: bool,
    #[serde(default = "default_true")]
    pub available: bool,
    #[serde(default)]
    pub current_channel: Option<String>,
    #[serde(default)]
    pub current_show: Option<String>,
}

impl Input {
    pub fn new(number: u32, device_type: DeviceType) -> Self {
        Self {
            number,
            label: None,
            device_type,
            can_change_channel: true,
            available: true,
            current_channel: None,
            current_show: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemState {
    pub captured_at: DateTime<Utc>,
    #[serde(default)]
    pub outputs: Vec<Output>,
    #[serde(default)]
    pub inputs: Vec<Input>,
}

impl SystemState {
    pub fn new(captured_at: DateTime<Utc>) -> Self {
        Self {
            captured_at,
            outputs: Vec::new(),
            inputs: Vec::new(),
        }
    }

    pub fn output(&self, number: u32) -> Option<&Output> {
        self.outputs.iter().find(|output| output.number == number)
    }

    pub fn input(&self, number: u32) -> Option<&Input> {
        self.inputs.iter().find(|input| input.number == number)
    }

    /// Inputs that can be retuned right now: enabled, not held by a manual
    /// override, and remotely controllable.
    pub fn available_inputs(&self) -> Vec<&Input> {
        self.inputs
            .iter()
            .filter(|input| input.available && input.can_change_channel)
            .collect()
    }

    pub fn outputs_on_input(&self, input: u32) -> impl Iterator<Item = &Output> {
        self.outputs
            .iter()
            .filter(move |output| output.current_input == Some(input))
    }
}

fn default_true() -> bool {
    true
}
