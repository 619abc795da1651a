// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Vacuum configuration.
//!
//! [`VacuumConfig`] is the inbound configuration, either deserialized from
//! a discovery payload or built in code. [`VacuumConfig::bind`] validates it
//! and derives the immutable [`AdapterConfig`] the adapter runs on.
//!
//! # Examples
//!
//! ```
//! use mqtt_vacuum::config::VacuumConfig;
//!
//! let config = VacuumConfig::from_discovery_payload(
//!     r#"{
//!         "name": "Hall vacuum",
//!         "supported_features": ["turn_on", "turn_off", "battery"],
//!         "command_topic": "vacuum/command",
//!         "battery_level_topic": "vacuum/state",
//!         "battery_level_template": "{{ value_json.battery_level }}"
//!     }"#,
//! )
//! .unwrap();
//!
//! let bound = config.bind().unwrap();
//! assert_eq!(bound.name, "Hall vacuum");
//! ```

mod binding;

pub use binding::{AdapterConfig, Payloads, PerSignal};

use serde::{Deserialize, Deserializer};

use crate::capabilities::Capabilities;
use crate::error::ConfigError;
use crate::state::Signal;

/// Default display name.
pub const DEFAULT_NAME: &str = "MQTT Vacuum";

/// Inbound vacuum configuration.
///
/// Field names match the keys of a discovery payload. Unknown keys are
/// ignored; missing keys take the defaults listed on each field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VacuumConfig {
    /// Display name (default `"MQTT Vacuum"`).
    pub name: String,
    /// Capability wire names (default: the default capability set).
    #[serde(deserialize_with = "one_or_many")]
    pub supported_features: Vec<String>,
    /// QoS level for publishes and subscriptions (default 0).
    pub qos: u8,
    /// Retain flag for publishes (default `false`).
    pub retain: bool,

    /// Topic for the fixed-payload commands.
    pub command_topic: Option<String>,
    /// Topic fan speed names are published to.
    pub set_fan_speed_topic: Option<String>,
    /// Topic free-form commands are published to.
    pub send_command_topic: Option<String>,

    /// Payload for turn on (default `turn_on`).
    pub payload_turn_on: String,
    /// Payload for turn off (default `turn_off`).
    pub payload_turn_off: String,
    /// Payload for return to base (default `return_to_base`).
    pub payload_return_to_base: String,
    /// Payload for stop (default `stop`).
    pub payload_stop: String,
    /// Payload for spot cleaning (default `clean_spot`).
    pub payload_clean_spot: String,
    /// Payload for locate (default `locate`).
    pub payload_locate: String,
    /// Payload for start/pause (default `start_pause`).
    pub payload_start_pause: String,

    /// Battery level state topic.
    pub battery_level_topic: Option<String>,
    /// Battery level value template.
    pub battery_level_template: Option<String>,
    /// Charging state topic.
    pub charging_topic: Option<String>,
    /// Charging value template.
    pub charging_template: Option<String>,
    /// Cleaning state topic.
    pub cleaning_topic: Option<String>,
    /// Cleaning value template.
    pub cleaning_template: Option<String>,
    /// Docked state topic.
    pub docked_topic: Option<String>,
    /// Docked value template.
    pub docked_template: Option<String>,
    /// Error state topic.
    pub error_topic: Option<String>,
    /// Error value template.
    pub error_template: Option<String>,
    /// Fan speed state topic.
    pub fan_speed_topic: Option<String>,
    /// Fan speed value template.
    pub fan_speed_template: Option<String>,

    /// Selectable fan speed names (default empty).
    #[serde(deserialize_with = "one_or_many")]
    pub fan_speed_list: Vec<String>,

    /// Availability topic.
    pub availability_topic: Option<String>,
    /// Payload marking the device available (default `online`).
    pub payload_available: String,
    /// Payload marking the device unavailable (default `offline`).
    pub payload_not_available: String,
}

impl Default for VacuumConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            supported_features: Capabilities::DEFAULT
                .to_strings()
                .into_iter()
                .map(String::from)
                .collect(),
            qos: 0,
            retain: false,
            command_topic: None,
            set_fan_speed_topic: None,
            send_command_topic: None,
            payload_turn_on: "turn_on".to_string(),
            payload_turn_off: "turn_off".to_string(),
            payload_return_to_base: "return_to_base".to_string(),
            payload_stop: "stop".to_string(),
            payload_clean_spot: "clean_spot".to_string(),
            payload_locate: "locate".to_string(),
            payload_start_pause: "start_pause".to_string(),
            battery_level_topic: None,
            battery_level_template: None,
            charging_topic: None,
            charging_template: None,
            cleaning_topic: None,
            cleaning_template: None,
            docked_topic: None,
            docked_template: None,
            error_topic: None,
            error_template: None,
            fan_speed_topic: None,
            fan_speed_template: None,
            fan_speed_list: Vec::new(),
            availability_topic: None,
            payload_available: "online".to_string(),
            payload_not_available: "offline".to_string(),
        }
    }
}

impl VacuumConfig {
    /// Creates a configuration with every key at its default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON discovery payload.
    ///
    /// Only the shape is checked here; [`bind`](Self::bind) performs the
    /// semantic validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if the payload is not a JSON object
    /// matching the schema.
    pub fn from_discovery_payload(payload: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the supported capability names.
    #[must_use]
    pub fn with_supported_features<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_features = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the QoS level.
    #[must_use]
    pub fn with_qos(mut self, qos: u8) -> Self {
        self.qos = qos;
        self
    }

    /// Sets the retain flag.
    #[must_use]
    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    /// Sets the command topic.
    #[must_use]
    pub fn with_command_topic(mut self, topic: impl Into<String>) -> Self {
        self.command_topic = Some(topic.into());
        self
    }

    /// Sets the fan speed command topic.
    #[must_use]
    pub fn with_set_fan_speed_topic(mut self, topic: impl Into<String>) -> Self {
        self.set_fan_speed_topic = Some(topic.into());
        self
    }

    /// Sets the free-form command topic.
    #[must_use]
    pub fn with_send_command_topic(mut self, topic: impl Into<String>) -> Self {
        self.send_command_topic = Some(topic.into());
        self
    }

    /// Sets the state topic and optional value template for one signal.
    #[must_use]
    pub fn with_state(
        mut self,
        signal: Signal,
        topic: impl Into<String>,
        template: Option<&str>,
    ) -> Self {
        let (topic_slot, template_slot) = self.state_slots_mut(signal);
        *topic_slot = Some(topic.into());
        *template_slot = template.map(String::from);
        self
    }

    /// Sets the selectable fan speeds.
    #[must_use]
    pub fn with_fan_speed_list<I, S>(mut self, speeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fan_speed_list = speeds.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the availability topic.
    #[must_use]
    pub fn with_availability_topic(mut self, topic: impl Into<String>) -> Self {
        self.availability_topic = Some(topic.into());
        self
    }

    /// Returns the configured state topic and template for a signal.
    #[must_use]
    pub fn state_slots(&self, signal: Signal) -> (Option<&str>, Option<&str>) {
        let (topic, template) = match signal {
            Signal::BatteryLevel => (&self.battery_level_topic, &self.battery_level_template),
            Signal::Charging => (&self.charging_topic, &self.charging_template),
            Signal::Cleaning => (&self.cleaning_topic, &self.cleaning_template),
            Signal::Docked => (&self.docked_topic, &self.docked_template),
            Signal::Error => (&self.error_topic, &self.error_template),
            Signal::FanSpeed => (&self.fan_speed_topic, &self.fan_speed_template),
        };
        (topic.as_deref(), template.as_deref())
    }

    fn state_slots_mut(&mut self, signal: Signal) -> (&mut Option<String>, &mut Option<String>) {
        match signal {
            Signal::BatteryLevel => (
                &mut self.battery_level_topic,
                &mut self.battery_level_template,
            ),
            Signal::Charging => (&mut self.charging_topic, &mut self.charging_template),
            Signal::Cleaning => (&mut self.cleaning_topic, &mut self.cleaning_template),
            Signal::Docked => (&mut self.docked_topic, &mut self.docked_template),
            Signal::Error => (&mut self.error_topic, &mut self.error_template),
            Signal::FanSpeed => (&mut self.fan_speed_topic, &mut self.fan_speed_template),
        }
    }
}

/// Configuration key names, for error reporting.
pub(crate) fn topic_key(signal: Signal) -> &'static str {
    match signal {
        Signal::BatteryLevel => "battery_level_topic",
        Signal::Charging => "charging_topic",
        Signal::Cleaning => "cleaning_topic",
        Signal::Docked => "docked_topic",
        Signal::Error => "error_topic",
        Signal::FanSpeed => "fan_speed_topic",
    }
}

pub(crate) fn template_key(signal: Signal) -> &'static str {
    match signal {
        Signal::BatteryLevel => "battery_level_template",
        Signal::Charging => "charging_template",
        Signal::Cleaning => "cleaning_template",
        Signal::Docked => "docked_template",
        Signal::Error => "error_template",
        Signal::FanSpeed => "fan_speed_template",
    }
}

/// Validates a topic that will be published or matched exactly.
///
/// Empty topics are treated as unset and come back as `None`.
pub(crate) fn validate_topic(
    key: &'static str,
    topic: Option<&str>,
) -> Result<Option<String>, ConfigError> {
    let Some(topic) = topic.filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    let reason = if topic.len() > 65535 {
        Some("topic exceeds 65535 bytes")
    } else if topic.contains(['+', '#']) {
        Some("wildcards are not allowed")
    } else if topic.contains('\0') {
        Some("NUL characters are not allowed")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(ConfigError::InvalidTopic { key, reason }),
        None => Ok(Some(topic.to_string())),
    }
}

/// Accepts either a single string or a list of strings.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}
