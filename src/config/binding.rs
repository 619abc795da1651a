// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Validated configuration the adapter runs on.

use std::sync::Arc;

use crate::availability::AvailabilityConfig;
use crate::capabilities::Capabilities;
use crate::error::ConfigError;
use crate::state::Signal;
use crate::template::{Render, RendererFactory, ValueTemplate};
use crate::types::QoS;

use super::{VacuumConfig, template_key, topic_key, validate_topic};

/// One value per [`Signal`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerSignal<T> {
    battery_level: T,
    charging: T,
    cleaning: T,
    docked: T,
    error: T,
    fan_speed: T,
}

impl<T> PerSignal<T> {
    /// Builds a map by calling `f` once per signal.
    pub fn from_fn(mut f: impl FnMut(Signal) -> T) -> Self {
        Self {
            battery_level: f(Signal::BatteryLevel),
            charging: f(Signal::Charging),
            cleaning: f(Signal::Cleaning),
            docked: f(Signal::Docked),
            error: f(Signal::Error),
            fan_speed: f(Signal::FanSpeed),
        }
    }

    /// Returns the value for `signal`.
    #[must_use]
    pub fn get(&self, signal: Signal) -> &T {
        match signal {
            Signal::BatteryLevel => &self.battery_level,
            Signal::Charging => &self.charging,
            Signal::Cleaning => &self.cleaning,
            Signal::Docked => &self.docked,
            Signal::Error => &self.error,
            Signal::FanSpeed => &self.fan_speed,
        }
    }

    /// Returns a mutable reference to the value for `signal`.
    pub fn get_mut(&mut self, signal: Signal) -> &mut T {
        match signal {
            Signal::BatteryLevel => &mut self.battery_level,
            Signal::Charging => &mut self.charging,
            Signal::Cleaning => &mut self.cleaning,
            Signal::Docked => &mut self.docked,
            Signal::Error => &mut self.error,
            Signal::FanSpeed => &mut self.fan_speed,
        }
    }

    /// Iterates over every signal and its value, in processing order.
    pub fn iter(&self) -> impl Iterator<Item = (Signal, &T)> {
        Signal::ALL.into_iter().map(|signal| (signal, self.get(signal)))
    }
}

/// Fixed command payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payloads {
    /// Sent to start cleaning.
    pub turn_on: String,
    /// Sent to turn the vacuum off.
    pub turn_off: String,
    /// Sent to return to the dock.
    pub return_to_base: String,
    /// Sent to stop the current task.
    pub stop: String,
    /// Sent to start a spot clean.
    pub clean_spot: String,
    /// Sent to make the vacuum announce itself.
    pub locate: String,
    /// Sent to toggle between cleaning and paused.
    pub start_pause: String,
}

/// Immutable, validated configuration.
///
/// Produced by [`VacuumConfig::bind`]. Reconfiguration builds a new value
/// and swaps it in whole, so readers never observe a mix of two
/// configurations.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Display name.
    pub name: String,
    /// Supported capabilities.
    pub capabilities: Capabilities,
    /// QoS for publishes and subscriptions.
    pub qos: QoS,
    /// Retain flag for publishes.
    pub retain: bool,
    /// Topic for the fixed-payload commands.
    pub command_topic: Option<String>,
    /// Topic for fan speed commands.
    pub set_fan_speed_topic: Option<String>,
    /// Topic for free-form commands.
    pub send_command_topic: Option<String>,
    /// Fixed command payloads.
    pub payloads: Payloads,
    /// State topic per signal.
    pub state_topics: PerSignal<Option<String>>,
    /// Compiled value template per signal.
    pub templates: PerSignal<Option<Arc<dyn Render>>>,
    /// Selectable fan speeds.
    pub fan_speed_list: Vec<String>,
    /// Availability tracking settings.
    pub availability: AvailabilityConfig,
}

impl VacuumConfig {
    /// Validates the configuration and derives an [`AdapterConfig`].
    ///
    /// # Errors
    ///
    /// - [`ConfigError::UnknownCapability`] for an unrecognized feature name
    /// - [`ConfigError::InvalidQos`] for a QoS outside 0-2
    /// - [`ConfigError::InvalidTopic`] for a topic with wildcards, NUL
    ///   characters, or more than 65535 bytes
    /// - [`ConfigError::InvalidTemplate`] for a template that does not parse
    pub fn bind(&self) -> Result<AdapterConfig, ConfigError> {
        self.bind_with(&ValueTemplate::factory())
    }

    /// Like [`bind`](Self::bind), compiling templates with `renderers`.
    ///
    /// # Errors
    ///
    /// Same as [`bind`](Self::bind); `InvalidTemplate` carries the
    /// factory's message.
    pub fn bind_with(&self, renderers: &RendererFactory) -> Result<AdapterConfig, ConfigError> {
        let capabilities = Capabilities::from_strings(&self.supported_features)?;
        let qos = QoS::try_from(self.qos)?;

        let mut state_topics = PerSignal::default();
        let mut templates: PerSignal<Option<Arc<dyn Render>>> = PerSignal::default();
        for signal in Signal::ALL {
            let (topic, template) = self.state_slots(signal);
            *state_topics.get_mut(signal) = validate_topic(topic_key(signal), topic)?;
            if let Some(source) = template {
                let compiled = renderers(source).map_err(|e| ConfigError::InvalidTemplate {
                    key: template_key(signal),
                    message: e.to_string(),
                })?;
                *templates.get_mut(signal) = Some(compiled);
            }
        }

        let availability = AvailabilityConfig {
            topic: validate_topic("availability_topic", self.availability_topic.as_deref())?,
            payload_available: self.payload_available.clone(),
            payload_not_available: self.payload_not_available.clone(),
        };

        Ok(AdapterConfig {
            name: self.name.clone(),
            capabilities,
            qos,
            retain: self.retain,
            command_topic: validate_topic("command_topic", self.command_topic.as_deref())?,
            set_fan_speed_topic: validate_topic(
                "set_fan_speed_topic",
                self.set_fan_speed_topic.as_deref(),
            )?,
            send_command_topic: validate_topic(
                "send_command_topic",
                self.send_command_topic.as_deref(),
            )?,
            payloads: Payloads {
                turn_on: self.payload_turn_on.clone(),
                turn_off: self.payload_turn_off.clone(),
                return_to_base: self.payload_return_to_base.clone(),
                stop: self.payload_stop.clone(),
                clean_spot: self.payload_clean_spot.clone(),
                locate: self.payload_locate.clone(),
                start_pause: self.payload_start_pause.clone(),
            },
            state_topics,
            templates,
            fan_speed_list: self.fan_speed_list.clone(),
            availability,
        })
    }
}

impl AdapterConfig {
    /// Returns the state topic for `signal`, if one is configured.
    #[must_use]
    pub fn state_topic(&self, signal: Signal) -> Option<&str> {
        self.state_topics.get(signal).as_deref()
    }

    /// Returns the renderer for `signal`, if one is configured.
    #[must_use]
    pub fn template(&self, signal: Signal) -> Option<&Arc<dyn Render>> {
        self.templates.get(signal).as_ref()
    }
}
