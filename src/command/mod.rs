// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Vacuum commands.
//!
//! # Available Commands
//!
//! | Command | Capability | Topic | Payload | Optimistic status |
//! |---------|------------|-------|---------|-------------------|
//! | [`TurnOn`](VacuumCommand::TurnOn) | `turn_on` | command | `payload_turn_on` | cleaning |
//! | [`TurnOff`](VacuumCommand::TurnOff) | `turn_off` | command | `payload_turn_off` | turning off |
//! | [`Stop`](VacuumCommand::Stop) | `stop` | command | `payload_stop` | stopping the current task |
//! | [`CleanSpot`](VacuumCommand::CleanSpot) | `clean_spot` | command | `payload_clean_spot` | cleaning spot |
//! | [`Locate`](VacuumCommand::Locate) | `locate` | command | `payload_locate` | hi, i'm over here! |
//! | [`StartPause`](VacuumCommand::StartPause) | `pause` | command | `payload_start_pause` | pausing/resuming cleaning... |
//! | [`ReturnToBase`](VacuumCommand::ReturnToBase) | `return_home` | command | `payload_return_to_base` | returning home... |
//! | [`SetFanSpeed`](VacuumCommand::SetFanSpeed) | `fan_speed` | set fan speed | the speed | setting fan to {speed}... |
//! | [`SendCommand`](VacuumCommand::SendCommand) | `send_command` | send command | the command | sending command {command}... |
//!
//! # Examples
//!
//! ```
//! use mqtt_vacuum::command::VacuumCommand;
//! use mqtt_vacuum::config::VacuumConfig;
//!
//! let config = VacuumConfig::new()
//!     .with_command_topic("vacuum/command")
//!     .bind()
//!     .unwrap();
//!
//! let publication = VacuumCommand::ReturnToBase.resolve(&config).unwrap();
//! assert_eq!(publication.topic, "vacuum/command");
//! assert_eq!(publication.payload, "return_to_base");
//! ```

use serde_json::{Map, Value};

use crate::capabilities::Capability;
use crate::config::AdapterConfig;
use crate::types::QoS;

/// A user-issued vacuum action.
#[derive(Debug, Clone, PartialEq)]
pub enum VacuumCommand {
    /// Start cleaning.
    TurnOn,
    /// Turn the vacuum off.
    TurnOff,
    /// Stop the current task.
    Stop,
    /// Perform a spot clean.
    CleanSpot,
    /// Make the vacuum announce its position.
    Locate,
    /// Start, pause or resume the cleaning task.
    StartPause,
    /// Return to the dock.
    ReturnToBase,
    /// Select a fan speed from the configured list.
    SetFanSpeed(String),
    /// Send a free-form command.
    SendCommand {
        /// The command string, published as-is.
        command: String,
        /// Extra parameters. Accepted for interface compatibility and not
        /// published.
        params: Option<Map<String, Value>>,
    },
}

/// A resolved command message, ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    /// Destination topic.
    pub topic: String,
    /// Message payload.
    pub payload: String,
    /// QoS level.
    pub qos: QoS,
    /// Retain flag.
    pub retain: bool,
}

/// Why a command resolved to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// The capability is not supported.
    Unsupported(Capability),
    /// The fan speed is not in the configured list.
    UnknownFanSpeed,
    /// No topic is configured for the command.
    NoTopic,
}

impl VacuumCommand {
    /// Returns the capability gating this command.
    #[must_use]
    pub fn capability(&self) -> Capability {
        match self {
            Self::TurnOn => Capability::TurnOn,
            Self::TurnOff => Capability::TurnOff,
            Self::Stop => Capability::Stop,
            Self::CleanSpot => Capability::CleanSpot,
            Self::Locate => Capability::Locate,
            Self::StartPause => Capability::Pause,
            Self::ReturnToBase => Capability::ReturnHome,
            Self::SetFanSpeed(_) => Capability::FanSpeed,
            Self::SendCommand { .. } => Capability::SendCommand,
        }
    }

    /// Returns the status shown until telemetry reports otherwise.
    #[must_use]
    pub fn optimistic_status(&self) -> String {
        match self {
            Self::TurnOn => "cleaning".to_string(),
            Self::TurnOff => "turning off".to_string(),
            Self::Stop => "stopping the current task".to_string(),
            Self::CleanSpot => "cleaning spot".to_string(),
            Self::Locate => "hi, i'm over here!".to_string(),
            Self::StartPause => "pausing/resuming cleaning...".to_string(),
            Self::ReturnToBase => "returning home...".to_string(),
            Self::SetFanSpeed(speed) => format!("setting fan to {speed}..."),
            Self::SendCommand { command, .. } => format!("sending command {command}..."),
        }
    }

    /// Resolves the message this command publishes under `config`.
    ///
    /// # Errors
    ///
    /// Returns the [`Skip`] reason when the command must not publish: the
    /// capability is unsupported, the fan speed is not listed, or no topic
    /// is configured.
    pub fn resolve(&self, config: &AdapterConfig) -> Result<Publication, Skip> {
        let capability = self.capability();
        if !config.capabilities.contains(capability) {
            return Err(Skip::Unsupported(capability));
        }

        let (topic, payload) = match self {
            Self::SetFanSpeed(speed) => {
                if !config.fan_speed_list.iter().any(|s| s == speed) {
                    return Err(Skip::UnknownFanSpeed);
                }
                (config.set_fan_speed_topic.as_ref(), speed.as_str())
            }
            Self::SendCommand { command, .. } => {
                (config.send_command_topic.as_ref(), command.as_str())
            }
            fixed => (config.command_topic.as_ref(), fixed.fixed_payload(config)),
        };

        Ok(Publication {
            topic: topic.ok_or(Skip::NoTopic)?.clone(),
            payload: payload.to_string(),
            qos: config.qos,
            retain: config.retain,
        })
    }

    fn fixed_payload<'a>(&self, config: &'a AdapterConfig) -> &'a str {
        let payloads = &config.payloads;
        match self {
            Self::TurnOn => &payloads.turn_on,
            Self::TurnOff => &payloads.turn_off,
            Self::Stop => &payloads.stop,
            Self::CleanSpot => &payloads.clean_spot,
            Self::Locate => &payloads.locate,
            Self::StartPause => &payloads.start_pause,
            Self::ReturnToBase => &payloads.return_to_base,
            Self::SetFanSpeed(_) | Self::SendCommand { .. } => "",
        }
    }
}
