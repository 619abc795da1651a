// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host-facing view of the vacuum.

use crate::capabilities::{Capabilities, Capability};
use crate::config::AdapterConfig;

use super::VacuumState;

/// What the hosting framework sees of the vacuum at one instant.
///
/// Optional fields are `None` when the matching capability is not
/// supported, mirroring how the framework hides unsupported attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VacuumSnapshot {
    /// Display name.
    pub name: String,
    /// Whether the vacuum is on (it is cleaning).
    pub is_on: bool,
    /// Status string, if status reporting is supported.
    pub status: Option<String>,
    /// Battery percentage clamped to 0-100, if battery reporting is supported.
    pub battery_level: Option<u8>,
    /// Battery icon name, if battery reporting is supported.
    pub battery_icon: Option<String>,
    /// Current fan speed, if fan speed is supported.
    pub fan_speed: Option<String>,
    /// Selectable fan speeds, empty when fan speed is unsupported.
    pub fan_speed_list: Vec<String>,
    /// Supported capabilities.
    pub supported_features: Capabilities,
    /// Whether the device is reachable.
    pub available: bool,
}

impl VacuumSnapshot {
    /// Projects the mirror through the capability gates of `config`.
    #[must_use]
    pub fn new(config: &AdapterConfig, state: &VacuumState, available: bool) -> Self {
        let caps = config.capabilities;
        let battery = caps.contains(Capability::Battery);
        let fan_speed = caps.contains(Capability::FanSpeed);

        Self {
            name: config.name.clone(),
            is_on: state.is_cleaning(),
            status: caps
                .contains(Capability::Status)
                .then(|| state.status().to_string()),
            battery_level: battery.then(|| state.battery_level().percent()),
            battery_icon: battery.then(|| state.battery_level().icon(state.is_charging())),
            fan_speed: fan_speed.then(|| state.fan_speed().to_string()),
            fan_speed_list: if fan_speed {
                config.fan_speed_list.clone()
            } else {
                Vec::new()
            },
            supported_features: caps,
            available,
        }
    }
}
