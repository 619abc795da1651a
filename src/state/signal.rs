// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inbound state signals and their value coercion.

use std::fmt;

use crate::error::PayloadError;

/// One kind of state the vacuum reports on its own topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Battery level, an integer percentage.
    BatteryLevel,
    /// Whether the vacuum is charging.
    Charging,
    /// Whether the vacuum is cleaning.
    Cleaning,
    /// Whether the vacuum sits on its dock.
    Docked,
    /// Free-form error text.
    Error,
    /// Current fan speed name.
    FanSpeed,
}

impl Signal {
    /// All signals, in the order messages are evaluated against them.
    pub const ALL: [Self; 6] = [
        Self::BatteryLevel,
        Self::Charging,
        Self::Cleaning,
        Self::Docked,
        Self::Error,
        Self::FanSpeed,
    ];

    /// Returns the signal's name as used in logs and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BatteryLevel => "battery_level",
            Self::Charging => "charging",
            Self::Cleaning => "cleaning",
            Self::Docked => "docked",
            Self::Error => "error",
            Self::FanSpeed => "fan_speed",
        }
    }

    /// Converts a rendered value into the signal's native type.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::InvalidPayload`] when the value is not an
    /// integer (battery level) or a recognised boolean word (charging,
    /// cleaning, docked). Text signals never fail.
    pub fn coerce(self, rendered: &str) -> Result<SignalValue, PayloadError> {
        match self {
            Self::BatteryLevel => rendered
                .trim()
                .parse::<i64>()
                .map(SignalValue::Integer)
                .map_err(|_| self.invalid(rendered, "integer")),
            Self::Charging | Self::Cleaning | Self::Docked => parse_bool(rendered)
                .map(SignalValue::Bool)
                .ok_or_else(|| self.invalid(rendered, "boolean")),
            Self::Error | Self::FanSpeed => Ok(SignalValue::Text(rendered.to_string())),
        }
    }

    fn invalid(self, rendered: &str, expected: &'static str) -> PayloadError {
        PayloadError::InvalidPayload {
            signal: self,
            value: rendered.to_string(),
            expected,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coerced signal value, ready to be folded into the mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalValue {
    /// Integer reading.
    Integer(i64),
    /// Boolean flag.
    Bool(bool),
    /// Free-form text.
    Text(String),
}

/// Parses the boolean words accepted in configuration and payloads.
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enable" => Some(true),
        "0" | "false" | "no" | "off" | "disable" => Some(false),
        _ => None,
    }
}
