// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The adapter's local mirror of the vacuum's condition.

use crate::types::BatteryLevel;

use super::{Signal, SignalValue};

/// Status reported before any telemetry or command has set one.
pub const STATUS_UNKNOWN: &str = "unknown";

/// Fan speed reported before the device has announced one.
pub const FAN_SPEED_UNKNOWN: &str = "unknown";

/// Last known state of the vacuum.
///
/// Fields are only ever overwritten, never reset: a value survives until a
/// newer message for the same signal replaces it, including across
/// reconfiguration.
///
/// # Examples
///
/// ```
/// use mqtt_vacuum::state::{Signal, SignalValue, VacuumState};
///
/// let mut state = VacuumState::new();
/// state.apply(Signal::Docked, SignalValue::Bool(true));
/// state.apply(Signal::Charging, SignalValue::Bool(true));
/// state.refresh_status();
///
/// assert_eq!(state.status(), "docked & charging");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VacuumState {
    cleaning: bool,
    charging: bool,
    docked: bool,
    error: Option<String>,
    battery_level: BatteryLevel,
    fan_speed: String,
    status: String,
}

impl Default for VacuumState {
    fn default() -> Self {
        Self {
            cleaning: false,
            charging: false,
            docked: false,
            error: None,
            battery_level: BatteryLevel::default(),
            fan_speed: FAN_SPEED_UNKNOWN.to_string(),
            status: STATUS_UNKNOWN.to_string(),
        }
    }
}

impl VacuumState {
    /// Creates a mirror with nothing known yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the vacuum reported it is cleaning.
    #[must_use]
    pub fn is_cleaning(&self) -> bool {
        self.cleaning
    }

    /// Returns `true` if the vacuum reported it is charging.
    #[must_use]
    pub fn is_charging(&self) -> bool {
        self.charging
    }

    /// Returns `true` if the vacuum reported it is docked.
    #[must_use]
    pub fn is_docked(&self) -> bool {
        self.docked
    }

    /// Returns the last reported error text, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the raw battery reading.
    #[must_use]
    pub fn battery_level(&self) -> BatteryLevel {
        self.battery_level
    }

    /// Returns the last reported fan speed.
    #[must_use]
    pub fn fan_speed(&self) -> &str {
        &self.fan_speed
    }

    /// Returns the current status string.
    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Overwrites the field belonging to `signal`.
    ///
    /// A value of the wrong shape for the signal is ignored; values come
    /// from [`Signal::coerce`], which always produces the right one.
    pub fn apply(&mut self, signal: Signal, value: SignalValue) {
        match (signal, value) {
            (Signal::BatteryLevel, SignalValue::Integer(level)) => {
                self.battery_level = BatteryLevel::new(level);
            }
            (Signal::Charging, SignalValue::Bool(flag)) => self.charging = flag,
            (Signal::Cleaning, SignalValue::Bool(flag)) => self.cleaning = flag,
            (Signal::Docked, SignalValue::Bool(flag)) => self.docked = flag,
            (Signal::Error, SignalValue::Text(text)) => self.error = Some(text),
            (Signal::FanSpeed, SignalValue::Text(text)) => self.fan_speed = text,
            (signal, value) => {
                tracing::trace!(%signal, ?value, "Ignoring mismatched signal value");
            }
        }
    }

    /// Overwrites the status string without touching the other fields.
    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Recomputes the status from the mirrored fields.
    pub fn refresh_status(&mut self) {
        self.status = self.derived_status();
    }

    /// Computes the status the mirrored fields imply.
    ///
    /// Precedence is docked, then cleaning, then error, so a docked vacuum
    /// reporting an error still reads "docked".
    #[must_use]
    pub fn derived_status(&self) -> String {
        if self.docked {
            if self.charging {
                "docked & charging".to_string()
            } else {
                "docked".to_string()
            }
        } else if self.cleaning {
            "cleaning".to_string()
        } else if let Some(error) = self.error.as_deref().filter(|e| !e.is_empty()) {
            format!("error: {error}")
        } else {
            "stopped".to_string()
        }
    }
}
