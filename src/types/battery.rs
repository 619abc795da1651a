// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Battery level as reported by the device.

/// Battery reading exactly as the device last reported it.
///
/// The raw value is stored unclamped so that an out-of-range reading is
/// preserved until the next one overwrites it. [`percent`](Self::percent)
/// clamps to 0-100 at read time.
///
/// # Examples
///
/// ```
/// use mqtt_vacuum::types::BatteryLevel;
///
/// let level = BatteryLevel::new(150);
/// assert_eq!(level.raw(), 150);
/// assert_eq!(level.percent(), 100);
/// assert_eq!(BatteryLevel::new(-10).percent(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BatteryLevel(i64);

impl BatteryLevel {
    /// Wraps a raw reading.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the reading as received.
    #[must_use]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Returns the reading clamped to 0-100.
    #[must_use]
    // Safe: clamped to 0..=100
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn percent(self) -> u8 {
        self.0.clamp(0, 100) as u8
    }

    /// Returns the Material Design icon name for this level.
    ///
    /// Charging levels above 10% round to 20% steps, discharging levels
    /// between 5% and 95% round to 10% steps.
    #[must_use]
    pub fn icon(self, charging: bool) -> String {
        let level = f64::from(self.percent());
        let mut icon = String::from("mdi:battery");
        if charging && level > 10.0 {
            icon.push_str(&format!("-charging-{}", step(level, 20.0)));
        } else if charging {
            icon.push_str("-outline");
        } else if level <= 5.0 {
            icon.push_str("-alert");
        } else if level < 95.0 {
            icon.push_str(&format!("-{}", step(level, 10.0)));
        }
        icon
    }
}

/// Rounds `level` down-biased onto a multiple of `size`.
// Safe: level is 0..=100, so the result is 0..=100
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn step(level: f64, size: f64) -> u8 {
    ((level / size - 0.01).round() * size) as u8
}

impl From<i64> for BatteryLevel {
    fn from(raw: i64) -> Self {
        Self::new(raw)
    }
}
