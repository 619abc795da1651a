// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Vacuum capability registry.
//!
//! Every feature a vacuum may support is one [`Capability`]. A set of them
//! is stored as a bitmask in [`Capabilities`]. The registry fixes both the
//! bit values and the wire names used in configuration payloads, and its
//! declaration order is the order names are reported in.
//!
//! # Examples
//!
//! ```
//! use mqtt_vacuum::{Capabilities, Capability};
//!
//! let caps = Capabilities::from_strings(["turn_on", "fan_speed"]).unwrap();
//! assert!(caps.contains(Capability::FanSpeed));
//! assert_eq!(caps.to_strings(), vec!["turn_on", "fan_speed"]);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// A single vacuum feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Start cleaning.
    TurnOn,
    /// Stop cleaning and power down.
    TurnOff,
    /// Start, pause or resume the current task.
    Pause,
    /// Stop the current task.
    Stop,
    /// Return to the dock.
    ReturnHome,
    /// Report and change fan speed.
    FanSpeed,
    /// Report the battery level.
    Battery,
    /// Report a status string.
    Status,
    /// Send free-form commands.
    SendCommand,
    /// Make the vacuum announce its position.
    Locate,
    /// Perform a spot clean.
    CleanSpot,
}

/// Registry in declaration order: capability, bit, wire name.
const REGISTRY: [(Capability, u16, &str); 11] = [
    (Capability::TurnOn, 1, "turn_on"),
    (Capability::TurnOff, 2, "turn_off"),
    (Capability::Pause, 4, "pause"),
    (Capability::Stop, 8, "stop"),
    (Capability::ReturnHome, 16, "return_home"),
    (Capability::FanSpeed, 32, "fan_speed"),
    (Capability::Battery, 64, "battery"),
    (Capability::Status, 128, "status"),
    (Capability::SendCommand, 256, "send_command"),
    (Capability::Locate, 512, "locate"),
    (Capability::CleanSpot, 1024, "clean_spot"),
];

impl Capability {
    /// All capabilities in registry order.
    pub const ALL: [Self; 11] = [
        Self::TurnOn,
        Self::TurnOff,
        Self::Pause,
        Self::Stop,
        Self::ReturnHome,
        Self::FanSpeed,
        Self::Battery,
        Self::Status,
        Self::SendCommand,
        Self::Locate,
        Self::CleanSpot,
    ];

    /// Returns the bit this capability occupies in a [`Capabilities`] mask.
    #[must_use]
    pub const fn bit(self) -> u16 {
        REGISTRY[self as usize].1
    }

    /// Returns the wire name used in configuration payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        REGISTRY[self as usize].2
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        REGISTRY
            .iter()
            .find(|(_, _, name)| *name == s)
            .map(|(cap, _, _)| *cap)
            .ok_or_else(|| ConfigError::UnknownCapability(s.to_string()))
    }
}

/// A set of [`Capability`] values stored as a bitmask.
///
/// Only registered capabilities are representable: the raw mask is never
/// accepted from outside the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u16);

impl Capabilities {
    /// The empty set.
    pub const NONE: Self = Self(0);

    /// Capabilities enabled when the configuration does not name any:
    /// turn on/off, stop, return home, status, battery and spot cleaning.
    pub const DEFAULT: Self = Self(
        Capability::TurnOn.bit()
            | Capability::TurnOff.bit()
            | Capability::Stop.bit()
            | Capability::ReturnHome.bit()
            | Capability::Status.bit()
            | Capability::Battery.bit()
            | Capability::CleanSpot.bit(),
    );

    /// Every registered capability.
    pub const ALL: Self = Self(
        Self::DEFAULT.0
            | Capability::Pause.bit()
            | Capability::Locate.bit()
            | Capability::FanSpeed.bit()
            | Capability::SendCommand.bit(),
    );

    /// Builds a set from wire names.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownCapability`] for the first name that is
    /// not registered.
    pub fn from_strings<I, S>(names: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().try_fold(Self::NONE, |caps, name| {
            Ok(caps.with(name.as_ref().parse::<Capability>()?))
        })
    }

    /// Returns the wire names of the set, in registry order.
    #[must_use]
    pub fn to_strings(self) -> Vec<&'static str> {
        self.iter().map(Capability::as_str).collect()
    }

    /// Iterates over the capabilities in the set, in registry order.
    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL
            .into_iter()
            .filter(move |cap| self.contains(*cap))
    }

    /// Returns `true` if `capability` is in the set.
    #[must_use]
    pub const fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    /// Returns the set with `capability` added.
    #[must_use]
    pub const fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    /// Returns the set with `capability` removed.
    #[must_use]
    pub const fn without(self, capability: Capability) -> Self {
        Self(self.0 & !capability.bit())
    }

    /// Returns the raw bitmask, as reported to the hosting framework.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Returns `true` if the set is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, Self::with)
    }
}
