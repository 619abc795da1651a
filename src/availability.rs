// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Availability tracking from an online/offline topic.

use std::sync::atomic::{AtomicBool, Ordering};

/// Availability settings from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityConfig {
    /// Topic carrying the availability payloads. `None` means always
    /// available.
    pub topic: Option<String>,
    /// Payload that marks the device available.
    pub payload_available: String,
    /// Payload that marks the device unavailable.
    pub payload_not_available: String,
}

impl AvailabilityConfig {
    /// Maps a payload to the availability it announces.
    #[must_use]
    pub fn parse(&self, payload: &str) -> Option<bool> {
        if payload == self.payload_available {
            Some(true)
        } else if payload == self.payload_not_available {
            Some(false)
        } else {
            None
        }
    }
}

/// Last availability announced on the availability topic.
///
/// Starts out unavailable; a device with an availability topic is only
/// considered reachable once it has said so.
#[derive(Debug, Default)]
pub struct AvailabilityTracker {
    announced: AtomicBool,
}

impl AvailabilityTracker {
    /// Creates a tracker with nothing announced yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the device is available under `config`.
    #[must_use]
    pub fn is_available(&self, config: &AvailabilityConfig) -> bool {
        config.topic.is_none() || self.announced.load(Ordering::Acquire)
    }

    /// Records an availability payload.
    ///
    /// Returns the new availability if the payload changed it. Payloads
    /// other than the configured available/not-available ones are ignored.
    pub fn on_message(&self, config: &AvailabilityConfig, payload: &str) -> Option<bool> {
        let Some(available) = config.parse(payload) else {
            tracing::trace!(payload = %payload, "Ignoring unrecognized availability payload");
            return None;
        };
        let previous = self.announced.swap(available, Ordering::AcqRel);
        (previous != available).then_some(available)
    }
}
