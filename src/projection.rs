// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Folding inbound messages into the state mirror.
//!
//! [`StateProjector`] is the only writer of the [`VacuumState`] mirror. It
//! reads the bound configuration through a shared cell so a reconfiguration
//! swaps topics and templates for every later message at once.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::availability::AvailabilityTracker;
use crate::config::AdapterConfig;
use crate::error::PayloadError;
use crate::state::{Signal, VacuumSnapshot, VacuumState};
use crate::subscription::CallbackRegistry;

/// Owns the mirror and turns state messages into host notifications.
#[derive(Debug)]
pub struct StateProjector {
    config: RwLock<Arc<AdapterConfig>>,
    state: RwLock<VacuumState>,
    availability: AvailabilityTracker,
    callbacks: CallbackRegistry,
}

impl StateProjector {
    /// Creates a projector with a fresh mirror.
    #[must_use]
    pub fn new(config: AdapterConfig) -> Self {
        Self {
            config: RwLock::new(Arc::new(config)),
            state: RwLock::new(VacuumState::new()),
            availability: AvailabilityTracker::new(),
            callbacks: CallbackRegistry::new(),
        }
    }

    /// Returns the configuration currently bound.
    #[must_use]
    pub fn config(&self) -> Arc<AdapterConfig> {
        Arc::clone(&self.config.read())
    }

    /// Swaps in a new configuration, leaving the mirror untouched.
    ///
    /// Returns the configuration it replaced.
    pub fn replace_config(&self, config: impl Into<Arc<AdapterConfig>>) -> Arc<AdapterConfig> {
        std::mem::replace(&mut *self.config.write(), config.into())
    }

    /// Returns a copy of the mirror.
    #[must_use]
    pub fn state(&self) -> VacuumState {
        self.state.read().clone()
    }

    /// Returns the host callback registry.
    #[must_use]
    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    /// Returns whether the device is currently available.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.availability.is_available(&self.config().availability)
    }

    /// Projects the mirror for the host.
    #[must_use]
    pub fn snapshot(&self) -> VacuumSnapshot {
        let config = self.config();
        let state = self.state.read();
        VacuumSnapshot::new(
            &config,
            &state,
            self.availability.is_available(&config.availability),
        )
    }

    /// Handles one inbound state message.
    ///
    /// Every signal whose topic equals `topic` and which has a template is
    /// rendered, coerced and written to the mirror. A value the template
    /// cannot produce is skipped silently. A value that fails coercion
    /// leaves its field as it was and does not stop the other signals. The
    /// status is recomputed when `topic` belongs to any signal, and the
    /// host is notified in every case.
    ///
    /// # Errors
    ///
    /// Returns the first [`PayloadError::InvalidPayload`] of the pass. The
    /// mirror and the notification reflect every signal that succeeded.
    pub fn on_message(&self, topic: &str, payload: &str) -> Result<(), PayloadError> {
        let config = self.config();
        let mut first_error = None;

        {
            let mut state = self.state.write();
            let mut recognized = false;

            for signal in Signal::ALL {
                if config.state_topic(signal) != Some(topic) {
                    continue;
                }
                recognized = true;
                let Some(template) = config.template(signal) else {
                    continue;
                };
                let Some(rendered) = template.render_with_possible_json_value(payload) else {
                    tracing::trace!(topic = %topic, %signal, "Template produced no value");
                    continue;
                };
                match signal.coerce(&rendered) {
                    Ok(value) => {
                        tracing::debug!(topic = %topic, %signal, ?value, "Updating state");
                        state.apply(signal, value);
                    }
                    Err(e) => {
                        tracing::warn!(topic = %topic, error = %e, "Discarding state value");
                        first_error.get_or_insert(e);
                    }
                }
            }

            if recognized {
                state.refresh_status();
            } else {
                tracing::trace!(topic = %topic, "Message on unrecognized topic");
            }
        }

        self.notify();
        first_error.map_or(Ok(()), Err)
    }

    /// Handles a message on the availability topic.
    pub fn on_availability_message(&self, payload: &str) {
        let config = self.config();
        if let Some(available) = self.availability.on_message(&config.availability, payload) {
            tracing::debug!(available, "Availability changed");
            self.callbacks.dispatch_availability(available);
            self.notify();
        }
    }

    /// Overwrites the status with an optimistic command status.
    pub fn set_optimistic_status(&self, status: impl Into<String>) {
        self.state.write().set_status(status);
    }

    /// Sends the current snapshot to every state callback.
    pub fn notify(&self) {
        let snapshot = self.snapshot();
        self.callbacks.dispatch_state_changed(&snapshot);
    }
}
