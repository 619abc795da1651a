// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The MQTT vacuum adapter.
//!
//! [`MqttVacuum`] ties the pieces together: it binds the configuration,
//! installs the state and availability subscriptions on its [`Transport`],
//! publishes commands, and tells the host whenever its observable state
//! may have changed.
//!
//! # Examples
//!
//! ```no_run
//! use mqtt_vacuum::MqttVacuum;
//! use mqtt_vacuum::config::VacuumConfig;
//! use mqtt_vacuum::protocol::MqttBroker;
//! use mqtt_vacuum::state::Signal;
//!
//! # async fn example() -> mqtt_vacuum::Result<()> {
//! let broker = MqttBroker::builder().host("192.168.1.50").build().await?;
//!
//! let config = VacuumConfig::new()
//!     .with_supported_features(["turn_on", "return_home", "status", "battery"])
//!     .with_command_topic("vacuum/command")
//!     .with_state(Signal::BatteryLevel, "vacuum/state", Some("{{ value_json.battery_level }}"))
//!     .with_state(Signal::Docked, "vacuum/state", Some("{{ value_json.docked }}"));
//!
//! let vacuum = MqttVacuum::new(broker, config)?;
//! vacuum.attach().await?;
//!
//! vacuum.turn_on().await?;
//! println!("status: {:?}", vacuum.status());
//!
//! vacuum.remove().await;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::capabilities::Capabilities;
use crate::command::VacuumCommand;
use crate::config::VacuumConfig;
use crate::discovery::DiscoveryUpdate;
use crate::error::{PayloadError, Result};
use crate::projection::StateProjector;
use crate::protocol::{MessageCallback, Transport};
use crate::state::{VacuumSnapshot, VacuumState};
use crate::subscription::{Subscribable, SubscriptionHandle, SubscriptionId, state_topics};
use crate::template::{RendererFactory, ValueTemplate};

/// A vacuum cleaner reachable only through MQTT messages.
pub struct MqttVacuum<T> {
    transport: T,
    projector: Arc<StateProjector>,
    /// Compiles templates on every bind.
    renderers: RendererFactory,
    /// Held for the whole of attach, reconfigure and remove.
    subscriptions: Mutex<Subscriptions>,
}

#[derive(Debug, Default)]
struct Subscriptions {
    state: SubscriptionHandle,
    availability: SubscriptionHandle,
    removed: bool,
}

impl<T: Transport> MqttVacuum<T> {
    /// Creates an adapter from a configuration.
    ///
    /// Nothing is subscribed until [`attach`](Self::attach) is called.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration does not bind.
    pub fn new(transport: T, config: VacuumConfig) -> Result<Self> {
        Self::with_renderer_factory(transport, config, ValueTemplate::factory())
    }

    /// Creates an adapter whose templates are compiled by `renderers`.
    ///
    /// The factory is kept and used again for every reconfiguration, so a
    /// host template engine stays in place across discovery updates.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration does not bind.
    pub fn with_renderer_factory(
        transport: T,
        config: VacuumConfig,
        renderers: RendererFactory,
    ) -> Result<Self> {
        let bound = config.bind_with(&renderers)?;
        tracing::debug!(name = %bound.name, capabilities = ?bound.capabilities, "Created vacuum adapter");
        Ok(Self {
            transport,
            projector: Arc::new(StateProjector::new(bound)),
            renderers,
            subscriptions: Mutex::new(Subscriptions::default()),
        })
    }

    /// Returns the transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Subscribes the state and availability topics.
    ///
    /// Calling it again replaces the subscriptions with an identical set.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if a subscription fails.
    pub async fn attach(&self) -> Result<()> {
        let mut subscriptions = self.subscriptions.lock().await;
        subscriptions.removed = false;
        self.resubscribe(&mut subscriptions).await
    }

    /// Applies a discovery payload.
    ///
    /// An empty payload removes the adapter; anything else reconfigures it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the payload is invalid, in which case the
    /// adapter keeps running on its previous configuration, or
    /// `Error::Protocol` if resubscribing fails.
    pub async fn discovery_update(&self, payload: &str) -> Result<()> {
        match DiscoveryUpdate::parse(payload)? {
            DiscoveryUpdate::Reconfigure(config) => self.reconfigure(*config).await,
            DiscoveryUpdate::Remove => {
                self.remove().await;
                Ok(())
            }
        }
    }

    /// Replaces the configuration at runtime.
    ///
    /// Runs rebind, resubscribe and notify in that order while holding the
    /// subscription lock, so concurrent reconfigurations do not interleave.
    /// The state mirror is kept as it is.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration does not bind, or
    /// `Error::Protocol` if resubscribing fails. Either way the adapter
    /// keeps running on its previous configuration and subscriptions.
    pub async fn reconfigure(&self, config: VacuumConfig) -> Result<()> {
        let bound = config.bind_with(&self.renderers)?;
        let mut subscriptions = self.subscriptions.lock().await;
        if subscriptions.removed {
            tracing::debug!("Ignoring reconfiguration of removed vacuum");
            return Ok(());
        }

        tracing::info!(name = %bound.name, "Reconfiguring vacuum");
        let previous = self.projector.replace_config(bound);
        if let Err(e) = self.resubscribe(&mut subscriptions).await {
            tracing::warn!(error = %e, name = %previous.name, "Resubscription failed, restoring previous configuration");
            self.projector.replace_config(previous);
            if let Err(restore) = self.resubscribe(&mut subscriptions).await {
                tracing::error!(error = %restore, "Failed to restore previous subscriptions");
            }
            return Err(e);
        }
        drop(subscriptions);

        self.projector.notify();
        Ok(())
    }

    /// Tears down every subscription.
    ///
    /// No state callback fires for the old topics once this returns.
    /// Later reconfigurations are ignored until [`attach`](Self::attach) is
    /// called again.
    pub async fn remove(&self) {
        let mut subscriptions = self.subscriptions.lock().await;
        subscriptions.state.teardown(&self.transport).await;
        subscriptions.availability.teardown(&self.transport).await;
        subscriptions.removed = true;
        tracing::info!(name = %self.projector.config().name, "Removed vacuum");
    }

    /// Installs both subscription sets for the current configuration.
    ///
    /// On failure both handles are left empty, never holding part of a set.
    async fn resubscribe(&self, subscriptions: &mut Subscriptions) -> Result<()> {
        let result = self.install_subscriptions(subscriptions).await;
        if result.is_err() {
            subscriptions.state.teardown(&self.transport).await;
            subscriptions.availability.teardown(&self.transport).await;
        }
        result
    }

    async fn install_subscriptions(&self, subscriptions: &mut Subscriptions) -> Result<()> {
        let config = self.projector.config();

        let projector = Arc::downgrade(&self.projector);
        let on_state: MessageCallback = Arc::new(move |topic: &str, payload: &str| {
            if let Some(projector) = Weak::upgrade(&projector)
                && let Err(e) = projector.on_message(topic, payload)
            {
                // Already logged at warn by the projector
                tracing::trace!(topic = %topic, error = %e, "State message partially applied");
            }
        });
        subscriptions
            .state
            .resubscribe(&self.transport, state_topics(&config), config.qos, &on_state)
            .await?;

        let projector = Arc::downgrade(&self.projector);
        let on_availability: MessageCallback = Arc::new(move |_topic: &str, payload: &str| {
            if let Some(projector) = Weak::upgrade(&projector) {
                projector.on_availability_message(payload);
            }
        });
        let availability_topics: BTreeSet<String> =
            config.availability.topic.iter().cloned().collect();
        subscriptions
            .availability
            .resubscribe(
                &self.transport,
                availability_topics,
                config.qos,
                &on_availability,
            )
            .await?;

        tracing::debug!(
            state_topics = subscriptions.state.len(),
            availability_topics = subscriptions.availability.len(),
            "Subscriptions installed"
        );
        Ok(())
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Executes a command.
    ///
    /// Commands whose capability is unsupported, whose fan speed is not
    /// listed, or that have no topic configured do nothing. Otherwise the
    /// message is published, the optimistic status set and the host
    /// notified.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the publish fails. The status is left
    /// unchanged in that case.
    pub async fn execute(&self, command: VacuumCommand) -> Result<()> {
        let config = self.projector.config();
        let publication = match command.resolve(&config) {
            Ok(publication) => publication,
            Err(skip) => {
                tracing::debug!(?command, ?skip, "Command skipped");
                return Ok(());
            }
        };

        self.transport
            .publish(
                &publication.topic,
                &publication.payload,
                publication.qos,
                publication.retain,
            )
            .await?;
        tracing::debug!(?command, topic = %publication.topic, "Command published");

        self.projector
            .set_optimistic_status(command.optimistic_status());
        self.projector.notify();
        Ok(())
    }

    /// Starts cleaning.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the publish fails.
    pub async fn turn_on(&self) -> Result<()> {
        self.execute(VacuumCommand::TurnOn).await
    }

    /// Turns the vacuum off.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the publish fails.
    pub async fn turn_off(&self) -> Result<()> {
        self.execute(VacuumCommand::TurnOff).await
    }

    /// Stops the current task.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the publish fails.
    pub async fn stop(&self) -> Result<()> {
        self.execute(VacuumCommand::Stop).await
    }

    /// Performs a spot clean.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the publish fails.
    pub async fn clean_spot(&self) -> Result<()> {
        self.execute(VacuumCommand::CleanSpot).await
    }

    /// Makes the vacuum announce its position.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the publish fails.
    pub async fn locate(&self) -> Result<()> {
        self.execute(VacuumCommand::Locate).await
    }

    /// Starts, pauses or resumes cleaning.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the publish fails.
    pub async fn start_pause(&self) -> Result<()> {
        self.execute(VacuumCommand::StartPause).await
    }

    /// Sends the vacuum back to its dock.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the publish fails.
    pub async fn return_to_base(&self) -> Result<()> {
        self.execute(VacuumCommand::ReturnToBase).await
    }

    /// Selects a fan speed. Speeds outside the configured list are ignored.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the publish fails.
    pub async fn set_fan_speed(&self, speed: &str) -> Result<()> {
        self.execute(VacuumCommand::SetFanSpeed(speed.to_string()))
            .await
    }

    /// Sends a free-form command. `params` is accepted but not published.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the publish fails.
    pub async fn send_command(
        &self,
        command: &str,
        params: Option<Map<String, Value>>,
    ) -> Result<()> {
        self.execute(VacuumCommand::SendCommand {
            command: command.to_string(),
            params,
        })
        .await
    }
}

impl<T> MqttVacuum<T> {
    // =========================================================================
    // Inbound messages
    // =========================================================================

    /// Feeds one inbound message to the adapter, as the transport would.
    ///
    /// # Errors
    ///
    /// Returns the first [`PayloadError`] of the pass; see
    /// [`StateProjector::on_message`].
    pub fn handle_message(&self, topic: &str, payload: &str) -> std::result::Result<(), PayloadError> {
        let config = self.projector.config();
        if config.availability.topic.as_deref() == Some(topic) {
            self.projector.on_availability_message(payload);
            let also_state = config
                .state_topics
                .iter()
                .any(|(_, t)| t.as_deref() == Some(topic));
            if !also_state {
                return Ok(());
            }
        }
        self.projector.on_message(topic, payload)
    }

    // =========================================================================
    // Observable state
    // =========================================================================

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> String {
        self.projector.config().name.clone()
    }

    /// Returns `true` while the vacuum reports it is cleaning.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.projector.state().is_cleaning()
    }

    /// Returns the status string, if status reporting is supported.
    #[must_use]
    pub fn status(&self) -> Option<String> {
        self.snapshot().status
    }

    /// Returns the battery percentage, if battery reporting is supported.
    #[must_use]
    pub fn battery_level(&self) -> Option<u8> {
        self.snapshot().battery_level
    }

    /// Returns the battery icon, if battery reporting is supported.
    #[must_use]
    pub fn battery_icon(&self) -> Option<String> {
        self.snapshot().battery_icon
    }

    /// Returns the current fan speed, if fan speed is supported.
    #[must_use]
    pub fn fan_speed(&self) -> Option<String> {
        self.snapshot().fan_speed
    }

    /// Returns the selectable fan speeds, empty if fan speed is unsupported.
    #[must_use]
    pub fn fan_speed_list(&self) -> Vec<String> {
        self.snapshot().fan_speed_list
    }

    /// Returns the supported capabilities.
    #[must_use]
    pub fn supported_features(&self) -> Capabilities {
        self.projector.config().capabilities
    }

    /// Returns whether the device is available.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.projector.is_available()
    }

    /// Returns everything the host observes, taken at one instant.
    #[must_use]
    pub fn snapshot(&self) -> VacuumSnapshot {
        self.projector.snapshot()
    }

    /// Returns a copy of the raw state mirror.
    #[must_use]
    pub fn state(&self) -> VacuumState {
        self.projector.state()
    }
}

impl<T> Subscribable for MqttVacuum<T> {
    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&VacuumSnapshot) + Send + Sync + 'static,
    {
        self.projector.callbacks().on_state_changed(callback)
    }

    fn on_availability_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.projector.callbacks().on_availability_changed(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.projector.callbacks().unsubscribe(id)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for MqttVacuum<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttVacuum")
            .field("transport", &self.transport)
            .field("projector", &self.projector)
            .finish_non_exhaustive()
    }
}
