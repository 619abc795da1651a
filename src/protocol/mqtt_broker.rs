// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT broker connection implementing [`Transport`].
//!
//! The broker owns one `rumqttc` client and a background task polling its
//! event loop. Inbound publishes go through a [`TopicRouter`], so several
//! adapters can share one connection and even one topic.
//!
//! # Examples
//!
//! ```no_run
//! use mqtt_vacuum::protocol::{MqttBroker, Transport};
//! use mqtt_vacuum::QoS;
//!
//! # async fn example() -> mqtt_vacuum::Result<()> {
//! let broker = MqttBroker::builder()
//!     .host("192.168.1.50")
//!     .credentials("user", "password")
//!     .build()
//!     .await?;
//!
//! broker
//!     .publish("vacuum/command", "return_to_base", QoS::AtMostOnce, false)
//!     .await?;
//!
//! broker.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rumqttc::{AsyncClient, EventLoop, MqttOptions};
use tokio::sync::oneshot;

use crate::error::ProtocolError;
use crate::protocol::{MessageCallback, SubscriptionToken, TopicRouter, Transport};
use crate::types::QoS;

/// Global counter for generating unique client IDs.
static BROKER_CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Configuration for an MQTT broker connection.
#[derive(Debug, Clone)]
struct MqttBrokerConfig {
    host: String,
    port: u16,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    connection_timeout: Duration,
}

impl Default for MqttBrokerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1883,
            credentials: None,
            keep_alive: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
        }
    }
}

impl MqttBrokerConfig {
    /// Builds client options with a process-unique client id.
    fn mqtt_options(&self) -> MqttOptions {
        let n = BROKER_CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let client_id = format!("mqtt_vacuum_{}_{n}", std::process::id());

        let mut options = MqttOptions::new(client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        if let Some((username, password)) = &self.credentials {
            options.set_credentials(username, password);
        }
        options
    }
}

/// A shared MQTT broker connection.
///
/// `MqttBroker` is cheaply cloneable (via `Arc`); clones share the client,
/// the event loop and the routing table.
#[derive(Clone)]
pub struct MqttBroker {
    inner: Arc<MqttBrokerInner>,
}

struct MqttBrokerInner {
    /// The MQTT async client for publishing and subscribing.
    client: AsyncClient,
    /// Routes for inbound publishes.
    router: TopicRouter,
    /// Topics subscribed on the broker, restored after a reconnect.
    subscribed: Mutex<HashMap<String, QoS>>,
    /// Configuration used for this connection.
    config: MqttBrokerConfig,
    /// Connection status.
    connected: AtomicBool,
    /// Set once the broker is shut down; stops the event loop.
    closing: AtomicBool,
}

impl MqttBroker {
    /// Creates a new builder for configuring an MQTT broker connection.
    #[must_use]
    pub fn builder() -> MqttBrokerBuilder {
        MqttBrokerBuilder::default()
    }

    /// Returns whether the broker is currently connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Returns the host address of the broker.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.inner.config.host
    }

    /// Returns the port of the broker.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.config.port
    }

    /// Returns whether authentication is configured.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.inner.config.credentials.is_some()
    }

    /// Returns the number of installed subscription routes.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.router.route_count()
    }

    /// Returns the QoS the broker subscription on `topic` was made with.
    #[must_use]
    pub fn subscribed_qos(&self, topic: &str) -> Option<QoS> {
        self.inner.subscribed.lock().get(topic).copied()
    }

    /// Disconnects from the broker.
    ///
    /// All routes are dropped; no callback fires after this returns.
    ///
    /// # Errors
    ///
    /// Returns error if the disconnect request could not be queued.
    pub async fn disconnect(&self) -> Result<(), ProtocolError> {
        tracing::info!(
            host = %self.inner.config.host,
            port = %self.inner.config.port,
            "Disconnecting from MQTT broker"
        );

        self.inner.router.clear();
        self.inner.subscribed.lock().clear();
        self.inner.client.disconnect().await?;
        self.inner.closing.store(true, Ordering::Release);
        self.inner.connected.store(false, Ordering::Release);
        Ok(())
    }

    /// Subscribes every routed topic again after a reconnect.
    ///
    /// The session is clean, so the broker forgot them. Requests are queued
    /// without waiting because this runs on the event loop task itself.
    fn restore_subscriptions(&self) {
        let subscribed = self.inner.subscribed.lock().clone();
        tracing::info!(topics = subscribed.len(), "Reconnected to MQTT broker, restoring subscriptions");
        for (topic, qos) in subscribed {
            if let Err(e) = self.inner.client.try_subscribe(&topic, qos.into()) {
                tracing::warn!(topic = %topic, error = %e, "Failed to restore subscription");
            }
        }
    }
}

impl Transport for MqttBroker {
    async fn publish(
        &self,
        topic: &str,
        payload: &str,
        qos: QoS,
        retain: bool,
    ) -> Result<(), ProtocolError> {
        tracing::debug!(topic = %topic, payload = %payload, %qos, retain, "Publishing");
        self.inner
            .client
            .publish(topic, qos.into(), retain, payload.as_bytes().to_vec())
            .await?;
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        qos: QoS,
        callback: MessageCallback,
    ) -> Result<SubscriptionToken, ProtocolError> {
        // The route goes in first so a retained message replayed right after
        // SUBSCRIBE is not lost.
        let (token, first) = self.inner.router.add(topic, callback);
        // A later route asking for a higher QoS upgrades the broker
        // subscription; the broker keeps the highest one requested.
        let needs_subscribe = first
            || self
                .inner
                .subscribed
                .lock()
                .get(topic)
                .is_none_or(|current| qos > *current);
        if needs_subscribe {
            if let Err(e) = self.inner.client.subscribe(topic, qos.into()).await {
                self.inner.router.remove(token);
                return Err(e.into());
            }
            self.inner.subscribed.lock().insert(topic.to_string(), qos);
            tracing::debug!(topic = %topic, %qos, "Subscribed to topic");
        }
        Ok(token)
    }

    async fn unsubscribe(&self, tokens: Vec<SubscriptionToken>) -> Result<(), ProtocolError> {
        let mut result = Ok(());
        for token in tokens {
            let Some((topic, true)) = self.inner.router.remove(token) else {
                continue;
            };
            self.inner.subscribed.lock().remove(&topic);
            match self.inner.client.unsubscribe(&topic).await {
                Ok(()) => tracing::debug!(topic = %topic, "Unsubscribed from topic"),
                Err(e) => {
                    tracing::warn!(topic = %topic, error = %e, "Failed to unsubscribe from topic");
                    if result.is_ok() {
                        result = Err(e.into());
                    }
                }
            }
        }
        result
    }
}

impl std::fmt::Debug for MqttBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttBroker")
            .field("host", &self.inner.config.host)
            .field("port", &self.inner.config.port)
            .field("connected", &self.is_connected())
            .field("router", &self.inner.router)
            .finish()
    }
}

/// Builder for an [`MqttBroker`].
///
/// # Examples
///
/// ```no_run
/// use mqtt_vacuum::protocol::MqttBroker;
/// use std::time::Duration;
///
/// # async fn example() -> mqtt_vacuum::Result<()> {
/// let broker = MqttBroker::builder()
///     .host("192.168.1.50")
///     .keep_alive(Duration::from_secs(60))
///     .connection_timeout(Duration::from_secs(5))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MqttBrokerBuilder {
    config: MqttBrokerConfig,
}

impl MqttBrokerBuilder {
    /// Sets the broker host address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the broker port (default: 1883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the keep-alive interval (default: 30 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.config.keep_alive = duration;
        self
    }

    /// Sets how long [`build`](Self::build) waits for the broker to accept
    /// the connection (default: 10 seconds).
    #[must_use]
    pub fn connection_timeout(mut self, duration: Duration) -> Self {
        self.config.connection_timeout = duration;
        self
    }

    /// Connects to the broker and starts the event loop task.
    ///
    /// Once connected, dropped connections are retried in the background
    /// and every routed topic is subscribed again on reconnect.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` if no host is set, or `ConnectionFailed` if
    /// the broker refuses or does not answer within the timeout.
    pub async fn build(self) -> Result<MqttBroker, ProtocolError> {
        if self.config.host.is_empty() {
            return Err(ProtocolError::InvalidAddress(
                "MQTT broker host is required".to_string(),
            ));
        }

        let (client, event_loop) = AsyncClient::new(self.config.mqtt_options(), 10);
        let broker = MqttBroker {
            inner: Arc::new(MqttBrokerInner {
                client,
                router: TopicRouter::new(),
                subscribed: Mutex::new(HashMap::new()),
                config: self.config,
                connected: AtomicBool::new(false),
                closing: AtomicBool::new(false),
            }),
        };

        let (connack_tx, connack_rx) = oneshot::channel();
        tokio::spawn(run_event_loop(event_loop, broker.clone(), connack_tx));

        let timeout = broker.inner.config.connection_timeout;
        match tokio::time::timeout(timeout, connack_rx).await {
            Ok(Ok(())) => {
                tracing::info!(
                    host = %broker.inner.config.host,
                    port = broker.inner.config.port,
                    "Connected to MQTT broker"
                );
                Ok(broker)
            }
            Ok(Err(_)) => Err(ProtocolError::ConnectionFailed(format!(
                "broker {}:{} refused the connection",
                broker.inner.config.host, broker.inner.config.port
            ))),
            Err(_) => {
                // Stop the event loop from retrying in the background
                broker.inner.closing.store(true, Ordering::Release);
                Err(ProtocolError::ConnectionFailed(format!(
                    "no CONNACK within {}ms",
                    timeout.as_millis()
                )))
            }
        }
    }
}

/// Delay between reconnection attempts after the connection drops.
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Polls the event loop until the broker is closed.
///
/// Before the first CONNACK any error ends the task, which fails the
/// pending [`MqttBrokerBuilder::build`]. Afterwards errors are retried.
async fn run_event_loop(
    mut event_loop: EventLoop,
    broker: MqttBroker,
    connack_tx: oneshot::Sender<()>,
) {
    use rumqttc::{Event, Outgoing, Packet};

    let mut connack_tx = Some(connack_tx);
    loop {
        let event = event_loop.poll().await;
        if broker.inner.closing.load(Ordering::Acquire) {
            break;
        }
        match event {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                broker.inner.connected.store(true, Ordering::Release);
                match connack_tx.take() {
                    Some(tx) => {
                        let _ = tx.send(());
                    }
                    None => broker.restore_subscriptions(),
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let Ok(payload) = std::str::from_utf8(&publish.payload) else {
                    tracing::debug!(topic = %publish.topic, "Dropping non-UTF-8 payload");
                    continue;
                };
                tracing::trace!(topic = %publish.topic, payload = %payload, "MQTT message received");
                broker.inner.router.route(&publish.topic, payload);
            }
            Ok(Event::Incoming(Packet::Disconnect) | Event::Outgoing(Outgoing::Disconnect)) => {
                broker.inner.connected.store(false, Ordering::Release);
                break;
            }
            Ok(_) => {}
            Err(e) if connack_tx.is_some() => {
                tracing::debug!(error = %e, "MQTT connection attempt failed");
                break;
            }
            Err(e) => {
                if broker.inner.connected.swap(false, Ordering::AcqRel) {
                    tracing::warn!(error = %e, "Lost connection to MQTT broker, retrying");
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
    tracing::debug!("MQTT event loop stopped");
}
