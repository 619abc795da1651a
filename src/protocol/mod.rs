// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport boundary between the adapter and the message broker.
//!
//! The adapter never talks to a broker directly. It publishes commands and
//! installs topic subscriptions through the [`Transport`] trait, which the
//! host implements or satisfies with the bundled [`MqttBroker`].
//!
//! # Transports
//!
//! - [`MqttBroker`]: `rumqttc` client with a background event loop and a
//!   [`TopicRouter`] for inbound publishes (requires the `mqtt` feature)

#[cfg(feature = "mqtt")]
mod mqtt_broker;
mod topic_router;

#[cfg(feature = "mqtt")]
pub use mqtt_broker::{MqttBroker, MqttBrokerBuilder};
pub use topic_router::TopicRouter;

use std::fmt;
use std::sync::Arc;

use crate::error::ProtocolError;
use crate::types::QoS;

/// Callback invoked with `(topic, payload)` for each inbound message.
pub type MessageCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Identifies one installed subscription on a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionToken(u64);

impl SubscriptionToken {
    /// Creates a token from a transport-assigned identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the transport-assigned identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Publish/subscribe transport the adapter runs on.
///
/// Delivery guarantees, reconnects and retained-message replay belong to
/// the implementation.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Publishes `payload` to `topic`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the message could not be handed to the
    /// broker.
    async fn publish(
        &self,
        topic: &str,
        payload: &str,
        qos: QoS,
        retain: bool,
    ) -> Result<(), ProtocolError>;

    /// Subscribes `callback` to messages on the exact topic `topic`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the subscription could not be installed.
    async fn subscribe(
        &self,
        topic: &str,
        qos: QoS,
        callback: MessageCallback,
    ) -> Result<SubscriptionToken, ProtocolError>;

    /// Removes the given subscriptions.
    ///
    /// Once this returns, none of the callbacks behind `tokens` is invoked
    /// again. Unknown tokens are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the broker rejected the unsubscribe. The
    /// local routes are removed regardless.
    async fn unsubscribe(&self, tokens: Vec<SubscriptionToken>) -> Result<(), ProtocolError>;
}

impl<T: Transport> Transport for Arc<T> {
    async fn publish(
        &self,
        topic: &str,
        payload: &str,
        qos: QoS,
        retain: bool,
    ) -> Result<(), ProtocolError> {
        (**self).publish(topic, payload, qos, retain).await
    }

    async fn subscribe(
        &self,
        topic: &str,
        qos: QoS,
        callback: MessageCallback,
    ) -> Result<SubscriptionToken, ProtocolError> {
        (**self).subscribe(topic, qos, callback).await
    }

    async fn unsubscribe(&self, tokens: Vec<SubscriptionToken>) -> Result<(), ProtocolError> {
        (**self).unsubscribe(tokens).await
    }
}
