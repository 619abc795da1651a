// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport subscription sets.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::AdapterConfig;
use crate::error::ProtocolError;
use crate::protocol::{MessageCallback, SubscriptionToken, Transport};
use crate::types::QoS;

/// The set of transport subscriptions currently installed for one purpose.
///
/// A handle is only ever replaced whole: [`resubscribe`](Self::resubscribe)
/// tears every entry down before installing the next set.
#[derive(Debug, Default)]
pub struct SubscriptionHandle {
    entries: Vec<(String, SubscriptionToken)>,
}

impl SubscriptionHandle {
    /// Creates an empty handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the subscribed topics.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(topic, _)| topic.as_str())
    }

    /// Returns the number of installed subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replaces the installed set with one subscription per topic.
    ///
    /// The previous set is unsubscribed first, so no message is delivered
    /// to a callback bound to an older configuration once installation
    /// starts. Every new subscription shares `callback` and `qos`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if a subscription could not be installed.
    /// Subscriptions installed before the failure stay in the handle and
    /// are removed by the next call or by [`teardown`](Self::teardown).
    pub async fn resubscribe<T: Transport>(
        &mut self,
        transport: &T,
        topics: BTreeSet<String>,
        qos: QoS,
        callback: &MessageCallback,
    ) -> Result<(), ProtocolError> {
        self.teardown(transport).await;

        for topic in topics {
            let token = transport
                .subscribe(&topic, qos, Arc::clone(callback))
                .await?;
            tracing::debug!(topic = %topic, token = %token, "Installed subscription");
            self.entries.push((topic, token));
        }
        Ok(())
    }

    /// Unsubscribes everything in the handle.
    ///
    /// A transport error is logged; the transport has already dropped its
    /// local routes, so the handle is emptied regardless.
    pub async fn teardown<T: Transport>(&mut self, transport: &T) {
        if self.entries.is_empty() {
            return;
        }
        let tokens = self.entries.drain(..).map(|(_, token)| token).collect();
        if let Err(e) = transport.unsubscribe(tokens).await {
            tracing::warn!(error = %e, "Failed to unsubscribe previous topics");
        }
    }
}

/// Returns the distinct, non-empty state topics of `config`.
///
/// Signals sharing a topic collapse to one entry.
#[must_use]
pub fn state_topics(config: &AdapterConfig) -> BTreeSet<String> {
    config
        .state_topics
        .iter()
        .filter_map(|(_, topic)| topic.clone())
        .filter(|topic| !topic.is_empty())
        .collect()
}
