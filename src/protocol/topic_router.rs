// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Exact-topic routing of inbound messages to subscription callbacks.
//!
//! # Architecture
//!
//! ```text
//! MQTT Message: vacuum/state → {"battery_level": 61}
//!                     ↓
//!             TopicRouter.route()
//!                     ↓
//!      Lookup "vacuum/state" in routes (read lock held)
//!                     ↓
//!        callback("vacuum/state", payload) per route
//!                     ↓
//!           StateProjector.on_message()
//! ```
//!
//! Routes are removed under the write lock, which waits for any dispatch in
//! flight. Once [`TopicRouter::remove`] returns, the removed callback is
//! never invoked again.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use super::{MessageCallback, SubscriptionToken};

/// Routes inbound messages to the callbacks subscribed to their topic.
#[derive(Default)]
pub struct TopicRouter {
    /// Map from topic to the routes installed on it.
    routes: RwLock<HashMap<String, Vec<(SubscriptionToken, MessageCallback)>>>,
    next_token: AtomicU64,
}

impl TopicRouter {
    /// Creates a new empty topic router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `callback` on `topic`.
    ///
    /// Returns the new route's token, and `true` if this is the first route
    /// on the topic (the broker subscription must be created).
    pub fn add(&self, topic: &str, callback: MessageCallback) -> (SubscriptionToken, bool) {
        let token = SubscriptionToken::new(self.next_token.fetch_add(1, Ordering::Relaxed));
        let mut routes = self.routes.write();
        let entry = routes.entry(topic.to_string()).or_default();
        let first = entry.is_empty();
        entry.push((token, callback));
        tracing::debug!(topic = %topic, token = %token, "Added route");
        (token, first)
    }

    /// Removes the route behind `token`.
    ///
    /// Returns the route's topic, and `true` if it was the last route on the
    /// topic (the broker subscription can be dropped). Returns `None` for an
    /// unknown token.
    pub fn remove(&self, token: SubscriptionToken) -> Option<(String, bool)> {
        let mut routes = self.routes.write();
        let topic = routes
            .iter()
            .find(|(_, entries)| entries.iter().any(|(t, _)| *t == token))
            .map(|(topic, _)| topic.clone())?;

        let last = routes.get_mut(&topic).is_some_and(|entries| {
            entries.retain(|(t, _)| *t != token);
            entries.is_empty()
        });
        if last {
            routes.remove(&topic);
        }
        tracing::debug!(topic = %topic, token = %token, "Removed route");
        Some((topic, last))
    }

    /// Delivers a message to every route on `topic`.
    ///
    /// Callbacks run with the routing table read-locked and must not add or
    /// remove routes. Returns `true` if at least one callback was invoked.
    pub fn route(&self, topic: &str, payload: &str) -> bool {
        let routes = self.routes.read();
        let Some(entries) = routes.get(topic) else {
            tracing::trace!(topic = %topic, "No route for topic");
            return false;
        };
        for (_, callback) in entries {
            callback(topic, payload);
        }
        !entries.is_empty()
    }

    /// Removes every route, returning the topics that had any.
    pub fn clear(&self) -> Vec<String> {
        self.routes.write().drain().map(|(topic, _)| topic).collect()
    }

    /// Returns the number of installed routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.read().values().map(Vec::len).sum()
    }

    /// Returns the number of distinct routed topics.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.routes.read().len()
    }
}

impl std::fmt::Debug for TopicRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicRouter")
            .field("topics", &self.topic_count())
            .field("routes", &self.route_count())
            .finish()
    }
}
