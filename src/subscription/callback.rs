// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host notification callbacks.
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`CallbackRegistry`] - Registry storing and dispatching host callbacks

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::state::VacuumSnapshot;

/// Unique identifier for a host callback.
///
/// Returned when registering a callback and used to unsubscribe it later.
/// IDs are unique within an adapter's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

type StateChangedCallback = dyn Fn(&VacuumSnapshot) + Send + Sync;
type AvailabilityCallback = dyn Fn(bool) + Send + Sync;

/// Callbacks of one kind, kept in registration order.
struct CallbackList<C: ?Sized> {
    entries: RwLock<Vec<(SubscriptionId, Arc<C>)>>,
}

impl<C: ?Sized> CallbackList<C> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    fn push(&self, id: SubscriptionId, callback: Arc<C>) {
        self.entries.write().push((id, callback));
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Clones the callbacks out so none runs under the lock.
    fn snapshot(&self) -> Vec<Arc<C>> {
        self.entries.read().iter().map(|(_, cb)| Arc::clone(cb)).collect()
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn clear(&self) {
        self.entries.write().clear();
    }
}

/// Registry for host notification callbacks.
///
/// Callbacks run synchronously on the dispatching task, in the order they
/// were registered. A callback may register or unsubscribe others; the
/// change applies from the next dispatch.
pub struct CallbackRegistry {
    next_id: AtomicU64,
    state_changed: CallbackList<StateChangedCallback>,
    availability: CallbackList<AvailabilityCallback>,
}

impl CallbackRegistry {
    /// Creates a new empty callback registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            state_changed: CallbackList::new(),
            availability: CallbackList::new(),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers a callback for state refreshes.
    ///
    /// The callback receives the snapshot taken right after the change.
    pub fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&VacuumSnapshot) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.state_changed.push(id, Arc::new(callback));
        id
    }

    /// Registers a callback for availability changes.
    pub fn on_availability_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.availability.push(id, Arc::new(callback));
        id
    }

    /// Removes the callback registered under `id`, whatever its kind.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state_changed.remove(id) || self.availability.remove(id)
    }

    /// Removes every callback.
    pub fn clear(&self) {
        self.state_changed.clear();
        self.availability.clear();
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Hands `snapshot` to every state callback.
    pub fn dispatch_state_changed(&self, snapshot: &VacuumSnapshot) {
        for callback in self.state_changed.snapshot() {
            callback(snapshot);
        }
    }

    /// Tells every availability callback the new value.
    pub fn dispatch_availability(&self, available: bool) {
        for callback in self.availability.snapshot() {
            callback(available);
        }
    }

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn total_callbacks(&self) -> usize {
        self.state_changed.len() + self.availability.len()
    }

    /// Returns `true` if no callbacks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_callbacks() == 0
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("state_changed", &self.state_changed.len())
            .field("availability", &self.availability.len())
            .finish_non_exhaustive()
    }
}
