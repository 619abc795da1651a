// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscribable trait for adapters that notify their host.

use crate::state::VacuumSnapshot;
use crate::subscription::SubscriptionId;

/// Trait for types that notify the host of observable changes.
///
/// # Examples
///
/// ```no_run
/// use mqtt_vacuum::MqttVacuum;
/// use mqtt_vacuum::config::VacuumConfig;
/// use mqtt_vacuum::protocol::MqttBroker;
/// use mqtt_vacuum::subscription::Subscribable;
///
/// # async fn example() -> mqtt_vacuum::Result<()> {
/// let broker = MqttBroker::builder().host("192.168.1.50").build().await?;
/// let vacuum = MqttVacuum::new(broker, VacuumConfig::new())?;
///
/// let sub_id = vacuum.on_state_changed(|snapshot| {
///     println!("{} is {:?}", snapshot.name, snapshot.status);
/// });
///
/// vacuum.on_availability_changed(|available| {
///     println!("available: {available}");
/// });
///
/// vacuum.unsubscribe(sub_id);
/// # Ok(())
/// # }
/// ```
pub trait Subscribable {
    /// Subscribes to state refreshes.
    ///
    /// Called after every processed state message, command and
    /// reconfiguration, even when no observable value changed.
    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&VacuumSnapshot) + Send + Sync + 'static;

    /// Subscribes to availability changes.
    fn on_availability_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static;

    /// Unsubscribes a callback by its subscription ID.
    ///
    /// Returns `true` if the subscription was found and removed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
