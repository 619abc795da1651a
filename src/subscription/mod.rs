// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscriptions, both toward the broker and toward the host.
//!
//! # Overview
//!
//! - [`SubscriptionHandle`] - The transport subscriptions installed for the
//!   current configuration, replaced whole on every reconfiguration
//! - [`SubscriptionId`] - Identifier of a host callback, used to unsubscribe
//! - [`CallbackRegistry`] - Registry that stores and dispatches host callbacks
//! - [`Subscribable`] - Trait for types that support host callbacks

mod callback;
mod manager;
mod subscribable;

pub use callback::{CallbackRegistry, SubscriptionId};
pub use manager::{SubscriptionHandle, state_topics};
pub use subscribable::Subscribable;
