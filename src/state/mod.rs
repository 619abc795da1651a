// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Vacuum state mirror types.
//!
//! [`VacuumState`] holds the adapter's belief about the device. Each
//! inbound topic carries one [`Signal`]; its rendered value is coerced to a
//! [`SignalValue`] and folded into the mirror.
//!
//! # Examples
//!
//! ```
//! use mqtt_vacuum::state::{Signal, VacuumState};
//!
//! let mut state = VacuumState::new();
//! let value = Signal::Cleaning.coerce("on").unwrap();
//! state.apply(Signal::Cleaning, value);
//! state.refresh_status();
//!
//! assert!(state.is_cleaning());
//! assert_eq!(state.status(), "cleaning");
//! ```

mod signal;
mod snapshot;
mod vacuum_state;

pub use signal::{Signal, SignalValue};
pub use snapshot::VacuumSnapshot;
pub use vacuum_state::{FAN_SPEED_UNKNOWN, STATUS_UNKNOWN, VacuumState};
