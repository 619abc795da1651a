// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared across the adapter.
//!
//! # Types
//!
//! - [`QoS`] - MQTT delivery level (0-2)
//! - [`BatteryLevel`] - Raw battery reading, clamped to 0-100% on read

mod battery;
mod qos;

pub use battery::BatteryLevel;
pub use qos::QoS;
