// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `mqtt_vacuum` - A generic MQTT vacuum cleaner adapter.
//!
//! The adapter drives a vacuum that is only reachable through a
//! publish/subscribe broker. It publishes command messages when the host
//! issues an action, and mirrors the device's state from the messages the
//! vacuum publishes.
//!
//! # Supported Features
//!
//! - **Capability gating**: commands the vacuum does not support are no-ops
//! - **State mirroring**: battery, charging, cleaning, docked, error and fan
//!   speed extracted from payloads with value templates
//! - **Derived status**: one human-readable status from the mirrored fields
//! - **Runtime reconfiguration**: discovery payloads rebind and resubscribe
//!   without restarting
//! - **Availability**: online/offline tracking from an availability topic
//!
//! # Quick Start
//!
//! ```no_run
//! use mqtt_vacuum::{MqttBroker, MqttVacuum, Signal, VacuumConfig};
//! use mqtt_vacuum::subscription::Subscribable;
//!
//! #[tokio::main]
//! async fn main() -> mqtt_vacuum::Result<()> {
//!     let broker = MqttBroker::builder()
//!         .host("192.168.1.50")
//!         .credentials("user", "password")
//!         .build()
//!         .await?;
//!
//!     let config = VacuumConfig::new()
//!         .with_supported_features(["turn_on", "turn_off", "status", "battery", "fan_speed"])
//!         .with_command_topic("vacuum/command")
//!         .with_set_fan_speed_topic("vacuum/set_fan_speed")
//!         .with_fan_speed_list(["min", "medium", "max"])
//!         .with_state(Signal::BatteryLevel, "vacuum/state", Some("{{ value_json.battery_level }}"))
//!         .with_state(Signal::Cleaning, "vacuum/state", Some("{{ value_json.cleaning }}"));
//!
//!     let vacuum = MqttVacuum::new(broker, config)?;
//!     vacuum.on_state_changed(|snapshot| {
//!         println!("{:?} at {:?}%", snapshot.status, snapshot.battery_level);
//!     });
//!     vacuum.attach().await?;
//!
//!     vacuum.turn_on().await?;
//!     vacuum.set_fan_speed("max").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Discovery Payloads
//!
//! ```no_run
//! # async fn example(vacuum: mqtt_vacuum::MqttVacuum<mqtt_vacuum::MqttBroker>) -> mqtt_vacuum::Result<()> {
//! // Rebind to a new configuration, keeping the mirrored state
//! vacuum
//!     .discovery_update(r#"{"name": "Upstairs", "command_topic": "upstairs/cmd"}"#)
//!     .await?;
//!
//! // An empty payload removes the adapter
//! vacuum.discovery_update("").await?;
//! # Ok(())
//! # }
//! ```

pub mod availability;
mod capabilities;
pub mod command;
pub mod config;
pub mod discovery;
pub mod error;
pub mod projection;
pub mod protocol;
pub mod state;
pub mod subscription;
pub mod template;
pub mod types;
mod vacuum;

pub use capabilities::{Capabilities, Capability};
pub use command::VacuumCommand;
pub use config::{AdapterConfig, VacuumConfig};
pub use error::{ConfigError, Error, PayloadError, ProtocolError, Result};
#[cfg(feature = "mqtt")]
pub use protocol::{MqttBroker, MqttBrokerBuilder};
pub use protocol::{SubscriptionToken, TopicRouter, Transport};
pub use state::{Signal, VacuumSnapshot, VacuumState};
pub use subscription::{Subscribable, SubscriptionId};
pub use template::{Render, RendererFactory, TemplateError, ValueTemplate};
pub use types::{BatteryLevel, QoS};
pub use vacuum::MqttVacuum;
