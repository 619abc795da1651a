// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Discovery events.
//!
//! A discovery event carries either a full replacement configuration for
//! the adapter or an empty payload, which removes it. Finding devices on
//! the broker is the host's job; this module only interprets the payload.
//!
//! # Examples
//!
//! ```
//! use mqtt_vacuum::discovery::DiscoveryUpdate;
//!
//! let update = DiscoveryUpdate::parse(r#"{"name": "Robo"}"#).unwrap();
//! assert!(matches!(update, DiscoveryUpdate::Reconfigure(ref c) if c.name == "Robo"));
//!
//! assert_eq!(DiscoveryUpdate::parse("").unwrap(), DiscoveryUpdate::Remove);
//! ```

use crate::config::VacuumConfig;
use crate::error::ConfigError;

/// What a discovery payload asks the adapter to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryUpdate {
    /// Rebind to this configuration.
    Reconfigure(Box<VacuumConfig>),
    /// Tear the adapter down.
    Remove,
}

impl DiscoveryUpdate {
    /// Interprets a discovery payload.
    ///
    /// An empty (or whitespace-only) payload means removal. Anything else
    /// is validated against the configuration schema.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the payload is neither empty nor a valid
    /// configuration.
    pub fn parse(payload: &str) -> Result<Self, ConfigError> {
        if payload.trim().is_empty() {
            return Ok(Self::Remove);
        }
        Ok(Self::Reconfigure(Box::new(
            VacuumConfig::from_discovery_payload(payload)?,
        )))
    }
}
