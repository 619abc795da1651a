// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the MQTT vacuum adapter.
//!
//! Configuration problems are fatal to the (re)configuration attempt that
//! produced them. Payload problems are per-message and never take the
//! adapter down. Transport failures come from the MQTT client.

use thiserror::Error;

use crate::state::Signal;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration was rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An inbound state message could not be folded into the mirror.
    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),

    /// Error occurred during protocol communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Errors raised while validating or binding a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A capability name is not in the registry.
    #[error("unknown capability: {0}")]
    UnknownCapability(String),

    /// QoS outside of 0..=2.
    #[error("invalid QoS level {0}, expected 0, 1 or 2")]
    InvalidQos(u8),

    /// A topic failed publish-topic validation.
    #[error("invalid topic for {key}: {reason}")]
    InvalidTopic {
        /// The configuration key holding the topic.
        key: &'static str,
        /// Why the topic was rejected.
        reason: &'static str,
    },

    /// A value template could not be parsed.
    #[error("invalid template for {key}: {message}")]
    InvalidTemplate {
        /// The configuration key holding the template.
        key: &'static str,
        /// Description of the parse failure.
        message: String,
    },

    /// The discovery payload is not valid JSON for the schema.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors related to inbound state payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// A rendered value could not be coerced to the signal's native type.
    #[error("invalid payload for {signal}: {value:?} is not a valid {expected}")]
    InvalidPayload {
        /// The signal the value was destined for.
        signal: Signal,
        /// The rendered value.
        value: String,
        /// The expected type.
        expected: &'static str,
    },
}

/// Errors related to the MQTT transport.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// MQTT connection or communication failed.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the broker failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Internal channel was closed.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
