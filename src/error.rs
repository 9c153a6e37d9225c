// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the Flexom library.
//!
//! This module provides the error hierarchy used across the library: value
//! validation, protocol communication (HTTP and STOMP), parsing, listener
//! registration and command confirmation.

use thiserror::Error;

use crate::event::ListenerId;
use crate::types::Factor;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred during protocol communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while parsing a response or an event.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A different listener is already registered under this identifier.
    #[error("a different listener is already registered for id {0}")]
    DuplicateListener(ListenerId),

    /// The command was accepted but the hardware never confirmed the value.
    #[error("no confirmation for {factor} = {expected} in zone {zone_id} (read back: {actual:?})")]
    ConfirmationTimeout {
        /// The zone the command was addressed to.
        zone_id: String,
        /// The factor that was written.
        factor: Factor,
        /// The requested value.
        expected: f64,
        /// The value reported by the fallback read, if the zone has that factor.
        actual: Option<f64>,
    },

    /// The account has no building attached.
    #[error("no building found for this account")]
    NoBuilding,

    /// The client was built with an invalid configuration.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl Error {
    /// Returns `true` if the error is an authentication rejection.
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Protocol(ProtocolError::AuthenticationFailed))
    }

    /// Returns `true` if the remote service asked us to slow down.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Protocol(ProtocolError::RateLimited))
    }
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    /// The factor name is not one of `BRI`, `BRIEXT` or `TMP`.
    #[error("unknown factor: {0}")]
    UnknownFactor(String),

    /// A numeric value is NaN or infinite.
    #[error("value {0} is not a finite number")]
    NonFinite(f64),

    /// A confirmation tolerance below zero.
    #[error("tolerance {0} must not be negative")]
    NegativeTolerance(f64),
}

/// Errors related to protocol communication (HTTP/STOMP).
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket transport failed.
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    /// Connection to the service failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// A header value could not be encoded.
    #[error("invalid header value: {0}")]
    InvalidHeader(String),

    /// Authentication failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The service answered 429 Too Many Requests.
    #[error("rate limited by the remote service")]
    RateLimited,

    /// Internal channel was closed.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for ProtocolError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

/// Errors related to parsing service responses, events and frames.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The bearer token is not a decodable JWT.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// A STOMP frame could not be decoded.
    #[error("malformed STOMP frame: {0}")]
    MalformedFrame(String),

    /// Expected field is missing.
    #[error("missing field: {0}")]
    MissingField(String),

    /// Unexpected payload format.
    #[error("unexpected format: {0}")]
    UnexpectedFormat(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_error_display() {
        let err = ValueError::UnknownFactor("HUM".to_string());
        assert_eq!(err.to_string(), "unknown factor: HUM");
    }

    #[test]
    fn error_from_protocol_error() {
        let err: Error = ProtocolError::RateLimited.into();
        assert!(err.is_rate_limited());
        assert!(!err.is_authentication());
    }

    #[test]
    fn authentication_helper() {
        let err: Error = ProtocolError::AuthenticationFailed.into();
        assert!(err.is_authentication());
    }

    #[test]
    fn confirmation_timeout_display() {
        let err = Error::ConfirmationTimeout {
            zone_id: "zoneA".to_string(),
            factor: Factor::Brightness,
            expected: 1.0,
            actual: Some(0.0),
        };
        assert_eq!(
            err.to_string(),
            "no confirmation for BRI = 1 in zone zoneA (read back: Some(0.0))"
        );
    }

    #[test]
    fn confirmation_timeout_without_reading() {
        let err = Error::ConfirmationTimeout {
            zone_id: "zoneA".to_string(),
            factor: Factor::Temperature,
            expected: 20.0,
            actual: None,
        };
        assert!(err.to_string().ends_with("(read back: None)"));
    }

    #[test]
    fn duplicate_listener_display() {
        let err = Error::DuplicateListener(ListenerId::new("kitchen"));
        assert_eq!(
            err.to_string(),
            "a different listener is already registered for id kitchen"
        );
    }
}
