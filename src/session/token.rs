// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bearer tokens and their expiry.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

use crate::error::ParseError;

/// An identity session: the bearer token and its decoded expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct Claims {
    exp: Option<i64>,
}

impl Session {
    /// Builds a session from a JWT, reading its `exp` claim.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidToken`] if the token has no payload
    /// segment or the payload is not base64url-encoded JSON.
    ///
    /// # Examples
    ///
    /// ```
    /// use flexom_lib::session::Session;
    ///
    /// // {"exp":4102444800} (2100-01-01)
    /// let token = "e30.eyJleHAiOjQxMDI0NDQ4MDB9.sig";
    /// let session = Session::from_token(token).unwrap();
    /// assert_eq!(session.expires_at().unwrap().timestamp(), 4_102_444_800);
    /// ```
    pub fn from_token(token: impl Into<String>) -> Result<Self, ParseError> {
        let token = token.into();
        let payload = token
            .split('.')
            .nth(1)
            .ok_or_else(|| ParseError::InvalidToken("missing payload segment".to_string()))?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| ParseError::InvalidToken(e.to_string()))?;
        let claims: Claims = serde_json::from_slice(&bytes)
            .map_err(|e| ParseError::InvalidToken(e.to_string()))?;

        let expires_at = claims
            .exp
            .map(|exp| {
                DateTime::from_timestamp(exp, 0)
                    .ok_or_else(|| ParseError::InvalidToken(format!("exp out of range: {exp}")))
            })
            .transpose()?;

        Ok(Self { token, expires_at })
    }

    /// Returns the bearer token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the expiry, if the token carries one.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns `true` if the session is still usable for `margin` after `now`.
    ///
    /// A token without expiry is never considered valid.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        let Some(expires_at) = self.expires_at else {
            return false;
        };
        TimeDelta::from_std(margin)
            .ok()
            .and_then(|margin| now.checked_add_signed(margin))
            .is_some_and(|deadline| deadline < expires_at)
    }
}

#[cfg(test)]
pub(crate) fn token_with_exp(exp: Option<i64>) -> String {
    let claims = match exp {
        Some(exp) => format!(r#"{{"exp":{exp}}}"#),
        None => "{}".to_string(),
    };
    format!(
        "{}.{}.signature",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#),
        URL_SAFE_NO_PAD.encode(claims)
    )
}
