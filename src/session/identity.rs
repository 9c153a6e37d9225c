// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Identity service client.

use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use super::Session;
use crate::error::{ProtocolError, Result};
use crate::protocol::http::decode_response;
use crate::types::{Building, DeviceInfo, IdentityUser};

/// Client of the identity service.
///
/// Signs the account in, keeps the resulting [`Session`] and lists the
/// buildings the account can reach.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use flexom_lib::session::IdentityClient;
///
/// # async fn example() -> flexom_lib::Result<()> {
/// let identity = IdentityClient::new(
///     "https://hemisphere.ubiant.com",
///     "me@example.com",
///     Duration::from_secs(10),
///     Duration::from_secs(3600),
/// )?;
/// identity.login("me@example.com", "secret").await?;
/// let buildings = identity.buildings().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct IdentityClient {
    base_url: String,
    client: Client,
    device: DeviceInfo,
    session: RwLock<Option<Session>>,
    safety_margin: Duration,
}

#[derive(Serialize)]
struct SignIn<'a> {
    device: &'a DeviceInfo,
    email: &'a str,
    password: &'a str,
}

impl IdentityClient {
    /// Creates a client for the identity service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(
        base_url: impl Into<String>,
        email: &str,
        request_timeout: Duration,
        safety_margin: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(ProtocolError::Http)?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            device: DeviceInfo::for_email(email),
            session: RwLock::new(None),
            safety_margin,
        })
    }

    /// Signs in and stores the new session.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationFailed` if the credentials are rejected,
    /// `RateLimited` on 429, and `InvalidToken` if the returned token cannot
    /// be decoded.
    pub async fn login(&self, email: &str, password: &str) -> Result<IdentityUser> {
        let url = format!("{}/users/signin", self.base_url);
        tracing::debug!(url = %url, email, "Signing in to identity service");

        let response = self
            .client
            .post(&url)
            .json(&SignIn {
                device: &self.device,
                email,
                password,
            })
            .send()
            .await
            .map_err(ProtocolError::Http)?;

        if response.status() == StatusCode::FORBIDDEN {
            return Err(ProtocolError::AuthenticationFailed.into());
        }

        let user: IdentityUser = decode_response(response).await?;
        let session = Session::from_token(user.token.clone())?;

        tracing::info!(
            user_id = %user.id,
            expires_at = ?session.expires_at(),
            "Identity session opened"
        );
        *self.session.write() = Some(session);

        Ok(user)
    }

    /// Lists the buildings the account has access to.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationFailed` if no session is held or the token is
    /// rejected.
    pub async fn buildings(&self) -> Result<Vec<Building>> {
        let token = self.token().ok_or(ProtocolError::AuthenticationFailed)?;
        let url = format!("{}/buildings/mine/infos", self.base_url);
        tracing::debug!(url = %url, "Listing buildings");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(ProtocolError::Http)?;

        decode_response(response).await
    }

    /// Returns `true` if a session is held and outlives the safety margin.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.session
            .read()
            .as_ref()
            .is_some_and(|session| session.is_valid_at(Utc::now(), self.safety_margin))
    }

    /// Returns the current session.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    /// Returns the current bearer token.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.session
            .read()
            .as_ref()
            .map(|session| session.token().to_string())
    }

    /// Drops the current session.
    pub fn clear(&self) {
        *self.session.write() = None;
    }

    /// Returns the device record presented at sign-in.
    #[must_use]
    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }
}
