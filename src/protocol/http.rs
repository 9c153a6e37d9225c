// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP client for a building's automation service.

use std::time::Duration;

use futures::future::try_join_all;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{ProtocolError, Result};
use crate::types::{
    AutomationUser, Factor, MASTER_ZONE_ID, MASTER_ZONE_NAME, Thing, Zone, ZoneSettings,
};

/// Client version announced to the automation service.
pub const CLIENT_VERSION: &str = "1.10.62";
/// Application identifier announced to the automation service.
pub const APPLICATION_ID: &str = "com.ubiant.flexom";
/// Brand announced to the automation service.
pub const BRAND_ID: &str = "Flexom";

/// Writes factor values and reads them back.
///
/// This is the part of the automation service the command coordinator
/// needs, so tests can substitute it.
#[allow(async_fn_in_trait)]
pub trait FactorGateway {
    /// Writes a factor value to a zone.
    ///
    /// # Errors
    ///
    /// Returns error if the write is rejected or cannot be sent.
    async fn set_zone_factor(&self, zone_id: &str, factor: Factor, value: f64) -> Result<()>;

    /// Reads the current settings of a zone.
    ///
    /// # Errors
    ///
    /// Returns error if the read fails.
    async fn zone_settings(&self, zone_id: &str) -> Result<ZoneSettings>;
}

/// HTTP client for the Hemis automation service of one building.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use flexom_lib::protocol::HemisClient;
/// use flexom_lib::types::Factor;
///
/// # async fn example() -> flexom_lib::Result<()> {
/// let hemis = HemisClient::new(
///     "https://hemis.example.com",
///     "user-id",
///     "device-uid",
///     Duration::from_secs(10),
/// )?;
/// hemis.login("me@example.com", "authorization-token", "K1").await?;
///
/// for zone in hemis.zones().await? {
///     println!("{} ({})", zone.name, zone.id);
/// }
/// hemis.set_zone_factor("living", Factor::Brightness, 0.5).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HemisClient {
    base_url: String,
    client: Client,
    token: RwLock<Option<String>>,
}

impl HemisClient {
    /// Creates a client for the service at `base_url`.
    ///
    /// `user_id` is the identity account id and `device_id` the uid of the
    /// device record presented at sign-in.
    ///
    /// # Errors
    ///
    /// Returns error if an identifier cannot be sent as a header or the
    /// HTTP client cannot be created.
    pub fn new(
        base_url: impl Into<String>,
        user_id: &str,
        device_id: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let identity: [(&'static str, &str); 5] = [
            ("x-client-version", CLIENT_VERSION),
            ("x-logged-user", user_id),
            ("x-client-id", device_id),
            ("x-application-id", APPLICATION_ID),
            ("x-brand-id", BRAND_ID),
        ];
        let mut headers = HeaderMap::new();
        for (name, value) in identity {
            let value = HeaderValue::from_str(value)
                .map_err(|_| ProtocolError::InvalidHeader(format!("{name}: {value}")))?;
            headers.insert(HeaderName::from_static(name), value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(ProtocolError::Http)?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            token: RwLock::new(None),
        })
    }

    /// Returns the base URL of the service.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns `true` once a login succeeded.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.token.read().is_some()
    }

    /// Logs into the automation service and keeps the returned token.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationFailed` if rejected, `RateLimited` on 429.
    pub async fn login(
        &self,
        email: &str,
        authorization_token: &str,
        kernel_id: &str,
    ) -> Result<AutomationUser> {
        let url = format!("{}/WS_UserManagement/login", self.base_url);
        tracing::debug!(url = %url, email, "Logging in to automation service");

        let response = self
            .client
            .post(&url)
            .form(&[
                ("email", email),
                ("password", authorization_token),
                ("kernelId", kernel_id),
            ])
            .send()
            .await
            .map_err(ProtocolError::Http)?;

        let user: AutomationUser = decode_response(response).await?;
        *self.token.write() = Some(user.token.clone());
        tracing::info!(role = ?user.role, version = ?user.hemis_version, "Automation session opened");

        Ok(user)
    }

    /// Lists the zones of the building.
    ///
    /// The whole-building zone is given its display name.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn zones(&self) -> Result<Vec<Zone>> {
        let mut zones: Vec<Zone> = self.get("/WS_ZoneManagement/list").await?;
        for zone in zones.iter_mut().filter(|zone| zone.is_master()) {
            zone.name = MASTER_ZONE_NAME.to_string();
        }
        Ok(zones)
    }

    /// Reads the settings of one zone.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn zone_settings(&self, zone_id: &str) -> Result<ZoneSettings> {
        self.get(&format!(
            "/WS_ReactiveEnvironmentDataManagement/{}/settings",
            urlencoding::encode(zone_id)
        ))
        .await
    }

    /// Reads one zone, named after its id.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn zone(&self, zone_id: &str) -> Result<Zone> {
        let settings = self.zone_settings(zone_id).await?;
        Ok(Zone {
            id: zone_id.to_string(),
            name: zone_id.to_string(),
            parent_id: None,
            surface: None,
            zone_type: None,
            settings,
        })
    }

    /// Lists the devices of the building.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn things(&self) -> Result<Vec<Thing>> {
        self.get("/intelligent-things/listV2").await
    }

    /// Writes a factor value.
    ///
    /// Writing to the whole-building zone writes to every other zone
    /// concurrently; the whole-building zone itself is never addressed.
    ///
    /// # Errors
    ///
    /// Returns the first failure among the writes.
    pub async fn set_zone_factor(&self, zone_id: &str, factor: Factor, value: f64) -> Result<()> {
        let targets: Vec<String> = if zone_id == MASTER_ZONE_ID {
            self.zones()
                .await?
                .into_iter()
                .filter(|zone| !zone.is_master())
                .map(|zone| zone.id)
                .collect()
        } else {
            vec![zone_id.to_string()]
        };

        tracing::debug!(zone = zone_id, %factor, value, targets = targets.len(), "Writing factor");
        try_join_all(
            targets
                .iter()
                .map(|target| self.put_factor(target, factor, value)),
        )
        .await?;
        Ok(())
    }

    async fn put_factor(&self, zone_id: &str, factor: Factor, value: f64) -> Result<()> {
        let url = format!(
            "{}/WS_ReactiveEnvironmentDataManagement/{}/settings/{}/value",
            self.base_url,
            urlencoding::encode(zone_id),
            factor
        );
        let response = self
            .authorized(self.client.put(&url))
            .form(&[("value", value.to_string())])
            .send()
            .await
            .map_err(ProtocolError::Http)?;
        check_status(response).await?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(url = %url, "Sending HTTP request");

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(ProtocolError::Http)?;
        decode_response(response).await
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token.read().as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl FactorGateway for HemisClient {
    async fn set_zone_factor(&self, zone_id: &str, factor: Factor, value: f64) -> Result<()> {
        Self::set_zone_factor(self, zone_id, factor, value).await
    }

    async fn zone_settings(&self, zone_id: &str) -> Result<ZoneSettings> {
        Self::zone_settings(self, zone_id).await
    }
}

/// Maps a non-success status to an error.
pub(crate) async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ProtocolError::AuthenticationFailed.into());
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ProtocolError::RateLimited.into());
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), body = %body, "HTTP request rejected");
        return Err(ProtocolError::ConnectionFailed(format!(
            "HTTP {} - {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        ))
        .into());
    }
    Ok(response)
}

/// Checks the status, then parses the JSON body.
pub(crate) async fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = check_status(response).await?;
    let body = response.text().await.map_err(ProtocolError::Http)?;
    tracing::debug!(body = %body, "Received HTTP response");
    Ok(serde_json::from_str(&body).map_err(crate::error::ParseError::from)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash() {
        let client =
            HemisClient::new("https://hemis.example.com/", "U1", "D1", Duration::from_secs(1))
                .unwrap();
        assert_eq!(client.base_url(), "https://hemis.example.com");
        assert!(!client.is_logged_in());
    }

    #[test]
    fn rejects_unsendable_identifiers() {
        let result = HemisClient::new("https://h", "bad\nuser", "D1", Duration::from_secs(1));
        assert!(matches!(
            result,
            Err(crate::Error::Protocol(ProtocolError::InvalidHeader(_)))
        ));
    }
}
