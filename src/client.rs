// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level client for one Flexom building.
//!
//! [`Client`] ties the pieces together: it signs in, picks the account's
//! building, logs into its automation service, opens the event channel and
//! then keeps the session alive behind every call.
//!
//! # Examples
//!
//! ```no_run
//! use flexom_lib::{Client, Factor, WaitOutcome};
//!
//! # async fn example() -> flexom_lib::Result<()> {
//! let client = Client::builder()
//!     .credentials("me@example.com", "secret")
//!     .build()
//!     .await?;
//!
//! for zone in client.zones().await? {
//!     println!("{}: {:?}", zone.name, zone.settings.value(Factor::Brightness));
//! }
//!
//! // Returns once the lights report the new level
//! if let WaitOutcome::Confirmed { value, .. } =
//!     client.set_zone_factor("living", Factor::Brightness, 0.8).await?
//! {
//!     println!("brightness is now {value}");
//! }
//!
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::command::{SetOptions, WaitCoordinator, WaitOutcome};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::event::{Listener, ListenerId};
use crate::protocol::{EventChannel, EventChannelConfig, HemisClient};
use crate::retry::retry_rate_limited;
use crate::session::IdentityClient;
use crate::types::{Building, Factor, Thing, Zone, ZoneSettings};

/// A connected client for the first building of an account.
///
/// `Client` is cheaply cloneable (via `Arc`) and can be shared between
/// tasks.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    email: String,
    password: String,
    config: ClientConfig,
    identity: IdentityClient,
    building: Building,
    hemis: HemisClient,
    events: EventChannel,
    waits: WaitCoordinator,
    /// Serializes re-logins.
    relogin: tokio::sync::Mutex<()>,
    /// Bumped after every successful re-login.
    session_generation: AtomicU64,
}

impl Client {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Lists the zones of the building.
    ///
    /// # Errors
    ///
    /// Returns error if the session cannot be renewed or the request fails.
    pub async fn zones(&self) -> Result<Vec<Zone>> {
        self.authorized(|inner| inner.hemis.zones()).await
    }

    /// Reads one zone.
    ///
    /// # Errors
    ///
    /// Returns error if the session cannot be renewed or the request fails.
    pub async fn zone(&self, zone_id: &str) -> Result<Zone> {
        self.authorized(|inner| inner.hemis.zone(zone_id)).await
    }

    /// Reads the settings of one zone.
    ///
    /// # Errors
    ///
    /// Returns error if the session cannot be renewed or the request fails.
    pub async fn zone_settings(&self, zone_id: &str) -> Result<ZoneSettings> {
        self.authorized(|inner| inner.hemis.zone_settings(zone_id))
            .await
    }

    /// Lists the devices of the building.
    ///
    /// # Errors
    ///
    /// Returns error if the session cannot be renewed or the request fails.
    pub async fn things(&self) -> Result<Vec<Thing>> {
        self.authorized(|inner| inner.hemis.things()).await
    }

    /// Writes a factor value and waits for the hardware to confirm it.
    ///
    /// # Errors
    ///
    /// See [`WaitCoordinator::set_factor`].
    pub async fn set_zone_factor(
        &self,
        zone_id: &str,
        factor: Factor,
        value: f64,
    ) -> Result<WaitOutcome> {
        self.set_zone_factor_with(zone_id, factor, value, SetOptions::default())
            .await
    }

    /// Writes a factor value with explicit options.
    ///
    /// # Errors
    ///
    /// See [`WaitCoordinator::set_factor`].
    pub async fn set_zone_factor_with(
        &self,
        zone_id: &str,
        factor: Factor,
        value: f64,
        options: SetOptions,
    ) -> Result<WaitOutcome> {
        self.authorized(|inner| {
            inner.waits.set_factor(
                &inner.hemis,
                &inner.building.building_id,
                zone_id,
                factor,
                value,
                options,
            )
        })
        .await
    }

    /// Registers a listener for building events.
    ///
    /// Renews a stale session first, so the event channel reconnects with a
    /// current token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateListener`] if a different listener uses the
    /// same identifier, or an error if the session cannot be renewed.
    pub async fn subscribe(&self, listener: Listener) -> Result<()> {
        self.ensure_session().await?;
        self.inner.events.add_listener(listener)
    }

    /// Removes a listener. Returns `true` if one was registered.
    ///
    /// Never touches the network.
    pub fn unsubscribe(&self, id: &ListenerId) -> bool {
        self.inner.events.remove_listener(id)
    }

    /// Returns the building this client is bound to.
    #[must_use]
    pub fn building(&self) -> &Building {
        &self.inner.building
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Returns the event channel.
    #[must_use]
    pub fn events(&self) -> &EventChannel {
        &self.inner.events
    }

    /// Returns whether the event channel currently has a session.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.events.is_connected()
    }

    /// Returns whether the identity session outlives the safety margin.
    #[must_use]
    pub fn is_session_valid(&self) -> bool {
        self.inner.identity.is_valid()
    }

    /// Aborts pending waits, closes the event channel and drops the identity
    /// session.
    ///
    /// Listener registrations are kept. A later call logs in again.
    pub async fn disconnect(&self) {
        let aborted = self.inner.waits.abort_all();
        tracing::info!(
            building = %self.inner.building.building_id,
            aborted,
            "Disconnecting client"
        );
        self.inner.events.disconnect().await;
        self.inner.identity.clear();
    }

    /// Runs `operation` with a fresh session, logging in again once if the
    /// automation service rejects it.
    async fn authorized<'a, T, F, Fut>(&'a self, operation: F) -> Result<T>
    where
        F: Fn(&'a ClientInner) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let inner: &'a ClientInner = &self.inner;
        self.ensure_session().await?;

        let generation = inner.session_generation.load(Ordering::Acquire);
        match operation(inner).await {
            Err(e) if e.is_authentication() => {
                tracing::warn!("Automation service rejected the session, logging in again");
                self.relogin(generation).await?;
                operation(inner).await
            }
            result => result,
        }
    }

    async fn ensure_session(&self) -> Result<()> {
        let generation = self.inner.session_generation.load(Ordering::Acquire);
        if self.inner.identity.is_valid() {
            return Ok(());
        }
        tracing::debug!("Identity session stale");
        self.relogin(generation).await
    }

    /// Logs in again unless another caller already did since `seen`.
    async fn relogin(&self, seen: u64) -> Result<()> {
        let inner = &self.inner;
        let _guard = inner.relogin.lock().await;
        if inner.session_generation.load(Ordering::Acquire) != seen {
            return Ok(());
        }

        let token = login(
            &inner.config,
            &inner.identity,
            &inner.hemis,
            &inner.building,
            &inner.email,
            &inner.password,
        )
        .await?;
        inner.events.update_token(token);
        inner.session_generation.fetch_add(1, Ordering::AcqRel);

        tracing::info!(building = %inner.building.building_id, "Session renewed");
        Ok(())
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("email", &self.inner.email)
            .field("building", &self.inner.building.building_id)
            .field("connected", &self.is_connected())
            .field("session_valid", &self.is_session_valid())
            .finish_non_exhaustive()
    }
}

/// Logs into both services. Returns the automation token.
async fn login(
    config: &ClientConfig,
    identity: &IdentityClient,
    hemis: &HemisClient,
    building: &Building,
    email: &str,
    password: &str,
) -> Result<String> {
    retry_rate_limited(&config.login_retry, "identity login", || {
        identity.login(email, password)
    })
    .await?;
    let user = retry_rate_limited(&config.login_retry, "automation login", || {
        hemis.login(email, &building.authorization_token, &building.kernel_slot)
    })
    .await?;
    Ok(user.token)
}

/// Builder for a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use flexom_lib::Client;
///
/// # async fn example() -> flexom_lib::Result<()> {
/// let client = Client::builder()
///     .credentials("me@example.com", "secret")
///     .confirmation_timeout(Duration::from_secs(30))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ClientBuilder {
    credentials: Option<(String, String)>,
    config: ClientConfig,
}

impl ClientBuilder {
    /// Sets the account credentials.
    #[must_use]
    pub fn credentials(mut self, email: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((email.into(), password.into()));
        self
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the identity service URL.
    #[must_use]
    pub fn identity_url(mut self, url: impl Into<String>) -> Self {
        self.config.identity_url = url.into();
        self
    }

    /// Sets the HTTP request timeout (default: 10 seconds).
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Sets the confirmation timeout (default: 60 seconds).
    #[must_use]
    pub fn confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.config.confirmation_timeout = timeout;
        self
    }

    /// Sets the default confirmation tolerance (default: 0.01).
    #[must_use]
    pub fn default_tolerance(mut self, tolerance: f64) -> Self {
        self.config.default_tolerance = tolerance;
        self
    }

    /// Sets the token safety margin (default: 1 hour).
    #[must_use]
    pub fn token_safety_margin(mut self, margin: Duration) -> Self {
        self.config.token_safety_margin = margin;
        self
    }

    /// Signs in, discovers the building and connects.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Credentials are not set
    /// - Either login is rejected
    /// - The account has no building
    /// - The event channel cannot be connected
    pub async fn build(self) -> Result<Client> {
        let (email, password) = self
            .credentials
            .ok_or_else(|| Error::Configuration("credentials are required".to_string()))?;
        let config = self.config;
        if config.default_tolerance.is_nan() || config.default_tolerance < 0.0 {
            return Err(Error::Configuration(format!(
                "default tolerance must be a non-negative number, got {}",
                config.default_tolerance
            )));
        }

        let identity = IdentityClient::new(
            config.identity_url.as_str(),
            &email,
            config.request_timeout,
            config.token_safety_margin,
        )?;
        let user = retry_rate_limited(&config.login_retry, "identity login", || {
            identity.login(&email, &password)
        })
        .await?;

        let building = identity
            .buildings()
            .await?
            .into_iter()
            .next()
            .ok_or(Error::NoBuilding)?;
        tracing::info!(
            building = %building.building_id,
            label = ?building.label,
            "Using building"
        );

        let hemis = HemisClient::new(
            building.hemis_base_url.as_str(),
            &user.id,
            &identity.device().uid,
            config.request_timeout,
        )?;
        let automation = retry_rate_limited(&config.login_retry, "automation login", || {
            hemis.login(&email, &building.authorization_token, &building.kernel_slot)
        })
        .await?;

        let channel_config =
            EventChannelConfig::new(building.hemis_stomp_url.as_str(), building.building_id.as_str())
                .with_heartbeat(config.heartbeat)
                .with_reconnection(config.reconnection.clone())
                .with_connection_timeout(config.connection_timeout);
        let events = EventChannel::connect(channel_config, automation.token).await?;

        let waits = WaitCoordinator::new(
            Arc::clone(events.registry()),
            config.confirmation_timeout,
            config.default_tolerance,
        );

        Ok(Client {
            inner: Arc::new(ClientInner {
                email,
                password,
                config,
                identity,
                building,
                hemis,
                events,
                waits,
                relogin: tokio::sync::Mutex::new(()),
                session_generation: AtomicU64::new(0),
            }),
        })
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("email", &self.credentials.as_ref().map(|(email, _)| email))
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn build_requires_credentials() {
        let err = Client::builder().build().await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn build_rejects_negative_tolerance() {
        let err = Client::builder()
            .credentials("me@example.com", "secret")
            .default_tolerance(-1.0)
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn builder_setters() {
        let builder = Client::builder()
            .credentials("me@example.com", "secret")
            .identity_url("http://localhost:1")
            .request_timeout(Duration::from_secs(3))
            .confirmation_timeout(Duration::from_secs(5))
            .token_safety_margin(Duration::from_secs(60));

        assert_eq!(builder.config.identity_url, "http://localhost:1");
        assert_eq!(builder.config.request_timeout, Duration::from_secs(3));
        assert_eq!(builder.config.confirmation_timeout, Duration::from_secs(5));
        assert_eq!(builder.config.token_safety_margin, Duration::from_secs(60));
    }

    #[test]
    fn builder_debug_hides_password() {
        let builder = Client::builder().credentials("me@example.com", "hunter2");
        let debug = format!("{builder:?}");
        assert!(debug.contains("me@example.com"));
        assert!(!debug.contains("hunter2"));
    }
}
