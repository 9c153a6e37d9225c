// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Client configuration.

use std::time::Duration;

/// Default identity service URL.
pub const DEFAULT_IDENTITY_URL: &str = "https://hemisphere.ubiant.com";

/// Configuration for a [`Client`](crate::Client).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use flexom_lib::config::ClientConfig;
///
/// let config = ClientConfig::default()
///     .with_confirmation_timeout(Duration::from_secs(30))
///     .with_default_tolerance(0.05);
///
/// assert_eq!(config.confirmation_timeout, Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the identity service.
    pub identity_url: String,
    /// Timeout of a single HTTP request.
    pub request_timeout: Duration,
    /// How long a command waits for its hardware confirmation.
    pub confirmation_timeout: Duration,
    /// Tolerance used when a command does not set one.
    pub default_tolerance: f64,
    /// A session closer than this to its expiry is renewed before use.
    pub token_safety_margin: Duration,
    /// Retry policy for rate-limited logins.
    pub login_retry: BackoffPolicy,
    /// Reconnection policy of the event channel.
    pub reconnection: BackoffPolicy,
    /// Heart-beat interval offered to the broker, both directions.
    pub heartbeat: Duration,
    /// Bound on establishing an event channel session.
    pub connection_timeout: Duration,
}

impl ClientConfig {
    /// Default request timeout.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    /// Default confirmation timeout.
    pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(60);
    /// Default confirmation tolerance.
    pub const DEFAULT_TOLERANCE: f64 = 0.01;
    /// Default token safety margin.
    pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(3600);
    /// Default heart-beat interval.
    pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(5);
    /// Default connection timeout.
    pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

    /// Sets the identity service URL.
    #[must_use]
    pub fn with_identity_url(mut self, url: impl Into<String>) -> Self {
        self.identity_url = url.into();
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the confirmation timeout.
    #[must_use]
    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    /// Sets the default confirmation tolerance.
    #[must_use]
    pub fn with_default_tolerance(mut self, tolerance: f64) -> Self {
        self.default_tolerance = tolerance;
        self
    }

    /// Sets the token safety margin.
    #[must_use]
    pub fn with_token_safety_margin(mut self, margin: Duration) -> Self {
        self.token_safety_margin = margin;
        self
    }

    /// Sets the login retry policy.
    #[must_use]
    pub fn with_login_retry(mut self, policy: BackoffPolicy) -> Self {
        self.login_retry = policy;
        self
    }

    /// Sets the event channel reconnection policy.
    #[must_use]
    pub fn with_reconnection(mut self, policy: BackoffPolicy) -> Self {
        self.reconnection = policy;
        self
    }

    /// Sets the heart-beat interval.
    #[must_use]
    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// Sets the event channel connection timeout.
    #[must_use]
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            identity_url: DEFAULT_IDENTITY_URL.to_string(),
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            confirmation_timeout: Self::DEFAULT_CONFIRMATION_TIMEOUT,
            default_tolerance: Self::DEFAULT_TOLERANCE,
            token_safety_margin: Self::DEFAULT_SAFETY_MARGIN,
            login_retry: BackoffPolicy::default(),
            reconnection: BackoffPolicy::reconnect_default(),
            heartbeat: Self::DEFAULT_HEARTBEAT,
            connection_timeout: Self::DEFAULT_CONNECTION_TIMEOUT,
        }
    }
}

/// Delays applied between attempts when the identity or automation service
/// answers 429, and between event channel sessions.
///
/// Attempt `n` waits `initial_delay * backoff_multiplier^n`, capped at
/// `max_delay`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use flexom_lib::config::{BackoffPolicy, ClientConfig};
///
/// // Give up on logins after three rate-limited answers
/// let login = BackoffPolicy::new()
///     .with_max_retries(3)
///     .with_initial_delay(Duration::from_secs(2));
/// assert_eq!(login.delay_for_attempt(1), Duration::from_secs(4));
/// assert!(!login.should_retry(3));
///
/// // Keep reconnecting, but never wait more than ten seconds
/// let reconnect = BackoffPolicy::reconnect_default().with_max_delay(Duration::from_secs(10));
///
/// let config = ClientConfig::default()
///     .with_login_retry(login)
///     .with_reconnection(reconnect);
/// assert!(config.reconnection.should_retry(1_000));
/// ```
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// `false` turns every failure into a final one.
    pub enabled: bool,
    /// Retries allowed after the first failure; `None` never gives up.
    pub max_retries: Option<u32>,
    /// Wait before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single wait.
    pub max_delay: Duration,
    /// Growth factor between consecutive waits.
    pub backoff_multiplier: f32,
}

impl BackoffPolicy {
    /// Login retry policy: ten retries from 1 s, doubling up to 60 s.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails on the first error.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Policy used by the event channel: 100 ms doubling up to 5 s, never
    /// giving up.
    #[must_use]
    pub fn reconnect_default() -> Self {
        Self {
            enabled: true,
            max_retries: None,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f32) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Returns the wait before retry number `attempt` (zero-based).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return self.initial_delay.min(self.max_delay);
        }

        let multiplier = self
            .backoff_multiplier
            .powi(i32::try_from(attempt).unwrap_or(i32::MAX));

        #[allow(clippy::cast_precision_loss)]
        let delay_ms = self.initial_delay.as_millis() as f32 * multiplier;

        // Saturates on overflow, then capped below.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let delay = Duration::from_millis(delay_ms as u64);

        delay.min(self.max_delay)
    }

    /// Returns `true` if retry number `attempt` is allowed.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.enabled && self.max_retries.is_none_or(|max| attempt < max)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: Some(10),
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_config_defaults() {
        let config = ClientConfig::default();

        assert_eq!(config.identity_url, DEFAULT_IDENTITY_URL);
        assert_eq!(config.confirmation_timeout, Duration::from_secs(60));
        assert_eq!(config.token_safety_margin, Duration::from_secs(3600));
        assert!((config.default_tolerance - 0.01).abs() < f64::EPSILON);
        assert_eq!(config.reconnection.max_retries, None);
    }

    #[test]
    fn client_config_builder_chain() {
        let config = ClientConfig::default()
            .with_identity_url("http://localhost:8080")
            .with_request_timeout(Duration::from_secs(2))
            .with_heartbeat(Duration::ZERO)
            .with_login_retry(BackoffPolicy::disabled());

        assert_eq!(config.identity_url, "http://localhost:8080");
        assert_eq!(config.request_timeout, Duration::from_secs(2));
        assert_eq!(config.heartbeat, Duration::ZERO);
        assert!(!config.login_retry.enabled);
    }

    #[test]
    fn backoff_policy_default() {
        let policy = BackoffPolicy::default();

        assert!(policy.enabled);
        assert_eq!(policy.max_retries, Some(10));
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
    }

    #[test]
    fn backoff_policy_disabled() {
        let policy = BackoffPolicy::disabled();

        assert!(!policy.enabled);
        assert!(!policy.should_retry(0));
    }

    #[test]
    fn backoff_delay_calculation() {
        let policy = BackoffPolicy::new()
            .with_initial_delay(Duration::from_secs(1))
            .with_backoff_multiplier(2.0)
            .with_max_delay(Duration::from_secs(10));

        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(10));
        assert_eq!(policy.delay_for_attempt(40), Duration::from_secs(10));
    }

    #[test]
    fn reconnect_policy_never_gives_up() {
        let policy = BackoffPolicy::reconnect_default();

        assert!(policy.should_retry(u32::MAX - 1));
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(5));
    }

    #[test]
    fn bounded_retries() {
        let policy = BackoffPolicy::new().with_max_retries(2);

        assert!(policy.should_retry(0));
        assert!(policy.should_retry(1));
        assert!(!policy.should_retry(2));
    }
}
