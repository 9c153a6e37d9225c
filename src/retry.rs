// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Retrying rate-limited requests.

use std::future::Future;

use crate::config::BackoffPolicy;
use crate::error::Result;

/// Runs `operation`, retrying while it fails with a rate-limit error.
///
/// Any other error is returned immediately. Once the policy gives up, the
/// last rate-limit error is returned.
///
/// # Errors
///
/// Returns the error of the last attempt.
pub async fn retry_rate_limited<T, F, Fut>(
    policy: &BackoffPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Err(e) if e.is_rate_limited() && policy.should_retry(attempt) => {
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Too many login requests, waiting to retry"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::error::{Error, ProtocolError};

    fn policy() -> BackoffPolicy {
        BackoffPolicy::new()
            .with_max_retries(3)
            .with_initial_delay(Duration::from_millis(10))
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result = retry_rate_limited(&policy(), "login", || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(Error::Protocol(ProtocolError::RateLimited))
            } else {
                Ok("token")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "token");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<()> = retry_rate_limited(&policy(), "login", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Protocol(ProtocolError::RateLimited))
        })
        .await;

        assert!(result.unwrap_err().is_rate_limited());
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn other_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<()> = retry_rate_limited(&policy(), "login", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Protocol(ProtocolError::AuthenticationFailed))
        })
        .await;

        assert!(result.unwrap_err().is_authentication());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
