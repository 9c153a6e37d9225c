// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Correlating factor writes with their hardware confirmation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::Completion;
use crate::error::{Error, Result, ValueError};
use crate::event::{EventType, Listener, ListenerId, ListenerRegistry};
use crate::protocol::FactorGateway;
use crate::types::{Factor, MASTER_ZONE_ID};

/// Identifies what a wait is waiting for: one factor of one zone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WaitKey {
    pub building: String,
    pub zone_id: String,
    pub factor: Factor,
}

impl WaitKey {
    /// Creates a key.
    #[must_use]
    pub fn new(building: impl Into<String>, zone_id: impl Into<String>, factor: Factor) -> Self {
        Self {
            building: building.into(),
            zone_id: zone_id.into(),
            factor,
        }
    }

    /// Identifier of the listener registered for this key.
    #[must_use]
    pub fn listener_id(&self) -> ListenerId {
        ListenerId::new(format!(
            "wait:{}:{}:{}",
            self.building, self.zone_id, self.factor
        ))
    }
}

impl fmt::Display for WaitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.building, self.zone_id, self.factor)
    }
}

/// Options of a factor write.
///
/// # Examples
///
/// ```
/// use flexom_lib::command::SetOptions;
///
/// let options = SetOptions::default().with_tolerance(0.05);
/// assert!(options.wait);
///
/// let fire_and_forget = SetOptions::no_wait();
/// assert!(!fire_and_forget.wait);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetOptions {
    /// Wait for the hardware confirmation.
    pub wait: bool,
    /// Accepted distance between requested and confirmed values. `None` uses
    /// the coordinator default.
    pub tolerance: Option<f64>,
}

impl SetOptions {
    /// Writes without waiting for a confirmation.
    #[must_use]
    pub fn no_wait() -> Self {
        Self {
            wait: false,
            tolerance: None,
        }
    }

    /// Sets the tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            wait: true,
            tolerance: None,
        }
    }
}

/// Where a confirmation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationSource {
    /// A hardware state event.
    Event,
    /// The read performed after the confirmation timeout.
    Readback,
}

/// Result of a factor write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaitOutcome {
    /// Written without waiting.
    Sent,
    /// The hardware reached the requested value.
    Confirmed {
        /// The confirmed value.
        value: f64,
        /// How it was confirmed.
        source: ConfirmationSource,
    },
    /// A newer write to the same factor and zone replaced this one, or the
    /// client disconnected.
    Aborted,
}

impl WaitOutcome {
    /// Returns `true` for [`WaitOutcome::Confirmed`].
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }
}

/// How a pending wait was resolved by someone else.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Resolution {
    Confirmed { value: f64 },
    Aborted,
}

struct PendingWait {
    generation: u64,
    listener_id: ListenerId,
    completion: Arc<Completion<Resolution>>,
}

/// Coordinates factor writes with their hardware confirmations.
///
/// At most one wait exists per [`WaitKey`]. A newer write to the same key
/// aborts the older wait: its caller gets [`WaitOutcome::Aborted`].
///
/// The pending table and the registry are only mutated together under the
/// table lock, and cleanup is keyed on a generation number so a finishing
/// wait never removes a newer wait's listener.
pub struct WaitCoordinator {
    registry: Arc<ListenerRegistry>,
    pending: Mutex<HashMap<WaitKey, PendingWait>>,
    next_generation: AtomicU64,
    timeout: Duration,
    default_tolerance: f64,
}

impl WaitCoordinator {
    /// Creates a coordinator registering its listeners in `registry`.
    #[must_use]
    pub fn new(registry: Arc<ListenerRegistry>, timeout: Duration, default_tolerance: f64) -> Self {
        Self {
            registry,
            pending: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
            timeout,
            default_tolerance,
        }
    }

    /// Returns the confirmation timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Writes a factor value and, unless told otherwise, waits until the
    /// hardware confirms it.
    ///
    /// The write runs concurrently with the wait, so a confirmation that
    /// arrives before the write returns is accepted. The write is always
    /// driven to completion. If no confirmation arrives in time, the zone
    /// settings are read once and the value accepted if within tolerance.
    ///
    /// The whole-building zone never reports hardware events, so a write to
    /// it is confirmed by reading the settings back as soon as the write
    /// completes.
    ///
    /// # Errors
    ///
    /// - `Value` if the value or tolerance is invalid
    /// - the write error, if the write fails before a confirmation
    /// - [`Error::ConfirmationTimeout`] if neither an event nor the read back
    ///   confirms the value
    /// - [`Error::DuplicateListener`] if a caller registered a listener under
    ///   the identifier reserved for this wait
    pub async fn set_factor<G: FactorGateway>(
        &self,
        gateway: &G,
        building: &str,
        zone_id: &str,
        factor: Factor,
        value: f64,
        options: SetOptions,
    ) -> Result<WaitOutcome> {
        if !value.is_finite() {
            return Err(ValueError::NonFinite(value).into());
        }
        let tolerance = options.tolerance.unwrap_or(self.default_tolerance);
        if !tolerance.is_finite() {
            return Err(ValueError::NonFinite(tolerance).into());
        }
        if tolerance < 0.0 {
            return Err(ValueError::NegativeTolerance(tolerance).into());
        }

        let key = WaitKey::new(building, zone_id, factor);

        if !options.wait {
            self.abort(&key);
            gateway.set_zone_factor(zone_id, factor, value).await?;
            return Ok(WaitOutcome::Sent);
        }

        if zone_id == MASTER_ZONE_ID {
            self.abort(&key);
            gateway.set_zone_factor(zone_id, factor, value).await?;
            return self.read_back(gateway, &key, value, tolerance).await;
        }

        let (generation, mut confirmation) = self.register(&key, value, tolerance)?;
        let mut guard = WaitGuard {
            coordinator: self,
            key: &key,
            generation,
            armed: true,
        };
        tracing::debug!(key = %key, value, tolerance, generation, "Waiting for confirmation");

        let write = gateway.set_zone_factor(zone_id, factor, value);
        tokio::pin!(write);
        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        let mut written = false;
        let resolution = loop {
            tokio::select! {
                result = &mut write, if !written => {
                    if let Err(e) = result {
                        guard.release();
                        tracing::debug!(key = %key, error = %e, "Write failed, wait torn down");
                        return Err(e);
                    }
                    written = true;
                }
                resolution = &mut confirmation => {
                    break Some(resolution.unwrap_or(Resolution::Aborted));
                }
                () = &mut deadline => break None,
            }
        };

        let still_ours = guard.release();

        match resolution {
            Some(Resolution::Confirmed { value: confirmed }) => {
                if !written && let Err(e) = write.await {
                    tracing::warn!(key = %key, error = %e, "Write failed after confirmation");
                }
                tracing::debug!(key = %key, value = confirmed, "Confirmed by event");
                Ok(WaitOutcome::Confirmed {
                    value: confirmed,
                    source: ConfirmationSource::Event,
                })
            }
            Some(Resolution::Aborted) => {
                if !written && let Err(e) = write.await {
                    tracing::debug!(key = %key, error = %e, "Superseded write failed");
                }
                tracing::debug!(key = %key, "Wait aborted");
                Ok(WaitOutcome::Aborted)
            }
            None => {
                if !written {
                    write.await?;
                }
                if !still_ours {
                    return Ok(WaitOutcome::Aborted);
                }
                self.read_back(gateway, &key, value, tolerance).await
            }
        }
    }

    async fn read_back<G: FactorGateway>(
        &self,
        gateway: &G,
        key: &WaitKey,
        expected: f64,
        tolerance: f64,
    ) -> Result<WaitOutcome> {
        tracing::debug!(key = %key, "No confirmation event, reading back");
        let actual = gateway
            .zone_settings(&key.zone_id)
            .await?
            .value(key.factor);

        match actual {
            Some(actual) if (actual - expected).abs() <= tolerance => Ok(WaitOutcome::Confirmed {
                value: actual,
                source: ConfirmationSource::Readback,
            }),
            actual => {
                tracing::warn!(key = %key, expected, ?actual, "Confirmation timed out");
                Err(Error::ConfirmationTimeout {
                    zone_id: key.zone_id.clone(),
                    factor: key.factor,
                    expected,
                    actual,
                })
            }
        }
    }

    /// Registers a wait for `key`, aborting any older one.
    fn register(
        &self,
        key: &WaitKey,
        target: f64,
        tolerance: f64,
    ) -> Result<(u64, oneshot::Receiver<Resolution>)> {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let (completion, receiver) = Completion::new();
        let listener_id = key.listener_id();

        let listener = {
            let completion = Arc::clone(&completion);
            let factor = key.factor;
            Listener::new(listener_id.clone(), move |event| {
                if let Some(state) = event.as_hardware_state()
                    && state.factor == factor
                    && (state.value - target).abs() <= tolerance
                {
                    completion.resolve(Resolution::Confirmed { value: state.value });
                }
            })
            .for_events([EventType::ActuatorHardwareState])
            .in_zone(key.zone_id.clone())
        };

        let mut pending = self.pending.lock();
        self.abort_locked(&mut pending, key);
        self.registry.insert(listener)?;
        pending.insert(
            key.clone(),
            PendingWait {
                generation,
                listener_id,
                completion,
            },
        );
        Ok((generation, receiver))
    }

    fn abort(&self, key: &WaitKey) {
        let mut pending = self.pending.lock();
        self.abort_locked(&mut pending, key);
    }

    fn abort_locked(&self, pending: &mut HashMap<WaitKey, PendingWait>, key: &WaitKey) {
        if let Some(previous) = pending.remove(key) {
            self.registry.remove(&previous.listener_id);
            previous.completion.resolve(Resolution::Aborted);
            tracing::debug!(key = %key, generation = previous.generation, "Superseded pending wait");
        }
    }

    /// Removes the wait for `key` if it still belongs to `generation`.
    fn cleanup(&self, key: &WaitKey, generation: u64) -> bool {
        let mut pending = self.pending.lock();
        if pending
            .get(key)
            .is_none_or(|wait| wait.generation != generation)
        {
            return false;
        }
        if let Some(wait) = pending.remove(key) {
            self.registry.remove(&wait.listener_id);
        }
        true
    }

    /// Aborts every pending wait. Returns how many were aborted.
    pub fn abort_all(&self) -> usize {
        let mut pending = self.pending.lock();
        let count = pending.len();
        for (_, wait) in pending.drain() {
            self.registry.remove(&wait.listener_id);
            wait.completion.resolve(Resolution::Aborted);
        }
        if count > 0 {
            tracing::debug!(count, "Aborted pending waits");
        }
        count
    }

    /// Number of waits in progress.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Returns `true` if a wait is in progress for `key`.
    #[must_use]
    pub fn is_pending(&self, key: &WaitKey) -> bool {
        self.pending.lock().contains_key(key)
    }
}

impl fmt::Debug for WaitCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitCoordinator")
            .field("pending", &self.pending_count())
            .field("timeout", &self.timeout)
            .field("default_tolerance", &self.default_tolerance)
            .finish_non_exhaustive()
    }
}

/// Removes a wait when its caller finishes or is cancelled.
struct WaitGuard<'a> {
    coordinator: &'a WaitCoordinator,
    key: &'a WaitKey,
    generation: u64,
    armed: bool,
}

impl WaitGuard<'_> {
    /// Cleans up now. Returns `true` if the wait was still the current one.
    fn release(&mut self) -> bool {
        if !self.armed {
            return false;
        }
        self.armed = false;
        self.coordinator.cleanup(self.key, self.generation)
    }
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;
    use crate::event::{Event, HardwareStateEvent};
    use crate::types::{Settings, ZoneSettings};

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[derive(Default)]
    struct FakeGateway {
        writes: parking_lot::Mutex<Vec<(String, Factor, f64)>>,
        settings: parking_lot::Mutex<ZoneSettings>,
        write_delay: Duration,
        fail_writes: bool,
    }

    impl FakeGateway {
        fn with_value(factor: Factor, value: f64) -> Self {
            let gateway = Self::default();
            gateway.settings.lock().insert(factor, Settings::new(value));
            gateway
        }

        fn write_count(&self) -> usize {
            self.writes.lock().len()
        }
    }

    impl FactorGateway for FakeGateway {
        async fn set_zone_factor(&self, zone_id: &str, factor: Factor, value: f64) -> Result<()> {
            tokio::time::sleep(self.write_delay).await;
            self.writes.lock().push((zone_id.to_string(), factor, value));
            if self.fail_writes {
                return Err(ProtocolError::ConnectionFailed("HTTP 500 - boom".to_string()).into());
            }
            Ok(())
        }

        async fn zone_settings(&self, _zone_id: &str) -> Result<ZoneSettings> {
            Ok(self.settings.lock().clone())
        }
    }

    fn coordinator() -> (WaitCoordinator, Arc<ListenerRegistry>) {
        let registry = Arc::new(ListenerRegistry::new());
        (
            WaitCoordinator::new(Arc::clone(&registry), TIMEOUT, 0.01),
            registry,
        )
    }

    fn hardware(zone: &str, factor: Factor, value: f64) -> Event {
        Event::HardwareState(HardwareStateEvent {
            zone_id: zone.to_string(),
            factor,
            timestamp: 0,
            value,
            category: None,
        })
    }

    async fn after(ms: u64, registry: &ListenerRegistry, event: Event) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        registry.dispatch(&event);
    }

    #[tokio::test(start_paused = true)]
    async fn confirmed_by_matching_event() {
        let (coordinator, registry) = coordinator();
        let gateway = FakeGateway::default();

        let (outcome, ()) = tokio::join!(
            coordinator.set_factor(&gateway, "B", "Z1", Factor::Brightness, 0.5, SetOptions::default()),
            async {
                after(5, &registry, hardware("Z1", Factor::Brightness, 0.2)).await;
                after(5, &registry, hardware("Z1", Factor::Temperature, 0.5)).await;
                after(5, &registry, hardware("Z1", Factor::Brightness, 0.505)).await;
            }
        );

        assert_eq!(
            outcome.unwrap(),
            WaitOutcome::Confirmed {
                value: 0.505,
                source: ConfirmationSource::Event
            }
        );
        assert_eq!(gateway.write_count(), 1);
        assert_eq!(coordinator.pending_count(), 0);
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn other_zone_is_ignored_then_times_out() {
        let (coordinator, registry) = coordinator();
        let gateway = FakeGateway::with_value(Factor::Brightness, 0.0);

        let (outcome, ()) = tokio::join!(
            coordinator.set_factor(&gateway, "B", "Z1", Factor::Brightness, 0.5, SetOptions::default()),
            after(5, &registry, hardware("Z2", Factor::Brightness, 0.5)),
        );

        let err = outcome.unwrap_err();
        assert!(matches!(
            err,
            Error::ConfirmationTimeout { ref zone_id, factor: Factor::Brightness, actual: Some(a), .. }
                if zone_id == "Z1" && a.abs() < f64::EPSILON
        ));
        assert_eq!(coordinator.pending_count(), 0);
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_falls_back_to_readback() {
        let (coordinator, _registry) = coordinator();
        let gateway = FakeGateway::with_value(Factor::Temperature, 20.995);

        let outcome = coordinator
            .set_factor(&gateway, "B", "Z1", Factor::Temperature, 21.0, SetOptions::default())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WaitOutcome::Confirmed {
                value: 20.995,
                source: ConfirmationSource::Readback
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn master_zone_reads_back_without_waiting() {
        let (coordinator, registry) = coordinator();
        let gateway = FakeGateway::with_value(Factor::Brightness, 0.3);
        let started = tokio::time::Instant::now();

        let outcome = coordinator
            .set_factor(&gateway, "B", MASTER_ZONE_ID, Factor::Brightness, 0.3, SetOptions::default())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WaitOutcome::Confirmed {
                value: 0.3,
                source: ConfirmationSource::Readback
            }
        );
        assert!(started.elapsed() < TIMEOUT);
        assert_eq!(gateway.write_count(), 1);
        assert_eq!(coordinator.pending_count(), 0);
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn master_zone_mismatch_fails_immediately() {
        let (coordinator, _registry) = coordinator();
        let gateway = FakeGateway::with_value(Factor::Brightness, 0.0);
        let started = tokio::time::Instant::now();

        let err = coordinator
            .set_factor(&gateway, "B", MASTER_ZONE_ID, Factor::Brightness, 1.0, SetOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ConfirmationTimeout { actual: Some(_), .. }));
        assert!(started.elapsed() < TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn readback_without_factor_reports_none() {
        let (coordinator, _registry) = coordinator();
        let gateway = FakeGateway::default();

        let err = coordinator
            .set_factor(&gateway, "B", "Z1", Factor::ExteriorBrightness, 1.0, SetOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ConfirmationTimeout { actual: None, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn newer_write_supersedes_older_wait() {
        let (coordinator, registry) = coordinator();
        let gateway = FakeGateway::default();

        let (first, second, ()) = tokio::join!(
            coordinator.set_factor(&gateway, "B", "Z1", Factor::Brightness, 1.0, SetOptions::default()),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                coordinator
                    .set_factor(&gateway, "B", "Z1", Factor::Brightness, 0.0, SetOptions::default())
                    .await
            },
            after(20, &registry, hardware("Z1", Factor::Brightness, 0.0)),
        );

        assert_eq!(first.unwrap(), WaitOutcome::Aborted);
        assert!(second.unwrap().is_confirmed());
        assert_eq!(gateway.write_count(), 2);
        assert_eq!(coordinator.pending_count(), 0);
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn waits_on_different_keys_are_independent() {
        let (coordinator, registry) = coordinator();
        let gateway = FakeGateway::default();

        let (bri, tmp, ()) = tokio::join!(
            coordinator.set_factor(&gateway, "B", "Z1", Factor::Brightness, 1.0, SetOptions::default()),
            coordinator.set_factor(&gateway, "B", "Z1", Factor::Temperature, 19.0, SetOptions::default()),
            async {
                after(5, &registry, hardware("Z1", Factor::Temperature, 19.0)).await;
                after(5, &registry, hardware("Z1", Factor::Brightness, 1.0)).await;
            },
        );

        assert!(bri.unwrap().is_confirmed());
        assert!(tmp.unwrap().is_confirmed());
    }

    #[tokio::test(start_paused = true)]
    async fn no_wait_only_writes() {
        let (coordinator, registry) = coordinator();
        let gateway = FakeGateway::default();

        let outcome = coordinator
            .set_factor(&gateway, "B", "Z1", Factor::Brightness, 0.3, SetOptions::no_wait())
            .await
            .unwrap();

        assert_eq!(outcome, WaitOutcome::Sent);
        assert_eq!(
            gateway.writes.lock().as_slice(),
            &[("Z1".to_string(), Factor::Brightness, 0.3)]
        );
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_tears_wait_down() {
        let (coordinator, registry) = coordinator();
        let gateway = FakeGateway {
            fail_writes: true,
            ..FakeGateway::default()
        };

        let err = coordinator
            .set_factor(&gateway, "B", "Z1", Factor::Brightness, 0.3, SetOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Protocol(ProtocolError::ConnectionFailed(_))));
        assert_eq!(coordinator.pending_count(), 0);
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn event_before_write_returns_is_accepted() {
        let (coordinator, registry) = coordinator();
        let gateway = FakeGateway {
            write_delay: Duration::from_millis(100),
            ..FakeGateway::default()
        };

        let (outcome, ()) = tokio::join!(
            coordinator.set_factor(&gateway, "B", "Z1", Factor::Brightness, 0.7, SetOptions::default()),
            after(10, &registry, hardware("Z1", Factor::Brightness, 0.7)),
        );

        assert!(outcome.unwrap().is_confirmed());
        assert_eq!(gateway.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_all_releases_waiters() {
        let (coordinator, registry) = coordinator();
        let gateway = FakeGateway::default();

        let (outcome, aborted) = tokio::join!(
            coordinator.set_factor(&gateway, "B", "Z1", Factor::Brightness, 0.7, SetOptions::default()),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                coordinator.abort_all()
            },
        );

        assert_eq!(aborted, 1);
        assert_eq!(outcome.unwrap(), WaitOutcome::Aborted);
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_caller_cleans_up() {
        let (coordinator, registry) = coordinator();
        let gateway = FakeGateway::default();
        let key = WaitKey::new("B", "Z1", Factor::Brightness);

        let result = tokio::time::timeout(
            Duration::from_millis(50),
            coordinator.set_factor(&gateway, "B", "Z1", Factor::Brightness, 0.7, SetOptions::default()),
        )
        .await;

        assert!(result.is_err());
        assert!(!coordinator.is_pending(&key));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn invalid_values_are_rejected() {
        let (coordinator, _registry) = coordinator();
        let gateway = FakeGateway::default();

        let err = coordinator
            .set_factor(&gateway, "B", "Z1", Factor::Brightness, f64::NAN, SetOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Value(ValueError::NonFinite(_))));

        let err = coordinator
            .set_factor(
                &gateway,
                "B",
                "Z1",
                Factor::Brightness,
                0.5,
                SetOptions::default().with_tolerance(-0.1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Value(ValueError::NegativeTolerance(_))));
        assert_eq!(gateway.write_count(), 0);
    }

    #[test]
    fn listener_id_format() {
        let key = WaitKey::new("B-1", "kitchen", Factor::ExteriorBrightness);
        assert_eq!(key.listener_id().as_str(), "wait:B-1:kitchen:BRIEXT");
    }
}
