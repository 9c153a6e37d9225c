// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Real-time event channel: a STOMP subscription over WebSocket.
//!
//! The channel keeps one STOMP session open to the building's broker,
//! subscribed to the building topic, and dispatches every event it receives
//! to a shared [`ListenerRegistry`]. Lost sessions are re-established in the
//! background; listener registrations survive reconnects.
//!
//! # Examples
//!
//! ```no_run
//! use flexom_lib::event::Listener;
//! use flexom_lib::protocol::{EventChannel, EventChannelConfig};
//!
//! # async fn example() -> flexom_lib::Result<()> {
//! let config = EventChannelConfig::new("wss://hemis.example.com/stomp", "B-42");
//! let channel = EventChannel::connect(config, "hemis-token").await?;
//!
//! channel.add_listener(Listener::new("printer", |event| println!("{event:?}")))?;
//!
//! channel.disconnect().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::{SinkExt, Stream, StreamExt};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use super::stomp::{self, Frame, command};
use crate::config::BackoffPolicy;
use crate::error::{Error, ProtocolError};
use crate::event::{Event, Listener, ListenerId, ListenerRegistry};

/// Configuration for an [`EventChannel`].
#[derive(Debug, Clone)]
pub struct EventChannelConfig {
    endpoint: String,
    building_id: String,
    heartbeat: Duration,
    reconnection: BackoffPolicy,
    connection_timeout: Duration,
}

impl EventChannelConfig {
    /// Default heart-beat interval.
    pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(5);
    /// Default connection timeout.
    pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a configuration for the broker at `endpoint`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, building_id: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            building_id: building_id.into(),
            heartbeat: Self::DEFAULT_HEARTBEAT,
            reconnection: BackoffPolicy::reconnect_default(),
            connection_timeout: Self::DEFAULT_CONNECTION_TIMEOUT,
        }
    }

    /// Sets the heart-beat interval offered in both directions.
    ///
    /// `Duration::ZERO` disables heart-beats.
    #[must_use]
    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// Sets the reconnection policy.
    #[must_use]
    pub fn with_reconnection(mut self, policy: BackoffPolicy) -> Self {
        self.reconnection = policy;
        self
    }

    /// Sets the bound on establishing a session.
    #[must_use]
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Returns the WebSocket endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the building identifier.
    #[must_use]
    pub fn building_id(&self) -> &str {
        &self.building_id
    }

    /// Returns the heart-beat interval.
    #[must_use]
    pub fn heartbeat(&self) -> Duration {
        self.heartbeat
    }

    /// Returns the reconnection policy.
    #[must_use]
    pub fn reconnection(&self) -> &BackoffPolicy {
        &self.reconnection
    }

    /// Returns the connection timeout.
    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }

    /// Returns the destination the channel subscribes to.
    #[must_use]
    pub fn topic(&self) -> String {
        format!("jms.topic.{}.data", self.building_id)
    }
}

/// A self-healing event subscription for one building.
///
/// `EventChannel` is cheaply cloneable (via `Arc`).
#[derive(Clone)]
pub struct EventChannel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    config: EventChannelConfig,
    /// Passcode used by the next (re)connection.
    token: RwLock<String>,
    registry: Arc<ListenerRegistry>,
    connected: AtomicBool,
    task: Mutex<Option<RunningTask>>,
}

struct RunningTask {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

enum SessionEnd {
    Shutdown,
    Lost(String),
}

type ReadySender = oneshot::Sender<Result<(), ProtocolError>>;

impl EventChannel {
    /// Connects with a fresh listener registry.
    ///
    /// Returns once the first session is established and subscribed.
    ///
    /// # Errors
    ///
    /// Returns error if the first session cannot be established within the
    /// connection timeout, or if the broker rejects it.
    pub async fn connect(
        config: EventChannelConfig,
        token: impl Into<String>,
    ) -> Result<Self, ProtocolError> {
        Self::connect_with_registry(config, token, Arc::new(ListenerRegistry::new())).await
    }

    /// Connects, dispatching into an existing registry.
    ///
    /// # Errors
    ///
    /// Same as [`connect`](Self::connect).
    pub async fn connect_with_registry(
        config: EventChannelConfig,
        token: impl Into<String>,
        registry: Arc<ListenerRegistry>,
    ) -> Result<Self, ProtocolError> {
        let channel = Self {
            inner: Arc::new(ChannelInner {
                config,
                token: RwLock::new(token.into()),
                registry,
                connected: AtomicBool::new(false),
                task: Mutex::new(None),
            }),
        };
        channel.start().await?;
        Ok(channel)
    }

    async fn start(&self) -> Result<(), ProtocolError> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (ready_tx, ready_rx) = oneshot::channel();

        let handle = tokio::spawn(run(Arc::clone(&self.inner), shutdown_rx, ready_tx));
        let previous = self
            .inner
            .task
            .lock()
            .replace(RunningTask { shutdown_tx, handle });
        if let Some(previous) = previous {
            stop_task(previous, self.inner.config.connection_timeout).await;
        }

        let timeout = self.inner.config.connection_timeout;
        let result = match tokio::time::timeout(timeout, ready_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ProtocolError::ConnectionFailed(
                "event channel task terminated unexpectedly".to_string(),
            )),
            Err(_) => Err(ProtocolError::ConnectionFailed(format!(
                "event channel connection timeout after {}s",
                timeout.as_secs()
            ))),
        };

        match result {
            Ok(()) => {
                tracing::info!(
                    endpoint = %self.inner.config.endpoint,
                    building = %self.inner.config.building_id,
                    "Connected to event channel"
                );
                Ok(())
            }
            Err(e) => {
                let task = self.inner.task.lock().take();
                if let Some(task) = task {
                    stop_task(task, Duration::ZERO).await;
                }
                Err(e)
            }
        }
    }

    /// Registers a listener.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateListener`] if a different listener uses the
    /// same identifier.
    pub fn add_listener(&self, listener: Listener) -> Result<(), Error> {
        self.inner.registry.insert(listener)
    }

    /// Removes a listener. Returns `true` if one was registered.
    pub fn remove_listener(&self, id: &ListenerId) -> bool {
        self.inner.registry.remove(id)
    }

    /// Replaces the passcode used by subsequent (re)connections.
    ///
    /// The current session is left untouched.
    pub fn update_token(&self, token: impl Into<String>) {
        *self.inner.token.write() = token.into();
        tracing::debug!("Event channel token updated");
    }

    /// Closes the session and stops reconnecting.
    ///
    /// Listener registrations are kept.
    pub async fn disconnect(&self) {
        let task = self.inner.task.lock().take();
        if let Some(task) = task {
            tracing::info!(
                building = %self.inner.config.building_id,
                "Disconnecting from event channel"
            );
            stop_task(task, self.inner.config.connection_timeout).await;
        }
        self.inner.connected.store(false, Ordering::Release);
    }

    /// Starts a new session after [`disconnect`](Self::disconnect).
    ///
    /// Does nothing if the channel is running.
    ///
    /// # Errors
    ///
    /// Same as [`connect`](Self::connect).
    pub async fn reconnect(&self) -> Result<(), ProtocolError> {
        let running = self
            .inner
            .task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished());
        if running {
            return Ok(());
        }
        self.start().await
    }

    /// Returns whether a session is currently established.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Returns the registry events are dispatched to.
    #[must_use]
    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.inner.registry
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &EventChannelConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("endpoint", &self.inner.config.endpoint)
            .field("building_id", &self.inner.config.building_id)
            .field("connected", &self.is_connected())
            .field("listeners", &self.inner.registry.len())
            .finish()
    }
}

async fn stop_task(task: RunningTask, grace: Duration) {
    let RunningTask {
        shutdown_tx,
        mut handle,
    } = task;
    let _ = shutdown_tx.send(true);
    if tokio::time::timeout(grace, &mut handle).await.is_err() {
        handle.abort();
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Runs sessions until shut down or the reconnection policy gives up.
async fn run(
    inner: Arc<ChannelInner>,
    mut shutdown: watch::Receiver<bool>,
    ready_tx: ReadySender,
) {
    let mut ready = Some(ready_tx);
    let mut attempt = 0;

    loop {
        let mut established = false;
        let outcome = run_session(&inner, &mut shutdown, &mut ready, &mut established).await;
        inner.connected.store(false, Ordering::Release);

        match outcome {
            Ok(SessionEnd::Shutdown) => break,
            Ok(SessionEnd::Lost(reason)) => {
                tracing::warn!(reason = %reason, "Event channel session lost");
            }
            Err(e) => {
                if let Some(tx) = ready.take() {
                    let _ = tx.send(Err(e));
                    return;
                }
                tracing::warn!(error = %e, "Event channel session failed");
            }
        }

        if established {
            attempt = 0;
        }
        if *shutdown.borrow() {
            break;
        }

        let policy = &inner.config.reconnection;
        if !policy.should_retry(attempt) {
            tracing::error!(attempts = attempt, "Event channel gave up reconnecting");
            break;
        }
        let delay = policy.delay_for_attempt(attempt);
        attempt += 1;
        tracing::debug!(attempt, delay_ms = millis(delay), "Reconnecting event channel");

        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => break,
        }
    }
}

/// Runs one STOMP session: connect, subscribe, then pump frames.
async fn run_session(
    inner: &ChannelInner,
    shutdown: &mut watch::Receiver<bool>,
    ready: &mut Option<ReadySender>,
    established: &mut bool,
) -> Result<SessionEnd, ProtocolError> {
    let config = &inner.config;
    let timeout = config.connection_timeout;

    let (socket, _) = tokio::time::timeout(timeout, connect_async(config.endpoint.as_str()))
        .await
        .map_err(|_| ProtocolError::Timeout(millis(timeout)))?
        .map_err(ProtocolError::from)?;
    let (mut sink, mut stream) = socket.split();

    let offered = millis(config.heartbeat);
    let token = inner.token.read().clone();
    let connect = Frame::connect(&config.building_id, &token, (offered, offered));
    sink.send(Message::Text(connect.encode())).await?;

    let connected = tokio::time::timeout(timeout, await_connected(&mut stream))
        .await
        .map_err(|_| ProtocolError::Timeout(millis(timeout)))??;

    let (outgoing, incoming) =
        stomp::negotiate_heartbeat((offered, offered), connected.header("heart-beat"));

    let topic = config.topic();
    sink.send(Message::Text(Frame::subscribe("sub-0", &topic).encode()))
        .await?;

    inner.connected.store(true, Ordering::Release);
    *established = true;
    tracing::debug!(
        topic = %topic,
        version = connected.header("version").unwrap_or("1.0"),
        outgoing_ms = outgoing.map(millis),
        incoming_ms = incoming.map(millis),
        "Subscribed to building topic"
    );
    if let Some(tx) = ready.take() {
        let _ = tx.send(Ok(()));
    }

    // Intervals are only polled when the direction is enabled.
    let idle = Duration::from_secs(3600);
    let mut beat = tokio::time::interval(outgoing.unwrap_or(idle));
    let mut liveness = tokio::time::interval(incoming.unwrap_or(idle));
    let mut last_inbound = Instant::now();

    loop {
        tokio::select! {
            message = stream.next() => {
                let Some(message) = message else {
                    return Ok(SessionEnd::Lost("stream ended".to_string()));
                };
                let message = message?;
                last_inbound = Instant::now();
                if let Message::Close(frame) = &message {
                    return Ok(SessionEnd::Lost(format!("closed by broker: {frame:?}")));
                }
                if let Some(text) = message_text(message) {
                    handle_text(inner, &text)?;
                }
            }
            _ = beat.tick(), if outgoing.is_some() => {
                sink.send(Message::Text(stomp::HEARTBEAT.to_string())).await?;
            }
            _ = liveness.tick(), if incoming.is_some() => {
                if let Some(incoming) = incoming
                    && last_inbound.elapsed() > incoming * 2
                {
                    return Ok(SessionEnd::Lost("heart-beat timeout".to_string()));
                }
            }
            _ = shutdown.changed() => {
                let _ = sink.send(Message::Text(Frame::disconnect().encode())).await;
                let _ = sink.close().await;
                return Ok(SessionEnd::Shutdown);
            }
        }
    }
}

async fn await_connected<S>(stream: &mut S) -> Result<Frame, ProtocolError>
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    while let Some(message) = stream.next().await {
        let Some(text) = message_text(message?) else {
            continue;
        };
        let frames =
            stomp::decode(&text).map_err(|e| ProtocolError::ConnectionFailed(e.to_string()))?;
        for frame in frames {
            match frame.command.as_str() {
                command::CONNECTED => return Ok(frame),
                command::ERROR => return Err(broker_error(&frame)),
                _ => {}
            }
        }
    }
    Err(ProtocolError::ConnectionFailed(
        "broker closed the connection before CONNECTED".to_string(),
    ))
}

fn message_text(message: Message) -> Option<String> {
    match message {
        Message::Text(text) => Some(text),
        Message::Binary(data) => String::from_utf8(data).ok(),
        _ => None,
    }
}

fn broker_error(frame: &Frame) -> ProtocolError {
    let message = frame.header("message").unwrap_or(frame.body.as_str());
    ProtocolError::ConnectionFailed(format!("broker error: {message}"))
}

/// Handles one inbound text message. An `ERROR` frame ends the session.
fn handle_text(inner: &ChannelInner, text: &str) -> Result<(), ProtocolError> {
    let frames = match stomp::decode(text) {
        Ok(frames) => frames,
        Err(e) => {
            tracing::warn!(error = %e, "Dropping malformed STOMP frame");
            return Ok(());
        }
    };

    for frame in frames {
        match frame.command.as_str() {
            command::MESSAGE => match Event::from_json(&frame.body) {
                Ok(event) => {
                    let delivered = inner.registry.dispatch(&event);
                    tracing::debug!(
                        event_type = %event.event_type(),
                        zone = ?event.zone_id(),
                        delivered,
                        "Event dispatched"
                    );
                }
                Err(e) => {
                    tracing::warn!(error = %e, body = %frame.body, "Dropping unparseable event");
                }
            },
            command::ERROR => {
                let e = broker_error(&frame);
                tracing::error!(error = %e, "Broker sent ERROR frame");
                return Err(e);
            }
            other => tracing::debug!(command = other, "Ignoring STOMP frame"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let config = EventChannelConfig::new("wss://broker/stomp", "B-1");
        assert_eq!(config.endpoint(), "wss://broker/stomp");
        assert_eq!(config.building_id(), "B-1");
        assert_eq!(config.heartbeat(), Duration::from_secs(5));
        assert_eq!(config.connection_timeout(), Duration::from_secs(10));
        assert_eq!(config.reconnection().max_retries, None);
        assert_eq!(config.topic(), "jms.topic.B-1.data");
    }

    #[test]
    fn config_builder_chain() {
        let config = EventChannelConfig::new("ws://localhost:1", "B")
            .with_heartbeat(Duration::ZERO)
            .with_connection_timeout(Duration::from_secs(2))
            .with_reconnection(BackoffPolicy::disabled());

        assert_eq!(config.heartbeat(), Duration::ZERO);
        assert_eq!(config.connection_timeout(), Duration::from_secs(2));
        assert!(!config.reconnection().enabled);
    }

    #[test]
    fn binary_messages_are_read_as_text() {
        assert_eq!(
            message_text(Message::Binary(b"MESSAGE\n\n\0".to_vec())).as_deref(),
            Some("MESSAGE\n\n\0")
        );
        assert!(message_text(Message::Ping(Vec::new())).is_none());
    }

    #[tokio::test]
    async fn unreachable_broker_fails_fast() {
        let config = EventChannelConfig::new("ws://127.0.0.1:1/stomp", "B")
            .with_connection_timeout(Duration::from_secs(5));

        let result = EventChannel::connect(config, "token").await;

        assert!(result.is_err());
    }
}
