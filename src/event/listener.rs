// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Listener registrations for building events.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use super::{Event, EventType};

/// Identifier of a listener registration.
///
/// Chosen by the caller; at most one registration can exist per identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(String);

impl ListenerId {
    /// Creates a listener identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ListenerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ListenerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Type alias for event callbacks.
pub type EventCallback = Arc<dyn Fn(&Event) + Send + Sync>;

/// A named subscription to building events.
///
/// A listener receives every event whose type is in its event set (or any
/// event if the set is empty) and whose zone equals its zone filter (or any
/// zone if no filter is set).
///
/// Two registrations are identical when they share the identifier, the
/// filters and the same callback instance; cloning a `Listener` keeps the
/// callback instance.
///
/// # Examples
///
/// ```
/// use flexom_lib::event::{EventType, Listener};
///
/// let listener = Listener::new("kitchen-lights", |event| {
///     println!("{:?}", event);
/// })
/// .for_events([EventType::ActuatorHardwareState])
/// .in_zone("kitchen");
///
/// assert_eq!(listener.id().as_str(), "kitchen-lights");
/// assert!(listener.same_as(&listener.clone()));
/// ```
#[derive(Clone)]
pub struct Listener {
    id: ListenerId,
    events: BTreeSet<EventType>,
    zone: Option<String>,
    callback: EventCallback,
}

impl Listener {
    /// Creates a listener that receives every event.
    pub fn new<F>(id: impl Into<ListenerId>, callback: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            events: BTreeSet::new(),
            zone: None,
            callback: Arc::new(callback),
        }
    }

    /// Restricts the listener to the given event types.
    #[must_use]
    pub fn for_events(mut self, events: impl IntoIterator<Item = EventType>) -> Self {
        self.events.extend(events);
        self
    }

    /// Restricts the listener to one zone.
    #[must_use]
    pub fn in_zone(mut self, zone_id: impl Into<String>) -> Self {
        self.zone = Some(zone_id.into());
        self
    }

    /// Returns the listener identifier.
    #[must_use]
    pub fn id(&self) -> &ListenerId {
        &self.id
    }

    /// Returns the event types this listener is restricted to.
    #[must_use]
    pub fn events(&self) -> &BTreeSet<EventType> {
        &self.events
    }

    /// Returns the zone filter.
    #[must_use]
    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    /// Returns `true` if the event passes both filters.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        let type_matches = self.events.is_empty() || self.events.contains(&event.event_type());
        let zone_matches = self
            .zone
            .as_deref()
            .is_none_or(|zone| event.zone_id() == Some(zone));
        type_matches && zone_matches
    }

    /// Returns `true` if both registrations are interchangeable.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.id == other.id
            && self.events == other.events
            && self.zone == other.zone
            && Arc::ptr_eq(&self.callback, &other.callback)
    }

    pub(crate) fn notify(&self, event: &Event) {
        (self.callback)(event);
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("events", &self.events)
            .field("zone", &self.zone)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{HardwareStateEvent, RawEvent};
    use crate::types::Factor;

    fn hardware(zone: &str) -> Event {
        Event::HardwareState(HardwareStateEvent {
            zone_id: zone.to_string(),
            factor: Factor::Brightness,
            timestamp: 0,
            value: 1.0,
            category: None,
        })
    }

    fn sensor(zone: Option<&str>) -> Event {
        Event::Other(RawEvent {
            event_type: EventType::SensorState,
            category: None,
            timestamp: None,
            zone_id: zone.map(str::to_string),
            objective_id: None,
            factor_id: None,
            value: None,
        })
    }

    #[test]
    fn unfiltered_listener_matches_everything() {
        let listener = Listener::new("all", |_| {});
        assert!(listener.matches(&hardware("Z1")));
        assert!(listener.matches(&sensor(None)));
    }

    #[test]
    fn type_filter() {
        let listener =
            Listener::new("hw", |_| {}).for_events([EventType::ActuatorHardwareState]);
        assert!(listener.matches(&hardware("Z1")));
        assert!(!listener.matches(&sensor(Some("Z1"))));
    }

    #[test]
    fn zone_filter_rejects_events_without_zone() {
        let listener = Listener::new("z1", |_| {}).in_zone("Z1");
        assert!(listener.matches(&hardware("Z1")));
        assert!(!listener.matches(&hardware("Z2")));
        assert!(!listener.matches(&sensor(None)));
    }

    #[test]
    fn identity_requires_same_callback() {
        let a = Listener::new("id", |_| {});
        let b = Listener::new("id", |_| {});
        assert!(a.same_as(&a.clone()));
        assert!(!a.same_as(&b));
        assert!(!a.same_as(&a.clone().in_zone("Z1")));
    }
}
