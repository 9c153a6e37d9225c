// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Events pushed by the automation service on the building topic.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ParseError;
use crate::types::Factor;

/// Kind of an event, as carried in its `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    ActuatorTargetState,
    /// The value an actuator reports after applying a command.
    ActuatorHardwareState,
    ActuatorCurrentState,
    SensorState,
    ItState,
    FactorTargetState,
    FactorCurrentState,
    ObjectiveState,
    DataProvider,
    EntityManagement,
    /// A type this library does not know about.
    #[serde(other)]
    Unknown,
}

impl EventType {
    /// Returns the wire name of the event type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ActuatorTargetState => "ACTUATOR_TARGET_STATE",
            Self::ActuatorHardwareState => "ACTUATOR_HARDWARE_STATE",
            Self::ActuatorCurrentState => "ACTUATOR_CURRENT_STATE",
            Self::SensorState => "SENSOR_STATE",
            Self::ItState => "IT_STATE",
            Self::FactorTargetState => "FACTOR_TARGET_STATE",
            Self::FactorCurrentState => "FACTOR_CURRENT_STATE",
            Self::ObjectiveState => "OBJECTIVE_STATE",
            Self::DataProvider => "DATA_PROVIDER",
            Self::EntityManagement => "ENTITY_MANAGEMENT",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broad family of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCategory {
    StateEvent,
    DataProviderEvent,
    HemisAction,
    #[serde(other)]
    Unknown,
}

/// Hardware confirmation of a factor value in a zone.
#[derive(Debug, Clone, PartialEq)]
pub struct HardwareStateEvent {
    /// Zone the actuator belongs to.
    pub zone_id: String,
    /// Factor the actuator drives.
    pub factor: Factor,
    /// Milliseconds since the epoch, as stamped by the service.
    pub timestamp: i64,
    /// Value observed by the hardware.
    pub value: f64,
    pub category: Option<EventCategory>,
}

/// Any other event, kept as received.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub event_type: EventType,
    pub category: Option<EventCategory>,
    pub timestamp: Option<i64>,
    pub zone_id: Option<String>,
    pub objective_id: Option<String>,
    pub factor_id: Option<String>,
    pub value: Option<Value>,
}

/// An event received on the building topic.
///
/// # Examples
///
/// ```
/// use flexom_lib::event::{Event, EventType};
/// use flexom_lib::types::Factor;
///
/// let event = Event::from_json(
///     r#"{"type":"ACTUATOR_HARDWARE_STATE","timestamp":1,"category":"STATE_EVENT",
///         "zoneId":"Z1","factorId":"BRI","value":{"value":0.5}}"#,
/// ).unwrap();
///
/// assert_eq!(event.event_type(), EventType::ActuatorHardwareState);
/// let hw = event.as_hardware_state().unwrap();
/// assert_eq!(hw.factor, Factor::Brightness);
/// assert_eq!(hw.value, 0.5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// `ACTUATOR_HARDWARE_STATE`.
    HardwareState(HardwareStateEvent),
    /// Every other event type.
    Other(RawEvent),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    #[serde(rename = "type")]
    event_type: EventType,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    timestamp: Option<i64>,
    category: Option<EventCategory>,
    zone_id: Option<String>,
    objective_id: Option<String>,
    factor_id: Option<String>,
    value: Option<Value>,
}

impl Event {
    /// Parses an event from the JSON body of a broker message.
    ///
    /// A hardware state event whose zone, factor or numeric value cannot be
    /// read is kept as [`Event::Other`].
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the body is not a JSON event.
    pub fn from_json(body: &str) -> Result<Self, ParseError> {
        let wire: WireEvent = serde_json::from_str(body)?;
        Ok(Self::from_wire(wire))
    }

    fn from_wire(wire: WireEvent) -> Self {
        if wire.event_type == EventType::ActuatorHardwareState
            && let Some(hw) = hardware_state(&wire)
        {
            return Self::HardwareState(hw);
        }

        Self::Other(RawEvent {
            event_type: wire.event_type,
            category: wire.category,
            timestamp: wire.timestamp,
            zone_id: wire.zone_id,
            objective_id: wire.objective_id,
            factor_id: wire.factor_id,
            value: wire.value,
        })
    }

    /// Returns the type of the event.
    #[must_use]
    pub fn event_type(&self) -> EventType {
        match self {
            Self::HardwareState(_) => EventType::ActuatorHardwareState,
            Self::Other(raw) => raw.event_type,
        }
    }

    /// Returns the zone the event relates to, if any.
    #[must_use]
    pub fn zone_id(&self) -> Option<&str> {
        match self {
            Self::HardwareState(hw) => Some(&hw.zone_id),
            Self::Other(raw) => raw.zone_id.as_deref(),
        }
    }

    /// Returns the hardware state payload if this is a confirmation event.
    #[must_use]
    pub fn as_hardware_state(&self) -> Option<&HardwareStateEvent> {
        match self {
            Self::HardwareState(hw) => Some(hw),
            Self::Other(_) => None,
        }
    }
}

fn hardware_state(wire: &WireEvent) -> Option<HardwareStateEvent> {
    Some(HardwareStateEvent {
        zone_id: wire.zone_id.clone()?,
        factor: wire.factor_id.as_deref()?.parse().ok()?,
        timestamp: wire.timestamp.unwrap_or_default(),
        value: wire.value.as_ref()?.get("value")?.as_f64()?,
        category: wire.category,
    })
}

/// Reads a millisecond timestamp sent either as an integer or a float.
#[allow(clippy::cast_possible_truncation)]
fn lenient_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.map(|ms| ms as i64))
}

impl From<HardwareStateEvent> for Event {
    fn from(event: HardwareStateEvent) -> Self {
        Self::HardwareState(event)
    }
}
