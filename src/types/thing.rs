// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Physical and virtual devices ("things") installed in the building.
//!
//! These records are read-only: the library lists them but never changes them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::Zone;

/// Radio or network protocol used to reach a thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThingProtocol {
    Enocean,
    WebServices,
    Thread,
    Ovp,
    Io,
    /// A protocol this library does not know about.
    #[serde(other)]
    Other,
}

/// Health of a thing, or of one of its axes in [`CompositeState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThingState {
    Ok,
    Paired,
    Unreachable,
    Mute,
    Unknown,
    Ko,
    NotNeeded,
    /// A state this library does not know about.
    #[serde(other)]
    Other,
}

/// Per-axis state flags.
///
/// The service reports three axes (`o`, `p`, `r`), each with a current value,
/// a previous value, timestamps and a cause code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeState {
    pub o: Option<ThingState>,
    #[serde(rename = "pO")]
    pub previous_o: Option<ThingState>,
    #[serde(rename = "oTs")]
    pub o_timestamp: Option<i64>,
    #[serde(rename = "oC")]
    pub o_cause: Option<String>,
    pub p: Option<ThingState>,
    #[serde(rename = "pP")]
    pub previous_p: Option<ThingState>,
    #[serde(rename = "pTs")]
    pub p_timestamp: Option<i64>,
    #[serde(rename = "pC")]
    pub p_cause: Option<String>,
    pub r: Option<ThingState>,
    #[serde(rename = "pR")]
    pub previous_r: Option<ThingState>,
    #[serde(rename = "rTs")]
    pub r_timestamp: Option<i64>,
    #[serde(rename = "rC")]
    pub r_cause: Option<String>,
}

/// Static description of a thing model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeInformation {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    pub protocol: Option<ThingProtocol>,
    #[serde(default)]
    pub remote_commissioning: bool,
    #[serde(default)]
    pub splittable: bool,
    #[serde(default)]
    pub customizable: bool,
    #[serde(default)]
    pub has_actuators: bool,
    #[serde(default)]
    pub has_sensors: bool,
    /// Sensor channel to measured factor.
    #[serde(default)]
    pub sensors_factor: HashMap<String, String>,
    /// Actuator channel to driven factors.
    #[serde(default)]
    pub actuators_factors: HashMap<String, Vec<String>>,
}

/// A physical or virtual device record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thing {
    /// Thing identifier.
    pub id: String,
    #[serde(default)]
    pub external_id: Option<String>,
    /// Identifier on the communication bus.
    #[serde(rename = "comID", default)]
    pub com_id: Option<String>,
    #[serde(default)]
    pub firmware_version: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub creation_time_stamp: Option<i64>,
    /// `REAL` for physical devices.
    #[serde(default)]
    pub embodiment: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Zone the thing is installed in.
    #[serde(default)]
    pub zone_information: Option<Zone>,
    #[serde(default)]
    pub type_information: Option<TypeInformation>,
    #[serde(default)]
    pub specified_gateway: Option<String>,
    #[serde(default)]
    pub specified_gateway_enable: bool,
    #[serde(default)]
    pub account_id: Option<String>,
    /// Overall health.
    pub state: Option<ThingState>,
    #[serde(default)]
    pub composite_state: Option<CompositeState>,
    /// Received signal strength.
    #[serde(default)]
    pub rssi: Option<i32>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub hardware_type_com_ids: HashMap<String, String>,
}

impl Thing {
    /// Returns the protocol used to reach this thing, if described.
    #[must_use]
    pub fn protocol(&self) -> Option<ThingProtocol> {
        self.type_information.as_ref().and_then(|t| t.protocol)
    }

    /// Returns the zone identifier the thing belongs to.
    #[must_use]
    pub fn zone_id(&self) -> Option<&str> {
        self.zone_information.as_ref().map(|z| z.id.as_str())
    }
}
