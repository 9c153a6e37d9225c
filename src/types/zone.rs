// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Zones and their per-factor settings.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize};

use super::Factor;

/// Identifier of the whole-building zone.
///
/// Writes addressed to this zone are fanned out to every other zone.
pub const MASTER_ZONE_ID: &str = "MyHemis";

/// Display name given to the whole-building zone when zones are listed.
pub const MASTER_ZONE_NAME: &str = "Ma Maison";

/// Current value and bounds of one factor in a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Current value.
    pub value: f64,
    /// Lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Increment between accepted values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    /// Unit of the value, e.g. `%`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Number of actuators driving this factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actuator_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_value_end: Option<f64>,
}

impl Settings {
    /// Creates settings holding only a value.
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self {
            value,
            min: None,
            max: None,
            step: None,
            unit: None,
            actuator_count: None,
            hidden_value: None,
            hidden_value_end: None,
        }
    }
}

/// Settings of a zone, by factor.
///
/// Factors the library does not know about are dropped when decoding.
///
/// # Examples
///
/// ```
/// use flexom_lib::types::{Factor, ZoneSettings};
///
/// let settings: ZoneSettings = serde_json::from_str(
///     r#"{"BRI": {"value": 0.5, "unit": "%"}, "HUMIDITY": {"value": 40}}"#,
/// ).unwrap();
///
/// assert_eq!(settings.value(Factor::Brightness), Some(0.5));
/// assert_eq!(settings.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ZoneSettings(BTreeMap<Factor, Settings>);

impl ZoneSettings {
    /// Creates an empty settings map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the settings of a factor.
    #[must_use]
    pub fn get(&self, factor: Factor) -> Option<&Settings> {
        self.0.get(&factor)
    }

    /// Returns the current value of a factor.
    #[must_use]
    pub fn value(&self, factor: Factor) -> Option<f64> {
        self.get(factor).map(|s| s.value)
    }

    /// Inserts or replaces the settings of a factor.
    pub fn insert(&mut self, factor: Factor, settings: Settings) {
        self.0.insert(factor, settings);
    }

    /// Number of factors present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the zone exposes no known factor.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over factors and their settings.
    pub fn iter(&self) -> impl Iterator<Item = (Factor, &Settings)> {
        self.0.iter().map(|(factor, settings)| (*factor, settings))
    }
}

impl FromIterator<(Factor, Settings)> for ZoneSettings {
    fn from_iter<T: IntoIterator<Item = (Factor, Settings)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for ZoneSettings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<HashMap<String, Settings>>::deserialize(deserializer)?;
        Ok(raw
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(name, settings)| Some((name.parse().ok()?, settings)))
            .collect())
    }
}

/// A controllable space of the building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    /// Zone identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Identifier of the enclosing zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Surface of the zone as reported by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface: Option<String>,
    /// Zone type, e.g. a room kind.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub zone_type: Option<String>,
    /// Per-factor settings.
    #[serde(default)]
    pub settings: ZoneSettings,
}

impl Zone {
    /// Returns `true` if this is the whole-building zone.
    #[must_use]
    pub fn is_master(&self) -> bool {
        self.id == MASTER_ZONE_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_from_service_payload() {
        let zone: Zone = serde_json::from_str(
            r#"{
                "id": "Z1",
                "name": "Kitchen",
                "parentId": null,
                "surface": "12",
                "type": null,
                "settings": {
                    "BRI": {"value": 1, "min": 0, "max": 1, "step": 0.01, "unit": "%", "actuatorCount": 2},
                    "TMP": {"value": 19.5}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(zone.id, "Z1");
        assert!(zone.parent_id.is_none());
        assert!(!zone.is_master());
        assert_eq!(zone.settings.value(Factor::Brightness), Some(1.0));
        assert_eq!(
            zone.settings.get(Factor::Brightness).unwrap().actuator_count,
            Some(2)
        );
        assert_eq!(zone.settings.value(Factor::Temperature), Some(19.5));
        assert_eq!(zone.settings.value(Factor::ExteriorBrightness), None);
    }

    #[test]
    fn zone_without_settings() {
        let zone: Zone = serde_json::from_str(r#"{"id": "MyHemis", "name": "MyHemis"}"#).unwrap();
        assert!(zone.is_master());
        assert!(zone.settings.is_empty());
    }

    #[test]
    fn null_settings_are_empty() {
        let settings: ZoneSettings = serde_json::from_str("null").unwrap();
        assert!(settings.is_empty());
    }

    #[test]
    fn settings_serialize_with_wire_keys() {
        let settings: ZoneSettings = [(Factor::ExteriorBrightness, Settings::new(0.25))]
            .into_iter()
            .collect();
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json, serde_json::json!({"BRIEXT": {"value": 0.25}}));
    }
}
