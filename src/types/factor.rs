// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Control factors of a zone.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValueError;

/// A scalar control dimension of a zone.
///
/// Hemis exposes each factor as a settings entry on the zone, keyed by its
/// wire name (`BRI`, `BRIEXT`, `TMP`).
///
/// # Examples
///
/// ```
/// use flexom_lib::types::Factor;
///
/// let factor: Factor = "BRIEXT".parse().unwrap();
/// assert_eq!(factor, Factor::ExteriorBrightness);
/// assert_eq!(factor.to_string(), "BRIEXT");
///
/// assert!("HUM".parse::<Factor>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Factor {
    /// Interior lighting level (`BRI`).
    Brightness,
    /// Exterior light let in, i.e. shutters and blinds (`BRIEXT`).
    ExteriorBrightness,
    /// Temperature set point (`TMP`).
    Temperature,
}

impl Factor {
    /// All factors known to the library.
    pub const ALL: [Self; 3] = [
        Self::Brightness,
        Self::ExteriorBrightness,
        Self::Temperature,
    ];

    /// Returns the wire name used by the automation service.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Brightness => "BRI",
            Self::ExteriorBrightness => "BRIEXT",
            Self::Temperature => "TMP",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Factor {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BRI" => Ok(Self::Brightness),
            "BRIEXT" => Ok(Self::ExteriorBrightness),
            "TMP" => Ok(Self::Temperature),
            other => Err(ValueError::UnknownFactor(other.to_string())),
        }
    }
}

impl Serialize for Factor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Factor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
