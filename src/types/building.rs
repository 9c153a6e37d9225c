// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Buildings, accounts and the client device record sent to the identity service.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Postal address of a building.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub id: String,
    pub address: String,
    pub formatted_address: String,
    pub street_name: String,
    pub city: String,
    pub county: String,
    pub region: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Owner of a building.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Owner {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// A building the account has access to, as listed by the identity service.
///
/// Carries everything needed to reach the building's automation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    /// Building identifier, also the STOMP login.
    #[serde(rename = "buildingId")]
    pub building_id: String,
    /// Base URL of the automation REST service.
    pub hemis_base_url: String,
    /// WebSocket URL of the STOMP broker.
    pub hemis_stomp_url: String,
    /// Token used as password when logging into the automation service.
    #[serde(rename = "authorizationToken")]
    pub authorization_token: String,
    #[serde(rename = "authorizationId", default)]
    pub authorization_id: Option<String>,
    /// Kernel the automation service runs on.
    pub kernel_slot: String,
    #[serde(default)]
    pub kernel_state: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    /// Role granted on the automation service, e.g. `OWNER`.
    #[serde(default)]
    pub auth_hemis_level: Option<String>,
    #[serde(default)]
    pub is_connected: bool,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub owner: Option<Owner>,
}

/// Account returned by the identity service sign-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityUser {
    /// Account identifier, sent as `X-Logged-User` to the automation service.
    pub id: String,
    pub email: String,
    /// Bearer token for the identity service.
    pub token: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

/// Session returned by the automation service login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationUser {
    /// Bearer token for the automation service and the STOMP broker.
    pub token: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub hemis_version: Option<String>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
}

/// Description of the client device presented at sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub uid: String,
    pub name: String,
    pub model: String,
    pub operating_system: String,
    pub first_connection: i64,
    pub last_connection: i64,
}

impl DeviceInfo {
    /// Builds the device record for an account.
    ///
    /// The uid is derived from the email so every login of the same account
    /// presents the same device.
    ///
    /// # Examples
    ///
    /// ```
    /// use flexom_lib::types::DeviceInfo;
    ///
    /// let a = DeviceInfo::for_email("me@example.com");
    /// let b = DeviceInfo::for_email("me@example.com");
    /// assert_eq!(a.uid, b.uid);
    /// assert_ne!(a.uid, DeviceInfo::for_email("you@example.com").uid);
    /// ```
    #[must_use]
    pub fn for_email(email: &str) -> Self {
        let name = format!("flexom-lib:{email}");
        let uid = Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
            .simple()
            .to_string();
        Self {
            uid,
            name: "Nexus 7".to_string(),
            model: "asus Nexus 7".to_string(),
            operating_system: "Android".to_string(),
            first_connection: 0,
            last_connection: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn building_from_service_payload() {
        let building: Building = serde_json::from_value(serde_json::json!({
            "buildingId": "B-42",
            "hemis_base_url": "https://hemis.example.com",
            "hemis_stomp_url": "wss://hemis.example.com/stomp",
            "authorizationToken": "auth-token",
            "authorizationId": "A1",
            "kernel_slot": "K1",
            "kernel_state": "RUNNING",
            "label": "Home",
            "nickname": "home",
            "timezone": "Europe/Paris",
            "auth_hemis_level": "OWNER",
            "is_connected": true,
            "address": {"city": "Paris", "latitude": 48.85, "longitude": 2.35},
            "owner": {"user_id": "U1", "email": "me@example.com"}
        }))
        .unwrap();

        assert_eq!(building.building_id, "B-42");
        assert_eq!(building.kernel_slot, "K1");
        assert!(building.is_connected);
        assert_eq!(building.address.unwrap().city, "Paris");
    }

    #[test]
    fn device_uid_is_hex() {
        let device = DeviceInfo::for_email("me@example.com");
        assert_eq!(device.uid.len(), 32);
        assert!(device.uid.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
