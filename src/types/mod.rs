// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Domain types exchanged with the identity and automation services.
//!
//! - [`Factor`] - The controllable dimensions of a zone
//! - [`Zone`], [`ZoneSettings`], [`Settings`] - Zones and their current values
//! - [`Thing`] - Device records (read-only)
//! - [`Building`], [`IdentityUser`], [`AutomationUser`] - Account data

mod building;
mod factor;
mod thing;
mod zone;

pub use building::{Address, AutomationUser, Building, DeviceInfo, IdentityUser, Owner};
pub use factor::Factor;
pub use thing::{CompositeState, Thing, ThingProtocol, ThingState, TypeInformation};
pub use zone::{MASTER_ZONE_ID, MASTER_ZONE_NAME, Settings, Zone, ZoneSettings};
