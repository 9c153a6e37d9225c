// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Identity sessions.
//!
//! - [`IdentityClient`] - Signs in and discovers buildings
//! - [`Session`] - Bearer token with its decoded expiry

mod identity;
mod token;

pub use identity::IdentityClient;
pub use token::Session;

