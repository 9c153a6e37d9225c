// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Protocol implementations for talking to a building's automation service.
//!
//! # Protocols
//!
//! - [`HemisClient`]: HTTP/JSON request-response API (reads and writes)
//! - [`EventChannel`]: STOMP over WebSocket, pushing building events
//!
//! The [`FactorGateway`] trait is the write/read-back seam the command
//! coordinator is generic over.

mod event_channel;
pub(crate) mod http;
pub mod stomp;

pub use event_channel::{EventChannel, EventChannelConfig};
pub use http::{APPLICATION_ID, BRAND_ID, CLIENT_VERSION, FactorGateway, HemisClient};
