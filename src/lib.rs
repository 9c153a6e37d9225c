// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Flexom Lib - A Rust client for Flexom (Ubiant Hemis) home automation.
//!
//! This library signs into the Flexom cloud, reads the zones of a building
//! and changes their lighting and heating levels, waiting for the hardware
//! to confirm each change.
//!
//! # Supported Features
//!
//! - **Sessions**: Identity sign-in, JWT expiry tracking, transparent re-login
//! - **Zones**: List zones, read their settings, write factor values
//! - **Confirmation**: Wait for the matching hardware event, with readback on timeout
//! - **Events**: Live building events over STOMP with filtered listeners
//! - **Devices**: Read-only listing of installed things
//!
//! # Quick Start
//!
//! ```no_run
//! use flexom_lib::{Client, Factor, SetOptions};
//!
//! #[tokio::main]
//! async fn main() -> flexom_lib::Result<()> {
//!     let client = Client::builder()
//!         .credentials("me@example.com", "secret")
//!         .build()
//!         .await?;
//!
//!     // Wait for the lights to report the new level
//!     let outcome = client
//!         .set_zone_factor("living", Factor::Brightness, 0.5)
//!         .await?;
//!     println!("{outcome:?}");
//!
//!     // Fire and forget
//!     client
//!         .set_zone_factor_with("bedroom", Factor::Temperature, 19.5, SetOptions::no_wait())
//!         .await?;
//!
//!     client.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Listening to Events
//!
//! ```no_run
//! use flexom_lib::{Client, EventType, Listener, ListenerId};
//!
//! # async fn example(client: Client) -> flexom_lib::Result<()> {
//! let listener = Listener::new(ListenerId::new("logger"), |event| {
//!     println!("{:?} in {:?}", event.event_type(), event.zone_id());
//! })
//! .for_events([EventType::ActuatorHardwareState]);
//!
//! client.subscribe(listener).await?;
//! # Ok(())
//! # }
//! ```

mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod protocol;
mod retry;
pub mod session;
pub mod types;

pub use client::{Client, ClientBuilder};
pub use command::{ConfirmationSource, SetOptions, WaitCoordinator, WaitKey, WaitOutcome};
pub use config::{BackoffPolicy, ClientConfig};
pub use error::{Error, ParseError, ProtocolError, Result, ValueError};
pub use event::{Event, EventCategory, EventType, HardwareStateEvent, Listener, ListenerId};
pub use protocol::{EventChannel, EventChannelConfig, FactorGateway, HemisClient};
pub use session::{IdentityClient, Session};
pub use types::{Building, Factor, Thing, Zone, ZoneSettings};
