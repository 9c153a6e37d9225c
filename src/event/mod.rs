// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Building events and the listener registry they are dispatched through.
//!
//! The automation service pushes JSON events on a per-building topic. They
//! are parsed into [`Event`] and delivered to every matching [`Listener`]
//! held by a [`ListenerRegistry`].
//!
//! # Examples
//!
//! ```
//! use flexom_lib::event::{Event, EventType, Listener, ListenerRegistry};
//!
//! let registry = ListenerRegistry::new();
//! registry
//!     .insert(Listener::new("log", |event| println!("{:?}", event.event_type())))
//!     .unwrap();
//!
//! let event = Event::from_json(r#"{"type":"SENSOR_STATE","zoneId":"Z1"}"#).unwrap();
//! assert_eq!(registry.dispatch(&event), 1);
//! ```

mod hemis_event;
mod listener;
mod registry;

pub use hemis_event::{Event, EventCategory, EventType, HardwareStateEvent, RawEvent};
pub use listener::{EventCallback, Listener, ListenerId};
pub use registry::ListenerRegistry;
