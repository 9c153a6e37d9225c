// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Confirmed factor writes.
//!
//! A write to a zone factor is acknowledged by the service as soon as it is
//! accepted, but the hardware reports the value it actually reached later,
//! as an `ACTUATOR_HARDWARE_STATE` event. [`WaitCoordinator`] issues the
//! write and waits for that event.
//!
//! # States
//!
//! For each [`WaitKey`] (building, zone, factor):
//!
//! | From | To | When |
//! |------|----|------|
//! | idle | pending | a write with `wait` starts |
//! | pending | confirmed | a matching event arrives |
//! | pending | timed out | the timeout elapses (then one read back) |
//! | pending | aborted | a newer write to the same key, or disconnect |
//!
//! Every terminal state returns to idle.

mod completion;
mod wait;

pub use completion::Completion;
pub use wait::{ConfirmationSource, SetOptions, WaitCoordinator, WaitKey, WaitOutcome};
