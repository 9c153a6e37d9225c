// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registry of named listeners shared by the event channel and its callers.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use parking_lot::RwLock;

use super::{Event, Listener, ListenerId};
use crate::error::Error;

/// Registry for listener registrations.
///
/// The registry lives outside the transport so registrations survive
/// reconnects. It only exposes insert-if-absent-or-identical,
/// remove-if-present and dispatch; every mutation is a single critical
/// section on a `parking_lot::RwLock`.
///
/// # Thread Safety
///
/// Dispatch takes a snapshot of the matching listeners and releases the
/// lock before calling them, so callbacks may register or remove listeners.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<HashMap<ListenerId, Listener>>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener.
    ///
    /// Registering a listener identical to the one already stored under the
    /// same identifier does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateListener`] if a different listener is
    /// registered under the same identifier.
    pub fn insert(&self, listener: Listener) -> Result<(), Error> {
        let mut listeners = self.listeners.write();
        if let Some(existing) = listeners.get(listener.id()) {
            if existing.same_as(&listener) {
                return Ok(());
            }
            return Err(Error::DuplicateListener(listener.id().clone()));
        }
        tracing::debug!(listener = %listener.id(), "Listener registered");
        listeners.insert(listener.id().clone(), listener);
        Ok(())
    }

    /// Removes a listener.
    ///
    /// Returns `true` if a listener was removed. Removing an unknown
    /// identifier is not an error.
    pub fn remove(&self, id: &ListenerId) -> bool {
        let removed = self.listeners.write().remove(id).is_some();
        if removed {
            tracing::debug!(listener = %id, "Listener removed");
        }
        removed
    }

    /// Returns `true` if a listener is registered under this identifier.
    #[must_use]
    pub fn contains(&self, id: &ListenerId) -> bool {
        self.listeners.read().contains_key(id)
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Returns `true` if no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Delivers an event to every matching listener.
    ///
    /// A panicking callback is reported and does not prevent delivery to
    /// the other listeners. Returns the number of listeners the event was
    /// delivered to.
    pub fn dispatch(&self, event: &Event) -> usize {
        let matching: Vec<Listener> = self
            .listeners
            .read()
            .values()
            .filter(|listener| listener.matches(event))
            .cloned()
            .collect();

        for listener in &matching {
            if catch_unwind(AssertUnwindSafe(|| listener.notify(event))).is_err() {
                tracing::error!(
                    listener = %listener.id(),
                    event_type = %event.event_type(),
                    "Listener callback panicked"
                );
            }
        }

        matching.len()
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}
