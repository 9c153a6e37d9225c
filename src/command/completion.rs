// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Single-assignment completion cell.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// A value that can be resolved once, from any thread.
///
/// The first call to [`resolve`](Self::resolve) delivers its value to the
/// receiver returned by [`new`](Self::new); later calls are ignored.
#[derive(Debug)]
pub struct Completion<T> {
    sender: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> Completion<T> {
    /// Creates a cell and the receiver its value is delivered to.
    #[must_use]
    pub fn new() -> (Arc<Self>, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        (
            Arc::new(Self {
                sender: Mutex::new(Some(tx)),
            }),
            rx,
        )
    }

    /// Resolves the cell. Returns `false` if it was already resolved.
    pub fn resolve(&self, value: T) -> bool {
        let Some(tx) = self.sender.lock().take() else {
            return false;
        };
        // The receiver may be gone if the waiter was cancelled.
        let _ = tx.send(value);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_writer_wins() {
        let (cell, rx) = Completion::new();

        assert!(cell.resolve(1));
        assert!(!cell.resolve(2));

        assert_eq!(rx.await.unwrap(), 1);
    }

    #[test]
    fn resolving_without_receiver_still_counts() {
        let (cell, rx) = Completion::new();
        drop(rx);

        assert!(cell.resolve("late"));
        assert!(!cell.resolve("later"));
    }

    #[tokio::test]
    async fn resolves_across_threads() {
        let (cell, rx) = Completion::<u32>::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cell = Arc::clone(&cell);
                std::thread::spawn(move || cell.resolve(i))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert!(rx.await.unwrap() < 4);
    }
}
