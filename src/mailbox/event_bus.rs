//-
// Copyright (c) 2020, Jason Lingle
//
// This file is part of Dovetail.
//
// Dovetail is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Dovetail is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along
// with Dovetail. If not, see <http://www.gnu.org/licenses/>.

//! The per-mailbox event fan-out.
//!
//! There is no authoritative shared index of any mailbox. Instead, every
//! mutation is published here, and each view selected on the affected
//! mailbox folds the event into its own private state. Delivery is
//! synchronous on the mutating session's thread: when `publish()` returns,
//! every view has seen the event, so a mutator's own view is always current
//! by the time its command handler builds the response.
//!
//! The dispatcher holds only weak references to listeners and guards its
//! registry with its own lock, never held while a listener runs. A listener
//! must therefore only touch state it owns; in particular it must not take
//! another session's view lock or block on I/O.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};

use log::error;

use super::event::{Event, EventKind};
use super::model::MailboxPath;

/// A consumer of mailbox mutation events.
pub trait MailboxListener: Send + Sync {
    /// Fold `event` into the listener's own state.
    ///
    /// Called synchronously on the mutating session's thread, which is
    /// usually not the thread the listener's owning session runs commands
    /// on.
    fn event(&self, event: &Event);
}

/// The mailbox-scoped publish/subscribe registry.
///
/// One dispatcher instance serves a whole process (or a whole store); it is
/// constructed explicitly and injected into everything that publishes, so
/// there is no process-wide singleton to mutate.
#[derive(Default)]
pub struct EventDispatcher {
    subscribers: Mutex<SubscriberMap>,
}

#[derive(Default)]
struct SubscriberMap {
    next_id: u64,
    by_path: HashMap<MailboxPath, Vec<Subscriber>>,
}

struct Subscriber {
    id: u64,
    listener: Weak<dyn MailboxListener>,
}

/// Releases a listener registration when asked (or dropped).
///
/// The registration is identified by id rather than by the listener itself,
/// so releasing it cannot race with delivery, and it keeps working even if
/// the mailbox was renamed (and the registry re-keyed) in the meantime.
pub struct SubscriptionHandle {
    dispatcher: Weak<EventDispatcher>,
    id: u64,
}

impl EventDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(EventDispatcher::default())
    }

    /// Register `listener` for events published against `path`.
    ///
    /// Only a weak reference is retained; a listener that is simply dropped
    /// stops receiving events without any explicit cleanup, and the dead
    /// entry is pruned on the next publish. Releasing the returned handle
    /// removes the entry eagerly.
    pub fn subscribe(
        self: &Arc<Self>,
        path: MailboxPath,
        listener: Weak<dyn MailboxListener>,
    ) -> SubscriptionHandle {
        let mut subs = self.subscribers.lock().unwrap();
        let id = subs.next_id;
        subs.next_id += 1;
        subs.by_path
            .entry(path)
            .or_insert_with(Vec::new)
            .push(Subscriber { id, listener });

        SubscriptionHandle {
            dispatcher: Arc::downgrade(self),
            id,
        }
    }

    /// Deliver `event` to every listener currently subscribed to its path,
    /// on the calling thread, in subscription order.
    ///
    /// Delivery works from a snapshot of the registration list, taken under
    /// the registry lock but invoked outside it, so listeners may freely
    /// subscribe and unsubscribe (including themselves) while a delivery is
    /// in flight.
    ///
    /// A listener that panics is isolated: the panic is caught and logged,
    /// and delivery proceeds to the remaining listeners. The publisher
    /// never observes a failure.
    pub fn publish(&self, event: Event) {
        let snapshot = {
            let mut subs = self.subscribers.lock().unwrap();
            let snapshot = match subs.by_path.get_mut(&event.path) {
                Some(list) => {
                    // Prune registrations whose listeners are gone
                    list.retain(|s| s.listener.strong_count() > 0);
                    list.iter()
                        .map(|s| Weak::clone(&s.listener))
                        .collect::<Vec<_>>()
                }
                None => Vec::new(),
            };

            // A rename moves the registration list to the new path so that
            // later publishes still reach the same views. The views
            // themselves re-learn their path from the event.
            if let EventKind::MailboxRenamed { ref new_path } = event.kind {
                if let Some(list) = subs.by_path.remove(&event.path) {
                    subs.by_path
                        .entry(new_path.clone())
                        .or_insert_with(Vec::new)
                        .extend(list);
                }
            }

            snapshot
        };

        for weak in snapshot {
            let listener = match weak.upgrade() {
                Some(listener) => listener,
                None => continue,
            };

            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                listener.event(&event)
            }));
            if result.is_err() {
                error!(
                    "{} Listener panicked during event delivery; \
                     continuing with remaining listeners",
                    event.path
                );
            }
        }
    }

    /// Remove the registration with the given id, wherever it is keyed.
    fn unsubscribe(&self, id: u64) {
        let mut subs = self.subscribers.lock().unwrap();
        for list in subs.by_path.values_mut() {
            list.retain(|s| s.id != id);
        }
        subs.by_path.retain(|_, list| !list.is_empty());
    }

    /// Return how many live registrations exist for `path`.
    #[cfg(test)]
    pub(super) fn subscriber_count(&self, path: &MailboxPath) -> usize {
        self.subscribers
            .lock()
            .unwrap()
            .by_path
            .get(path)
            .map(|list| {
                list.iter()
                    .filter(|s| s.listener.strong_count() > 0)
                    .count()
            })
            .unwrap_or(0)
    }
}

impl SubscriptionHandle {
    /// Release the registration.
    ///
    /// After this returns, the dispatcher no longer holds the entry.
    /// Releasing twice is harmless.
    pub fn release(&self) {
        if let Some(dispatcher) = self.dispatcher.upgrade() {
            dispatcher.unsubscribe(self.id);
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.release();
    }
}
