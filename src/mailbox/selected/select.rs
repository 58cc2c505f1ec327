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

use std::collections::BTreeSet;
use std::sync::{Arc, Condvar, Mutex, Weak};

use super::defs::*;
use crate::mailbox::event::{Event, EventKind};
use crate::mailbox::event_analyser::EventAnalyser;
use crate::mailbox::event_bus::{EventDispatcher, MailboxListener};
use crate::mailbox::model::{Flag, MailboxPath, SessionId, Uid};
use crate::mailbox::seqnum_index::SeqnumIndex;

impl SelectedMailbox {
    /// Create the view `session_id` gets over the mailbox at `path`, and
    /// register it with `dispatcher`.
    ///
    /// `snapshot` is the ascending UIDs of the messages that exist at
    /// selection time; they are assigned sequence numbers 1..=N in order.
    /// `applicable` is the initial applicable-flag baseline (normally
    /// [`Flag::system()`] plus every flag observed on the snapshot).
    ///
    /// The view starts with `silent_flag_changes` on: the session's own
    /// flag edits are not self-reported unless the protocol layer flips
    /// that off.
    pub fn select(
        dispatcher: &Arc<EventDispatcher>,
        session_id: SessionId,
        path: MailboxPath,
        snapshot: impl IntoIterator<Item = Uid>,
        applicable: impl IntoIterator<Item = Flag>,
    ) -> Self {
        let shared = Arc::new(Shared {
            session_id,
            state: Mutex::new(State {
                path: path.clone(),
                index: SeqnumIndex::from_uids(snapshot),
                analyser: EventAnalyser::new(session_id, applicable),
                recent_uids: BTreeSet::new(),
                recent_uid_removed: false,
                closed: false,
            }),
            wakeup: Condvar::new(),
        });

        let listener =
            Arc::downgrade(&shared) as Weak<dyn MailboxListener>;
        let subscription = dispatcher.subscribe(path, listener);

        SelectedMailbox {
            shared,
            subscription,
        }
    }

    /// Tear this view down.
    ///
    /// The dispatcher registration is released and the retained collections
    /// are dropped. No event delivery will touch this view's state after
    /// this returns, including deliveries that were already in flight; an
    /// `IDLE` wait blocked on the view is woken with
    /// [`IdleWake::Closed`](super::IdleWake::Closed).
    ///
    /// Deselecting twice is harmless.
    pub fn deselect(&self) {
        self.subscription.release();

        {
            let mut state = self.lock();
            state.closed = true;
            state.index.clear();
            state.recent_uids.clear();
            state.analyser.reset();
            state.analyser.reset_expunged_uids();
        }
        self.shared.wakeup.notify_all();
    }
}

impl MailboxListener for Shared {
    fn event(&self, event: &Event) {
        {
            let mut state = self.state.lock().unwrap();
            // A racing deselect or rename means this delivery is not for
            // us. (The registry is keyed by path too, but that check
            // happens without our lock held, so it alone cannot be
            // trusted.)
            if state.closed || state.path != event.path {
                return;
            }

            match event.kind {
                EventKind::Added { ref uids } => {
                    // Index first, so that by the time the analyser records
                    // the size change, exists_count() and seqnum() already
                    // reflect the new messages.
                    for &uid in uids {
                        state.index.add(uid);
                    }
                }
                // Expunged messages keep their sequence numbers until the
                // protocol layer reports them; remove() does the
                // renumbering at that point. Only the analyser records the
                // event for now.
                EventKind::Expunged { .. } => (),
                EventKind::FlagsUpdated(ref updated) => {
                    // A flag update carrying \Recent is how recency
                    // propagates from the storage layer into views that
                    // already existed when the message arrived.
                    if updated.sets_recent() {
                        state.recent_uids.insert(updated.uid);
                    }
                }
                EventKind::MailboxDeleted => (),
                EventKind::MailboxRenamed { ref new_path } => {
                    state.path = new_path.clone();
                }
            }

            state.analyser.handle(event);
        }

        self.wakeup.notify_all();
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::super::test_prelude::*;
    use super::*;

    #[test]
    fn select_builds_seqnum_mapping_from_snapshot() {
        let setup = set_up();
        let view = select_view(&setup, SessionId(1), &[3, 5, 9, 12]);

        assert_eq!(4, view.exists_count());
        assert_eq!(Some(Uid::u(3)), view.uid(Seqnum::u(1)));
        assert_eq!(Some(Uid::u(12)), view.uid(Seqnum::u(4)));
        assert_eq!(Some(Seqnum::u(3)), view.seqnum(Uid::u(9)));
        assert_eq!(Some(Uid::u(3)), view.first_uid());
        assert_eq!(Some(Uid::u(12)), view.last_uid());
    }

    #[test]
    fn events_from_other_mailboxes_are_ignored() {
        let setup = set_up();
        let view = select_view(&setup, SessionId(1), &[1]);

        setup.dispatcher.publish(Event {
            session_id: SessionId(2),
            path: MailboxPath::personal(
                "azure".to_owned(),
                "Archive".to_owned(),
            ),
            kind: EventKind::Added {
                uids: vec![Uid::u(2)],
            },
        });

        assert_eq!(1, view.exists_count());
        assert!(!view.is_size_changed());
    }

    #[test]
    fn added_events_extend_the_view() {
        let setup = set_up();
        let view = select_view(&setup, SessionId(1), &[1, 2]);

        publish_added(&setup, SessionId(2), &[3, 4]);

        assert_eq!(4, view.exists_count());
        assert_eq!(Some(Seqnum::u(3)), view.seqnum(Uid::u(3)));
        assert_eq!(Some(Seqnum::u(4)), view.seqnum(Uid::u(4)));
        assert!(view.is_size_changed());
    }

    #[test]
    fn deselected_view_is_never_touched_again() {
        let setup = set_up();
        let view = select_view(&setup, SessionId(1), &[1, 2]);

        view.deselect();
        assert_eq!(
            0,
            setup.dispatcher.subscriber_count(&view.path())
        );

        publish_added(&setup, SessionId(2), &[3]);

        assert_eq!(0, view.exists_count());
        assert!(!view.is_size_changed());

        // Doubly-deselecting changes nothing
        view.deselect();
    }

    #[test]
    fn closed_flag_stops_in_flight_delivery() {
        let setup = set_up();
        let view = select_view(&setup, SessionId(1), &[1]);

        // Simulate a delivery that had already snapshotted the listener
        // when the view deselected: invoke the listener directly.
        let shared = Arc::clone(&view.shared);
        view.deselect();
        shared.event(&Event {
            session_id: SessionId(2),
            path: MailboxPath::personal(
                "azure".to_owned(),
                "INBOX".to_owned(),
            ),
            kind: EventKind::Added {
                uids: vec![Uid::u(9)],
            },
        });

        assert_eq!(0, view.exists_count());
        assert!(!view.is_size_changed());
    }

    #[test]
    fn rename_updates_the_tracked_path() {
        let setup = set_up();
        let view = select_view(&setup, SessionId(1), &[1]);
        let new_path =
            MailboxPath::personal("azure".to_owned(), "Renamed".to_owned());

        setup.dispatcher.publish(Event {
            session_id: SessionId(2),
            path: view.path(),
            kind: EventKind::MailboxRenamed {
                new_path: new_path.clone(),
            },
        });

        assert_eq!(new_path, view.path());

        // Events against the new path keep flowing to the view
        setup.dispatcher.publish(Event {
            session_id: SessionId(2),
            path: new_path,
            kind: EventKind::Added {
                uids: vec![Uid::u(2)],
            },
        });
        assert_eq!(2, view.exists_count());
    }

    #[test]
    fn cross_session_flag_update_with_recent_joins_recent_set() {
        let setup = set_up();
        let view = select_view(&setup, SessionId(1), &[1, 2]);
        assert!(!view.is_recent(Uid::u(2)));

        setup.dispatcher.publish(Event {
            session_id: SessionId(2),
            path: view.path(),
            kind: EventKind::FlagsUpdated(FlagsUpdated {
                uid: Uid::u(2),
                old_flags: vec![],
                new_flags: vec![Flag::Recent],
            }),
        });

        assert!(view.is_recent(Uid::u(2)));
        // A recent-only change is not a reportable flag update
        assert_eq!(0, view.flag_update_uids().len());
    }
}
