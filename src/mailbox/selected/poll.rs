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

//! Draining accumulated state between commands.
//!
//! After any command that may have changed state, the protocol layer reads
//! the pending sets off the view, emits the corresponding unsolicited
//! responses, and calls the matching reset methods. Nothing in here resets
//! anything implicitly; every clear is an explicit call, so the protocol
//! layer stays in charge of what its client has actually been told.

use super::defs::*;
use crate::mailbox::model::{Flag, Seqnum, Uid};
use crate::support::error::Error;

impl SelectedMailbox {
    /// Expunge `uid` from the sequence-number mapping, returning the
    /// sequence number it occupied.
    ///
    /// The protocol layer calls this for each UID right as it emits the
    /// `EXPUNGE` response, after the storage-level expunge has already
    /// happened: the returned value is the number to put on the wire, and
    /// by the time this returns, later messages have shifted down to fill
    /// the gap.
    ///
    /// Returns `None` for a UID this view no longer maps (e.g. expunged
    /// twice); that is not an error.
    pub fn remove(&self, uid: Uid) -> Option<Seqnum> {
        self.lock().index.expunge(uid)
    }

    /// Whether new messages have arrived since the last
    /// [`reset_events`](Self::reset_events).
    pub fn is_size_changed(&self) -> bool {
        self.lock().analyser.is_size_changed()
    }

    /// UIDs with reportable flag changes since the last
    /// [`reset_events`](Self::reset_events), ascending.
    pub fn flag_update_uids(&self) -> Vec<Uid> {
        self.lock().analyser.flag_update_uids().collect()
    }

    /// UIDs expunged (by any session) since the last
    /// [`reset_expunged_uids`](Self::reset_expunged_uids), ascending.
    pub fn expunged_uids(&self) -> Vec<Uid> {
        self.lock().analyser.expunged_uids().collect()
    }

    /// Whether another session deleted the mailbox out from under this
    /// view.
    pub fn is_deleted_by_other_session(&self) -> bool {
        self.lock().analyser.is_deleted_by_other_session()
    }

    /// Fail if the mailbox was deleted out from under this view.
    ///
    /// Deletion by another session is not itself an error when it happens;
    /// it surfaces here, on the next command against the view, which the
    /// protocol layer turns into a clean failure and a forced deselect.
    pub fn check_not_deleted(&self) -> Result<(), Error> {
        if self.is_deleted_by_other_session() {
            Err(Error::MailboxDeleted)
        } else {
            Ok(())
        }
    }

    /// The flags the mailbox currently advertises as usable.
    ///
    /// `\Recent` is never in this set.
    pub fn applicable_flags(&self) -> Vec<Flag> {
        self.lock().analyser.applicable_flags().to_vec()
    }

    /// Whether the applicable-flag set grew since the last
    /// [`reset_new_applicable_flags`](Self::reset_new_applicable_flags).
    pub fn has_new_applicable_flags(&self) -> bool {
        self.lock().analyser.has_new_applicable_flags()
    }

    pub fn reset_new_applicable_flags(&self) {
        self.lock().analyser.reset_new_applicable_flags();
    }

    /// Clear the drained notification state — everything except the
    /// expunged set, which [`reset_expunged_uids`](Self::reset_expunged_uids)
    /// clears separately once the recent-set cleanup no longer needs it.
    pub fn reset_events(&self) {
        self.lock().analyser.reset();
    }

    pub fn reset_expunged_uids(&self) {
        self.lock().analyser.reset_expunged_uids();
    }
}

#[cfg(test)]
mod test {
    use super::super::test_prelude::*;

    #[test]
    fn remove_returns_the_seqnum_being_vacated() {
        let setup = set_up();
        let view = select_view(&setup, SessionId(1), &[3, 5, 9, 12]);

        assert_eq!(Some(Seqnum::u(2)), view.remove(Uid::u(5)));
        // Renumbering happened in the same step
        assert_eq!(Some(Uid::u(9)), view.uid(Seqnum::u(2)));
        assert_eq!(3, view.exists_count());
        // Removing again is a no-op
        assert_eq!(None, view.remove(Uid::u(5)));
    }

    #[test]
    fn reset_events_spares_the_expunged_set() {
        let setup = set_up();
        let view = select_view(&setup, SessionId(1), &[1, 2, 3]);

        publish_added(&setup, SessionId(2), &[4]);
        publish_flags_updated(
            &setup,
            SessionId(2),
            Uid::u(1),
            vec![],
            vec![Flag::Keyword("NotJunk".to_owned())],
        );
        publish_expunged(&setup, SessionId(2), &[2]);

        assert!(view.is_size_changed());
        assert_eq!(vec![Uid::u(1)], view.flag_update_uids());
        assert!(view.has_new_applicable_flags());
        assert_eq!(vec![Uid::u(2)], view.expunged_uids());

        view.reset_events();

        assert!(!view.is_size_changed());
        assert!(view.flag_update_uids().is_empty());
        assert!(!view.has_new_applicable_flags());
        assert!(!view.is_deleted_by_other_session());
        assert_eq!(vec![Uid::u(2)], view.expunged_uids());

        view.reset_expunged_uids();
        assert!(view.expunged_uids().is_empty());
    }

    #[test]
    fn deleted_mailbox_fails_the_next_command_cleanly() {
        let setup = set_up();
        let view = select_view(&setup, SessionId(1), &[1]);
        assert!(view.check_not_deleted().is_ok());

        setup.dispatcher.publish(Event {
            session_id: SessionId(2),
            path: view.path(),
            kind: EventKind::MailboxDeleted,
        });

        assert!(view.is_deleted_by_other_session());
        assert_matches!(
            Err(Error::MailboxDeleted),
            view.check_not_deleted()
        );
    }

    #[test]
    fn own_deletion_is_not_reported() {
        let setup = set_up();
        let view = select_view(&setup, SessionId(1), &[1]);

        setup.dispatcher.publish(Event {
            session_id: SessionId(1),
            path: view.path(),
            kind: EventKind::MailboxDeleted,
        });

        assert!(!view.is_deleted_by_other_session());
        assert!(view.check_not_deleted().is_ok());
    }
}
