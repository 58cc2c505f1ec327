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
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crate::mailbox::event_analyser::EventAnalyser;
use crate::mailbox::event_bus::SubscriptionHandle;
use crate::mailbox::model::{MailboxPath, Seqnum, SessionId, Uid};
use crate::mailbox::seqnum_index::SeqnumIndex;

/// One session's live view of one mailbox.
///
/// The view is created by `SELECT`/`EXAMINE` and lives until the session
/// deselects the mailbox or logs out. It owns the session's sequence-number
/// index, its pending-notification state, and its `\Recent` set; the
/// dispatcher holds only a weak reference back, with the registration
/// released through the retained handle on deselect.
///
/// All methods take `&self`: the state is behind an internal mutex so that
/// event delivery (on other sessions' threads) and the owning session's
/// command thread can interleave safely.
pub struct SelectedMailbox {
    pub(super) shared: Arc<Shared>,
    pub(super) subscription: SubscriptionHandle,
}

/// The state shared between the owning session and the dispatcher.
pub(super) struct Shared {
    pub(super) session_id: SessionId,
    pub(super) state: Mutex<State>,
    /// Signalled after every event delivery and on deselect, to wake an
    /// `IDLE` wait.
    pub(super) wakeup: Condvar,
}

pub(super) struct State {
    /// The path this view filters events against. Updated when the mailbox
    /// is renamed.
    pub(super) path: MailboxPath,
    pub(super) index: SeqnumIndex,
    pub(super) analyser: EventAnalyser,
    pub(super) recent_uids: BTreeSet<Uid>,
    pub(super) recent_uid_removed: bool,
    /// Set by `deselect()`. A closed view ignores all further deliveries,
    /// even ones already in flight when the subscription was released.
    pub(super) closed: bool,
}

impl SelectedMailbox {
    pub(super) fn lock(&self) -> MutexGuard<'_, State> {
        self.shared.state.lock().unwrap()
    }

    /// Return the id of the owning session.
    pub fn session_id(&self) -> SessionId {
        self.shared.session_id
    }

    /// Return the path this view currently tracks.
    ///
    /// This follows renames performed by any session.
    pub fn path(&self) -> MailboxPath {
        self.lock().path.clone()
    }

    /// Return the number of messages with sequence numbers, i.e. the
    /// `EXISTS` value.
    pub fn exists_count(&self) -> usize {
        self.lock().index.len()
    }

    /// Return the sequence number currently bound to `uid`, or `None` if
    /// the message does not exist in this view.
    pub fn seqnum(&self, uid: Uid) -> Option<Seqnum> {
        self.lock().index.seqnum(uid)
    }

    /// Return the UID currently bound to `seqnum`, or `None` if the
    /// sequence number is not assigned.
    pub fn uid(&self, seqnum: Seqnum) -> Option<Uid> {
        self.lock().index.uid(seqnum)
    }

    /// Return the least UID in the view.
    pub fn first_uid(&self) -> Option<Uid> {
        self.lock().index.first_uid()
    }

    /// Return the greatest UID in the view.
    pub fn last_uid(&self) -> Option<Uid> {
        self.lock().index.last_uid()
    }

    /// Whether flag changes made by the owning session are ignored.
    pub fn is_silent_flag_changes(&self) -> bool {
        self.lock().analyser.is_silent_flag_changes()
    }

    /// Set whether flag changes made by the owning session are ignored.
    ///
    /// Defaults to true; the protocol layer clears it while executing a
    /// non-silent `STORE` so the session sees its own `FETCH` echo.
    pub fn set_silent_flag_changes(&self, silent: bool) {
        self.lock().analyser.set_silent_flag_changes(silent);
    }
}
