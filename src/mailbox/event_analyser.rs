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

//! Per-session analysis of mailbox mutation events.
//!
//! Nothing here does I/O or locking; it's simply the pure accumulation of
//! what a session's client still needs to be told.

use std::collections::BTreeSet;

use super::event::{Event, EventKind, FlagsUpdated};
use super::model::{Flag, SessionId, Uid};

/// Accumulates the unsolicited-response state for one session's view of a
/// mailbox.
///
/// The analyser is mutated only by event delivery and is drained and reset
/// by the protocol layer between commands; nothing else clears it. The one
/// deliberate wrinkle is that `reset()` leaves `expunged_uids` alone:
/// recent-set cleanup reads the expunged set lazily, so it must survive
/// until the protocol layer has consumed the expungements and explicitly
/// calls `reset_expunged_uids()`.
#[derive(Clone, Debug)]
pub struct EventAnalyser {
    session_id: SessionId,
    size_changed: bool,
    flag_update_uids: BTreeSet<Uid>,
    expunged_uids: BTreeSet<Uid>,
    applicable_flags: Vec<Flag>,
    applicable_flags_changed: bool,
    deleted_by_other_session: bool,
    silent_flag_changes: bool,
}

impl EventAnalyser {
    /// Create an analyser for `session_id`, advertising `applicable` as the
    /// initial applicable-flag set.
    ///
    /// `\Recent` is excluded from the applicable set regardless of the
    /// baseline passed in.
    pub fn new(
        session_id: SessionId,
        applicable: impl IntoIterator<Item = Flag>,
    ) -> Self {
        let mut this = EventAnalyser {
            session_id,
            size_changed: false,
            flag_update_uids: BTreeSet::new(),
            expunged_uids: BTreeSet::new(),
            applicable_flags: Vec::new(),
            applicable_flags_changed: false,
            deleted_by_other_session: false,
            // A session's own flag edits are not echoed back to it unless
            // the protocol layer turns this off for a non-silent STORE.
            silent_flag_changes: true,
        };

        for flag in applicable {
            this.intern_applicable(flag);
        }
        this.applicable_flags_changed = false;

        this
    }

    /// Fold `event` into the pending state.
    ///
    /// The caller has already filtered events down to this view's mailbox.
    pub fn handle(&mut self, event: &Event) {
        match event.kind {
            EventKind::Added { .. } => self.size_changed = true,
            EventKind::Expunged { ref uids } => {
                self.expunged_uids.extend(uids.iter().copied())
            }
            EventKind::FlagsUpdated(ref updated) => {
                self.flags_updated(event.session_id, updated)
            }
            EventKind::MailboxDeleted => {
                if event.session_id != self.session_id {
                    self.deleted_by_other_session = true;
                }
            }
            // Path tracking lives in the view, which filters events before
            // they reach the analyser.
            EventKind::MailboxRenamed { .. } => (),
        }
    }

    fn flags_updated(&mut self, origin: SessionId, updated: &FlagsUpdated) {
        if (origin != self.session_id || !self.silent_flag_changes)
            && !updated.is_recent_only()
        {
            self.flag_update_uids.insert(updated.uid);
        }

        for flag in &updated.new_flags {
            if Flag::Recent != *flag {
                self.intern_applicable(flag.clone());
            }
        }
    }

    fn intern_applicable(&mut self, flag: Flag) {
        if Flag::Recent == flag {
            return;
        }

        if !self.applicable_flags.contains(&flag) {
            self.applicable_flags.push(flag);
            self.applicable_flags_changed = true;
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Whether new messages have arrived since the last `reset()`.
    pub fn is_size_changed(&self) -> bool {
        self.size_changed
    }

    /// UIDs with reportable flag changes since the last `reset()`,
    /// ascending.
    pub fn flag_update_uids(&self) -> impl Iterator<Item = Uid> + '_ {
        self.flag_update_uids.iter().copied()
    }

    /// UIDs expunged since the last `reset_expunged_uids()`, ascending.
    pub fn expunged_uids(&self) -> impl Iterator<Item = Uid> + '_ {
        self.expunged_uids.iter().copied()
    }

    pub fn has_expunged_uids(&self) -> bool {
        !self.expunged_uids.is_empty()
    }

    /// The flags the mailbox currently advertises as usable.
    pub fn applicable_flags(&self) -> &[Flag] {
        &self.applicable_flags
    }

    /// Whether the applicable-flag set grew since the last
    /// `reset_new_applicable_flags()`.
    pub fn has_new_applicable_flags(&self) -> bool {
        self.applicable_flags_changed
    }

    pub fn reset_new_applicable_flags(&mut self) {
        self.applicable_flags_changed = false;
    }

    /// Whether another session removed the mailbox out from under this one.
    pub fn is_deleted_by_other_session(&self) -> bool {
        self.deleted_by_other_session
    }

    /// Whether flag changes made by the owning session are ignored.
    pub fn is_silent_flag_changes(&self) -> bool {
        self.silent_flag_changes
    }

    pub fn set_silent_flag_changes(&mut self, silent_flag_changes: bool) {
        self.silent_flag_changes = silent_flag_changes;
    }

    /// Whether anything at all is waiting to be reported.
    pub fn has_pending(&self) -> bool {
        self.size_changed
            || !self.flag_update_uids.is_empty()
            || !self.expunged_uids.is_empty()
            || self.applicable_flags_changed
            || self.deleted_by_other_session
    }

    /// Clear everything the response cycle has consumed — except the
    /// expunged set, which has its own reset.
    pub fn reset(&mut self) {
        self.size_changed = false;
        self.flag_update_uids.clear();
        self.deleted_by_other_session = false;
        self.applicable_flags_changed = false;
    }

    pub fn reset_expunged_uids(&mut self) {
        self.expunged_uids.clear();
    }
}
