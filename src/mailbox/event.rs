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

//! The taxonomy of mutation events that fan out to selected-mailbox views.

use serde::{Deserialize, Serialize};

use super::model::{Flag, MailboxPath, SessionId, Uid};

/// A single mailbox mutation, as delivered to every view selected on the
/// affected mailbox.
///
/// Events are session-neutral: each consumer decides for itself what the
/// mutation means for its own client, using `session_id` to tell its own
/// mutations apart from everyone else's.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// The session that performed the mutation.
    pub session_id: SessionId,
    /// The path of the mailbox the mutation applies to, at the time it was
    /// performed.
    pub path: MailboxPath,
    pub kind: EventKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// One or more messages were appended, in ascending UID order.
    Added { uids: Vec<Uid> },
    /// Messages were permanently removed.
    Expunged { uids: Vec<Uid> },
    /// One message's flags changed.
    FlagsUpdated(FlagsUpdated),
    /// The mailbox itself was removed.
    MailboxDeleted,
    /// The mailbox was moved to a new path.
    MailboxRenamed { new_path: MailboxPath },
}

/// The before and after flag sets of a single message.
///
/// Both complete sets are carried, rather than the delta, so that consumers
/// which joined at different times still converge on the same answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagsUpdated {
    pub uid: Uid,
    pub old_flags: Vec<Flag>,
    pub new_flags: Vec<Flag>,
}

impl FlagsUpdated {
    /// Return an iterator over the flags present in exactly one of the old
    /// and new sets.
    pub fn changed_flags(&self) -> impl Iterator<Item = &Flag> + '_ {
        self.old_flags
            .iter()
            .filter(move |f| !self.new_flags.contains(f))
            .chain(
                self.new_flags
                    .iter()
                    .filter(move |f| !self.old_flags.contains(f)),
            )
    }

    /// Return whether nothing changed besides the `\Recent` pseudo-flag.
    ///
    /// Such updates exist to propagate recency between sessions and are
    /// never reported to clients as flag changes.
    pub fn is_recent_only(&self) -> bool {
        self.changed_flags().all(|f| Flag::Recent == *f)
    }

    /// Return whether this update gained the `\Recent` pseudo-flag.
    pub fn sets_recent(&self) -> bool {
        self.new_flags.contains(&Flag::Recent)
            && !self.old_flags.contains(&Flag::Recent)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn updated(old: Vec<Flag>, new: Vec<Flag>) -> FlagsUpdated {
        FlagsUpdated {
            uid: Uid::u(1),
            old_flags: old,
            new_flags: new,
        }
    }

    #[test]
    fn changed_flags_is_the_symmetric_difference() {
        let u = updated(
            vec![Flag::Seen, Flag::Draft],
            vec![Flag::Seen, Flag::Flagged],
        );
        let changed: Vec<&Flag> = u.changed_flags().collect();
        assert_eq!(vec![&Flag::Draft, &Flag::Flagged], changed);
    }

    #[test]
    fn recent_only_updates_are_recognised() {
        assert!(updated(vec![], vec![Flag::Recent]).is_recent_only());
        assert!(updated(vec![Flag::Recent], vec![]).is_recent_only());
        // Nothing changed at all: also nothing to report
        assert!(updated(vec![Flag::Seen], vec![Flag::Seen]).is_recent_only());
        assert!(!updated(vec![], vec![Flag::Recent, Flag::Seen])
            .is_recent_only());
        assert!(!updated(vec![], vec![Flag::Keyword("NotJunk".to_owned())])
            .is_recent_only());
    }

    #[test]
    fn sets_recent_requires_a_gain() {
        assert!(updated(vec![], vec![Flag::Recent]).sets_recent());
        assert!(!updated(vec![Flag::Recent], vec![Flag::Recent])
            .sets_recent());
        assert!(!updated(vec![Flag::Recent], vec![]).sets_recent());
    }
}
