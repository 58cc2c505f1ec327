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

use std::sync::{Arc, Mutex};

use chrono::prelude::*;
use log::info;

use super::event::{Event, EventKind, FlagsUpdated};
use super::event_bus::EventDispatcher;
use super::model::{
    Flag, MailboxId, MailboxPath, SelectResponse, SessionId, Uid,
};
use super::selected::SelectedMailbox;
use super::storage::{
    MailboxMetadata, MessageMapper, MessageMetadata, UidRange,
};
use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;

/// A session-neutral handle on one mailbox.
///
/// The store performs the storage-level half of every mutation — reserving
/// UIDs, saving and deleting metadata through the mapper — and then
/// publishes the matching event, so that every view selected on the mailbox
/// (the mutator's own included) learns of the change before the mutating
/// call returns.
///
/// It holds no per-session state and cannot notice changes; noticing is
/// [`SelectedMailbox`]'s job.
///
/// Clones share the mailbox identity (and therefore follow renames
/// together).
#[derive(Clone)]
pub struct MessageStore {
    log_prefix: LogPrefix,
    id: MailboxId,
    uid_validity: u32,
    path: Arc<Mutex<MailboxPath>>,
    mapper: Arc<dyn MessageMapper>,
    dispatcher: Arc<EventDispatcher>,
}

impl MessageStore {
    pub fn new(
        log_prefix: LogPrefix,
        metadata: MailboxMetadata,
        mapper: Arc<dyn MessageMapper>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        log_prefix.set_mailbox(metadata.path.name.clone());

        MessageStore {
            log_prefix,
            id: metadata.id,
            uid_validity: metadata.uid_validity,
            path: Arc::new(Mutex::new(metadata.path)),
            mapper,
            dispatcher,
        }
    }

    pub fn id(&self) -> MailboxId {
        self.id
    }

    /// Return the mailbox's current path.
    pub fn path(&self) -> MailboxPath {
        self.path.lock().unwrap().clone()
    }

    /// Return the UID validity of this mailbox instance.
    ///
    /// If the mailbox is deleted and recreated, this continues to reflect
    /// the validity the instance was opened with.
    pub fn uid_validity(&self) -> u32 {
        self.uid_validity
    }

    /// Bring the mailbox into selected state for `session_id`.
    ///
    /// This corresponds to `SELECT` and `EXAMINE`: the current messages are
    /// snapshotted, the view is built over them and registered with the
    /// dispatcher, and messages stored with `\Recent` seed the view's
    /// recent set.
    pub fn select(
        &self,
        session_id: SessionId,
    ) -> Result<(SelectedMailbox, SelectResponse), Error> {
        let messages = self.mapper.find_in_range(self.id, UidRange::All)?;

        let selected = SelectedMailbox::select(
            &self.dispatcher,
            session_id,
            self.path(),
            messages.iter().map(|m| m.uid),
            Flag::system()
                .chain(messages.iter().flat_map(|m| m.flags.iter().cloned())),
        );

        for message in &messages {
            if message.is_set(&Flag::Recent) {
                selected.add_recent(message.uid);
            }
        }

        let response = SelectResponse {
            flags: selected.applicable_flags(),
            exists: selected.exists_count(),
            recent: selected.recent_count(),
            unseen: messages
                .iter()
                .find(|m| !m.is_set(&Flag::Seen))
                .and_then(|m| selected.seqnum(m.uid)),
            uidnext: messages
                .last()
                .map_or(Uid::MIN, |m| m.uid.saturating_next()),
            uidvalidity: self.uid_validity,
        };

        Ok((selected, response))
    }

    /// Append a message to this mailbox, returning the UID it was assigned.
    ///
    /// This corresponds to the storage half of `APPEND` (and of `COPY`'s
    /// destination side). The UID comes from the mapper's atomic
    /// reservation, so concurrent appends by different sessions get
    /// distinct, ordered UIDs. The stored flags always include `\Recent`;
    /// whichever session selects first claims it.
    pub fn append(
        &self,
        session_id: SessionId,
        internal_date: DateTime<Utc>,
        flags: impl IntoIterator<Item = Flag>,
    ) -> Result<Uid, Error> {
        let reservation = self.mapper.consume_next_uid(self.id)?;
        let uid = reservation.uid;

        let mut flags: Vec<Flag> = flags.into_iter().collect();
        if !flags.contains(&Flag::Recent) {
            flags.push(Flag::Recent);
        }

        self.mapper.save(
            self.id,
            &MessageMetadata {
                uid,
                flags,
                internal_date,
            },
        )?;

        info!("{} Delivered message to {}", self.log_prefix, uid.0.get());
        self.publish(
            session_id,
            EventKind::Added { uids: vec![uid] },
        );
        Ok(uid)
    }

    /// Add `add` to and remove `remove` from the flags of the message with
    /// the given UID.
    ///
    /// This is the storage half of `STORE`/`UID STORE` for one message. If
    /// the net effect is no change, nothing is saved and no event is
    /// published.
    pub fn set_flags(
        &self,
        session_id: SessionId,
        uid: Uid,
        add: &[Flag],
        remove: &[Flag],
    ) -> Result<(), Error> {
        let mut found =
            self.mapper.find_in_range(self.id, UidRange::Single(uid))?;
        let mut message = match found.pop() {
            Some(message) => message,
            None => return Err(Error::NxMessage),
        };

        let old_flags = message.flags.clone();
        for flag in add {
            if !message.flags.contains(flag) {
                message.flags.push(flag.clone());
            }
        }
        message.flags.retain(|f| !remove.contains(f));

        if old_flags == message.flags {
            return Ok(());
        }

        self.mapper.save(self.id, &message)?;
        self.publish(
            session_id,
            EventKind::FlagsUpdated(FlagsUpdated {
                uid,
                old_flags,
                new_flags: message.flags,
            }),
        );
        Ok(())
    }

    /// Permanently remove every message currently flagged `\Deleted`,
    /// returning their UIDs ascending.
    ///
    /// This is the storage half of `EXPUNGE`. The caller typically follows
    /// up by calling `remove()` on its own view for each UID as it emits
    /// the responses; every other view learns of the removals through the
    /// published event.
    pub fn expunge(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<Uid>, Error> {
        let doomed = self.mapper.find_marked_for_deletion(self.id)?;

        let mut uids = Vec::with_capacity(doomed.len());
        for message in doomed {
            self.mapper.delete(self.id, message.uid)?;
            uids.push(message.uid);
        }

        if !uids.is_empty() {
            info!(
                "{} Expunged {} message(s)",
                self.log_prefix,
                uids.len()
            );
            self.publish(
                session_id,
                EventKind::Expunged { uids: uids.clone() },
            );
        }
        Ok(uids)
    }

    /// Remove the mailbox itself.
    ///
    /// Remaining messages are deleted through the mapper, then the deletion
    /// is announced; views owned by other sessions record it and fail
    /// their next command cleanly.
    pub fn delete_mailbox(
        &self,
        session_id: SessionId,
    ) -> Result<(), Error> {
        for message in self.mapper.find_in_range(self.id, UidRange::All)? {
            self.mapper.delete(self.id, message.uid)?;
        }

        info!("{} Mailbox deleted", self.log_prefix);
        self.publish(session_id, EventKind::MailboxDeleted);
        Ok(())
    }

    /// Move the mailbox to `new_path`.
    ///
    /// The event is published against the old path (that is where the
    /// subscribers are); the dispatcher re-keys its registry and every view
    /// re-learns its path from the event.
    pub fn rename(&self, session_id: SessionId, new_path: MailboxPath) {
        let event = Event {
            session_id,
            path: self.path(),
            kind: EventKind::MailboxRenamed {
                new_path: new_path.clone(),
            },
        };

        *self.path.lock().unwrap() = new_path.clone();
        self.log_prefix.set_mailbox(new_path.name);
        self.dispatcher.publish(event);
    }

    fn publish(&self, session_id: SessionId, kind: EventKind) {
        self.dispatcher.publish(Event {
            session_id,
            path: self.path(),
            kind,
        });
    }
}

#[cfg(test)]
mod test {
    use std::thread;

    use super::super::test_prelude::*;
    use crate::mailbox::storage::UidRange;

    #[test]
    fn append_assigns_sequential_uids() {
        let setup = set_up();

        assert_eq!(Uid::u(1), simple_append(&setup.store, SessionId(1)));
        assert_eq!(Uid::u(2), simple_append(&setup.store, SessionId(1)));
        assert_eq!(Uid::u(3), simple_append(&setup.store, SessionId(2)));
    }

    #[test]
    fn concurrent_appends_get_distinct_uids() {
        let setup = set_up();
        let mut threads = Vec::new();

        for session in 1..=4u64 {
            let store = setup.store.clone();
            threads.push(thread::spawn(move || {
                (0..16)
                    .map(|_| simple_append(&store, SessionId(session)))
                    .collect::<Vec<Uid>>()
            }));
        }

        let mut uids: Vec<Uid> = threads
            .into_iter()
            .flat_map(|t| t.join().unwrap())
            .collect();
        uids.sort_unstable();
        uids.dedup();
        assert_eq!(64, uids.len());
    }

    #[test]
    fn appends_are_visible_to_views_of_other_sessions() {
        let setup = set_up();
        simple_append(&setup.store, SessionId(1));

        let (viewer, _) = setup.store.select(SessionId(1)).unwrap();
        assert_eq!(1, viewer.exists_count());

        // Another session appends; this thread performed no operation of
        // its own, yet its view is already current when the append returns.
        let store = setup.store.clone();
        let appender = thread::spawn(move || {
            simple_append(&store, SessionId(2));
            simple_append(&store, SessionId(2));
        });
        appender.join().unwrap();

        assert_eq!(3, viewer.exists_count());
        assert!(viewer.is_size_changed());
        assert_eq!(Some(Seqnum::u(3)), viewer.seqnum(Uid::u(3)));
    }

    #[test]
    fn select_reports_the_mailbox_snapshot() {
        let setup = set_up();
        let uid1 = simple_append(&setup.store, SessionId(1));
        simple_append(&setup.store, SessionId(1));
        setup
            .store
            .set_flags(SessionId(1), uid1, &[Flag::Seen], &[Flag::Recent])
            .unwrap();

        let (view, response) = setup.store.select(SessionId(2)).unwrap();

        assert_eq!(2, response.exists);
        // Only the second message still carries \Recent in storage
        assert_eq!(1, response.recent);
        assert!(view.is_recent(Uid::u(2)));
        assert_eq!(Some(Seqnum::u(2)), response.unseen);
        assert_eq!(Uid::u(3), response.uidnext);
        assert_eq!(setup.store.uid_validity(), response.uidvalidity);
        assert!(response.flags.contains(&Flag::Seen));
        assert!(!response.flags.contains(&Flag::Recent));
    }

    #[test]
    fn flag_changes_fan_out_with_origin_semantics() {
        let setup = set_up();
        let uid = simple_append(&setup.store, SessionId(1));

        let (own, _) = setup.store.select(SessionId(1)).unwrap();
        let (other, _) = setup.store.select(SessionId(2)).unwrap();

        setup
            .store
            .set_flags(SessionId(1), uid, &[Flag::Seen], &[])
            .unwrap();

        // The mutator's own view suppresses the echo by default; the other
        // session's view always reports it
        assert!(own.flag_update_uids().is_empty());
        assert_eq!(vec![uid], other.flag_update_uids());
    }

    #[test]
    fn no_op_flag_change_publishes_nothing() {
        let setup = set_up();
        let uid = simple_append(&setup.store, SessionId(1));
        setup
            .store
            .set_flags(SessionId(1), uid, &[Flag::Seen], &[])
            .unwrap();

        let (other, _) = setup.store.select(SessionId(2)).unwrap();
        setup
            .store
            .set_flags(SessionId(1), uid, &[Flag::Seen], &[])
            .unwrap();

        assert!(other.flag_update_uids().is_empty());
    }

    #[test]
    fn set_flags_on_missing_message_is_an_error() {
        let setup = set_up();

        assert_matches!(
            Err(Error::NxMessage),
            setup.store.set_flags(
                SessionId(1),
                Uid::u(44),
                &[Flag::Seen],
                &[],
            )
        );
    }

    #[test]
    fn expunge_removes_marked_messages_everywhere() {
        let setup = set_up();
        let uid1 = simple_append(&setup.store, SessionId(1));
        let uid2 = simple_append(&setup.store, SessionId(1));
        let uid3 = simple_append(&setup.store, SessionId(1));

        let (own, _) = setup.store.select(SessionId(1)).unwrap();
        let (other, _) = setup.store.select(SessionId(2)).unwrap();

        setup
            .store
            .set_flags(SessionId(1), uid2, &[Flag::Deleted], &[])
            .unwrap();
        let expunged = setup.store.expunge(SessionId(1)).unwrap();
        assert_eq!(vec![uid2], expunged);

        // The issuing session renumbers as it reports each EXPUNGE
        assert_eq!(Some(Seqnum::u(2)), own.remove(uid2));
        assert_eq!(Some(Seqnum::u(2)), own.seqnum(uid3));

        // The other session hears about it through its pending set and
        // renumbers on its own schedule
        assert_eq!(vec![uid2], other.expunged_uids());
        assert_eq!(Some(Seqnum::u(2)), other.remove(uid2));

        // Storage no longer has the message
        let remaining = setup
            .mapper
            .find_in_range(setup.store.id(), UidRange::All)
            .unwrap();
        assert_eq!(
            vec![uid1, uid3],
            remaining.iter().map(|m| m.uid).collect::<Vec<_>>()
        );

        // Expunging again with nothing marked does nothing
        assert!(setup.store.expunge(SessionId(1)).unwrap().is_empty());

        // Storage knows the difference between "expunged" and "never
        // existed"
        assert_matches!(
            Err(Error::ExpungedMessage),
            setup.mapper.delete(setup.store.id(), uid2)
        );
        assert_matches!(
            Err(Error::NxMessage),
            setup.mapper.delete(setup.store.id(), Uid::u(99))
        );
    }

    #[test]
    fn delete_mailbox_notifies_other_sessions() {
        let setup = set_up();
        simple_append(&setup.store, SessionId(1));

        let (own, _) = setup.store.select(SessionId(1)).unwrap();
        let (other, _) = setup.store.select(SessionId(2)).unwrap();

        setup.store.delete_mailbox(SessionId(1)).unwrap();

        assert!(!own.is_deleted_by_other_session());
        assert!(other.is_deleted_by_other_session());
    }

    #[test]
    fn rename_keeps_views_and_store_in_step() {
        let setup = set_up();
        let (view, _) = setup.store.select(SessionId(1)).unwrap();
        let new_path =
            MailboxPath::personal("azure".to_owned(), "Archive".to_owned());

        setup.store.rename(SessionId(2), new_path.clone());

        assert_eq!(new_path, setup.store.path());
        assert_eq!(new_path, view.path());

        // Mutations published against the new path still reach the view
        simple_append(&setup.store, SessionId(2));
        assert_eq!(1, view.exists_count());
    }
}
