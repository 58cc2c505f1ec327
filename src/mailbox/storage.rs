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

//! The contract between this engine and whatever stores the messages.
//!
//! Dovetail owns no message data. Backends — in-memory, file-based,
//! relational, whatever — implement [`MessageMapper`] and are handed to
//! [`MessageStore`](super::MessageStore). Failures from a mapper propagate
//! to the caller as-is; if a backend wants retry behaviour, it implements
//! that itself, below this interface.

use chrono::prelude::*;
use serde::{Deserialize, Serialize};

use super::model::{Flag, MailboxId, MailboxPath, Uid};
use crate::support::error::Error;

/// The stored identity of one mailbox.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxMetadata {
    pub id: MailboxId,
    /// The path at the time the metadata was loaded. Renames produce a new
    /// path but the same `id`.
    pub path: MailboxPath,
    /// Assigned when the mailbox is created and never changed afterwards.
    /// If the mailbox is deleted and recreated, the recreation gets a
    /// distinct value, which is how clients discover that their cached UIDs
    /// are garbage.
    pub uid_validity: u32,
}

/// The stored metadata of one message.
///
/// The message text itself never passes through this engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub uid: Uid,
    pub flags: Vec<Flag>,
    pub internal_date: DateTime<Utc>,
}

impl MessageMetadata {
    pub fn is_set(&self, flag: &Flag) -> bool {
        self.flags.contains(flag)
    }
}

/// A contiguous range of UIDs to operate on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UidRange {
    All,
    Single(Uid),
    /// Inclusive on both ends.
    Range(Uid, Uid),
    /// `uid` and everything after it.
    From(Uid),
}

impl UidRange {
    pub fn contains(self, uid: Uid) -> bool {
        match self {
            UidRange::All => true,
            UidRange::Single(single) => single == uid,
            UidRange::Range(start, end) => start <= uid && uid <= end,
            UidRange::From(start) => start <= uid,
        }
    }
}

/// The result of reserving a UID through
/// [`MessageMapper::consume_next_uid`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UidReservation {
    /// The UID reserved for the caller. It will never be issued again, even
    /// if the caller fails before using it.
    pub uid: Uid,
    /// The mailbox's greatest-ever UID after this reservation.
    pub last_uid: Uid,
}

/// Storage access as consumed by this engine.
///
/// Implementations are shared across sessions and must be safe to call
/// concurrently.
pub trait MessageMapper: Send + Sync {
    /// Persist `message`, creating it or overwriting the stored metadata
    /// for its UID.
    fn save(
        &self,
        mailbox: MailboxId,
        message: &MessageMetadata,
    ) -> Result<(), Error>;

    /// Permanently remove the message with the given UID.
    fn delete(&self, mailbox: MailboxId, uid: Uid) -> Result<(), Error>;

    /// Return the messages within `range`, ascending by UID.
    ///
    /// UIDs within the range that don't exist (never allocated, or since
    /// expunged) are simply absent from the result.
    fn find_in_range(
        &self,
        mailbox: MailboxId,
        range: UidRange,
    ) -> Result<Vec<MessageMetadata>, Error>;

    /// Return the messages currently flagged `\Deleted`, ascending by UID.
    fn find_marked_for_deletion(
        &self,
        mailbox: MailboxId,
    ) -> Result<Vec<MessageMetadata>, Error>;

    /// Atomically advance the mailbox's UID counter and return the
    /// reservation.
    ///
    /// This is the only way the counter moves. Two callers racing on the
    /// same mailbox must receive distinct UIDs, in the order the underlying
    /// storage serialised them; the engine's `Added` event sequencing rests
    /// entirely on that guarantee.
    fn consume_next_uid(
        &self,
        mailbox: MailboxId,
    ) -> Result<UidReservation, Error>;
}
