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

use std::convert::{TryFrom, TryInto};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::support::error::Error;

/// Uniquely identifies a message within a single mailbox.
///
/// UIDs start at 1 and increase monotonically as messages are added to the
/// mailbox. UIDs are never reused, even after the message is expunged. A UID
/// is only meaningful in combination with the UID validity of the mailbox
/// instance that issued it.
#[derive(
    Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(transparent)]
pub struct Uid(pub NonZeroU32);

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Uid({})", self.0.get())
    }
}

impl Uid {
    // Unsafe because new() isn't const for some reason
    pub const MIN: Self = unsafe { Uid(NonZeroU32::new_unchecked(1)) };
    pub const MAX: Self = unsafe { Uid(NonZeroU32::new_unchecked(u32::MAX)) };

    pub fn of(uid: u32) -> Option<Self> {
        NonZeroU32::new(uid).map(Uid)
    }

    pub fn next(self) -> Option<Self> {
        if Uid::MAX == self {
            None
        } else {
            Some(Uid(NonZeroU32::new(self.0.get() + 1).unwrap()))
        }
    }

    pub fn saturating_next(self) -> Self {
        self.next().unwrap_or(Uid::MAX)
    }

    #[cfg(test)]
    pub fn u(uid: u32) -> Self {
        Uid::of(uid).unwrap()
    }
}

impl TryFrom<u32> for Uid {
    type Error = ();

    fn try_from(v: u32) -> Result<Self, ()> {
        Self::of(v).ok_or(())
    }
}

impl From<Uid> for u32 {
    fn from(uid: Uid) -> u32 {
        uid.0.get()
    }
}

/// The 1-based sequence number of a message within one session's view of a
/// mailbox.
///
/// Unlike UIDs, sequence numbers are transient: expunging a message
/// decrements the sequence number of everything after it. Each session
/// maintains its own numbering, shifting it only at points the protocol
/// permits, which is why the mapping lives in the per-session view and not
/// in shared storage.
#[derive(
    Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(transparent)]
pub struct Seqnum(pub NonZeroU32);

impl Seqnum {
    // Unsafe because new() isn't const for some reason
    pub const MIN: Self = unsafe { Seqnum(NonZeroU32::new_unchecked(1)) };
    pub const MAX: Self =
        unsafe { Seqnum(NonZeroU32::new_unchecked(u32::MAX)) };

    pub fn of(seqnum: u32) -> Option<Self> {
        NonZeroU32::new(seqnum).map(Seqnum)
    }

    #[cfg(test)]
    pub fn u(seqnum: u32) -> Self {
        Seqnum::of(seqnum).unwrap()
    }

    pub fn to_index(self) -> usize {
        let u: Result<usize, _> = self.0.get().try_into();
        u.unwrap() - 1
    }

    pub fn from_index(ix: usize) -> Self {
        Seqnum::of((ix + 1).try_into().unwrap()).unwrap()
    }
}

impl TryFrom<u32> for Seqnum {
    type Error = ();

    fn try_from(v: u32) -> Result<Self, ()> {
        Self::of(v).ok_or(())
    }
}

impl From<Seqnum> for u32 {
    fn from(seqnum: Seqnum) -> u32 {
        seqnum.0.get()
    }
}

impl fmt::Debug for Seqnum {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Seqnum({})", self.0.get())
    }
}

/// Identifies one logged-in session.
///
/// Session ids exist so that event consumers can tell their own mutations
/// apart from everyone else's; they carry no other meaning. They are
/// assigned by the connection layer and never reused within a process.
#[derive(
    Deserialize,
    Serialize,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The storage-assigned identity of a mailbox.
///
/// Unlike the path, this never changes for the lifetime of the mailbox.
#[derive(
    Deserialize,
    Serialize,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
#[serde(transparent)]
pub struct MailboxId(pub u64);

/// The fully-qualified name of a mailbox: namespace, owning user, and the
/// name within that user's hierarchy.
///
/// Paths are what events and subscriptions are scoped by. A rename changes
/// the path but not the `MailboxId`, so everything holding a path must be
/// prepared to track `MailboxRenamed` events.
#[derive(
    Deserialize, Serialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct MailboxPath {
    pub namespace: String,
    pub user: Option<String>,
    pub name: String,
}

impl MailboxPath {
    pub fn new(
        namespace: String,
        user: Option<String>,
        name: String,
    ) -> Self {
        MailboxPath {
            namespace,
            user,
            name,
        }
    }

    /// The path of `user`'s mailbox `name` in the personal namespace.
    pub fn personal(user: String, name: String) -> Self {
        MailboxPath::new("#private".to_owned(), Some(user), name)
    }
}

impl fmt::Display for MailboxPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.namespace,
            self.user.as_deref().unwrap_or(""),
            self.name
        )
    }
}

/// A message flag.
///
/// System flags are represented as top-level enum cases, and keywords are
/// in `Keyword`.
///
/// `Recent` is a pseudo-flag: it can occur in stored metadata and in flag
/// deltas so that recency can propagate between sessions, but it is not an
/// applicable flag and is never reported as a plain flag change on its own.
#[derive(Clone, Deserialize, Serialize)]
pub enum Flag {
    Answered,
    Deleted,
    Draft,
    Flagged,
    Recent,
    Seen,
    Keyword(String),
}

impl Flag {
    /// The applicable-flag baseline every mailbox advertises before any
    /// keyword has been observed.
    pub fn system() -> impl Iterator<Item = Flag> {
        vec![
            Flag::Answered,
            Flag::Deleted,
            Flag::Draft,
            Flag::Flagged,
            Flag::Seen,
        ]
        .into_iter()
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            &Flag::Answered => write!(f, "\\Answered"),
            &Flag::Deleted => write!(f, "\\Deleted"),
            &Flag::Draft => write!(f, "\\Draft"),
            &Flag::Flagged => write!(f, "\\Flagged"),
            &Flag::Recent => write!(f, "\\Recent"),
            &Flag::Seen => write!(f, "\\Seen"),
            &Flag::Keyword(ref kw) => write!(f, "{}", kw),
        }
    }
}

impl fmt::Debug for Flag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        <Flag as fmt::Display>::fmt(self, f)
    }
}

impl FromStr for Flag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        if s.eq_ignore_ascii_case("\\answered") {
            Ok(Flag::Answered)
        } else if s.eq_ignore_ascii_case("\\deleted") {
            Ok(Flag::Deleted)
        } else if s.eq_ignore_ascii_case("\\draft") {
            Ok(Flag::Draft)
        } else if s.eq_ignore_ascii_case("\\flagged") {
            Ok(Flag::Flagged)
        } else if s.eq_ignore_ascii_case("\\recent") {
            Ok(Flag::Recent)
        } else if s.eq_ignore_ascii_case("\\seen") {
            Ok(Flag::Seen)
        } else if s.starts_with("\\") {
            Err(Error::NxFlag)
        } else if !s.is_empty()
            && s.as_bytes().iter().copied().all(is_atom_char)
        {
            Ok(Flag::Keyword(s.to_owned()))
        } else {
            Err(Error::UnsafeName)
        }
    }
}

fn is_atom_char(ch: u8) -> bool {
    match ch {
        0..=b' ' => false,
        127..=255 => false,
        b'(' | b')' | b'{' | b'*' | b'%' | b'\\' | b'"' | b']' => false,
        _ => true,
    }
}

impl PartialEq for Flag {
    fn eq(&self, other: &Flag) -> bool {
        match (self, other) {
            (&Flag::Answered, &Flag::Answered) => true,
            (&Flag::Deleted, &Flag::Deleted) => true,
            (&Flag::Draft, &Flag::Draft) => true,
            (&Flag::Flagged, &Flag::Flagged) => true,
            (&Flag::Recent, &Flag::Recent) => true,
            (&Flag::Seen, &Flag::Seen) => true,
            // Apparently the expectation is that keywords are
            // case-insensitive, despite RFC 3501 not requiring that. We only
            // do ASCII case-insensitivity to limit the insanity (there's no
            // way to get Unicode flags within RFC 3501 anyway).
            (&Flag::Keyword(ref a), &Flag::Keyword(ref b)) => {
                a.eq_ignore_ascii_case(b)
            }
            _ => false,
        }
    }
}

impl Eq for Flag {}

/// Information produced by bringing a mailbox into selected state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectResponse {
    /// The currently-defined flags. Used for both the `FLAGS` response and
    /// the `PERMANENTFLAGS` response-code. For the latter, `\*` must also be
    /// added.
    /// `* FLAGS (flags...)`
    /// `* OK [PERMANENTFLAGS (flags... \*)]`
    pub flags: Vec<Flag>,
    /// The number of messages that currently exist.
    /// `* exists EXISTS`
    pub exists: usize,
    /// The number of messages with the `\Recent` pseudo-flag.
    /// `* recent RECENT`
    pub recent: usize,
    /// The sequence number of the first message without the `\Seen` flag.
    /// `None` if all messages are seen. IMAP offers no way to indicate the
    /// latter state.
    /// `* OK [UNSEEN unseen]`
    pub unseen: Option<Seqnum>,
    /// The probable next UID.
    /// `* OK [UIDNEXT uidnext]`
    pub uidnext: Uid,
    /// The current UID validity.
    /// `* OK [UIDVALIDITY uidvalidity]`
    pub uidvalidity: u32,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn uid_ordering_and_next() {
        assert!(Uid::u(1) < Uid::u(2));
        assert_eq!(Some(Uid::u(2)), Uid::u(1).next());
        assert_eq!(None, Uid::MAX.next());
        assert_eq!(Uid::MAX, Uid::MAX.saturating_next());
        assert_eq!(None, Uid::of(0));
    }

    #[test]
    fn seqnum_index_conversions() {
        assert_eq!(0, Seqnum::u(1).to_index());
        assert_eq!(Seqnum::u(1), Seqnum::from_index(0));
        assert_eq!(41, Seqnum::u(42).to_index());
    }

    #[test]
    fn flag_string_round_trip() {
        assert_eq!("\\Seen", Flag::Seen.to_string());
        assert_eq!(Ok(Flag::Seen), "\\seen".parse().map_err(|_| ()));
        assert_eq!(
            Ok(Flag::Keyword("NotJunk".to_owned())),
            "NotJunk".parse().map_err(|_| ())
        );
        assert!("\\NotASystemFlag".parse::<Flag>().is_err());
        assert!("".parse::<Flag>().is_err());
    }

    #[test]
    fn mailbox_path_display() {
        assert_eq!(
            "#private:azure:INBOX",
            MailboxPath::personal("azure".to_owned(), "INBOX".to_owned())
                .to_string()
        );
    }
}
