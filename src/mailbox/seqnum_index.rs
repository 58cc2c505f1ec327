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

//! The sequence-number side of a session's mailbox view.
//!
//! Nothing here does I/O or locking; it's simply the pure mapping.

use super::model::{Seqnum, Uid};

/// A dense, bidirectional mapping between sequence numbers and UIDs for one
/// mailbox view.
///
/// Internally, this is just the ascending list of extant UIDs; the element
/// at index `i` holds sequence number `i + 1`. Sequence numbers are
/// therefore always the dense range `1..=len()` and increase strictly with
/// UID order, and expunging is a single removal which implicitly renumbers
/// every later message in the same step. Both directions of lookup are
/// binary searches.
///
/// Lookups of absent values return `None` rather than failing; asking about
/// a UID that has since been expunged is a perfectly normal occurrence when
/// several sessions race.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeqnumIndex {
    uids: Vec<Uid>,
}

impl SeqnumIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        SeqnumIndex::default()
    }

    /// Create an index over `uids`, assigning sequence numbers 1..=N in
    /// ascending UID order.
    ///
    /// Callers are expected to pass the snapshot already sorted; it is
    /// sorted (and deduplicated) here regardless, since a misordered
    /// snapshot would corrupt every lookup made through the view for the
    /// rest of the session.
    pub fn from_uids(uids: impl IntoIterator<Item = Uid>) -> Self {
        let mut uids: Vec<Uid> = uids.into_iter().collect();
        uids.sort_unstable();
        uids.dedup();
        SeqnumIndex { uids }
    }

    /// Bring `uid` into the mapping, assigning it the next sequence number.
    ///
    /// Has no effect if `uid` is already present.
    ///
    /// UIDs are allocated in ascending order, so in practice a new `uid` is
    /// greater than everything present and lands at the tail; existing
    /// sequence numbers are never reshuffled by an append.
    pub fn add(&mut self, uid: Uid) {
        if let Err(ix) = self.uids.binary_search(&uid) {
            self.uids.insert(ix, uid);
        }
    }

    /// Remove `uid` from the mapping, returning the sequence number it
    /// occupied.
    ///
    /// Every message after it is renumbered one down in the same step, so
    /// no caller can observe a gap in the numbering.
    ///
    /// Returns `None` (and changes nothing) if `uid` is not present, which
    /// makes expunging the same UID twice harmless.
    pub fn expunge(&mut self, uid: Uid) -> Option<Seqnum> {
        match self.uids.binary_search(&uid) {
            Ok(ix) => {
                self.uids.remove(ix);
                Some(Seqnum::from_index(ix))
            }
            Err(_) => None,
        }
    }

    /// Return the sequence number currently bound to `uid`.
    pub fn seqnum(&self, uid: Uid) -> Option<Seqnum> {
        self.uids.binary_search(&uid).ok().map(Seqnum::from_index)
    }

    /// Return the UID currently bound to `seqnum`.
    pub fn uid(&self, seqnum: Seqnum) -> Option<Uid> {
        self.uids.get(seqnum.to_index()).copied()
    }

    /// Return whether `uid` is currently in the mapping.
    pub fn contains(&self, uid: Uid) -> bool {
        self.uids.binary_search(&uid).is_ok()
    }

    /// Return the number of messages in the mapping, which is also the
    /// greatest assigned sequence number.
    pub fn len(&self) -> usize {
        self.uids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uids.is_empty()
    }

    /// Return the least UID in the mapping.
    pub fn first_uid(&self) -> Option<Uid> {
        self.uids.first().copied()
    }

    /// Return the greatest UID in the mapping.
    pub fn last_uid(&self) -> Option<Uid> {
        self.uids.last().copied()
    }

    /// Return an iterator over the extant UIDs, in sequence-number order.
    pub fn uids(&self) -> impl Iterator<Item = Uid> + '_ {
        self.uids.iter().copied()
    }

    /// Drop the whole mapping, releasing its storage.
    pub fn clear(&mut self) {
        self.uids = Vec::new();
    }
}
