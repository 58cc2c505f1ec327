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

//! Everything to do with keeping sessions' views of mailboxes consistent.
//!
//! There is no shared, authoritative index of a mailbox anywhere in the
//! system. Instead, each session that has a mailbox selected holds its own
//! [`SelectedMailbox`]: a private sequence-number index plus the
//! accumulated not-yet-reported changes for that session's client. IMAP
//! forces this shape — sequence numbers shift at points dictated by each
//! session's own command stream, so no two sessions agree on the numbering
//! at any given wall-clock instant, and a shared index would be wrong for
//! everyone.
//!
//! Consistency between the views comes from the [`EventDispatcher`].
//! Every mutation goes through a [`MessageStore`]: storage first (with UID
//! allocation delegated to the mapper's atomic
//! [`consume_next_uid`](MessageMapper::consume_next_uid) reservation), then
//! an [`Event`] published for the mailbox's path. Delivery is synchronous
//! on the mutating thread, so by the time the mutating call returns, every
//! view — the mutator's own included — has folded the change into its
//! index and pending sets, each under its own lock.
//!
//! The protocol layer completes the cycle: between commands it drains the
//! pending sets off its session's view, emits the unsolicited responses,
//! and calls the matching reset methods.
//!
//! What is deliberately *not* here: message content, command grammar,
//! search, and storage formats. Storage is reached only through the
//! [`MessageMapper`] contract.

mod event;
mod event_analyser;
mod event_bus;
mod message_store;
mod model;
mod selected;
mod seqnum_index;
mod storage;

pub use event::{Event, EventKind, FlagsUpdated};
pub use event_analyser::EventAnalyser;
pub use event_bus::{EventDispatcher, MailboxListener, SubscriptionHandle};
pub use message_store::MessageStore;
pub use model::{
    Flag, MailboxId, MailboxPath, SelectResponse, Seqnum, SessionId, Uid,
};
pub use selected::{IdleWake, SelectedMailbox};
pub use seqnum_index::SeqnumIndex;
pub use storage::{
    MailboxMetadata, MessageMapper, MessageMetadata, UidRange,
    UidReservation,
};
