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

//! The per-session selected state of one mailbox, from `SELECT`/`EXAMINE`
//! until the session deselects it.
//!
//! A [`SelectedMailbox`] combines the sequence-number index with the
//! pending-notification analysis for one (session, mailbox) pair. It is
//! both a subscriber — it registers itself with the dispatcher and folds
//! every mutation of its mailbox into its own state — and the thing the
//! protocol layer reads when it drains unsolicited responses after a
//! command.
//!
//! Everything lives behind one private mutex, because event delivery
//! arrives on whichever session's thread performed the mutation,
//! concurrently with the owning session's reads. The event callback takes
//! only that one lock and never blocks on anything else, so delivery can
//! never entangle two sessions' locks.
//!
//! ## About the layout of this module
//!
//! This module is collectively a single abstraction, i.e., it should be
//! thought of as one large rust file. It is simply split apart because it's
//! unwieldy otherwise.

// Basic struct definitions
mod defs;
pub use defs::SelectedMailbox;

// IMAP concerns
mod idle; // IDLE
mod poll; // Unsolicited-response draining after commands; EXPUNGE support
mod recent; // \Recent bookkeeping
mod select; // Construction by SELECT/EXAMINE; deselection; event delivery

pub use idle::IdleWake;
