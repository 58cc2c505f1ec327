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

//! Dovetail is the mailbox-consistency core of an IMAP server: the machinery
//! that keeps each session's view of a mailbox — sequence numbers, `\Recent`
//! bookkeeping, pending flag, expunge, and deletion notifications — correct
//! and current while other sessions concurrently mutate the same mailbox.
//!
//! It contains no network I/O, no command grammar, and no storage format.
//! Storage backends plug in through [`mailbox::MessageMapper`]; the protocol
//! layer performs mutations through [`mailbox::MessageStore`] and drains
//! unsolicited responses from [`mailbox::SelectedMailbox`] between commands.

#[cfg(test)]
macro_rules! assert_matches {
    ($expected:pat, $actual:expr) => {
        match $actual {
            $expected => (),
            unexpected => panic!(
                "Expected {} matches {}, got {:?}",
                stringify!($expected),
                stringify!($actual),
                unexpected
            ),
        }
    };
}

pub mod mailbox;
pub mod support;
