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

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The UID was never allocated in this mailbox instance.
    #[error("Message does not exist")]
    NxMessage,
    /// The UID was allocated, but the message has since been expunged.
    #[error("Message has been expunged")]
    ExpungedMessage,
    /// The UID space of the mailbox is exhausted.
    #[error("Mailbox is full")]
    MailboxFull,
    /// The mailbox itself is gone, typically deleted by another session.
    #[error("Mailbox has been deleted")]
    MailboxDeleted,
    /// A system flag that does not exist.
    #[error("No such flag")]
    NxFlag,
    /// A keyword flag containing characters IMAP atoms may not.
    #[error("Unsafe keyword or mailbox name")]
    UnsafeName,
    #[error(transparent)]
    Io(#[from] io::Error),
}
