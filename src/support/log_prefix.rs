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

use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex};

/// Tracks text that should be included at the start of every log statement.
///
/// Clones of a `LogPrefix` share the same underlying data, so an update made
/// by the session layer (e.g. on login) is reflected in log statements made
/// by everything holding a clone.
#[derive(Clone)]
pub struct LogPrefix {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Clone)]
struct Inner {
    protocol: String,
    user: Option<String>,
    mailbox: Option<String>,
}

impl LogPrefix {
    pub fn new(protocol: String) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                protocol,
                user: None,
                mailbox: None,
            })),
        }
    }

    /// Produce a clone which does not share data with `self`.
    pub fn deep_clone(&self) -> Self {
        let inner = self.inner.lock().unwrap();
        Self {
            inner: Arc::new(Mutex::new(Inner::clone(&inner))),
        }
    }

    pub fn set_user(&self, user: String) {
        self.inner.lock().unwrap().user = Some(sanitise(user));
    }

    pub fn set_mailbox(&self, mailbox: String) {
        self.inner.lock().unwrap().mailbox = Some(sanitise(mailbox));
    }
}

impl fmt::Display for LogPrefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let inner = self.inner.lock().unwrap();
        write!(f, "{}", inner.protocol)?;
        if inner.user.is_some() || inner.mailbox.is_some() {
            write!(f, "[")?;
            let mut first = true;
            if let Some(ref user) = inner.user {
                write!(f, "{}", user)?;
                first = false;
            }

            if let Some(ref mailbox) = inner.mailbox {
                if !mem::take(&mut first) {
                    write!(f, ":")?;
                }
                write!(f, "{}", mailbox)?;
            }
            write!(f, "]")?;
        }

        Ok(())
    }
}

fn sanitise(mut s: String) -> String {
    s.retain(|c| !c.is_control());
    if let Some((truncate_len, _)) = s.char_indices().nth(64) {
        s.truncate(truncate_len);
    }

    s
}
