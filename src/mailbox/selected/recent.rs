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

use super::defs::*;
use crate::mailbox::model::Uid;

impl SelectedMailbox {
    /// Mark `uid` as `\Recent` in this view.
    ///
    /// Returns whether it was newly added.
    pub fn add_recent(&self, uid: Uid) -> bool {
        self.lock().recent_uids.insert(uid)
    }

    /// Remove `uid` from this view's `\Recent` set.
    ///
    /// Returns whether it was present; if it was, the removal is also
    /// recorded for [`is_recent_uid_removed`](Self::is_recent_uid_removed).
    pub fn remove_recent(&self, uid: Uid) -> bool {
        let mut state = self.lock();
        let removed = state.recent_uids.remove(&uid);
        if removed {
            state.recent_uid_removed = true;
        }
        removed
    }

    /// Return whether `uid` is currently `\Recent` in this view.
    pub fn is_recent(&self, uid: Uid) -> bool {
        let mut state = self.lock();
        purge_expunged_recents(&mut state);
        state.recent_uids.contains(&uid)
    }

    /// Return the current `\Recent` set, ascending.
    pub fn recent(&self) -> Vec<Uid> {
        let mut state = self.lock();
        purge_expunged_recents(&mut state);
        state.recent_uids.iter().copied().collect()
    }

    /// Return the size of the current `\Recent` set, i.e. the `RECENT`
    /// value.
    pub fn recent_count(&self) -> usize {
        let mut state = self.lock();
        purge_expunged_recents(&mut state);
        state.recent_uids.len()
    }

    /// Whether any UID has left the `\Recent` set since the last
    /// [`reset_recent_uid_removed`](Self::reset_recent_uid_removed).
    pub fn is_recent_uid_removed(&self) -> bool {
        self.lock().recent_uid_removed
    }

    pub fn reset_recent_uid_removed(&self) {
        self.lock().recent_uid_removed = false;
    }
}

/// Drop recent UIDs that have since been expunged.
///
/// This is deferred to the read accessors rather than done during event
/// delivery so that it keeps working however deliveries and reads
/// interleave; the expunged set it consults survives until the protocol
/// layer explicitly resets it after draining the expungements.
fn purge_expunged_recents(state: &mut State) {
    let State {
        ref analyser,
        ref mut recent_uids,
        ref mut recent_uid_removed,
        ..
    } = *state;

    if recent_uids.is_empty() {
        return;
    }

    for uid in analyser.expunged_uids() {
        if recent_uids.remove(&uid) {
            *recent_uid_removed = true;
        }
    }
}

#[cfg(test)]
mod test {
    use super::super::test_prelude::*;

    #[test]
    fn recent_set_basic_bookkeeping() {
        let setup = set_up();
        let view = select_view(&setup, SessionId(1), &[1, 2, 3]);

        assert!(view.add_recent(Uid::u(2)));
        assert!(!view.add_recent(Uid::u(2)));
        assert!(view.add_recent(Uid::u(3)));

        assert!(view.is_recent(Uid::u(2)));
        assert!(!view.is_recent(Uid::u(1)));
        assert_eq!(vec![Uid::u(2), Uid::u(3)], view.recent());
        assert_eq!(2, view.recent_count());

        assert!(!view.is_recent_uid_removed());
        assert!(view.remove_recent(Uid::u(2)));
        assert!(!view.remove_recent(Uid::u(2)));
        assert!(view.is_recent_uid_removed());
        assert_eq!(1, view.recent_count());

        view.reset_recent_uid_removed();
        assert!(!view.is_recent_uid_removed());
    }

    #[test]
    fn expunged_recents_are_lazily_purged() {
        let setup = set_up();
        let view = select_view(&setup, SessionId(1), &[1, 2, 3]);
        view.add_recent(Uid::u(2));

        publish_expunged(&setup, SessionId(2), &[2]);

        // The expunge event alone didn't touch the set; the next read does
        assert_eq!(vec![Uid::u(2)], {
            let state = view.lock();
            state.recent_uids.iter().copied().collect::<Vec<_>>()
        });
        assert_eq!(0, view.recent_count());
        assert!(!view.is_recent(Uid::u(2)));
        assert!(view.is_recent_uid_removed());
    }

    #[test]
    fn purge_happens_even_after_events_reset() {
        let setup = set_up();
        let view = select_view(&setup, SessionId(1), &[1, 2]);
        view.add_recent(Uid::u(1));

        publish_expunged(&setup, SessionId(2), &[1]);

        // The general reset does not clear the expunged set, so the lazy
        // purge still sees the expungement afterwards
        view.reset_events();
        assert_eq!(0, view.recent_count());
        assert!(view.is_recent_uid_removed());
    }
}
