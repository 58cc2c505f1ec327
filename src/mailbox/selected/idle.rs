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

//! Support for idling, i.e., blocking until a change is discovered or the
//! view goes away. This is used for the IDLE extension, but the
//! functionality here does not alone implement it.
//!
//! Event delivery signals the view's condvar, so a blocked waiter learns of
//! changes without polling storage. The wait is bounded by a timeout so the
//! protocol layer can interleave checks for the client's terminating line;
//! exact wake timing is not load-bearing, since the waiter drains whatever
//! is pending whenever it wakes:
//!
//! ```ignore
//! while idling {
//!     match view.idle_wait(poll_interval) {
//!         IdleWake::Event => send_pending_responses(&view),
//!         IdleWake::TimedOut => check_for_done_line()?,
//!         IdleWake::Closed => break,
//!     }
//! }
//! ```

use std::time::{Duration, Instant};

use super::defs::*;

/// Why an [`idle_wait`](SelectedMailbox::idle_wait) call returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdleWake {
    /// There is pending notification state to drain.
    Event,
    /// The timeout elapsed with nothing to report.
    TimedOut,
    /// The view was deselected while waiting.
    Closed,
}

impl SelectedMailbox {
    /// Block until this view has pending notification state, `timeout`
    /// elapses, or the view is deselected, whichever comes first.
    ///
    /// Returns immediately with [`IdleWake::Event`] if something is already
    /// pending. Connection teardown must deselect the view, which unblocks
    /// any waiter with [`IdleWake::Closed`] rather than leaving it parked
    /// on a dead registration.
    pub fn idle_wait(&self, timeout: Duration) -> IdleWake {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();

        loop {
            if state.closed {
                return IdleWake::Closed;
            }
            if state.analyser.has_pending() {
                return IdleWake::Event;
            }

            let now = Instant::now();
            if now >= deadline {
                return IdleWake::TimedOut;
            }

            let (reacquired, _) = self
                .shared
                .wakeup
                .wait_timeout(state, deadline - now)
                .unwrap();
            state = reacquired;
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::super::test_prelude::*;
    use super::*;

    #[test]
    fn wakes_when_already_pending() {
        let setup = set_up();
        let view = select_view(&setup, SessionId(1), &[1]);

        publish_added(&setup, SessionId(2), &[2]);
        assert_eq!(
            IdleWake::Event,
            view.idle_wait(Duration::from_secs(60))
        );
    }

    #[test]
    fn times_out_when_nothing_happens() {
        let setup = set_up();
        let view = select_view(&setup, SessionId(1), &[1]);

        assert_eq!(
            IdleWake::TimedOut,
            view.idle_wait(Duration::from_millis(50))
        );
    }

    #[test]
    fn wakes_on_event_from_another_thread() {
        let setup = set_up();
        let view = select_view(&setup, SessionId(1), &[1]);
        let dispatcher = Arc::clone(&setup.dispatcher);
        let path = view.path();

        let publisher = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            dispatcher.publish(Event {
                session_id: SessionId(2),
                path,
                kind: EventKind::Added {
                    uids: vec![Uid::u(2)],
                },
            });
        });

        assert_eq!(
            IdleWake::Event,
            view.idle_wait(Duration::from_secs(60))
        );
        assert_eq!(2, view.exists_count());
        publisher.join().unwrap();
    }

    #[test]
    fn deselect_unblocks_the_waiter() {
        let setup = set_up();
        let view = Arc::new(select_view(&setup, SessionId(1), &[1]));
        let view_clone = Arc::clone(&view);

        let closer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            view_clone.deselect();
        });

        assert_eq!(
            IdleWake::Closed,
            view.idle_wait(Duration::from_secs(60))
        );
        closer.join().unwrap();
    }
}
