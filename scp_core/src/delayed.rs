// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Per-target store for responses a handler deferred instead of returning
//! immediately.
//!
//! A handler that cannot answer synchronously sets
//! `response.flags.is_delayed_response`; the dispatcher stores that event
//! here, keyed by `(target, cookie)`, instead of enqueueing it. The
//! original caller (or whoever ends up holding the cookie) later retrieves
//! it with [`DelayedResponseStore::get_delayed_response`] and posts it on
//! like any other event.

use std::collections::{HashMap, VecDeque};

use crate::event::Event;
use crate::id::Id;
use crate::status::Status;

#[derive(Default)]
pub(crate) struct DelayedResponseStore {
    entries: HashMap<Id, VecDeque<(u32, Event)>>,
}

impl DelayedResponseStore {
    pub(crate) fn insert(&mut self, target: Id, cookie: u32, event: Event) {
        self.entries.entry(target).or_default().push_back((cookie, event));
    }

    /// Removes and returns the stored event matching `(target, cookie)`.
    /// `Status::Param` if nothing is stored for that pair — either the
    /// caller got the cookie wrong, or retrieved it already.
    pub(crate) fn get_delayed_response(&mut self, target: Id, cookie: u32) -> Result<Event, Status> {
        let queue = self.entries.get_mut(&target).ok_or(Status::Param)?;
        let pos = queue.iter().position(|(c, _)| *c == cookie).ok_or(Status::Param)?;
        let (_, event) = queue.remove(pos).expect("position was just found");
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_deferred_response() {
        let mut store = DelayedResponseStore::default();
        let event = Event::new(Id::Module(1), Id::Module(0), Id::Event(1, 0));
        store.insert(Id::Module(0), 42, event);
        let got = store.get_delayed_response(Id::Module(0), 42).unwrap();
        assert_eq!(got.source_id, Id::Module(1));
    }

    #[test]
    fn unknown_cookie_is_param() {
        let mut store = DelayedResponseStore::default();
        assert_eq!(store.get_delayed_response(Id::Module(0), 1).err(), Some(Status::Param));
    }

    #[test]
    fn retrieval_is_one_shot() {
        let mut store = DelayedResponseStore::default();
        store.insert(Id::Module(0), 1, Event::new(Id::Module(1), Id::Module(0), Id::Event(1, 0)));
        store.get_delayed_response(Id::Module(0), 1).unwrap();
        assert_eq!(store.get_delayed_response(Id::Module(0), 1).err(), Some(Status::Param));
    }

    #[test]
    fn multiple_cookies_for_the_same_target_are_independent() {
        let mut store = DelayedResponseStore::default();
        store.insert(Id::Module(0), 1, Event::new(Id::Module(1), Id::Module(0), Id::Event(1, 0)));
        store.insert(Id::Module(0), 2, Event::new(Id::Module(2), Id::Module(0), Id::Event(1, 0)));
        assert_eq!(store.get_delayed_response(Id::Module(0), 2).unwrap().source_id, Id::Module(2));
        assert_eq!(store.get_delayed_response(Id::Module(0), 1).unwrap().source_id, Id::Module(1));
    }
}
