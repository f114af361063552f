// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Mock [`Module`] implementations shared by this crate's own unit tests
//! and by the integration tests under `tests/`. Kept behind the
//! `test-util` feature so a downstream crate can pull them in to build its
//! own scenario tests without re-implementing the same handful of mocks.

use std::cell::RefCell;

use crate::bind::ApiRef;
use crate::core::Core;
use crate::event::Event;
use crate::id::Id;
use crate::module::{BindRound, Module};
use crate::status::Status;

/// Publishes a single API (itself, as an adder) under `Api(module, 0)` and
/// otherwise does nothing. Stands in for a module published via a bind
/// round, e.g. `A` in a bind-then-call scenario.
pub struct Publisher;

impl Publisher {
    pub fn add(&self, a: i32, b: i32) -> i32 {
        a + b
    }
}

static PUBLISHER_API: Publisher = Publisher;

impl Module for Publisher {
    fn name(&self) -> &'static str {
        "publisher"
    }

    fn process_bind_request(&mut self, _source: Id, _target: Id, api_id: Id, _core: &Core) -> Result<ApiRef, Status> {
        if api_id.api_index() == Some(0) {
            Ok(&PUBLISHER_API)
        } else {
            Err(Status::Support)
        }
    }
}

/// Binds to `Publisher` during its own `bind(First)` round and records
/// whatever it got back, so a test can assert the resolved API actually
/// works after `start`.
pub struct Binder {
    pub publisher: Id,
    pub bound_sum: RefCell<Option<i32>>,
}

impl Binder {
    pub fn new(publisher: Id) -> Self {
        Binder {
            publisher,
            bound_sum: RefCell::new(None),
        }
    }
}

impl Module for Binder {
    fn name(&self) -> &'static str {
        "binder"
    }

    fn bind(&mut self, id: Id, round: BindRound, core: &Core) -> Status {
        if round != BindRound::First {
            return Status::Success;
        }
        match core.module_bind(id, self.publisher, Id::Api(self.publisher.module_index_unchecked(), 0)) {
            Ok(api) => {
                let publisher: &Publisher = match crate::bind::downcast(api) {
                    Ok(p) => p,
                    Err(status) => return status,
                };
                *self.bound_sum.borrow_mut() = Some(publisher.add(2, 3));
                Status::Success
            }
            Err(status) => status,
        }
    }
}

/// Echoes every event's params back to its source. Useful anywhere a test
/// just needs a handler that answers synchronously.
pub struct Echo;

impl Module for Echo {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn process_event(&mut self, event: &Event, response: &mut Event, _core: &Core) -> Status {
        response.params = event.params;
        Status::Success
    }
}

/// Defers its response on the first event it receives per cookie,
/// recording the cookie so a test can later drive the deferred reply by
/// calling [`DelayedResponder::respond`] itself, or let the module post it
/// directly via `process_event`'s `core` handle.
pub struct DelayedResponder {
    pub last_cookie: RefCell<Option<u32>>,
}

impl DelayedResponder {
    pub fn new() -> Self {
        DelayedResponder {
            last_cookie: RefCell::new(None),
        }
    }
}

impl Default for DelayedResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for DelayedResponder {
    fn name(&self) -> &'static str {
        "delayed_responder"
    }

    fn process_event(&mut self, event: &Event, response: &mut Event, _core: &Core) -> Status {
        *self.last_cookie.borrow_mut() = Some(event.cookie);
        response.flags.is_delayed_response = true;
        Status::Pending
    }
}

/// Subscribes to a fixed `(notification_id, source_id)` pair during
/// `start` and records every delivery it receives, answering each with the
/// status supplied at construction.
pub struct Subscriber {
    pub notification_id: Id,
    pub source_id: Id,
    pub reply_status: Status,
    pub received: RefCell<Vec<Event>>,
}

impl Subscriber {
    pub fn new(notification_id: Id, source_id: Id, reply_status: Status) -> Self {
        Subscriber {
            notification_id,
            source_id,
            reply_status,
            received: RefCell::new(Vec::new()),
        }
    }
}

impl Module for Subscriber {
    fn name(&self) -> &'static str {
        "subscriber"
    }

    fn start(&mut self, id: Id, core: &Core) -> Status {
        core.notification_subscribe(self.notification_id, self.source_id, id)
    }

    fn process_notification(&mut self, event: &Event, response: &mut Event, _core: &Core) -> Status {
        self.received.borrow_mut().push(*event);
        response.set_status(self.reply_status);
        self.reply_status
    }
}

/// Does nothing; fills out a module slot in a scenario where a third
/// participant only needs to exist so the dispatcher has another target to
/// service.
pub struct Bystander;

impl Module for Bystander {
    fn name(&self) -> &'static str {
        "bystander"
    }

    fn process_event(&mut self, _event: &Event, _response: &mut Event, _core: &Core) -> Status {
        Status::Success
    }
}
