// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Event data model.

use crate::id::Id;
use crate::status::Status;

/// Inline payload size every module sees, in bytes.
pub const EVENT_PARAMS_SIZE: usize = 32;

/// Flags carried alongside an [`Event`]'s correlation data.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EventFlags {
    /// This event *is* a response to an earlier request.
    pub is_response: bool,
    /// The original request asked for a response to be generated.
    pub response_requested: bool,
    /// This event is a notification fan-out, not a point-to-point request.
    pub is_notification: bool,
    /// The handler deferred its response; it will arrive later via a
    /// separate `put_event` correlated by `cookie`.
    pub is_delayed_response: bool,
}

/// A message delivered to a target's `process_event`/`process_notification`,
/// optionally expecting a correlated response.
///
/// `params` is an inline fixed-size byte buffer rather than a heap-owned
/// payload — events are always slab-allocated (see [`crate::pool::Slab`]),
/// never boxed individually, so their size must be known at compile time.
#[derive(Clone, Copy, Debug)]
pub struct Event {
    pub source_id: Id,
    pub target_id: Id,
    pub id: Id,
    pub cookie: u32,
    pub flags: EventFlags,
    pub params: [u8; EVENT_PARAMS_SIZE],
}

impl Event {
    /// Builds a zero-payload event with no flags set and cookie `0`
    /// (assigned later by the dispatcher if a response is requested).
    pub fn new(source_id: Id, target_id: Id, id: Id) -> Self {
        Event {
            source_id,
            target_id,
            id,
            cookie: 0,
            flags: EventFlags::default(),
            params: [0; EVENT_PARAMS_SIZE],
        }
    }

    /// Marks this event as requesting a response. Invalid to combine with
    /// `is_response`; debug-asserted, not checked at runtime since this is
    /// a programming-time invariant on event construction, not caller
    /// input.
    pub fn request_response(mut self) -> Self {
        debug_assert!(!self.flags.is_response, "response_requested implies !is_response");
        self.flags.response_requested = true;
        self
    }

    /// Copies `data` into the inline params buffer, truncating silently if
    /// `data` is longer than [`EVENT_PARAMS_SIZE`] — callers that need more
    /// than the inline budget must split payloads across multiple events.
    pub fn with_params(mut self, data: &[u8]) -> Self {
        let n = data.len().min(EVENT_PARAMS_SIZE);
        self.params[..n].copy_from_slice(&data[..n]);
        self
    }

    /// Encodes `status` into the first params byte. Used by the notification
    /// broker's internal acknowledgement protocol, where `params` carries no
    /// other payload; point-to-point handlers are free to use `params[0]`
    /// for their own data and should not call this.
    pub fn set_status(&mut self, status: Status) {
        self.params[0] = status as u8;
    }

    /// Decodes a status previously written by [`Event::set_status`].
    pub fn status(&self) -> Option<Status> {
        Status::from_repr(self.params[0])
    }

    /// Builds the response counterpart to this event: target/source are
    /// swapped, `is_response` is set, the cookie is carried over, and the
    /// params buffer starts zeroed for the handler to fill in.
    pub fn response_template(&self) -> Event {
        Event {
            source_id: self.target_id,
            target_id: self.source_id,
            id: self.id,
            cookie: self.cookie,
            flags: EventFlags {
                is_response: true,
                ..EventFlags::default()
            },
            params: [0; EVENT_PARAMS_SIZE],
        }
    }
}
