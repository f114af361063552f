// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Notification broker: subscriber lists and acknowledgement aggregation.
//!
//! Subscriptions are keyed by `(notification_id, source_id)`, with delivery
//! order matching subscription order. When the originating event requests
//! a response, [`crate::core::Core::notification_notify`] hands each
//! subscriber's acknowledgement a private cookie and registers a
//! [`PendingGroup`] here; [`NotificationBroker::try_intercept`] consumes
//! those acknowledgements as they come back (immediately or via a delayed
//! response posted later) and, once the last one arrives, hands back the
//! single consolidated response the original caller is waiting for. The
//! consolidated status is the first subscriber failure seen, or `Success`
//! if every subscriber succeeded.

use std::collections::HashMap;

use crate::event::Event;
use crate::id::Id;
use crate::status::Status;

struct PendingGroup {
    remaining: usize,
    first_failure: Option<Status>,
    respond_template: Event,
}

pub(crate) enum AckResult {
    /// `event` was not a tracked acknowledgement; enqueue it normally.
    NotAnAck,
    /// Recorded; the group is still waiting on other subscribers.
    Consumed,
    /// This was the last outstanding acknowledgement; enqueue the attached
    /// consolidated response.
    GroupComplete(Event),
}

#[derive(Default)]
pub(crate) struct NotificationBroker {
    subscribers: HashMap<(Id, Id), Vec<Id>>,
    groups: HashMap<u32, PendingGroup>,
    ack_cookie_to_group: HashMap<u32, u32>,
}

impl NotificationBroker {
    /// Idempotent in release builds; in debug builds a duplicate
    /// subscription is rejected with `Status::State` so the mistake is
    /// caught where it happened instead of silently double-delivering.
    pub(crate) fn subscribe(&mut self, notification_id: Id, source_id: Id, subscriber: Id) -> Status {
        let subs = self.subscribers.entry((notification_id, source_id)).or_default();
        if subs.contains(&subscriber) {
            if cfg!(debug_assertions) {
                return Status::State;
            }
            return Status::Success;
        }
        subs.push(subscriber);
        Status::Success
    }

    pub(crate) fn unsubscribe(&mut self, notification_id: Id, source_id: Id, subscriber: Id) -> Status {
        match self.subscribers.get_mut(&(notification_id, source_id)) {
            Some(subs) => match subs.iter().position(|s| *s == subscriber) {
                Some(pos) => {
                    subs.remove(pos);
                    Status::Success
                }
                None => Status::Param,
            },
            None => Status::Param,
        }
    }

    pub(crate) fn subscribers(&self, notification_id: Id, source_id: Id) -> Vec<Id> {
        self.subscribers.get(&(notification_id, source_id)).cloned().unwrap_or_default()
    }

    pub(crate) fn register_group(&mut self, group_key: u32, remaining: usize, respond_template: Event) {
        self.groups.insert(
            group_key,
            PendingGroup {
                remaining,
                first_failure: None,
                respond_template,
            },
        );
    }

    pub(crate) fn register_ack_cookie(&mut self, ack_cookie: u32, group_key: u32) {
        self.ack_cookie_to_group.insert(ack_cookie, group_key);
    }

    pub(crate) fn try_intercept(&mut self, event: &Event) -> AckResult {
        let Some(group_key) = self.ack_cookie_to_group.remove(&event.cookie) else {
            return AckResult::NotAnAck;
        };
        let status = event.status().unwrap_or(Status::Device);
        let Some(group) = self.groups.get_mut(&group_key) else {
            return AckResult::Consumed;
        };
        if group.first_failure.is_none() && status.is_error() {
            group.first_failure = Some(status);
        }
        group.remaining -= 1;
        if group.remaining > 0 {
            return AckResult::Consumed;
        }
        let group = self.groups.remove(&group_key).expect("group looked up above");
        let mut response = group.respond_template;
        response.set_status(group.first_failure.unwrap_or(Status::Success));
        AckResult::GroupComplete(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_order_matches_subscription_order() {
        let mut broker = NotificationBroker::default();
        broker.subscribe(Id::Notification(0, 0), Id::Module(0), Id::Module(2));
        broker.subscribe(Id::Notification(0, 0), Id::Module(0), Id::Module(1));
        assert_eq!(broker.subscribers(Id::Notification(0, 0), Id::Module(0)), vec![Id::Module(2), Id::Module(1)]);
    }

    #[test]
    fn unsubscribe_of_unknown_subscriber_is_param() {
        let mut broker = NotificationBroker::default();
        assert_eq!(broker.unsubscribe(Id::Notification(0, 0), Id::Module(0), Id::Module(1)), Status::Param);
    }

    #[test]
    fn group_completes_on_last_ack_and_reports_first_failure() {
        let mut broker = NotificationBroker::default();
        let template = Event::new(Id::Module(9), Id::Module(0), Id::Notification(9, 0));
        broker.register_group(100, 2, template);
        broker.register_ack_cookie(1, 100);
        broker.register_ack_cookie(2, 100);

        let mut ack_ok = Event::new(Id::Module(1), Id::Module(9), Id::Notification(9, 0));
        ack_ok.cookie = 1;
        ack_ok.flags.is_response = true;
        ack_ok.set_status(Status::Success);
        assert!(matches!(broker.try_intercept(&ack_ok), AckResult::Consumed));

        let mut ack_fail = Event::new(Id::Module(2), Id::Module(9), Id::Notification(9, 0));
        ack_fail.cookie = 2;
        ack_fail.flags.is_response = true;
        ack_fail.set_status(Status::Device);
        match broker.try_intercept(&ack_fail) {
            AckResult::GroupComplete(response) => {
                assert_eq!(response.status(), Some(Status::Device));
            }
            _ => panic!("expected group to complete"),
        }
    }

    #[test]
    fn unrelated_cookie_is_not_an_ack() {
        let mut broker = NotificationBroker::default();
        let mut event = Event::new(Id::Module(1), Id::Module(0), Id::Event(0, 0));
        event.cookie = 999;
        assert!(matches!(broker.try_intercept(&event), AckResult::NotAnAck));
    }
}
