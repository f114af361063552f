// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use std::cell::RefCell;

use scp_core::{Core, CoreConfig, Event, Id, Module, ModuleSpec, Status};

struct Subscriber {
    n_id: Id,
    src: Id,
    reply: Status,
    received: &'static RefCell<Vec<Id>>,
}

impl Module for Subscriber {
    fn name(&self) -> &'static str {
        "subscriber"
    }
    fn start(&mut self, id: Id, core: &Core) -> Status {
        core.notification_subscribe(self.n_id, self.src, id)
    }
    fn process_notification(&mut self, event: &Event, response: &mut Event, _core: &Core) -> Status {
        self.received.borrow_mut().push(event.target_id);
        response.set_status(self.reply);
        self.reply
    }
}

/// Subscriptions happen during `start`, which runs for every module before
/// the test drives any events, so triggering the broadcast from outside
/// (a plain `process_event`) rather than from this module's own `start`
/// guarantees every subscriber is already registered.
struct Originator {
    n_id: Id,
    sent_count: &'static RefCell<Option<usize>>,
}
impl Module for Originator {
    fn name(&self) -> &'static str {
        "originator"
    }
    fn process_event(&mut self, event: &Event, _response: &mut Event, core: &Core) -> Status {
        let mut notify_event = Event::new(event.target_id, event.target_id, self.n_id);
        let (status, sent_count) = core.notification_notify(&mut notify_event);
        *self.sent_count.borrow_mut() = Some(sent_count);
        status
    }
}

/// Property 6: N subscribe calls for the same (n_id, src) yield N delivered
/// notifications, one per subscriber, each flagged `is_notification`.
#[test]
fn fan_out_delivers_once_per_subscriber() {
    let x_received = Box::leak(Box::new(RefCell::new(Vec::new())));
    let y_received = Box::leak(Box::new(RefCell::new(Vec::new())));
    let sent_count = Box::leak(Box::new(RefCell::new(None)));

    let n_id = Id::Notification(0, 1);
    let core = Core::new(
        vec![
            ModuleSpec::simple(Box::new(Originator { n_id, sent_count })),
            ModuleSpec::simple(Box::new(Subscriber {
                n_id,
                src: Id::Module(0),
                reply: Status::Success,
                received: x_received,
            })),
            ModuleSpec::simple(Box::new(Subscriber {
                n_id,
                src: Id::Module(0),
                reply: Status::Success,
                received: y_received,
            })),
        ],
        CoreConfig::default(),
    )
    .unwrap();

    let mut trigger = Event::new(Id::Module(0), Id::Module(0), Id::Event(0, 0));
    assert_eq!(core.put_event(&mut trigger), Status::Success);
    core.run_until_idle();

    assert_eq!(*sent_count.borrow(), Some(2));
    assert_eq!(&x_received.borrow()[..], &[Id::Module(1)]);
    assert_eq!(&y_received.borrow()[..], &[Id::Module(2)]);
}

struct AckingOriginator {
    n_id: Id,
    response_status: &'static RefCell<Option<Status>>,
}
impl Module for AckingOriginator {
    fn name(&self) -> &'static str {
        "acking_originator"
    }
    fn process_event(&mut self, event: &Event, _response: &mut Event, core: &Core) -> Status {
        if event.flags.is_response {
            *self.response_status.borrow_mut() = event.status();
            return Status::Success;
        }
        let mut notify_event = Event::new(event.target_id, event.target_id, self.n_id).request_response();
        core.notification_notify(&mut notify_event);
        Status::Success
    }
}

/// Property 7: a `notify` issued with `response_requested` yields exactly
/// one response to the originator, whose status is the first subscriber
/// failure observed (or `Success` if every subscriber succeeded).
#[test]
fn ack_aggregation_reports_first_failure() {
    let response_status = Box::leak(Box::new(RefCell::new(None)));
    let n_id = Id::Notification(0, 1);
    let core = Core::new(
        vec![
            ModuleSpec::simple(Box::new(AckingOriginator { n_id, response_status })),
            ModuleSpec::simple(Box::new(Subscriber {
                n_id,
                src: Id::Module(0),
                reply: Status::Success,
                received: Box::leak(Box::new(RefCell::new(Vec::new()))),
            })),
            ModuleSpec::simple(Box::new(Subscriber {
                n_id,
                src: Id::Module(0),
                reply: Status::Device,
                received: Box::leak(Box::new(RefCell::new(Vec::new()))),
            })),
        ],
        CoreConfig::default(),
    )
    .unwrap();

    let mut trigger = Event::new(Id::Module(0), Id::Module(0), Id::Event(0, 0));
    assert_eq!(core.put_event(&mut trigger), Status::Success);
    core.run_until_idle();

    assert_eq!(*response_status.borrow(), Some(Status::Device));
}

/// Two originators each issue a fresh, cookie-less, response-requested
/// `notify` before either's acknowledgement is processed. If the
/// aggregation group key were `event.cookie` taken verbatim (always `0` for
/// a freshly built event), both calls would register under the same key
/// and the second registration would clobber the first's `PendingGroup` —
/// one originator's acknowledgement would land on the other's template, and
/// the other's own acknowledgement would find nothing left to complete.
/// With a cookie allocated per call, each group is independent and both
/// originators get exactly one response.
#[test]
fn concurrent_cookie_less_notifies_do_not_collide_on_group_zero() {
    struct AckSubscriber;
    impl Module for AckSubscriber {
        fn name(&self) -> &'static str {
            "ack_subscriber"
        }
        fn start(&mut self, id: Id, core: &Core) -> Status {
            core.notification_subscribe(Id::Notification(0, 1), Id::Module(0), id);
            core.notification_subscribe(Id::Notification(1, 1), Id::Module(1), id);
            Status::Success
        }
        fn process_notification(&mut self, _event: &Event, response: &mut Event, _core: &Core) -> Status {
            response.set_status(Status::Success);
            Status::Success
        }
    }

    struct Originator {
        n_id: Id,
        response_status: &'static RefCell<Option<Status>>,
    }
    impl Module for Originator {
        fn name(&self) -> &'static str {
            "originator"
        }
        fn process_event(&mut self, event: &Event, _response: &mut Event, core: &Core) -> Status {
            if event.flags.is_response {
                *self.response_status.borrow_mut() = event.status();
                return Status::Success;
            }
            let mut notify_event = Event::new(event.target_id, event.target_id, self.n_id).request_response();
            core.notification_notify(&mut notify_event);
            Status::Success
        }
    }

    let one_status = Box::leak(Box::new(RefCell::new(None)));
    let two_status = Box::leak(Box::new(RefCell::new(None)));

    let core = Core::new(
        vec![
            ModuleSpec::simple(Box::new(Originator {
                n_id: Id::Notification(0, 1),
                response_status: one_status,
            })),
            ModuleSpec::simple(Box::new(Originator {
                n_id: Id::Notification(1, 1),
                response_status: two_status,
            })),
            ModuleSpec::simple(Box::new(AckSubscriber)),
        ],
        CoreConfig::default(),
    )
    .unwrap();

    let mut trigger_one = Event::new(Id::Module(0), Id::Module(0), Id::Event(0, 0));
    let mut trigger_two = Event::new(Id::Module(1), Id::Module(1), Id::Event(1, 0));
    assert_eq!(core.put_event(&mut trigger_one), Status::Success);
    assert_eq!(core.put_event(&mut trigger_two), Status::Success);
    core.run_until_idle();

    assert_eq!(*one_status.borrow(), Some(Status::Success), "originator one must receive its own response");
    assert_eq!(*two_status.borrow(), Some(Status::Success), "originator two must receive its own response");
}

#[test]
fn notify_with_no_subscribers_reports_zero_sent() {
    struct Lonely(&'static RefCell<Option<usize>>);
    impl Module for Lonely {
        fn name(&self) -> &'static str {
            "lonely"
        }
        fn process_event(&mut self, event: &Event, _response: &mut Event, core: &Core) -> Status {
            let mut notify_event = Event::new(event.target_id, event.target_id, Id::Notification(0, 2));
            let (status, sent_count) = core.notification_notify(&mut notify_event);
            *self.0.borrow_mut() = Some(sent_count);
            status
        }
    }
    let sent_count = Box::leak(Box::new(RefCell::new(None)));
    let core = Core::new(vec![ModuleSpec::simple(Box::new(Lonely(sent_count)))], CoreConfig::default()).unwrap();
    let mut trigger = Event::new(Id::Module(0), Id::Module(0), Id::Event(0, 0));
    core.put_event(&mut trigger);
    core.run_until_idle();
    assert_eq!(*sent_count.borrow(), Some(0));
}
