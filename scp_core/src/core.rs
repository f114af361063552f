// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! The public entry point: [`Core`] wires a [`Registry`] together with the
//! dispatcher, delayed-response store and notification broker behind a
//! single cheap-clone handle.
//!
//! `Core` is `Rc`-backed, not `Arc`-backed: the event loop this crate
//! implements runs on one thread, so there is nothing to synchronize
//! between clones of the handle, only between the handle and itself across
//! nested calls. `RefCell` gives that nesting a runtime check instead of a
//! compile-time one, which is the right tradeoff here — the one kind of
//! reentrancy the core must allow (a module calling back into `Core` from
//! its own callback) is handled explicitly by [`Registry::take`]/
//! [`Registry::restore`], and any other attempt to double-borrow is a bug
//! the `RefCell` will catch immediately instead of letting it corrupt
//! state.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crossbeam_queue::SegQueue;
use serde::Deserialize;

use crate::bind::{self, ApiRef};
use crate::delayed::DelayedResponseStore;
use crate::dispatch::Dispatcher;
use crate::event::Event;
use crate::id::Id;
use crate::lifecycle::{self, LifecycleError};
use crate::module::{Module, ModuleSpec, Registry};
use crate::notify::NotificationBroker;
use crate::status::Status;

/// Boot-time tuning for a [`Core`] instance.
///
/// Deserializable with `serde` so a host binary can load it from whatever
/// configuration format it already uses; every field has a default so a
/// partial or empty document still produces a usable config.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Capacity of the event free pool. Every in-flight event, point-to-
    /// point or notification fan-out, occupies one slot until its handler
    /// returns.
    pub event_pool_capacity: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            event_pool_capacity: 64,
        }
    }
}

/// The part of a `Core` guarded by a single `RefCell`: everything that
/// changes while the loop runs.
struct Inner {
    registry: Registry,
    dispatcher: Dispatcher,
    delayed: DelayedResponseStore,
    notify: NotificationBroker,
    /// Ids currently on the callback stack, innermost last. Used only to
    /// reject a `put_event_and_wait` that would deadlock against a target
    /// already mid-dispatch.
    active: Vec<Id>,
}

/// Configuration payloads, immutable once `Core::new` returns. Kept outside
/// `Inner` so reading a module's config never contends with the `RefCell`
/// a callback's `take`/`restore` dance uses.
struct Configs {
    module: Vec<Box<dyn Any>>,
    element: Vec<Vec<Box<dyn Any>>>,
}

struct CoreData {
    state: RefCell<Inner>,
    configs: Configs,
}

/// Cheap-clone handle to a running system. Every [`Module`] callback
/// receives one; a host binary holds the handle it got from [`Core::new`]
/// and drives the loop with [`Core::run_until_idle`] or
/// [`Core::dispatch_one`].
#[derive(Clone)]
pub struct Core(Rc<CoreData>);

impl Core {
    /// Builds a `Core` from its module specs and boots it: runs `init`,
    /// `element_init`, `post_init`, both bind rounds and `start` across
    /// every module exactly once, in that order, halting on the first
    /// non-`Success` result.
    pub fn new(specs: Vec<ModuleSpec>, config: CoreConfig) -> Result<Core, LifecycleError> {
        let mut modules = Vec::with_capacity(specs.len());
        let mut module_configs = Vec::with_capacity(specs.len());
        let mut element_configs = Vec::with_capacity(specs.len());
        for spec in specs {
            modules.push((spec.module, spec.element_count));
            module_configs.push(spec.config);
            element_configs.push(spec.element_configs);
        }
        let registry = Registry::new(modules).map_err(|status| LifecycleError {
            module: Id::None,
            phase: "registration",
            status,
        })?;
        let core = Core(Rc::new(CoreData {
            state: RefCell::new(Inner {
                registry,
                dispatcher: Dispatcher::new(config.event_pool_capacity),
                delayed: DelayedResponseStore::default(),
                notify: NotificationBroker::default(),
                active: Vec::new(),
            }),
            configs: Configs {
                module: module_configs,
                element: element_configs,
            },
        }));
        lifecycle::run(&core)?;
        Ok(core)
    }

    /// A `Send + Sync` handle a real interrupt handler can hold onto
    /// without touching the (intentionally not `Send`) `Core` itself.
    pub fn isr_ingress(&self) -> IsrIngress {
        IsrIngress(self.0.state.borrow().dispatcher.isr_handle())
    }

    pub(crate) fn module_config(&self, id: Id) -> Result<&dyn Any, Status> {
        let idx = id.module_index().ok_or(Status::Param)? as usize;
        self.0.configs.module.get(idx).map(|c| c.as_ref()).ok_or(Status::Param)
    }

    pub(crate) fn element_config(&self, id: Id, element: u16) -> Result<&dyn Any, Status> {
        let idx = id.module_index().ok_or(Status::Param)? as usize;
        self.0
            .configs
            .element
            .get(idx)
            .and_then(|v| v.get(element as usize))
            .map(|c| c.as_ref())
            .ok_or(Status::Param)
    }

    pub(crate) fn registry_ids(&self) -> Vec<Id> {
        self.0.state.borrow().registry.module_ids()
    }

    pub(crate) fn registry_element_ids(&self, module: Id) -> Result<Vec<Id>, Status> {
        self.0.state.borrow().registry.element_ids(module)
    }

    /// Advances `id`'s (module or element) `LifecycleState` as the boot
    /// sequence completes each phase for it.
    pub(crate) fn set_lifecycle_state(&self, id: Id, state: crate::module::LifecycleState) -> Result<(), Status> {
        self.0.state.borrow_mut().registry.set_state(id, state)
    }

    #[cfg(test)]
    pub(crate) fn lifecycle_state(&self, id: Id) -> crate::module::LifecycleState {
        match id {
            Id::Element(module, element) => self.0.state.borrow().registry.context(Id::Module(module)).unwrap().elements[element as usize].state,
            _ => self.0.state.borrow().registry.context(id).unwrap().state,
        }
    }

    /// Removes the module at `id`, invokes `f` with it and a handle that
    /// may be used to call back into the core, then restores it. This is
    /// the one place a module's `&mut self` and the core's own state are
    /// both reachable at once, made safe by the fact that the module's own
    /// slot holds a [`crate::module::Tombstone`] for the call's duration.
    pub(crate) fn invoke_module<R>(&self, id: Id, f: impl FnOnce(&mut dyn Module, &Core) -> R) -> Result<R, Status> {
        let mut module = self.0.state.borrow_mut().registry.take(id)?;
        self.0.state.borrow_mut().active.push(id);
        let result = f(module.as_mut(), self);
        let mut state = self.0.state.borrow_mut();
        state.active.pop();
        state.registry.restore(id, module)?;
        // `id` was excluded from the ready queue for as long as it was on
        // the active stack (see `enqueue_or_intercept`); anything posted to
        // it in the meantime is still sitting in its per-target queue.
        state.dispatcher.requeue_if_pending(id);
        Ok(result)
    }

    /// Resolves an API published by `target` (see [`crate::bind::module_bind`]).
    pub fn module_bind(&self, source: Id, target: Id, api_id: Id) -> Result<ApiRef, Status> {
        bind::module_bind(self, source, target, api_id)
    }

    /// Posts `event`. If `event.flags.response_requested` is set and no
    /// cookie has been assigned yet, allocates one and writes it back.
    pub fn put_event(&self, event: &mut Event) -> Status {
        if event.flags.response_requested && event.flags.is_response {
            return Status::Param;
        }
        if event.flags.response_requested && event.cookie == 0 {
            event.cookie = self.0.state.borrow_mut().dispatcher.next_cookie();
        }
        self.enqueue_or_intercept(*event)
    }

    /// Posts `request` (forcing `response_requested`) and services other
    /// ready events on a nested nested dispatch loop until the correlated
    /// response arrives. Returns `Status::Access` if `request.target_id` is
    /// already on the active callback stack, since waiting on it would
    /// deadlock: that target cannot make progress until the call currently
    /// holding it returns.
    pub fn put_event_and_wait(&self, mut request: Event) -> Result<Event, Status> {
        if request.flags.is_response {
            return Err(Status::Param);
        }
        request.flags.response_requested = true;
        if self.0.state.borrow().active.contains(&request.target_id) {
            return Err(Status::Access);
        }
        let waiter = request.source_id;
        let status = self.put_event(&mut request);
        if status.is_error() {
            return Err(status);
        }
        let cookie = request.cookie;
        loop {
            if let Some(response) = self.0.state.borrow_mut().dispatcher.extract_response(waiter, cookie) {
                return Ok(response);
            }
            if !self.dispatch_one() {
                return Err(Status::Busy);
            }
        }
    }

    /// Retrieves a response a handler previously deferred via
    /// `response.flags.is_delayed_response`, correlated by `cookie`.
    pub fn get_delayed_response(&self, target: Id, cookie: u32) -> Result<Event, Status> {
        self.0.state.borrow_mut().delayed.get_delayed_response(target, cookie)
    }

    pub fn notification_subscribe(&self, notification_id: Id, source_id: Id, subscriber: Id) -> Status {
        self.0.state.borrow_mut().notify.subscribe(notification_id, source_id, subscriber)
    }

    pub fn notification_unsubscribe(&self, notification_id: Id, source_id: Id, subscriber: Id) -> Status {
        self.0
            .state
            .borrow_mut()
            .notify
            .unsubscribe(notification_id, source_id, subscriber)
    }

    /// Fans `event` out to every subscriber of `(event.id, event.source_id)`.
    /// Returns the number of subscribers notified. If `event.flags.
    /// response_requested` is set and no cookie has been assigned yet,
    /// allocates one (same rule as [`Core::put_event`]) and uses it as the
    /// aggregation group's key, so two concurrent aggregating calls never
    /// collide on `0`; the caller's in-flight transaction is then suspended
    /// (via the notification broker) until every subscriber has
    /// acknowledged; the consolidated status is whichever subscriber failed
    /// first, or `Success` if none did.
    pub fn notification_notify(&self, event: &mut Event) -> (Status, usize) {
        let subscribers = self.0.state.borrow().notify.subscribers(event.id, event.source_id);
        let sent_count = subscribers.len();
        if !event.flags.response_requested {
            for subscriber in &subscribers {
                let mut sub_event = Event::new(event.source_id, *subscriber, event.id);
                sub_event.params = event.params;
                sub_event.flags.is_notification = true;
                self.enqueue_or_intercept(sub_event);
            }
            return (Status::Success, sent_count);
        }

        if subscribers.is_empty() {
            let mut response = event.response_template();
            response.set_status(Status::Success);
            self.enqueue_or_intercept(response);
            return (Status::Success, 0);
        }

        if event.cookie == 0 {
            event.cookie = self.0.state.borrow_mut().dispatcher.next_cookie();
        }
        let group_key = event.cookie;
        self.0
            .state
            .borrow_mut()
            .notify
            .register_group(group_key, subscribers.len(), event.response_template());
        for subscriber in &subscribers {
            let ack_cookie = self.0.state.borrow_mut().dispatcher.next_cookie();
            self.0.state.borrow_mut().notify.register_ack_cookie(ack_cookie, group_key);
            let mut sub_event = Event::new(event.source_id, *subscriber, event.id);
            sub_event.params = event.params;
            sub_event.flags.is_notification = true;
            sub_event.flags.response_requested = true;
            sub_event.cookie = ack_cookie;
            let status = self.enqueue_or_intercept(sub_event);
            if status.is_error() {
                tracing::warn!(?status, subscriber = %subscriber, "failed to enqueue notification fan-out");
            }
        }
        (Status::Success, sent_count)
    }

    /// Runs `dispatch_one` until there is nothing left to do. Returns the
    /// number of events dispatched.
    pub fn run_until_idle(&self) -> usize {
        let mut dispatched = 0;
        while self.dispatch_one() {
            dispatched += 1;
        }
        dispatched
    }

    /// Drains the ISR ingress queue, then services exactly one ready
    /// target's head event. Returns `false` if there was nothing to do.
    pub fn dispatch_one(&self) -> bool {
        self.drain_isr();
        let target = match self.0.state.borrow_mut().dispatcher.pop_ready_target() {
            Some(t) => t,
            None => return false,
        };
        let idx = match self.0.state.borrow_mut().dispatcher.pop_target_event(target) {
            Some(i) => i,
            None => return true,
        };
        let event = *self
            .0
            .state
            .borrow()
            .dispatcher
            .get(idx)
            .expect("slab slot occupied while queued");

        let mut response = event.response_template();
        let is_notification = event.flags.is_notification;
        let handler_status = self
            .invoke_module(target, |module, core| {
                if is_notification {
                    module.process_notification(&event, &mut response, core)
                } else {
                    module.process_event(&event, &mut response, core)
                }
            })
            .unwrap_or_else(|status| status);

        if response.flags.is_delayed_response {
            self.0.state.borrow_mut().delayed.insert(target, event.cookie, response);
        } else if event.flags.response_requested {
            if is_notification {
                response.set_status(handler_status);
            }
            self.enqueue_or_intercept(response);
        }

        // `invoke_module` already requeued `target` if a backlog piled up
        // behind it; nothing left to do here but free the serviced event's
        // slab slot.
        self.0.state.borrow_mut().dispatcher.release(idx).ok();
        true
    }

    fn drain_isr(&self) {
        loop {
            let event = self.0.state.borrow_mut().dispatcher.poll_isr();
            match event {
                Some(event) => {
                    let status = self.enqueue_or_intercept(event);
                    if status.is_error() {
                        tracing::warn!(?status, "dropping ISR-posted event");
                    }
                }
                None => break,
            }
        }
    }

    fn enqueue_or_intercept(&self, event: Event) -> Status {
        if event.flags.is_response {
            match self.0.state.borrow_mut().notify.try_intercept(&event) {
                crate::notify::AckResult::NotAnAck => {}
                crate::notify::AckResult::Consumed => return Status::Success,
                crate::notify::AckResult::GroupComplete(final_event) => {
                    let mut state = self.0.state.borrow_mut();
                    let active = state.active.clone();
                    return match state.dispatcher.enqueue(final_event, &active) {
                        Ok(()) => Status::Success,
                        Err(status) => status,
                    };
                }
            }
        }
        let mut state = self.0.state.borrow_mut();
        let active = state.active.clone();
        match state.dispatcher.enqueue(event, &active) {
            Ok(()) => Status::Success,
            Err(status) => status,
        }
    }
}

/// A `Send + Sync` handle for posting events from outside the cooperative
/// loop thread — the one path a real interrupt context uses, since `Core`
/// itself is `Rc`-backed and not `Send`.
#[derive(Clone)]
pub struct IsrIngress(Arc<SegQueue<Event>>);

impl IsrIngress {
    pub fn put_event_from_isr(&self, event: Event) -> Status {
        self.0.push(event);
        Status::Success
    }
}
