// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Event free pool, per-target ready lists and the cookie allocator.
//!
//! Events live in a fixed-capacity [`Slab`], never boxed individually.
//! `per_target` tracks, for each destination id, the FIFO of slab indices
//! still waiting for that target's handler; `ready_queue` is the FIFO of
//! targets that currently have at least one pending event, with "push only
//! if not already present" so a busy target is serviced once per visit
//! rather than once per queued event.
//!
//! `isr_queue` is the one path into this structure that may be touched
//! from outside the cooperative loop thread: a lock-free MPSC queue, not
//! the `RefCell`-guarded state the rest of the dispatcher lives behind.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_queue::SegQueue;

use crate::event::Event;
use crate::id::Id;
use crate::pool::Slab;
use crate::queue::{Fifo, IndexQueue};
use crate::status::Status;

pub(crate) struct Dispatcher {
    free_pool: Slab<Event>,
    per_target: HashMap<Id, IndexQueue>,
    ready_queue: Fifo<Id>,
    isr_queue: Arc<SegQueue<Event>>,
    next_cookie: u32,
}

impl Dispatcher {
    pub(crate) fn new(capacity: usize) -> Self {
        Dispatcher {
            free_pool: Slab::with_capacity(capacity),
            per_target: HashMap::new(),
            ready_queue: Fifo::with_capacity(capacity),
            isr_queue: Arc::new(SegQueue::new()),
            next_cookie: 0,
        }
    }

    pub(crate) fn isr_handle(&self) -> Arc<SegQueue<Event>> {
        Arc::clone(&self.isr_queue)
    }

    pub(crate) fn poll_isr(&mut self) -> Option<Event> {
        self.isr_queue.pop()
    }

    /// Monotonic cookie allocator. Skips `0`, which means "no cookie" on a
    /// freshly built event.
    pub(crate) fn next_cookie(&mut self) -> u32 {
        loop {
            self.next_cookie = self.next_cookie.wrapping_add(1);
            if self.next_cookie != 0 {
                return self.next_cookie;
            }
        }
    }

    /// `active` is the caller's current callback stack (see
    /// `crate::core::Core::invoke_module`). A target on it already has its
    /// slot emptied by `Registry::take`, so it is never added to the ready
    /// queue here even though the event itself is still queued for it —
    /// doing so would let a second `invoke_module` call land on that
    /// target's `Tombstone` instead of the real module. `requeue_if_pending`
    /// picks the target back up once it comes off the active stack.
    pub(crate) fn enqueue(&mut self, event: Event, active: &[Id]) -> Result<(), Status> {
        let target = event.target_id;
        let idx = self.free_pool.acquire(event)?;
        self.per_target.entry(target).or_insert_with(|| IndexQueue::with_capacity(4)).push_tail(idx);
        if !active.contains(&target) && !self.ready_queue.contains(target) {
            self.ready_queue.push_tail(target);
        }
        Ok(())
    }

    pub(crate) fn pop_ready_target(&mut self) -> Option<Id> {
        self.ready_queue.pop_head()
    }

    pub(crate) fn pop_target_event(&mut self, target: Id) -> Option<usize> {
        self.per_target.get_mut(&target).and_then(|q| q.pop_head())
    }

    /// Re-adds `target` to the ready queue if it still has pending events.
    /// Called after a target's head event has been serviced, so a target
    /// with a backlog gets serviced again on a later tick rather than
    /// starving the rest of the ready queue within a single tick.
    pub(crate) fn requeue_if_pending(&mut self, target: Id) {
        let still_pending = self.per_target.get(&target).map(|q| !q.is_empty()).unwrap_or(false);
        if still_pending && !self.ready_queue.contains(target) {
            self.ready_queue.push_tail(target);
        }
    }

    pub(crate) fn get(&self, idx: usize) -> Option<&Event> {
        self.free_pool.get(idx)
    }

    pub(crate) fn release(&mut self, idx: usize) -> Result<Event, Status> {
        self.free_pool.release(idx)
    }

    /// Pulls a specific response out of `target`'s pending queue by cookie,
    /// out of FIFO order if necessary. Used by `put_event_and_wait` to
    /// recover a correlated response without dispatching it through the
    /// waiting module's own (currently detached) handler.
    pub(crate) fn extract_response(&mut self, target: Id, cookie: u32) -> Option<Event> {
        let pending = self.per_target.get_mut(&target)?;
        let mut indices = Vec::with_capacity(pending.len());
        while let Some(idx) = pending.pop_head() {
            indices.push(idx);
        }
        let mut found = None;
        let mut remaining = IndexQueue::with_capacity(indices.len());
        for idx in indices {
            if found.is_none() {
                if let Some(ev) = self.free_pool.get(idx) {
                    if ev.flags.is_response && ev.cookie == cookie {
                        found = Some(idx);
                        continue;
                    }
                }
            }
            remaining.push_tail(idx);
        }
        if let Some(q) = self.per_target.get_mut(&target) {
            *q = remaining;
        }
        let idx = found?;
        let event = *self.free_pool.get(idx).expect("slab slot occupied for extracted index");
        self.free_pool.release(idx).ok();
        if self.per_target.get(&target).map(|q| q.is_empty()).unwrap_or(true) {
            self.ready_queue.remove(target);
        }
        Some(event)
    }
}
