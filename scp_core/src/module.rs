// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Module registry: descriptors and per-module/per-element runtime contexts.
//!
//! A concrete module implements [`Module`], whose callbacks all have no-op
//! default bodies, so a driver that only cares about `process_event` need
//! not also write out five empty lifecycle stubs.

use crate::bind::ApiRef;
use crate::core::Core;
use crate::event::Event;
use crate::id::Id;
use crate::status::Status;
use std::any::Any;

/// The broad category a module belongs to, carried on its descriptor for
/// diagnostics only — it has no effect on dispatch.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ModuleKind {
    Driver,
    Hal,
    Service,
    Protocol,
}

/// Which of the two bind passes is currently running.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BindRound {
    /// First-pass wiring: a module may request APIs from modules whose
    /// `init` has already completed.
    First,
    /// Second-pass wiring: mutual/back references are allowed.
    Second,
}

/// Runtime state of a module or element context.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LifecycleState {
    Uninitialized,
    Initialized,
    Bound,
    Started,
    Suspended,
}

/// The capability set a module may implement. Every method has a no-op
/// default returning `Status::Success` (or `Status::Support` for bind
/// requests, since "not implementing an API" is the meaningful default
/// there) so a module only overrides what it actually uses.
///
/// Every callback is handed `core`, a cheap-clone handle back into the
/// running system: a module calls `core.module_bind(...)`, `core.put_event
/// (...)`, or `core.notification_subscribe(...)` from inside its own
/// callback exactly as it would call any other method on `self`. This
/// works without aliasing `&mut self` against the registry that owns the
/// module because the dispatcher temporarily removes a module from the
/// registry before invoking one of its callbacks (see
/// `Registry::take`/`Registry::restore`) — by the time a handler runs, its
/// own slot holds a placeholder, so `core` never has to re-borrow `self`.
pub trait Module {
    /// Stable diagnostic name, used in logs and lifecycle error reports.
    fn name(&self) -> &'static str;

    fn kind(&self) -> ModuleKind {
        ModuleKind::Driver
    }

    /// Called once per module at boot. `element_count` is the module's
    /// declared element count from its [`ModuleSpec`]; `config` is the
    /// module-level configuration payload supplied at registration. A
    /// module must not call any other module from here.
    fn init(&mut self, element_count: u16, config: &dyn Any, core: &Core) -> Status {
        let _ = (element_count, config, core);
        Status::Success
    }

    /// Called once per element after `init`.
    fn element_init(&mut self, element: Id, config: &dyn Any, core: &Core) -> Status {
        let _ = (element, config, core);
        Status::Success
    }

    /// Called once per module after every element has been initialized.
    fn post_init(&mut self, core: &Core) -> Status {
        let _ = core;
        Status::Success
    }

    /// Called once per `(round, module-or-element)` pair. A module may call
    /// `core.module_bind(...)` from within this callback.
    fn bind(&mut self, id: Id, round: BindRound, core: &Core) -> Status {
        let _ = (id, round, core);
        Status::Success
    }

    /// Called once per module/element after both bind rounds complete. A
    /// module may subscribe to notifications and post events here; events
    /// posted during `start` are not dispatched until every module's
    /// `start` has returned.
    fn start(&mut self, id: Id, core: &Core) -> Status {
        let _ = (id, core);
        Status::Success
    }

    /// Answers a [`crate::bind::module_bind`] request targeting this
    /// module. The default rejects every API as unsupported.
    fn process_bind_request(&mut self, source: Id, target: Id, api_id: Id, core: &Core) -> Result<ApiRef, Status> {
        let _ = (source, target, api_id, core);
        Err(Status::Support)
    }

    /// Handles a point-to-point event. `response` is a writable scratch
    /// event the dispatcher will turn into a response if the handler sets
    /// `response.flags.is_delayed_response` or the original request had
    /// `response_requested` set.
    fn process_event(&mut self, event: &Event, response: &mut Event, core: &Core) -> Status {
        let _ = (event, response, core);
        Status::Success
    }

    /// Handles a notification fan-out delivery (an event with
    /// `flags.is_notification` set).
    fn process_notification(&mut self, event: &Event, response: &mut Event, core: &Core) -> Status {
        let _ = (event, response, core);
        Status::Success
    }
}

/// Placeholder installed in a module's slot while its own callback is
/// running, so the slot never aliases the `&mut dyn Module` handed to the
/// callback. Any call that lands on a tombstone is a bug in the dispatcher,
/// not caller-reachable input, so it logs loudly rather than returning a
/// quiet `Support`.
pub(crate) struct Tombstone;

impl Module for Tombstone {
    fn name(&self) -> &'static str {
        "<tombstone>"
    }

    fn process_event(&mut self, _event: &Event, _response: &mut Event, _core: &Core) -> Status {
        tracing::error!("event delivered to a tombstoned module slot");
        Status::Panic
    }
}

/// Per-element runtime context: state plus sub-element count. Delayed
/// responses are tracked per element by
/// [`crate::delayed::DelayedResponseStore`], not inline here, so that store
/// can be indexed independently of the registry.
#[derive(Debug)]
pub struct ElementContext {
    pub state: LifecycleState,
    pub sub_element_count: u32,
}

impl ElementContext {
    fn new() -> Self {
        ElementContext {
            state: LifecycleState::Uninitialized,
            sub_element_count: 0,
        }
    }
}

/// Per-module runtime context: state plus an ordered vector of element
/// contexts, sized from the module's declared element count.
#[derive(Debug)]
pub struct ModuleContext {
    pub state: LifecycleState,
    pub elements: Vec<ElementContext>,
}

impl ModuleContext {
    fn new(element_count: u16) -> Self {
        ModuleContext {
            state: LifecycleState::Uninitialized,
            elements: (0..element_count).map(|_| ElementContext::new()).collect(),
        }
    }
}

/// A module plus its boot-time configuration, as handed to [`Registry::new`].
///
/// `config`/`element_configs` are `dyn Any` payloads so each module can
/// declare its own concrete config type; a module that needs none can pass
/// `Box::new(())`.
pub struct ModuleSpec {
    pub module: Box<dyn Module>,
    pub element_count: u16,
    pub config: Box<dyn Any>,
    pub element_configs: Vec<Box<dyn Any>>,
}

impl ModuleSpec {
    /// Builds a spec for a module with no elements and no configuration.
    pub fn simple(module: Box<dyn Module>) -> Self {
        ModuleSpec {
            module,
            element_count: 0,
            config: Box::new(()),
            element_configs: Vec::new(),
        }
    }

    /// Builds a spec for a module with `element_count` elements, each
    /// configured with the unit type.
    pub fn with_elements(module: Box<dyn Module>, element_count: u16) -> Self {
        ModuleSpec {
            module,
            element_count,
            config: Box::new(()),
            element_configs: (0..element_count).map(|_| -> Box<dyn Any> { Box::new(()) }).collect(),
        }
    }
}

/// The static table of module descriptors and their runtime contexts.
///
/// Module indices are assigned by registration order and never change —
/// `Registry` is built once at boot and handed to the rest of the core
/// behind a single owned structure, rather than a hidden global module
/// table.
///
/// Configuration payloads are deliberately not stored here: they are
/// immutable after boot, so [`crate::core::Core`] keeps them outside the
/// `RefCell` that guards the rest of the running state, letting a module's
/// `init`/`element_init` read its config without contending with the
/// take/restore dance callbacks use to reach back into the core.
pub struct Registry {
    modules: Vec<Box<dyn Module>>,
    contexts: Vec<ModuleContext>,
}

impl Registry {
    pub fn new(modules: Vec<(Box<dyn Module>, u16)>) -> Result<Self, Status> {
        if modules.len() > crate::id::MODULE_INDEX_MAX as usize + 1 {
            return Err(Status::Param);
        }
        let mut contexts = Vec::with_capacity(modules.len());
        let mut boxes = Vec::with_capacity(modules.len());
        for (module, element_count) in modules {
            contexts.push(ModuleContext::new(element_count));
            boxes.push(module);
        }
        Ok(Registry {
            modules: boxes,
            contexts,
        })
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    fn index_of(&self, id: Id) -> Result<usize, Status> {
        let idx = id.module_index().ok_or(Status::Param)? as usize;
        if idx >= self.modules.len() {
            return Err(Status::Param);
        }
        Ok(idx)
    }

    pub fn module_mut(&mut self, id: Id) -> Result<&mut Box<dyn Module>, Status> {
        let idx = self.index_of(id)?;
        Ok(&mut self.modules[idx])
    }

    /// Removes the module at `id` from the registry, leaving a [`Tombstone`]
    /// in its place. Paired with [`Registry::restore`].
    pub(crate) fn take(&mut self, id: Id) -> Result<Box<dyn Module>, Status> {
        let idx = self.index_of(id)?;
        Ok(std::mem::replace(&mut self.modules[idx], Box::new(Tombstone)))
    }

    /// Puts a module previously removed by [`Registry::take`] back into its
    /// slot.
    pub(crate) fn restore(&mut self, id: Id, module: Box<dyn Module>) -> Result<(), Status> {
        let idx = self.index_of(id)?;
        self.modules[idx] = module;
        Ok(())
    }

    pub fn context(&self, id: Id) -> Result<&ModuleContext, Status> {
        let idx = self.index_of(id)?;
        Ok(&self.contexts[idx])
    }

    pub fn context_mut(&mut self, id: Id) -> Result<&mut ModuleContext, Status> {
        let idx = self.index_of(id)?;
        Ok(&mut self.contexts[idx])
    }

    /// Updates the `state` of a module or one of its elements, dispatching
    /// on `id`'s kind. Used by the boot sequence to advance `LifecycleState`
    /// as each phase completes.
    pub(crate) fn set_state(&mut self, id: Id, state: LifecycleState) -> Result<(), Status> {
        match id {
            Id::Module(_) => {
                self.context_mut(id)?.state = state;
                Ok(())
            }
            Id::Element(module, element) => {
                let ctx = self.context_mut(Id::Module(module))?;
                let elem = ctx.elements.get_mut(element as usize).ok_or(Status::Param)?;
                elem.state = state;
                Ok(())
            }
            _ => Err(Status::Param),
        }
    }

    /// Ids of every module in registration order, for lifecycle iteration.
    pub fn module_ids(&self) -> Vec<Id> {
        (0..self.modules.len() as u8).map(Id::Module).collect()
    }

    /// Ids of every element belonging to `module`, in declaration order.
    pub fn element_ids(&self, module: Id) -> Result<Vec<Id>, Status> {
        let ctx = self.context(module)?;
        let m = module.module_index().ok_or(Status::Param)?;
        Ok((0..ctx.elements.len() as u16)
            .map(|e| Id::Element(m, e))
            .collect())
    }
}
