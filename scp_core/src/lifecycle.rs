// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Boot sequence: runs every module through `init`, `element_init`,
//! `post_init`, both bind rounds and `start`, each phase completing in full
//! across every module before the next phase begins. Halts on the first
//! non-`Success` result and reports which module, in which phase, produced
//! it. Each module/element's `LifecycleState` advances as its own phases
//! complete: `Initialized` after `element_init`/`post_init`, `Bound` after
//! the second bind round, `Started` after `start`.

use std::fmt;

use crate::core::Core;
use crate::id::Id;
use crate::module::{BindRound, LifecycleState};
use crate::status::Status;

#[derive(Debug, Eq, PartialEq)]
pub struct LifecycleError {
    pub module: Id,
    pub phase: &'static str,
    pub status: Status,
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed during {}: {}", self.module, self.phase, self.status)
    }
}

impl std::error::Error for LifecycleError {}

fn check(module: Id, phase: &'static str, status: Status) -> Result<(), LifecycleError> {
    if status.is_error() {
        Err(LifecycleError { module, phase, status })
    } else {
        Ok(())
    }
}

pub(crate) fn run(core: &Core) -> Result<(), LifecycleError> {
    let modules = core.registry_ids();

    for &id in &modules {
        let elements = core.registry_element_ids(id).unwrap_or_default();
        let status = core
            .invoke_module(id, |module, core| {
                let config = core.module_config(id).expect("registered module has a config slot");
                module.init(elements.len() as u16, config, core)
            })
            .expect("module id came from the registry itself");
        check(id, "init", status)?;
    }

    for &id in &modules {
        let elements = core.registry_element_ids(id).unwrap_or_default();
        for (element_index, &element_id) in elements.iter().enumerate() {
            let status = core
                .invoke_module(id, |module, core| {
                    let config = core
                        .element_config(id, element_index as u16)
                        .expect("registered element has a config slot");
                    module.element_init(element_id, config, core)
                })
                .expect("module id came from the registry itself");
            check(element_id, "element_init", status)?;
            core.set_lifecycle_state(element_id, LifecycleState::Initialized).ok();
        }
    }

    for &id in &modules {
        let status = core
            .invoke_module(id, |module, core| module.post_init(core))
            .expect("module id came from the registry itself");
        check(id, "post_init", status)?;
        core.set_lifecycle_state(id, LifecycleState::Initialized).ok();
    }

    for round in [BindRound::First, BindRound::Second] {
        for &id in &modules {
            let mut targets = vec![id];
            targets.extend(core.registry_element_ids(id).unwrap_or_default());
            for target in targets {
                let status = core
                    .invoke_module(id, |module, core| module.bind(target, round, core))
                    .expect("module id came from the registry itself");
                check(target, "bind", status)?;
                if round == BindRound::Second {
                    core.set_lifecycle_state(target, LifecycleState::Bound).ok();
                }
            }
        }
    }

    for &id in &modules {
        let mut targets = vec![id];
        targets.extend(core.registry_element_ids(id).unwrap_or_default());
        for target in targets {
            let status = core
                .invoke_module(id, |module, core| module.start(target, core))
                .expect("module id came from the registry itself");
            check(target, "start", status)?;
            core.set_lifecycle_state(target, LifecycleState::Started).ok();
        }
    }

    Ok(())
}
