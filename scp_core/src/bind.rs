// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Binding resolver.
//!
//! A module publishes an API as a `&'static dyn Any`, authorized only by an
//! opaque [`Id`]; [`module_bind`] hands back an [`ApiRef`] and the caller
//! downcasts it to the concrete API trait it expects. The `api_id` does the
//! authorization, the downcast only confirms shape.

use std::any::Any;

use crate::core::Core;
use crate::id::{Id, Kind};
use crate::status::Status;

/// A published API handle. Any `'static` type may serve as an API; the
/// blanket impl means module authors never need to write `impl Api for
/// MyApi {}` by hand.
pub trait Api: Any {}
impl<T: Any> Api for T {}

/// A reference to a published API, type-erased until the caller downcasts
/// it. Always `'static` because module contexts live for the process
/// lifetime.
pub type ApiRef = &'static dyn Any;

/// Downcasts an [`ApiRef`] to the concrete type `T` the caller expects.
/// Returns `Status::Param` on a shape mismatch — the `api_id` authorized
/// the call, but the target published a different type than advertised.
pub fn downcast<T: Api>(api: ApiRef) -> Result<&'static T, Status> {
    api.downcast_ref::<T>().ok_or(Status::Param)
}

/// Resolves an API published by `target`, invoking its
/// `process_bind_request` callback fresh on every call — the resolver
/// never caches API pointers.
///
/// # Preconditions
/// - `target` must be a `Module` or `Element` id.
/// - `api_id` must be an `Api` id whose module index matches `target`'s.
/// - `target`'s module must have completed `init` (enforced by the
///   lifecycle engine gating bind rounds on init completion; see
///   `lifecycle.rs`).
pub fn module_bind(core: &Core, source: Id, target: Id, api_id: Id) -> Result<ApiRef, Status> {
    if !target.is_bindable_target() {
        return Err(Status::Param);
    }
    if api_id.kind() != Kind::Api {
        return Err(Status::Param);
    }
    if api_id.module_index() != target.module_index() {
        return Err(Status::Param);
    }

    core.invoke_module(target, |module, core| module.process_bind_request(source, target, api_id, core))
        .unwrap_or(Err(Status::Param))
}
