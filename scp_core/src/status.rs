// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Outcome taxonomy returned by every core entry point.

use std::fmt;

/// Stable, integer-backed set of outcomes every module-facing API returns.
///
/// The core never retries on behalf of a handler: a non-`Success` status is
/// propagated verbatim to whoever is waiting for it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, strum_macros::FromRepr)]
#[repr(u8)]
pub enum Status {
    /// The operation completed.
    Success = 0,
    /// The result will arrive later via a correlated response event.
    Pending,
    /// A caller-supplied argument was invalid.
    Param,
    /// The caller is not permitted to perform this operation right now.
    Access,
    /// A resource is in the wrong state for the requested operation.
    State,
    /// The free pool or subscription table is exhausted.
    NoMem,
    /// The target cannot accept another request at this time.
    Busy,
    /// Surfaced by collaborators (e.g. a timer module); never produced by
    /// the core itself.
    Timeout,
    /// The target does not implement the requested operation.
    Support,
    /// A lower layer device error was passed through unchanged.
    Device,
    /// An unrecoverable invariant was violated; dispatch halts.
    Panic,
}

impl Status {
    /// `true` for every status other than `Success` and `Pending`, which are
    /// the two outcomes that are not "an error".
    pub fn is_error(&self) -> bool {
        !matches!(self, Status::Success | Status::Pending)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Success => "success",
            Status::Pending => "pending",
            Status::Param => "invalid parameter",
            Status::Access => "access denied",
            Status::State => "invalid state",
            Status::NoMem => "out of memory",
            Status::Busy => "target busy",
            Status::Timeout => "timed out",
            Status::Support => "not supported",
            Status::Device => "device error",
            Status::Panic => "unrecoverable invariant violation",
        };
        write!(f, "{s}")
    }
}

impl std::error::Error for Status {}
