// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Typed identifier handle used throughout the core.
//!
//! An [`Id`] is a tagged union: every handle carries its own kind and the
//! hierarchical indices that address it, so a caller can never confuse an
//! `Api` handle with an `Event` handle at compile time.

use std::fmt;

/// Maximum value (inclusive) of a module index.
pub const MODULE_INDEX_MAX: u16 = 255;
/// Maximum value (inclusive) of an element index.
pub const ELEMENT_INDEX_MAX: u16 = 4095;
/// Maximum value (inclusive) of a sub-element index.
pub const SUB_ELEMENT_INDEX_MAX: u32 = 65535;
/// Maximum value (inclusive) of an api/event/notification index.
pub const MINOR_INDEX_MAX: u16 = 255;

/// The discriminant of an [`Id`], independent of its indices.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, strum_macros::Display)]
pub enum Kind {
    None,
    Module,
    Element,
    SubElement,
    Api,
    Event,
    Notification,
}

/// A compact, typed handle addressing a module, element, sub-element, API,
/// event or notification.
///
/// `Id` is `Copy` and cheap to compare by value. Every constructor validates
/// its indices against the documented ranges and returns `None`-shaped
/// rejection via [`Id::build_module`] et al. returning `Option<Id>` — there
/// is no silent truncation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Id {
    None,
    Module(u8),
    Element(u8, u16),
    SubElement(u8, u16, u32),
    Api(u8, u8),
    Event(u8, u8),
    Notification(u8, u8),
}

impl Default for Id {
    fn default() -> Self {
        Id::None
    }
}

impl Id {
    /// Returns the [`Kind`] of this identifier. Total over every variant.
    pub fn kind(&self) -> Kind {
        match self {
            Id::None => Kind::None,
            Id::Module(_) => Kind::Module,
            Id::Element(..) => Kind::Element,
            Id::SubElement(..) => Kind::SubElement,
            Id::Api(..) => Kind::Api,
            Id::Event(..) => Kind::Event,
            Id::Notification(..) => Kind::Notification,
        }
    }

    /// Returns `true` if `self` has the given [`Kind`]. `Id::None` matches
    /// only `Kind::None`.
    pub fn is_type(&self, kind: Kind) -> bool {
        self.kind() == kind
    }

    /// Structural equality: same kind and all populated indices equal.
    ///
    /// `Id` already derives `PartialEq` with these semantics; this method
    /// exists to give the comparison a name callers can reach for without
    /// remembering that `==` already does the right thing.
    pub fn equal(&self, other: &Id) -> bool {
        self == other
    }

    /// Builds a `Module` id. Returns `None` if `module` is out of range.
    pub fn build_module(module: u8) -> Option<Id> {
        Some(Id::Module(module))
    }

    /// Builds an `Element` id. Returns `None` if `element` is out of range.
    pub fn build_element(module: u8, element: u16) -> Option<Id> {
        if element > ELEMENT_INDEX_MAX {
            return None;
        }
        Some(Id::Element(module, element))
    }

    /// Builds a `SubElement` id. Returns `None` if any index is out of range.
    pub fn build_sub_element(module: u8, element: u16, sub_element: u32) -> Option<Id> {
        if element > ELEMENT_INDEX_MAX || sub_element > SUB_ELEMENT_INDEX_MAX {
            return None;
        }
        Some(Id::SubElement(module, element, sub_element))
    }

    /// Builds an `Api` id. Returns `None` if `api` is out of range.
    pub fn build_api(module: u8, api: u8) -> Option<Id> {
        Some(Id::Api(module, api))
    }

    /// Builds an `Event` id. Returns `None` if `event` is out of range.
    pub fn build_event(module: u8, event: u8) -> Option<Id> {
        Some(Id::Event(module, event))
    }

    /// Builds a `Notification` id. Returns `None` if `notification` is out
    /// of range.
    pub fn build_notification(module: u8, notification: u8) -> Option<Id> {
        Some(Id::Notification(module, notification))
    }

    /// The module index shared by every non-`None` kind.
    ///
    /// Returns `None` for `Id::None`; every other variant carries a module
    /// index.
    pub fn module_index(&self) -> Option<u8> {
        match self {
            Id::None => None,
            Id::Module(m)
            | Id::Element(m, _)
            | Id::SubElement(m, _, _)
            | Id::Api(m, _)
            | Id::Event(m, _)
            | Id::Notification(m, _) => Some(*m),
        }
    }

    /// The module index, assuming `self` carries one.
    ///
    /// # Panics
    /// Panics in debug builds if `self` is `Id::None`. In release builds
    /// this still returns a valid `u8` (there is no undefined behavior to
    /// trigger in safe Rust); callers that cannot statically rule out
    /// `Id::None` should use [`Id::module_index`] instead.
    pub fn module_index_unchecked(&self) -> u8 {
        debug_assert!(!matches!(self, Id::None), "module_index on Id::None");
        self.module_index().unwrap_or(0)
    }

    /// The element index, defined only for `Element` and `SubElement` ids.
    pub fn element_index(&self) -> Option<u16> {
        match self {
            Id::Element(_, e) | Id::SubElement(_, e, _) => Some(*e),
            _ => None,
        }
    }

    pub fn element_index_unchecked(&self) -> u16 {
        debug_assert!(
            matches!(self, Id::Element(..) | Id::SubElement(..)),
            "element_index on non-element Id"
        );
        self.element_index().unwrap_or(0)
    }

    /// The sub-element index, defined only for `SubElement` ids.
    pub fn sub_element_index(&self) -> Option<u32> {
        match self {
            Id::SubElement(_, _, s) => Some(*s),
            _ => None,
        }
    }

    pub fn sub_element_index_unchecked(&self) -> u32 {
        debug_assert!(matches!(self, Id::SubElement(..)), "sub_element_index on non-sub-element Id");
        self.sub_element_index().unwrap_or(0)
    }

    /// The api index, defined only for `Api` ids.
    pub fn api_index(&self) -> Option<u8> {
        match self {
            Id::Api(_, a) => Some(*a),
            _ => None,
        }
    }

    pub fn api_index_unchecked(&self) -> u8 {
        debug_assert!(matches!(self, Id::Api(..)), "api_index on non-api Id");
        self.api_index().unwrap_or(0)
    }

    /// The event index, defined only for `Event` ids.
    pub fn event_index(&self) -> Option<u8> {
        match self {
            Id::Event(_, e) => Some(*e),
            _ => None,
        }
    }

    pub fn event_index_unchecked(&self) -> u8 {
        debug_assert!(matches!(self, Id::Event(..)), "event_index on non-event Id");
        self.event_index().unwrap_or(0)
    }

    /// The notification index, defined only for `Notification` ids.
    pub fn notification_index(&self) -> Option<u8> {
        match self {
            Id::Notification(_, n) => Some(*n),
            _ => None,
        }
    }

    pub fn notification_index_unchecked(&self) -> u8 {
        debug_assert!(
            matches!(self, Id::Notification(..)),
            "notification_index on non-notification Id"
        );
        self.notification_index().unwrap_or(0)
    }

    /// Returns `true` if `self` is an `Element` or `Module` id — the set of
    /// ids that may legally be used as a bind target.
    pub fn is_bindable_target(&self) -> bool {
        matches!(self, Id::Module(_) | Id::Element(..))
    }

    /// Packs the identifier into a single `u32`. Layout from the low bits
    /// up: a 4-bit kind tag, an 8-bit module index, then a 20-bit minor
    /// field whose meaning depends on kind (element index, api/event/
    /// notification index, or for `SubElement` a 12-bit element index
    /// packed with only the low 8 bits of the sub-element index).
    ///
    /// This is a logging/wire convenience, not the canonical identity —
    /// `SubElement` ids with a sub-element index above 255 are not
    /// losslessly round-trippable through this form; compare `Id` values
    /// directly instead of through their packed representation.
    pub fn to_packed(&self) -> u32 {
        const TAG_BITS: u32 = 4;
        const MODULE_BITS: u32 = 8;
        let (tag, module, minor): (u32, u32, u32) = match self {
            Id::None => (0, 0, 0),
            Id::Module(m) => (1, *m as u32, 0),
            Id::Element(m, e) => (2, *m as u32, *e as u32),
            Id::SubElement(m, e, s) => (3, *m as u32, ((*e as u32) << 8) | (*s & 0xFF)),
            Id::Api(m, x) => (4, *m as u32, *x as u32),
            Id::Event(m, x) => (5, *m as u32, *x as u32),
            Id::Notification(m, x) => (6, *m as u32, *x as u32),
        };
        tag | (module << TAG_BITS) | (minor << (TAG_BITS + MODULE_BITS))
    }

    /// Inverse of [`Id::to_packed`]. Returns `None` for a tag value that was
    /// never produced by `to_packed`. As documented there, a packed
    /// `SubElement` only round-trips sub-element indices up to 255.
    pub fn from_packed(packed: u32) -> Option<Id> {
        const TAG_BITS: u32 = 4;
        const MODULE_BITS: u32 = 8;
        let tag = packed & ((1 << TAG_BITS) - 1);
        let module = ((packed >> TAG_BITS) & 0xFF) as u8;
        let minor = packed >> (TAG_BITS + MODULE_BITS);
        match tag {
            0 => Some(Id::None),
            1 => Some(Id::Module(module)),
            2 => Some(Id::Element(module, (minor & 0xFFF) as u16)),
            3 => {
                let element = ((minor >> 8) & 0xFFF) as u16;
                let sub_element = minor & 0xFF;
                Some(Id::SubElement(module, element, sub_element))
            }
            4 => Some(Id::Api(module, (minor & 0xFF) as u8)),
            5 => Some(Id::Event(module, (minor & 0xFF) as u8)),
            6 => Some(Id::Notification(module, (minor & 0xFF) as u8)),
            _ => None,
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::None => write!(f, "Id::None"),
            Id::Module(m) => write!(f, "Id::Module({m})"),
            Id::Element(m, e) => write!(f, "Id::Element({m}.{e})"),
            Id::SubElement(m, e, s) => write!(f, "Id::SubElement({m}.{e}.{s})"),
            Id::Api(m, a) => write!(f, "Id::Api({m}.{a})"),
            Id::Event(m, e) => write!(f, "Id::Event({m}.{e})"),
            Id::Notification(m, n) => write!(f, "Id::Notification({m}.{n})"),
        }
    }
}
