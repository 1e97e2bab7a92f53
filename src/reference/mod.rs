//! Trackable storage locations and their abstract state.
//!
//! Every location the checker can name lives in a [`RefArena`] and is
//! addressed by a [`RefId`]. Structure (kind, base links, derived children) is
//! shared by every path of an analysis run; the [`RefState`] of each reference
//! is what forks and joins.

mod arena;
mod merge;
mod query;
mod transition;

pub use arena::{ArenaSnapshot, RefArena};
pub use merge::{MergeConflict, merge_into};

use crate::ctype::CType;
use crate::error::{RefStateError, RefStateResult};
use crate::history::History;
use crate::lattice::{AliasKind, Definedness, Exposure, MultiVal, NullState};
use crate::meta_state::ValueTable;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Stable handle of a reference inside its arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RefId(pub u32);

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub type RefSet = BTreeSet<RefId>;

/// Lexical nesting depth of a variable's declaration.
pub type LexLevel = u32;

pub const GLOBAL_SCOPE: LexLevel = 0;
pub const FILE_SCOPE: LexLevel = 1;
pub const PARAM_SCOPE: LexLevel = 2;
pub const FUNCTION_SCOPE: LexLevel = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialKind {
    Nothing,
    Internal,
    SpecState,
    System,
    GlobalMarker,
}

impl SpecialKind {
    fn as_str(self) -> &'static str {
        match self {
            SpecialKind::Nothing => "nothing",
            SpecialKind::Internal => "internal state",
            SpecialKind::SpecState => "spec state",
            SpecialKind::System => "file system state",
            SpecialKind::GlobalMarker => "<global marker>",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefKind {
    Param { index: usize, name: String },
    /// `index` is `None` when the subscript is not a known constant.
    ArrayElement { base: RefId, index: Option<i64> },
    Field { base: RefId, name: String },
    PointerDeref { base: RefId },
    AddressOf { base: RefId },
    Constant { name: String },
    Variable { name: String, level: LexLevel },
    Unconstrained { name: String },
    Object,
    Conjunction { a: RefId, b: RefId },
    External { base: RefId },
    Derived { base: RefId },
    NewStorage { name: String },
    TypeMarker,
    Result,
    Special(SpecialKind),
    Unknown,
}

impl RefKind {
    /// Base reference for kinds that are reached from another reference.
    pub fn base(&self) -> Option<RefId> {
        match self {
            RefKind::ArrayElement { base, .. }
            | RefKind::Field { base, .. }
            | RefKind::PointerDeref { base }
            | RefKind::AddressOf { base }
            | RefKind::External { base }
            | RefKind::Derived { base } => Some(*base),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum DeriveKey {
    Field(String),
    Element(Option<i64>),
    Deref,
    Address,
    External,
    Derived,
}

/// Abstract state of one reference on one path.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RefState {
    value: MultiVal,
    definedness: Definedness,
    null_state: NullState,
    alias_kind: AliasKind,
    exposure: Exposure,
    def_history: History,
    null_history: History,
    alias_history: History,
    exp_history: History,
    meta: ValueTable,
    modified: bool,
}

impl RefState {
    pub fn definedness(&self) -> Definedness {
        self.definedness
    }

    pub fn null_state(&self) -> NullState {
        self.null_state
    }

    pub fn alias_kind(&self) -> AliasKind {
        self.alias_kind
    }

    pub fn exposure(&self) -> Exposure {
        self.exposure
    }

    pub fn value(&self) -> &MultiVal {
        &self.value
    }

    pub fn meta(&self) -> &ValueTable {
        &self.meta
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn def_history(&self) -> &History {
        &self.def_history
    }

    pub fn null_history(&self) -> &History {
        &self.null_history
    }

    pub fn alias_history(&self) -> &History {
        &self.alias_history
    }

    pub fn exp_history(&self) -> &History {
        &self.exp_history
    }

    /// Equal abstract values, ignoring histories.
    pub fn same_values(&self, other: &RefState) -> bool {
        self.definedness == other.definedness
            && self.null_state == other.null_state
            && self.alias_kind.is_identical(&other.alias_kind)
            && self.exposure == other.exposure
            && self.value == other.value
            && self
                .meta
                .iter()
                .map(|(name, v)| (name, v.value))
                .eq(other.meta.iter().map(|(name, v)| (name, v.value)))
    }

    /// Serialize to one self-describing line of text.
    pub fn dump(&self) -> RefStateResult<String> {
        serde_json::to_string(self).map_err(|e| RefStateError::other(e.to_string()))
    }

    pub fn undump(line: &str) -> RefStateResult<RefState> {
        Ok(serde_json::from_str(line.trim())?)
    }
}

#[derive(Debug, Clone)]
pub struct Reference {
    id: RefId,
    kind: RefKind,
    ctype: CType,
    /// Diagnostics about this reference may be relaxed (macro bodies).
    safe: bool,
    derived: BTreeMap<DeriveKey, RefId>,
    state: RefState,
    /// State at creation; reinstalled when a path that created it is abandoned.
    origin: RefState,
}

impl Reference {
    pub fn id(&self) -> RefId {
        self.id
    }

    pub fn kind(&self) -> &RefKind {
        &self.kind
    }

    pub fn ctype(&self) -> &CType {
        &self.ctype
    }

    pub fn is_safe(&self) -> bool {
        self.safe
    }

    pub fn state(&self) -> &RefState {
        &self.state
    }

    /// Children derived so far (fields, elements, pointee, address).
    pub fn derived(&self) -> impl Iterator<Item = RefId> + '_ {
        self.derived.values().copied()
    }
}

#[cfg(test)]
mod tests;
