//! Function contract clauses (`requires`/`ensures` annotations) and the state
//! tests and effects they imply at call sites and function boundaries.

use crate::check::{
    COMP_DEF, CheckDescriptor, DEPENDENT_TRANS, EXPOSE_TRANS, MUST_FREE_ONLY, NULL_PASS,
    NULL_STATE, OBSERVER_TRANS, ONLY_TRANS, OWNED_TRANS, SHARED_TRANS, USE_DEF, USE_RELEASED,
};
use crate::diagnostics::FileLoc;
use crate::error::{RefStateError, RefStateResult};
use crate::lattice::{AliasKind, Exposure, NullState};
use crate::reference::{RefArena, RefId};
use itertools::Itertools;
use std::fmt;

/// State test applied to one bound reference.
pub type RefPredicate = fn(&RefArena, RefId) -> bool;

/// State change applied to one bound reference.
pub type RefEffect = fn(&mut RefArena, RefId, FileLoc) -> RefStateResult<()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseKind {
    Uses,
    Defines,
    Allocates,
    Releases,
    Sets,
    /// Qualifier on a global the function reads or writes.
    GlobalQualifier,
    Qualifier,
}

impl ClauseKind {
    const ALL: [ClauseKind; 7] = [
        ClauseKind::Uses,
        ClauseKind::Defines,
        ClauseKind::Allocates,
        ClauseKind::Releases,
        ClauseKind::Sets,
        ClauseKind::GlobalQualifier,
        ClauseKind::Qualifier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClauseKind::Uses => "uses",
            ClauseKind::Defines => "defines",
            ClauseKind::Allocates => "allocates",
            ClauseKind::Releases => "releases",
            ClauseKind::Sets => "sets",
            ClauseKind::GlobalQualifier => "global",
            ClauseKind::Qualifier => "qualifier",
        }
    }

    fn is_qualifier(self) -> bool {
        matches!(self, ClauseKind::Qualifier | ClauseKind::GlobalQualifier)
    }
}

/// Whether a clause constrains entry, exit or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timing {
    Before,
    After,
    Both,
}

impl Timing {
    const ALL: [Timing; 3] = [Timing::Before, Timing::After, Timing::Both];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timing::Before => "requires",
            Timing::After => "ensures",
            Timing::Both => "",
        }
    }

    pub fn is_before(self) -> bool {
        matches!(self, Timing::Before | Timing::Both)
    }

    pub fn is_after(self) -> bool {
        matches!(self, Timing::After | Timing::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Qualifier {
    Only,
    Shared,
    Dependent,
    Owned,
    Observer,
    Exposed,
    NotNull,
    Null,
}

impl Qualifier {
    const ALL: [Qualifier; 8] = [
        Qualifier::Only,
        Qualifier::Shared,
        Qualifier::Dependent,
        Qualifier::Owned,
        Qualifier::Observer,
        Qualifier::Exposed,
        Qualifier::NotNull,
        Qualifier::Null,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Qualifier::Only => "only",
            Qualifier::Shared => "shared",
            Qualifier::Dependent => "dependent",
            Qualifier::Owned => "owned",
            Qualifier::Observer => "observer",
            Qualifier::Exposed => "exposed",
            Qualifier::NotNull => "notnull",
            Qualifier::Null => "null",
        }
    }

    fn holds(self, arena: &RefArena, id: RefId) -> bool {
        match self {
            Qualifier::Only => arena.is_only(id),
            Qualifier::Shared => arena.is_shared(id),
            Qualifier::Dependent => arena.is_dependent(id),
            Qualifier::Owned => arena.is_owned(id),
            Qualifier::Observer => arena.is_observer(id),
            Qualifier::Exposed => arena.is_exposed(id),
            Qualifier::NotNull => !arena.is_possibly_null(id),
            Qualifier::Null => arena.is_definitely_null(id),
        }
    }

    fn check(self) -> &'static CheckDescriptor {
        match self {
            Qualifier::Only => &ONLY_TRANS,
            Qualifier::Shared => &SHARED_TRANS,
            Qualifier::Dependent => &DEPENDENT_TRANS,
            Qualifier::Owned => &OWNED_TRANS,
            Qualifier::Observer => &OBSERVER_TRANS,
            Qualifier::Exposed => &EXPOSE_TRANS,
            Qualifier::NotNull => &NULL_PASS,
            Qualifier::Null => &NULL_STATE,
        }
    }

    /// How the current state of `id` fails this qualifier.
    fn error_string(self, arena: &RefArena, id: RefId) -> String {
        match self {
            Qualifier::Only | Qualifier::Shared | Qualifier::Dependent | Qualifier::Owned => {
                arena.alias_kind(id).cap_name()
            }
            Qualifier::Observer => "Non-observer".to_string(),
            Qualifier::Exposed if arena.is_observer(id) => "Observer".to_string(),
            Qualifier::Exposed => "Non-exposed".to_string(),
            Qualifier::NotNull if arena.is_definitely_null(id) => "Null".to_string(),
            Qualifier::NotNull => "Possibly null".to_string(),
            Qualifier::Null => "Non-null".to_string(),
        }
    }
}

/// One clause of a function contract, bound to the references it names
/// (formal parameters, `result`, or globals).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractClause {
    kind: ClauseKind,
    timing: Timing,
    qualifier: Option<Qualifier>,
    refs: Vec<RefId>,
}

fn set_defined(arena: &mut RefArena, id: RefId, loc: FileLoc) -> RefStateResult<()> {
    arena.set_defined_complete(id, loc)
}

fn set_allocated(arena: &mut RefArena, id: RefId, loc: FileLoc) -> RefStateResult<()> {
    arena.set_allocated_complete(id, loc)
}

fn set_allocated_only(arena: &mut RefArena, id: RefId, loc: FileLoc) -> RefStateResult<()> {
    arena.set_allocated_complete(id, loc)?;
    arena.set_alias_kind(id, AliasKind::ONLY, loc)
}

fn set_undefined(arena: &mut RefArena, id: RefId, loc: FileLoc) -> RefStateResult<()> {
    arena.set_undefined(id, loc)
}

fn kill(arena: &mut RefArena, id: RefId, loc: FileLoc) -> RefStateResult<()> {
    arena.kill_complete(id, loc)
}

fn mark_only(arena: &mut RefArena, id: RefId, loc: FileLoc) -> RefStateResult<()> {
    arena.set_alias_kind(id, AliasKind::ONLY, loc)
}

fn mark_shared(arena: &mut RefArena, id: RefId, loc: FileLoc) -> RefStateResult<()> {
    arena.set_alias_kind(id, AliasKind::SHARED, loc)
}

fn mark_dependent(arena: &mut RefArena, id: RefId, loc: FileLoc) -> RefStateResult<()> {
    arena.set_alias_kind(id, AliasKind::DEPENDENT, loc)
}

fn mark_owned(arena: &mut RefArena, id: RefId, loc: FileLoc) -> RefStateResult<()> {
    arena.set_alias_kind(id, AliasKind::OWNED, loc)
}

fn mark_observer(arena: &mut RefArena, id: RefId, loc: FileLoc) -> RefStateResult<()> {
    arena.set_exposure(id, Exposure::Observer, loc)
}

fn mark_exposed(arena: &mut RefArena, id: RefId, loc: FileLoc) -> RefStateResult<()> {
    arena.set_exposure(id, Exposure::Exposed, loc)
}

fn mark_not_null(arena: &mut RefArena, id: RefId, loc: FileLoc) -> RefStateResult<()> {
    arena.set_null_state(id, NullState::NotNull, loc)
}

fn mark_null(arena: &mut RefArena, id: RefId, loc: FileLoc) -> RefStateResult<()> {
    arena.set_null_state(id, NullState::DefinitelyNull, loc)
}

fn is_strictly_readable(arena: &RefArena, id: RefId) -> bool {
    arena.is_strictly_readable(id)
}

fn is_unallocated(arena: &RefArena, id: RefId) -> bool {
    arena.has_no_storage(id)
}

fn is_not_undefined(arena: &RefArena, id: RefId) -> bool {
    arena.is_not_undefined(id)
}

fn is_releasable(arena: &RefArena, id: RefId) -> bool {
    arena.is_readable(id)
        && !arena.is_dependent(id)
        && !arena.is_shared(id)
        && !arena.is_observer(id)
        && !arena.is_exposed(id)
}

fn is_allocated_storage(arena: &RefArena, id: RefId) -> bool {
    arena.is_allocated_storage(id) || arena.is_really_defined(id)
}

fn is_really_defined(arena: &RefArena, id: RefId) -> bool {
    arena.is_really_defined(id)
}

fn is_released(arena: &RefArena, id: RefId) -> bool {
    arena.is_dead_storage(id)
}

impl ContractClause {
    pub fn new(kind: ClauseKind, timing: Timing, refs: Vec<RefId>) -> Self {
        Self {
            kind,
            timing,
            qualifier: None,
            refs,
        }
    }

    pub fn qualifier(timing: Timing, qualifier: Qualifier, refs: Vec<RefId>) -> Self {
        Self {
            kind: ClauseKind::Qualifier,
            timing,
            qualifier: Some(qualifier),
            refs,
        }
    }

    pub fn global_qualifier(timing: Timing, qualifier: Qualifier, refs: Vec<RefId>) -> Self {
        Self {
            kind: ClauseKind::GlobalQualifier,
            timing,
            qualifier: Some(qualifier),
            refs,
        }
    }

    pub fn kind(&self) -> ClauseKind {
        self.kind
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn qualifier_kind(&self) -> Option<Qualifier> {
        self.qualifier
    }

    pub fn refs(&self) -> &[RefId] {
        &self.refs
    }

    /// Test a bound reference must pass before the call. Only clauses that
    /// constrain entry have one.
    pub fn pre_test_predicate(&self) -> Option<RefPredicate> {
        if !self.timing.is_before() {
            return None;
        }
        match self.kind {
            ClauseKind::Uses => Some(is_strictly_readable),
            ClauseKind::Allocates | ClauseKind::Defines => Some(is_unallocated),
            ClauseKind::Sets => Some(is_not_undefined),
            ClauseKind::Releases => Some(is_releasable),
            ClauseKind::Qualifier | ClauseKind::GlobalQualifier => self.qualifier_predicate(),
        }
    }

    /// Test a bound reference must pass when the callee returns.
    pub fn post_test_predicate(&self) -> Option<RefPredicate> {
        if !self.timing.is_after() {
            return None;
        }
        match self.kind {
            ClauseKind::Allocates => Some(is_allocated_storage),
            ClauseKind::Defines | ClauseKind::Sets => Some(is_really_defined),
            ClauseKind::Releases => Some(is_released),
            ClauseKind::Uses => None,
            ClauseKind::Qualifier | ClauseKind::GlobalQualifier => self.qualifier_predicate(),
        }
    }

    fn qualifier_predicate(&self) -> Option<RefPredicate> {
        let pred: RefPredicate = match self.qualifier? {
            Qualifier::Only => |a, id| Qualifier::Only.holds(a, id),
            Qualifier::Shared => |a, id| Qualifier::Shared.holds(a, id),
            Qualifier::Dependent => |a, id| Qualifier::Dependent.holds(a, id),
            Qualifier::Owned => |a, id| Qualifier::Owned.holds(a, id),
            Qualifier::Observer => |a, id| Qualifier::Observer.holds(a, id),
            Qualifier::Exposed => |a, id| Qualifier::Exposed.holds(a, id),
            Qualifier::NotNull => |a, id| Qualifier::NotNull.holds(a, id),
            Qualifier::Null => |a, id| Qualifier::Null.holds(a, id),
        };
        Some(pred)
    }

    fn qualifier_effect(&self) -> Option<RefEffect> {
        let effect: RefEffect = match self.qualifier? {
            Qualifier::Only => mark_only,
            Qualifier::Shared => mark_shared,
            Qualifier::Dependent => mark_dependent,
            Qualifier::Owned => mark_owned,
            Qualifier::Observer => mark_observer,
            Qualifier::Exposed => mark_exposed,
            Qualifier::NotNull => mark_not_null,
            Qualifier::Null => mark_null,
        };
        Some(effect)
    }

    /// What the callee body may assume about a bound reference on entry.
    pub fn entry_effect(&self) -> Option<RefEffect> {
        if !self.timing.is_before() {
            return None;
        }
        match self.kind {
            ClauseKind::Uses => Some(set_defined),
            ClauseKind::Allocates | ClauseKind::Defines => Some(set_undefined),
            ClauseKind::Sets => Some(set_allocated),
            ClauseKind::Releases => Some(set_defined),
            ClauseKind::Qualifier | ClauseKind::GlobalQualifier => self.qualifier_effect(),
        }
    }

    /// State of a bound reference at the call site once the call returns.
    pub fn post_effect(&self) -> Option<RefEffect> {
        if !self.timing.is_after() {
            return None;
        }
        match self.kind {
            ClauseKind::Allocates => Some(set_allocated_only),
            ClauseKind::Defines | ClauseKind::Sets => Some(set_defined),
            ClauseKind::Releases => Some(kill),
            ClauseKind::Uses => None,
            ClauseKind::Qualifier | ClauseKind::GlobalQualifier => self.qualifier_effect(),
        }
    }

    /// State of a bound reference inside the callee after its exit has been
    /// checked; released storage is no longer tracked.
    pub fn exit_effect(&self) -> Option<RefEffect> {
        match self.kind {
            ClauseKind::Releases | ClauseKind::Allocates if self.timing.is_after() => Some(kill),
            _ => None,
        }
    }

    /// Applied to `result` when it is returned.
    pub fn return_effect(&self) -> Option<RefEffect> {
        if !self.timing.is_after() {
            return None;
        }
        match (self.kind, self.qualifier) {
            (ClauseKind::Allocates, _) => Some(set_allocated),
            (ClauseKind::Qualifier, Some(Qualifier::Only)) => Some(kill),
            _ => None,
        }
    }

    /// Leading word of the message when the pre-test fails on `id`.
    pub fn pre_error_string(&self, arena: &RefArena, id: RefId) -> String {
        match self.kind {
            ClauseKind::Uses if arena.is_possibly_dead(id) => "Dead".to_string(),
            ClauseKind::Uses => "Undefined".to_string(),
            ClauseKind::Allocates | ClauseKind::Defines | ClauseKind::Sets => {
                "Allocated".to_string()
            }
            ClauseKind::Releases => {
                if arena.is_possibly_dead(id) {
                    "Dead".to_string()
                } else if arena.is_dependent(id) || arena.is_shared(id) {
                    arena.alias_kind(id).cap_name()
                } else if arena.is_observer(id) || arena.is_exposed(id) {
                    let exposure = arena.exposure(id).as_str();
                    let mut chars = exposure.chars();
                    chars
                        .next()
                        .map(|c| c.to_uppercase().chain(chars).collect())
                        .unwrap_or_default()
                } else {
                    "Undefined".to_string()
                }
            }
            ClauseKind::Qualifier | ClauseKind::GlobalQualifier => self
                .qualifier
                .map(|q| q.error_string(arena, id))
                .unwrap_or_default(),
        }
    }

    /// Leading word of the message when the post-test fails on `id`.
    pub fn post_error_string(&self, arena: &RefArena, id: RefId) -> String {
        match self.kind {
            ClauseKind::Allocates => "Unallocated".to_string(),
            ClauseKind::Defines | ClauseKind::Sets | ClauseKind::Uses => "Undefined".to_string(),
            ClauseKind::Releases => "Unreleased".to_string(),
            ClauseKind::Qualifier | ClauseKind::GlobalQualifier => self
                .qualifier
                .map(|q| q.error_string(arena, id))
                .unwrap_or_default(),
        }
    }

    pub fn pre_error_check(&self, arena: &RefArena, id: RefId) -> &'static CheckDescriptor {
        match self.kind {
            ClauseKind::Uses | ClauseKind::Releases if arena.is_possibly_dead(id) => {
                &USE_RELEASED
            }
            ClauseKind::Uses => &USE_DEF,
            ClauseKind::Releases if arena.is_observer(id) || arena.is_exposed(id) => {
                &OBSERVER_TRANS
            }
            ClauseKind::Releases if arena.is_dependent(id) => &DEPENDENT_TRANS,
            ClauseKind::Releases if arena.is_shared(id) => &SHARED_TRANS,
            ClauseKind::Releases => &USE_DEF,
            ClauseKind::Allocates | ClauseKind::Defines | ClauseKind::Sets => &MUST_FREE_ONLY,
            ClauseKind::Qualifier | ClauseKind::GlobalQualifier => {
                self.qualifier.map_or(&USE_DEF, Qualifier::check)
            }
        }
    }

    pub fn post_error_check(&self) -> &'static CheckDescriptor {
        match self.kind {
            ClauseKind::Releases => &MUST_FREE_ONLY,
            ClauseKind::Allocates | ClauseKind::Defines | ClauseKind::Sets | ClauseKind::Uses => {
                &COMP_DEF
            }
            ClauseKind::Qualifier | ClauseKind::GlobalQualifier => {
                self.qualifier.map_or(&COMP_DEF, Qualifier::check)
            }
        }
    }

    /// Source form with references rendered through `arena`.
    pub fn unparse(&self, arena: &RefArena) -> String {
        let refs = self.refs.iter().map(|r| arena.describe(*r)).join(", ");
        let head = match self.qualifier {
            Some(q) if self.kind.is_qualifier() => q.as_str(),
            _ => self.kind.as_str(),
        };
        match self.timing {
            Timing::Both => format!("{head} {refs}"),
            timing => format!("{} {head} {refs}", timing.as_str()),
        }
    }

    /// Compact `timing.kind.qualifier.refs` form for library files.
    pub fn dump(&self) -> String {
        let timing = Timing::ALL
            .iter()
            .position(|t| *t == self.timing)
            .unwrap_or_default();
        let kind = ClauseKind::ALL
            .iter()
            .position(|k| *k == self.kind)
            .unwrap_or_default();
        let qual = self
            .qualifier
            .and_then(|q| Qualifier::ALL.iter().position(|x| *x == q))
            .map_or_else(|| "-".to_string(), |q| q.to_string());
        let refs = self.refs.iter().map(|r| r.0).join(",");
        format!("{timing}.{kind}.{qual}.{refs}")
    }

    pub fn undump(line: &str) -> RefStateResult<ContractClause> {
        let bad = || RefStateError::undump(format!("malformed contract clause: {line:?}"));
        let mut parts = line.trim().splitn(4, '.');
        let (Some(timing), Some(kind), Some(qual), Some(refs)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(bad());
        };

        let index = |s: &str| s.parse::<usize>().map_err(|_| bad());
        let timing = *Timing::ALL.get(index(timing)?).ok_or_else(bad)?;
        let kind = *ClauseKind::ALL.get(index(kind)?).ok_or_else(bad)?;
        let qualifier = match qual {
            "-" => None,
            q => Some(*Qualifier::ALL.get(index(q)?).ok_or_else(bad)?),
        };
        if kind.is_qualifier() != qualifier.is_some() {
            return Err(bad());
        }
        let refs = if refs.is_empty() {
            Vec::new()
        } else {
            refs.split(',')
                .map(|r| r.parse::<u32>().map(RefId).map_err(|_| bad()))
                .collect::<RefStateResult<Vec<_>>>()?
        };
        Ok(ContractClause {
            kind,
            timing,
            qualifier,
            refs,
        })
    }
}

impl fmt::Display for ContractClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = match self.qualifier {
            Some(q) if self.kind.is_qualifier() => q.as_str(),
            _ => self.kind.as_str(),
        };
        match self.timing {
            Timing::Both => write!(f, "{head}"),
            timing => write!(f, "{} {head}", timing.as_str()),
        }
    }
}
