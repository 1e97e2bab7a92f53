use super::{
    DeriveKey, FUNCTION_SCOPE, GLOBAL_SCOPE, LexLevel, PARAM_SCOPE, RefId, RefKind, RefState,
    Reference, SpecialKind,
};
use crate::ctype::CType;
use crate::error::RefStateResult;
use crate::lattice::{AliasKind, BranchKind, Definedness, MultiVal, NullState};
use crate::meta_state::MetaStateRegistry;
use crate::{refstate_bail, refstate_ensure, trace_debug};
use std::collections::HashMap;

/// Owner of every reference created during one analysis run.
#[derive(Debug, Clone, Default)]
pub struct RefArena {
    refs: Vec<Reference>,
    conjunctions: HashMap<(RefId, RefId), RefId>,
    meta_states: MetaStateRegistry,
}

/// Per-path copy of every reference state, taken at a fork.
#[derive(Debug, Clone, PartialEq)]
pub struct ArenaSnapshot {
    pub(super) states: Vec<RefState>,
}

impl ArenaSnapshot {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state(&self, id: RefId) -> Option<&RefState> {
        self.states.get(id.0 as usize)
    }

    pub fn same_values(&self, other: &ArenaSnapshot) -> bool {
        self.states.len() == other.states.len()
            && self
                .states
                .iter()
                .zip(&other.states)
                .all(|(a, b)| a.same_values(b))
    }
}

impl RefArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_meta_states(meta_states: MetaStateRegistry) -> Self {
        Self {
            meta_states,
            ..Self::default()
        }
    }

    pub fn meta_states(&self) -> &MetaStateRegistry {
        &self.meta_states
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn contains(&self, id: RefId) -> bool {
        (id.0 as usize) < self.refs.len()
    }

    pub fn reference(&self, id: RefId) -> Option<&Reference> {
        self.refs.get(id.0 as usize)
    }

    pub fn get(&self, id: RefId) -> RefStateResult<&Reference> {
        match self.refs.get(id.0 as usize) {
            Some(r) => Ok(r),
            None => refstate_bail!("reference {id} is not in the arena"),
        }
    }

    pub(super) fn get_mut(&mut self, id: RefId) -> RefStateResult<&mut Reference> {
        match self.refs.get_mut(id.0 as usize) {
            Some(r) => Ok(r),
            None => refstate_bail!("reference {id} is not in the arena"),
        }
    }

    pub fn state(&self, id: RefId) -> Option<&RefState> {
        self.reference(id).map(Reference::state)
    }

    pub fn kind(&self, id: RefId) -> Option<&RefKind> {
        self.reference(id).map(Reference::kind)
    }

    pub fn ctype(&self, id: RefId) -> CType {
        self.reference(id)
            .map(|r| r.ctype.clone())
            .unwrap_or_default()
    }

    fn alloc(&mut self, kind: RefKind, ctype: CType, state: RefState) -> RefId {
        let id = RefId(self.refs.len() as u32);
        let mut state = state;
        if state.meta.is_empty() {
            state.meta = self.meta_states.initial_table();
        }
        self.refs.push(Reference {
            id,
            kind,
            ctype,
            safe: false,
            derived: Default::default(),
            origin: state.clone(),
            state,
        });
        id
    }

    fn with_definedness(definedness: Definedness) -> RefState {
        RefState {
            definedness,
            ..RefState::default()
        }
    }

    /// Local variable declared at `level`; uninitialized locals start undefined.
    pub fn declare_local(
        &mut self,
        name: impl Into<String>,
        ctype: CType,
        level: LexLevel,
        initialized: bool,
    ) -> RefId {
        let definedness = if initialized {
            Definedness::Defined
        } else {
            Definedness::Undefined
        };
        let level = level.max(FUNCTION_SCOPE);
        self.alloc(
            RefKind::Variable {
                name: name.into(),
                level,
            },
            ctype,
            Self::with_definedness(definedness),
        )
    }

    /// File-static or global variable; its definedness is not tracked.
    pub fn declare_global(&mut self, name: impl Into<String>, ctype: CType) -> RefId {
        self.alloc(
            RefKind::Variable {
                name: name.into(),
                level: GLOBAL_SCOPE,
            },
            ctype,
            RefState::default(),
        )
    }

    /// Formal parameter; pointer-like parameters are implicitly temp.
    pub fn declare_param(&mut self, index: usize, name: impl Into<String>, ctype: CType) -> RefId {
        let alias_kind = if ctype.is_visibly_sharable() {
            AliasKind::IMPLICIT_TEMP
        } else {
            AliasKind::UNKNOWN
        };
        self.alloc(
            RefKind::Param {
                index,
                name: name.into(),
            },
            ctype,
            RefState {
                definedness: Definedness::Defined,
                alias_kind,
                ..RefState::default()
            },
        )
    }

    pub fn make_result(&mut self, ctype: CType) -> RefId {
        self.alloc(RefKind::Result, ctype, RefState::default())
    }

    pub fn make_constant(&mut self, name: impl Into<String>, ctype: CType, value: MultiVal) -> RefId {
        let state = RefState {
            value,
            definedness: Definedness::Defined,
            ..RefState::default()
        };
        self.alloc(RefKind::Constant { name: name.into() }, ctype, state)
    }

    /// The `NULL` literal.
    pub fn make_null_constant(&mut self, ctype: CType) -> RefId {
        let state = RefState {
            value: MultiVal::Int(0),
            definedness: Definedness::Defined,
            null_state: NullState::DefinitelyNull,
            ..RefState::default()
        };
        self.alloc(RefKind::Constant { name: "NULL".into() }, ctype, state)
    }

    pub fn make_unknown(&mut self) -> RefId {
        self.alloc(RefKind::Unknown, CType::Unknown, RefState::default())
    }

    pub fn make_unconstrained(&mut self, name: impl Into<String>, ctype: CType) -> RefId {
        self.alloc(
            RefKind::Unconstrained { name: name.into() },
            ctype,
            Self::with_definedness(Definedness::Defined),
        )
    }

    /// Fresh storage returned by an allocator, not yet bound to a name.
    pub fn make_new_storage(&mut self, name: impl Into<String>, ctype: CType) -> RefId {
        let state = RefState {
            definedness: Definedness::Allocated,
            alias_kind: AliasKind::FRESH,
            ..RefState::default()
        };
        self.alloc(RefKind::NewStorage { name: name.into() }, ctype, state)
    }

    pub fn make_type_marker(&mut self, ctype: CType) -> RefId {
        self.alloc(RefKind::TypeMarker, ctype, RefState::default())
    }

    pub fn make_object(&mut self, ctype: CType) -> RefId {
        self.alloc(RefKind::Object, ctype, RefState::default())
    }

    pub fn make_special(&mut self, kind: SpecialKind) -> RefId {
        self.alloc(RefKind::Special(kind), CType::Unknown, RefState::default())
    }

    pub fn set_safe(&mut self, id: RefId, safe: bool) -> RefStateResult<()> {
        self.get_mut(id)?.safe = safe;
        Ok(())
    }

    fn derive(
        &mut self,
        base: RefId,
        key: DeriveKey,
        kind: RefKind,
        ctype: CType,
    ) -> RefStateResult<RefId> {
        let parent = self.get(base)?;
        if let Some(&child) = parent.derived.get(&key) {
            return Ok(child);
        }
        let parent_state = &parent.state;
        let state = RefState {
            alias_kind: parent_state.alias_kind.derive(AliasKind::UNKNOWN),
            exposure: parent_state.exposure.derive(Default::default()),
            ..RefState::default()
        };
        let child = self.alloc(kind, ctype, state);
        self.get_mut(base)?.derived.insert(key, child);
        trace_debug!(base = %base, child = %child, "derived reference");
        Ok(child)
    }

    pub fn derive_field(&mut self, rec: RefId, name: &str) -> RefStateResult<RefId> {
        let ctype = self.get(rec)?.ctype.field(name);
        self.derive(
            rec,
            DeriveKey::Field(name.to_string()),
            RefKind::Field {
                base: rec,
                name: name.to_string(),
            },
            ctype,
        )
    }

    pub fn derive_array_element(&mut self, arr: RefId, index: Option<i64>) -> RefStateResult<RefId> {
        let ctype = self.get(arr)?.ctype.element();
        self.derive(
            arr,
            DeriveKey::Element(index),
            RefKind::ArrayElement { base: arr, index },
            ctype,
        )
    }

    pub fn derive_pointer_deref(&mut self, ptr: RefId) -> RefStateResult<RefId> {
        let parent = self.get(ptr)?;
        if let RefKind::AddressOf { base } = parent.kind {
            return Ok(base);
        }
        let ctype = parent.ctype.pointee();
        self.derive(ptr, DeriveKey::Deref, RefKind::PointerDeref { base: ptr }, ctype)
    }

    pub fn derive_address(&mut self, r: RefId) -> RefStateResult<RefId> {
        let parent = self.get(r)?;
        if let RefKind::PointerDeref { base } = parent.kind {
            return Ok(base);
        }
        let ctype = CType::pointer_to(parent.ctype.clone());
        self.derive(r, DeriveKey::Address, RefKind::AddressOf { base: r }, ctype)
    }

    /// Storage reachable from `base` that the checker cannot name precisely.
    pub fn derive_external(&mut self, base: RefId) -> RefStateResult<RefId> {
        let ctype = self.get(base)?.ctype.clone();
        self.derive(base, DeriveKey::External, RefKind::External { base }, ctype)
    }

    /// Storage derived from `base` by an unknown sequence of operations.
    pub fn derive_derived(&mut self, base: RefId) -> RefStateResult<RefId> {
        let ctype = self.get(base)?.ctype.clone();
        self.derive(base, DeriveKey::Derived, RefKind::Derived { base }, ctype)
    }

    /// Reference standing for "either `a` or `b`".
    pub fn make_conjunction(&mut self, a: RefId, b: RefId) -> RefStateResult<RefId> {
        refstate_ensure!(
            self.contains(a) && self.contains(b),
            "conjunction of {a} and {b} has an operand outside the arena"
        );
        if a == b {
            return Ok(a);
        }
        if let Some(&existing) = self.conjunctions.get(&(a, b)) {
            return Ok(existing);
        }
        let ra = self.get(a)?;
        let rb = self.get(b)?;
        let ctype = if ra.ctype.matches(&rb.ctype) {
            if ra.ctype.is_unknown() {
                rb.ctype.clone()
            } else {
                ra.ctype.clone()
            }
        } else {
            CType::Unknown
        };
        let mut state = ra.state.clone();
        super::merge_into(
            &mut state,
            &rb.state,
            BranchKind::IfElse,
            None,
            &self.meta_states,
        );
        let id = self.alloc(RefKind::Conjunction { a, b }, ctype, state);
        self.conjunctions.insert((a, b), id);
        Ok(id)
    }

    pub fn base_of(&self, id: RefId) -> Option<RefId> {
        self.kind(id).and_then(RefKind::base)
    }

    /// Follow base links up to the variable, parameter or other root.
    pub fn root_base(&self, id: RefId) -> RefId {
        let mut cur = id;
        while let Some(base) = self.base_of(cur) {
            cur = base;
        }
        cur
    }

    /// Nesting level of the storage; only local variables are scoped.
    pub fn lex_level(&self, id: RefId) -> LexLevel {
        let root = self.root_base(id);
        match self.kind(root) {
            Some(RefKind::Variable { level, .. }) => *level,
            Some(RefKind::Conjunction { a, b }) => {
                let (a, b) = (*a, *b);
                self.lex_level(a).max(self.lex_level(b))
            }
            _ => GLOBAL_SCOPE,
        }
    }

    pub fn is_param_rooted(&self, id: RefId) -> bool {
        matches!(self.kind(self.root_base(id)), Some(RefKind::Param { .. }))
    }

    pub fn is_local_rooted(&self, id: RefId) -> bool {
        matches!(
            self.kind(self.root_base(id)),
            Some(RefKind::Variable { level, .. }) if *level >= PARAM_SCOPE
        )
    }

    /// Identity of storage. Derivation is memoized, so structurally equal
    /// references already share a handle.
    pub fn same(&self, a: RefId, b: RefId) -> bool {
        a == b
    }

    /// `a` and `b` may denote the same storage: unknown subscripts match any
    /// subscript and conjunctions match either operand.
    pub fn similar(&self, a: RefId, b: RefId) -> bool {
        if a == b {
            return true;
        }
        let (Some(ka), Some(kb)) = (self.kind(a), self.kind(b)) else {
            return false;
        };
        match kb {
            RefKind::Conjunction { a: b1, b: b2 } => {
                return self.similar(a, *b1) || self.similar(a, *b2);
            }
            RefKind::Derived { base } => return self.included_by(a, *base),
            _ => {}
        }
        match (ka, kb) {
            (
                RefKind::ArrayElement { base: x, index: i },
                RefKind::ArrayElement { base: y, index: j },
            ) => {
                self.similar(*x, *y)
                    && match (i, j) {
                        (Some(i), Some(j)) => i == j,
                        _ => true,
                    }
            }
            (RefKind::Field { base: x, name: n }, RefKind::Field { base: y, name: m }) => {
                n == m && self.similar(*x, *y)
            }
            (RefKind::PointerDeref { base: x }, RefKind::PointerDeref { base: y })
            | (RefKind::AddressOf { base: x }, RefKind::AddressOf { base: y }) => {
                self.similar(*x, *y)
            }
            (RefKind::Conjunction { a: a1, b: a2 }, _) => {
                self.similar(*a1, b) || self.similar(*a2, b)
            }
            (RefKind::Param { index: i, .. }, RefKind::Param { index: j, .. }) => i == j,
            _ => false,
        }
    }

    /// `s` is `base` or storage reached from it.
    pub fn included_by(&self, s: RefId, base: RefId) -> bool {
        if s == base {
            return true;
        }
        match self.kind(s) {
            Some(RefKind::Conjunction { a, b }) => {
                self.included_by(*a, base) || self.included_by(*b, base)
            }
            Some(kind) => kind.base().is_some_and(|up| self.included_by(up, base)),
            None => false,
        }
    }

    /// Rebuild `s` with its root replaced by `base`.
    pub fn fix_base(&mut self, s: RefId, base: RefId) -> RefStateResult<RefId> {
        let kind = self.get(s)?.kind.clone();
        match kind {
            RefKind::Result | RefKind::Param { .. } | RefKind::Variable { .. } => Ok(base),
            RefKind::ArrayElement { base: arr, index } => {
                let fixed = self.fix_base(arr, base)?;
                self.derive_array_element(fixed, index)
            }
            RefKind::Field { base: rec, name } => {
                let fixed = self.fix_base(rec, base)?;
                self.derive_field(fixed, &name)
            }
            RefKind::PointerDeref { base: ptr } => {
                let fixed = self.fix_base(ptr, base)?;
                self.derive_pointer_deref(fixed)
            }
            RefKind::AddressOf { base: inner } => {
                let fixed = self.fix_base(inner, base)?;
                self.derive_address(fixed)
            }
            RefKind::Conjunction { a, b } => {
                let fa = self.fix_base(a, base)?;
                let fb = self.fix_base(b, base)?;
                self.make_conjunction(fa, fb)
            }
            _ => Ok(s),
        }
    }

    /// Rebind parameter roots of `s` to the actual arguments of a call.
    pub fn fix_base_param(&mut self, s: RefId, args: &[RefId]) -> RefStateResult<RefId> {
        let kind = self.get(s)?.kind.clone();
        match kind {
            RefKind::Unconstrained { .. } | RefKind::Variable { .. } => Ok(s),
            RefKind::Param { index, .. } => match args.get(index) {
                Some(&actual) => {
                    refstate_ensure!(
                        self.contains(actual),
                        "argument {index} ({actual}) is not in the arena"
                    );
                    Ok(actual)
                }
                None => Ok(self.make_unknown()),
            },
            RefKind::ArrayElement { base, index } => {
                let fixed = self.fix_base_param(base, args)?;
                self.derive_array_element(fixed, index)
            }
            RefKind::Field { base, name } => {
                let fixed = self.fix_base_param(base, args)?;
                self.derive_field(fixed, &name)
            }
            RefKind::PointerDeref { base } => {
                let fixed = self.fix_base_param(base, args)?;
                self.derive_pointer_deref(fixed)
            }
            RefKind::AddressOf { base } => {
                let fixed = self.fix_base_param(base, args)?;
                self.derive_address(fixed)
            }
            RefKind::Conjunction { a, b } => {
                let fa = self.fix_base_param(a, args)?;
                let fb = self.fix_base_param(b, args)?;
                self.make_conjunction(fa, fb)
            }
            _ => Ok(s),
        }
    }

    /// Source-like rendering of a reference (`p->next`, `*q`, `a[2]`).
    pub fn describe(&self, id: RefId) -> String {
        let Some(r) = self.reference(id) else {
            return format!("<invalid {id}>");
        };
        match &r.kind {
            RefKind::Param { name, .. }
            | RefKind::Variable { name, .. }
            | RefKind::Constant { name }
            | RefKind::Unconstrained { name }
            | RefKind::NewStorage { name } => name.clone(),
            RefKind::ArrayElement { base, index } => match index {
                Some(i) => format!("{}[{i}]", self.describe(*base)),
                None => format!("{}[]", self.describe(*base)),
            },
            RefKind::Field { base, name } => match self.kind(*base) {
                Some(RefKind::PointerDeref { base: ptr }) => {
                    format!("{}->{name}", self.describe(*ptr))
                }
                _ => format!("{}.{name}", self.describe(*base)),
            },
            RefKind::PointerDeref { base } => format!("*{}", self.describe(*base)),
            RefKind::AddressOf { base } => format!("&{}", self.describe(*base)),
            RefKind::Object => format!("<object {}>", r.ctype),
            RefKind::Conjunction { a, b } => {
                format!("{} | {}", self.describe(*a), self.describe(*b))
            }
            RefKind::External { base } => format!("<external {}>", self.describe(*base)),
            RefKind::Derived { base } => format!("<derived {}>", self.describe(*base)),
            RefKind::TypeMarker => format!("<type {}>", r.ctype),
            RefKind::Result => "result".to_string(),
            RefKind::Special(kind) => kind.as_str().to_string(),
            RefKind::Unknown => "<unknown>".to_string(),
        }
    }

    /// Capture every reference state for a later restore or join.
    pub fn snapshot(&self) -> ArenaSnapshot {
        ArenaSnapshot {
            states: self.refs.iter().map(|r| r.state.clone()).collect(),
        }
    }

    /// Reinstall `snapshot` and return the states it replaced. References
    /// created after the snapshot return to their creation state.
    pub fn restore(&mut self, snapshot: ArenaSnapshot) -> ArenaSnapshot {
        let current = self.snapshot();
        let mut states = snapshot.states.into_iter();
        for r in &mut self.refs {
            r.state = match states.next() {
                Some(state) => state,
                None => r.origin.clone(),
            };
        }
        current
    }

    /// Merge the states of `taken` (first branch) into the current states
    /// (alternate branch). References scoped deeper than `level` are skipped.
    pub fn join(
        &mut self,
        taken: &ArenaSnapshot,
        kind: BranchKind,
        loc: Option<crate::diagnostics::FileLoc>,
        level: LexLevel,
    ) -> Vec<(RefId, super::MergeConflict)> {
        let mut conflicts = Vec::new();
        for idx in 0..self.refs.len() {
            let id = RefId(idx as u32);
            if self.lex_level(id) > level {
                continue;
            }
            let taken_state = match taken.states.get(idx) {
                Some(state) => state.clone(),
                None => self.refs[idx].origin.clone(),
            };
            let current = &self.refs[idx].state;
            if taken_state == *current {
                continue;
            }
            let mut merged = taken_state;
            let found = super::merge_into(&mut merged, current, kind, loc, &self.meta_states);
            conflicts.extend(found.into_iter().map(|c| (id, c)));
            self.refs[idx].state = merged;
        }
        conflicts
    }

    /// Merge the state of reference `other` into reference `res`.
    pub fn merge_state(
        &mut self,
        res: RefId,
        other: RefId,
        kind: BranchKind,
        loc: Option<crate::diagnostics::FileLoc>,
    ) -> RefStateResult<Vec<super::MergeConflict>> {
        let other_state = self.get(other)?.state.clone();
        let mut merged = self.get(res)?.state.clone();
        let conflicts = super::merge_into(&mut merged, &other_state, kind, loc, &self.meta_states);
        self.get_mut(res)?.state = merged;
        Ok(conflicts)
    }

    pub(super) fn children(&self, id: RefId) -> Vec<(RefId, bool)> {
        match self.reference(id) {
            Some(r) => r
                .derived
                .iter()
                .map(|(key, child)| (*child, matches!(key, DeriveKey::Address)))
                .collect(),
            None => {
                trace_debug!(id = %id, "children of unknown reference");
                Vec::new()
            }
        }
    }

    /// Guard against handles that cannot be in this arena.
    pub fn check_handle(&self, id: RefId) -> RefStateResult<()> {
        if !self.contains(id) {
            refstate_bail!("reference {id} is not in the arena");
        }
        Ok(())
    }
}
