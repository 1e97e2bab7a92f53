//! Must-alias facts along one path.
//!
//! The table maps a reference to the set of references it may share storage
//! with. Closure over structure (`p->f` aliases `q->f` when `p` aliases `q`) is
//! computed on demand by [`AliasTable::can_alias`] and bounded by the search
//! budget.

use crate::error::RefStateResult;
use crate::limits::{SearchBudget, SearchKind};
use crate::reference::{LexLevel, RefArena, RefId, RefKind, RefSet};
use crate::{refstate_ensure, trace_debug};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: BTreeMap<RefId, RefSet>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = RefId> + '_ {
        self.entries.keys().copied()
    }

    /// Aliases recorded for `r` itself, without structural closure.
    pub fn direct(&self, r: RefId) -> RefSet {
        self.entries.get(&r).cloned().unwrap_or_default()
    }

    /// Record that `r` now aliases `alias_of` and everything `alias_of` may
    /// alias. The fact is recorded in both directions.
    pub fn add_must_alias(
        &mut self,
        arena: &mut RefArena,
        r: RefId,
        alias_of: RefId,
        budget: &mut SearchBudget,
    ) -> RefStateResult<()> {
        refstate_ensure!(r != alias_of, "reference {r} cannot alias itself");
        arena.check_handle(r)?;
        arena.check_handle(alias_of)?;

        let mut set = self.can_alias(arena, alias_of, budget)?;
        set.remove(&r);
        set.insert(alias_of);
        for &other in &set {
            self.entries.entry(other).or_default().insert(r);
        }
        self.entries.entry(r).or_default().extend(set);
        trace_debug!(r = %r, alias_of = %alias_of, "must alias");
        Ok(())
    }

    /// Every reference that may share storage with `r`, never including `r`.
    pub fn can_alias(
        &self,
        arena: &mut RefArena,
        r: RefId,
        budget: &mut SearchBudget,
    ) -> RefStateResult<RefSet> {
        let mut res = self.can_alias_aux(arena, r, 0, budget)?;
        res.remove(&r);
        Ok(res)
    }

    fn can_alias_aux(
        &self,
        arena: &mut RefArena,
        r: RefId,
        depth: usize,
        budget: &mut SearchBudget,
    ) -> RefStateResult<RefSet> {
        let mut res = self.direct(r);
        if depth >= budget.alias_depth() {
            budget.exhausted(SearchKind::AliasClosure);
            return Ok(res);
        }
        match arena.get(r)?.kind().clone() {
            RefKind::Conjunction { a, b } => {
                res.extend(self.can_alias_aux(arena, a, depth + 1, budget)?);
                res.extend(self.can_alias_aux(arena, b, depth + 1, budget)?);
            }
            RefKind::PointerDeref { base } => {
                for a in self.can_alias_aux(arena, base, depth + 1, budget)? {
                    res.insert(arena.derive_pointer_deref(a)?);
                }
            }
            RefKind::AddressOf { base } => {
                for a in self.can_alias_aux(arena, base, depth + 1, budget)? {
                    res.insert(arena.derive_address(a)?);
                }
            }
            RefKind::Field { base, name } => {
                for a in self.can_alias_aux(arena, base, depth + 1, budget)? {
                    res.insert(arena.derive_field(a, &name)?);
                }
            }
            RefKind::ArrayElement { base, index } => {
                for a in self.can_alias_aux(arena, base, depth + 1, budget)? {
                    res.insert(arena.derive_array_element(a, index)?);
                }
            }
            _ => {}
        }
        Ok(res)
    }

    /// References whose recorded aliases may denote `r`, plus the matching
    /// structure under anything aliasing `r`'s base.
    pub fn aliased_by(
        &self,
        arena: &mut RefArena,
        r: RefId,
        budget: &mut SearchBudget,
    ) -> RefStateResult<RefSet> {
        let mut res = self.aliased_by_aux(arena, r, 0, budget)?;
        res.remove(&r);
        Ok(res)
    }

    fn aliased_by_aux(
        &self,
        arena: &mut RefArena,
        r: RefId,
        depth: usize,
        budget: &mut SearchBudget,
    ) -> RefStateResult<RefSet> {
        let mut res: RefSet = self
            .entries
            .iter()
            .filter(|(key, values)| **key != r && values.iter().any(|v| arena.similar(*v, r)))
            .map(|(key, _)| *key)
            .collect();
        if depth >= budget.alias_depth() {
            budget.exhausted(SearchKind::AliasedBy);
            return Ok(res);
        }
        match arena.get(r)?.kind().clone() {
            RefKind::PointerDeref { base } => {
                for a in self.aliased_by_aux(arena, base, depth + 1, budget)? {
                    res.insert(arena.derive_pointer_deref(a)?);
                }
            }
            RefKind::Field { base, name } => {
                for a in self.aliased_by_aux(arena, base, depth + 1, budget)? {
                    res.insert(arena.derive_field(a, &name)?);
                }
            }
            RefKind::ArrayElement { base, index } => {
                for a in self.aliased_by_aux(arena, base, depth + 1, budget)? {
                    res.insert(arena.derive_array_element(a, index)?);
                }
            }
            _ => {}
        }
        Ok(res)
    }

    /// Forget every fact about `r` and storage reached from it (on
    /// reassignment). When `r` is rooted at a formal parameter bound to a local
    /// (or the reverse), the rebound counterpart is cleared as well.
    pub fn clear_aliases(&mut self, arena: &mut RefArena, r: RefId) -> RefStateResult<()> {
        let root = arena.root_base(r);
        let root_is_param = arena.is_param_rooted(root);
        let root_is_local = arena.is_local_rooted(root);
        if root_is_param || root_is_local {
            let bound: Vec<RefId> = self
                .direct(root)
                .into_iter()
                .filter(|el| {
                    (root_is_local && arena.is_param_rooted(*el))
                        || (root_is_param && arena.is_local_rooted(*el))
                })
                .collect();
            for el in bound {
                let fixed = arena.fix_base(r, el)?;
                self.clear_aliases_aux(arena, fixed);
            }
        }
        self.clear_aliases_aux(arena, r);
        Ok(())
    }

    fn clear_aliases_aux(&mut self, arena: &RefArena, r: RefId) {
        self.entries.retain(|key, _| !arena.included_by(*key, r));
        for values in self.entries.values_mut() {
            values.retain(|v| !arena.included_by(*v, r));
        }
        self.entries.retain(|_, values| !values.is_empty());
    }

    /// Drop facts about storage scoped deeper than `level`.
    pub fn level_prune(&mut self, arena: &RefArena, level: LexLevel) {
        self.entries.retain(|key, _| arena.lex_level(*key) <= level);
        for values in self.entries.values_mut() {
            values.retain(|v| arena.lex_level(*v) <= level);
        }
        self.entries.retain(|_, values| !values.is_empty());
    }

    /// Join of two paths: aliasing possible on either is possible after.
    pub fn level_union(&mut self, other: &AliasTable, arena: &RefArena, level: LexLevel) {
        for (key, values) in &other.entries {
            self.entries.entry(*key).or_default().extend(values.iter().copied());
        }
        self.level_prune(arena, level);
    }

    /// Sequential composition: `other` happened after `self`, so its facts
    /// replace those recorded for the same keys.
    pub fn level_union_seq(&mut self, other: &AliasTable, arena: &RefArena, level: LexLevel) {
        for (key, values) in &other.entries {
            self.entries.insert(*key, values.clone());
        }
        self.level_prune(arena, level);
    }
}
