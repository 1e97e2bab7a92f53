//! Null-ness facts established by a tested condition.
//!
//! A guard set describes the branch taken when the condition holds: references
//! in the true set are non-null there, references in the false set are null
//! there. The branch taken when the condition fails uses [`GuardSet::invert`].
//! Empty sets are stored as `None`.

use crate::reference::{LexLevel, RefArena, RefId, RefSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardSet {
    true_guards: Option<RefSet>,
    false_guards: Option<RefSet>,
}

fn insert(set: &mut Option<RefSet>, r: RefId) {
    set.get_or_insert_with(RefSet::new).insert(r);
}

fn union(a: Option<RefSet>, b: Option<RefSet>) -> Option<RefSet> {
    match (a, b) {
        (None, x) | (x, None) => x,
        (Some(mut a), Some(b)) => {
            a.extend(b);
            Some(a)
        }
    }
}

fn intersect(a: Option<RefSet>, b: Option<RefSet>) -> Option<RefSet> {
    let (a, b) = (a?, b?);
    let both: RefSet = a.intersection(&b).copied().collect();
    if both.is_empty() { None } else { Some(both) }
}

fn level_copy(set: &Option<RefSet>, arena: &RefArena, level: LexLevel) -> Option<RefSet> {
    let kept: RefSet = set
        .iter()
        .flatten()
        .copied()
        .filter(|r| arena.lex_level(*r) <= level)
        .collect();
    if kept.is_empty() { None } else { Some(kept) }
}

impl GuardSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.true_guards.is_none() && self.false_guards.is_none()
    }

    pub fn true_guards(&self) -> impl Iterator<Item = RefId> + '_ {
        self.true_guards.iter().flatten().copied()
    }

    pub fn false_guards(&self) -> impl Iterator<Item = RefId> + '_ {
        self.false_guards.iter().flatten().copied()
    }

    /// `r` is non-null when the condition holds. Constants and type markers
    /// are ignored.
    pub fn add_true_guard(&mut self, arena: &RefArena, r: RefId) {
        if arena.is_meaningful(r) && !arena.is_constant(r) {
            insert(&mut self.true_guards, r);
        }
    }

    /// `r` is null when the condition holds.
    pub fn add_false_guard(&mut self, arena: &RefArena, r: RefId) {
        if arena.is_meaningful(r) && !arena.is_constant(r) {
            insert(&mut self.false_guards, r);
        }
    }

    /// Guards of `s && t`.
    #[must_use]
    pub fn and(self, t: GuardSet) -> GuardSet {
        GuardSet {
            true_guards: union(self.true_guards, t.true_guards),
            false_guards: intersect(self.false_guards, t.false_guards),
        }
    }

    /// Guards of `s || t`.
    #[must_use]
    pub fn or(self, t: GuardSet) -> GuardSet {
        GuardSet {
            true_guards: intersect(self.true_guards, t.true_guards),
            false_guards: union(self.false_guards, t.false_guards),
        }
    }

    /// Guards of `!s`.
    #[must_use]
    pub fn invert(&self) -> GuardSet {
        GuardSet {
            true_guards: self.false_guards.clone(),
            false_guards: self.true_guards.clone(),
        }
    }

    pub fn is_guarded(&self, r: RefId) -> bool {
        self.true_guards.as_ref().is_some_and(|s| s.contains(&r))
    }

    pub fn must_be_null(&self, r: RefId) -> bool {
        self.false_guards.as_ref().is_some_and(|s| s.contains(&r))
    }

    /// Drop guards on storage scoped deeper than `level`.
    pub fn level_prune(&mut self, arena: &RefArena, level: LexLevel) {
        self.true_guards = level_copy(&self.true_guards, arena, level);
        self.false_guards = level_copy(&self.false_guards, arena, level);
    }

    /// Add the guards of `t` that are still in scope at `level`.
    #[must_use]
    pub fn level_union(self, t: &GuardSet, arena: &RefArena, level: LexLevel) -> GuardSet {
        GuardSet {
            true_guards: union(self.true_guards, level_copy(&t.true_guards, arena, level)),
            false_guards: union(self.false_guards, level_copy(&t.false_guards, arena, level)),
        }
    }

    /// [`Self::level_union`] consuming `t`.
    #[must_use]
    pub fn level_union_free(self, t: GuardSet, arena: &RefArena, level: LexLevel) -> GuardSet {
        self.level_union(&t, arena, level)
    }
}
