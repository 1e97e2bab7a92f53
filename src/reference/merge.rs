use super::RefState;
use crate::diagnostics::FileLoc;
use crate::lattice::{AliasKind, BranchKind, Definedness, Discipline};
use crate::meta_state::{MetaMergeConflict, MetaStateRegistry};

/// A join the lattices cannot absorb; reported as a diagnostic by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeConflict {
    Alias {
        taken: AliasKind,
        alternate: AliasKind,
    },
    Meta(MetaMergeConflict),
}

fn gives_up_discipline(state: &RefState) -> bool {
    state.definedness.is_undefined_like() || state.null_state.is_definitely_null()
}

fn merge_alias(res: &mut RefState, other: &RefState) -> Option<MergeConflict> {
    let (taken, alternate) = (res.alias_kind, other.alias_kind);
    if let Some(joined) = taken.try_join(alternate) {
        res.alias_kind = joined;
        return None;
    }
    let only_dead = |s: &RefState| s.alias_kind.is(Discipline::Only) && s.definedness.is_possibly_dead();
    if only_dead(res) || only_dead(other) {
        res.alias_kind = AliasKind::UNKNOWN;
        return None;
    }
    if res.definedness.is_possibly_dead() || other.definedness.is_possibly_dead() {
        res.alias_kind = AliasKind::ERROR;
        return None;
    }
    if gives_up_discipline(res) {
        res.alias_kind = alternate;
        return None;
    }
    if gives_up_discipline(other) {
        return None;
    }
    res.alias_kind = AliasKind::ERROR;
    Some(MergeConflict::Alias { taken, alternate })
}

/// Join `other` (the alternate path) into `res` (the taken path).
///
/// For `TrueExit` the taken path never reaches the join and `res` becomes
/// `other`; for `FalseExit` the alternate never does and `res` is unchanged.
pub fn merge_into(
    res: &mut RefState,
    other: &RefState,
    kind: BranchKind,
    loc: Option<FileLoc>,
    registry: &MetaStateRegistry,
) -> Vec<MergeConflict> {
    match kind {
        BranchKind::TrueExit => {
            *res = other.clone();
            return Vec::new();
        }
        BranchKind::FalseExit => return Vec::new(),
        BranchKind::IfElse | BranchKind::LoopBackedge | BranchKind::SwitchCase => {}
    }

    let mut conflicts = Vec::new();

    // Alias first: its special cases look at the unmerged definedness.
    if res.alias_kind != other.alias_kind {
        let before = res.alias_kind;
        conflicts.extend(merge_alias(res, other));
        if !res.alias_kind.is_identical(&before) {
            res.alias_history.merge(&other.alias_history, loc);
        }
    } else {
        res.alias_kind.implicit &= other.alias_kind.implicit;
    }

    let definedness = res.definedness.join(other.definedness);
    if res.definedness != other.definedness {
        res.def_history.merge(&other.def_history, loc);
    }
    res.definedness = definedness;

    let null_state = res.null_state.join(other.null_state);
    if res.null_state != other.null_state {
        res.null_history.merge(&other.null_history, loc);
    }
    res.null_state = null_state;

    let exposure = res.exposure.join(other.exposure);
    if res.exposure != other.exposure {
        res.exp_history.merge(&other.exp_history, loc);
    }
    res.exposure = exposure;

    res.value = res.value.join(&other.value);
    res.modified |= other.modified;

    conflicts.extend(
        res.meta
            .merge(&other.meta, registry, loc)
            .into_iter()
            .map(MergeConflict::Meta),
    );

    if res.definedness == Definedness::Unusable {
        res.alias_kind = AliasKind::ERROR;
    }
    conflicts
}
