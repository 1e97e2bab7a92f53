//! Driver-facing façade over the engine.
//!
//! A front end walking one function body owns a [`CheckContext`] and calls it
//! statement by statement: declarations, assignments, dereferences, calls with
//! their contracts, branches and loops. The context keeps the per-path state
//! (reference states and the alias table), applies the transfer functions and
//! turns every program fact the engine discovers into a [`Diagnostic`].

use crate::alias::AliasTable;
use crate::check::{
    BRANCH_STATE, CheckCategory, CheckDescriptor, CheckSettings, MUST_FREE_ONLY, NULL_DEREF,
    SEARCH_LIMIT, STATE_MERGE, STATE_TRANSFER,
};
use crate::config::RefStateConfig;
use crate::contract::{ClauseKind, ContractClause, Timing};
use crate::ctype::CType;
use crate::diagnostics::{Diagnostic, FileLoc, Note};
use crate::error::{RefStateError, RefStateResult};
use crate::guard::GuardSet;
use crate::history::History;
use crate::lattice::{BranchKind, Definedness, NullState};
use crate::limits::{SearchBudget, SearchKind};
use crate::meta_state::MetaStateRegistry;
use crate::reference::{
    ArenaSnapshot, FUNCTION_SCOPE, LexLevel, MergeConflict, RefArena, RefId, RefKind, RefState,
};
use crate::{instrument_block, refstate_ensure, trace_debug};

/// State of one path: what forks at a branch and joins after it.
#[derive(Debug, Clone, PartialEq)]
pub struct PathState {
    refs: ArenaSnapshot,
    aliases: AliasTable,
}

pub struct CheckContext {
    arena: RefArena,
    aliases: AliasTable,
    budget: SearchBudget,
    settings: CheckSettings,
    level: LexLevel,
    diagnostics: Vec<Diagnostic>,
}

impl Default for CheckContext {
    fn default() -> Self {
        Self {
            arena: RefArena::new(),
            aliases: AliasTable::new(),
            budget: SearchBudget::default(),
            settings: CheckSettings::default(),
            level: FUNCTION_SCOPE,
            diagnostics: Vec::new(),
        }
    }
}

impl CheckContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &RefStateConfig) -> RefStateResult<Self> {
        let registry = MetaStateRegistry::from_decls(&config.meta_state)?;
        Ok(Self {
            arena: RefArena::with_meta_states(registry),
            budget: SearchBudget::new(&config.engine),
            settings: config.check_settings(),
            ..Self::default()
        })
    }

    pub fn arena(&self) -> &RefArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut RefArena {
        &mut self.arena
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn budget(&self) -> &SearchBudget {
        &self.budget
    }

    pub fn level(&self) -> LexLevel {
        self.level
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Record a diagnostic unless its check is allowed or an identical one
    /// was already reported (loop bodies are analyzed more than once).
    pub fn report(
        &mut self,
        check: &'static CheckDescriptor,
        loc: Option<FileLoc>,
        message: String,
        notes: Vec<Note>,
    ) {
        let level = self.settings.level_for(check.name);
        if !level.is_reported() {
            return;
        }
        let duplicate = self
            .diagnostics
            .iter()
            .any(|d| d.check.name == check.name && d.loc == loc && d.message == message);
        if duplicate {
            return;
        }
        trace_debug!(check = check.name, %message, "diagnostic");
        self.diagnostics.push(Diagnostic {
            check,
            level,
            loc,
            message,
            notes,
        });
    }

    fn flush_search_limits(&mut self, loc: Option<FileLoc>) {
        for kind in self.budget.take_pending() {
            self.report(
                &SEARCH_LIMIT,
                loc,
                format!(
                    "Search limit reached during {} search; results may be incomplete",
                    kind.as_str()
                ),
                Vec::new(),
            );
        }
    }

    fn notes_for(&self, check: &CheckDescriptor, id: RefId) -> Vec<Note> {
        let Some(state) = self.arena.state(id) else {
            return Vec::new();
        };
        let history: &History = match check.category {
            CheckCategory::Null => state.null_history(),
            CheckCategory::Aliasing => state.alias_history(),
            CheckCategory::Exposure => state.exp_history(),
            _ => state.def_history(),
        };
        history.notes(&self.arena.describe(id), |r| self.arena.describe(r))
    }

    /// Declare a local in the current block.
    pub fn declare_local(&mut self, name: &str, ctype: CType, initialized: bool) -> RefId {
        self.arena.declare_local(name, ctype, self.level, initialized)
    }

    pub fn enter_scope(&mut self) {
        self.level += 1;
    }

    /// Leave the current block: its locals become unusable and facts about
    /// them are dropped.
    pub fn exit_scope(&mut self, loc: FileLoc) -> RefStateResult<()> {
        refstate_ensure!(
            self.level > FUNCTION_SCOPE,
            "scope exit at level {} without a matching entry",
            self.level
        );
        self.level -= 1;
        let level = self.level;
        let dying: Vec<RefId> = (0..self.arena.len())
            .map(|i| RefId(i as u32))
            .filter(|id| {
                matches!(self.arena.kind(*id), Some(RefKind::Variable { level: l, .. }) if *l > level)
            })
            .collect();
        for id in dying {
            self.arena.set_unusable_complete(id, loc)?;
        }
        self.aliases.level_prune(&self.arena, level);
        Ok(())
    }

    /// Run the pre-test of `clause` on `id`; report and return false when it
    /// fails. Unusable storage was already reported and stays silent.
    fn check_pre(
        &mut self,
        clause: &ContractClause,
        id: RefId,
        what: &str,
        loc: FileLoc,
    ) -> bool {
        let Some(pred) = clause.pre_test_predicate() else {
            return true;
        };
        if pred(&self.arena, id) {
            return true;
        }
        if self.arena.is_unusable(id) {
            return false;
        }
        let check = clause.pre_error_check(&self.arena, id);
        let message = format!(
            "{} storage {} {what}",
            clause.pre_error_string(&self.arena, id),
            self.arena.describe(id)
        );
        let notes = self.notes_for(check, id);
        self.report(check, Some(loc), message, notes);
        false
    }

    /// The value of `id` is read. Returns whether it was readable.
    pub fn use_value(&mut self, id: RefId, loc: FileLoc) -> RefStateResult<bool> {
        self.arena.check_handle(id)?;
        let uses = ContractClause::new(ClauseKind::Uses, Timing::Before, vec![id]);
        if self.check_pre(&uses, id, "used", loc) {
            return Ok(true);
        }
        if self.arena.is_possibly_dead(id) {
            self.arena.set_definedness(id, Definedness::Unusable, loc)?;
        } else if !self.arena.is_unusable(id) {
            // Reported once; later uses see it defined.
            self.arena.set_definedness(id, Definedness::Defined, loc)?;
        }
        Ok(false)
    }

    /// `lhs = rhs`.
    pub fn assign(&mut self, lhs: RefId, rhs: RefId, loc: FileLoc) -> RefStateResult<()> {
        self.use_value(rhs, loc)?;
        self.check_overwrite(lhs, loc)?;
        self.aliases.clear_aliases(&mut self.arena, lhs)?;
        self.arena.copy_state(lhs, rhs, loc)?;

        let rhs_kind = self.arena.alias_kind(rhs);
        if rhs_kind.is_known() && !self.arena.alias_kind(lhs).is_known() {
            self.arena
                .set_alias_kind_through(lhs, rhs_kind, loc, Some(rhs))?;
        }
        if lhs != rhs
            && self.arena.is_meaningful(rhs)
            && !self.arena.is_constant(rhs)
            && self.arena.ctype(lhs).is_visibly_sharable()
        {
            self.aliases
                .add_must_alias(&mut self.arena, lhs, rhs, &mut self.budget)?;
        }
        self.flush_search_limits(Some(loc));
        Ok(())
    }

    /// `lhs = NULL`.
    pub fn assign_null(&mut self, lhs: RefId, loc: FileLoc) -> RefStateResult<()> {
        self.check_overwrite(lhs, loc)?;
        self.aliases.clear_aliases(&mut self.arena, lhs)?;
        self.arena.set_definedness(lhs, Definedness::Defined, loc)?;
        self.arena.set_null_state(lhs, NullState::DefinitelyNull, loc)?;
        self.arena.mark_modified(lhs)
    }

    /// Overwriting the only reference to live storage leaks it.
    fn check_overwrite(&mut self, lhs: RefId, loc: FileLoc) -> RefStateResult<()> {
        if !(self.arena.is_only(lhs)
            && self.arena.is_allocated_storage(lhs)
            && !self.arena.is_definitely_null(lhs))
        {
            return Ok(());
        }
        let others = self.aliases.can_alias(&mut self.arena, lhs, &mut self.budget)?;
        if others.is_empty() {
            let message = format!(
                "Only storage {} not released before assignment",
                self.arena.describe(lhs)
            );
            let notes = self.notes_for(&MUST_FREE_ONLY, lhs);
            self.report(&MUST_FREE_ONLY, Some(loc), message, notes);
        }
        Ok(())
    }

    /// `*ptr`: checks the pointer and returns the pointee.
    pub fn dereference(&mut self, ptr: RefId, loc: FileLoc) -> RefStateResult<RefId> {
        if self.use_value(ptr, loc)? && self.arena.is_possibly_null(ptr) {
            let what = if self.arena.is_definitely_null(ptr) {
                "null"
            } else {
                "possibly null"
            };
            let message = format!(
                "Dereference of {what} pointer {}",
                self.arena.describe(ptr)
            );
            let notes = self.notes_for(&NULL_DEREF, ptr);
            self.report(&NULL_DEREF, Some(loc), message, notes);
            self.arena.set_null_state(ptr, NullState::NotNull, loc)?;
        }
        self.arena.derive_pointer_deref(ptr)
    }

    /// `free(ptr)`: the storage and everything aliasing it dies.
    pub fn release(&mut self, ptr: RefId, loc: FileLoc) -> RefStateResult<()> {
        let releases = ContractClause::new(ClauseKind::Releases, Timing::Before, vec![ptr]);
        self.check_pre(&releases, ptr, "released", loc);
        self.kill_with_aliases(ptr, loc)
    }

    fn kill_with_aliases(&mut self, id: RefId, loc: FileLoc) -> RefStateResult<()> {
        let aliases = self.aliases.can_alias(&mut self.arena, id, &mut self.budget)?;
        self.arena.kill_complete(id, loc)?;
        for alias in aliases {
            self.arena
                .set_definedness_through(alias, Definedness::Dead, loc, Some(id))?;
        }
        self.flush_search_limits(Some(loc));
        Ok(())
    }

    /// `lhs = <fresh storage>` from an allocator without a declared contract.
    pub fn allocate(&mut self, lhs: RefId, loc: FileLoc) -> RefStateResult<()> {
        let allocates = ContractClause::new(ClauseKind::Allocates, Timing::After, vec![lhs]);
        self.check_overwrite(lhs, loc)?;
        self.aliases.clear_aliases(&mut self.arena, lhs)?;
        if let Some(effect) = allocates.post_effect() {
            effect(&mut self.arena, lhs, loc)?;
        }
        self.arena.mark_modified(lhs)
    }

    /// Bind a contract reference to the call site. `None` when it names the
    /// result and the result is discarded.
    fn bind(
        &mut self,
        formal: RefId,
        args: &[RefId],
        result: Option<RefId>,
    ) -> RefStateResult<Option<RefId>> {
        let root = self.arena.root_base(formal);
        if matches!(self.arena.kind(root), Some(RefKind::Result)) {
            return match result {
                Some(r) => Ok(Some(self.arena.fix_base(formal, r)?)),
                None => Ok(None),
            };
        }
        Ok(Some(self.arena.fix_base_param(formal, args)?))
    }

    /// A call whose callee declares `contract`. Every requirement is checked
    /// against the arguments first, then `result` is overwritten, then every
    /// effect is applied.
    pub fn apply_call(
        &mut self,
        contract: &[ContractClause],
        args: &[RefId],
        result: Option<RefId>,
        loc: FileLoc,
    ) -> RefStateResult<()> {
        let mut bound = Vec::new();
        for clause in contract {
            for &formal in clause.refs() {
                let Some(actual) = self.bind(formal, args, result)? else {
                    continue;
                };
                let what = format!("passed as {clause} {}", self.arena.describe(formal));
                self.check_pre(clause, actual, &what, loc);
                bound.push((clause, actual));
            }
        }
        if let Some(r) = result {
            self.check_overwrite(r, loc)?;
            self.aliases.clear_aliases(&mut self.arena, r)?;
        }
        for (clause, actual) in bound {
            let Some(effect) = clause.post_effect() else {
                continue;
            };
            match clause.kind() {
                ClauseKind::Releases => self.kill_with_aliases(actual, loc)?,
                ClauseKind::Allocates => {
                    self.aliases.clear_aliases(&mut self.arena, actual)?;
                    effect(&mut self.arena, actual, loc)?;
                }
                _ => effect(&mut self.arena, actual, loc)?,
            }
            self.arena.mark_modified(actual)?;
        }
        self.flush_search_limits(Some(loc));
        Ok(())
    }

    /// Entering the body of a function with `contract`: parameters take the
    /// states the contract guarantees.
    pub fn enter_function(&mut self, contract: &[ContractClause], loc: FileLoc) -> RefStateResult<()> {
        for clause in contract {
            let Some(effect) = clause.entry_effect() else {
                continue;
            };
            for &formal in clause.refs() {
                effect(&mut self.arena, formal, loc)?;
            }
        }
        Ok(())
    }

    /// Returning from a function with `contract`: its guarantees are checked.
    pub fn exit_function(
        &mut self,
        contract: &[ContractClause],
        result: Option<RefId>,
        loc: FileLoc,
    ) -> RefStateResult<()> {
        for clause in contract {
            for &formal in clause.refs() {
                let actual = match self.arena.kind(self.arena.root_base(formal)) {
                    Some(RefKind::Result) => match result {
                        Some(r) => self.arena.fix_base(formal, r)?,
                        None => continue,
                    },
                    _ => formal,
                };
                if let Some(pred) = clause.post_test_predicate()
                    && !pred(&self.arena, actual)
                {
                    let check = clause.post_error_check();
                    let message = format!(
                        "{} storage {} does not satisfy {} {} at return",
                        clause.post_error_string(&self.arena, actual),
                        self.arena.describe(actual),
                        clause,
                        self.arena.describe(formal),
                    );
                    let notes = self.notes_for(check, actual);
                    self.report(check, Some(loc), message, notes);
                }
                if let Some(effect) = clause.return_effect()
                    && actual != formal
                {
                    effect(&mut self.arena, actual, loc)?;
                }
                if let Some(effect) = clause.exit_effect() {
                    effect(&mut self.arena, actual, loc)?;
                }
            }
        }
        Ok(())
    }

    /// `id` is used where meta-state `state` is expected to hold `value`. The
    /// transfer table gives the resulting value and whether the use is an error.
    pub fn transfer_meta_state(
        &mut self,
        id: RefId,
        state: &str,
        value: &str,
        loc: FileLoc,
    ) -> RefStateResult<()> {
        let info = self
            .arena
            .meta_states()
            .get(state)
            .ok_or_else(|| RefStateError::invariant(format!("unknown meta-state {state}")))?;
        let to = info.value_index(value).ok_or_else(|| {
            RefStateError::invariant(format!("meta-state {state} has no value {value}"))
        })?;
        let from = self
            .arena
            .state(id)
            .and_then(|s| s.meta().get(state))
            .map_or(info.default_value(), |v| v.value);
        let (result, error) = info.transfer(from, to);
        let error = error.map(str::to_string);
        let from_name = info.value_name(from).to_string();
        let result_name = info.value_name(result).to_string();

        if let Some(error) = error {
            let message = format!(
                "Invalid transfer from {from_name} to {value} for {state} state of {}: {error}",
                self.arena.describe(id)
            );
            let notes = self
                .arena
                .state(id)
                .and_then(|s| s.meta().get(state))
                .map(|v| v.history.notes(&self.arena.describe(id), |r| self.arena.describe(r)))
                .unwrap_or_default();
            self.report(&STATE_TRANSFER, Some(loc), message, notes);
        }
        self.arena.set_meta_state(id, state, &result_name, loc)
    }

    /// Install the facts of `guards` on the current path.
    pub fn apply_guards(&mut self, guards: &GuardSet, loc: FileLoc) -> RefStateResult<()> {
        for id in guards.true_guards() {
            if !self.arena.is_not_null(id) {
                self.arena.set_null_state(id, NullState::NotNull, loc)?;
            }
        }
        for id in guards.false_guards() {
            if !self.arena.is_definitely_null(id) {
                self.arena.set_null_state(id, NullState::DefinitelyNull, loc)?;
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> PathState {
        PathState {
            refs: self.arena.snapshot(),
            aliases: self.aliases.clone(),
        }
    }

    /// Switch to `state`, returning the path that was current.
    pub fn restore(&mut self, state: PathState) -> PathState {
        let refs = self.arena.restore(state.refs);
        let aliases = std::mem::replace(&mut self.aliases, state.aliases);
        PathState { refs, aliases }
    }

    /// Join the path `taken` (the first branch) into the current path (the
    /// alternate), reporting states that cannot be reconciled.
    pub fn join(&mut self, taken: PathState, kind: BranchKind, loc: FileLoc) -> RefStateResult<()> {
        let conflicts = self.arena.join(&taken.refs, kind, Some(loc), self.level);
        match kind {
            BranchKind::TrueExit => {}
            BranchKind::FalseExit => self.aliases = taken.aliases,
            BranchKind::IfElse | BranchKind::LoopBackedge | BranchKind::SwitchCase => {
                self.aliases.level_union(&taken.aliases, &self.arena, self.level);
            }
        }

        let (taken_name, alternate_name) = kind.path_names();
        for (id, conflict) in conflicts {
            let subject = self.arena.describe(id);
            match conflict {
                MergeConflict::Alias { taken, alternate } => {
                    let message = format!(
                        "Clauses exit with {subject} referencing {} storage in {taken_name}, {} storage in {alternate_name}",
                        taken.as_str(),
                        alternate.as_str()
                    );
                    let notes = self.notes_for(&BRANCH_STATE, id);
                    self.report(&BRANCH_STATE, Some(loc), message, notes);
                }
                MergeConflict::Meta(meta) => {
                    let message = format!(
                        "Incompatible {} states for {subject} in {taken_name} and {alternate_name}: {}",
                        meta.state, meta.message
                    );
                    self.report(&STATE_MERGE, Some(loc), message, Vec::new());
                }
            }
        }
        Ok(())
    }

    /// `if (cond) then_branch else else_branch`, with `guards` derived from
    /// `cond`. Each closure returns whether its branch always exits.
    pub fn analyze_if<T, E>(
        &mut self,
        guards: &GuardSet,
        loc: FileLoc,
        then_branch: T,
        else_branch: E,
    ) -> RefStateResult<()>
    where
        T: FnOnce(&mut CheckContext) -> RefStateResult<bool>,
        E: FnOnce(&mut CheckContext) -> RefStateResult<bool>,
    {
        let entry = self.snapshot();
        self.apply_guards(guards, loc)?;
        let then_exits = then_branch(self)?;
        let taken = self.restore(entry);
        self.apply_guards(&guards.invert(), loc)?;
        let else_exits = else_branch(self)?;
        let kind = match (then_exits, else_exits) {
            (true, false) => BranchKind::TrueExit,
            (false, true) => BranchKind::FalseExit,
            _ => BranchKind::IfElse,
        };
        self.join(taken, kind, loc)
    }

    /// Analyze a loop body `loop_passes` times, joining the state at the back
    /// edge with the state at the head after every pass.
    pub fn analyze_loop<F>(&mut self, loc: FileLoc, mut body: F) -> RefStateResult<()>
    where
        F: FnMut(&mut CheckContext) -> RefStateResult<()>,
    {
        let passes = self.budget.loop_passes();
        instrument_block!("loop", {
            let mut stable = false;
            for _ in 0..passes {
                let head = self.snapshot();
                body(self)?;
                let body_end = self.restore(head.clone());
                self.join(body_end, BranchKind::LoopBackedge, loc)?;
                if self.arena.snapshot().same_values(&head.refs) && self.aliases == head.aliases {
                    stable = true;
                    break;
                }
            }
            if !stable {
                self.budget.exhausted(SearchKind::LoopUnroll);
                self.flush_search_limits(Some(loc));
            }
            Ok(())
        })
    }

    /// State of `id` on the current path.
    pub fn state(&self, id: RefId) -> Option<&RefState> {
        self.arena.state(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::AliasKind;

    fn ptr() -> CType {
        CType::pointer_to(CType::Int)
    }

    #[test]
    fn reading_an_uninitialized_local_is_reported_once() {
        let mut cx = CheckContext::new();
        let x = cx.declare_local("x", CType::Int, false);
        assert!(!cx.use_value(x, FileLoc::at(2, 5)).expect("use"));
        assert!(cx.use_value(x, FileLoc::at(3, 5)).expect("use"));
        assert_eq!(cx.diagnostics().len(), 1);
        assert_eq!(cx.diagnostics()[0].check.name, "usedef");
        assert_eq!(cx.diagnostics()[0].message, "Undefined storage x used");
    }

    #[test]
    fn allowed_checks_are_silent() {
        let config = crate::config::parse_config("[checks]\nusedef = \"allow\"\n")
            .expect("config");
        let mut cx = CheckContext::from_config(&config).expect("context");
        let x = cx.declare_local("x", CType::Int, false);
        cx.use_value(x, FileLoc::at(2, 5)).expect("use");
        assert!(cx.diagnostics().is_empty());
    }

    #[test]
    fn scope_exit_without_entry_is_an_invariant_violation() {
        let mut cx = CheckContext::new();
        let err = cx.exit_scope(FileLoc::at(9, 1)).expect_err("unbalanced");
        assert!(err.is_invariant());
    }

    #[test]
    fn scope_exit_kills_inner_locals() {
        let mut cx = CheckContext::new();
        let outer = cx.declare_local("outer", ptr(), true);
        cx.enter_scope();
        let inner = cx.declare_local("inner", ptr(), true);
        let pointee = cx.dereference(inner, FileLoc::at(2, 3)).expect("*inner");
        cx.assign(outer, inner, FileLoc::at(3, 3)).expect("assign");
        assert!(!cx.aliases().is_empty());
        cx.exit_scope(FileLoc::at(4, 1)).expect("exit");
        assert!(cx.arena().is_unusable(inner));
        assert!(cx.arena().is_unusable(pointee));
        assert!(!cx.arena().is_unusable(outer));
        assert!(cx.aliases().is_empty());
    }

    #[test]
    fn diverging_disciplines_are_reported_at_the_join() {
        let mut cx = CheckContext::new();
        let p = cx.declare_local("p", ptr(), true);
        let entry = cx.snapshot();
        cx.arena_mut()
            .set_alias_kind(p, AliasKind::ONLY, FileLoc::at(3, 5))
            .expect("only");
        let taken = cx.restore(entry);
        cx.arena_mut()
            .set_alias_kind(p, AliasKind::SHARED, FileLoc::at(5, 5))
            .expect("shared");
        cx.join(taken, BranchKind::IfElse, FileLoc::at(6, 1))
            .expect("join");
        let diag = cx
            .diagnostics()
            .iter()
            .find(|d| d.check.name == "branchstate")
            .expect("branchstate diagnostic");
        assert_eq!(
            diag.message,
            "Clauses exit with p referencing only storage in true branch, shared storage in false branch"
        );
        assert_eq!(cx.arena().alias_kind(p), AliasKind::ERROR);
    }

    #[test]
    fn loop_that_only_reads_is_stable() {
        let mut cx = CheckContext::new();
        let i = cx.declare_local("i", CType::Int, true);
        cx.analyze_loop(FileLoc::at(2, 1), |cx| cx.use_value(i, FileLoc::at(3, 5)).map(|_| ()))
            .expect("loop");
        assert!(!cx.budget().has_warned(SearchKind::LoopUnroll));
        assert!(cx.diagnostics().is_empty());
    }

    #[test]
    fn loop_that_keeps_changing_hits_the_unroll_limit() {
        let mut cx = CheckContext::new();
        let i = cx.declare_local("i", CType::Int, true);
        cx.arena_mut()
            .set_value(i, crate::lattice::MultiVal::Int(0))
            .expect("init");
        let mut n = 0;
        cx.analyze_loop(FileLoc::at(2, 1), |cx| {
            n += 1;
            let fresh = cx.declare_local(&format!("t{n}"), CType::Int, true);
            cx.assign(i, fresh, FileLoc::at(3, 5))
        })
        .expect("loop");
        assert!(cx.budget().has_warned(SearchKind::LoopUnroll));
        assert_eq!(
            cx.diagnostics()
                .iter()
                .filter(|d| d.check.name == "search_limit")
                .count(),
            1
        );
    }
}
