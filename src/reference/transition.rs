//! State setters. All mutation of reference state goes through here so that
//! every change leaves a history entry.

use super::{DeriveKey, RefArena, RefId, RefKind};
use crate::diagnostics::FileLoc;
use crate::error::{RefStateError, RefStateResult};
use crate::history::StateAction;
use crate::lattice::{AliasKind, Definedness, Exposure, MultiVal, NullState};

impl RefArena {
    pub fn set_definedness(
        &mut self,
        id: RefId,
        state: Definedness,
        loc: FileLoc,
    ) -> RefStateResult<()> {
        self.set_definedness_through(id, state, loc, None)
    }

    pub fn set_definedness_through(
        &mut self,
        id: RefId,
        state: Definedness,
        loc: FileLoc,
        via: Option<RefId>,
    ) -> RefStateResult<()> {
        let s = &mut self.get_mut(id)?.state;
        s.def_history
            .record(Some(loc), StateAction::from_definedness(state), via);
        s.definedness = state;
        Ok(())
    }

    pub fn set_null_state(&mut self, id: RefId, state: NullState, loc: FileLoc) -> RefStateResult<()> {
        self.set_null_state_through(id, state, loc, None)
    }

    pub fn set_null_state_through(
        &mut self,
        id: RefId,
        state: NullState,
        loc: FileLoc,
        via: Option<RefId>,
    ) -> RefStateResult<()> {
        let s = &mut self.get_mut(id)?.state;
        s.null_history
            .record(Some(loc), StateAction::from_null_state(state), via);
        s.null_state = state;
        Ok(())
    }

    pub fn set_alias_kind(&mut self, id: RefId, kind: AliasKind, loc: FileLoc) -> RefStateResult<()> {
        self.set_alias_kind_through(id, kind, loc, None)
    }

    pub fn set_alias_kind_through(
        &mut self,
        id: RefId,
        kind: AliasKind,
        loc: FileLoc,
        via: Option<RefId>,
    ) -> RefStateResult<()> {
        let s = &mut self.get_mut(id)?.state;
        s.alias_history
            .record(Some(loc), StateAction::from_alias_kind(kind), via);
        s.alias_kind = kind;
        Ok(())
    }

    pub fn set_exposure(&mut self, id: RefId, exposure: Exposure, loc: FileLoc) -> RefStateResult<()> {
        self.set_exposure_through(id, exposure, loc, None)
    }

    pub fn set_exposure_through(
        &mut self,
        id: RefId,
        exposure: Exposure,
        loc: FileLoc,
        via: Option<RefId>,
    ) -> RefStateResult<()> {
        let s = &mut self.get_mut(id)?.state;
        s.exp_history
            .record(Some(loc), StateAction::from_exposure(exposure), via);
        s.exposure = exposure;
        Ok(())
    }

    pub fn set_value(&mut self, id: RefId, value: MultiVal) -> RefStateResult<()> {
        self.get_mut(id)?.state.value = value;
        Ok(())
    }

    pub fn mark_modified(&mut self, id: RefId) -> RefStateResult<()> {
        self.get_mut(id)?.state.modified = true;
        Ok(())
    }

    /// Copy the whole state of `from` onto `to` (plain assignment `to = from`),
    /// keeping `to`'s own histories and recording the change at `loc`.
    pub fn copy_state(&mut self, to: RefId, from: RefId, loc: FileLoc) -> RefStateResult<()> {
        let src = self.get(from)?.state.clone();
        self.set_definedness_through(to, src.definedness, loc, Some(from))?;
        self.set_null_state_through(to, src.null_state, loc, Some(from))?;
        let dst = &mut self.get_mut(to)?.state;
        dst.value = src.value;
        dst.modified = true;
        if src.definedness == Definedness::Defined {
            self.define_containing(to, loc)?;
        }
        Ok(())
    }

    /// A store into `id` defines it and the storage it was reached through:
    /// if `p` is allocated, `*p = 3` defines `p` (and `p[0]`), and a store
    /// into `a[0]` or `a[i]` defines `a`.
    pub fn define_by_store(
        &mut self,
        id: RefId,
        loc: FileLoc,
        via: Option<RefId>,
    ) -> RefStateResult<()> {
        self.set_definedness_through(id, Definedness::Defined, loc, via)?;
        self.define_containing(id, loc)
    }

    fn define_containing(&mut self, id: RefId, loc: FileLoc) -> RefStateResult<()> {
        match self.get(id)?.kind.clone() {
            RefKind::PointerDeref { base } => {
                if matches!(
                    self.definedness(base),
                    Definedness::Allocated | Definedness::Special
                ) {
                    self.define_by_store(base, loc, Some(id))?;
                }
                if let Some(first) = self.existing_child(base, &DeriveKey::Element(Some(0)))
                    && first != id
                {
                    self.set_definedness_through(first, Definedness::Defined, loc, Some(id))?;
                }
            }
            RefKind::ArrayElement {
                base,
                index: None | Some(0),
            } => {
                if let Some(ptr) = self.existing_child(base, &DeriveKey::Deref)
                    && matches!(
                        self.definedness(ptr),
                        Definedness::Allocated | Definedness::Undefined | Definedness::Special
                    )
                {
                    self.set_definedness_through(ptr, Definedness::Defined, loc, Some(id))?;
                }
                if matches!(
                    self.definedness(base),
                    Definedness::Allocated | Definedness::PartiallyDefined | Definedness::Special
                ) {
                    self.set_definedness_through(base, Definedness::Defined, loc, Some(id))?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn existing_child(&self, base: RefId, key: &DeriveKey) -> Option<RefId> {
        self.reference(base)
            .and_then(|r| r.derived.get(key).copied())
    }

    /// Set a meta-state value explicitly (an annotation or a declared effect).
    pub fn set_meta_state(
        &mut self,
        id: RefId,
        state: &str,
        value: &str,
        loc: FileLoc,
    ) -> RefStateResult<()> {
        let index = self
            .meta_states()
            .get(state)
            .and_then(|info| info.value_index(value))
            .ok_or_else(|| {
                RefStateError::invariant(format!("no meta-state value {state}.{value}"))
            })?;
        let table = &mut self.get_mut(id)?.state.meta;
        match table.get_mut(state) {
            Some(sv) => sv.update(index, Some(loc)),
            None => {
                let mut sv = crate::meta_state::StateValue {
                    value: index,
                    implicit: false,
                    history: Default::default(),
                };
                sv.history.record(Some(loc), StateAction::Changed, None);
                table.insert(state, sv);
            }
        }
        Ok(())
    }

    fn set_definedness_tree(
        &mut self,
        id: RefId,
        own: Definedness,
        children: Definedness,
        loc: FileLoc,
    ) -> RefStateResult<()> {
        self.set_definedness(id, own, loc)?;
        let mut pending: Vec<RefId> = self
            .children(id)
            .into_iter()
            .filter(|(_, is_address)| !is_address)
            .map(|(c, _)| c)
            .collect();
        while let Some(child) = pending.pop() {
            self.set_definedness_through(child, children, loc, Some(id))?;
            pending.extend(
                self.children(child)
                    .into_iter()
                    .filter(|(_, is_address)| !is_address)
                    .map(|(c, _)| c),
            );
        }
        Ok(())
    }

    /// Define `id` and everything derived from it so far.
    pub fn set_defined_complete(&mut self, id: RefId, loc: FileLoc) -> RefStateResult<()> {
        self.set_definedness_tree(id, Definedness::Defined, Definedness::Defined, loc)?;
        self.define_containing(id, loc)
    }

    /// `id` now points to fresh storage whose contents are undefined.
    pub fn set_allocated_complete(&mut self, id: RefId, loc: FileLoc) -> RefStateResult<()> {
        self.set_definedness_tree(id, Definedness::Allocated, Definedness::Undefined, loc)
    }

    pub fn set_undefined(&mut self, id: RefId, loc: FileLoc) -> RefStateResult<()> {
        self.set_definedness(id, Definedness::Undefined, loc)
    }

    /// `id` went out of scope: it and everything reached through it.
    pub fn set_unusable_complete(&mut self, id: RefId, loc: FileLoc) -> RefStateResult<()> {
        self.set_definedness_tree(id, Definedness::Unusable, Definedness::Unusable, loc)
    }

    /// Release `id`: it and everything reached through it become dead.
    pub fn kill_complete(&mut self, id: RefId, loc: FileLoc) -> RefStateResult<()> {
        self.set_definedness_tree(id, Definedness::Dead, Definedness::Dead, loc)
    }
}
