//! Side-effect-free predicates over reference state. Unknown handles answer
//! conservatively instead of failing.

use super::{RefArena, RefId, RefKind};
use crate::lattice::{AliasKind, Definedness, Discipline, Exposure, NullState};

impl RefArena {
    pub fn definedness(&self, id: RefId) -> Definedness {
        self.state(id).map(|s| s.definedness).unwrap_or_default()
    }

    pub fn null_state(&self, id: RefId) -> NullState {
        self.state(id).map(|s| s.null_state).unwrap_or(NullState::Error)
    }

    pub fn alias_kind(&self, id: RefId) -> AliasKind {
        self.state(id).map(|s| s.alias_kind).unwrap_or(AliasKind::ERROR)
    }

    pub fn exposure(&self, id: RefId) -> Exposure {
        self.state(id).map(|s| s.exposure).unwrap_or_default()
    }

    pub fn is_known(&self, id: RefId) -> bool {
        matches!(self.kind(id), Some(kind) if *kind != RefKind::Unknown)
    }

    /// Known storage that a guard or alias fact can usefully mention.
    pub fn is_meaningful(&self, id: RefId) -> bool {
        self.is_known(id)
            && !matches!(
                self.kind(id),
                Some(RefKind::NewStorage { .. } | RefKind::TypeMarker)
            )
    }

    pub fn is_constant(&self, id: RefId) -> bool {
        matches!(self.kind(id), Some(RefKind::Constant { .. }))
    }

    pub fn is_dead(&self, id: RefId) -> bool {
        self.definedness(id).is_dead()
    }

    pub fn is_possibly_dead(&self, id: RefId) -> bool {
        self.definedness(id).is_possibly_dead()
    }

    pub fn is_unusable(&self, id: RefId) -> bool {
        self.definedness(id) == Definedness::Unusable
    }

    /// Storage that holds nothing that must be released.
    pub fn is_dead_storage(&self, id: RefId) -> bool {
        matches!(
            self.definedness(id),
            Definedness::Dead
                | Definedness::KilledAfterCall
                | Definedness::Unusable
                | Definedness::Undefined
                | Definedness::Unknown
        ) || self.is_definitely_null(id)
    }

    pub fn is_possibly_null(&self, id: RefId) -> bool {
        self.null_state(id).is_possibly_null()
    }

    pub fn is_perhaps_null(&self, id: RefId) -> bool {
        self.null_state(id).is_perhaps_null()
    }

    pub fn is_definitely_null(&self, id: RefId) -> bool {
        self.null_state(id).is_definitely_null()
    }

    pub fn is_not_null(&self, id: RefId) -> bool {
        self.null_state(id).is_not_null()
    }

    /// The value itself may be read (a pointer may be dereferenced).
    pub fn is_readable(&self, id: RefId) -> bool {
        let d = self.definedness(id);
        !(d.is_undefined_like() || d.is_possibly_dead() || d == Definedness::Unusable)
    }

    /// Certainly usable as an rvalue. A conjunction with no state of its own
    /// is readable only when both operands are.
    pub fn is_strictly_readable(&self, id: RefId) -> bool {
        let d = self.definedness(id);
        if let Some(RefKind::Conjunction { a, b }) = self.kind(id)
            && d == Definedness::Unknown
        {
            return self.is_strictly_readable(*a) && self.is_strictly_readable(*b);
        }
        matches!(
            d,
            Definedness::Unknown
                | Definedness::Defined
                | Definedness::Fixed
                | Definedness::RelDef
                | Definedness::PartiallyDefined
                | Definedness::Partial
                | Definedness::Special
                | Definedness::Allocated
                | Definedness::KilledAfterCall
        )
    }

    pub fn is_really_defined(&self, id: RefId) -> bool {
        matches!(
            self.definedness(id),
            Definedness::Defined
                | Definedness::Fixed
                | Definedness::RelDef
                | Definedness::Partial
                | Definedness::Special
        )
    }

    pub fn is_allocated(&self, id: RefId) -> bool {
        self.definedness(id) == Definedness::Allocated
    }

    /// Holds storage the program is responsible for releasing.
    pub fn is_allocated_storage(&self, id: RefId) -> bool {
        match self.definedness(id) {
            Definedness::Allocated | Definedness::PartiallyDefined => true,
            Definedness::Defined => matches!(
                self.alias_kind(id).discipline,
                Discipline::Only | Discipline::Owned | Discipline::Fresh | Discipline::Keep
            ),
            _ => false,
        }
    }

    pub fn has_no_storage(&self, id: RefId) -> bool {
        !self.is_allocated_storage(id) || self.is_definitely_null(id)
    }

    pub fn is_not_undefined(&self, id: RefId) -> bool {
        !matches!(
            self.definedness(id),
            Definedness::Undefined | Definedness::Unusable | Definedness::Dead
        )
    }

    pub fn is_state_live(&self, id: RefId) -> bool {
        let d = self.definedness(id);
        !d.is_undefined_like() && !d.is_possibly_dead() && d != Definedness::Unusable
    }

    pub fn is_only(&self, id: RefId) -> bool {
        self.alias_kind(id).is(Discipline::Only)
    }

    pub fn is_shared(&self, id: RefId) -> bool {
        self.alias_kind(id).is(Discipline::Shared)
    }

    pub fn is_dependent(&self, id: RefId) -> bool {
        self.alias_kind(id).is(Discipline::Dependent)
    }

    pub fn is_owned(&self, id: RefId) -> bool {
        self.alias_kind(id).is(Discipline::Owned)
    }

    pub fn is_kept(&self, id: RefId) -> bool {
        self.alias_kind(id).is(Discipline::Kept)
    }

    pub fn is_observer(&self, id: RefId) -> bool {
        self.exposure(id) == Exposure::Observer
    }

    pub fn is_exposed(&self, id: RefId) -> bool {
        self.exposure(id) == Exposure::Exposed
    }
}
