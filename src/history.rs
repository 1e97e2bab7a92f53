//! Provenance of state changes, kept per reference and per state dimension.
//!
//! Histories are only read when a diagnostic is rendered; they never feed
//! back into the analysis.

use crate::diagnostics::{FileLoc, Note};
use crate::lattice::{AliasKind, Definedness, Discipline, Exposure, NullState};
use crate::reference::RefId;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateAction {
    Unknown,
    Changed,
    Created,
    Declared,
    Defined,
    PartiallyDefined,
    Released,
    Allocated,
    Killed,
    PossiblyKilled,
    Merged,
    Undefined,
    MaybeUndefined,
    Shared,
    Only,
    ImplicitOnly,
    Owned,
    Dependent,
    ImplicitDependent,
    Kept,
    Keep,
    Fresh,
    Temp,
    ImplicitTemp,
    Stack,
    Static,
    Local,
    RefCounted,
    Refs,
    NewRef,
    KillRef,
    Observer,
    Exposed,
    BecomesNull,
    BecomesNonNull,
    BecomesPossiblyNull,
}

impl StateAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateAction::Unknown => "changed <unknown modification>",
            StateAction::Changed => "changed",
            StateAction::Created => "created",
            StateAction::Declared => "declared",
            StateAction::Defined => "defined",
            StateAction::PartiallyDefined => "partially defined",
            StateAction::Released => "released",
            StateAction::Allocated => "allocated",
            StateAction::Killed => "released",
            StateAction::PossiblyKilled => "possibly released",
            StateAction::Merged => "merged",
            StateAction::Undefined => "becomes undefined",
            StateAction::MaybeUndefined => "possibly undefined",
            StateAction::Shared => "becomes shared",
            StateAction::Only => "becomes only",
            StateAction::ImplicitOnly => "becomes implicitly only",
            StateAction::Owned => "becomes owned",
            StateAction::Dependent => "becomes dependent",
            StateAction::ImplicitDependent => "becomes implicitly dependent",
            StateAction::Kept => "becomes kept",
            StateAction::Keep => "becomes keep",
            StateAction::Fresh => "becomes fresh",
            StateAction::Temp => "becomes temp",
            StateAction::ImplicitTemp => "becomes implicitly temp",
            StateAction::Stack => "becomes stack-allocated storage",
            StateAction::Static => "becomes static",
            StateAction::Local => "becomes local",
            StateAction::RefCounted => "becomes refcounted",
            StateAction::Refs => "becomes refs",
            StateAction::NewRef => "becomes newref",
            StateAction::KillRef => "becomes killref",
            StateAction::Observer => "becomes observer",
            StateAction::Exposed => "becomes exposed",
            StateAction::BecomesNull => "becomes null",
            StateAction::BecomesNonNull => "becomes non-null",
            StateAction::BecomesPossiblyNull => "becomes possibly null",
        }
    }

    pub fn from_definedness(state: Definedness) -> StateAction {
        match state {
            Definedness::Unknown | Definedness::Special | Definedness::RelDef => {
                StateAction::Declared
            }
            Definedness::Unusable => StateAction::Killed,
            Definedness::Undefined => StateAction::Undefined,
            Definedness::MaybeUndefined => StateAction::MaybeUndefined,
            Definedness::Allocated => StateAction::Allocated,
            Definedness::PartiallyDefined | Definedness::Partial => StateAction::PartiallyDefined,
            Definedness::Defined => StateAction::Defined,
            Definedness::Dead => StateAction::Released,
            Definedness::ProbablyDead => StateAction::PossiblyKilled,
            Definedness::Fixed
            | Definedness::UndefBeforeCall
            | Definedness::KilledAfterCall
            | Definedness::UndefAndKilled => StateAction::Changed,
        }
    }

    pub fn from_null_state(state: NullState) -> StateAction {
        match state {
            NullState::Error | NullState::Unknown => StateAction::Unknown,
            NullState::NotNull | NullState::MarkedNotNull => StateAction::BecomesNonNull,
            NullState::RelaxedNull | NullState::ConstNull => StateAction::Declared,
            NullState::PossiblyNull | NullState::AbstractNull => StateAction::BecomesPossiblyNull,
            NullState::DefinitelyNull => StateAction::BecomesNull,
        }
    }

    pub fn from_exposure(state: Exposure) -> StateAction {
        match state {
            Exposure::Unknown | Exposure::Normal => StateAction::Unknown,
            Exposure::Exposed => StateAction::Exposed,
            Exposure::Observer => StateAction::Observer,
        }
    }

    pub fn from_alias_kind(kind: AliasKind) -> StateAction {
        match (kind.discipline, kind.implicit) {
            (Discipline::Unknown | Discipline::Error, _) => StateAction::Unknown,
            (Discipline::Only, false) => StateAction::Only,
            (Discipline::Only, true) => StateAction::ImplicitOnly,
            (Discipline::Temp, false) => StateAction::Temp,
            (Discipline::Temp, true) => StateAction::ImplicitTemp,
            (Discipline::Dependent, false) => StateAction::Dependent,
            (Discipline::Dependent, true) => StateAction::ImplicitDependent,
            (Discipline::Keep, _) => StateAction::Keep,
            (Discipline::Kept, _) => StateAction::Kept,
            (Discipline::Shared, _) => StateAction::Shared,
            (Discipline::Unique | Discipline::Returned, _) => StateAction::Declared,
            (Discipline::Fresh, _) => StateAction::Fresh,
            (Discipline::Stack, _) => StateAction::Stack,
            (Discipline::RefCounted, _) => StateAction::RefCounted,
            (Discipline::Refs, _) => StateAction::Refs,
            (Discipline::KillRef, _) => StateAction::KillRef,
            (Discipline::NewRef, _) => StateAction::NewRef,
            (Discipline::Owned, _) => StateAction::Owned,
            (Discipline::Static, _) => StateAction::Static,
            (Discipline::Local, _) => StateAction::Local,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub loc: Option<FileLoc>,
    pub action: StateAction,
    /// Alias through which the change reached this reference.
    pub through: Option<RefId>,
}

/// Append-only chain of state changes; the last entry is the most recent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry unless it repeats the current head. Returns whether
    /// the chain grew.
    pub fn record(
        &mut self,
        loc: Option<FileLoc>,
        action: StateAction,
        through: Option<RefId>,
    ) -> bool {
        let entry = HistoryEntry {
            loc,
            action,
            through,
        };
        if self.head() == Some(&entry) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn head(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from most recent to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().rev()
    }

    /// Fold in the history of another path reaching the same join.
    pub fn merge(&mut self, other: &History, loc: Option<FileLoc>) {
        if self == other {
            return;
        }
        for entry in &other.entries {
            if !self.entries.contains(entry) {
                self.entries.push(entry.clone());
            }
        }
        self.record(loc, StateAction::Merged, None);
    }

    /// Render as diagnostic notes, ordered by source location.
    pub fn notes(&self, subject: &str, describe: impl Fn(RefId) -> String) -> Vec<Note> {
        self.entries
            .iter()
            .sorted_by_key(|e| e.loc)
            .map(|e| {
                let mut message = format!("Storage {subject} {}", e.action.as_str());
                if let Some(via) = e.through {
                    message.push_str(&format!(" (through alias {})", describe(via)));
                }
                Note {
                    loc: e.loc,
                    message,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_change_is_recorded_once() {
        let mut h = History::new();
        let loc = Some(FileLoc::at(3, 1));
        assert!(h.record(loc, StateAction::BecomesNull, None));
        assert!(!h.record(loc, StateAction::BecomesNull, None));
        assert_eq!(h.len(), 1);
        assert!(h.record(Some(FileLoc::at(4, 1)), StateAction::BecomesNull, None));
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn notes_are_sorted_by_location() {
        let mut h = History::new();
        h.record(Some(FileLoc::at(9, 1)), StateAction::Released, None);
        h.record(Some(FileLoc::at(2, 5)), StateAction::Allocated, None);
        let notes = h.notes("p", |_| String::new());
        let lines: Vec<_> = notes.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(lines, vec!["Storage p allocated", "Storage p released"]);
    }
}
