//! User-declared auxiliary states.
//!
//! A meta-state names a small set of values (for example `open`/`closed` for
//! file handles) plus two tables: a transfer table consulted when storage in
//! one value is used where another value is expected, and a merge table
//! consulted at control-flow joins. Each reference stores its current values
//! in a [`ValueTable`].

use crate::config::{MetaStateDecl, TableEntryDecl};
use crate::diagnostics::FileLoc;
use crate::error::{RefStateError, RefStateResult};
use crate::history::{History, StateAction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
struct TableEntry {
    value: usize,
    message: Option<String>,
    declared: bool,
}

/// `(from, to) -> value` table over the values of one meta-state.
#[derive(Debug, Clone)]
pub struct StateCombinationTable {
    size: usize,
    rows: Vec<Vec<TableEntry>>,
}

impl StateCombinationTable {
    /// Table where every combination keeps the `from` value without error.
    pub fn new(size: usize) -> Self {
        let rows = (0..size)
            .map(|from| {
                (0..size)
                    .map(|_| TableEntry {
                        value: from,
                        message: None,
                        declared: false,
                    })
                    .collect()
            })
            .collect();
        Self { size, rows }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn set(
        &mut self,
        from: usize,
        to: usize,
        value: usize,
        message: Option<String>,
    ) -> RefStateResult<()> {
        let size = self.size;
        let entry = self
            .rows
            .get_mut(from)
            .and_then(|row| row.get_mut(to))
            .ok_or_else(|| {
                RefStateError::config(format!("state table entry ({from}, {to}) out of range"))
            })?;
        if value >= size {
            return Err(RefStateError::config(format!(
                "state table value {value} out of range"
            )));
        }
        *entry = TableEntry {
            value,
            message,
            declared: true,
        };
        Ok(())
    }

    fn entry(&self, from: usize, to: usize) -> Option<&TableEntry> {
        self.rows.get(from).and_then(|row| row.get(to))
    }

    /// Resulting value and, when the combination is an error, its message.
    /// Out-of-range indices keep `from`.
    pub fn lookup(&self, from: usize, to: usize) -> (usize, Option<&str>) {
        match self.entry(from, to) {
            Some(e) => (e.value, e.message.as_deref()),
            None => (from, None),
        }
    }

    /// Like [`Self::lookup`] but falls back to the mirrored entry when only
    /// `(to, from)` was declared.
    pub fn lookup_symmetric(&self, a: usize, b: usize) -> (usize, Option<&str>) {
        match (self.entry(a, b), self.entry(b, a)) {
            (Some(e), _) if e.declared => (e.value, e.message.as_deref()),
            (_, Some(e)) if e.declared => (e.value, e.message.as_deref()),
            _ => self.lookup(a, b),
        }
    }
}

/// Declaration of one meta-state.
#[derive(Debug, Clone)]
pub struct MetaStateInfo {
    name: String,
    values: Vec<String>,
    default: usize,
    transfer: StateCombinationTable,
    merge: StateCombinationTable,
}

impl MetaStateInfo {
    pub fn new(name: impl Into<String>, values: Vec<String>, default: usize) -> Self {
        let size = values.len();
        Self {
            name: name.into(),
            values,
            default,
            transfer: StateCombinationTable::new(size),
            merge: StateCombinationTable::new(size),
        }
    }

    pub fn from_decl(decl: &MetaStateDecl) -> RefStateResult<Self> {
        if decl.values.is_empty() {
            return Err(RefStateError::config(format!(
                "meta-state {} declares no values",
                decl.name
            )));
        }
        let mut info = Self::new(decl.name.clone(), decl.values.clone(), 0);
        if let Some(default) = &decl.default {
            info.default = info.resolve(default)?;
        }
        for entry in &decl.transfers {
            let (from, to, value) = info.resolve_entry(entry)?;
            info.transfer.set(from, to, value, entry.error.clone())?;
        }
        for entry in &decl.merges {
            let (from, to, value) = info.resolve_entry(entry)?;
            info.merge.set(from, to, value, entry.error.clone())?;
        }
        Ok(info)
    }

    fn resolve(&self, value: &str) -> RefStateResult<usize> {
        self.value_index(value).ok_or_else(|| {
            RefStateError::config(format!(
                "meta-state {} has no value named {value}",
                self.name
            ))
        })
    }

    fn resolve_entry(&self, entry: &TableEntryDecl) -> RefStateResult<(usize, usize, usize)> {
        Ok((
            self.resolve(&entry.from)?,
            self.resolve(&entry.to)?,
            self.resolve(&entry.result)?,
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> usize {
        self.default
    }

    pub fn value_index(&self, value: &str) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }

    pub fn value_name(&self, value: usize) -> &str {
        self.values.get(value).map_or("<invalid>", String::as_str)
    }

    pub fn transfer_table_mut(&mut self) -> &mut StateCombinationTable {
        &mut self.transfer
    }

    pub fn merge_table_mut(&mut self) -> &mut StateCombinationTable {
        &mut self.merge
    }

    pub fn transfer(&self, from: usize, to: usize) -> (usize, Option<&str>) {
        self.transfer.lookup(from, to)
    }

    pub fn merge(&self, a: usize, b: usize) -> (usize, Option<&str>) {
        self.merge.lookup_symmetric(a, b)
    }

    pub fn describe(&self, value: &StateValue) -> String {
        if value.implicit {
            format!("implicitly {}", self.value_name(value.value))
        } else {
            self.value_name(value.value).to_string()
        }
    }
}

/// Set of meta-states known to one analysis run.
#[derive(Debug, Clone, Default)]
pub struct MetaStateRegistry {
    states: Vec<MetaStateInfo>,
}

impl MetaStateRegistry {
    pub fn from_decls(decls: &[MetaStateDecl]) -> RefStateResult<Self> {
        let mut registry = Self::default();
        for decl in decls {
            registry.register(MetaStateInfo::from_decl(decl)?)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, info: MetaStateInfo) -> RefStateResult<()> {
        if self.get(info.name()).is_some() {
            return Err(RefStateError::config(format!(
                "meta-state {} declared twice",
                info.name()
            )));
        }
        self.states.push(info);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&MetaStateInfo> {
        self.states.iter().find(|s| s.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetaStateInfo> {
        self.states.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Values a freshly created reference starts with.
    pub fn initial_table(&self) -> ValueTable {
        let mut table = ValueTable::default();
        for info in &self.states {
            table.values.insert(
                info.name().to_string(),
                StateValue {
                    value: info.default_value(),
                    implicit: true,
                    history: History::new(),
                },
            );
        }
        table
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateValue {
    pub value: usize,
    pub implicit: bool,
    pub history: History,
}

impl StateValue {
    pub fn update(&mut self, value: usize, loc: Option<FileLoc>) {
        self.value = value;
        self.implicit = false;
        self.history.record(loc, StateAction::Changed, None);
    }
}

/// Meta-state values of one reference, keyed by meta-state name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueTable {
    values: BTreeMap<String, StateValue>,
}

/// A merge that the merge table rejects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaMergeConflict {
    pub state: String,
    pub message: String,
}

impl ValueTable {
    pub fn get(&self, name: &str) -> Option<&StateValue> {
        self.values.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut StateValue> {
        self.values.get_mut(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: StateValue) {
        self.values.insert(name.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StateValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Join with the values reaching the same point along another path.
    pub fn merge(
        &mut self,
        other: &ValueTable,
        registry: &MetaStateRegistry,
        loc: Option<FileLoc>,
    ) -> Vec<MetaMergeConflict> {
        let mut conflicts = Vec::new();
        for (name, theirs) in &other.values {
            if !self.values.contains_key(name) {
                self.values.insert(name.clone(), theirs.clone());
                continue;
            }
            let Some(ours) = self.values.get_mut(name) else {
                continue;
            };
            if ours.value == theirs.value {
                ours.implicit &= theirs.implicit;
                continue;
            }
            let Some(info) = registry.get(name) else {
                continue;
            };
            let (value, message) = info.merge(ours.value, theirs.value);
            if let Some(message) = message {
                conflicts.push(MetaMergeConflict {
                    state: name.clone(),
                    message: message.to_string(),
                });
            }
            ours.value = value;
            ours.implicit = false;
            ours.history.merge(&theirs.history, loc);
        }
        conflicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_state() -> MetaStateInfo {
        let decl = MetaStateDecl {
            name: "file".into(),
            values: vec!["open".into(), "closed".into()],
            default: Some("closed".into()),
            transfers: vec![TableEntryDecl {
                from: "closed".into(),
                to: "open".into(),
                result: "closed".into(),
                error: Some("Closed file passed as open file".into()),
            }],
            merges: vec![TableEntryDecl {
                from: "open".into(),
                to: "closed".into(),
                result: "open".into(),
                error: Some("File open on one path only".into()),
            }],
        };
        MetaStateInfo::from_decl(&decl).expect("valid declaration")
    }

    #[test]
    fn transfer_table_reports_declared_errors() {
        let info = file_state();
        assert_eq!(info.default_value(), 1);
        let (value, msg) = info.transfer(1, 0);
        assert_eq!(value, 1);
        assert_eq!(msg, Some("Closed file passed as open file"));
        assert_eq!(info.transfer(0, 0), (0, None));
    }

    #[test]
    fn merge_table_is_consulted_in_both_orders() {
        let info = file_state();
        assert_eq!(info.merge(1, 0), (0, Some("File open on one path only")));
        assert_eq!(info.merge(0, 1), (0, Some("File open on one path only")));
    }

    #[test]
    fn unknown_value_name_is_a_config_error() {
        let decl = MetaStateDecl {
            name: "lock".into(),
            values: vec!["held".into()],
            default: Some("released".into()),
            transfers: vec![],
            merges: vec![],
        };
        let err = MetaStateInfo::from_decl(&decl).unwrap_err();
        assert!(err.to_string().contains("no value named released"));
    }
}
