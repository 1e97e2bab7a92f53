//! Static registry of the diagnostics the engine can raise.
//!
//! Each diagnostic kind is a `&'static CheckDescriptor`; its effective level
//! comes from [`CheckSettings`], which is fed from the `[checks]` table of the
//! configuration file.

use crate::level::CheckLevel;
use std::collections::HashMap;

/// Classification of checks by the state dimension they guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CheckCategory {
    Definition,
    Null,
    Memory,
    Aliasing,
    Exposure,
    Merge,
    MetaState,
    /// Search budget exhaustion (precision loss, never a program fact).
    Limit,
}

impl CheckCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckCategory::Definition => "definition",
            CheckCategory::Null => "null",
            CheckCategory::Memory => "memory",
            CheckCategory::Aliasing => "aliasing",
            CheckCategory::Exposure => "exposure",
            CheckCategory::Merge => "merge",
            CheckCategory::MetaState => "meta_state",
            CheckCategory::Limit => "limit",
        }
    }
}

#[derive(Debug)]
pub struct CheckDescriptor {
    pub name: &'static str,
    pub category: CheckCategory,
    pub description: &'static str,
}

impl CheckDescriptor {
    pub const fn new(
        name: &'static str,
        category: CheckCategory,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            category,
            description,
        }
    }
}

pub static USE_DEF: CheckDescriptor = CheckDescriptor::new(
    "usedef",
    CheckCategory::Definition,
    "Storage used before it is defined, or after it is released",
);

pub static COMP_DEF: CheckDescriptor = CheckDescriptor::new(
    "compdef",
    CheckCategory::Definition,
    "Storage not completely defined where a contract requires it",
);

pub static NULL_DEREF: CheckDescriptor = CheckDescriptor::new(
    "nullderef",
    CheckCategory::Null,
    "Dereference of a possibly null pointer",
);

pub static NULL_PASS: CheckDescriptor = CheckDescriptor::new(
    "nullpass",
    CheckCategory::Null,
    "Possibly null storage passed where non-null storage is expected",
);

pub static NULL_STATE: CheckDescriptor = CheckDescriptor::new(
    "nullstate",
    CheckCategory::Null,
    "Storage does not have the null state a contract requires",
);

pub static USE_RELEASED: CheckDescriptor = CheckDescriptor::new(
    "usereleased",
    CheckCategory::Memory,
    "Storage used after it was released",
);

pub static MUST_FREE_ONLY: CheckDescriptor = CheckDescriptor::new(
    "mustfreeonly",
    CheckCategory::Memory,
    "Storage allocated over live storage that was never released",
);

pub static ONLY_TRANS: CheckDescriptor = CheckDescriptor::new(
    "onlytrans",
    CheckCategory::Aliasing,
    "Storage without the only discipline passed where only storage is expected",
);

pub static SHARED_TRANS: CheckDescriptor = CheckDescriptor::new(
    "sharedtrans",
    CheckCategory::Aliasing,
    "Storage without the shared discipline passed where shared storage is expected",
);

pub static DEPENDENT_TRANS: CheckDescriptor = CheckDescriptor::new(
    "dependenttrans",
    CheckCategory::Aliasing,
    "Storage without the dependent discipline passed where dependent storage is expected",
);

pub static OWNED_TRANS: CheckDescriptor = CheckDescriptor::new(
    "ownedtrans",
    CheckCategory::Aliasing,
    "Storage without the owned discipline passed where owned storage is expected",
);

pub static OBSERVER_TRANS: CheckDescriptor = CheckDescriptor::new(
    "observertrans",
    CheckCategory::Exposure,
    "Observer status of storage does not match the contract",
);

pub static EXPOSE_TRANS: CheckDescriptor = CheckDescriptor::new(
    "exposetrans",
    CheckCategory::Exposure,
    "Exposed status of storage does not match the contract",
);

pub static BRANCH_STATE: CheckDescriptor = CheckDescriptor::new(
    "branchstate",
    CheckCategory::Merge,
    "Storage has incompatible states on the paths reaching a join",
);

pub static STATE_TRANSFER: CheckDescriptor = CheckDescriptor::new(
    "statetransfer",
    CheckCategory::MetaState,
    "Meta-state transfer rejected by its transfer table",
);

pub static STATE_MERGE: CheckDescriptor = CheckDescriptor::new(
    "statemerge",
    CheckCategory::MetaState,
    "Meta-state values rejected by its merge table at a join",
);

pub static SEARCH_LIMIT: CheckDescriptor = CheckDescriptor::new(
    "search_limit",
    CheckCategory::Limit,
    "A bounded search reached its limit and returned a partial answer",
);

static ALL_CHECKS: &[&CheckDescriptor] = &[
    &USE_DEF,
    &COMP_DEF,
    &NULL_DEREF,
    &NULL_PASS,
    &NULL_STATE,
    &USE_RELEASED,
    &MUST_FREE_ONLY,
    &ONLY_TRANS,
    &SHARED_TRANS,
    &DEPENDENT_TRANS,
    &OWNED_TRANS,
    &OBSERVER_TRANS,
    &EXPOSE_TRANS,
    &BRANCH_STATE,
    &STATE_TRANSFER,
    &STATE_MERGE,
    &SEARCH_LIMIT,
];

pub fn all_checks() -> &'static [&'static CheckDescriptor] {
    ALL_CHECKS
}

pub fn find_check(name: &str) -> Option<&'static CheckDescriptor> {
    ALL_CHECKS.iter().copied().find(|c| c.name == name)
}

/// Per-check level overrides. Checks without an override report at `Warn`.
#[derive(Debug, Clone, Default)]
pub struct CheckSettings {
    levels: HashMap<String, CheckLevel>,
}

impl CheckSettings {
    #[must_use]
    pub fn with_config_levels(mut self, levels: HashMap<String, CheckLevel>) -> Self {
        self.levels.extend(levels);
        self
    }

    #[must_use]
    pub fn disable(mut self, disabled: impl IntoIterator<Item = String>) -> Self {
        for name in disabled {
            self.levels.insert(name, CheckLevel::Allow);
        }
        self
    }

    pub fn level_for(&self, check_name: &str) -> CheckLevel {
        self.levels.get(check_name).copied().unwrap_or_default()
    }

    /// Names in the overrides that match no registered check.
    pub fn unknown_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .levels
            .keys()
            .map(String::as_str)
            .filter(|n| find_check(n).is_none())
            .collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name() {
        assert_eq!(find_check("usedef").map(|c| c.name), Some("usedef"));
        assert!(find_check("no_such_check").is_none());
    }

    #[test]
    fn disable_wins_over_default() {
        let settings = CheckSettings::default().disable(vec!["nullderef".to_string()]);
        assert_eq!(settings.level_for("nullderef"), CheckLevel::Allow);
        assert_eq!(settings.level_for("usedef"), CheckLevel::Warn);
    }

    #[test]
    fn unknown_override_names_are_listed() {
        let mut levels = HashMap::new();
        levels.insert("bogus".to_string(), CheckLevel::Error);
        levels.insert("usedef".to_string(), CheckLevel::Error);
        let settings = CheckSettings::default().with_config_levels(levels);
        assert_eq!(settings.unknown_names(), vec!["bogus"]);
    }
}
