use crate::config::EngineConfig;
use crate::trace_warn;
use std::collections::BTreeSet;

/// Bounded searches whose exhaustion is surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SearchKind {
    AliasClosure,
    AliasedBy,
    LoopUnroll,
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::AliasClosure => "alias closure",
            SearchKind::AliasedBy => "aliased-by",
            SearchKind::LoopUnroll => "loop unrolling",
        }
    }
}

/// Limits of the bounded searches plus the warn-once bookkeeping.
#[derive(Debug, Clone)]
pub struct SearchBudget {
    alias_depth: usize,
    loop_passes: usize,
    warned: BTreeSet<SearchKind>,
    pending: Vec<SearchKind>,
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl SearchBudget {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            alias_depth: config.alias_search_limit,
            loop_passes: config.loop_passes,
            warned: BTreeSet::new(),
            pending: Vec::new(),
        }
    }

    pub fn alias_depth(&self) -> usize {
        self.alias_depth
    }

    pub fn loop_passes(&self) -> usize {
        self.loop_passes
    }

    /// Note that a search of `kind` hit its limit. Returns true the first
    /// time only.
    pub fn exhausted(&mut self, kind: SearchKind) -> bool {
        if !self.warned.insert(kind) {
            return false;
        }
        trace_warn!(search = kind.as_str(), "search limit reached, result is partial");
        self.pending.push(kind);
        true
    }

    pub fn has_warned(&self, kind: SearchKind) -> bool {
        self.warned.contains(&kind)
    }

    /// Exhaustions not yet turned into diagnostics.
    pub fn take_pending(&mut self) -> Vec<SearchKind> {
        std::mem::take(&mut self.pending)
    }
}
