//! Abstract state dimensions tracked per reference and their join rules.

pub mod alias;
pub mod definedness;
pub mod exit;
pub mod exposure;
pub mod multival;
pub mod null;

pub use alias::{AliasKind, Discipline};
pub use definedness::Definedness;
pub use exit::ExitKind;
pub use exposure::Exposure;
pub use multival::MultiVal;
pub use null::NullState;

/// Which kind of join a merge performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchKind {
    IfElse,
    LoopBackedge,
    SwitchCase,
    /// The first (taken) branch always exits.
    TrueExit,
    /// The alternate branch always exits.
    FalseExit,
}

impl BranchKind {
    /// Names of the two paths, as used in merge diagnostics.
    pub fn path_names(self) -> (&'static str, &'static str) {
        match self {
            BranchKind::IfElse | BranchKind::TrueExit | BranchKind::FalseExit => {
                ("true branch", "false branch")
            }
            BranchKind::LoopBackedge => ("loop body", "loop entry"),
            BranchKind::SwitchCase => ("one case", "another case"),
        }
    }

    /// Pick the branch kind for an if/else from the exit kinds of its arms.
    pub fn from_exits(taken: ExitKind, alternate: ExitKind) -> BranchKind {
        match (taken.must_escape(), alternate.must_escape()) {
            (true, false) => BranchKind::TrueExit,
            (false, true) => BranchKind::FalseExit,
            _ => BranchKind::IfElse,
        }
    }
}
