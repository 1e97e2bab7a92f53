//! Flow-sensitive reference-state tracking for a C static checker.
//!
//! The crate models every storage location a checker can name as a reference
//! in a [`reference::RefArena`], tracks its definedness, null-ness, aliasing
//! discipline and exposure along each control-flow path, and joins those
//! states where paths meet. [`context::CheckContext`] is the entry point for a
//! front end; the other modules are the pieces it is built from.

pub mod alias;
pub mod check;
pub mod config;
pub mod context;
pub mod contract;
pub mod ctype;
pub mod diagnostics;
pub mod error;
pub mod guard;
pub mod history;
pub mod lattice;
pub mod level;
pub mod limits;
pub mod meta_state;
pub mod reference;
pub mod telemetry;

pub use alias::AliasTable;
pub use config::RefStateConfig;
pub use context::{CheckContext, PathState};
pub use contract::{ClauseKind, ContractClause, Qualifier, Timing};
pub use diagnostics::{Diagnostic, FileLoc};
pub use error::{RefStateError, RefStateResult};
pub use guard::GuardSet;
pub use lattice::{AliasKind, BranchKind, Definedness, Exposure, NullState};
pub use reference::{RefArena, RefId};
