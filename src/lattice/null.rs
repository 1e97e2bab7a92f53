use serde::{Deserialize, Serialize};
use std::fmt;

/// Null-ness of a pointer value.
///
/// Declaration order matters: [`NullState::is_possibly_null`] and
/// [`NullState::is_perhaps_null`] are range tests over it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum NullState {
    Error,
    /// Not annotated; treated as implicitly non-null.
    #[default]
    Unknown,
    NotNull,
    MarkedNotNull,
    RelaxedNull,
    ConstNull,
    PossiblyNull,
    DefinitelyNull,
    AbstractNull,
}

impl NullState {
    pub const ALL: [NullState; 9] = [
        NullState::Error,
        NullState::Unknown,
        NullState::NotNull,
        NullState::MarkedNotNull,
        NullState::RelaxedNull,
        NullState::ConstNull,
        NullState::PossiblyNull,
        NullState::DefinitelyNull,
        NullState::AbstractNull,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NullState::Error => "<null error>",
            NullState::Unknown => "implicitly non-null",
            NullState::NotNull => "notnull",
            NullState::MarkedNotNull => "notnull",
            NullState::RelaxedNull => "relnull",
            NullState::ConstNull => "null",
            NullState::PossiblyNull => "possibly null",
            NullState::DefinitelyNull => "null",
            NullState::AbstractNull => "null",
        }
    }

    pub fn is_possibly_null(self) -> bool {
        (NullState::ConstNull..=NullState::AbstractNull).contains(&self)
    }

    pub fn is_perhaps_null(self) -> bool {
        (NullState::RelaxedNull..=NullState::AbstractNull).contains(&self)
    }

    pub fn is_definitely_null(self) -> bool {
        matches!(self, NullState::DefinitelyNull | NullState::ConstNull)
    }

    pub fn is_not_null(self) -> bool {
        matches!(self, NullState::NotNull | NullState::MarkedNotNull)
    }

    pub fn is_known(self) -> bool {
        !matches!(self, NullState::Unknown | NullState::Error)
    }

    pub fn join(self, other: NullState) -> NullState {
        match (self, other) {
            (a, b) if a == b => a,
            (NullState::Error, x) | (x, NullState::Error) => x,
            (NullState::Unknown, x) | (x, NullState::Unknown) => x,
            (NullState::RelaxedNull, _) | (_, NullState::RelaxedNull) => NullState::RelaxedNull,
            (a, b) if a.is_not_null() && b.is_not_null() => NullState::NotNull,
            _ => NullState::PossiblyNull,
        }
    }
}

impl fmt::Display for NullState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn possibly_null_range() {
        let possibly: Vec<_> = NullState::ALL
            .into_iter()
            .filter(|s| s.is_possibly_null())
            .collect();
        assert_eq!(
            possibly,
            vec![
                NullState::ConstNull,
                NullState::PossiblyNull,
                NullState::DefinitelyNull,
                NullState::AbstractNull
            ]
        );
        assert!(NullState::RelaxedNull.is_perhaps_null());
        assert!(!NullState::RelaxedNull.is_possibly_null());
        assert!(!NullState::MarkedNotNull.is_perhaps_null());
    }

    #[test]
    fn not_null_and_possibly_null_join() {
        assert_eq!(
            NullState::NotNull.join(NullState::PossiblyNull),
            NullState::PossiblyNull
        );
        assert_eq!(
            NullState::Error.join(NullState::DefinitelyNull),
            NullState::DefinitelyNull
        );
        assert_eq!(
            NullState::NotNull.join(NullState::DefinitelyNull),
            NullState::PossiblyNull
        );
    }
}
