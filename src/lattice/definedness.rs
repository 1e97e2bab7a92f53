use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether the value held by a reference may be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Definedness {
    #[default]
    Unknown,
    Unusable,
    Undefined,
    MaybeUndefined,
    Allocated,
    PartiallyDefined,
    Defined,
    Partial,
    Dead,
    ProbablyDead,
    Fixed,
    RelDef,
    UndefBeforeCall,
    KilledAfterCall,
    UndefAndKilled,
    Special,
}

impl Definedness {
    pub const ALL: [Definedness; 16] = [
        Definedness::Unknown,
        Definedness::Unusable,
        Definedness::Undefined,
        Definedness::MaybeUndefined,
        Definedness::Allocated,
        Definedness::PartiallyDefined,
        Definedness::Defined,
        Definedness::Partial,
        Definedness::Dead,
        Definedness::ProbablyDead,
        Definedness::Fixed,
        Definedness::RelDef,
        Definedness::UndefBeforeCall,
        Definedness::KilledAfterCall,
        Definedness::UndefAndKilled,
        Definedness::Special,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Definedness::Unknown => "unknown",
            Definedness::Unusable => "unuseable",
            Definedness::Undefined => "undefined",
            Definedness::MaybeUndefined => "possibly undefined",
            Definedness::Allocated => "allocated",
            Definedness::PartiallyDefined => "partially defined",
            Definedness::Defined => "defined",
            Definedness::Partial => "partial",
            Definedness::Dead => "dead",
            Definedness::ProbablyDead => "probably dead",
            Definedness::Fixed => "unmodifiable",
            Definedness::RelDef => "reldef",
            Definedness::UndefBeforeCall => "undefglob",
            Definedness::KilledAfterCall => "killed",
            Definedness::UndefAndKilled => "undefkilled",
            Definedness::Special => "special",
        }
    }

    /// States holding a usable (possibly incomplete) value.
    pub fn is_defined_like(self) -> bool {
        matches!(
            self,
            Definedness::Defined
                | Definedness::Allocated
                | Definedness::PartiallyDefined
                | Definedness::Partial
                | Definedness::Fixed
                | Definedness::RelDef
        )
    }

    pub fn is_undefined_like(self) -> bool {
        matches!(
            self,
            Definedness::Undefined | Definedness::MaybeUndefined | Definedness::UndefBeforeCall
        )
    }

    pub fn is_dead(self) -> bool {
        matches!(self, Definedness::Dead | Definedness::KilledAfterCall)
    }

    pub fn is_possibly_dead(self) -> bool {
        matches!(
            self,
            Definedness::Dead
                | Definedness::ProbablyDead
                | Definedness::KilledAfterCall
                | Definedness::UndefAndKilled
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Definedness::Dead | Definedness::Unusable)
    }

    /// Position in the fallback join order; every state has a distinct rank.
    fn severity(self) -> u8 {
        match self {
            Definedness::Unknown => 0,
            Definedness::Defined => 1,
            Definedness::RelDef => 2,
            Definedness::Fixed => 3,
            Definedness::PartiallyDefined => 4,
            Definedness::Partial => 5,
            Definedness::Allocated => 6,
            Definedness::Special => 7,
            Definedness::UndefBeforeCall => 8,
            Definedness::MaybeUndefined => 9,
            Definedness::Undefined => 10,
            Definedness::KilledAfterCall => 11,
            Definedness::UndefAndKilled => 12,
            Definedness::ProbablyDead => 13,
            Definedness::Dead => 14,
            Definedness::Unusable => 15,
        }
    }

    /// Join of the two states reaching a control-flow merge.
    pub fn join(self, other: Definedness) -> Definedness {
        if self == other {
            return self;
        }
        let (lo, hi) = if self.severity() <= other.severity() {
            (self, other)
        } else {
            (other, self)
        };

        match (lo, hi) {
            (Definedness::Unknown, x) => x,
            (Definedness::MaybeUndefined, Definedness::Undefined) => Definedness::MaybeUndefined,
            (x, Definedness::Undefined | Definedness::MaybeUndefined) if x.is_defined_like() => {
                Definedness::MaybeUndefined
            }
            (Definedness::Undefined, Definedness::Dead) => Definedness::Unusable,
            (x, Definedness::Dead) if x.is_defined_like() || x == Definedness::MaybeUndefined => {
                Definedness::ProbablyDead
            }
            (_, hi) => hi,
        }
    }
}

impl fmt::Display for Definedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defined_and_undefined_widen() {
        assert_eq!(
            Definedness::Defined.join(Definedness::Undefined),
            Definedness::MaybeUndefined
        );
        assert_eq!(
            Definedness::Undefined.join(Definedness::MaybeUndefined),
            Definedness::MaybeUndefined
        );
    }

    #[test]
    fn dead_joins() {
        assert_eq!(
            Definedness::Dead.join(Definedness::Undefined),
            Definedness::Unusable
        );
        assert_eq!(
            Definedness::Defined.join(Definedness::Dead),
            Definedness::ProbablyDead
        );
    }

    #[test]
    fn allocation_dominates_defined() {
        assert_eq!(
            Definedness::Defined.join(Definedness::Allocated),
            Definedness::Allocated
        );
        assert_eq!(
            Definedness::PartiallyDefined.join(Definedness::Defined),
            Definedness::PartiallyDefined
        );
    }
}
