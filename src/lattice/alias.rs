use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Ownership/sharing discipline without the implicit marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Discipline {
    Unknown,
    Error,
    Only,
    Keep,
    Kept,
    Temp,
    Shared,
    Unique,
    Returned,
    Fresh,
    Stack,
    RefCounted,
    Refs,
    KillRef,
    NewRef,
    Owned,
    Dependent,
    Static,
    Local,
}

impl Discipline {
    fn name(self) -> &'static str {
        match self {
            Discipline::Unknown => "unqualified",
            Discipline::Error => "<error>",
            Discipline::Only => "only",
            Discipline::Keep => "keep",
            Discipline::Kept => "kept",
            Discipline::Temp => "temp",
            Discipline::Shared => "shared",
            Discipline::Unique => "unique",
            Discipline::Returned => "returned",
            Discipline::Fresh => "fresh",
            Discipline::Stack => "stack",
            Discipline::RefCounted => "refcounted",
            Discipline::Refs => "refs",
            Discipline::KillRef => "killref",
            Discipline::NewRef => "newref",
            Discipline::Owned => "owned",
            Discipline::Dependent => "dependent",
            Discipline::Static => "unqualified static",
            Discipline::Local => "local",
        }
    }
}

/// Alias discipline of a reference.
///
/// `implicit` marks a discipline reached through a default rather than an
/// annotation. Equality and hashing ignore it; only display consults it.
#[derive(Debug, Clone, Copy, Eq, Serialize, Deserialize)]
pub struct AliasKind {
    pub discipline: Discipline,
    #[serde(default)]
    pub implicit: bool,
}

impl PartialEq for AliasKind {
    fn eq(&self, other: &Self) -> bool {
        self.discipline == other.discipline
    }
}

impl Hash for AliasKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.discipline.hash(state);
    }
}

impl Default for AliasKind {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl From<Discipline> for AliasKind {
    fn from(discipline: Discipline) -> Self {
        Self::explicit(discipline)
    }
}

impl AliasKind {
    pub const UNKNOWN: AliasKind = AliasKind::explicit(Discipline::Unknown);
    pub const ERROR: AliasKind = AliasKind::explicit(Discipline::Error);
    pub const ONLY: AliasKind = AliasKind::explicit(Discipline::Only);
    pub const IMPLICIT_ONLY: AliasKind = AliasKind::implicit(Discipline::Only);
    pub const TEMP: AliasKind = AliasKind::explicit(Discipline::Temp);
    pub const IMPLICIT_TEMP: AliasKind = AliasKind::implicit(Discipline::Temp);
    pub const SHARED: AliasKind = AliasKind::explicit(Discipline::Shared);
    pub const OWNED: AliasKind = AliasKind::explicit(Discipline::Owned);
    pub const DEPENDENT: AliasKind = AliasKind::explicit(Discipline::Dependent);
    pub const IMPLICIT_DEPENDENT: AliasKind = AliasKind::implicit(Discipline::Dependent);
    pub const KEEP: AliasKind = AliasKind::explicit(Discipline::Keep);
    pub const KEPT: AliasKind = AliasKind::explicit(Discipline::Kept);
    pub const FRESH: AliasKind = AliasKind::explicit(Discipline::Fresh);
    pub const LOCAL: AliasKind = AliasKind::explicit(Discipline::Local);
    pub const STACK: AliasKind = AliasKind::explicit(Discipline::Stack);
    pub const STATIC: AliasKind = AliasKind::explicit(Discipline::Static);
    pub const UNIQUE: AliasKind = AliasKind::explicit(Discipline::Unique);

    /// Every distinct value, implicit variants included.
    pub const ALL: [AliasKind; 22] = [
        AliasKind::UNKNOWN,
        AliasKind::ERROR,
        AliasKind::ONLY,
        AliasKind::IMPLICIT_ONLY,
        AliasKind::KEEP,
        AliasKind::KEPT,
        AliasKind::TEMP,
        AliasKind::IMPLICIT_TEMP,
        AliasKind::SHARED,
        AliasKind::UNIQUE,
        AliasKind::explicit(Discipline::Returned),
        AliasKind::FRESH,
        AliasKind::STACK,
        AliasKind::explicit(Discipline::RefCounted),
        AliasKind::explicit(Discipline::Refs),
        AliasKind::explicit(Discipline::KillRef),
        AliasKind::explicit(Discipline::NewRef),
        AliasKind::OWNED,
        AliasKind::DEPENDENT,
        AliasKind::IMPLICIT_DEPENDENT,
        AliasKind::STATIC,
        AliasKind::LOCAL,
    ];

    pub const fn explicit(discipline: Discipline) -> Self {
        Self {
            discipline,
            implicit: false,
        }
    }

    pub const fn implicit(discipline: Discipline) -> Self {
        Self {
            discipline,
            implicit: true,
        }
    }

    /// Identity-level comparison, implicit flag included.
    pub fn is_identical(&self, other: &AliasKind) -> bool {
        self.discipline == other.discipline && self.implicit == other.implicit
    }

    pub fn is_known(&self) -> bool {
        !matches!(self.discipline, Discipline::Unknown | Discipline::Error)
    }

    pub fn is(&self, discipline: Discipline) -> bool {
        self.discipline == discipline
    }

    pub fn as_str(&self) -> String {
        if self.implicit {
            format!("implicitly {}", self.discipline.name())
        } else {
            self.discipline.name().to_string()
        }
    }

    /// Capitalised form used at the start of messages ("Only", "Implicitly only").
    pub fn cap_name(&self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) if first == '<' => "<Error>".to_string(),
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => name,
        }
    }

    /// Whether storage of discipline `self` may be used where `other` is expected.
    pub fn is_compatible(&self, other: &AliasKind) -> bool {
        if self == other {
            return true;
        }
        if self.is(Discipline::Error) || other.is(Discipline::Error) {
            return true;
        }
        match (self.discipline, other.discipline) {
            (Discipline::Unknown, _) => other.implicit,
            (_, Discipline::Unknown) => self.implicit,
            _ => false,
        }
    }

    /// Discipline of storage reached through a reference of discipline `self`
    /// (field, element or pointee), given the child's own discipline `inner`.
    pub fn derive(self, inner: AliasKind) -> AliasKind {
        match self.discipline {
            Discipline::Error | Discipline::Unknown => inner,
            Discipline::Kept
            | Discipline::Keep
            | Discipline::Only
            | Discipline::Owned
            | Discipline::Dependent => {
                if inner.is(Discipline::Shared) {
                    AliasKind::SHARED
                } else if matches!(self.discipline, Discipline::Only | Discipline::Dependent) {
                    AliasKind::implicit(self.discipline)
                } else {
                    self
                }
            }
            Discipline::RefCounted
            | Discipline::NewRef
            | Discipline::KillRef
            | Discipline::Refs
            | Discipline::Stack
            | Discipline::Static => self,
            Discipline::Temp
            | Discipline::Shared
            | Discipline::Unique
            | Discipline::Local
            | Discipline::Fresh
            | Discipline::Returned => {
                if inner.is_known() {
                    inner
                } else {
                    self
                }
            }
        }
    }

    /// Join at a control-flow merge, or `None` when the two disciplines are
    /// incompatible and the merge must be reported.
    pub fn try_join(self, other: AliasKind) -> Option<AliasKind> {
        use Discipline::*;

        if self == other {
            return Some(AliasKind {
                discipline: self.discipline,
                implicit: self.implicit && other.implicit,
            });
        }
        let joined = match (self.discipline, other.discipline) {
            (Error, _) => other,
            (_, Error) => self,
            (Unknown, _) => other,
            (_, Unknown) => self,
            (Unique | Temp, Local) | (Local, Unique | Temp) => AliasKind::LOCAL,
            (Owned, Fresh) | (Fresh, Owned) => AliasKind::FRESH,
            (Keep, Fresh) | (Fresh, Keep) => AliasKind::KEEP,
            (Local, Stack) | (Stack, Local) => AliasKind::STACK,
            (Fresh, Only) | (Only, Fresh) => AliasKind::FRESH,
            (Owned, Only) | (Only, Owned) => AliasKind::OWNED,
            (Kept, Local) | (Local, Kept) => AliasKind::KEPT,
            (Dependent, Kept) | (Kept, Dependent) => AliasKind::KEPT,
            (Dependent, Local | Static | Temp) | (Local | Static | Temp, Dependent) => {
                AliasKind::DEPENDENT
            }
            _ => return None,
        };
        Some(joined)
    }

    /// Total join: incompatible pairs lose their discipline.
    pub fn join(self, other: AliasKind) -> AliasKind {
        self.try_join(other).unwrap_or(AliasKind::UNKNOWN)
    }
}

impl fmt::Display for AliasKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_compares_equal_but_displays_differently() {
        assert_eq!(AliasKind::IMPLICIT_ONLY, AliasKind::ONLY);
        assert!(!AliasKind::IMPLICIT_ONLY.is_identical(&AliasKind::ONLY));
        assert_eq!(AliasKind::IMPLICIT_ONLY.to_string(), "implicitly only");
        assert_eq!(AliasKind::IMPLICIT_ONLY.cap_name(), "Implicitly only");
        assert_eq!(AliasKind::ONLY.cap_name(), "Only");
    }

    #[test]
    fn implicit_join_with_explicit_is_explicit() {
        let joined = AliasKind::IMPLICIT_ONLY.join(AliasKind::ONLY);
        assert!(joined.is_identical(&AliasKind::ONLY));
        let joined = AliasKind::IMPLICIT_TEMP.join(AliasKind::IMPLICIT_TEMP);
        assert!(joined.is_identical(&AliasKind::IMPLICIT_TEMP));
    }

    #[test]
    fn error_is_identity() {
        for k in AliasKind::ALL {
            assert_eq!(AliasKind::ERROR.join(k), k);
        }
    }

    #[test]
    fn derive_through_only_is_implicit_only() {
        let derived = AliasKind::ONLY.derive(AliasKind::UNKNOWN);
        assert!(derived.is_identical(&AliasKind::IMPLICIT_ONLY));
        assert_eq!(AliasKind::ONLY.derive(AliasKind::SHARED), AliasKind::SHARED);
        assert_eq!(AliasKind::TEMP.derive(AliasKind::OWNED), AliasKind::OWNED);
    }

    #[test]
    fn incompatible_pairs_have_no_join() {
        assert_eq!(AliasKind::ONLY.try_join(AliasKind::SHARED), None);
        assert_eq!(AliasKind::ONLY.join(AliasKind::SHARED), AliasKind::UNKNOWN);
    }
}
