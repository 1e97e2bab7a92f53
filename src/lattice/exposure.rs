use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a reference leaks a view of encapsulated storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Exposure {
    #[default]
    Unknown,
    Normal,
    Exposed,
    Observer,
}

impl Exposure {
    pub const ALL: [Exposure; 4] = [
        Exposure::Unknown,
        Exposure::Normal,
        Exposure::Exposed,
        Exposure::Observer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Exposure::Unknown => "unknown",
            Exposure::Normal => "unexposed",
            Exposure::Exposed => "exposed",
            Exposure::Observer => "observer",
        }
    }

    pub fn is_known(self) -> bool {
        self != Exposure::Unknown
    }

    /// Disagreeing branches leave the storage read-only.
    pub fn join(self, other: Exposure) -> Exposure {
        match (self, other) {
            (a, b) if a == b => a,
            (Exposure::Unknown, x) | (x, Exposure::Unknown) => x,
            _ => Exposure::Observer,
        }
    }

    /// Exposure of storage derived from a reference with this exposure.
    pub fn derive(self, inner: Exposure) -> Exposure {
        if self.is_known() { self } else { inner }
    }
}

impl fmt::Display for Exposure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
