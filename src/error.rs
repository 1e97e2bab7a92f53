use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Result alias for errors emitted by the reference-state engine.
pub type RefStateResult<T> = Result<T, RefStateError>;

/// Structured error type for engine subsystems.
///
/// Only `Invariant` is raised while analysing a path; it means the engine's
/// own model is incomplete and the current run must stop. Everything that is a
/// fact about the checked program is a [`crate::diagnostics::Diagnostic`].
#[derive(Debug, Error)]
pub enum RefStateError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal invariant violated: {0}")]
    Invariant(String),

    #[error("cannot undump state: {0}")]
    Undump(String),

    #[error("{0}")]
    Other(String),
}

impl RefStateError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    pub fn undump(msg: impl Into<String>) -> Self {
        Self::Undump(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    pub fn is_invariant(&self) -> bool {
        matches!(self, Self::Invariant(_))
    }

    /// Convert to anyhow::Error for interop with anyhow-based code.
    pub fn into_anyhow(self) -> AnyhowError {
        AnyhowError::new(self)
    }
}

impl From<AnyhowError> for RefStateError {
    fn from(err: AnyhowError) -> Self {
        RefStateError::other(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for RefStateError {
    fn from(err: serde_json::Error) -> Self {
        RefStateError::undump(err.to_string())
    }
}

/// Return an internal invariant violation, mirroring `anyhow::bail!`.
#[macro_export]
macro_rules! refstate_bail {
    ($($arg:tt)*) => {
        return Err($crate::error::RefStateError::invariant(format!($($arg)*)))
    };
}

/// Convenience macro mirroring `anyhow::ensure!` for engine invariants.
#[macro_export]
macro_rules! refstate_ensure {
    ($cond:expr, $($arg:tt)*) => {
        if !($cond) {
            $crate::refstate_bail!($($arg)*);
        }
    };
}

/// Utility for pretty printing errors inside tests.
pub fn format_error_chain(err: &RefStateError) -> String {
    format!("{err}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checked(flag: bool) -> RefStateResult<u8> {
        refstate_ensure!(flag, "flag was {}", flag);
        Ok(1)
    }

    #[test]
    fn ensure_raises_invariant() {
        let err = checked(false).unwrap_err();
        assert!(err.is_invariant());
        assert_eq!(
            format_error_chain(&err),
            "internal invariant violated: flag was false"
        );
        assert_eq!(checked(true).unwrap(), 1);
    }

    #[test]
    fn malformed_dump_is_an_undump_error() {
        let parse = serde_json::from_str::<u8>("not a dump").unwrap_err();
        let err = RefStateError::from(parse);
        assert!(matches!(err, RefStateError::Undump(_)));
        assert!(!err.is_invariant());
    }

    #[test]
    fn anyhow_round_trip_keeps_message() {
        let err: RefStateError = anyhow::anyhow!("boom").into();
        assert_eq!(err.to_string(), "boom");
        assert!(err.into_anyhow().to_string().contains("boom"));
    }
}
