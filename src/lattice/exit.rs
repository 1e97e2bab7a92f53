use serde::{Deserialize, Serialize};

/// How control may leave a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExitKind {
    Error,
    #[default]
    Unknown,
    NeverEscape,
    Goto,
    MayGoto,
    MayExit,
    MustExit,
    /// Exits when the governing condition is true.
    TrueExit,
    /// Exits when the governing condition is false.
    FalseExit,
    MustReturn,
    MayReturn,
    MayReturnExit,
    MustReturnExit,
}

impl ExitKind {
    pub fn make_conditional(self) -> ExitKind {
        match self {
            ExitKind::TrueExit | ExitKind::FalseExit | ExitKind::MustExit => ExitKind::MayExit,
            ExitKind::MustReturn => ExitKind::MayReturn,
            ExitKind::MustReturnExit => ExitKind::MayReturnExit,
            ExitKind::Goto => ExitKind::MayGoto,
            k => k,
        }
    }

    pub fn could_exit(self) -> bool {
        matches!(
            self,
            ExitKind::MayExit
                | ExitKind::MustExit
                | ExitKind::TrueExit
                | ExitKind::FalseExit
                | ExitKind::MayReturnExit
                | ExitKind::MustReturnExit
                | ExitKind::Goto
                | ExitKind::MayGoto
        )
    }

    pub fn could_return(self) -> bool {
        matches!(
            self,
            ExitKind::MustReturn
                | ExitKind::MayReturn
                | ExitKind::MayReturnExit
                | ExitKind::MustReturnExit
        )
    }

    pub fn could_escape(self) -> bool {
        self.could_exit() || self.could_return()
    }

    /// Control never falls through to the next statement.
    pub fn must_escape(self) -> bool {
        matches!(
            self,
            ExitKind::MustExit | ExitKind::MustReturn | ExitKind::MustReturnExit | ExitKind::Goto
        )
    }

    /// Exit kind of a statement whose paths end in `self` and `other`.
    pub fn combine(self, other: ExitKind) -> ExitKind {
        use ExitKind::*;

        if self == other {
            return self;
        }
        if other == Error {
            return Error;
        }
        match self {
            Error => Error,
            Unknown | NeverEscape => other.make_conditional(),
            MustExit => match other {
                MustReturnExit | MustReturn => MustReturnExit,
                MayReturnExit | MayReturn => MayReturnExit,
                _ => MayExit,
            },
            MayExit | TrueExit | FalseExit => match other {
                MustReturnExit | MayReturnExit | MayReturn | MustReturn => MayReturnExit,
                _ => MayExit,
            },
            MustReturn => match other {
                MustReturnExit | MustExit => MustReturnExit,
                MayReturnExit | TrueExit | FalseExit | MayExit => MayReturnExit,
                _ => MayReturn,
            },
            MayReturn => {
                if other.could_exit() {
                    MayReturnExit
                } else {
                    MayReturn
                }
            }
            MustReturnExit => match other {
                MustReturn | MustExit => MustReturnExit,
                _ => MayReturnExit,
            },
            MayReturnExit => MayReturnExit,
            Goto | MayGoto => {
                if other.could_exit() {
                    MayReturnExit
                } else {
                    MayGoto
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_and_return_must_escape() {
        let k = ExitKind::MustExit.combine(ExitKind::MustReturn);
        assert_eq!(k, ExitKind::MustReturnExit);
        assert!(k.must_escape());
    }

    #[test]
    fn fallthrough_makes_exit_conditional() {
        assert_eq!(
            ExitKind::NeverEscape.combine(ExitKind::MustExit),
            ExitKind::MayExit
        );
        assert_eq!(
            ExitKind::MustReturn.combine(ExitKind::NeverEscape),
            ExitKind::MayReturn
        );
        assert_eq!(ExitKind::MayExit.combine(ExitKind::Error), ExitKind::Error);
    }
}
