//! Literal values known for a reference.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum MultiVal {
    #[default]
    Undefined,
    Int(i64),
    Char(char),
    Double(f64),
    Str(String),
}

impl MultiVal {
    pub fn is_defined(&self) -> bool {
        !matches!(self, MultiVal::Undefined)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            MultiVal::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Unary minus; characters and strings have no negation.
    pub fn invert(&self) -> MultiVal {
        match self {
            MultiVal::Int(v) => v.checked_neg().map_or(MultiVal::Undefined, MultiVal::Int),
            MultiVal::Double(v) => MultiVal::Double(-v),
            _ => MultiVal::Undefined,
        }
    }

    fn int_op(&self, other: &MultiVal, op: impl FnOnce(i64, i64) -> Option<i64>) -> MultiVal {
        match (self.as_int(), other.as_int()) {
            (Some(a), Some(b)) => op(a, b).map_or(MultiVal::Undefined, MultiVal::Int),
            _ => MultiVal::Undefined,
        }
    }

    pub fn add(&self, other: &MultiVal) -> MultiVal {
        self.int_op(other, i64::checked_add)
    }

    pub fn subtract(&self, other: &MultiVal) -> MultiVal {
        self.int_op(other, i64::checked_sub)
    }

    pub fn multiply(&self, other: &MultiVal) -> MultiVal {
        self.int_op(other, i64::checked_mul)
    }

    pub fn divide(&self, other: &MultiVal) -> MultiVal {
        self.int_op(other, |a, b| if b == 0 { None } else { a.checked_div(b) })
    }

    fn kind_rank(&self) -> u8 {
        match self {
            MultiVal::Undefined => 0,
            MultiVal::Int(_) => 1,
            MultiVal::Char(_) => 2,
            MultiVal::Double(_) => 3,
            MultiVal::Str(_) => 4,
        }
    }

    /// Total order: undefined first, then by kind, then by value.
    pub fn compare(&self, other: &MultiVal) -> Ordering {
        match (self, other) {
            (MultiVal::Int(a), MultiVal::Int(b)) => a.cmp(b),
            (MultiVal::Char(a), MultiVal::Char(b)) => a.cmp(b),
            (MultiVal::Double(a), MultiVal::Double(b)) => a.total_cmp(b),
            (MultiVal::Str(a), MultiVal::Str(b)) => a.cmp(b),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }

    /// Values surviving a merge: only agreement is kept.
    pub fn join(&self, other: &MultiVal) -> MultiVal {
        if self.compare(other) == Ordering::Equal {
            self.clone()
        } else {
            MultiVal::Undefined
        }
    }
}

impl fmt::Display for MultiVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MultiVal::Undefined => f.write_str("<undefined>"),
            MultiVal::Int(v) => write!(f, "{v}"),
            MultiVal::Char(c) => write!(f, "'{c}'"),
            MultiVal::Double(v) => write!(f, "{v}"),
            MultiVal::Str(s) => write!(f, "\"{s}\""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_arithmetic() {
        let six = MultiVal::Int(6);
        let two = MultiVal::Int(2);
        assert_eq!(six.add(&two), MultiVal::Int(8));
        assert_eq!(six.subtract(&two), MultiVal::Int(4));
        assert_eq!(six.multiply(&two), MultiVal::Int(12));
        assert_eq!(six.divide(&two), MultiVal::Int(3));
        assert_eq!(six.divide(&MultiVal::Int(0)), MultiVal::Undefined);
        assert_eq!(six.add(&MultiVal::Double(1.0)), MultiVal::Undefined);
    }

    #[test]
    fn join_keeps_only_agreement() {
        assert_eq!(MultiVal::Int(1).join(&MultiVal::Int(1)), MultiVal::Int(1));
        assert_eq!(MultiVal::Int(1).join(&MultiVal::Int(2)), MultiVal::Undefined);
        assert_eq!(MultiVal::Char('a').invert(), MultiVal::Undefined);
        assert_eq!(MultiVal::Int(3).invert(), MultiVal::Int(-3));
    }
}
