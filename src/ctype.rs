//! The slice of C type information a reference carries.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CType {
    #[default]
    Unknown,
    Void,
    Bool,
    Char,
    Int,
    Float,
    Pointer(Box<CType>),
    Array(Box<CType>, Option<usize>),
    Struct {
        name: String,
        fields: Vec<(String, CType)>,
    },
    Union {
        name: String,
        fields: Vec<(String, CType)>,
    },
    /// Reference to a struct/union by tag, used for self-referential types.
    Tagged(String),
    /// Abstract (opaque) type.
    Abstract(String),
    Function(Box<CType>),
}

impl CType {
    pub fn pointer_to(inner: CType) -> CType {
        CType::Pointer(Box::new(inner))
    }

    pub fn array_of(inner: CType, len: Option<usize>) -> CType {
        CType::Array(Box::new(inner), len)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, CType::Unknown)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, CType::Pointer(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, CType::Array(..))
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self, CType::Abstract(_))
    }

    pub fn is_struct_like(&self) -> bool {
        matches!(self, CType::Struct { .. } | CType::Union { .. } | CType::Tagged(_))
    }

    /// Values of this type may hold references to other storage.
    pub fn is_visibly_sharable(&self) -> bool {
        match self {
            CType::Unknown | CType::Pointer(_) | CType::Array(..) | CType::Abstract(_) => true,
            CType::Struct { fields, .. } | CType::Union { fields, .. } => {
                fields.iter().any(|(_, t)| t.is_visibly_sharable())
            }
            CType::Tagged(_) => true,
            CType::Void | CType::Bool | CType::Char | CType::Int | CType::Float => false,
            CType::Function(_) => false,
        }
    }

    /// Type of `*e` for an expression `e` of this type.
    pub fn pointee(&self) -> CType {
        match self {
            CType::Pointer(inner) | CType::Array(inner, _) => (**inner).clone(),
            _ => CType::Unknown,
        }
    }

    /// Type of `e[i]`.
    pub fn element(&self) -> CType {
        self.pointee()
    }

    /// Type of `e.name`; unknown for unknown fields or opaque tags.
    pub fn field(&self, name: &str) -> CType {
        match self {
            CType::Struct { fields, .. } | CType::Union { fields, .. } => fields
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, t)| t.clone())
                .unwrap_or_default(),
            _ => CType::Unknown,
        }
    }

    /// Types are compatible for aliasing purposes.
    pub fn matches(&self, other: &CType) -> bool {
        self.is_unknown() || other.is_unknown() || self == other
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CType::Unknown => f.write_str("<unknown>"),
            CType::Void => f.write_str("void"),
            CType::Bool => f.write_str("bool"),
            CType::Char => f.write_str("char"),
            CType::Int => f.write_str("int"),
            CType::Float => f.write_str("double"),
            CType::Pointer(inner) => write!(f, "{inner} *"),
            CType::Array(inner, Some(n)) => write!(f, "{inner} [{n}]"),
            CType::Array(inner, None) => write!(f, "{inner} []"),
            CType::Struct { name, .. } => write!(f, "struct {name}"),
            CType::Union { name, .. } => write!(f, "union {name}"),
            CType::Tagged(name) => write!(f, "struct {name}"),
            CType::Abstract(name) => f.write_str(name),
            CType::Function(ret) => write!(f, "{ret} (*)()"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_and_pointee_types() {
        let node = CType::Struct {
            name: "node".into(),
            fields: vec![
                ("val".into(), CType::Int),
                ("next".into(), CType::pointer_to(CType::Tagged("node".into()))),
            ],
        };
        assert_eq!(node.field("val"), CType::Int);
        assert!(node.field("next").is_pointer());
        assert_eq!(node.field("missing"), CType::Unknown);
        assert!(node.is_visibly_sharable());
        assert_eq!(CType::pointer_to(CType::Char).to_string(), "char *");
        assert_eq!(CType::pointer_to(CType::Int).pointee(), CType::Int);
    }
}
