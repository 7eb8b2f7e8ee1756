//! Identifiers and binding ids

use super::types::XRType;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A named, typed variable.
///
/// Equality and hashing only look at the name: retyping an identifier never
/// changes which binder it refers to.
#[derive(Debug, Clone)]
pub struct Ident {
    /// Variable name
    pub name: String,
    /// Light type of the value bound to this name
    pub ty: XRType,
}

impl Ident {
    /// Create an identifier
    pub fn new(name: impl Into<String>, ty: XRType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    /// Same name, different type
    pub fn with_type(&self, ty: XRType) -> Self {
        Self {
            name: self.name.clone(),
            ty,
        }
    }

    /// Same type, different name
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: self.ty.clone(),
        }
    }

    /// True for compiler-generated names of the form `[tmp_<alnum>]`
    pub fn is_temporary(&self) -> bool {
        self.name
            .strip_prefix("[tmp_")
            .and_then(|rest| rest.strip_suffix(']'))
            .is_some_and(|middle| {
                !middle.is_empty() && middle.chars().all(|c| c.is_ascii_alphanumeric())
            })
    }
}

impl PartialEq for Ident {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Ident {}

impl Hash for Ident {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Binding id that links a parameter or SQL-expression tag to its runtime value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BID(String);

impl BID {
    /// Fresh random id
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The raw id value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BID {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for BID {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for BID {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for BID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
