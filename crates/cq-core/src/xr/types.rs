//! Light type annotations carried by XR nodes
//!
//! These are not a type system. They only record whether a value is a
//! scalar, a boolean or a row (product) so that later phases can pick the
//! right SQL rendering.

use std::fmt;

/// Light type attached to identifiers, entities and calls
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum XRType {
    /// Plain scalar value
    Value,
    /// A boolean that is stored as a value (a column)
    BooleanValue,
    /// A boolean produced by a predicate (comparison, logical operator)
    BooleanExpression,
    /// A row with named fields
    Product {
        /// Name of the row type (table or record name)
        name: String,
        /// Ordered fields
        fields: Vec<(String, XRType)>,
    },
    /// Nothing is known yet
    Generic,
}

impl XRType {
    /// Build a product type from field names and types
    pub fn product(name: impl Into<String>, fields: Vec<(String, XRType)>) -> Self {
        XRType::Product {
            name: name.into(),
            fields,
        }
    }

    /// True for row types
    pub fn is_product(&self) -> bool {
        matches!(self, XRType::Product { .. })
    }

    /// True for scalars (including both boolean flavours)
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            XRType::Value | XRType::BooleanValue | XRType::BooleanExpression
        )
    }

    /// True for either boolean flavour
    pub fn is_boolean(&self) -> bool {
        matches!(self, XRType::BooleanValue | XRType::BooleanExpression)
    }

    /// Look up a field of a product type
    pub fn field(&self, name: &str) -> Option<&XRType> {
        match self {
            XRType::Product { fields, .. } => fields
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, ty)| ty),
            _ => None,
        }
    }

    /// Merge fresher type information from `other` into `self`.
    ///
    /// `BooleanValue` wins over `BooleanExpression` and `Value`, products are
    /// merged field by field (fields missing on either side are kept) and
    /// `Generic` never overrides anything.
    pub fn retype_from(&self, other: &XRType) -> XRType {
        match (self, other) {
            (_, XRType::Generic) => self.clone(),
            (XRType::Generic, _) => other.clone(),
            (
                XRType::Product { name, fields },
                XRType::Product {
                    name: other_name,
                    fields: other_fields,
                },
            ) => {
                let mut merged: Vec<(String, XRType)> = fields
                    .iter()
                    .map(|(field, ty)| match other_fields.iter().find(|(f, _)| f == field) {
                        Some((_, other_ty)) => (field.clone(), ty.retype_from(other_ty)),
                        None => (field.clone(), ty.clone()),
                    })
                    .collect();
                for (field, ty) in other_fields {
                    if !fields.iter().any(|(f, _)| f == field) {
                        merged.push((field.clone(), ty.clone()));
                    }
                }
                let name = if other_name.is_empty() {
                    name.clone()
                } else {
                    other_name.clone()
                };
                XRType::Product {
                    name,
                    fields: merged,
                }
            }
            (XRType::BooleanValue, XRType::BooleanExpression | XRType::Value)
            | (XRType::BooleanExpression | XRType::Value, XRType::BooleanValue) => {
                XRType::BooleanValue
            }
            _ => other.clone(),
        }
    }
}

impl fmt::Display for XRType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XRType::Value => write!(f, "Value"),
            XRType::BooleanValue => write!(f, "BooleanValue"),
            XRType::BooleanExpression => write!(f, "BooleanExpression"),
            XRType::Generic => write!(f, "Generic"),
            XRType::Product { name, fields } => {
                write!(f, "{}(", name)?;
                for (i, (field, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field, ty)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
