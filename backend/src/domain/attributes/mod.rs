//! Dynamic employee attributes (entity-attribute-value).
//!
//! Each employee owns an open-ended set of named attributes. A name is
//! backed by one [`AttributeDefinition`] row tagged with a [`Cardinality`],
//! and zero or more [`AttributeValue`] rows.
//!
//! ## Invariants
//! - A `single` definition never holds more than one value.
//! - `(owner, name)` identifies at most one live definition.
//! - Values never outlive their definition.
//! - A name listed in [`UniqueAttributeNames`] maps a given value to at most
//!   one employee.

mod desired;
mod reconciler;
mod uniqueness;

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{DefinitionId, EmployeeId, Error, ValueId};
use crate::domain::ports::AttributeStoreError;

pub use self::desired::{DesiredAttributes, DesiredAttributesError};
pub use self::reconciler::{AttributeReconciler, reconcile_within};
pub use self::uniqueness::{UniqueAttributeNames, UniquenessValidator};

/// Maximum length of an attribute name.
pub const ATTRIBUTE_NAME_MAX: usize = 64;

static ATTRIBUTE_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn attribute_name_regex() -> &'static Regex {
    ATTRIBUTE_NAME_RE.get_or_init(|| {
        Regex::new("^[A-Za-z0-9_.-]+$")
            .unwrap_or_else(|error| panic!("attribute name regex failed to compile: {error}"))
    })
}

/// Validation errors for [`AttributeName`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttributeNameError {
    /// Name was blank.
    #[error("attribute name must not be empty")]
    Empty,
    /// Name exceeded [`ATTRIBUTE_NAME_MAX`] characters.
    #[error("attribute name must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// Name contained characters outside `[A-Za-z0-9_.-]`.
    #[error("attribute name may only contain letters, digits, '_', '.' or '-'")]
    InvalidCharacters,
}

/// Admin-defined attribute name such as `email` or `phone`.
///
/// # Examples
/// ```
/// use personnel::domain::attributes::AttributeName;
///
/// let name = AttributeName::new(" email ").unwrap();
/// assert_eq!(name.as_ref(), "email");
/// assert!(AttributeName::new("two words").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AttributeName(String);

impl AttributeName {
    /// Trim and validate a raw name.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, AttributeNameError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(AttributeNameError::Empty);
        }
        if trimmed.chars().count() > ATTRIBUTE_NAME_MAX {
            return Err(AttributeNameError::TooLong {
                max: ATTRIBUTE_NAME_MAX,
            });
        }
        if !attribute_name_regex().is_match(trimmed) {
            return Err(AttributeNameError::InvalidCharacters);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the name.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for AttributeName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<AttributeName> for String {
    fn from(value: AttributeName) -> Self {
        value.0
    }
}

impl TryFrom<String> for AttributeName {
    type Error = AttributeNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Whether a definition accepts one or many concurrent values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// At most one value.
    Single,
    /// Any number of values.
    Multiple,
}

impl Cardinality {
    /// Cardinality implied by a write carrying `count` values.
    ///
    /// ```
    /// use personnel::domain::attributes::Cardinality;
    ///
    /// assert_eq!(Cardinality::for_value_count(0), Cardinality::Single);
    /// assert_eq!(Cardinality::for_value_count(1), Cardinality::Single);
    /// assert_eq!(Cardinality::for_value_count(2), Cardinality::Multiple);
    /// ```
    pub const fn for_value_count(count: usize) -> Self {
        if count > 1 { Self::Multiple } else { Self::Single }
    }

    /// Merge a stored cardinality with a requested one.
    ///
    /// `Multiple` is sticky: once a definition is multiple, a later write
    /// with fewer values never turns it back into `Single`.
    pub const fn merge(self, requested: Self) -> Self {
        match (self, requested) {
            (Self::Single, Self::Single) => Self::Single,
            _ => Self::Multiple,
        }
    }

    /// `true` for [`Cardinality::Multiple`].
    pub const fn is_multiple(self) -> bool {
        matches!(self, Self::Multiple)
    }

    /// Storage flag representation.
    pub const fn from_multiple_flag(multiple: bool) -> Self {
        if multiple { Self::Multiple } else { Self::Single }
    }

    /// Whether `count` values fit this cardinality.
    pub const fn admits(self, count: usize) -> bool {
        match self {
            Self::Single => count <= 1,
            Self::Multiple => true,
        }
    }
}

/// Attribute definition owned by one employee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDefinition {
    /// Primary key.
    pub id: DefinitionId,
    /// Owning employee.
    pub owner_id: EmployeeId,
    /// Attribute name, unique per owner.
    pub name: AttributeName,
    /// Cardinality tag.
    pub cardinality: Cardinality,
}

/// One stored value of a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValue {
    /// Primary key.
    pub id: ValueId,
    /// Definition the value belongs to.
    pub definition_id: DefinitionId,
    /// Raw string value.
    pub value: String,
}

/// Read model of one attribute with its values in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeWithValues {
    /// Attribute name.
    pub name: AttributeName,
    /// Cardinality tag.
    pub cardinality: Cardinality,
    /// Values, oldest first.
    pub values: Vec<String>,
}

/// Map attribute store failures onto the domain taxonomy.
pub fn map_store_error(error: AttributeStoreError) -> Error {
    match error {
        AttributeStoreError::Connection { message } => {
            Error::service_unavailable(format!("attribute store unavailable: {message}"))
        }
        AttributeStoreError::Query { message } => {
            Error::internal(format!("attribute store error: {message}"))
        }
        AttributeStoreError::DefinitionNotFound { id } => {
            Error::not_found(format!("attribute definition {id} not found"))
        }
        AttributeStoreError::CardinalityConflict { id, values } => Error::conflict(format!(
            "attribute definition {id} holds {values} values and cannot be single"
        ))
        .with_details(serde_json::json!({
            "definitionId": id,
            "values": values,
            "code": "cardinality_conflict",
        })),
    }
}
