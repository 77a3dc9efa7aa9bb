//! Desired attribute mapping handed to the reconciler.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::Deserialize;
use serde_json::Value;

use super::{AttributeName, AttributeNameError};
use crate::domain::Error;

/// Errors raised while building a [`DesiredAttributes`] mapping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DesiredAttributesError {
    /// The payload was not a JSON object.
    #[error("attributes must be an object mapping names to value lists")]
    NotAnObject,
    /// An attribute name failed validation.
    #[error("invalid attribute name '{name}': {reason}")]
    InvalidName {
        /// Raw name as supplied.
        name: String,
        /// Validation failure.
        reason: AttributeNameError,
    },
    /// Two raw names normalised to the same attribute.
    #[error("attribute '{name}' is listed more than once")]
    DuplicateName {
        /// Normalised name.
        name: String,
    },
    /// The entry for a name was neither a list nor null.
    #[error("attribute '{name}' must map to a list of strings")]
    NotAList {
        /// Attribute name.
        name: String,
    },
    /// A list element was not a string.
    #[error("attribute '{name}' contains a non-string value")]
    NonStringValue {
        /// Attribute name.
        name: String,
    },
}

impl From<DesiredAttributesError> for Error {
    fn from(error: DesiredAttributesError) -> Self {
        let details = match &error {
            DesiredAttributesError::NotAnObject => serde_json::json!({ "field": "attributes" }),
            DesiredAttributesError::InvalidName { name, .. }
            | DesiredAttributesError::DuplicateName { name }
            | DesiredAttributesError::NotAList { name }
            | DesiredAttributesError::NonStringValue { name } => {
                serde_json::json!({ "field": "attributes", "attribute": name })
            }
        };
        Error::invalid_request(error.to_string()).with_details(details)
    }
}

/// Full desired attribute set for one employee: name to ordered values.
///
/// Names absent from the mapping are removed by reconciliation. A name
/// mapped to an empty list keeps its definition with no values.
///
/// # Examples
/// ```
/// use personnel::domain::attributes::DesiredAttributes;
///
/// let desired = DesiredAttributes::from_pairs([
///     ("phone", vec!["555-1", "555-2"]),
///     ("email", vec!["ada@example.com"]),
/// ])
/// .unwrap();
/// assert_eq!(desired.len(), 2);
/// assert!(desired.contains("phone"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Value")]
pub struct DesiredAttributes {
    entries: BTreeMap<AttributeName, Vec<String>>,
}

impl DesiredAttributes {
    /// Empty mapping; reconciling with it removes every attribute.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from name/value-list pairs.
    pub fn from_pairs<K, I, V>(
        pairs: impl IntoIterator<Item = (K, I)>,
    ) -> Result<Self, DesiredAttributesError>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let mut entries = BTreeMap::new();
        for (raw_name, values) in pairs {
            let name = parse_name(raw_name.as_ref())?;
            let values = values.into_iter().map(Into::into).collect();
            insert_unique(&mut entries, name, values)?;
        }
        Ok(Self { entries })
    }

    /// Build from a JSON object whose entries are string lists or `null`.
    ///
    /// `null` is read as an empty list.
    pub fn from_json(value: &Value) -> Result<Self, DesiredAttributesError> {
        let object = value
            .as_object()
            .ok_or(DesiredAttributesError::NotAnObject)?;
        let mut entries = BTreeMap::new();
        for (raw_name, raw_values) in object {
            let name = parse_name(raw_name)?;
            let values = match raw_values {
                Value::Null => Vec::new(),
                Value::Array(items) => items
                    .iter()
                    .map(|item| {
                        item.as_str().map(str::to_owned).ok_or_else(|| {
                            DesiredAttributesError::NonStringValue {
                                name: name.to_string(),
                            }
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                _ => {
                    return Err(DesiredAttributesError::NotAList {
                        name: name.to_string(),
                    });
                }
            };
            insert_unique(&mut entries, name, values)?;
        }
        Ok(Self { entries })
    }

    /// Values requested for `name`.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        AttributeName::new(name)
            .ok()
            .and_then(|key| self.entries.get(&key))
            .map(Vec::as_slice)
    }

    /// Whether `name` is part of the desired set.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Whether the typed `name` is part of the desired set.
    pub fn contains_name(&self, name: &AttributeName) -> bool {
        self.entries.contains_key(name)
    }

    /// Entries in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, AttributeName, Vec<String>> {
        self.entries.iter()
    }

    /// Number of attribute names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no names are desired.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a DesiredAttributes {
    type Item = (&'a AttributeName, &'a Vec<String>);
    type IntoIter = btree_map::Iter<'a, AttributeName, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl TryFrom<Value> for DesiredAttributes {
    type Error = DesiredAttributesError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_json(&value)
    }
}

fn parse_name(raw: &str) -> Result<AttributeName, DesiredAttributesError> {
    AttributeName::new(raw).map_err(|reason| DesiredAttributesError::InvalidName {
        name: raw.to_owned(),
        reason,
    })
}

fn insert_unique(
    entries: &mut BTreeMap<AttributeName, Vec<String>>,
    name: AttributeName,
    values: Vec<String>,
) -> Result<(), DesiredAttributesError> {
    match entries.entry(name) {
        btree_map::Entry::Occupied(occupied) => Err(DesiredAttributesError::DuplicateName {
            name: occupied.key().to_string(),
        }),
        btree_map::Entry::Vacant(vacant) => {
            vacant.insert(values);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn from_json_reads_lists_and_nulls() {
        let desired = DesiredAttributes::from_json(&json!({
            "phone": ["555-1", "555-2"],
            "nickname": null,
        }))
        .expect("valid mapping");

        assert_eq!(
            desired.get("phone"),
            Some(&["555-1".to_owned(), "555-2".to_owned()][..])
        );
        assert_eq!(desired.get("nickname"), Some(&[][..]));
    }

    #[rstest]
    #[case(json!(["email"]), DesiredAttributesError::NotAnObject)]
    #[case(json!({"email": "a@b"}), DesiredAttributesError::NotAList { name: "email".into() })]
    #[case(json!({"email": [1]}), DesiredAttributesError::NonStringValue { name: "email".into() })]
    fn from_json_rejects_malformed_payloads(
        #[case] payload: Value,
        #[case] expected: DesiredAttributesError,
    ) {
        assert_eq!(DesiredAttributes::from_json(&payload), Err(expected));
    }

    #[rstest]
    fn from_pairs_rejects_names_colliding_after_trim() {
        let result = DesiredAttributes::from_pairs([("email", vec!["a"]), (" email", vec!["b"])]);
        assert_eq!(
            result,
            Err(DesiredAttributesError::DuplicateName {
                name: "email".into()
            })
        );
    }

    #[rstest]
    fn validation_errors_become_invalid_requests() {
        let error: Error = DesiredAttributesError::NonStringValue {
            name: "email".into(),
        }
        .into();
        assert_eq!(error.code(), ErrorCode::InvalidRequest);
        assert_eq!(
            error.details(),
            Some(&json!({"field": "attributes", "attribute": "email"}))
        );
    }

    #[rstest]
    fn deserialises_from_json_text() {
        let desired: DesiredAttributes =
            serde_json::from_str(r#"{"email": ["ada@example.com"]}"#).expect("parse mapping");
        assert!(desired.contains("email"));
        assert_eq!(desired.len(), 1);
    }
}
