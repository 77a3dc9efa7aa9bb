//! Cross-employee uniqueness checks for identifying attributes.

use std::collections::BTreeSet;

use serde_json::json;
use tracing::debug;

use super::{AttributeName, AttributeNameError, DesiredAttributes, map_store_error};
use crate::domain::ports::AttributeOwnerLookup;
use crate::domain::{EmployeeId, Error};

/// Attribute names used when no explicit configuration is given.
pub const DEFAULT_UNIQUE_ATTRIBUTES: [&str; 2] = ["email", "registration_number"];

/// Configured set of attribute names whose values identify one employee.
///
/// # Examples
/// ```
/// use personnel::domain::attributes::UniqueAttributeNames;
///
/// let names = UniqueAttributeNames::parse("email, badge").unwrap();
/// assert!(names.contains_str("badge"));
/// assert!(!names.contains_str("phone"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueAttributeNames(BTreeSet<AttributeName>);

impl UniqueAttributeNames {
    /// Build from already validated names.
    pub fn new(names: impl IntoIterator<Item = AttributeName>) -> Self {
        Self(names.into_iter().collect())
    }

    /// Parse a comma-separated list, skipping blank entries.
    pub fn parse(list: &str) -> Result<Self, AttributeNameError> {
        let names = list
            .split(',')
            .filter(|entry| !entry.trim().is_empty())
            .map(AttributeName::new)
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self(names))
    }

    /// Whether `name` is uniqueness-sensitive.
    pub fn contains(&self, name: &AttributeName) -> bool {
        self.0.contains(name)
    }

    /// Whether the raw `name` is uniqueness-sensitive.
    pub fn contains_str(&self, name: &str) -> bool {
        AttributeName::new(name).is_ok_and(|parsed| self.contains(&parsed))
    }

    /// Names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &AttributeName> {
        self.0.iter()
    }
}

impl Default for UniqueAttributeNames {
    fn default() -> Self {
        Self::new(
            DEFAULT_UNIQUE_ATTRIBUTES
                .iter()
                .filter_map(|name| AttributeName::new(name).ok()),
        )
    }
}

/// Vetoes writes that would hand a unique value to a second employee.
#[derive(Debug, Clone, Default)]
pub struct UniquenessValidator {
    names: UniqueAttributeNames,
}

impl UniquenessValidator {
    /// Create a validator for the given uniqueness-sensitive names.
    pub fn new(names: UniqueAttributeNames) -> Self {
        Self { names }
    }

    /// Configured uniqueness-sensitive names.
    pub fn names(&self) -> &UniqueAttributeNames {
        &self.names
    }

    /// Fail with a conflict when another employee already owns `value`
    /// under `name`. Blank values are always accepted.
    pub async fn check_unique<L>(
        &self,
        lookup: &L,
        name: &AttributeName,
        value: &str,
        exclude_owner: EmployeeId,
    ) -> Result<(), Error>
    where
        L: AttributeOwnerLookup + ?Sized,
    {
        if value.trim().is_empty() {
            return Ok(());
        }

        let holder = lookup
            .find_other_owner(name, value, exclude_owner)
            .await
            .map_err(map_store_error)?;

        match holder {
            None => Ok(()),
            Some(other) => {
                debug!(
                    attribute = %name,
                    owner_id = %exclude_owner,
                    holder_id = %other,
                    "unique attribute value already assigned"
                );
                Err(Error::conflict(format!(
                    "attribute '{name}' value is already assigned to another employee"
                ))
                .with_details(json!({
                    "attribute": name,
                    "code": "duplicate_attribute_value",
                })))
            }
        }
    }

    /// Check every value of every uniqueness-sensitive name in `desired`.
    ///
    /// Pairs are checked once each, in `(name, value)` order, so adapters
    /// that lock per value always acquire their locks in the same order.
    pub async fn check_desired<L>(
        &self,
        lookup: &L,
        owner: EmployeeId,
        desired: &DesiredAttributes,
    ) -> Result<(), Error>
    where
        L: AttributeOwnerLookup + ?Sized,
    {
        let pairs: BTreeSet<(&AttributeName, &str)> = desired
            .iter()
            .filter(|(name, _)| self.names.contains(name))
            .flat_map(|(name, values)| values.iter().map(move |value| (name, value.as_str())))
            .collect();

        for (name, value) in pairs {
            self.check_unique(lookup, name, value, owner).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{AttributeStoreError, MockAttributeOwnerLookup};
    use rstest::rstest;

    fn name(raw: &str) -> AttributeName {
        AttributeName::new(raw).expect("valid attribute name")
    }

    #[rstest]
    fn default_names_cover_email_and_registration_number() {
        let names = UniqueAttributeNames::default();
        assert!(names.contains_str("email"));
        assert!(names.contains_str("registration_number"));
    }

    #[rstest]
    fn parse_rejects_invalid_entries() {
        assert!(UniqueAttributeNames::parse("email,bad name").is_err());
    }

    #[rstest]
    #[tokio::test]
    async fn blank_values_skip_lookup() {
        let mut lookup = MockAttributeOwnerLookup::new();
        lookup.expect_find_other_owner().never();

        let validator = UniquenessValidator::default();
        validator
            .check_unique(&lookup, &name("email"), "   ", EmployeeId::new(1))
            .await
            .expect("blank values are accepted");
    }

    #[rstest]
    #[tokio::test]
    async fn value_held_by_other_employee_conflicts() {
        let mut lookup = MockAttributeOwnerLookup::new();
        lookup
            .expect_find_other_owner()
            .times(1)
            .return_once(|_, _, _| Ok(Some(EmployeeId::new(7))));

        let validator = UniquenessValidator::default();
        let error = validator
            .check_unique(&lookup, &name("email"), "x@y.com", EmployeeId::new(1))
            .await
            .expect_err("conflict expected");

        assert_eq!(error.code(), ErrorCode::Conflict);
        assert!(error.message().contains("email"));
    }

    #[rstest]
    #[tokio::test]
    async fn lookup_failure_is_a_storage_error() {
        let mut lookup = MockAttributeOwnerLookup::new();
        lookup
            .expect_find_other_owner()
            .return_once(|_, _, _| Err(AttributeStoreError::connection("refused")));

        let validator = UniquenessValidator::default();
        let error = validator
            .check_unique(&lookup, &name("email"), "x@y.com", EmployeeId::new(1))
            .await
            .expect_err("storage failure expected");

        assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
    }

    #[rstest]
    #[tokio::test]
    async fn check_desired_only_looks_at_configured_names() {
        let mut lookup = MockAttributeOwnerLookup::new();
        lookup
            .expect_find_other_owner()
            .withf(|attribute, value, owner| {
                attribute.as_str() == "email"
                    && value.to_string() == "a@b.c"
                    && *owner == EmployeeId::new(4)
            })
            .times(1)
            .return_once(|_, _, _| Ok(None));

        let desired = DesiredAttributes::from_pairs([
            ("email", vec!["a@b.c"]),
            ("phone", vec!["555-1", "555-2"]),
        ])
        .expect("valid mapping");

        UniquenessValidator::default()
            .check_desired(&lookup, EmployeeId::new(4), &desired)
            .await
            .expect("no conflicts");
    }

    #[rstest]
    #[tokio::test]
    async fn check_desired_visits_values_sorted_and_once() {
        let mut lookup = MockAttributeOwnerLookup::new();
        let mut seq = mockall::Sequence::new();
        for expected in ["a@b.c", "x@y.z"] {
            lookup
                .expect_find_other_owner()
                .withf(move |_, value, _| value.to_string() == expected)
                .times(1)
                .in_sequence(&mut seq)
                .return_once(|_, _, _| Ok(None));
        }

        let desired = DesiredAttributes::from_pairs([("email", vec!["x@y.z", "a@b.c", "x@y.z"])])
            .expect("valid mapping");

        UniquenessValidator::default()
            .check_desired(&lookup, EmployeeId::new(4), &desired)
            .await
            .expect("no conflicts");
    }
}
