//! Employee records and the payloads used to create or update them.

use serde::{Deserialize, Serialize};

use super::attributes::AttributeWithValues;
use super::{EmployeeId, Error, RoleId};

/// Validation errors raised while building employee payloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmployeeValidationError {
    /// Given names were blank.
    #[error("names must not be empty")]
    EmptyNames,
    /// Family names were blank.
    #[error("lastnames must not be empty")]
    EmptyLastnames,
    /// Identification document kind was blank.
    #[error("identification type must not be empty")]
    EmptyIdentificationKind,
    /// Identification document number was blank.
    #[error("identification number must not be empty")]
    EmptyIdentificationNumber,
}

impl From<EmployeeValidationError> for Error {
    fn from(error: EmployeeValidationError) -> Self {
        Error::invalid_request(error.to_string())
    }
}

/// Identity document that uniquely identifies an employee.
///
/// ## Invariants
/// - `kind` is trimmed and upper-cased (`cc`, ` CC ` and `CC` are the same).
/// - `number` is trimmed and non-empty.
///
/// # Examples
/// ```
/// use personnel::domain::Identification;
///
/// let id = Identification::new(" cc ", "1020").unwrap();
/// assert_eq!(id.kind(), "CC");
/// assert_eq!(id.number(), "1020");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identification {
    kind: String,
    number: String,
}

impl Identification {
    /// Validate and normalise an identification pair.
    pub fn new(
        kind: impl AsRef<str>,
        number: impl AsRef<str>,
    ) -> Result<Self, EmployeeValidationError> {
        let kind = kind.as_ref().trim();
        if kind.is_empty() {
            return Err(EmployeeValidationError::EmptyIdentificationKind);
        }
        let number = number.as_ref().trim();
        if number.is_empty() {
            return Err(EmployeeValidationError::EmptyIdentificationNumber);
        }
        Ok(Self {
            kind: kind.to_uppercase(),
            number: number.to_owned(),
        })
    }

    /// Document kind, upper case.
    pub fn kind(&self) -> &str {
        self.kind.as_str()
    }

    /// Document number.
    pub fn number(&self) -> &str {
        self.number.as_str()
    }
}

/// Field values for creating or replacing an employee record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeDraft {
    /// Given names.
    pub names: String,
    /// Family names.
    pub lastnames: String,
    /// Unique identity document.
    pub identification: Identification,
    /// Role used to build the permission manifest at login.
    pub role_id: Option<RoleId>,
    /// Whether the employee may authenticate at all.
    pub login_enabled: bool,
}

impl EmployeeDraft {
    /// Build a draft after trimming and checking the name fields.
    pub fn new(
        names: impl AsRef<str>,
        lastnames: impl AsRef<str>,
        identification: Identification,
    ) -> Result<Self, EmployeeValidationError> {
        let names = names.as_ref().trim();
        if names.is_empty() {
            return Err(EmployeeValidationError::EmptyNames);
        }
        let lastnames = lastnames.as_ref().trim();
        if lastnames.is_empty() {
            return Err(EmployeeValidationError::EmptyLastnames);
        }
        Ok(Self {
            names: names.to_owned(),
            lastnames: lastnames.to_owned(),
            identification,
            role_id: None,
            login_enabled: true,
        })
    }

    /// Assign the employee's role.
    #[must_use]
    pub fn with_role(mut self, role_id: RoleId) -> Self {
        self.role_id = Some(role_id);
        self
    }

    /// Toggle whether the employee may log in.
    #[must_use]
    pub fn with_login_enabled(mut self, login_enabled: bool) -> Self {
        self.login_enabled = login_enabled;
        self
    }
}

/// Persisted employee record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    /// Primary key.
    pub id: EmployeeId,
    /// Given names.
    pub names: String,
    /// Family names.
    pub lastnames: String,
    /// Unique identity document.
    pub identification: Identification,
    /// Assigned role, if any.
    pub role_id: Option<RoleId>,
    /// Whether the employee may authenticate.
    pub login_enabled: bool,
}

impl Employee {
    /// Combine a stored key with draft values.
    pub fn from_draft(id: EmployeeId, draft: EmployeeDraft) -> Self {
        let EmployeeDraft {
            names,
            lastnames,
            identification,
            role_id,
            login_enabled,
        } = draft;
        Self {
            id,
            names,
            lastnames,
            identification,
            role_id,
            login_enabled,
        }
    }
}

/// Employee together with its dynamic attribute set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeWithAttributes {
    /// The employee record.
    #[serde(flatten)]
    pub employee: Employee,
    /// Attributes ordered by name.
    pub attributes: Vec<AttributeWithValues>,
}

/// One page of employees ordered by ascending id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeePage {
    /// Employees on this page.
    pub employees: Vec<Employee>,
    /// Total number of employees in the store.
    pub total: u64,
    /// Requested page size.
    pub limit: u32,
    /// Number of rows skipped.
    pub offset: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "1", EmployeeValidationError::EmptyIdentificationKind)]
    #[case("CC", "  ", EmployeeValidationError::EmptyIdentificationNumber)]
    fn identification_rejects_blank_parts(
        #[case] kind: &str,
        #[case] number: &str,
        #[case] expected: EmployeeValidationError,
    ) {
        assert_eq!(Identification::new(kind, number), Err(expected));
    }

    #[rstest]
    fn identification_kind_is_upper_cased() {
        let id = Identification::new("ti", " 77 ").expect("valid identification");
        assert_eq!(id.kind(), "TI");
        assert_eq!(id.number(), "77");
    }

    #[rstest]
    fn draft_trims_names_and_defaults_login() {
        let id = Identification::new("CC", "1").expect("valid identification");
        let draft = EmployeeDraft::new(" Ada ", "Lovelace", id).expect("valid draft");
        assert_eq!(draft.names, "Ada");
        assert!(draft.login_enabled);
        assert!(draft.role_id.is_none());
    }

    #[rstest]
    fn draft_rejects_blank_lastnames() {
        let id = Identification::new("CC", "1").expect("valid identification");
        let result = EmployeeDraft::new("Ada", " ", id);
        assert_eq!(result, Err(EmployeeValidationError::EmptyLastnames));
    }
}
