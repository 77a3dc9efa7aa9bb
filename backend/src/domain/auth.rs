//! Authentication primitives: login credentials and the authenticated view.
//!
//! Keep inbound payload parsing outside the domain by exposing constructors
//! that validate string inputs before a handler talks to a service.

use std::fmt;

use serde::Serialize;
use zeroize::Zeroizing;

use super::permissions::PermissionManifest;
use super::{EmployeeId, EmployeeValidationError, Identification, RoleId};

/// Domain error returned when login payload values are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginValidationError {
    /// Identification kind or number was blank.
    Identification(EmployeeValidationError),
    /// Password was blank.
    EmptyPassword,
}

impl fmt::Display for LoginValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identification(inner) => write!(f, "{inner}"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
        }
    }
}

impl std::error::Error for LoginValidationError {}

/// Validated login credentials used by the authentication service.
///
/// ## Invariants
/// - The identification is normalised like any stored [`Identification`].
/// - `password` is required to be non-empty but retains caller-provided
///   whitespace to avoid surprising credential comparisons.
///
/// # Examples
/// ```
/// use personnel::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts("cc", "1020", "secret").unwrap();
/// assert_eq!(creds.identification().kind(), "CC");
/// assert_eq!(creds.password(), "secret");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    identification: Identification,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw identification and password inputs.
    pub fn try_from_parts(
        kind: &str,
        number: &str,
        password: &str,
    ) -> Result<Self, LoginValidationError> {
        let identification =
            Identification::new(kind, number).map_err(LoginValidationError::Identification)?;

        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }

        Ok(Self {
            identification,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Identification used to look the employee up.
    pub fn identification(&self) -> &Identification {
        &self.identification
    }

    /// Password string provided by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// Employee view returned after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedEmployee {
    /// Employee key.
    pub id: EmployeeId,
    /// Given names.
    pub names: String,
    /// Family names.
    pub lastnames: String,
    /// Identification document.
    pub identification: Identification,
    /// Assigned role.
    pub role_id: RoleId,
    /// Display name of the role.
    pub role_name: String,
    /// Grouped permissions of the role.
    pub permissions: PermissionManifest,
}

/// Everything the password-reset mailer needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetContact {
    /// Employee requesting the reset.
    pub employee_id: EmployeeId,
    /// Address held in the employee's `email` attribute.
    pub email: String,
}
