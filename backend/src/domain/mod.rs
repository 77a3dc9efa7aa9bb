//! Domain primitives, aggregates and services.
//!
//! Purpose: Define strongly typed personnel entities and the services that
//! operate on them through the ports in [`ports`]. Keep types immutable and
//! document invariants and serialisation contracts (serde) in each type's
//! Rustdoc.
//!
//! Public surface:
//! - Error (alias to `error::Error`): transport-agnostic error payload.
//! - ErrorCode (alias to `error::ErrorCode`): stable error identifier.
//! - Employee, EmployeeDraft, Identification: fixed employee fields.
//! - attributes: dynamic per-employee attributes and their reconciler.
//! - permissions: roles, rules and the permission manifest.
//! - EmployeeService, RoleService, AuthService, PermissionAggregator.

pub mod attributes;
pub mod auth;
pub mod auth_service;
pub mod employee;
pub mod employee_service;
pub mod error;
pub mod ids;
pub mod permission_aggregator;
pub mod permissions;
pub mod ports;
pub mod role_service;

pub use self::auth::{
    AuthenticatedEmployee, LoginCredentials, LoginValidationError, PasswordResetContact,
};
pub use self::auth_service::{AuthPorts, AuthService};
pub use self::employee::{
    Employee, EmployeeDraft, EmployeePage, EmployeeValidationError, EmployeeWithAttributes,
    Identification,
};
pub use self::employee_service::{EmployeeService, MAX_PAGE_LIMIT};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::ids::{DefinitionId, EmployeeId, PermissionRuleId, RoleId, ValueId};
pub use self::permission_aggregator::PermissionAggregator;
pub use self::role_service::RoleService;

/// Convenient service result alias.
///
/// # Examples
/// ```
/// use personnel::domain::{DomainResult, Error};
///
/// fn lookup() -> DomainResult<u32> {
///     Err(Error::not_found("nope"))
/// }
/// assert!(lookup().is_err());
/// ```
pub type DomainResult<T> = Result<T, Error>;
