//! Login and password-reset lookups.

use std::sync::Arc;

use tracing::{debug, info};

use super::permission_aggregator::PermissionAggregator;
use crate::domain::attributes::map_store_error;
use crate::domain::auth::{AuthenticatedEmployee, LoginCredentials, PasswordResetContact};
use crate::domain::ports::{
    AttributeSetQuery, CredentialVerifier, EmployeeRepository, EmployeeRepositoryError,
    PermissionRuleRepository, RoleRepository,
};
use crate::domain::{Employee, Error, ErrorCode, Identification};

const REJECTED: &str = "invalid credentials";
const EMAIL_ATTRIBUTE: &str = "email";

/// Ports the authentication service reads from.
pub struct AuthPorts<E, Q, R, P, C> {
    /// Employee records.
    pub employees: Arc<E>,
    /// Attribute read model.
    pub attributes: Arc<Q>,
    /// Roles.
    pub roles: Arc<R>,
    /// Permission rules.
    pub rules: Arc<P>,
    /// External credential check.
    pub verifier: Arc<C>,
}

/// Authenticates employees and resolves their permission manifest.
pub struct AuthService<E, Q, R, P, C> {
    employees: Arc<E>,
    attributes: Arc<Q>,
    verifier: Arc<C>,
    aggregator: PermissionAggregator<R, P>,
}

impl<E, Q, R, P, C> AuthService<E, Q, R, P, C> {
    /// Create the service from its ports.
    pub fn new(ports: AuthPorts<E, Q, R, P, C>) -> Self {
        let AuthPorts {
            employees,
            attributes,
            roles,
            rules,
            verifier,
        } = ports;
        Self {
            employees,
            attributes,
            verifier,
            aggregator: PermissionAggregator::new(roles, rules),
        }
    }
}

impl<E, Q, R, P, C> AuthService<E, Q, R, P, C>
where
    E: EmployeeRepository,
    Q: AttributeSetQuery,
    R: RoleRepository,
    P: PermissionRuleRepository,
    C: CredentialVerifier,
{
    fn map_employee_error(error: EmployeeRepositoryError) -> Error {
        match error {
            EmployeeRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("employee repository unavailable: {message}"))
            }
            other => Error::internal(format!("employee repository error: {other}")),
        }
    }

    async fn find_employee(
        &self,
        identification: &Identification,
    ) -> Result<Option<Employee>, Error> {
        self.employees
            .find_by_identification(identification)
            .await
            .map_err(Self::map_employee_error)
    }

    /// Verify credentials and build the authenticated view.
    ///
    /// Unknown identification, wrong password, disabled login, a missing
    /// role and a dangling role all fail with the same `unauthorized` error.
    pub async fn authenticate(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<AuthenticatedEmployee, Error> {
        let Some(employee) = self.find_employee(credentials.identification()).await? else {
            debug!("login rejected: unknown identification");
            return Err(Error::unauthorized(REJECTED));
        };

        let verified = self
            .verifier
            .verify(employee.id, credentials.password())
            .await
            .map_err(|error| Error::service_unavailable(error.to_string()))?;
        if !verified {
            debug!(employee_id = %employee.id, "login rejected: password mismatch");
            return Err(Error::unauthorized(REJECTED));
        }
        if !employee.login_enabled {
            debug!(employee_id = %employee.id, "login rejected: login disabled");
            return Err(Error::unauthorized(REJECTED));
        }
        let Some(role_id) = employee.role_id else {
            debug!(employee_id = %employee.id, "login rejected: no role assigned");
            return Err(Error::unauthorized(REJECTED));
        };

        let (role, permissions) = match self.aggregator.role_with_manifest(role_id).await {
            Ok(found) => found,
            Err(error) if error.code() == ErrorCode::NotFound => {
                debug!(
                    employee_id = %employee.id,
                    role_id = %role_id,
                    "login rejected: role missing"
                );
                return Err(Error::unauthorized(REJECTED));
            }
            Err(error) => return Err(error),
        };

        info!(employee_id = %employee.id, role_id = %role_id, "employee authenticated");
        Ok(AuthenticatedEmployee {
            id: employee.id,
            names: employee.names,
            lastnames: employee.lastnames,
            identification: employee.identification,
            role_id,
            role_name: role.name,
            permissions,
        })
    }

    /// Resolve who should receive a password-reset message.
    ///
    /// Fails with `not_found` when the employee is unknown or has no
    /// non-blank `email` attribute.
    pub async fn password_reset_contact(
        &self,
        kind: &str,
        number: &str,
    ) -> Result<PasswordResetContact, Error> {
        let identification = Identification::new(kind, number)?;
        let employee = self
            .find_employee(&identification)
            .await?
            .ok_or_else(|| Error::not_found("no employee with that identification"))?;
        let attributes = self
            .attributes
            .attributes_of(employee.id)
            .await
            .map_err(map_store_error)?;
        let email = attributes
            .into_iter()
            .find(|attribute| attribute.name.as_str() == EMAIL_ATTRIBUTE)
            .and_then(|attribute| {
                attribute
                    .values
                    .into_iter()
                    .find(|value| !value.trim().is_empty())
            })
            .ok_or_else(|| Error::not_found("employee has no email address"))?;

        Ok(PasswordResetContact {
            employee_id: employee.id,
            email,
        })
    }
}
