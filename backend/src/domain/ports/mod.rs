//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod attribute_set_query;
mod attribute_store;
mod attribute_unit_of_work;
mod credential_verifier;
mod employee_repository;
mod role_repository;

#[cfg(test)]
pub use attribute_set_query::MockAttributeSetQuery;
pub use attribute_set_query::AttributeSetQuery;
#[cfg(test)]
pub use attribute_store::{
    MockAttributeDefinitionStore, MockAttributeOwnerLookup, MockAttributeValueStore,
};
pub use attribute_store::{
    AttributeDefinitionStore, AttributeOwnerLookup, AttributeStore, AttributeStoreError,
    AttributeValueStore,
};
pub use attribute_unit_of_work::{AttributeUnitOfWork, AttributeWork, attribute_work};
#[cfg(test)]
pub use credential_verifier::MockCredentialVerifier;
pub use credential_verifier::{CredentialVerifier, CredentialVerifierError, RejectAllCredentials};
#[cfg(test)]
pub use employee_repository::MockEmployeeRepository;
pub use employee_repository::{EmployeeRecordWriter, EmployeeRepository, EmployeeRepositoryError};
#[cfg(test)]
pub use role_repository::{MockPermissionRuleRepository, MockRoleRepository};
pub use role_repository::{PermissionRuleRepository, RoleRepository, RoleRepositoryError};
