//! Port for employee record persistence.

use async_trait::async_trait;

use crate::domain::{Employee, EmployeeDraft, EmployeeId, Identification};

use super::define_port_error;

define_port_error! {
    /// Errors raised by employee repository adapters.
    pub enum EmployeeRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "employee repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "employee repository query failed: {message}",
        /// Another employee already holds the identification document.
        DuplicateIdentification { kind: String, number: String } =>
            "identification {kind} {number} is already registered",
    }
}

/// Port for storing and reading employee records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    /// Insert a new employee and return the stored record.
    async fn create(&self, draft: &EmployeeDraft) -> Result<Employee, EmployeeRepositoryError>;

    /// Replace the fields of `id`. Returns `None` when no such employee exists.
    async fn update(
        &self,
        id: EmployeeId,
        draft: &EmployeeDraft,
    ) -> Result<Option<Employee>, EmployeeRepositoryError>;

    /// Delete `id` together with its attributes. Returns whether a row went away.
    async fn delete(&self, id: EmployeeId) -> Result<bool, EmployeeRepositoryError>;

    /// Fetch one employee.
    async fn find_by_id(&self, id: EmployeeId) -> Result<Option<Employee>, EmployeeRepositoryError>;

    /// Fetch the employee holding an identification document.
    async fn find_by_identification(
        &self,
        identification: &Identification,
    ) -> Result<Option<Employee>, EmployeeRepositoryError>;

    /// Employees whose identification number starts with `prefix`, by id.
    async fn search_by_identification_number(
        &self,
        prefix: &str,
    ) -> Result<Vec<Employee>, EmployeeRepositoryError>;

    /// One page of employees ordered by ascending id.
    async fn list_page(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Employee>, EmployeeRepositoryError>;

    /// Number of stored employees.
    async fn count(&self) -> Result<u64, EmployeeRepositoryError>;
}

/// Employee row writes that join an open unit of work.
///
/// Unlike [`EmployeeRepository::update`], a rewrite issued through the store
/// handed to [`AttributeWork`](super::AttributeWork) commits or rolls back
/// together with the attribute writes of the same unit.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmployeeRecordWriter: Send + Sync {
    /// Replace the fields of `id`. Returns `None` when no such employee exists.
    async fn rewrite(
        &self,
        id: EmployeeId,
        draft: &EmployeeDraft,
    ) -> Result<Option<Employee>, EmployeeRepositoryError>;
}
