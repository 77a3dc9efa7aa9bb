//! Employee management: records plus their dynamic attribute sets.
//!
//! Employee rows and attributes live behind different ports. Attribute
//! writes go through the [`AttributeReconciler`] so each employee's set is
//! replaced atomically. Updates rewrite the row inside that same unit of
//! work. Creation needs the row id first, so a failed reconciliation
//! deletes the new row again.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::try_join_all;
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::domain::attributes::{
    AttributeName, AttributeReconciler, AttributeWithValues, Cardinality, DesiredAttributes,
    UniquenessValidator, map_store_error,
};
use crate::domain::ports::{
    AttributeSetQuery, AttributeStore, AttributeUnitOfWork, EmployeeRepository,
    EmployeeRepositoryError,
};
use crate::domain::{
    Employee, EmployeeDraft, EmployeeId, EmployeePage, EmployeeWithAttributes, Error,
    Identification,
};

/// Largest page [`EmployeeService::list_page`] returns.
pub const MAX_PAGE_LIMIT: u32 = 100;

fn map_employee_error(error: EmployeeRepositoryError) -> Error {
    match error {
        EmployeeRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("employee repository unavailable: {message}"))
        }
        EmployeeRepositoryError::Query { message } => {
            Error::internal(format!("employee repository error: {message}"))
        }
        EmployeeRepositoryError::DuplicateIdentification { kind, number } => {
            identification_conflict(&kind, &number)
        }
    }
}

fn identification_conflict(kind: &str, number: &str) -> Error {
    Error::conflict(format!(
        "identification {kind} {number} belongs to another employee"
    ))
    .with_details(json!({
        "identificationType": kind,
        "identificationNumber": number,
        "code": "duplicate_identification",
    }))
}

fn employee_not_found(id: EmployeeId) -> Error {
    Error::not_found(format!("employee {id} not found"))
}

/// Keep the code of `error` and flag that the new row `id` was left behind.
fn cleanup_failed(error: Error, id: EmployeeId, cleanup: &EmployeeRepositoryError) -> Error {
    let mut details = match error.details() {
        Some(Value::Object(existing)) => existing.clone(),
        _ => Map::new(),
    };
    details.insert("cleanupFailed".into(), Value::Bool(true));
    details.insert("employeeId".into(), json!(id.get()));
    Error::new(
        error.code(),
        format!(
            "{}; removing employee {id} afterwards also failed: {cleanup}",
            error.message()
        ),
    )
    .with_details(Value::Object(details))
}

/// Rewrite the employee row through the unit-of-work store.
async fn rewrite_row(
    store: &dyn AttributeStore,
    id: EmployeeId,
    draft: &EmployeeDraft,
) -> Result<(), Error> {
    store
        .rewrite(id, draft)
        .await
        .map_err(map_employee_error)?
        .ok_or_else(|| employee_not_found(id))?;
    Ok(())
}

/// Service implementing employee create, read, update and delete.
pub struct EmployeeService<E, U: ?Sized, Q> {
    employees: Arc<E>,
    attributes: Arc<Q>,
    reconciler: AttributeReconciler<U>,
}

impl<E, U: ?Sized, Q> Clone for EmployeeService<E, U, Q> {
    fn clone(&self) -> Self {
        Self {
            employees: Arc::clone(&self.employees),
            attributes: Arc::clone(&self.attributes),
            reconciler: self.reconciler.clone(),
        }
    }
}

impl<E, U: ?Sized, Q> EmployeeService<E, U, Q> {
    /// Create a service from its ports and uniqueness rules.
    pub fn new(
        employees: Arc<E>,
        unit_of_work: Arc<U>,
        attributes: Arc<Q>,
        validator: UniquenessValidator,
    ) -> Self {
        Self {
            employees,
            attributes,
            reconciler: AttributeReconciler::new(unit_of_work, validator),
        }
    }
}

impl<E, U, Q> EmployeeService<E, U, Q>
where
    E: EmployeeRepository,
    U: AttributeUnitOfWork + ?Sized,
    Q: AttributeSetQuery,
{
    async fn ensure_identification_free(
        &self,
        identification: &Identification,
        owner: Option<EmployeeId>,
    ) -> Result<(), Error> {
        let holder = self
            .employees
            .find_by_identification(identification)
            .await
            .map_err(map_employee_error)?;
        match holder {
            Some(other) if Some(other.id) != owner => Err(identification_conflict(
                identification.kind(),
                identification.number(),
            )),
            _ => Ok(()),
        }
    }

    async fn require_employee(&self, id: EmployeeId) -> Result<Employee, Error> {
        self.employees
            .find_by_id(id)
            .await
            .map_err(map_employee_error)?
            .ok_or_else(|| employee_not_found(id))
    }

    async fn attributes_of(&self, owner: EmployeeId) -> Result<Vec<AttributeWithValues>, Error> {
        self.attributes
            .attributes_of(owner)
            .await
            .map_err(map_store_error)
    }

    async fn with_attributes(&self, employee: Employee) -> Result<EmployeeWithAttributes, Error> {
        let attributes = self.attributes_of(employee.id).await?;
        Ok(EmployeeWithAttributes {
            employee,
            attributes,
        })
    }

    async fn load(&self, id: EmployeeId) -> Result<Option<EmployeeWithAttributes>, Error> {
        match self
            .employees
            .find_by_id(id)
            .await
            .map_err(map_employee_error)?
        {
            Some(employee) => self.with_attributes(employee).await.map(Some),
            None => Ok(None),
        }
    }

    /// Create an employee and give it the `desired` attribute set.
    ///
    /// When reconciliation fails the new row is deleted again and the
    /// reconciliation error is returned. If that delete fails too, the
    /// error details carry `cleanupFailed` and the leftover `employeeId`.
    pub async fn create_with_attributes(
        &self,
        draft: EmployeeDraft,
        desired: DesiredAttributes,
    ) -> Result<EmployeeWithAttributes, Error> {
        self.ensure_identification_free(&draft.identification, None)
            .await?;
        let employee = self
            .employees
            .create(&draft)
            .await
            .map_err(map_employee_error)?;

        if let Err(error) = self.reconciler.reconcile(employee.id, desired).await {
            warn!(
                employee_id = %employee.id,
                error = %error,
                "attribute reconciliation failed; removing new employee"
            );
            return match self.employees.delete(employee.id).await {
                Ok(_) => Err(error),
                Err(cleanup) => {
                    warn!(
                        employee_id = %employee.id,
                        error = %cleanup,
                        "failed to remove employee after reconciliation error"
                    );
                    Err(cleanup_failed(error, employee.id, &cleanup))
                }
            };
        }

        info!(employee_id = %employee.id, "employee created");
        self.with_attributes(employee).await
    }

    /// Replace an employee's fields and attribute set.
    ///
    /// The row rewrite runs in the same unit of work as the reconciliation,
    /// so a failure in either leaves both untouched.
    pub async fn update_with_attributes(
        &self,
        id: EmployeeId,
        draft: EmployeeDraft,
        desired: DesiredAttributes,
    ) -> Result<EmployeeWithAttributes, Error> {
        self.require_employee(id).await?;
        self.ensure_identification_free(&draft.identification, Some(id))
            .await?;
        self.reconciler
            .reconcile_then(id, desired, move |store| {
                async move { rewrite_row(store, id, &draft).await }.boxed()
            })
            .await?;

        info!(employee_id = %id, "employee updated");
        let employee = self.require_employee(id).await?;
        self.with_attributes(employee).await
    }

    /// Reconcile only the attribute set of an existing employee.
    pub async fn reconcile_attributes(
        &self,
        id: EmployeeId,
        desired: DesiredAttributes,
    ) -> Result<Vec<AttributeWithValues>, Error> {
        self.require_employee(id).await?;
        self.reconciler.reconcile(id, desired).await?;
        self.attributes_of(id).await
    }

    /// Delete an employee. Its definitions and values go with it.
    pub async fn delete(&self, id: EmployeeId) -> Result<(), Error> {
        let removed = self
            .employees
            .delete(id)
            .await
            .map_err(map_employee_error)?;
        if !removed {
            return Err(employee_not_found(id));
        }
        info!(employee_id = %id, "employee deleted");
        Ok(())
    }

    /// Employee with attributes.
    pub async fn get_with_attributes(
        &self,
        id: EmployeeId,
    ) -> Result<EmployeeWithAttributes, Error> {
        self.load(id)
            .await?
            .ok_or_else(|| employee_not_found(id))
    }

    /// Employee with attributes, looked up by identification document.
    pub async fn get_with_attributes_by_identification(
        &self,
        kind: &str,
        number: &str,
    ) -> Result<EmployeeWithAttributes, Error> {
        let identification = Identification::new(kind, number)?;
        let employee = self
            .employees
            .find_by_identification(&identification)
            .await
            .map_err(map_employee_error)?
            .ok_or_else(|| {
                Error::not_found(format!(
                    "no employee with identification {} {}",
                    identification.kind(),
                    identification.number()
                ))
            })?;
        self.with_attributes(employee).await
    }

    /// Attribute set of an existing employee.
    pub async fn attributes(&self, id: EmployeeId) -> Result<Vec<AttributeWithValues>, Error> {
        self.require_employee(id).await?;
        self.attributes_of(id).await
    }

    /// Employees whose identification number starts with `prefix`.
    pub async fn search_by_identification_number(
        &self,
        prefix: &str,
    ) -> Result<Vec<Employee>, Error> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(Error::invalid_request("search prefix must not be empty"));
        }
        self.employees
            .search_by_identification_number(prefix)
            .await
            .map_err(map_employee_error)
    }

    /// One page of employees. `limit` must be positive and is capped at
    /// [`MAX_PAGE_LIMIT`].
    pub async fn list_page(&self, limit: u32, offset: u32) -> Result<EmployeePage, Error> {
        if limit == 0 {
            return Err(Error::invalid_request("limit must be greater than zero"));
        }
        let limit = limit.min(MAX_PAGE_LIMIT);
        let employees = self
            .employees
            .list_page(limit, offset)
            .await
            .map_err(map_employee_error)?;
        let total = self
            .employees
            .count()
            .await
            .map_err(map_employee_error)?;
        Ok(EmployeePage {
            employees,
            total,
            limit,
            offset,
        })
    }

    /// Load many employees concurrently.
    ///
    /// Unknown ids are skipped and repeated ids collapse. The result is
    /// ordered by descending id whatever order the lookups finish in.
    pub async fn fetch_many(
        &self,
        ids: &[EmployeeId],
    ) -> Result<Vec<EmployeeWithAttributes>, Error> {
        let unique: BTreeSet<EmployeeId> = ids.iter().copied().collect();
        let loaded = try_join_all(unique.into_iter().map(|id| self.load(id))).await?;
        let mut found: Vec<EmployeeWithAttributes> = loaded.into_iter().flatten().collect();
        found.sort_by(|a, b| b.employee.id.cmp(&a.employee.id));
        Ok(found)
    }

    /// Explicitly retag one attribute of an employee.
    ///
    /// Reconciliation never downgrades `multiple`; this is the path that
    /// can, and it fails with a conflict while more than one value exists.
    pub async fn set_attribute_cardinality(
        &self,
        owner: EmployeeId,
        name: &str,
        cardinality: Cardinality,
    ) -> Result<(), Error> {
        let name = AttributeName::new(name).map_err(|reason| {
            Error::invalid_request(format!("invalid attribute name: {reason}"))
                .with_details(json!({ "field": "name" }))
        })?;
        self.require_employee(owner).await?;
        self.reconciler.set_cardinality(owner, name, cardinality).await?;
        info!(employee_id = %owner, ?cardinality, "attribute cardinality changed");
        Ok(())
    }
}

#[cfg(test)]
#[path = "employee_service_tests.rs"]
mod tests;
