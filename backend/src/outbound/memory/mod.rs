//! In-process adapter implementing every personnel port.
//!
//! [`InMemoryPersonnelStore`] keeps all tables behind one async mutex. It
//! backs the integration tests and local runs without PostgreSQL, and
//! enforces the same constraints as the SQL schema: unique identification,
//! unique role names, cascading deletes and sticky `multiple` cardinality.
//!
//! Units of work copy the attribute tables and employee rows, run against
//! the copies, and swap them in on success. The table lock is held for the
//! whole unit, so units never interleave.

mod attribute_tables;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;
use zeroize::Zeroizing;

use self::attribute_tables::{AttributeTables, StagedAttributes};
use crate::domain::attributes::AttributeWithValues;
use crate::domain::permissions::{PermissionRule, PermissionRuleDraft, Role};
use crate::domain::ports::{
    AttributeSetQuery, AttributeStoreError, AttributeUnitOfWork, AttributeWork,
    CredentialVerifier, CredentialVerifierError, EmployeeRepository, EmployeeRepositoryError,
    PermissionRuleRepository, RoleRepository, RoleRepositoryError,
};
use crate::domain::{
    Employee, EmployeeDraft, EmployeeId, Error, Identification, PermissionRuleId, RoleId,
};

type EmployeeTable = BTreeMap<EmployeeId, Employee>;

fn identification_taken(
    employees: &EmployeeTable,
    identification: &Identification,
    except: Option<EmployeeId>,
) -> bool {
    employees
        .values()
        .any(|employee| &employee.identification == identification && Some(employee.id) != except)
}

fn duplicate_identification(identification: &Identification) -> EmployeeRepositoryError {
    EmployeeRepositoryError::duplicate_identification(
        identification.kind(),
        identification.number(),
    )
}

#[derive(Default)]
struct Tables {
    last_employee_id: i32,
    last_role_id: i32,
    last_rule_id: i32,
    employees: EmployeeTable,
    roles: BTreeMap<RoleId, Role>,
    rules: BTreeMap<PermissionRuleId, PermissionRule>,
    passwords: BTreeMap<EmployeeId, Zeroizing<String>>,
    attributes: AttributeTables,
}

impl Tables {
    fn role_name_taken(&self, name: &str, except: Option<RoleId>) -> bool {
        self.roles
            .values()
            .any(|role| role.name == name && Some(role.id) != except)
    }
}

/// Shared in-memory personnel store.
///
/// Cloning is cheap and every clone sees the same tables.
///
/// # Examples
/// ```
/// use personnel::outbound::memory::InMemoryPersonnelStore;
///
/// let store = InMemoryPersonnelStore::new();
/// let shared = store.clone();
/// # let _ = shared;
/// ```
#[derive(Clone, Default)]
pub struct InMemoryPersonnelStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryPersonnelStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the password the built-in [`CredentialVerifier`] accepts for
    /// `employee`.
    pub async fn set_password(&self, employee: EmployeeId, password: &str) {
        let mut tables = self.tables.lock().await;
        tables
            .passwords
            .insert(employee, Zeroizing::new(password.to_owned()));
    }
}

#[async_trait]
impl AttributeUnitOfWork for InMemoryPersonnelStore {
    async fn run(&self, owner: EmployeeId, work: AttributeWork) -> Result<(), Error> {
        let mut tables = self.tables.lock().await;
        let staged = StagedAttributes::new(tables.attributes.clone(), tables.employees.clone());

        work(&staged).await.inspect_err(|error| {
            debug!(owner_id = %owner, error = %error, "attribute work discarded");
        })?;

        let (attributes, employees) = staged.into_parts();
        tables.attributes = attributes;
        tables.employees = employees;
        Ok(())
    }
}

#[async_trait]
impl AttributeSetQuery for InMemoryPersonnelStore {
    async fn attributes_of(
        &self,
        owner: EmployeeId,
    ) -> Result<Vec<AttributeWithValues>, AttributeStoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.attributes.attributes_of(owner))
    }
}

#[async_trait]
impl EmployeeRepository for InMemoryPersonnelStore {
    async fn create(&self, draft: &EmployeeDraft) -> Result<Employee, EmployeeRepositoryError> {
        let mut tables = self.tables.lock().await;
        if identification_taken(&tables.employees, &draft.identification, None) {
            return Err(duplicate_identification(&draft.identification));
        }
        tables.last_employee_id += 1;
        let id = EmployeeId::new(tables.last_employee_id);
        let employee = Employee::from_draft(id, draft.clone());
        tables.employees.insert(employee.id, employee.clone());
        Ok(employee)
    }

    async fn update(
        &self,
        id: EmployeeId,
        draft: &EmployeeDraft,
    ) -> Result<Option<Employee>, EmployeeRepositoryError> {
        let mut tables = self.tables.lock().await;
        if !tables.employees.contains_key(&id) {
            return Ok(None);
        }
        if identification_taken(&tables.employees, &draft.identification, Some(id)) {
            return Err(duplicate_identification(&draft.identification));
        }
        let employee = Employee::from_draft(id, draft.clone());
        tables.employees.insert(id, employee.clone());
        Ok(Some(employee))
    }

    async fn delete(&self, id: EmployeeId) -> Result<bool, EmployeeRepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.employees.remove(&id).is_none() {
            return Ok(false);
        }
        tables.passwords.remove(&id);
        tables.attributes.remove_owner(id);
        Ok(true)
    }

    async fn find_by_id(
        &self,
        id: EmployeeId,
    ) -> Result<Option<Employee>, EmployeeRepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.employees.get(&id).cloned())
    }

    async fn find_by_identification(
        &self,
        identification: &Identification,
    ) -> Result<Option<Employee>, EmployeeRepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .employees
            .values()
            .find(|employee| &employee.identification == identification)
            .cloned())
    }

    async fn search_by_identification_number(
        &self,
        prefix: &str,
    ) -> Result<Vec<Employee>, EmployeeRepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .employees
            .values()
            .filter(|employee| employee.identification.number().starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn list_page(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Employee>, EmployeeRepositoryError> {
        let tables = self.tables.lock().await;
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(tables
            .employees
            .values()
            .skip(skip)
            .take(take)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64, EmployeeRepositoryError> {
        let tables = self.tables.lock().await;
        u64::try_from(tables.employees.len())
            .map_err(|_| EmployeeRepositoryError::query("employee count out of range"))
    }
}

#[async_trait]
impl RoleRepository for InMemoryPersonnelStore {
    async fn list(&self) -> Result<Vec<Role>, RoleRepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.roles.values().cloned().collect())
    }

    async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, RoleRepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.roles.get(&id).cloned())
    }

    async fn create(&self, name: &str) -> Result<Role, RoleRepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.role_name_taken(name, None) {
            return Err(RoleRepositoryError::duplicate_name(name));
        }
        tables.last_role_id += 1;
        let role = Role {
            id: RoleId::new(tables.last_role_id),
            name: name.to_owned(),
        };
        tables.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn rename(&self, id: RoleId, name: &str) -> Result<Option<Role>, RoleRepositoryError> {
        let mut tables = self.tables.lock().await;
        if !tables.roles.contains_key(&id) {
            return Ok(None);
        }
        if tables.role_name_taken(name, Some(id)) {
            return Err(RoleRepositoryError::duplicate_name(name));
        }
        let role = Role {
            id,
            name: name.to_owned(),
        };
        tables.roles.insert(id, role.clone());
        Ok(Some(role))
    }

    async fn delete(&self, id: RoleId) -> Result<bool, RoleRepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.roles.remove(&id).is_none() {
            return Ok(false);
        }
        tables.rules.retain(|_, rule| rule.role_id != id);
        for employee in tables.employees.values_mut() {
            if employee.role_id == Some(id) {
                employee.role_id = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl PermissionRuleRepository for InMemoryPersonnelStore {
    async fn list_by_role(
        &self,
        role_id: RoleId,
    ) -> Result<Vec<PermissionRule>, RoleRepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .rules
            .values()
            .filter(|rule| rule.role_id == role_id)
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        draft: &PermissionRuleDraft,
    ) -> Result<PermissionRule, RoleRepositoryError> {
        let mut tables = self.tables.lock().await;
        if !tables.roles.contains_key(&draft.role_id) {
            return Err(RoleRepositoryError::query(format!(
                "role {} does not exist",
                draft.role_id
            )));
        }
        tables.last_rule_id += 1;
        let rule = PermissionRule {
            id: PermissionRuleId::new(tables.last_rule_id),
            role_id: draft.role_id,
            method: draft.method.clone(),
            endpoint: draft.endpoint.clone(),
        };
        tables.rules.insert(rule.id, rule.clone());
        Ok(rule)
    }

    async fn delete(&self, id: PermissionRuleId) -> Result<bool, RoleRepositoryError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.rules.remove(&id).is_some())
    }
}

#[async_trait]
impl CredentialVerifier for InMemoryPersonnelStore {
    async fn verify(
        &self,
        employee: EmployeeId,
        password: &str,
    ) -> Result<bool, CredentialVerifierError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .passwords
            .get(&employee)
            .is_some_and(|stored| stored.as_str() == password))
    }
}
