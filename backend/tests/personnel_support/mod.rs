//! Shared wiring for integration tests backed by the in-memory store.

use std::sync::Arc;

use futures_util::FutureExt;
use personnel::domain::attributes::{DesiredAttributes, UniquenessValidator, map_store_error};
use personnel::domain::ports::{AttributeDefinitionStore, AttributeUnitOfWork, attribute_work};
use personnel::domain::{
    AuthPorts, AuthService, DefinitionId, EmployeeDraft, EmployeeId, EmployeeService,
    Identification, RoleService,
};
use personnel::outbound::memory::InMemoryPersonnelStore;
use tokio::sync::Mutex;

pub type Employees =
    EmployeeService<InMemoryPersonnelStore, InMemoryPersonnelStore, InMemoryPersonnelStore>;
pub type Roles = RoleService<InMemoryPersonnelStore, InMemoryPersonnelStore>;
pub type Auth = AuthService<
    InMemoryPersonnelStore,
    InMemoryPersonnelStore,
    InMemoryPersonnelStore,
    InMemoryPersonnelStore,
    InMemoryPersonnelStore,
>;

pub fn employee_service(store: &InMemoryPersonnelStore) -> Employees {
    EmployeeService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        UniquenessValidator::default(),
    )
}

pub fn role_service(store: &InMemoryPersonnelStore) -> Roles {
    RoleService::new(Arc::new(store.clone()), Arc::new(store.clone()))
}

pub fn auth_service(store: &InMemoryPersonnelStore) -> Auth {
    AuthService::new(AuthPorts {
        employees: Arc::new(store.clone()),
        attributes: Arc::new(store.clone()),
        roles: Arc::new(store.clone()),
        rules: Arc::new(store.clone()),
        verifier: Arc::new(store.clone()),
    })
}

pub fn draft(number: &str) -> EmployeeDraft {
    let identification = Identification::new("CC", number).expect("valid identification");
    EmployeeDraft::new("Grace", "Hopper", identification).expect("valid draft")
}

pub fn desired<'a>(pairs: impl IntoIterator<Item = (&'a str, Vec<&'a str>)>) -> DesiredAttributes {
    DesiredAttributes::from_pairs(pairs).expect("valid attribute mapping")
}

/// Create an employee with no attributes and return its id.
pub async fn hire(employees: &Employees, number: &str) -> EmployeeId {
    employees
        .create_with_attributes(draft(number), DesiredAttributes::empty())
        .await
        .expect("employee created")
        .employee
        .id
}

/// `(name, definition id)` pairs of `owner`, read through a unit of work.
pub async fn definition_ids(
    store: &InMemoryPersonnelStore,
    owner: EmployeeId,
) -> Vec<(String, DefinitionId)> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let work = attribute_work(move |attributes| {
        async move {
            let definitions = attributes
                .list_by_owner(owner)
                .await
                .map_err(map_store_error)?;
            let mut sink = sink.lock().await;
            sink.extend(
                definitions
                    .into_iter()
                    .map(|definition| (definition.name.to_string(), definition.id)),
            );
            Ok(())
        }
        .boxed()
    });
    store.run(owner, work).await.expect("read definitions");
    seen.lock().await.clone()
}
