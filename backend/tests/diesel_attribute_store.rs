//! Attribute store invariants against embedded PostgreSQL.
//!
//! These suites drive the Diesel adapters through the same ports the
//! services use, so the SQL behind upsert merging, value replacement,
//! advisory locking and transaction rollback is exercised for real.

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::join;
use personnel::domain::attributes::{
    AttributeName, AttributeReconciler, Cardinality, DesiredAttributes, UniquenessValidator,
    map_store_error,
};
use personnel::domain::ports::{
    AttributeDefinitionStore, AttributeUnitOfWork, AttributeValueStore, AttributeWork,
    EmployeeRecordWriter, EmployeeRepositoryError, attribute_work,
};
use personnel::domain::{
    DefinitionId, EmployeeDraft, EmployeeId, EmployeeService, Error, ErrorCode, Identification,
};
use personnel::outbound::persistence::{
    DbPool, DieselAttributeSetQuery, DieselAttributeUnitOfWork, DieselEmployeeRepository,
    PoolConfig,
};
use pg_embedded_setup_unpriv::TemporaryDatabase;
use postgres::{Client, NoTls};
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;
use tokio::sync::Mutex;

mod pg_support;

use pg_support::{count_rows, format_postgres_error, fresh_database, handle_cluster_setup_failure};

type Employees =
    EmployeeService<DieselEmployeeRepository, DieselAttributeUnitOfWork, DieselAttributeSetQuery>;

struct TestContext {
    runtime: Runtime,
    pool: DbPool,
    database_url: String,
    _database: TemporaryDatabase,
}

impl TestContext {
    fn employees(&self) -> Employees {
        EmployeeService::new(
            Arc::new(DieselEmployeeRepository::new(self.pool.clone())),
            Arc::new(self.unit_of_work()),
            Arc::new(DieselAttributeSetQuery::new(self.pool.clone())),
            UniquenessValidator::default(),
        )
    }

    fn unit_of_work(&self) -> DieselAttributeUnitOfWork {
        DieselAttributeUnitOfWork::new(self.pool.clone())
    }

    fn reconciler(&self) -> AttributeReconciler<DieselAttributeUnitOfWork> {
        AttributeReconciler::new(Arc::new(self.unit_of_work()), UniquenessValidator::default())
    }

    fn hire(&self, number: &str, desired: DesiredAttributes) -> EmployeeId {
        let employees = self.employees();
        self.runtime
            .block_on(async { employees.create_with_attributes(draft(number), desired).await })
            .expect("employee created")
            .employee
            .id
    }

    fn values_of(&self, owner: EmployeeId, name: &str) -> Option<(Cardinality, Vec<String>)> {
        let employees = self.employees();
        self.runtime
            .block_on(async { employees.attributes(owner).await })
            .expect("attributes readable")
            .into_iter()
            .find(|attribute| attribute.name.as_str() == name)
            .map(|attribute| (attribute.cardinality, attribute.values))
    }

    fn definition_ids(&self, owner: EmployeeId) -> Vec<i32> {
        let mut client = Client::connect(&self.database_url, NoTls)
            .unwrap_or_else(|err| panic!("connect: {}", format_postgres_error(&err)));
        client
            .query(
                "SELECT id FROM attribute_definitions WHERE owner_id = $1 ORDER BY name",
                &[&owner.get()],
            )
            .unwrap_or_else(|err| panic!("query: {}", format_postgres_error(&err)))
            .iter()
            .map(|row| row.get(0))
            .collect()
    }
}

fn setup_context() -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let database = fresh_database()?;
    let database_url = database.url().to_owned();

    let config = PoolConfig::new(database_url.as_str())
        .with_max_size(4)
        .with_min_idle(Some(1));
    let pool = runtime
        .block_on(async { DbPool::new(config).await })
        .map_err(|err| err.to_string())?;

    Ok(TestContext {
        runtime,
        pool,
        database_url,
        _database: database,
    })
}

#[fixture]
fn pg_context() -> Option<TestContext> {
    match setup_context() {
        Ok(context) => Some(context),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

fn draft(number: &str) -> EmployeeDraft {
    let identification = Identification::new("CC", number).expect("valid identification");
    EmployeeDraft::new("Grace", "Hopper", identification).expect("valid draft")
}

fn desired<'a>(pairs: impl IntoIterator<Item = (&'a str, Vec<&'a str>)>) -> DesiredAttributes {
    DesiredAttributes::from_pairs(pairs).expect("valid attribute mapping")
}

fn upsert_work(
    owner: EmployeeId,
    cardinality: Cardinality,
    sink: Arc<Mutex<Vec<DefinitionId>>>,
) -> AttributeWork {
    attribute_work(move |store| {
        async move {
            let name = AttributeName::new("nickname")
                .map_err(|err| Error::internal(err.to_string()))?;
            let id = store
                .upsert(owner, &name, cardinality)
                .await
                .map_err(map_store_error)?;
            sink.lock().await.push(id);
            Ok(())
        }
        .boxed()
    })
}

#[rstest]
fn concurrent_upserts_converge_on_one_row(pg_context: Option<TestContext>) {
    let Some(context) = pg_context else {
        eprintln!("SKIP-TEST-CLUSTER: concurrent_upserts_converge_on_one_row skipped");
        return;
    };
    let owner = context.hire("100", DesiredAttributes::empty());
    let unit_of_work = context.unit_of_work();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let both = join(
        unit_of_work.run(owner, upsert_work(owner, Cardinality::Single, Arc::clone(&seen))),
        unit_of_work.run(owner, upsert_work(owner, Cardinality::Multiple, Arc::clone(&seen))),
    );
    let (first, second) = context.runtime.block_on(both);
    first.expect("first upsert");
    second.expect("second upsert");

    let ids = context
        .runtime
        .block_on(async { seen.lock().await.clone() });
    assert_eq!(ids.len(), 2);
    assert_eq!(ids.first(), ids.last());
    let rows = count_rows(
        &context.database_url,
        "SELECT count(*) FROM attribute_definitions WHERE name = 'nickname' AND multiple",
    )
    .expect("count definitions");
    assert_eq!(rows, 1);
}

#[rstest]
fn reconcile_keeps_ids_and_multiple_sticks(pg_context: Option<TestContext>) {
    let Some(context) = pg_context else {
        eprintln!("SKIP-TEST-CLUSTER: reconcile_keeps_ids_and_multiple_sticks skipped");
        return;
    };
    let owner = context.hire(
        "101",
        desired([("email", vec!["grace@x.io"]), ("phone", vec!["555-1", "555-2"])]),
    );
    let before = context.definition_ids(owner);

    let reconciler = context.reconciler();
    context
        .runtime
        .block_on(async {
            reconciler
                .reconcile(
                    owner,
                    desired([("email", vec!["grace@x.io"]), ("phone", vec!["555-9"])]),
                )
                .await
        })
        .expect("second reconcile");

    assert_eq!(context.definition_ids(owner), before);
    assert_eq!(
        context.values_of(owner, "phone"),
        Some((Cardinality::Multiple, vec!["555-9".to_owned()]))
    );
}

#[rstest]
fn single_definition_refuses_two_values_and_rolls_back(pg_context: Option<TestContext>) {
    let Some(context) = pg_context else {
        eprintln!("SKIP-TEST-CLUSTER: single_definition_refuses_two_values_and_rolls_back skipped");
        return;
    };
    let owner = context.hire("102", DesiredAttributes::empty());
    let work = attribute_work(move |store| {
        async move {
            let name =
                AttributeName::new("badge").map_err(|err| Error::internal(err.to_string()))?;
            let id = store
                .upsert(owner, &name, Cardinality::Single)
                .await
                .map_err(map_store_error)?;
            store
                .replace_all(id, &["A-1".to_owned(), "A-2".to_owned()])
                .await
                .map_err(map_store_error)
        }
        .boxed()
    });

    let error = context
        .runtime
        .block_on(context.unit_of_work().run(owner, work))
        .expect_err("two values on a single definition");

    assert_eq!(error.code(), ErrorCode::Conflict);
    assert!(context.definition_ids(owner).is_empty());
}

#[rstest]
fn failed_row_rewrite_rolls_back_the_reconcile(pg_context: Option<TestContext>) {
    let Some(context) = pg_context else {
        eprintln!("SKIP-TEST-CLUSTER: failed_row_rewrite_rolls_back_the_reconcile skipped");
        return;
    };
    let owner = context.hire("103", desired([("email", vec!["old@x.io"])]));
    context.hire("104", DesiredAttributes::empty());
    let reconciler = context.reconciler();

    let error = context
        .runtime
        .block_on(async {
            reconciler
                .reconcile_then(owner, desired([("email", vec!["new@x.io"])]), move |store| {
                    async move {
                        match store.rewrite(owner, &draft("104")).await {
                            Ok(_) => Ok(()),
                            Err(EmployeeRepositoryError::DuplicateIdentification { .. }) => {
                                Err(Error::conflict("identification taken"))
                            }
                            Err(other) => Err(Error::internal(other.to_string())),
                        }
                    }
                    .boxed()
                })
                .await
        })
        .expect_err("identification clash");

    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(
        context.values_of(owner, "email"),
        Some((Cardinality::Single, vec!["old@x.io".to_owned()]))
    );
    let employees = context.employees();
    let stored = context
        .runtime
        .block_on(async { employees.get_with_attributes(owner).await })
        .expect("employee present");
    assert_eq!(stored.employee.identification.number(), "103");
}

#[rstest]
fn uniqueness_conflict_leaves_the_set_untouched(pg_context: Option<TestContext>) {
    let Some(context) = pg_context else {
        eprintln!("SKIP-TEST-CLUSTER: uniqueness_conflict_leaves_the_set_untouched skipped");
        return;
    };
    context.hire("105", desired([("email", vec!["taken@x.io"])]));
    let owner = context.hire("106", desired([("phone", vec!["555-1"])]));
    let reconciler = context.reconciler();

    let error = context
        .runtime
        .block_on(async {
            reconciler
                .reconcile(
                    owner,
                    desired([("email", vec!["taken@x.io"]), ("phone", vec!["555-2"])]),
                )
                .await
        })
        .expect_err("email belongs to another employee");

    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(
        context.values_of(owner, "phone"),
        Some((Cardinality::Single, vec!["555-1".to_owned()]))
    );
    assert_eq!(context.values_of(owner, "email"), None);
}

#[rstest]
fn opposite_order_claims_conflict_instead_of_deadlocking(pg_context: Option<TestContext>) {
    let Some(context) = pg_context else {
        eprintln!(
            "SKIP-TEST-CLUSTER: opposite_order_claims_conflict_instead_of_deadlocking skipped"
        );
        return;
    };
    let first = context.hire("107", DesiredAttributes::empty());
    let second = context.hire("108", DesiredAttributes::empty());
    let reconciler = context.reconciler();

    let both = join(
        reconciler.reconcile(first, desired([("email", vec!["x@x.io", "y@x.io"])])),
        reconciler.reconcile(second, desired([("email", vec!["y@x.io", "x@x.io"])])),
    );
    let (left, right) = context.runtime.block_on(both);

    let codes: Vec<Option<ErrorCode>> = [left, right]
        .into_iter()
        .map(|outcome| outcome.err().map(|error| error.code()))
        .collect();
    assert!(codes.contains(&None), "one claim succeeds: {codes:?}");
    assert!(
        codes.contains(&Some(ErrorCode::Conflict)),
        "the other is a conflict: {codes:?}"
    );
}

#[rstest]
fn downgrade_waits_for_a_single_value(pg_context: Option<TestContext>) {
    let Some(context) = pg_context else {
        eprintln!("SKIP-TEST-CLUSTER: downgrade_waits_for_a_single_value skipped");
        return;
    };
    let owner = context.hire("109", desired([("phone", vec!["555-1", "555-2"])]));
    let employees = context.employees();

    let error = context
        .runtime
        .block_on(async {
            employees
                .set_attribute_cardinality(owner, "phone", Cardinality::Single)
                .await
        })
        .expect_err("two values stored");
    assert_eq!(error.code(), ErrorCode::Conflict);

    context
        .runtime
        .block_on(async {
            employees
                .reconcile_attributes(owner, desired([("phone", vec!["555-1"])]))
                .await?;
            employees
                .set_attribute_cardinality(owner, "phone", Cardinality::Single)
                .await
        })
        .expect("downgrade after trimming values");
    assert_eq!(
        context.values_of(owner, "phone"),
        Some((Cardinality::Single, vec!["555-1".to_owned()]))
    );
}
