//! PostgreSQL attribute store and its transactional unit of work.
//!
//! [`DieselAttributeUnitOfWork`] opens one transaction per unit of work and
//! takes a transaction-scoped advisory lock on the owner before handing the
//! work a [`TransactionalAttributeStore`] bound to that transaction. Locks
//! are released on commit or rollback, so two reconciliations of the same
//! employee run one after the other while different employees proceed in
//! parallel. Employee row rewrites issued through the store share the
//! transaction.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{Integer, Text};
use diesel::upsert::excluded;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::attributes::{
    AttributeDefinition, AttributeName, AttributeValue, Cardinality, map_store_error,
};
use crate::domain::ports::{
    AttributeDefinitionStore, AttributeOwnerLookup, AttributeStoreError, AttributeUnitOfWork,
    AttributeValueStore, AttributeWork, EmployeeRecordWriter, EmployeeRepositoryError,
};
use crate::domain::{DefinitionId, Employee, EmployeeDraft, EmployeeId, Error, ValueId};

use super::diesel_employee_repository::update_employee_row;
use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{
    AttributeDefinitionRow, AttributeValueRow, NewAttributeDefinitionRow, NewAttributeValueRow,
};
use super::pool::DbPool;
use super::schema::{attribute_definitions, attribute_values};

/// First key of the two-key advisory lock taken per owner.
const OWNER_LOCK_CLASS: i32 = 0x5045_5253;

const OWNER_LOCK_SQL: &str = "SELECT pg_advisory_xact_lock($1, $2)";
const VALUE_LOCK_SQL: &str = "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))";

fn store_error(error: diesel::result::Error) -> AttributeStoreError {
    map_diesel_error(
        error,
        AttributeStoreError::query,
        AttributeStoreError::connection,
    )
}

fn definition_from_row(
    row: AttributeDefinitionRow,
) -> Result<AttributeDefinition, AttributeStoreError> {
    let name = AttributeName::new(&row.name).map_err(|err| {
        warn!(definition_id = row.id, name = %row.name, "stored attribute name is invalid");
        AttributeStoreError::query(format!(
            "stored attribute name '{}' is invalid: {err}",
            row.name
        ))
    })?;
    Ok(AttributeDefinition {
        id: DefinitionId::new(row.id),
        owner_id: EmployeeId::new(row.owner_id),
        name,
        cardinality: Cardinality::from_multiple_flag(row.multiple),
    })
}

fn value_from_row(row: AttributeValueRow) -> AttributeValue {
    AttributeValue {
        id: ValueId::new(row.id),
        definition_id: DefinitionId::new(row.definition_id),
        value: row.value,
    }
}

fn value_count(count: i64) -> usize {
    usize::try_from(count).unwrap_or(usize::MAX)
}

/// Failure inside a unit-of-work transaction.
enum TransactionFailure {
    Diesel(diesel::result::Error),
    Domain(Error),
}

impl From<diesel::result::Error> for TransactionFailure {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

/// Diesel-backed [`AttributeUnitOfWork`].
#[derive(Clone)]
pub struct DieselAttributeUnitOfWork {
    pool: DbPool,
}

impl DieselAttributeUnitOfWork {
    /// Create a unit of work over the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttributeUnitOfWork for DieselAttributeUnitOfWork {
    async fn run(&self, owner: EmployeeId, work: AttributeWork) -> Result<(), Error> {
        let mut conn = self.pool.get().await.map_err(|err| {
            map_store_error(map_pool_error(err, AttributeStoreError::connection))
        })?;

        let outcome: Result<(), TransactionFailure> = conn
            .transaction(|conn| {
                async move {
                    sql_query(OWNER_LOCK_SQL)
                        .bind::<Integer, _>(OWNER_LOCK_CLASS)
                        .bind::<Integer, _>(owner.get())
                        .execute(conn)
                        .await?;
                    debug!(owner_id = %owner, "owner lock acquired");

                    let store = TransactionalAttributeStore::new(conn);
                    work(&store).await.map_err(TransactionFailure::Domain)
                }
                .scope_boxed()
            })
            .await;

        match outcome {
            Ok(()) => Ok(()),
            Err(TransactionFailure::Domain(error)) => {
                debug!(owner_id = %owner, error = %error, "attribute transaction rolled back");
                Err(error)
            }
            Err(TransactionFailure::Diesel(error)) => Err(map_store_error(store_error(error))),
        }
    }
}

/// Attribute store bound to one open transaction.
///
/// Statements run one at a time on the borrowed connection.
pub struct TransactionalAttributeStore<'c> {
    conn: Mutex<&'c mut AsyncPgConnection>,
}

impl<'c> TransactionalAttributeStore<'c> {
    fn new(conn: &'c mut AsyncPgConnection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

async fn load_multiple_flag(
    conn: &mut AsyncPgConnection,
    id: DefinitionId,
) -> Result<bool, AttributeStoreError> {
    attribute_definitions::table
        .find(id.get())
        .select(attribute_definitions::multiple)
        .first::<bool>(conn)
        .await
        .optional()
        .map_err(store_error)?
        .ok_or_else(|| AttributeStoreError::definition_not_found(id))
}

async fn count_values(
    conn: &mut AsyncPgConnection,
    id: DefinitionId,
) -> Result<usize, AttributeStoreError> {
    attribute_values::table
        .filter(attribute_values::definition_id.eq(id.get()))
        .count()
        .get_result::<i64>(conn)
        .await
        .map(value_count)
        .map_err(store_error)
}

#[async_trait]
impl AttributeDefinitionStore for TransactionalAttributeStore<'_> {
    async fn upsert(
        &self,
        owner: EmployeeId,
        name: &AttributeName,
        cardinality: Cardinality,
    ) -> Result<DefinitionId, AttributeStoreError> {
        let mut conn = self.conn.lock().await;
        let row = NewAttributeDefinitionRow {
            owner_id: owner.get(),
            name: name.as_str(),
            multiple: cardinality.is_multiple(),
        };

        let id: i32 = diesel::insert_into(attribute_definitions::table)
            .values(&row)
            .on_conflict((attribute_definitions::owner_id, attribute_definitions::name))
            .do_update()
            .set(
                attribute_definitions::multiple.eq(attribute_definitions::multiple
                    .or(excluded(attribute_definitions::multiple))),
            )
            .returning(attribute_definitions::id)
            .get_result(&mut **conn)
            .await
            .map_err(store_error)?;

        Ok(DefinitionId::new(id))
    }

    async fn find_by_owner_and_name(
        &self,
        owner: EmployeeId,
        name: &AttributeName,
    ) -> Result<Option<AttributeDefinition>, AttributeStoreError> {
        let mut conn = self.conn.lock().await;
        let row: Option<AttributeDefinitionRow> = attribute_definitions::table
            .filter(attribute_definitions::owner_id.eq(owner.get()))
            .filter(attribute_definitions::name.eq(name.as_str()))
            .select(AttributeDefinitionRow::as_select())
            .first(&mut **conn)
            .await
            .optional()
            .map_err(store_error)?;

        row.map(definition_from_row).transpose()
    }

    async fn list_by_owner(
        &self,
        owner: EmployeeId,
    ) -> Result<Vec<AttributeDefinition>, AttributeStoreError> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<AttributeDefinitionRow> = attribute_definitions::table
            .filter(attribute_definitions::owner_id.eq(owner.get()))
            .order(attribute_definitions::name.asc())
            .select(AttributeDefinitionRow::as_select())
            .load(&mut **conn)
            .await
            .map_err(store_error)?;

        rows.into_iter().map(definition_from_row).collect()
    }

    async fn delete(&self, id: DefinitionId) -> Result<(), AttributeStoreError> {
        let mut conn = self.conn.lock().await;
        let removed = diesel::delete(attribute_definitions::table.find(id.get()))
            .execute(&mut **conn)
            .await
            .map_err(store_error)?;
        if removed == 0 {
            return Err(AttributeStoreError::definition_not_found(id));
        }
        Ok(())
    }

    async fn set_cardinality(
        &self,
        id: DefinitionId,
        cardinality: Cardinality,
    ) -> Result<(), AttributeStoreError> {
        let mut conn = self.conn.lock().await;
        if !cardinality.is_multiple() {
            let values = count_values(&mut **conn, id).await?;
            if !cardinality.admits(values) {
                return Err(AttributeStoreError::cardinality_conflict(id, values));
            }
        }

        let updated = diesel::update(attribute_definitions::table.find(id.get()))
            .set(attribute_definitions::multiple.eq(cardinality.is_multiple()))
            .execute(&mut **conn)
            .await
            .map_err(store_error)?;
        if updated == 0 {
            return Err(AttributeStoreError::definition_not_found(id));
        }
        Ok(())
    }
}

#[async_trait]
impl AttributeValueStore for TransactionalAttributeStore<'_> {
    async fn list_by_definition(
        &self,
        definition_id: DefinitionId,
    ) -> Result<Vec<AttributeValue>, AttributeStoreError> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<AttributeValueRow> = attribute_values::table
            .filter(attribute_values::definition_id.eq(definition_id.get()))
            .order(attribute_values::id.asc())
            .select(AttributeValueRow::as_select())
            .load(&mut **conn)
            .await
            .map_err(store_error)?;

        Ok(rows.into_iter().map(value_from_row).collect())
    }

    async fn save(
        &self,
        definition_id: DefinitionId,
        value: &str,
    ) -> Result<ValueId, AttributeStoreError> {
        let mut conn = self.conn.lock().await;
        let multiple = load_multiple_flag(&mut **conn, definition_id).await?;
        if !multiple {
            let existing = count_values(&mut **conn, definition_id).await?;
            if existing > 0 {
                return Err(AttributeStoreError::cardinality_conflict(
                    definition_id,
                    existing + 1,
                ));
            }
        }

        let id: i32 = diesel::insert_into(attribute_values::table)
            .values(&NewAttributeValueRow {
                definition_id: definition_id.get(),
                value,
            })
            .returning(attribute_values::id)
            .get_result(&mut **conn)
            .await
            .map_err(store_error)?;

        Ok(ValueId::new(id))
    }

    async fn delete_all(&self, ids: &[ValueId]) -> Result<(), AttributeStoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock().await;
        let raw: Vec<i32> = ids.iter().map(|id| id.get()).collect();
        diesel::delete(attribute_values::table.filter(attribute_values::id.eq_any(raw)))
            .execute(&mut **conn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn replace_all(
        &self,
        definition_id: DefinitionId,
        values: &[String],
    ) -> Result<(), AttributeStoreError> {
        let mut conn = self.conn.lock().await;
        let multiple = load_multiple_flag(&mut **conn, definition_id).await?;
        if !Cardinality::from_multiple_flag(multiple).admits(values.len()) {
            return Err(AttributeStoreError::cardinality_conflict(
                definition_id,
                values.len(),
            ));
        }

        diesel::delete(
            attribute_values::table.filter(attribute_values::definition_id.eq(definition_id.get())),
        )
        .execute(&mut **conn)
        .await
        .map_err(store_error)?;

        if values.is_empty() {
            return Ok(());
        }
        let rows: Vec<NewAttributeValueRow<'_>> = values
            .iter()
            .map(|value| NewAttributeValueRow {
                definition_id: definition_id.get(),
                value: value.as_str(),
            })
            .collect();
        diesel::insert_into(attribute_values::table)
            .values(&rows)
            .execute(&mut **conn)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}

#[async_trait]
impl AttributeOwnerLookup for TransactionalAttributeStore<'_> {
    async fn find_other_owner(
        &self,
        name: &AttributeName,
        value: &str,
        exclude_owner: EmployeeId,
    ) -> Result<Option<EmployeeId>, AttributeStoreError> {
        let mut conn = self.conn.lock().await;

        // Held until commit so a concurrent claim of the same value waits.
        sql_query(VALUE_LOCK_SQL)
            .bind::<Text, _>(format!("{name}\u{1f}{value}"))
            .execute(&mut **conn)
            .await
            .map_err(store_error)?;

        let holder: Option<i32> = attribute_values::table
            .inner_join(attribute_definitions::table)
            .filter(attribute_definitions::name.eq(name.as_str()))
            .filter(attribute_values::value.eq(value))
            .filter(attribute_definitions::owner_id.ne(exclude_owner.get()))
            .select(attribute_definitions::owner_id)
            .first(&mut **conn)
            .await
            .optional()
            .map_err(store_error)?;

        Ok(holder.map(EmployeeId::new))
    }
}

#[async_trait]
impl EmployeeRecordWriter for TransactionalAttributeStore<'_> {
    async fn rewrite(
        &self,
        id: EmployeeId,
        draft: &EmployeeDraft,
    ) -> Result<Option<Employee>, EmployeeRepositoryError> {
        let mut conn = self.conn.lock().await;
        update_employee_row(&mut **conn, id, draft).await
    }
}

#[cfg(test)]
mod tests {
    //! Row conversion coverage; queries are exercised against PostgreSQL.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(true, Cardinality::Multiple)]
    #[case(false, Cardinality::Single)]
    fn definition_rows_carry_cardinality(#[case] multiple: bool, #[case] expected: Cardinality) {
        let definition = definition_from_row(AttributeDefinitionRow {
            id: 4,
            owner_id: 2,
            name: "phone".into(),
            multiple,
        })
        .expect("valid row");

        assert_eq!(definition.cardinality, expected);
        assert_eq!(definition.owner_id, EmployeeId::new(2));
    }

    #[rstest]
    fn invalid_stored_names_are_query_errors() {
        let error = definition_from_row(AttributeDefinitionRow {
            id: 4,
            owner_id: 2,
            name: "has space".into(),
            multiple: false,
        })
        .expect_err("invalid name");

        assert!(matches!(error, AttributeStoreError::Query { .. }));
    }

    #[rstest]
    fn negative_counts_saturate() {
        assert_eq!(value_count(3), 3);
        assert_eq!(value_count(-1), usize::MAX);
    }
}
