//! PostgreSQL read model for an employee's attribute set.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::warn;

use crate::domain::EmployeeId;
use crate::domain::attributes::{AttributeName, AttributeWithValues, Cardinality};
use crate::domain::ports::{AttributeSetQuery, AttributeStoreError};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::pool::DbPool;
use super::schema::{attribute_definitions, attribute_values};

/// Diesel-backed implementation of [`AttributeSetQuery`].
#[derive(Clone)]
pub struct DieselAttributeSetQuery {
    pool: DbPool,
}

impl DieselAttributeSetQuery {
    /// Create a query adapter with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Fold `(name, multiple, value?)` rows, already ordered by name then value
/// id, into one entry per name.
fn group_rows(
    rows: Vec<(String, bool, Option<String>)>,
) -> Result<Vec<AttributeWithValues>, AttributeStoreError> {
    let mut grouped: Vec<AttributeWithValues> = Vec::new();
    for (name, multiple, value) in rows {
        let same_name = grouped
            .last()
            .is_some_and(|entry| entry.name.as_str() == name);
        if !same_name {
            let parsed = AttributeName::new(&name).map_err(|err| {
                warn!(name = %name, "stored attribute name is invalid");
                AttributeStoreError::query(format!(
                    "stored attribute name '{name}' is invalid: {err}"
                ))
            })?;
            grouped.push(AttributeWithValues {
                name: parsed,
                cardinality: Cardinality::from_multiple_flag(multiple),
                values: Vec::new(),
            });
        }
        if let (Some(entry), Some(value)) = (grouped.last_mut(), value) {
            entry.values.push(value);
        }
    }
    Ok(grouped)
}

#[async_trait]
impl AttributeSetQuery for DieselAttributeSetQuery {
    async fn attributes_of(
        &self,
        owner: EmployeeId,
    ) -> Result<Vec<AttributeWithValues>, AttributeStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, AttributeStoreError::connection))?;

        let rows: Vec<(String, bool, Option<String>)> = attribute_definitions::table
            .left_join(attribute_values::table)
            .filter(attribute_definitions::owner_id.eq(owner.get()))
            .order((
                attribute_definitions::name.asc(),
                attribute_values::id.nullable().asc(),
            ))
            .select((
                attribute_definitions::name,
                attribute_definitions::multiple,
                attribute_values::value.nullable(),
            ))
            .load(&mut conn)
            .await
            .map_err(|err| {
                map_diesel_error(
                    err,
                    AttributeStoreError::query,
                    AttributeStoreError::connection,
                )
            })?;

        group_rows(rows)
    }
}
