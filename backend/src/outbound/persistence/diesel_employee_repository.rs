//! PostgreSQL-backed `EmployeeRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::warn;

use crate::domain::ports::{EmployeeRepository, EmployeeRepositoryError};
use crate::domain::{Employee, EmployeeDraft, EmployeeId, Identification, RoleId};

use super::diesel_error_mapping::{is_unique_violation, map_diesel_error, map_pool_error};
use super::models::{EmployeeRow, EmployeeUpdate, NewEmployeeRow};
use super::pool::DbPool;
use super::schema::employees;

const IDENTIFICATION_CONSTRAINT: &str = "employees_identification_key";

/// Diesel-backed implementation of the `EmployeeRepository` port.
#[derive(Clone)]
pub struct DieselEmployeeRepository {
    pool: DbPool,
}

impl DieselEmployeeRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn connection(
        &self,
    ) -> Result<PooledConnection<'_, AsyncPgConnection>, EmployeeRepositoryError> {
        self.pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, EmployeeRepositoryError::connection))
    }
}

fn map_write_error(error: diesel::result::Error, draft: &EmployeeDraft) -> EmployeeRepositoryError {
    if is_unique_violation(&error, Some(IDENTIFICATION_CONSTRAINT)) {
        return EmployeeRepositoryError::duplicate_identification(
            draft.identification.kind(),
            draft.identification.number(),
        );
    }
    map_error(error)
}

fn map_error(error: diesel::result::Error) -> EmployeeRepositoryError {
    map_diesel_error(
        error,
        EmployeeRepositoryError::query,
        EmployeeRepositoryError::connection,
    )
}

fn row_to_employee(row: EmployeeRow) -> Result<Employee, EmployeeRepositoryError> {
    let identification = Identification::new(&row.identification_type, &row.identification_number)
        .map_err(|err| {
            warn!(employee_id = row.id, "stored identification is invalid");
            EmployeeRepositoryError::query(format!("stored identification is invalid: {err}"))
        })?;
    Ok(Employee {
        id: EmployeeId::new(row.id),
        names: row.names,
        lastnames: row.lastnames,
        identification,
        role_id: row.role_id.map(RoleId::new),
        login_enabled: row.login_enabled,
    })
}

fn rows_to_employees(rows: Vec<EmployeeRow>) -> Result<Vec<Employee>, EmployeeRepositoryError> {
    rows.into_iter().map(row_to_employee).collect()
}

/// Escape `LIKE` metacharacters so a prefix matches literally.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Rewrite one employee row on `conn`, which may be inside a transaction.
pub(super) async fn update_employee_row(
    conn: &mut AsyncPgConnection,
    id: EmployeeId,
    draft: &EmployeeDraft,
) -> Result<Option<Employee>, EmployeeRepositoryError> {
    let changes = EmployeeUpdate {
        names: &draft.names,
        lastnames: &draft.lastnames,
        identification_type: draft.identification.kind(),
        identification_number: draft.identification.number(),
        role_id: draft.role_id.map(RoleId::get),
        login_enabled: draft.login_enabled,
        updated_at: Utc::now(),
    };

    let stored: Option<EmployeeRow> = diesel::update(employees::table.find(id.get()))
        .set(&changes)
        .returning(EmployeeRow::as_returning())
        .get_result(conn)
        .await
        .optional()
        .map_err(|err| map_write_error(err, draft))?;

    stored.map(row_to_employee).transpose()
}

#[async_trait]
impl EmployeeRepository for DieselEmployeeRepository {
    async fn create(&self, draft: &EmployeeDraft) -> Result<Employee, EmployeeRepositoryError> {
        let mut conn = self.connection().await?;
        let row = NewEmployeeRow {
            names: &draft.names,
            lastnames: &draft.lastnames,
            identification_type: draft.identification.kind(),
            identification_number: draft.identification.number(),
            role_id: draft.role_id.map(RoleId::get),
            login_enabled: draft.login_enabled,
        };

        let stored: EmployeeRow = diesel::insert_into(employees::table)
            .values(&row)
            .returning(EmployeeRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|err| map_write_error(err, draft))?;

        row_to_employee(stored)
    }

    async fn update(
        &self,
        id: EmployeeId,
        draft: &EmployeeDraft,
    ) -> Result<Option<Employee>, EmployeeRepositoryError> {
        let mut conn = self.connection().await?;
        update_employee_row(&mut conn, id, draft).await
    }

    async fn delete(&self, id: EmployeeId) -> Result<bool, EmployeeRepositoryError> {
        let mut conn = self.connection().await?;
        let removed = diesel::delete(employees::table.find(id.get()))
            .execute(&mut conn)
            .await
            .map_err(map_error)?;
        Ok(removed > 0)
    }

    async fn find_by_id(
        &self,
        id: EmployeeId,
    ) -> Result<Option<Employee>, EmployeeRepositoryError> {
        let mut conn = self.connection().await?;
        let row: Option<EmployeeRow> = employees::table
            .find(id.get())
            .select(EmployeeRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;

        row.map(row_to_employee).transpose()
    }

    async fn find_by_identification(
        &self,
        identification: &Identification,
    ) -> Result<Option<Employee>, EmployeeRepositoryError> {
        let mut conn = self.connection().await?;
        let row: Option<EmployeeRow> = employees::table
            .filter(employees::identification_type.eq(identification.kind()))
            .filter(employees::identification_number.eq(identification.number()))
            .select(EmployeeRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;

        row.map(row_to_employee).transpose()
    }

    async fn search_by_identification_number(
        &self,
        prefix: &str,
    ) -> Result<Vec<Employee>, EmployeeRepositoryError> {
        let mut conn = self.connection().await?;
        let rows: Vec<EmployeeRow> = employees::table
            .filter(employees::identification_number.like(like_prefix(prefix)))
            .order(employees::id.asc())
            .select(EmployeeRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_error)?;

        rows_to_employees(rows)
    }

    async fn list_page(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Employee>, EmployeeRepositoryError> {
        let mut conn = self.connection().await?;
        let rows: Vec<EmployeeRow> = employees::table
            .order(employees::id.asc())
            .limit(i64::from(limit))
            .offset(i64::from(offset))
            .select(EmployeeRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_error)?;

        rows_to_employees(rows)
    }

    async fn count(&self) -> Result<u64, EmployeeRepositoryError> {
        let mut conn = self.connection().await?;
        let total: i64 = employees::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_error)?;
        u64::try_from(total)
            .map_err(|_| EmployeeRepositoryError::query("employee count out of range"))
    }
}
