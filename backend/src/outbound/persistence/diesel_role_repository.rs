//! PostgreSQL-backed role and permission-rule repositories.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::warn;

use crate::domain::permissions::{HttpMethod, PermissionRule, PermissionRuleDraft, Role};
use crate::domain::ports::{PermissionRuleRepository, RoleRepository, RoleRepositoryError};
use crate::domain::{PermissionRuleId, RoleId};

use super::diesel_error_mapping::{is_unique_violation, map_diesel_error, map_pool_error};
use super::models::{NewPermissionRuleRow, NewRoleRow, PermissionRuleRow, RoleRow};
use super::pool::DbPool;
use super::schema::{permission_rules, roles};

const ROLE_NAME_CONSTRAINT: &str = "roles_name_key";

async fn checkout(
    pool: &DbPool,
) -> Result<PooledConnection<'_, AsyncPgConnection>, RoleRepositoryError> {
    pool.get()
        .await
        .map_err(|err| map_pool_error(err, RoleRepositoryError::connection))
}

fn map_error(error: diesel::result::Error) -> RoleRepositoryError {
    map_diesel_error(
        error,
        RoleRepositoryError::query,
        RoleRepositoryError::connection,
    )
}

fn map_name_error(error: diesel::result::Error, name: &str) -> RoleRepositoryError {
    if is_unique_violation(&error, Some(ROLE_NAME_CONSTRAINT)) {
        return RoleRepositoryError::duplicate_name(name);
    }
    map_error(error)
}

fn role_from_row(row: RoleRow) -> Role {
    Role {
        id: RoleId::new(row.id),
        name: row.name,
    }
}

fn rule_from_row(row: PermissionRuleRow) -> Result<PermissionRule, RoleRepositoryError> {
    let method = HttpMethod::new(&row.method).map_err(|err| {
        warn!(rule_id = row.id, method = %row.method, "stored permission method is invalid");
        RoleRepositoryError::query(format!("stored method '{}' is invalid: {err}", row.method))
    })?;
    Ok(PermissionRule {
        id: PermissionRuleId::new(row.id),
        role_id: RoleId::new(row.role_id),
        method,
        endpoint: row.endpoint,
    })
}

/// Diesel-backed implementation of [`RoleRepository`].
#[derive(Clone)]
pub struct DieselRoleRepository {
    pool: DbPool,
}

impl DieselRoleRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for DieselRoleRepository {
    async fn list(&self) -> Result<Vec<Role>, RoleRepositoryError> {
        let mut conn = checkout(&self.pool).await?;
        let rows: Vec<RoleRow> = roles::table
            .order(roles::id.asc())
            .select(RoleRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_error)?;
        Ok(rows.into_iter().map(role_from_row).collect())
    }

    async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, RoleRepositoryError> {
        let mut conn = checkout(&self.pool).await?;
        let row: Option<RoleRow> = roles::table
            .find(id.get())
            .select(RoleRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;
        Ok(row.map(role_from_row))
    }

    async fn create(&self, name: &str) -> Result<Role, RoleRepositoryError> {
        let mut conn = checkout(&self.pool).await?;
        let row: RoleRow = diesel::insert_into(roles::table)
            .values(&NewRoleRow { name })
            .returning(RoleRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|err| map_name_error(err, name))?;
        Ok(role_from_row(row))
    }

    async fn rename(&self, id: RoleId, name: &str) -> Result<Option<Role>, RoleRepositoryError> {
        let mut conn = checkout(&self.pool).await?;
        let row: Option<RoleRow> = diesel::update(roles::table.find(id.get()))
            .set(roles::name.eq(name))
            .returning(RoleRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(|err| map_name_error(err, name))?;
        Ok(row.map(role_from_row))
    }

    async fn delete(&self, id: RoleId) -> Result<bool, RoleRepositoryError> {
        let mut conn = checkout(&self.pool).await?;
        let removed = diesel::delete(roles::table.find(id.get()))
            .execute(&mut conn)
            .await
            .map_err(map_error)?;
        Ok(removed > 0)
    }
}

/// Diesel-backed implementation of [`PermissionRuleRepository`].
#[derive(Clone)]
pub struct DieselPermissionRuleRepository {
    pool: DbPool,
}

impl DieselPermissionRuleRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionRuleRepository for DieselPermissionRuleRepository {
    async fn list_by_role(
        &self,
        role_id: RoleId,
    ) -> Result<Vec<PermissionRule>, RoleRepositoryError> {
        let mut conn = checkout(&self.pool).await?;
        let rows: Vec<PermissionRuleRow> = permission_rules::table
            .filter(permission_rules::role_id.eq(role_id.get()))
            .order(permission_rules::id.asc())
            .select(PermissionRuleRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_error)?;
        rows.into_iter().map(rule_from_row).collect()
    }

    async fn create(
        &self,
        draft: &PermissionRuleDraft,
    ) -> Result<PermissionRule, RoleRepositoryError> {
        let mut conn = checkout(&self.pool).await?;
        let row: PermissionRuleRow = diesel::insert_into(permission_rules::table)
            .values(&NewPermissionRuleRow {
                role_id: draft.role_id.get(),
                method: draft.method.as_str(),
                endpoint: &draft.endpoint,
            })
            .returning(PermissionRuleRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_error)?;
        rule_from_row(row)
    }

    async fn delete(&self, id: PermissionRuleId) -> Result<bool, RoleRepositoryError> {
        let mut conn = checkout(&self.pool).await?;
        let removed = diesel::delete(permission_rules::table.find(id.get()))
            .execute(&mut conn)
            .await
            .map_err(map_error)?;
        Ok(removed > 0)
    }
}
