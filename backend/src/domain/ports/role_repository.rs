//! Ports for roles and their permission rules.

use async_trait::async_trait;

use crate::domain::permissions::{PermissionRule, PermissionRuleDraft, Role};
use crate::domain::{PermissionRuleId, RoleId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by role and permission-rule adapters.
    pub enum RoleRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "role repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "role repository query failed: {message}",
        /// A role with the same name already exists.
        DuplicateName { name: String } =>
            "role '{name}' already exists",
    }
}

/// Port for role rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// All roles ordered by id.
    async fn list(&self) -> Result<Vec<Role>, RoleRepositoryError>;

    /// Fetch one role.
    async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, RoleRepositoryError>;

    /// Insert a role.
    async fn create(&self, name: &str) -> Result<Role, RoleRepositoryError>;

    /// Rename a role. Returns `None` when it does not exist.
    async fn rename(&self, id: RoleId, name: &str) -> Result<Option<Role>, RoleRepositoryError>;

    /// Delete a role and its rules. Returns whether a row went away.
    async fn delete(&self, id: RoleId) -> Result<bool, RoleRepositoryError>;
}

/// Port for permission rule rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PermissionRuleRepository: Send + Sync {
    /// Rules of `role_id` in storage order (ascending id).
    async fn list_by_role(
        &self,
        role_id: RoleId,
    ) -> Result<Vec<PermissionRule>, RoleRepositoryError>;

    /// Insert a rule for a role.
    async fn create(
        &self,
        draft: &PermissionRuleDraft,
    ) -> Result<PermissionRule, RoleRepositoryError>;

    /// Delete a rule. Returns whether a row went away.
    async fn delete(&self, id: PermissionRuleId) -> Result<bool, RoleRepositoryError>;
}
