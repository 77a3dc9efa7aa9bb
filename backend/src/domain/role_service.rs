//! Role administration: roles and the rules granted to them.

use std::sync::Arc;

use tracing::info;

use super::permission_aggregator::{PermissionAggregator, map_role_error};
use crate::domain::permissions::{
    PermissionManifest, PermissionRule, PermissionRuleDraft, Role, normalise_role_name,
};
use crate::domain::ports::{PermissionRuleRepository, RoleRepository};
use crate::domain::{Error, PermissionRuleId, RoleId};

/// Service managing roles and their permission rules.
#[derive(Clone)]
pub struct RoleService<R, P> {
    roles: Arc<R>,
    rules: Arc<P>,
    aggregator: PermissionAggregator<R, P>,
}

impl<R, P> RoleService<R, P> {
    /// Create a service over the given repositories.
    pub fn new(roles: Arc<R>, rules: Arc<P>) -> Self {
        let aggregator = PermissionAggregator::new(Arc::clone(&roles), Arc::clone(&rules));
        Self {
            roles,
            rules,
            aggregator,
        }
    }
}

impl<R, P> RoleService<R, P>
where
    R: RoleRepository,
    P: PermissionRuleRepository,
{
    /// All roles ordered by id.
    pub async fn list_roles(&self) -> Result<Vec<Role>, Error> {
        self.roles.list().await.map_err(map_role_error)
    }

    /// Fetch one role.
    pub async fn get_role(&self, id: RoleId) -> Result<Role, Error> {
        self.roles
            .find_by_id(id)
            .await
            .map_err(map_role_error)?
            .ok_or_else(|| Error::not_found(format!("role {id} not found")))
    }

    /// Grouped permissions of a role.
    pub async fn manifest(&self, id: RoleId) -> Result<PermissionManifest, Error> {
        self.aggregator.build_manifest(id).await
    }

    /// Raw rules of a role in storage order.
    pub async fn list_rules(&self, id: RoleId) -> Result<Vec<PermissionRule>, Error> {
        self.get_role(id).await?;
        self.rules.list_by_role(id).await.map_err(map_role_error)
    }

    /// Create a role with a trimmed, non-blank name.
    pub async fn create_role(&self, name: &str) -> Result<Role, Error> {
        let name = normalise_role_name(name)?;
        let role = self.roles.create(&name).await.map_err(map_role_error)?;
        info!(role_id = %role.id, "role created");
        Ok(role)
    }

    /// Rename a role.
    pub async fn rename_role(&self, id: RoleId, name: &str) -> Result<Role, Error> {
        let name = normalise_role_name(name)?;
        self.roles
            .rename(id, &name)
            .await
            .map_err(map_role_error)?
            .ok_or_else(|| Error::not_found(format!("role {id} not found")))
    }

    /// Delete a role together with its rules.
    pub async fn delete_role(&self, id: RoleId) -> Result<(), Error> {
        let removed = self.roles.delete(id).await.map_err(map_role_error)?;
        if !removed {
            return Err(Error::not_found(format!("role {id} not found")));
        }
        info!(role_id = %id, "role deleted");
        Ok(())
    }

    /// Allow `method` on `endpoint` for a role.
    pub async fn grant(
        &self,
        role_id: RoleId,
        method: &str,
        endpoint: &str,
    ) -> Result<PermissionRule, Error> {
        let draft = PermissionRuleDraft::new(role_id, method, endpoint)?;
        self.get_role(role_id).await?;
        let rule = self.rules.create(&draft).await.map_err(map_role_error)?;
        info!(
            role_id = %role_id,
            rule_id = %rule.id,
            method = %rule.method,
            endpoint = %rule.endpoint,
            "permission granted"
        );
        Ok(rule)
    }

    /// Remove one rule.
    pub async fn revoke(&self, rule_id: PermissionRuleId) -> Result<(), Error> {
        let removed = self.rules.delete(rule_id).await.map_err(map_role_error)?;
        if !removed {
            return Err(Error::not_found(format!(
                "permission rule {rule_id} not found"
            )));
        }
        info!(rule_id = %rule_id, "permission revoked");
        Ok(())
    }
}

#[cfg(test)]
#[path = "role_service_tests.rs"]
mod tests;
