//! Build the permission manifest of a role.

use std::sync::Arc;

use tracing::debug;

use crate::domain::permissions::{PermissionManifest, Role};
use crate::domain::ports::{PermissionRuleRepository, RoleRepository, RoleRepositoryError};
use crate::domain::{Error, RoleId};

/// Map role and rule repository failures onto the domain taxonomy.
pub(crate) fn map_role_error(error: RoleRepositoryError) -> Error {
    match error {
        RoleRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("role repository unavailable: {message}"))
        }
        RoleRepositoryError::Query { message } => {
            Error::internal(format!("role repository error: {message}"))
        }
        RoleRepositoryError::DuplicateName { name } => {
            Error::conflict(format!("role '{name}' already exists"))
        }
    }
}

/// Groups a role's flat rule list into a [`PermissionManifest`].
///
/// The manifest is recomputed on every call; nothing is cached.
#[derive(Clone)]
pub struct PermissionAggregator<R, P> {
    roles: Arc<R>,
    rules: Arc<P>,
}

impl<R, P> PermissionAggregator<R, P> {
    /// Create an aggregator over the given repositories.
    pub fn new(roles: Arc<R>, rules: Arc<P>) -> Self {
        Self { roles, rules }
    }
}

impl<R, P> PermissionAggregator<R, P>
where
    R: RoleRepository,
    P: PermissionRuleRepository,
{
    /// Manifest of `role_id`. Fails with `not_found` when the role is
    /// missing; a role without rules yields an empty manifest.
    pub async fn build_manifest(&self, role_id: RoleId) -> Result<PermissionManifest, Error> {
        let (_, manifest) = self.role_with_manifest(role_id).await?;
        Ok(manifest)
    }

    /// The role row together with its manifest.
    pub async fn role_with_manifest(
        &self,
        role_id: RoleId,
    ) -> Result<(Role, PermissionManifest), Error> {
        let role = self
            .roles
            .find_by_id(role_id)
            .await
            .map_err(map_role_error)?
            .ok_or_else(|| Error::not_found(format!("role {role_id} not found")))?;
        let rules = self
            .rules
            .list_by_role(role_id)
            .await
            .map_err(map_role_error)?;
        let manifest = PermissionManifest::from_rules(&rules);
        debug!(
            role_id = %role_id,
            rules = rules.len(),
            methods = manifest.len(),
            "permission manifest built"
        );
        Ok((role, manifest))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::PermissionRuleId;
    use crate::domain::permissions::{HttpMethod, PermissionRule};
    use crate::domain::ports::{MockPermissionRuleRepository, MockRoleRepository};
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn role() -> Role {
        Role {
            id: RoleId::new(2),
            name: "clerk".into(),
        }
    }

    fn rule(id: i32, method: &str, endpoint: &str) -> PermissionRule {
        PermissionRule {
            id: PermissionRuleId::new(id),
            role_id: RoleId::new(2),
            method: HttpMethod::new(method).expect("valid method"),
            endpoint: endpoint.to_owned(),
        }
    }

    fn aggregator(
        roles: MockRoleRepository,
        rules: MockPermissionRuleRepository,
    ) -> PermissionAggregator<MockRoleRepository, MockPermissionRuleRepository> {
        PermissionAggregator::new(Arc::new(roles), Arc::new(rules))
    }

    #[rstest]
    #[tokio::test]
    async fn groups_rules_by_method(role: Role) {
        let mut roles = MockRoleRepository::new();
        roles
            .expect_find_by_id()
            .times(1)
            .return_once(move |_| Ok(Some(role)));
        let mut rules = MockPermissionRuleRepository::new();
        rules.expect_list_by_role().times(1).return_once(|_| {
            Ok(vec![
                rule(1, "GET", "/a"),
                rule(2, "GET", "/b"),
                rule(3, "POST", "/a"),
            ])
        });

        let manifest = aggregator(roles, rules)
            .build_manifest(RoleId::new(2))
            .await
            .expect("manifest");

        assert_eq!(
            serde_json::to_value(&manifest).expect("serialise"),
            json!([{"GET": ["/a", "/b"]}, {"POST": ["/a"]}])
        );
    }

    #[rstest]
    #[tokio::test]
    async fn role_without_rules_has_empty_manifest(role: Role) {
        let mut roles = MockRoleRepository::new();
        roles
            .expect_find_by_id()
            .return_once(move |_| Ok(Some(role)));
        let mut rules = MockPermissionRuleRepository::new();
        rules.expect_list_by_role().return_once(|_| Ok(Vec::new()));

        let manifest = aggregator(roles, rules)
            .build_manifest(RoleId::new(2))
            .await
            .expect("manifest");
        assert!(manifest.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn missing_role_is_not_found() {
        let mut roles = MockRoleRepository::new();
        roles.expect_find_by_id().return_once(|_| Ok(None));
        let mut rules = MockPermissionRuleRepository::new();
        rules.expect_list_by_role().never();

        let error = aggregator(roles, rules)
            .build_manifest(RoleId::new(9))
            .await
            .expect_err("missing role");
        assert_eq!(error.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[case(RoleRepositoryError::connection("refused"), ErrorCode::ServiceUnavailable)]
    #[case(RoleRepositoryError::query("syntax"), ErrorCode::InternalError)]
    #[case(RoleRepositoryError::duplicate_name("clerk"), ErrorCode::Conflict)]
    fn repository_errors_map_to_codes(
        #[case] error: RoleRepositoryError,
        #[case] expected: ErrorCode,
    ) {
        assert_eq!(map_role_error(error).code(), expected);
    }
}
