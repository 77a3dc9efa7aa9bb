//! Tests for the role service.

use std::sync::Arc;

use super::*;
use crate::domain::ErrorCode;
use crate::domain::permissions::HttpMethod;
use crate::domain::ports::{MockPermissionRuleRepository, MockRoleRepository, RoleRepositoryError};

fn make_service(
    roles: MockRoleRepository,
    rules: MockPermissionRuleRepository,
) -> RoleService<MockRoleRepository, MockPermissionRuleRepository> {
    RoleService::new(Arc::new(roles), Arc::new(rules))
}

fn clerk() -> Role {
    Role {
        id: RoleId::new(3),
        name: "clerk".into(),
    }
}

#[tokio::test]
async fn create_role_trims_name() {
    let mut roles = MockRoleRepository::new();
    roles
        .expect_create()
        .withf(|name| name.to_string() == "clerk")
        .times(1)
        .return_once(|_| Ok(clerk()));

    let role = make_service(roles, MockPermissionRuleRepository::new())
        .create_role("  clerk ")
        .await
        .expect("role created");
    assert_eq!(role.id, RoleId::new(3));
}

#[tokio::test]
async fn create_role_rejects_blank_name() {
    let mut roles = MockRoleRepository::new();
    roles.expect_create().never();

    let error = make_service(roles, MockPermissionRuleRepository::new())
        .create_role("   ")
        .await
        .expect_err("blank name");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn duplicate_role_name_conflicts() {
    let mut roles = MockRoleRepository::new();
    roles
        .expect_create()
        .return_once(|_| Err(RoleRepositoryError::duplicate_name("clerk")));

    let error = make_service(roles, MockPermissionRuleRepository::new())
        .create_role("clerk")
        .await
        .expect_err("duplicate");
    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[tokio::test]
async fn grant_normalises_method_and_checks_role() {
    let mut roles = MockRoleRepository::new();
    roles
        .expect_find_by_id()
        .times(1)
        .return_once(|_| Ok(Some(clerk())));
    let mut rules = MockPermissionRuleRepository::new();
    rules
        .expect_create()
        .withf(|draft| draft.method.as_str() == "PATCH" && draft.endpoint == "/employees")
        .times(1)
        .return_once(|draft| {
            Ok(PermissionRule {
                id: PermissionRuleId::new(10),
                role_id: draft.role_id,
                method: draft.method.clone(),
                endpoint: draft.endpoint.clone(),
            })
        });

    let rule = make_service(roles, rules)
        .grant(RoleId::new(3), "patch", " /employees ")
        .await
        .expect("rule granted");
    assert_eq!(rule.method, HttpMethod::new("PATCH").expect("valid method"));
}

#[tokio::test]
async fn grant_to_missing_role_is_not_found() {
    let mut roles = MockRoleRepository::new();
    roles.expect_find_by_id().return_once(|_| Ok(None));
    let mut rules = MockPermissionRuleRepository::new();
    rules.expect_create().never();

    let error = make_service(roles, rules)
        .grant(RoleId::new(8), "GET", "/a")
        .await
        .expect_err("missing role");
    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn revoke_unknown_rule_is_not_found() {
    let mut rules = MockPermissionRuleRepository::new();
    rules.expect_delete().return_once(|_| Ok(false));

    let error = make_service(MockRoleRepository::new(), rules)
        .revoke(PermissionRuleId::new(44))
        .await
        .expect_err("unknown rule");
    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn delete_role_reports_missing_rows() {
    let mut roles = MockRoleRepository::new();
    roles.expect_delete().return_once(|_| Ok(false));

    let error = make_service(roles, MockPermissionRuleRepository::new())
        .delete_role(RoleId::new(5))
        .await
        .expect_err("missing role");
    assert_eq!(error.code(), ErrorCode::NotFound);
}
