//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions into domain types live next
//! to the adapters that need them.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::schema::{attribute_definitions, attribute_values, employees, permission_rules, roles};

/// Row struct for reading from the roles table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = roles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RoleRow {
    pub id: i32,
    pub name: String,
    #[expect(dead_code, reason = "audit column not surfaced in the domain")]
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for creating roles.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = roles)]
pub(crate) struct NewRoleRow<'a> {
    pub name: &'a str,
}

/// Row struct for reading permission rules.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = permission_rules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PermissionRuleRow {
    pub id: i32,
    pub role_id: i32,
    pub method: String,
    pub endpoint: String,
}

/// Insertable struct for granting a rule.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = permission_rules)]
pub(crate) struct NewPermissionRuleRow<'a> {
    pub role_id: i32,
    pub method: &'a str,
    pub endpoint: &'a str,
}

/// Row struct for reading employees.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = employees)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct EmployeeRow {
    pub id: i32,
    pub names: String,
    pub lastnames: String,
    pub identification_type: String,
    pub identification_number: String,
    pub role_id: Option<i32>,
    pub login_enabled: bool,
    #[expect(dead_code, reason = "audit column not surfaced in the domain")]
    pub created_at: DateTime<Utc>,
    #[expect(dead_code, reason = "audit column not surfaced in the domain")]
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for creating employees.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = employees)]
pub(crate) struct NewEmployeeRow<'a> {
    pub names: &'a str,
    pub lastnames: &'a str,
    pub identification_type: &'a str,
    pub identification_number: &'a str,
    pub role_id: Option<i32>,
    pub login_enabled: bool,
}

/// Changeset struct for replacing employee fields.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = employees)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct EmployeeUpdate<'a> {
    pub names: &'a str,
    pub lastnames: &'a str,
    pub identification_type: &'a str,
    pub identification_number: &'a str,
    pub role_id: Option<i32>,
    pub login_enabled: bool,
    pub updated_at: DateTime<Utc>,
}

/// Row struct for reading attribute definitions.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = attribute_definitions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AttributeDefinitionRow {
    pub id: i32,
    pub owner_id: i32,
    pub name: String,
    pub multiple: bool,
}

/// Insertable struct for the definition upsert.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = attribute_definitions)]
pub(crate) struct NewAttributeDefinitionRow<'a> {
    pub owner_id: i32,
    pub name: &'a str,
    pub multiple: bool,
}

/// Row struct for reading attribute values.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = attribute_values)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AttributeValueRow {
    pub id: i32,
    pub definition_id: i32,
    pub value: String,
}

/// Insertable struct for attribute values.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = attribute_values)]
pub(crate) struct NewAttributeValueRow<'a> {
    pub definition_id: i32,
    pub value: &'a str,
}
