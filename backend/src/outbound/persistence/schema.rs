//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. They are used
//! by Diesel for compile-time query validation and type-safe SQL generation.

diesel::table! {
    /// Roles that group permission rules.
    roles (id) {
        /// Serial primary key.
        id -> Int4,
        /// Unique display name.
        name -> Varchar,
        /// Record creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Allowed `(method, endpoint)` pairs per role.
    permission_rules (id) {
        /// Serial primary key.
        id -> Int4,
        /// Owning role; rows are removed with the role.
        role_id -> Int4,
        /// Upper-case HTTP verb.
        method -> Varchar,
        /// Request path.
        endpoint -> Varchar,
    }
}

diesel::table! {
    /// Employee records with their fixed fields.
    employees (id) {
        /// Serial primary key.
        id -> Int4,
        /// Given names.
        names -> Varchar,
        /// Family names.
        lastnames -> Varchar,
        /// Upper-case document kind; unique together with the number.
        identification_type -> Varchar,
        /// Document number.
        identification_number -> Varchar,
        /// Optional role.
        role_id -> Nullable<Int4>,
        /// Whether the employee may authenticate.
        login_enabled -> Bool,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Attribute definitions, unique per `(owner_id, name)`.
    attribute_definitions (id) {
        /// Serial primary key.
        id -> Int4,
        /// Owning employee; rows are removed with the employee.
        owner_id -> Int4,
        /// Attribute name.
        name -> Varchar,
        /// Cardinality flag: `true` for multiple.
        multiple -> Bool,
    }
}

diesel::table! {
    /// Attribute values; ids grow in insertion order.
    attribute_values (id) {
        /// Serial primary key.
        id -> Int4,
        /// Owning definition.
        definition_id -> Int4,
        /// Raw value.
        value -> Text,
    }
}

diesel::joinable!(attribute_definitions -> employees (owner_id));
diesel::joinable!(attribute_values -> attribute_definitions (definition_id));
diesel::joinable!(employees -> roles (role_id));
diesel::joinable!(permission_rules -> roles (role_id));

diesel::allow_tables_to_appear_in_same_query!(
    attribute_definitions,
    attribute_values,
    employees,
    permission_rules,
    roles,
);
