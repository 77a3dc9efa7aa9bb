//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! This module provides concrete implementations of the personnel ports
//! backed by PostgreSQL via `diesel-async` with `bb8` connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: repositories only translate between Diesel rows and
//!   domain types. No business logic resides here.
//! - **Internal models**: row structs (`models.rs`) and the table schema
//!   (`schema.rs`) never leak into the domain layer.
//! - **Transactional attributes**: attribute writes go through
//!   [`DieselAttributeUnitOfWork`], which scopes every store call to one
//!   transaction holding a per-owner advisory lock.
//!
//! # Example
//!
//! ```ignore
//! use personnel::outbound::persistence::{DbPool, DieselEmployeeRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/personnel")).await?;
//! let employees = DieselEmployeeRepository::new(pool);
//! ```

mod diesel_attribute_set_query;
mod diesel_attribute_store;
mod diesel_employee_repository;
mod diesel_error_mapping;
mod diesel_role_repository;
mod models;
mod pool;
mod schema;

pub use diesel_attribute_set_query::DieselAttributeSetQuery;
pub use diesel_attribute_store::{DieselAttributeUnitOfWork, TransactionalAttributeStore};
pub use diesel_employee_repository::DieselEmployeeRepository;
pub use diesel_role_repository::{DieselPermissionRuleRepository, DieselRoleRepository};
pub use pool::{DbPool, PoolConfig, PoolError};
