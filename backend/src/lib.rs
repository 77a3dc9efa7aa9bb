//! Personnel management backend.
//!
//! Employees carry an open-ended set of named attributes that are replaced
//! atomically, and authenticate against roles whose permission rules are
//! grouped into a per-method manifest at login.
//!
//! - [`domain`] holds the types, services and ports.
//! - [`outbound`] holds the PostgreSQL and in-memory adapters.
//! - [`config`] loads runtime settings.

pub mod config;
pub mod domain;
pub mod outbound;
