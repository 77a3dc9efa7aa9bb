//! Port running attribute writes as one all-or-nothing unit.
//!
//! The domain hands the adapter a closure. The adapter opens whatever
//! transactional scope it has, gives the closure an [`AttributeStore`] bound
//! to that scope, and commits only when the closure returns `Ok`.

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::domain::{EmployeeId, Error};

use super::AttributeStore;

/// Work executed against a transaction-scoped [`AttributeStore`].
pub type AttributeWork = Box<
    dyn for<'s> FnOnce(&'s dyn AttributeStore) -> BoxFuture<'s, Result<(), Error>> + Send,
>;

/// Box a closure as [`AttributeWork`].
///
/// Going through this function lets the compiler infer the higher-ranked
/// signature of an inline closure.
pub fn attribute_work<F>(work: F) -> AttributeWork
where
    F: for<'s> FnOnce(&'s dyn AttributeStore) -> BoxFuture<'s, Result<(), Error>> + Send + 'static,
{
    Box::new(work)
}

/// Transactional scope for attribute writes.
///
/// Implementations serialise units of work that target the same `owner`,
/// and apply none of the work's writes when it fails.
#[async_trait]
pub trait AttributeUnitOfWork: Send + Sync {
    /// Run `work` inside one transaction scoped to `owner`.
    async fn run(&self, owner: EmployeeId, work: AttributeWork) -> Result<(), Error>;
}
