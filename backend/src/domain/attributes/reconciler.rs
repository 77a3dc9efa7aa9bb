//! Reconcile an employee's stored attributes with a desired mapping.
//!
//! Reconciliation runs in three ordered phases inside one unit of work:
//!
//! 1. every uniqueness-sensitive value is checked, before any write;
//! 2. each desired name is upserted and its values replaced;
//! 3. definitions missing from the desired mapping are removed, values
//!    first.
//!
//! Phase 2 finishes before phase 3 starts so a name that is kept never
//! loses its definition id. Phase 2 merges rather than inserts, so running
//! the same mapping twice leaves identical rows and ids.

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tracing::{debug, info};

use super::{AttributeName, Cardinality, DesiredAttributes, UniquenessValidator, map_store_error};
use crate::domain::ports::{AttributeStore, AttributeUnitOfWork, attribute_work};
use crate::domain::{EmployeeId, Error, ValueId};

/// Applies desired attribute mappings atomically through a unit of work.
pub struct AttributeReconciler<U: ?Sized> {
    unit_of_work: Arc<U>,
    validator: Arc<UniquenessValidator>,
}

impl<U: ?Sized> Clone for AttributeReconciler<U> {
    fn clone(&self) -> Self {
        Self {
            unit_of_work: Arc::clone(&self.unit_of_work),
            validator: Arc::clone(&self.validator),
        }
    }
}

impl<U: ?Sized> AttributeReconciler<U> {
    /// Create a reconciler over the given unit of work.
    pub fn new(unit_of_work: Arc<U>, validator: UniquenessValidator) -> Self {
        Self {
            unit_of_work,
            validator: Arc::new(validator),
        }
    }

    /// Uniqueness rules applied before writes.
    pub fn validator(&self) -> &UniquenessValidator {
        &self.validator
    }
}

impl<U> AttributeReconciler<U>
where
    U: AttributeUnitOfWork + ?Sized,
{
    /// Replace the attribute set of `owner` with `desired`.
    ///
    /// Either every change is committed or none is.
    pub async fn reconcile(
        &self,
        owner: EmployeeId,
        desired: DesiredAttributes,
    ) -> Result<(), Error> {
        self.reconcile_then(owner, desired, |_| async { Ok(()) }.boxed())
            .await
    }

    /// Reconcile `desired`, then run `finish` in the same unit of work.
    ///
    /// A failure in `finish` rolls the attribute changes back as well.
    pub async fn reconcile_then<F>(
        &self,
        owner: EmployeeId,
        desired: DesiredAttributes,
        finish: F,
    ) -> Result<(), Error>
    where
        F: for<'s> FnOnce(&'s dyn AttributeStore) -> BoxFuture<'s, Result<(), Error>>
            + Send
            + 'static,
    {
        let validator = Arc::clone(&self.validator);
        let desired_count = desired.len();
        let work = attribute_work(move |store| {
            async move {
                reconcile_within(store, &validator, owner, &desired).await?;
                finish(store).await
            }
            .boxed()
        });

        self.unit_of_work.run(owner, work).await?;
        info!(owner_id = %owner, attributes = desired_count, "attributes reconciled");
        Ok(())
    }

    /// Change the cardinality tag of one of `owner`'s attributes.
    ///
    /// Downgrading to `single` fails with a conflict while the definition
    /// still holds more than one value.
    pub async fn set_cardinality(
        &self,
        owner: EmployeeId,
        name: AttributeName,
        cardinality: Cardinality,
    ) -> Result<(), Error> {
        let work = attribute_work(move |store| {
            async move {
                let definition = store
                    .find_by_owner_and_name(owner, &name)
                    .await
                    .map_err(map_store_error)?
                    .ok_or_else(|| {
                        Error::not_found(format!("employee {owner} has no attribute '{name}'"))
                    })?;
                store
                    .set_cardinality(definition.id, cardinality)
                    .await
                    .map_err(map_store_error)
            }
            .boxed()
        });

        self.unit_of_work.run(owner, work).await
    }
}

/// Reconciliation steps against a store already scoped to one transaction.
pub async fn reconcile_within(
    store: &dyn AttributeStore,
    validator: &UniquenessValidator,
    owner: EmployeeId,
    desired: &DesiredAttributes,
) -> Result<(), Error> {
    validator.check_desired(store, owner, desired).await?;

    for (name, values) in desired {
        let requested = Cardinality::for_value_count(values.len());
        let definition_id = store
            .upsert(owner, name, requested)
            .await
            .map_err(map_store_error)?;
        store
            .replace_all(definition_id, values)
            .await
            .map_err(map_store_error)?;
        debug!(
            owner_id = %owner,
            attribute = %name,
            definition_id = %definition_id,
            values = values.len(),
            "attribute upserted"
        );
    }

    let stale = store
        .list_by_owner(owner)
        .await
        .map_err(map_store_error)?
        .into_iter()
        .filter(|definition| !desired.contains_name(&definition.name));

    for definition in stale {
        let value_ids: Vec<ValueId> = store
            .list_by_definition(definition.id)
            .await
            .map_err(map_store_error)?
            .into_iter()
            .map(|value| value.id)
            .collect();
        store
            .delete_all(&value_ids)
            .await
            .map_err(map_store_error)?;
        store.delete(definition.id).await.map_err(map_store_error)?;
        debug!(
            owner_id = %owner,
            attribute = %definition.name,
            definition_id = %definition.id,
            "attribute removed"
        );
    }

    Ok(())
}
