//! Driven ports for the attribute (entity-attribute-value) store.
//!
//! Definitions and values are split across two ports so adapters can back
//! them with separate tables. [`AttributeOwnerLookup`] answers the
//! cross-employee question used by uniqueness checks. [`AttributeStore`]
//! bundles them, plus the employee row writer, for code that runs inside
//! one unit of work.

use async_trait::async_trait;

use crate::domain::attributes::{AttributeDefinition, AttributeName, AttributeValue, Cardinality};
use crate::domain::{DefinitionId, EmployeeId, ValueId};

use super::{EmployeeRecordWriter, define_port_error};

define_port_error! {
    /// Errors raised by attribute store adapters.
    pub enum AttributeStoreError {
        /// Store connection could not be established.
        Connection { message: String } =>
            "attribute store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "attribute store query failed: {message}",
        /// A definition id did not resolve to a live row.
        DefinitionNotFound { id: DefinitionId } =>
            "attribute definition {id} not found",
        /// A downgrade to `single` was refused because of stored values.
        CardinalityConflict { id: DefinitionId, values: usize } =>
            "attribute definition {id} holds {values} values",
    }
}

/// Port owning attribute definitions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttributeDefinitionStore: Send + Sync {
    /// Insert the definition for `(owner, name)` or merge `cardinality` into
    /// the existing one, returning its id.
    ///
    /// Merging follows [`Cardinality::merge`]: a stored `multiple` stays
    /// `multiple`. Two concurrent calls for the same key converge on one row.
    async fn upsert(
        &self,
        owner: EmployeeId,
        name: &AttributeName,
        cardinality: Cardinality,
    ) -> Result<DefinitionId, AttributeStoreError>;

    /// Fetch the definition of `name` owned by `owner`.
    async fn find_by_owner_and_name(
        &self,
        owner: EmployeeId,
        name: &AttributeName,
    ) -> Result<Option<AttributeDefinition>, AttributeStoreError>;

    /// All definitions owned by `owner`, ordered by name.
    async fn list_by_owner(
        &self,
        owner: EmployeeId,
    ) -> Result<Vec<AttributeDefinition>, AttributeStoreError>;

    /// Remove a definition. Callers delete its values first.
    async fn delete(&self, id: DefinitionId) -> Result<(), AttributeStoreError>;

    /// Overwrite the cardinality tag of a definition.
    ///
    /// Setting `single` fails with
    /// [`AttributeStoreError::CardinalityConflict`] while more than one value
    /// is stored.
    async fn set_cardinality(
        &self,
        id: DefinitionId,
        cardinality: Cardinality,
    ) -> Result<(), AttributeStoreError>;
}

/// Port owning attribute values.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttributeValueStore: Send + Sync {
    /// Values of a definition, oldest first.
    async fn list_by_definition(
        &self,
        definition_id: DefinitionId,
    ) -> Result<Vec<AttributeValue>, AttributeStoreError>;

    /// Append one value.
    async fn save(
        &self,
        definition_id: DefinitionId,
        value: &str,
    ) -> Result<ValueId, AttributeStoreError>;

    /// Remove the given values. Unknown ids are ignored.
    async fn delete_all(&self, ids: &[ValueId]) -> Result<(), AttributeStoreError>;

    /// Replace every value of a definition with `values`, in order.
    ///
    /// A `single` definition never observes two values, and more than one
    /// value is refused with [`AttributeStoreError::CardinalityConflict`].
    async fn replace_all(
        &self,
        definition_id: DefinitionId,
        values: &[String],
    ) -> Result<(), AttributeStoreError>;
}

/// Port answering "who else holds this value?".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttributeOwnerLookup: Send + Sync {
    /// Some employee other than `exclude_owner` holding `value` under `name`.
    async fn find_other_owner(
        &self,
        name: &AttributeName,
        value: &str,
        exclude_owner: EmployeeId,
    ) -> Result<Option<EmployeeId>, AttributeStoreError>;
}

/// Every port reachable from inside one unit of work.
pub trait AttributeStore:
    AttributeDefinitionStore + AttributeValueStore + AttributeOwnerLookup + EmployeeRecordWriter
{
}

impl<T> AttributeStore for T where
    T: AttributeDefinitionStore
        + AttributeValueStore
        + AttributeOwnerLookup
        + EmployeeRecordWriter
{
}
