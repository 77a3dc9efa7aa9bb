//! Read port for an employee's full attribute set.

use async_trait::async_trait;

use crate::domain::EmployeeId;
use crate::domain::attributes::AttributeWithValues;

use super::AttributeStoreError;

/// Port listing attributes with their values for display.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttributeSetQuery: Send + Sync {
    /// Attributes of `owner` ordered by name, values oldest first.
    ///
    /// An owner without attributes yields an empty list.
    async fn attributes_of(
        &self,
        owner: EmployeeId,
    ) -> Result<Vec<AttributeWithValues>, AttributeStoreError>;
}
