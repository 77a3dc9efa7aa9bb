//! Attribute rows held in memory and the store staged over them.
//!
//! The staged store also carries a copy of the employee rows so a row
//! rewrite commits or rolls back with the attribute writes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::attributes::{
    AttributeDefinition, AttributeName, AttributeValue, AttributeWithValues, Cardinality,
};
use crate::domain::ports::{
    AttributeDefinitionStore, AttributeOwnerLookup, AttributeStoreError, AttributeValueStore,
    EmployeeRecordWriter, EmployeeRepositoryError,
};
use crate::domain::{DefinitionId, Employee, EmployeeDraft, EmployeeId, ValueId};

use super::{EmployeeTable, duplicate_identification, identification_taken};

#[derive(Debug, Clone)]
struct DefinitionRow {
    owner_id: EmployeeId,
    name: AttributeName,
    multiple: bool,
}

#[derive(Debug, Clone)]
struct ValueRow {
    definition_id: DefinitionId,
    value: String,
}

/// Attribute definitions and values keyed by ascending serial ids.
#[derive(Debug, Clone, Default)]
pub(super) struct AttributeTables {
    last_definition_id: i32,
    last_value_id: i32,
    definitions: BTreeMap<DefinitionId, DefinitionRow>,
    values: BTreeMap<ValueId, ValueRow>,
}

impl AttributeTables {
    fn definition(&self, id: DefinitionId) -> Result<&DefinitionRow, AttributeStoreError> {
        self.definitions
            .get(&id)
            .ok_or_else(|| AttributeStoreError::definition_not_found(id))
    }

    fn value_count(&self, id: DefinitionId) -> usize {
        self.values
            .values()
            .filter(|row| row.definition_id == id)
            .count()
    }

    fn insert_value(&mut self, definition_id: DefinitionId, value: &str) -> ValueId {
        self.last_value_id += 1;
        let id = ValueId::new(self.last_value_id);
        self.values.insert(
            id,
            ValueRow {
                definition_id,
                value: value.to_owned(),
            },
        );
        id
    }

    fn to_definition(id: DefinitionId, row: &DefinitionRow) -> AttributeDefinition {
        AttributeDefinition {
            id,
            owner_id: row.owner_id,
            name: row.name.clone(),
            cardinality: Cardinality::from_multiple_flag(row.multiple),
        }
    }

    /// Remove every definition of `owner` and the values under them.
    pub(super) fn remove_owner(&mut self, owner: EmployeeId) {
        let doomed: Vec<DefinitionId> = self
            .definitions
            .iter()
            .filter(|(_, row)| row.owner_id == owner)
            .map(|(id, _)| *id)
            .collect();
        for id in doomed {
            self.definitions.remove(&id);
            self.values.retain(|_, row| row.definition_id != id);
        }
    }

    /// Attribute set of `owner`, names ascending and values oldest first.
    pub(super) fn attributes_of(&self, owner: EmployeeId) -> Vec<AttributeWithValues> {
        let mut attributes: Vec<AttributeWithValues> = self
            .definitions
            .iter()
            .filter(|(_, row)| row.owner_id == owner)
            .map(|(id, row)| AttributeWithValues {
                name: row.name.clone(),
                cardinality: Cardinality::from_multiple_flag(row.multiple),
                values: self
                    .values
                    .values()
                    .filter(|value| value.definition_id == *id)
                    .map(|value| value.value.clone())
                    .collect(),
            })
            .collect();
        attributes.sort_by(|left, right| left.name.cmp(&right.name));
        attributes
    }
}

/// Copy of [`AttributeTables`] and the employee rows that one unit of
/// work writes to.
///
/// The copy replaces the shared tables only when the work succeeds.
pub(super) struct StagedAttributes {
    tables: Mutex<AttributeTables>,
    employees: Mutex<EmployeeTable>,
}

impl StagedAttributes {
    pub(super) fn new(tables: AttributeTables, employees: EmployeeTable) -> Self {
        Self {
            tables: Mutex::new(tables),
            employees: Mutex::new(employees),
        }
    }

    pub(super) fn into_parts(self) -> (AttributeTables, EmployeeTable) {
        (self.tables.into_inner(), self.employees.into_inner())
    }
}

#[async_trait]
impl AttributeDefinitionStore for StagedAttributes {
    async fn upsert(
        &self,
        owner: EmployeeId,
        name: &AttributeName,
        cardinality: Cardinality,
    ) -> Result<DefinitionId, AttributeStoreError> {
        let mut tables = self.tables.lock().await;
        let existing = tables
            .definitions
            .iter_mut()
            .find(|(_, row)| row.owner_id == owner && &row.name == name);
        if let Some((id, row)) = existing {
            row.multiple = Cardinality::from_multiple_flag(row.multiple)
                .merge(cardinality)
                .is_multiple();
            return Ok(*id);
        }

        tables.last_definition_id += 1;
        let id = DefinitionId::new(tables.last_definition_id);
        tables.definitions.insert(
            id,
            DefinitionRow {
                owner_id: owner,
                name: name.clone(),
                multiple: cardinality.is_multiple(),
            },
        );
        Ok(id)
    }

    async fn find_by_owner_and_name(
        &self,
        owner: EmployeeId,
        name: &AttributeName,
    ) -> Result<Option<AttributeDefinition>, AttributeStoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .definitions
            .iter()
            .find(|(_, row)| row.owner_id == owner && &row.name == name)
            .map(|(id, row)| AttributeTables::to_definition(*id, row)))
    }

    async fn list_by_owner(
        &self,
        owner: EmployeeId,
    ) -> Result<Vec<AttributeDefinition>, AttributeStoreError> {
        let tables = self.tables.lock().await;
        let mut definitions: Vec<AttributeDefinition> = tables
            .definitions
            .iter()
            .filter(|(_, row)| row.owner_id == owner)
            .map(|(id, row)| AttributeTables::to_definition(*id, row))
            .collect();
        definitions.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(definitions)
    }

    async fn delete(&self, id: DefinitionId) -> Result<(), AttributeStoreError> {
        let mut tables = self.tables.lock().await;
        if tables.definitions.remove(&id).is_none() {
            return Err(AttributeStoreError::definition_not_found(id));
        }
        tables.values.retain(|_, row| row.definition_id != id);
        Ok(())
    }

    async fn set_cardinality(
        &self,
        id: DefinitionId,
        cardinality: Cardinality,
    ) -> Result<(), AttributeStoreError> {
        let mut tables = self.tables.lock().await;
        tables.definition(id)?;
        let values = tables.value_count(id);
        if !cardinality.admits(values) {
            return Err(AttributeStoreError::cardinality_conflict(id, values));
        }
        if let Some(row) = tables.definitions.get_mut(&id) {
            row.multiple = cardinality.is_multiple();
        }
        Ok(())
    }
}

#[async_trait]
impl AttributeValueStore for StagedAttributes {
    async fn list_by_definition(
        &self,
        definition_id: DefinitionId,
    ) -> Result<Vec<AttributeValue>, AttributeStoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .values
            .iter()
            .filter(|(_, row)| row.definition_id == definition_id)
            .map(|(id, row)| AttributeValue {
                id: *id,
                definition_id,
                value: row.value.clone(),
            })
            .collect())
    }

    async fn save(
        &self,
        definition_id: DefinitionId,
        value: &str,
    ) -> Result<ValueId, AttributeStoreError> {
        let mut tables = self.tables.lock().await;
        let multiple = tables.definition(definition_id)?.multiple;
        let existing = tables.value_count(definition_id);
        if !multiple && existing > 0 {
            return Err(AttributeStoreError::cardinality_conflict(
                definition_id,
                existing + 1,
            ));
        }
        Ok(tables.insert_value(definition_id, value))
    }

    async fn delete_all(&self, ids: &[ValueId]) -> Result<(), AttributeStoreError> {
        let mut tables = self.tables.lock().await;
        for id in ids {
            tables.values.remove(id);
        }
        Ok(())
    }

    async fn replace_all(
        &self,
        definition_id: DefinitionId,
        values: &[String],
    ) -> Result<(), AttributeStoreError> {
        let mut tables = self.tables.lock().await;
        let multiple = tables.definition(definition_id)?.multiple;
        let cardinality = Cardinality::from_multiple_flag(multiple);
        if !cardinality.admits(values.len()) {
            return Err(AttributeStoreError::cardinality_conflict(
                definition_id,
                values.len(),
            ));
        }
        tables
            .values
            .retain(|_, row| row.definition_id != definition_id);
        for value in values {
            tables.insert_value(definition_id, value);
        }
        Ok(())
    }
}

#[async_trait]
impl AttributeOwnerLookup for StagedAttributes {
    async fn find_other_owner(
        &self,
        name: &AttributeName,
        value: &str,
        exclude_owner: EmployeeId,
    ) -> Result<Option<EmployeeId>, AttributeStoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .values
            .values()
            .filter(|row| row.value == value)
            .filter_map(|row| tables.definitions.get(&row.definition_id))
            .find(|definition| &definition.name == name && definition.owner_id != exclude_owner)
            .map(|definition| definition.owner_id))
    }
}

#[async_trait]
impl EmployeeRecordWriter for StagedAttributes {
    async fn rewrite(
        &self,
        id: EmployeeId,
        draft: &EmployeeDraft,
    ) -> Result<Option<Employee>, EmployeeRepositoryError> {
        let mut employees = self.employees.lock().await;
        if !employees.contains_key(&id) {
            return Ok(None);
        }
        if identification_taken(&employees, &draft.identification, Some(id)) {
            return Err(duplicate_identification(&draft.identification));
        }
        let employee = Employee::from_draft(id, draft.clone());
        employees.insert(id, employee.clone());
        Ok(Some(employee))
    }
}
