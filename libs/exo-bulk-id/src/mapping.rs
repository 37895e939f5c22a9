// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::{Deserialize, Serialize};

use crate::{bulk_id_error::BulkIdError, sql::schema_object::SchemaObjectName};

/// A physical table along with the column holding the entity key in that table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MappedTable {
    pub name: SchemaObjectName,
    /// For example, `id` in "animal" but `human_id` in "human" (when the subclass table
    /// names its primary key join column differently), or `human_human_id` in the "human_dog"
    /// collection table.
    pub key_column: String,
}

impl MappedTable {
    pub fn new(name: SchemaObjectName, key_column: impl Into<String>) -> Self {
        Self {
            name,
            key_column: key_column.into(),
        }
    }
}

/// The resolved mapping of an entity persisted with a joined-table hierarchy.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EntityMapping {
    /// The registered entity name, unique within the mapping metadata
    pub name: String,
    /// The table holding the entity's own columns
    pub table: MappedTable,
    /// Tables of the ancestors, nearest first. The entity's table is joined to each of these on
    /// the key columns.
    #[serde(default)]
    pub superclass_tables: Vec<MappedTable>,
    /// Every table a cascading delete must touch, in a safe order: collection tables and
    /// subclass tables before the entity's own table, and that before the ancestor tables.
    pub cascade_order: Vec<MappedTable>,
}

impl EntityMapping {
    /// The own table plus the superclass tables, i.e. every table holding a column of the entity
    pub fn hierarchy_tables(&self) -> impl Iterator<Item = &MappedTable> {
        std::iter::once(&self.table).chain(self.superclass_tables.iter())
    }

    /// The hierarchy table named `table_name`, given as `schema.table` or as a bare table name.
    /// A bare name shared by tables in different schemas is rejected as ambiguous.
    pub fn hierarchy_table(&self, table_name: &str) -> Result<&MappedTable, BulkIdError> {
        let matching: Vec<_> = self
            .hierarchy_tables()
            .filter(|table| table.name.name == table_name || table.name.to_string() == table_name)
            .collect();

        match matching[..] {
            [table] => Ok(table),
            [] => Err(BulkIdError::InvalidOperation(format!(
                "Table {table_name} is not part of the hierarchy of {}",
                self.name
            ))),
            _ => Err(BulkIdError::InvalidOperation(format!(
                "Table {table_name} is ambiguous in the hierarchy of {}",
                self.name
            ))),
        }
    }
}

/// Supplies the mapping metadata of entities by name.
pub trait MappingResolver {
    fn resolve(&self, entity_name: &str) -> Option<&EntityMapping>;
}

/// A simple list based [`MappingResolver`], usually deserialized from the host's metadata.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct EntityMappings {
    entities: Vec<EntityMapping>,
}

impl EntityMappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace an existing one with the same name) an entity mapping
    pub fn add(&mut self, entity: EntityMapping) {
        match self.entities.iter_mut().find(|e| e.name == entity.name) {
            Some(existing) => *existing = entity,
            None => self.entities.push(entity),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityMapping> {
        self.entities.iter()
    }
}

impl MappingResolver for EntityMappings {
    fn resolve(&self, entity_name: &str) -> Option<&EntityMapping> {
        self.entities.iter().find(|e| e.name == entity_name)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::AnimalSetup;

    use super::*;

    #[test]
    fn hierarchy_tables_start_from_own_table() {
        let setup = AnimalSetup::new();
        let names: Vec<_> = setup
            .entity("Human")
            .hierarchy_tables()
            .map(|t| t.name.name.as_str())
            .collect();

        assert_eq!(names, vec!["human", "mammal", "animal"]);
    }

    #[test]
    fn hierarchy_table_lookup() {
        let setup = AnimalSetup::new();
        let human = setup.entity("Human");

        assert_eq!(human.hierarchy_table("mammal").unwrap().key_column, "id");
        assert_eq!(human.hierarchy_table("human").unwrap().key_column, "human_id");
        assert!(matches!(
            human.hierarchy_table("reptile"),
            Err(BulkIdError::InvalidOperation(_))
        ));
    }

    #[test]
    fn hierarchy_table_lookup_considers_schema() {
        let base = MappedTable::new(SchemaObjectName::new("item", Some("a")), "id");
        let own = MappedTable::new(SchemaObjectName::new("item", Some("b")), "item_id");
        let entity = EntityMapping {
            name: "Item".into(),
            table: own.clone(),
            superclass_tables: vec![base.clone()],
            cascade_order: vec![own, base],
        };

        assert_eq!(entity.hierarchy_table("b.item").unwrap().key_column, "item_id");
        assert_eq!(entity.hierarchy_table("a.item").unwrap().key_column, "id");
        assert!(entity.hierarchy_table("c.item").is_err());

        match entity.hierarchy_table("item") {
            Err(BulkIdError::InvalidOperation(message)) => assert!(message.contains("ambiguous")),
            other => panic!("Expected an ambiguous table error, got {other:?}"),
        }
    }

    #[test]
    fn add_replaces_existing() {
        let setup = AnimalSetup::new();
        let mut mappings = setup.mappings.clone();

        let mut reptile = mappings.resolve("Reptile").unwrap().clone();
        reptile.cascade_order.clear();
        mappings.add(reptile);

        assert_eq!(mappings.iter().count(), 5);
        assert!(mappings.resolve("Reptile").unwrap().cascade_order.is_empty());
    }

    #[test]
    fn deserialize_from_json() {
        let mappings: EntityMappings = serde_json::from_str(
            r#"[{
                "name": "Reptile",
                "table": { "name": { "name": "reptile", "schema": "zoo" }, "key_column": "id" },
                "superclass_tables": [
                    { "name": { "name": "animal", "schema": "zoo" }, "key_column": "id" }
                ],
                "cascade_order": [
                    { "name": { "name": "reptile", "schema": "zoo" }, "key_column": "id" },
                    { "name": { "name": "animal", "schema": "zoo" }, "key_column": "id" }
                ]
            }]"#,
        )
        .unwrap();

        let reptile = mappings.resolve("Reptile").unwrap();
        assert_eq!(reptile.table.name, SchemaObjectName::new("reptile", Some("zoo")));
        assert_eq!(reptile.cascade_order.len(), 2);
        assert!(mappings.resolve("Mammal").is_none());
    }
}
