// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::Display;

use crate::{
    bulk_id_error::BulkIdError,
    mapping::{EntityMapping, MappedTable},
    sql::fragment::SqlFragment,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOperationKind {
    Delete,
    Update,
}

impl Display for BulkOperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BulkOperationKind::Delete => "delete",
            BulkOperationKind::Update => "update",
        })
    }
}

/// The host's translation of the operation's filter into a select of matching keys.
///
/// Rendered by the staging insert as `SELECT <id_column>, <discriminator> FROM <from> WHERE
/// <predicate>`.
#[derive(Debug, Clone, PartialEq)]
pub struct IdSelect {
    /// The key expression, such as `"mammal"."id"`
    pub id_column: SqlFragment,
    /// The `FROM` clause (without the keyword), usually the entity table joined with its
    /// ancestors so that the predicate may refer to any inherited column
    pub from: SqlFragment,
    pub predicate: Option<SqlFragment>,
}

impl IdSelect {
    pub fn new(id_column: SqlFragment, from: SqlFragment) -> Self {
        Self {
            id_column,
            from,
            predicate: None,
        }
    }

    /// Select keys of all entities of the given type, joining the entity's table with its
    /// superclass tables:
    ///
    /// ```sql
    /// "human" INNER JOIN "mammal" ON "human"."human_id" = "mammal"."id"
    ///         INNER JOIN "animal" ON "human"."human_id" = "animal"."id"
    /// ```
    pub fn for_entity(entity: &EntityMapping) -> Self {
        let own = &entity.table;

        let from = entity.superclass_tables.iter().fold(
            SqlFragment::new().push_table(&own.name),
            |from, superclass| {
                from.push_sql(" INNER JOIN ")
                    .push_table(&superclass.name)
                    .push_sql(" ON ")
                    .push_column(&own.name, &own.key_column)
                    .push_sql(" = ")
                    .push_column(&superclass.name, &superclass.key_column)
            },
        );

        Self::new(SqlFragment::column(&own.name, &own.key_column), from)
    }

    pub fn with_predicate(mut self, predicate: SqlFragment) -> Self {
        self.predicate = Some(predicate);
        self
    }
}

/// `"<column>" = <value>` in an update's `SET` clause
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: SqlFragment,
}

impl Assignment {
    pub fn new(column: impl Into<String>, value: SqlFragment) -> Self {
        Self {
            column: column.into(),
            value,
        }
    }
}

/// The statement to apply to one physical table
#[derive(Debug, Clone, PartialEq)]
pub enum TableStatement {
    Delete {
        table: MappedTable,
    },
    Update {
        table: MappedTable,
        assignments: Vec<Assignment>,
    },
}

impl TableStatement {
    pub fn table(&self) -> &MappedTable {
        match self {
            TableStatement::Delete { table } | TableStatement::Update { table, .. } => table,
        }
    }

    fn kind(&self) -> BulkOperationKind {
        match self {
            TableStatement::Delete { .. } => BulkOperationKind::Delete,
            TableStatement::Update { .. } => BulkOperationKind::Update,
        }
    }
}

/// A resolved bulk operation: the target entity, the select of matching keys and the per-table
/// statements in the order they must be applied.
#[derive(Debug, Clone)]
pub struct BulkOperation<'a> {
    pub kind: BulkOperationKind,
    pub entity: &'a EntityMapping,
    pub id_select: IdSelect,
    pub table_statements: Vec<TableStatement>,
}

impl<'a> BulkOperation<'a> {
    /// A delete cascading over the entity's `cascade_order`.
    pub fn delete(entity: &'a EntityMapping, id_select: IdSelect) -> Self {
        Self {
            kind: BulkOperationKind::Delete,
            entity,
            id_select,
            table_statements: entity
                .cascade_order
                .iter()
                .map(|table| TableStatement::Delete {
                    table: table.clone(),
                })
                .collect(),
        }
    }

    /// An update without any assignments. Add them with [`BulkOperation::set`].
    pub fn update(entity: &'a EntityMapping, id_select: IdSelect) -> Self {
        Self {
            kind: BulkOperationKind::Update,
            entity,
            id_select,
            table_statements: vec![],
        }
    }

    /// Assign `value` to `column` of the hierarchy table `table_name`. Assignments to the same
    /// table are grouped into one statement; tables are updated in the order they were first
    /// assigned.
    pub fn set(
        mut self,
        table_name: &str,
        column: impl Into<String>,
        value: SqlFragment,
    ) -> Result<Self, BulkIdError> {
        if self.kind != BulkOperationKind::Update {
            return Err(BulkIdError::InvalidOperation(format!(
                "Cannot assign columns in a bulk {} of {}",
                self.kind, self.entity.name
            )));
        }

        let entity = self.entity;
        let table = entity.hierarchy_table(table_name)?;

        let assignment = Assignment::new(column, value);

        let existing = self
            .table_statements
            .iter_mut()
            .find_map(|statement| match statement {
                TableStatement::Update {
                    table: existing_table,
                    assignments,
                } if existing_table == table => Some(assignments),
                _ => None,
            });

        match existing {
            Some(assignments) => assignments.push(assignment),
            None => self.table_statements.push(TableStatement::Update {
                table: table.clone(),
                assignments: vec![assignment],
            }),
        }

        Ok(self)
    }

    /// Check that the operation can be executed. Called before any statement runs.
    pub fn validate(&self) -> Result<(), BulkIdError> {
        let fail = |reason: String| {
            Err(BulkIdError::InvalidOperation(format!(
                "Bulk {} of {}: {reason}",
                self.kind, self.entity.name
            )))
        };

        if self.table_statements.is_empty() {
            return fail("no table statements".to_string());
        }

        for statement in &self.table_statements {
            if statement.kind() != self.kind {
                return fail(format!(
                    "unexpected {} statement for table {}",
                    statement.kind(),
                    statement.table().name
                ));
            }

            if statement.table().key_column.trim().is_empty() {
                return fail(format!("table {} has no key column", statement.table().name));
            }

            if let TableStatement::Update { table, assignments } = statement
                && assignments.is_empty()
            {
                return fail(format!("no assignments for table {}", table.name));
            }
        }

        Ok(())
    }
}
