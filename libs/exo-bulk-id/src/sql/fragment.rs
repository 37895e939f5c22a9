// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use super::{
    ExpressionBuilder, SQLBuilder, SQLParam, schema_object::SchemaObjectName,
    sql_param_container::SQLParamContainer,
};

/// A piece of SQL supplied by the host's statement generator (a `FROM` clause, a filter, an
/// assigned value, etc.).
///
/// Fragments keep parameters separate from the SQL text, so that they can be renumbered when
/// spliced into a larger statement. For example, a filter `"mammal"."name" = $1` embedded in an
/// update that already has a parameter is rendered as `"mammal"."name" = $2`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFragment {
    parts: Vec<FragmentPart>,
}

#[derive(Debug, Clone, PartialEq)]
enum FragmentPart {
    Sql(String),
    Identifier(String),
    Table(SchemaObjectName),
    Param(SQLParamContainer),
}

impl SqlFragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fragment consisting of plain SQL text without parameters
    pub fn sql(text: impl Into<String>) -> Self {
        Self::new().push_sql(text)
    }

    /// A fragment referring to `<table>.<column>`
    pub fn column(table: &SchemaObjectName, column: impl Into<String>) -> Self {
        Self::new().push_column(table, column)
    }

    pub fn push_sql(mut self, text: impl Into<String>) -> Self {
        self.parts.push(FragmentPart::Sql(text.into()));
        self
    }

    pub fn push_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.parts.push(FragmentPart::Identifier(identifier.into()));
        self
    }

    pub fn push_table(mut self, table: &SchemaObjectName) -> Self {
        self.parts.push(FragmentPart::Table(table.clone()));
        self
    }

    pub fn push_column(self, table: &SchemaObjectName, column: impl Into<String>) -> Self {
        self.push_table(table).push_sql(".").push_identifier(column)
    }

    pub fn push_param<T: SQLParam + 'static>(mut self, param: T) -> Self {
        self.parts
            .push(FragmentPart::Param(SQLParamContainer::new(param)));
        self
    }

    pub fn push_fragment(mut self, other: SqlFragment) -> Self {
        self.parts.extend(other.parts);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl ExpressionBuilder for SqlFragment {
    fn build(&self, builder: &mut SQLBuilder) {
        for part in &self.parts {
            match part {
                FragmentPart::Sql(text) => builder.push_str(text),
                FragmentPart::Identifier(identifier) => builder.push_identifier(identifier),
                FragmentPart::Table(table) => table.build(builder),
                FragmentPart::Param(param) => builder.push_param(param.param()),
            }
        }
    }
}
