// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{fmt::Display, sync::Arc};

use super::{ExpressionBuilder, SQLBuilder, SQLParam, schema_object::SchemaObjectName};

/// The step of a bulk operation a statement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementStep {
    /// The insert-select copying matched keys into the staging table
    Stage,
    /// An update or delete of one table in the hierarchy
    Apply,
    /// The delete of this operation's staged rows
    Cleanup,
}

impl Display for StatementStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StatementStep::Stage => "staging",
            StatementStep::Apply => "apply",
            StatementStep::Cleanup => "cleanup",
        })
    }
}

/// A fully rendered statement ready for execution, along with the context needed to report
/// failures and trace execution.
#[derive(Debug, Clone)]
pub struct BoundStatement {
    pub step: StatementStep,
    /// The table the statement modifies
    pub table: SchemaObjectName,
    /// The discriminator of the operation the statement belongs to
    pub discriminator: String,
    pub sql: String,
    pub params: Vec<Arc<dyn SQLParam>>,
}

impl BoundStatement {
    pub fn new(
        step: StatementStep,
        table: &SchemaObjectName,
        discriminator: &str,
        expression: &impl ExpressionBuilder,
    ) -> Self {
        let mut builder = SQLBuilder::new();
        expression.build(&mut builder);
        let (sql, params) = builder.into_sql();

        Self {
            step,
            table: table.clone(),
            discriminator: discriminator.to_string(),
            sql,
            params,
        }
    }

    /// The SQL and its parameters (mainly for assertions)
    pub fn binding(&self) -> (&str, &[Arc<dyn SQLParam>]) {
        (&self.sql, &self.params)
    }
}
