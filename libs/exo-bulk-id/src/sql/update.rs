// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::{operation::Assignment, subselect::StagedKeyMembership};

use super::{ExpressionBuilder, SQLBuilder, schema_object::SchemaObjectName};

/// Update the rows of one table whose key is among the staged keys.
#[derive(Debug)]
pub struct TableUpdate<'a> {
    pub table: &'a SchemaObjectName,
    pub assignments: &'a [Assignment],
    pub membership: StagedKeyMembership<'a>,
}

impl ExpressionBuilder for TableUpdate<'_> {
    /// Build `UPDATE <table> SET <column = value, ...> WHERE (<key>) IN (<staged id subselect>)`
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_str("UPDATE ");
        self.table.build(builder);

        builder.push_str(" SET ");
        builder.push_iter(self.assignments.iter(), ", ", |builder, assignment| {
            builder.push_identifier(&assignment.column);
            builder.push_str(" = ");
            assignment.value.build(builder);
        });

        builder.push_str(" WHERE ");
        self.membership.build(builder);
    }
}
