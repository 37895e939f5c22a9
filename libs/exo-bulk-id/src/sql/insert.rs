// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::{
    operation::IdSelect,
    subselect::{ExtraSelectValue, StagedIdSubselect},
};

use super::{ExpressionBuilder, SQLBuilder};

/// The insert-select copying the keys matched by an operation into the staging table.
#[derive(Debug)]
pub struct StagingInsert<'a> {
    /// Supplies the staging table and its id column
    pub subselect: &'a StagedIdSubselect,
    pub extra_select_value: &'a ExtraSelectValue,
    pub id_select: &'a IdSelect,
}

impl ExpressionBuilder for StagingInsert<'_> {
    /// Build `INSERT INTO <staging> (<id>, <discriminator>) SELECT <key>, <discriminator-value>
    /// FROM <from> WHERE <predicate>`. The `WHERE` is omitted if the id select has no predicate.
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_str("INSERT INTO ");
        self.subselect.staging_table.build(builder);
        builder.push_str(" (");
        builder.push_identifier(&self.subselect.id_column);
        builder.push_str(", ");
        builder.push_identifier(&self.extra_select_value.column);
        builder.push_str(") SELECT ");
        self.id_select.id_column.build(builder);
        builder.push_str(", ");
        self.extra_select_value.build(builder);
        builder.push_str(" FROM ");
        self.id_select.from.build(builder);

        if let Some(predicate) = &self.id_select.predicate {
            builder.push_str(" WHERE ");
            predicate.build(builder);
        }
    }
}
