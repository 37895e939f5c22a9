// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use crate::subselect::StagedKeyMembership;

use super::{ExpressionBuilder, SQLBuilder, schema_object::SchemaObjectName};

/// Delete the rows of one table whose key is among the staged keys.
#[derive(Debug)]
pub struct TableDelete<'a> {
    pub table: &'a SchemaObjectName,
    pub membership: StagedKeyMembership<'a>,
}

impl ExpressionBuilder for TableDelete<'_> {
    /// Build `DELETE FROM <table> WHERE (<key>) IN (<staged id subselect>)`
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_str("DELETE FROM ");
        self.table.build(builder);
        builder.push_str(" WHERE ");
        self.membership.build(builder);
    }
}

/// Delete the staged rows carrying a discriminator.
///
/// The discriminator is always bound as a parameter here, regardless of the configured
/// rendering, since this statement is entirely ours.
#[derive(Debug)]
pub struct StagingDelete<'a> {
    pub staging_table: &'a SchemaObjectName,
    pub discriminator_column: &'a str,
    pub discriminator: &'a str,
}

impl ExpressionBuilder for StagingDelete<'_> {
    /// Build `DELETE FROM <staging> WHERE <discriminator-column> = $1`
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_str("DELETE FROM ");
        self.staging_table.build(builder);
        builder.push_str(" WHERE ");
        builder.push_identifier(self.discriminator_column);
        builder.push_str(" = ");
        builder.push_param(Arc::new(self.discriminator.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use crate::{subselect::DiscriminatorRendering, test_support::staging_fragments};

    use super::*;

    #[test]
    fn delete_of_staged_keys() {
        let (subselect, _) = staging_fragments("Mammal", DiscriminatorRendering::Bound);
        let dog = SchemaObjectName::new("dog", None);

        let delete = TableDelete {
            table: &dog,
            membership: subselect.membership("id"),
        };

        assert_binding!(
            delete.to_sql(),
            r#"DELETE FROM "dog" WHERE ("id") IN (SELECT "id" FROM "ht_temp_ids" WHERE "entity_name" = $1)"#,
            "Mammal".to_string()
        );
    }

    #[test]
    fn delete_from_collection_table() {
        let (subselect, _) = staging_fragments("Human", DiscriminatorRendering::Inline);
        let human_dog = SchemaObjectName::new("human_dog", Some("zoo"));

        let delete = TableDelete {
            table: &human_dog,
            membership: subselect.membership("human_human_id"),
        };

        assert_binding!(
            delete.to_sql(),
            r#"DELETE FROM "zoo"."human_dog" WHERE ("human_human_id") IN (SELECT "id" FROM "ht_temp_ids" WHERE "entity_name" = 'Human')"#
        );
    }

    #[test]
    fn staging_delete_binds_discriminator() {
        let staging_table = SchemaObjectName::new("ht_temp_ids", Some("bulk"));

        let delete = StagingDelete {
            staging_table: &staging_table,
            discriminator_column: "entity_name",
            discriminator: "O'Neil",
        };

        assert_binding!(
            delete.to_sql(),
            r#"DELETE FROM "bulk"."ht_temp_ids" WHERE "entity_name" = $1"#,
            "O'Neil".to_string()
        );
    }
}
