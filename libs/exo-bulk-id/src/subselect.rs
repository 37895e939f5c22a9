// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Fragments that restrict statements to the rows staged by one operation.
//!
//! Every per-table statement refers to the matched rows through [`StagedKeyMembership`]:
//!
//! ```sql
//! ("id") IN (SELECT "id" FROM "ht_temp_ids" WHERE "entity_name" = $1)
//! ```
//!
//! and the staging insert tags each copied key with an [`ExtraSelectValue`] so that the filter
//! above finds it later.

use std::{str::FromStr, sync::Arc};

use crate::{
    discriminator::Discriminator,
    sql::{ExpressionBuilder, SQLBuilder, schema_object::SchemaObjectName},
};

/// How the discriminator value is placed in generated SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscriminatorRendering {
    /// As a statement parameter (`$n`)
    #[default]
    Bound,
    /// As an escaped string literal, for statement collaborators that only accept inline
    /// literals.
    Inline,
}

impl FromStr for DiscriminatorRendering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bound" | "param" | "parameter" => Ok(Self::Bound),
            "inline" | "literal" => Ok(Self::Inline),
            _ => Err(format!("expected 'bound' or 'inline', got '{s}'")),
        }
    }
}

/// A discriminator value along with the way it should be rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscriminatorValue {
    pub discriminator: Discriminator,
    pub rendering: DiscriminatorRendering,
}

impl ExpressionBuilder for DiscriminatorValue {
    fn build(&self, builder: &mut SQLBuilder) {
        match self.rendering {
            DiscriminatorRendering::Bound => {
                builder.push_param(Arc::new(self.discriminator.as_str().to_string()))
            }
            DiscriminatorRendering::Inline => builder.push_literal(self.discriminator.as_str()),
        }
    }
}

/// `SELECT <id-column> FROM <staging-table> WHERE <discriminator-column> = <discriminator>`
#[derive(Debug, Clone, PartialEq)]
pub struct StagedIdSubselect {
    pub staging_table: SchemaObjectName,
    pub id_column: String,
    pub discriminator_column: String,
    pub value: DiscriminatorValue,
}

impl StagedIdSubselect {
    pub fn discriminator(&self) -> &Discriminator {
        &self.value.discriminator
    }

    /// Membership of `key_column` (of the table being modified) in the staged keys
    pub fn membership<'a>(&'a self, key_column: &'a str) -> StagedKeyMembership<'a> {
        StagedKeyMembership {
            key_column,
            subselect: self,
        }
    }

    /// Build just the `<discriminator-column> = <discriminator>` filter
    pub fn build_filter(&self, builder: &mut SQLBuilder) {
        builder.push_identifier(&self.discriminator_column);
        builder.push_str(" = ");
        self.value.build(builder);
    }
}

impl ExpressionBuilder for StagedIdSubselect {
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_str("SELECT ");
        builder.push_identifier(&self.id_column);
        builder.push_str(" FROM ");
        self.staging_table.build(builder);
        builder.push_str(" WHERE ");
        self.build_filter(builder);
    }
}

/// `("<key-column>") IN (<staged id subselect>)`
#[derive(Debug)]
pub struct StagedKeyMembership<'a> {
    key_column: &'a str,
    subselect: &'a StagedIdSubselect,
}

impl ExpressionBuilder for StagedKeyMembership<'_> {
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push('(');
        builder.push_identifier(self.key_column);
        builder.push_str(") IN (");
        self.subselect.build(builder);
        builder.push(')');
    }
}

/// The discriminator emitted as an additional select column by the staging insert.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraSelectValue {
    /// The staging column receiving the value
    pub column: String,
    pub value: DiscriminatorValue,
}

impl ExpressionBuilder for ExtraSelectValue {
    /// A bound value gets an explicit `::text` cast, since Postgres can't infer a parameter's type
    /// from the select list of an `INSERT ... SELECT`.
    fn build(&self, builder: &mut SQLBuilder) {
        self.value.build(builder);
        if self.value.rendering == DiscriminatorRendering::Bound {
            builder.push_str("::text");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subselect(discriminator: &str, rendering: DiscriminatorRendering) -> StagedIdSubselect {
        StagedIdSubselect {
            staging_table: SchemaObjectName::new("ht_temp_ids", None),
            id_column: "id".to_string(),
            discriminator_column: "entity_name".to_string(),
            value: DiscriminatorValue {
                discriminator: Discriminator::new(discriminator),
                rendering,
            },
        }
    }

    #[test]
    fn bound_subselect() {
        assert_binding!(
            subselect("Mammal", DiscriminatorRendering::Bound).to_sql(),
            r#"SELECT "id" FROM "ht_temp_ids" WHERE "entity_name" = $1"#,
            "Mammal".to_string()
        );
    }

    #[test]
    fn inline_subselect() {
        assert_binding!(
            subselect("Mammal", DiscriminatorRendering::Inline).to_sql(),
            r#"SELECT "id" FROM "ht_temp_ids" WHERE "entity_name" = 'Mammal'"#
        );
    }

    #[test]
    fn inline_subselect_escapes_quotes() {
        assert_binding!(
            subselect("model.O'Neil's$Pet", DiscriminatorRendering::Inline).to_sql(),
            r#"SELECT "id" FROM "ht_temp_ids" WHERE "entity_name" = 'model.O''Neil''s$Pet'"#
        );
    }

    #[test]
    fn bound_subselect_keeps_quotes_out_of_sql() {
        let (sql, params) = subselect("Mammal' OR '1'='1", DiscriminatorRendering::Bound).to_sql();
        assert!(!sql.contains("OR"));
        assert_binding!(
            (sql, params),
            r#"SELECT "id" FROM "ht_temp_ids" WHERE "entity_name" = $1"#,
            "Mammal' OR '1'='1".to_string()
        );
    }

    #[test]
    fn membership_uses_table_key_column() {
        let subselect = subselect("Mammal", DiscriminatorRendering::Bound);
        assert_binding!(
            subselect.membership("human_id").to_sql(),
            r#"("human_id") IN (SELECT "id" FROM "ht_temp_ids" WHERE "entity_name" = $1)"#,
            "Mammal".to_string()
        );
    }

    #[test]
    fn extra_select_value() {
        let bound = ExtraSelectValue {
            column: "entity_name".to_string(),
            value: subselect("Human", DiscriminatorRendering::Bound).value,
        };
        assert_binding!(bound.to_sql(), "$1::text", "Human".to_string());

        let inline = ExtraSelectValue {
            column: "entity_name".to_string(),
            value: subselect("Human", DiscriminatorRendering::Inline).value,
        };
        assert_binding!(inline.to_sql(), "'Human'");
    }

    #[test]
    fn rendering_from_str() {
        assert_eq!(
            "bound".parse::<DiscriminatorRendering>(),
            Ok(DiscriminatorRendering::Bound)
        );
        assert_eq!(
            "Inline".parse::<DiscriminatorRendering>(),
            Ok(DiscriminatorRendering::Inline)
        );
        assert!("quoted".parse::<DiscriminatorRendering>().is_err());
    }
}
