// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{fmt::Display, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::database_error::DatabaseError;

use super::{ExpressionBuilder, SQLBuilder};

/// A (possibly schema-qualified) name of a database object such as a table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaObjectName {
    pub name: String,
    /// The schema, if any. `None` leaves resolution to the connection's `search_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

impl SchemaObjectName {
    pub fn new(name: impl Into<String>, schema: Option<&str>) -> Self {
        Self {
            name: name.into(),
            schema: schema.map(|s| s.to_string()),
        }
    }

    /// Parse `table` or `schema.table`, folding each part with [`fold_identifier`].
    pub fn parse(qualified_name: &str) -> Result<Self, DatabaseError> {
        let invalid = || {
            DatabaseError::Validation(format!(
                "Invalid table name '{qualified_name}'. Expected 'table' or 'schema.table'"
            ))
        };

        let parts = split_qualified(qualified_name)
            .into_iter()
            .map(fold_identifier)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;

        match &parts[..] {
            [name] => Ok(Self::new(name, None)),
            [schema, name] => Ok(Self::new(name, Some(schema.as_str()))),
            _ => Err(invalid()),
        }
    }
}

static PLAIN_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").unwrap());

/// Resolve a configured identifier as Postgres resolves it in SQL text: an unquoted name folds
/// to lower case, a double-quoted name is kept verbatim (with `""` standing for `"`).
///
/// Since the result is always rendered quoted, `HT_TEMP_IDS` refers to the table created with
/// `CREATE TABLE HT_TEMP_IDS (...)`.
pub fn fold_identifier(identifier: &str) -> Result<String, DatabaseError> {
    let identifier = identifier.trim();

    let quoted = identifier.strip_prefix('"').and_then(|rest| rest.strip_suffix('"'));

    match quoted {
        Some(quoted) if !quoted.is_empty() && !quoted.replace(r#""""#, "").contains('"') => {
            Ok(quoted.replace(r#""""#, r#"""#))
        }
        None if PLAIN_IDENTIFIER.is_match(identifier) => Ok(identifier.to_lowercase()),
        _ => Err(DatabaseError::Validation(format!(
            "Invalid identifier '{identifier}'. Expected a plain or double-quoted name"
        ))),
    }
}

/// Split on the dots outside double quotes
fn split_qualified(qualified_name: &str) -> Vec<&str> {
    let mut parts = vec![];
    let mut start = 0;
    let mut quoted = false;

    for (index, c) in qualified_name.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '.' if !quoted => {
                parts.push(&qualified_name[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&qualified_name[start..]);

    parts
}

impl Display for SchemaObjectName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl ExpressionBuilder for SchemaObjectName {
    /// Build `"schema"."name"` or just `"name"`
    fn build(&self, builder: &mut SQLBuilder) {
        if let Some(schema) = &self.schema {
            builder.push_identifier(schema);
            builder.push('.');
        }
        builder.push_identifier(&self.name);
    }
}
