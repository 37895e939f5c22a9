// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use super::{ExpressionBuilder, SQLParam, schema_object::SchemaObjectName};

#[derive(Default)]
pub struct SQLBuilder {
    /// The SQL being built with placeholders for each parameter
    sql: String,
    /// The list of parameters
    params: Vec<Arc<dyn SQLParam>>,
}

impl SQLBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a string
    pub fn push_str<T: AsRef<str>>(&mut self, s: T) {
        self.sql.push_str(s.as_ref());
    }

    /// Push a character
    pub fn push(&mut self, c: char) {
        self.sql.push(c);
    }

    /// Push a space. This is a common operation, so it is provided as a separate method.
    pub fn push_space(&mut self) {
        self.sql.push(' ');
    }

    /// Push a string surrounded by double quotes. Useful for identifier such as table names, column
    /// names, etc. Without the quotes, the identifier with uppercase letters will be interpreted
    /// the same as the identifier with lowercase letters. Embedded double quotes are doubled, so an
    /// identifier can never terminate the quoting early.
    pub fn push_identifier<T: AsRef<str>>(&mut self, s: T) {
        self.sql.push('"');
        self.sql.push_str(&s.as_ref().replace('"', "\"\""));
        self.sql.push('"');
    }

    /// Push `<table>.<column>`, where the table may itself be schema-qualified.
    pub fn push_column<T: AsRef<str>>(&mut self, table: &SchemaObjectName, column: T) {
        table.build(self);
        self.push('.');
        self.push_identifier(column);
    }

    /// Push a string literal surrounded by single quotes, doubling any embedded single quote.
    ///
    /// Prefer [`SQLBuilder::push_param`]; this exists for collaborators that cannot accept
    /// placeholders.
    pub fn push_literal<T: AsRef<str>>(&mut self, s: T) {
        self.sql.push('\'');
        self.sql.push_str(&s.as_ref().replace('\'', "''"));
        self.sql.push('\'');
    }

    /// Push a parameter, which will be replaced with a placeholder in the SQL string
    /// and the parameter will be added to the list of parameters.
    pub fn push_param(&mut self, param: Arc<dyn SQLParam>) {
        self.params.push(param);
        self.push('$');
        self.push_str(self.params.len().to_string());
    }

    /// Push elements of an iterator, separated by `sep`. The `push_elem` function provides
    /// the flexibility to map the elements (compared to [`SQLBuilder::push_elems`], which assumes that
    /// the elements implement [`ExpressionBuilder`] and [`build`](ExpressionBuilder::build) is all you need to call).
    pub fn push_iter<T>(
        &mut self,
        iter: impl ExactSizeIterator<Item = T>,
        sep: &str,
        push_elem: impl Fn(&mut Self, T),
    ) {
        let len = iter.len();
        for (i, item) in iter.enumerate() {
            push_elem(self, item);

            if i < len - 1 {
                self.sql.push_str(sep);
            }
        }
    }

    /// Push elements of a slice, separated by `sep`. The elements must themselves implement
    /// `ExpressionBuilder`.
    pub fn push_elems<T: ExpressionBuilder>(&mut self, elems: &[T], sep: &str) {
        self.push_iter(elems.iter(), sep, |builder, elem| {
            elem.build(builder);
        });
    }

    /// Get the SQL string and the list of parameters. Calling this method should be the final step
    /// in building an SQL expression, and thus this builder consumes the `self`.
    pub fn into_sql(self) -> (String, Vec<Arc<dyn SQLParam>>) {
        (self.sql, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_quoted_and_escaped() {
        let mut builder = SQLBuilder::new();
        builder.push_identifier("entity_name");
        builder.push_space();
        builder.push_identifier(r#"odd"name"#);

        assert_binding!(builder.into_sql(), r#""entity_name" "odd""name""#);
    }

    #[test]
    fn literals_double_single_quotes() {
        let mut builder = SQLBuilder::new();
        builder.push_literal("O'Brien'); DROP TABLE animal; --");

        assert_binding!(
            builder.into_sql(),
            "'O''Brien''); DROP TABLE animal; --'"
        );
    }

    #[test]
    fn params_are_numbered_in_push_order() {
        let mut builder = SQLBuilder::new();
        builder.push_param(Arc::new("first".to_string()));
        builder.push_str(", ");
        builder.push_param(Arc::new(42i32));

        assert_binding!(builder.into_sql(), "$1, $2", "first".to_string(), 42i32);
    }
}
