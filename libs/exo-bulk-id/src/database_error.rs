// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Validation: {0}")]
    Validation(String),

    #[error("Delegate: {}", delegate_message(.0))]
    Delegate(#[from] tokio_postgres::Error),

    #[error("{0} {1}")]
    WithContext(String, #[source] Box<DatabaseError>),

    #[error("{0}")]
    BoxedError(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl DatabaseError {
    pub fn with_context(self, context: String) -> DatabaseError {
        DatabaseError::WithContext(context, Box::new(self))
    }
}

/// The server's message for a database error (`tokio_postgres::Error` displays only "db error")
fn delegate_message(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut message = format!("{} ({})", db_error.message(), db_error.code().code());
    if let Some(detail) = db_error.detail() {
        message.push_str(&format!(". Detail: {detail}"));
    }
    if let Some(hint) = db_error.hint() {
        message.push_str(&format!(". Hint: {hint}"));
    }
    message
}

pub trait WithContext {
    fn with_context(self, context: String) -> Self;
}

impl<T> WithContext for Result<T, DatabaseError> {
    fn with_context(self, context: String) -> Result<T, DatabaseError> {
        self.map_err(|e| e.with_context(context))
    }
}
