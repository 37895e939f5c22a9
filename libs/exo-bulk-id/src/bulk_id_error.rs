// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use thiserror::Error;

use crate::{
    database_error::DatabaseError,
    sql::{schema_object::SchemaObjectName, statement::StatementStep},
};

#[derive(Error, Debug)]
pub enum BulkIdError {
    /// Missing or invalid configuration, reported before any statement runs
    #[error("Configuration error: {0}")]
    Config(String),

    /// The operation can't be executed as requested, reported before any statement runs
    #[error("Invalid bulk operation: {0}")]
    InvalidOperation(String),

    /// A staging or apply statement failed. Remaining statements were not attempted.
    #[error("Failed to execute {step} statement on table {table}: {source}")]
    StatementExecution {
        step: StatementStep,
        table: SchemaObjectName,
        #[source]
        source: DatabaseError,
    },

    /// Removing the staged rows failed. The operation's updates/deletes have already been
    /// applied in the caller's transaction.
    #[error("Unable to clean up id table {staging_table} for {discriminator}: {source}")]
    Cleanup {
        staging_table: SchemaObjectName,
        discriminator: String,
        #[source]
        source: DatabaseError,
    },
}
