// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_trait::async_trait;
use tokio_postgres::{GenericClient, types::ToSql};
use tracing::debug;

use crate::{database_error::DatabaseError, sql::statement::BoundStatement};

/// Runs statements on the caller's connection, inside the caller's transaction.
#[async_trait]
pub trait StatementExecutor: Send {
    /// Execute the statement, returning the number of affected rows
    async fn execute(&mut self, statement: &BoundStatement) -> Result<u64, DatabaseError>;
}

/// A [`StatementExecutor`] over a Postgres client or transaction.
pub struct PostgresExecutor<'c, C> {
    client: &'c C,
}

impl<'c, C: GenericClient> PostgresExecutor<'c, C> {
    pub fn new(client: &'c C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: GenericClient + Sync> StatementExecutor for PostgresExecutor<'_, C> {
    async fn execute(&mut self, statement: &BoundStatement) -> Result<u64, DatabaseError> {
        let params: Vec<&(dyn ToSql + Sync)> =
            statement.params.iter().map(|p| p.as_pg()).collect();

        debug!(
            step = %statement.step,
            discriminator = %statement.discriminator,
            "Executing SQL operation: {}", statement.sql
        );

        self.client
            .execute(statement.sql.as_str(), &params[..])
            .await
            .map_err(|e| {
                debug!("Failed to execute {} statement: {e:?}", statement.step);
                DatabaseError::Delegate(e).with_context("Database operation failed".into())
            })
    }
}
