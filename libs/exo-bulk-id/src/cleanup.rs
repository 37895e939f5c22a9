// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use tracing::{debug, error, instrument};

use crate::{
    bulk_id_error::BulkIdError,
    config::StagingTableConfig,
    discriminator::Discriminator,
    executor::StatementExecutor,
    sql::{
        delete::StagingDelete,
        schema_object::SchemaObjectName,
        statement::{BoundStatement, StatementStep},
    },
};

/// Removes the rows an operation staged, once the operation no longer needs them.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanupExecutor {
    staging_table: SchemaObjectName,
    discriminator_column: String,
}

impl CleanupExecutor {
    pub fn new(config: &StagingTableConfig) -> Self {
        Self {
            staging_table: config.staging_table.clone(),
            discriminator_column: config.discriminator_column.clone(),
        }
    }

    pub fn statement(&self, discriminator: &Discriminator) -> BoundStatement {
        BoundStatement::new(
            StatementStep::Cleanup,
            &self.staging_table,
            discriminator.as_str(),
            &StagingDelete {
                staging_table: &self.staging_table,
                discriminator_column: &self.discriminator_column,
                discriminator: discriminator.as_str(),
            },
        )
    }

    /// Delete every staged row carrying `discriminator`, returning the number of rows removed.
    ///
    /// With a shared discriminator this also removes rows staged by a concurrent operation
    /// against the same entity.
    #[instrument(
        name = "CleanupExecutor::cleanup",
        skip_all,
        fields(staging_table = %self.staging_table, %discriminator)
    )]
    pub async fn cleanup<E: StatementExecutor + ?Sized>(
        &self,
        discriminator: &Discriminator,
        executor: &mut E,
    ) -> Result<u64, BulkIdError> {
        let statement = self.statement(discriminator);

        match executor.execute(&statement).await {
            Ok(rows) => {
                debug!(%discriminator, rows, "Cleaned up id table {}", self.staging_table);
                Ok(rows)
            }
            Err(source) => {
                error!(%discriminator, "Unable to clean up id table {}", self.staging_table);
                Err(BulkIdError::Cleanup {
                    staging_table: self.staging_table.clone(),
                    discriminator: discriminator.to_string(),
                    source,
                })
            }
        }
    }
}
