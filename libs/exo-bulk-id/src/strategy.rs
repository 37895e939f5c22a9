// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use tracing::{debug, info};

use crate::{
    bulk_id_error::BulkIdError,
    config::StagingTableConfig,
    coordinator::{BulkOutcome, StagingCapabilities, StagingCoordinator},
    discriminator::DiscriminatorGenerator,
    environment::Environment,
    executor::StatementExecutor,
    mapping::{EntityMapping, MappingResolver},
    operation::{BulkOperation, IdSelect},
    sql::fragment::SqlFragment,
};

/// Bulk updates and deletes through a single, pre-provisioned staging table shared by all
/// entities.
///
/// Prepared once (typically at startup) and then used to build a [`StagingCoordinator`] per
/// operation.
pub struct StagingTableStrategy {
    config: StagingTableConfig,
    generator: Box<dyn DiscriminatorGenerator>,
}

impl StagingTableStrategy {
    /// Read and validate the settings. Fails before any statement can run if the staging table
    /// or discriminator column isn't configured.
    pub fn prepare(env: &dyn Environment) -> Result<Self, BulkIdError> {
        Self::new(StagingTableConfig::from_env(env)?)
    }

    pub fn new(config: StagingTableConfig) -> Result<Self, BulkIdError> {
        config.validate()?;

        info!(
            staging_table = %config.staging_table,
            discriminator_column = %config.discriminator_column,
            clean_rows = config.clean_rows,
            "Using staging table for bulk id operations"
        );

        Ok(Self {
            generator: config.discriminator_strategy.generator(),
            config,
        })
    }

    /// Replace the generator chosen by the configured discriminator strategy
    pub fn with_generator(mut self, generator: Box<dyn DiscriminatorGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// The staging table is provisioned externally, so there is nothing to drop.
    pub fn release(&self) {
        debug!(staging_table = %self.config.staging_table, "Releasing bulk id strategy");
    }

    pub fn config(&self) -> &StagingTableConfig {
        &self.config
    }

    /// Capabilities for one operation against `entity`, with a freshly generated discriminator
    pub fn capabilities(&self, entity: &EntityMapping) -> StagingCapabilities {
        StagingCapabilities::new(&self.config, self.generator.generate(entity))
    }

    pub fn coordinator<'a>(&self, operation: BulkOperation<'a>) -> StagingCoordinator<'a> {
        let capabilities = self.capabilities(operation.entity);
        StagingCoordinator::new(operation, capabilities)
    }

    /// A coordinator deleting the instances of `entity_name` matching `predicate` (or all of
    /// them), along with their rows in every table of the entity's cascade order.
    pub fn delete_handler<'a>(
        &self,
        resolver: &'a dyn MappingResolver,
        entity_name: &str,
        predicate: Option<SqlFragment>,
    ) -> Result<StagingCoordinator<'a>, BulkIdError> {
        let entity = resolve(resolver, entity_name)?;
        let operation = BulkOperation::delete(entity, id_select(entity, predicate));
        operation.validate()?;

        Ok(self.coordinator(operation))
    }

    /// A coordinator applying `assignments` (as `(table, column, value)`) to the instances of
    /// `entity_name` matching `predicate`.
    pub fn update_handler<'a>(
        &self,
        resolver: &'a dyn MappingResolver,
        entity_name: &str,
        predicate: Option<SqlFragment>,
        assignments: Vec<(String, String, SqlFragment)>,
    ) -> Result<StagingCoordinator<'a>, BulkIdError> {
        let entity = resolve(resolver, entity_name)?;
        let operation = assignments.into_iter().try_fold(
            BulkOperation::update(entity, id_select(entity, predicate)),
            |operation, (table, column, value)| operation.set(&table, column, value),
        )?;
        operation.validate()?;

        Ok(self.coordinator(operation))
    }

    /// Build a coordinator for `operation` and execute it
    pub async fn execute<E: StatementExecutor + ?Sized>(
        &self,
        operation: BulkOperation<'_>,
        executor: &mut E,
    ) -> Result<BulkOutcome, BulkIdError> {
        self.coordinator(operation).execute(executor).await
    }
}

fn resolve<'a>(
    resolver: &'a dyn MappingResolver,
    entity_name: &str,
) -> Result<&'a EntityMapping, BulkIdError> {
    resolver
        .resolve(entity_name)
        .ok_or_else(|| BulkIdError::InvalidOperation(format!("Unknown entity {entity_name}")))
}

fn id_select(entity: &EntityMapping, predicate: Option<SqlFragment>) -> IdSelect {
    let id_select = IdSelect::for_entity(entity);
    match predicate {
        Some(predicate) => id_select.with_predicate(predicate),
        None => id_select,
    }
}
