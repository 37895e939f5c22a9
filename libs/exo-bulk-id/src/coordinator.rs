// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use tracing::{debug, error, instrument, warn};

use crate::{
    bulk_id_error::BulkIdError,
    cleanup::CleanupExecutor,
    config::StagingTableConfig,
    discriminator::Discriminator,
    executor::StatementExecutor,
    operation::{BulkOperation, IdSelect, TableStatement},
    sql::{
        delete::TableDelete,
        insert::StagingInsert,
        schema_object::SchemaObjectName,
        statement::{BoundStatement, StatementStep},
        update::TableUpdate,
    },
    subselect::{DiscriminatorValue, ExtraSelectValue, StagedIdSubselect},
};

/// Everything a cascading executor needs to restrict its statements to one operation's staged
/// rows: the membership filter, the value tagging staged keys and an optional cleanup step.
#[derive(Debug, Clone, PartialEq)]
pub struct StagingCapabilities {
    pub id_subselect: StagedIdSubselect,
    pub extra_select_value: ExtraSelectValue,
    /// Present only if staged rows are to be removed after the operation
    pub cleanup: Option<CleanupExecutor>,
}

impl StagingCapabilities {
    pub fn new(config: &StagingTableConfig, discriminator: Discriminator) -> Self {
        let value = DiscriminatorValue {
            discriminator,
            rendering: config.discriminator_rendering,
        };

        Self {
            id_subselect: StagedIdSubselect {
                staging_table: config.staging_table.clone(),
                id_column: config.id_column.clone(),
                discriminator_column: config.discriminator_column.clone(),
                value: value.clone(),
            },
            extra_select_value: ExtraSelectValue {
                column: config.discriminator_column.clone(),
                value,
            },
            cleanup: config.clean_rows.then(|| CleanupExecutor::new(config)),
        }
    }

    pub fn discriminator(&self) -> &Discriminator {
        self.id_subselect.discriminator()
    }

    pub fn staging_statement(&self, id_select: &IdSelect) -> BoundStatement {
        BoundStatement::new(
            StatementStep::Stage,
            &self.id_subselect.staging_table,
            self.discriminator().as_str(),
            &StagingInsert {
                subselect: &self.id_subselect,
                extra_select_value: &self.extra_select_value,
                id_select,
            },
        )
    }

    pub fn table_statement(&self, statement: &TableStatement) -> BoundStatement {
        let discriminator = self.discriminator().as_str();

        match statement {
            TableStatement::Delete { table } => BoundStatement::new(
                StatementStep::Apply,
                &table.name,
                discriminator,
                &TableDelete {
                    table: &table.name,
                    membership: self.id_subselect.membership(&table.key_column),
                },
            ),
            TableStatement::Update { table, assignments } => BoundStatement::new(
                StatementStep::Apply,
                &table.name,
                discriminator,
                &TableUpdate {
                    table: &table.name,
                    assignments,
                    membership: self.id_subselect.membership(&table.key_column),
                },
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Staging,
    /// Executing the statement at `table_index` of the operation's table statements
    Applying {
        table_index: usize,
    },
    Completed,
    Failed,
}

/// The result of a successfully executed bulk operation.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOutcome {
    pub discriminator: Discriminator,
    /// Keys copied into the staging table
    pub staged_rows: u64,
    /// Rows affected per table, in execution order
    pub table_rows: Vec<(SchemaObjectName, u64)>,
    /// Staged rows removed, or `None` if cleanup is disabled
    pub cleaned_rows: Option<u64>,
}

impl BulkOutcome {
    /// The number of entities the operation matched
    pub fn affected_entities(&self) -> u64 {
        self.staged_rows
    }
}

/// Drives one bulk operation through staging, applying (table by table, in the given order)
/// and the optional cleanup.
///
/// All statements go through the supplied executor, so they run in whatever transaction the
/// caller opened. Nothing is retried; the first failure leaves the coordinator `Failed` and is
/// returned as is.
#[derive(Debug)]
pub struct StagingCoordinator<'a> {
    operation: BulkOperation<'a>,
    capabilities: StagingCapabilities,
    state: CoordinatorState,
}

impl<'a> StagingCoordinator<'a> {
    pub fn new(operation: BulkOperation<'a>, capabilities: StagingCapabilities) -> Self {
        Self {
            operation,
            capabilities,
            state: CoordinatorState::Idle,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn discriminator(&self) -> &Discriminator {
        self.capabilities.discriminator()
    }

    pub fn capabilities(&self) -> &StagingCapabilities {
        &self.capabilities
    }

    /// The statements [`StagingCoordinator::execute`] would run, in order
    pub fn statements(&self) -> Vec<BoundStatement> {
        let mut statements = vec![self.capabilities.staging_statement(&self.operation.id_select)];
        statements.extend(
            self.operation
                .table_statements
                .iter()
                .map(|statement| self.capabilities.table_statement(statement)),
        );
        if let Some(cleanup) = &self.capabilities.cleanup {
            statements.push(cleanup.statement(self.discriminator()));
        }
        statements
    }

    #[instrument(
        name = "StagingCoordinator::execute",
        skip_all,
        fields(
            operation = %self.operation.kind,
            entity = %self.operation.entity.name,
            discriminator = %self.capabilities.discriminator()
        )
    )]
    pub async fn execute<E: StatementExecutor + ?Sized>(
        &mut self,
        executor: &mut E,
    ) -> Result<BulkOutcome, BulkIdError> {
        if self.state != CoordinatorState::Idle {
            return Err(BulkIdError::InvalidOperation(format!(
                "Bulk {} of {} has already been executed",
                self.operation.kind, self.operation.entity.name
            )));
        }

        self.operation.validate()?;

        let discriminator = self.discriminator().clone();

        self.transition(CoordinatorState::Staging);
        let staging = self
            .capabilities
            .staging_statement(&self.operation.id_select);
        let staged_rows = self.run(executor, &staging).await?;

        let table_statements: Vec<_> = self
            .operation
            .table_statements
            .iter()
            .map(|statement| self.capabilities.table_statement(statement))
            .collect();

        let mut table_rows = Vec::with_capacity(table_statements.len());
        for (table_index, statement) in table_statements.into_iter().enumerate() {
            self.transition(CoordinatorState::Applying { table_index });
            let rows = self.run(executor, &statement).await?;
            table_rows.push((statement.table, rows));
        }

        self.transition(CoordinatorState::Completed);

        let cleaned_rows = match self.capabilities.cleanup.clone() {
            Some(cleanup) => match cleanup.cleanup(&discriminator, executor).await {
                Ok(rows) => Some(rows),
                Err(e) => {
                    self.transition(CoordinatorState::Failed);
                    return Err(e);
                }
            },
            None => {
                if staged_rows > 0 {
                    warn!(
                        staged_rows,
                        "Cleanup is disabled, leaving staged rows in {}",
                        self.capabilities.id_subselect.staging_table
                    );
                }
                None
            }
        };

        Ok(BulkOutcome {
            discriminator,
            staged_rows,
            table_rows,
            cleaned_rows,
        })
    }

    async fn run<E: StatementExecutor + ?Sized>(
        &mut self,
        executor: &mut E,
        statement: &BoundStatement,
    ) -> Result<u64, BulkIdError> {
        match executor.execute(statement).await {
            Ok(rows) => {
                debug!(step = %statement.step, rows, "Executed statement on {}", statement.table);
                Ok(rows)
            }
            Err(source) => {
                error!(
                    step = %statement.step,
                    "Failed to execute statement on {}: {source}", statement.table
                );
                self.transition(CoordinatorState::Failed);
                Err(BulkIdError::StatementExecution {
                    step: statement.step,
                    table: statement.table.clone(),
                    source,
                })
            }
        }
    }

    fn transition(&mut self, state: CoordinatorState) {
        debug!(from = ?self.state, to = ?state, "Bulk operation state change");
        self.state = state;
    }
}
