// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Bulk updates and deletes of entities mapped to a joined-table hierarchy, through a single
//! staging table shared by every entity.
//!
//! A bulk operation such as "delete all mammals that ..." has to touch every table holding a
//! part of a matched entity (`human_dog`, `dog`, `human`, `mammal`, `animal`, ...). Instead of
//! evaluating the filter against each table, a [`StagingCoordinator`] copies the matched keys
//! into the staging table once, tagged with a [`Discriminator`], and then restricts each
//! per-table statement to the keys carrying that tag. Optionally, the staged rows are deleted
//! once the operation is done.
//!
//! The staging table is provisioned externally. All statements run through a
//! [`StatementExecutor`], typically a [`PostgresExecutor`] over the caller's transaction; this
//! crate never begins or commits a transaction.
#[macro_use]
mod sql;

mod bulk_id_error;
mod cleanup;
mod config;
mod coordinator;
mod database_error;
mod discriminator;
mod environment;
mod executor;
mod mapping;
mod operation;
mod strategy;
mod subselect;

#[cfg(test)]
mod test_support;

pub use bulk_id_error::BulkIdError;
pub use cleanup::CleanupExecutor;
pub use config::{
    CLEAN_ROWS_PARAM, DEFAULT_ID_COLUMN, DISCRIMINATOR_COLUMN_PARAM,
    DISCRIMINATOR_RENDERING_PARAM, DISCRIMINATOR_STRATEGY_PARAM, ID_COLUMN_PARAM,
    StagingTableConfig, TABLE_PARAM,
};
pub use coordinator::{BulkOutcome, CoordinatorState, StagingCapabilities, StagingCoordinator};
pub use database_error::{DatabaseError, WithContext};
pub use discriminator::{
    Discriminator, DiscriminatorGenerator, DiscriminatorStrategy, EntityNameDiscriminator,
    OperationScopedDiscriminator,
};
pub use environment::{EnvError, Environment, MapEnvironment, SystemEnvironment};
pub use executor::{PostgresExecutor, StatementExecutor};
pub use mapping::{EntityMapping, EntityMappings, MappedTable, MappingResolver};
pub use operation::{Assignment, BulkOperation, BulkOperationKind, IdSelect, TableStatement};
pub use strategy::StagingTableStrategy;
pub use subselect::{
    DiscriminatorRendering, DiscriminatorValue, ExtraSelectValue, StagedIdSubselect,
    StagedKeyMembership,
};

pub use sql::{
    ExpressionBuilder, SQLBuilder, SQLParam,
    fragment::SqlFragment,
    schema_object::SchemaObjectName,
    sql_param_container::SQLParamContainer,
    statement::{BoundStatement, StatementStep},
};
