// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::{
    bulk_id_error::BulkIdError,
    discriminator::DiscriminatorStrategy,
    environment::{EnvError, Environment},
    sql::schema_object::{SchemaObjectName, fold_identifier},
    subselect::DiscriminatorRendering,
};

/// Qualified name (`table` or `schema.table`) of the pre-provisioned staging table
pub const TABLE_PARAM: &str = "EXO_BULK_ID_TABLE";
/// Column tagging each staged row with the operation's discriminator
pub const DISCRIMINATOR_COLUMN_PARAM: &str = "EXO_BULK_ID_DISCRIMINATOR_COLUMN";
/// Column holding the staged keys (default: [`DEFAULT_ID_COLUMN`])
pub const ID_COLUMN_PARAM: &str = "EXO_BULK_ID_ID_COLUMN";
/// Whether staged rows are deleted after an operation succeeds (default: false)
pub const CLEAN_ROWS_PARAM: &str = "EXO_BULK_ID_CLEAN_ROWS";
/// `entity-name` (default) or `operation-scoped`
pub const DISCRIMINATOR_STRATEGY_PARAM: &str = "EXO_BULK_ID_DISCRIMINATOR_STRATEGY";
/// `bound` (default) or `inline`
pub const DISCRIMINATOR_RENDERING_PARAM: &str = "EXO_BULK_ID_DISCRIMINATOR_RENDERING";

pub const DEFAULT_ID_COLUMN: &str = "id";

/// Settings of the staging table strategy, resolved once before the first operation.
#[derive(Debug, Clone, PartialEq)]
pub struct StagingTableConfig {
    pub staging_table: SchemaObjectName,
    pub discriminator_column: String,
    pub id_column: String,
    pub clean_rows: bool,
    pub discriminator_strategy: DiscriminatorStrategy,
    pub discriminator_rendering: DiscriminatorRendering,
}

impl StagingTableConfig {
    pub fn new(staging_table: &str, discriminator_column: &str) -> Result<Self, BulkIdError> {
        let config = Self {
            staging_table: SchemaObjectName::parse(staging_table)
                .map_err(|e| BulkIdError::Config(format!("{TABLE_PARAM}: {e}")))?,
            discriminator_column: column(DISCRIMINATOR_COLUMN_PARAM, discriminator_column)?,
            id_column: DEFAULT_ID_COLUMN.to_string(),
            clean_rows: false,
            discriminator_strategy: DiscriminatorStrategy::default(),
            discriminator_rendering: DiscriminatorRendering::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_env(env: &dyn Environment) -> Result<Self, BulkIdError> {
        let staging_table = required(env, TABLE_PARAM)?;
        let discriminator_column = required(env, DISCRIMINATOR_COLUMN_PARAM)?;

        let config = Self::new(&staging_table, &discriminator_column)?
            .with_id_column(&env.get_or_else(ID_COLUMN_PARAM, DEFAULT_ID_COLUMN))?
            .with_clean_rows(env.enabled(CLEAN_ROWS_PARAM, false).map_err(config_error)?)
            .with_discriminator_strategy(parse_enum(env, DISCRIMINATOR_STRATEGY_PARAM)?)
            .with_discriminator_rendering(parse_enum(env, DISCRIMINATOR_RENDERING_PARAM)?);

        config.validate()?;
        Ok(config)
    }

    /// Use `id_column` (folded like the other configured names) as the staging id column
    pub fn with_id_column(mut self, id_column: &str) -> Result<Self, BulkIdError> {
        self.id_column = column(ID_COLUMN_PARAM, id_column)?;
        Ok(self)
    }

    pub fn with_clean_rows(mut self, clean_rows: bool) -> Self {
        self.clean_rows = clean_rows;
        self
    }

    pub fn with_discriminator_strategy(mut self, strategy: DiscriminatorStrategy) -> Self {
        self.discriminator_strategy = strategy;
        self
    }

    pub fn with_discriminator_rendering(mut self, rendering: DiscriminatorRendering) -> Self {
        self.discriminator_rendering = rendering;
        self
    }

    pub fn validate(&self) -> Result<(), BulkIdError> {
        if self.discriminator_column.trim().is_empty() {
            return Err(BulkIdError::Config(format!(
                "Property {DISCRIMINATOR_COLUMN_PARAM} must not be empty"
            )));
        }
        if self.id_column.trim().is_empty() {
            return Err(BulkIdError::Config(format!(
                "Property {ID_COLUMN_PARAM} must not be empty"
            )));
        }
        if self.id_column == self.discriminator_column {
            return Err(BulkIdError::Config(format!(
                "{ID_COLUMN_PARAM} and {DISCRIMINATOR_COLUMN_PARAM} must name different columns"
            )));
        }
        Ok(())
    }
}

fn column(key: &'static str, name: &str) -> Result<String, BulkIdError> {
    fold_identifier(name).map_err(|e| BulkIdError::Config(format!("{key}: {e}")))
}

fn required(env: &dyn Environment, key: &'static str) -> Result<String, BulkIdError> {
    env.get(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| BulkIdError::Config(format!("Property {key} must be set.")))
}

fn parse_enum<T>(env: &dyn Environment, key: &'static str) -> Result<T, BulkIdError>
where
    T: std::str::FromStr<Err = String> + Default,
{
    match env.get(key) {
        Some(value) => value.parse().map_err(|message| {
            config_error(EnvError::InvalidEnum {
                env_key: key,
                env_value: value,
                message,
            })
        }),
        None => Ok(T::default()),
    }
}

fn config_error(error: EnvError) -> BulkIdError {
    BulkIdError::Config(error.to_string())
}
