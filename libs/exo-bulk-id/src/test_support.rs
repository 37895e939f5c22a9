// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Fixtures shared by the unit tests: an `Animal` hierarchy and an executor simulating the
//! staging table.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tokio::sync::Barrier;
use tracing::{Event, Level, Metadata, Subscriber, span};

use crate::{
    database_error::DatabaseError,
    discriminator::Discriminator,
    executor::StatementExecutor,
    mapping::{EntityMapping, EntityMappings, MappedTable, MappingResolver},
    sql::{
        schema_object::SchemaObjectName,
        statement::{BoundStatement, StatementStep},
    },
    subselect::{DiscriminatorRendering, DiscriminatorValue, ExtraSelectValue, StagedIdSubselect},
};

/// ```text
/// Animal ─┬─ Mammal ─┬─ Human (human_id) ── human_dog (human_human_id)
///         │          └─ Dog
///         └─ Reptile
/// ```
pub struct AnimalSetup {
    pub mappings: EntityMappings,
}

fn table(name: &str, key_column: &str) -> MappedTable {
    MappedTable::new(SchemaObjectName::new(name, None), key_column)
}

impl AnimalSetup {
    pub fn new() -> Self {
        let animal = table("animal", "id");
        let mammal = table("mammal", "id");
        let reptile = table("reptile", "id");
        let human = table("human", "human_id");
        let dog = table("dog", "id");
        let human_dog = table("human_dog", "human_human_id");

        let mut mappings = EntityMappings::new();

        mappings.add(EntityMapping {
            name: "Animal".into(),
            table: animal.clone(),
            superclass_tables: vec![],
            cascade_order: vec![
                human_dog.clone(),
                dog.clone(),
                human.clone(),
                mammal.clone(),
                reptile.clone(),
                animal.clone(),
            ],
        });
        mappings.add(EntityMapping {
            name: "Mammal".into(),
            table: mammal.clone(),
            superclass_tables: vec![animal.clone()],
            cascade_order: vec![
                human_dog.clone(),
                dog.clone(),
                human.clone(),
                mammal.clone(),
                animal.clone(),
            ],
        });
        mappings.add(EntityMapping {
            name: "Reptile".into(),
            table: reptile.clone(),
            superclass_tables: vec![animal.clone()],
            cascade_order: vec![reptile, animal.clone()],
        });
        mappings.add(EntityMapping {
            name: "Human".into(),
            table: human.clone(),
            superclass_tables: vec![mammal.clone(), animal.clone()],
            cascade_order: vec![human_dog, human, mammal.clone(), animal.clone()],
        });
        mappings.add(EntityMapping {
            name: "Dog".into(),
            table: dog.clone(),
            superclass_tables: vec![mammal.clone(), animal.clone()],
            cascade_order: vec![dog, mammal, animal],
        });

        Self { mappings }
    }

    pub fn entity(&self, name: &str) -> &EntityMapping {
        self.mappings
            .resolve(name)
            .unwrap_or_else(|| panic!("No entity named {name}"))
    }
}

/// Fragments over `ht_temp_ids ("id", "entity_name")`
pub fn staging_fragments(
    discriminator: &str,
    rendering: DiscriminatorRendering,
) -> (StagedIdSubselect, ExtraSelectValue) {
    let value = DiscriminatorValue {
        discriminator: Discriminator::new(discriminator),
        rendering,
    };

    (
        StagedIdSubselect {
            staging_table: SchemaObjectName::new("ht_temp_ids", None),
            id_column: "id".to_string(),
            discriminator_column: "entity_name".to_string(),
            value: value.clone(),
        },
        ExtraSelectValue {
            column: "entity_name".to_string(),
            value,
        },
    )
}

/// Staged `(discriminator, key)` rows
type StagingRows = Arc<Mutex<Vec<(String, i64)>>>;

/// Records every statement and simulates the staging table from the statements' step and
/// discriminator:
///
/// - staging adds a row for each matched key
/// - apply affects the keys staged under its discriminator (recorded in `seen_keys`)
/// - cleanup removes the rows staged under its discriminator
pub struct RecordingExecutor {
    staging: StagingRows,
    matched_keys: Vec<i64>,
    failure: Option<(StatementStep, String)>,
    after_staging: Option<Arc<Barrier>>,
    pub statements: Vec<BoundStatement>,
    /// The keys each apply statement saw, with the table it modified
    pub seen_keys: Vec<(String, Vec<i64>)>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self {
            staging: Arc::default(),
            matched_keys: vec![],
            failure: None,
            after_staging: None,
            statements: vec![],
            seen_keys: vec![],
        }
    }

    /// An executor over the same staging table, as another connection would be
    pub fn sharing(&self) -> Self {
        Self {
            staging: self.staging.clone(),
            ..Self::new()
        }
    }

    /// Keys the id select of the staging insert matches
    pub fn with_matched_keys(mut self, keys: &[i64]) -> Self {
        self.matched_keys = keys.to_vec();
        self
    }

    /// Fail (without side effects) the first statement of `step` against `table`
    pub fn failing_at(mut self, step: StatementStep, table: &str) -> Self {
        self.failure = Some((step, table.to_string()));
        self
    }

    /// Wait on `barrier` once the staging insert has run
    pub fn with_barrier_after_staging(mut self, barrier: Arc<Barrier>) -> Self {
        self.after_staging = Some(barrier);
        self
    }

    /// Rows left behind, for example by an earlier operation without cleanup
    pub fn stage_rows(&self, discriminator: &str, keys: &[i64]) {
        let mut staging = self.staging.lock().unwrap();
        staging.extend(keys.iter().map(|key| (discriminator.to_string(), *key)));
    }

    pub fn staged_rows(&self) -> Vec<(String, i64)> {
        self.staging.lock().unwrap().clone()
    }

    pub fn binding(&self, index: usize) -> (&str, &[Arc<dyn crate::sql::SQLParam>]) {
        self.statements[index].binding()
    }

    fn apply(&mut self, statement: &BoundStatement) -> u64 {
        let mut staging = self.staging.lock().unwrap();

        match statement.step {
            StatementStep::Stage => {
                staging.extend(
                    self.matched_keys
                        .iter()
                        .map(|key| (statement.discriminator.clone(), *key)),
                );
                self.matched_keys.len() as u64
            }
            StatementStep::Apply => {
                let keys: Vec<i64> = staging
                    .iter()
                    .filter(|(discriminator, _)| discriminator == &statement.discriminator)
                    .map(|(_, key)| *key)
                    .collect();
                let rows = keys.len() as u64;
                self.seen_keys.push((statement.table.name.clone(), keys));
                rows
            }
            StatementStep::Cleanup => {
                let before = staging.len();
                staging.retain(|(discriminator, _)| discriminator != &statement.discriminator);
                (before - staging.len()) as u64
            }
        }
    }
}

#[async_trait]
impl StatementExecutor for RecordingExecutor {
    async fn execute(&mut self, statement: &BoundStatement) -> Result<u64, DatabaseError> {
        self.statements.push(statement.clone());

        if let Some((step, table)) = &self.failure
            && *step == statement.step
            && *table == statement.table.name
        {
            return Err(DatabaseError::Validation(format!(
                "simulated failure of {} on {}",
                statement.step, statement.table
            )));
        }

        let rows = self.apply(statement);

        if statement.step == StatementStep::Stage
            && let Some(barrier) = &self.after_staging
        {
            barrier.wait().await;
        }

        Ok(rows)
    }
}

/// Counts `ERROR` events. Install with `tracing::subscriber::set_default` for the current thread.
#[derive(Default)]
pub struct ErrorEvents {
    count: Arc<AtomicUsize>,
    next_span: AtomicU64,
}

impl ErrorEvents {
    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.count.clone()
    }
}

impl Subscriber for ErrorEvents {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn new_span(&self, _span: &span::Attributes<'_>) -> span::Id {
        span::Id::from_u64(self.next_span.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn record(&self, _span: &span::Id, _values: &span::Record<'_>) {}

    fn record_follows_from(&self, _span: &span::Id, _follows: &span::Id) {}

    fn event(&self, event: &Event<'_>) {
        if *event.metadata().level() == Level::ERROR {
            self.count.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn enter(&self, _span: &span::Id) {}

    fn exit(&self, _span: &span::Id) {}
}
