// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{fmt::Display, str::FromStr};

use uuid::Uuid;

use crate::mapping::EntityMapping;

/// The tag isolating one operation's staged rows from other rows in the shared staging table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Discriminator(String);

impl Discriminator {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Discriminator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Produces the discriminator for a bulk operation targeting an entity.
pub trait DiscriminatorGenerator: Send + Sync {
    fn generate(&self, entity: &EntityMapping) -> Discriminator;
}

/// Uses the entity's registered name verbatim.
///
/// Repeated calls for the same entity yield the same value, so two concurrent operations against
/// the same entity share their staged rows. Callers that can't serialize such operations should
/// use [`OperationScopedDiscriminator`] instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct EntityNameDiscriminator;

impl DiscriminatorGenerator for EntityNameDiscriminator {
    fn generate(&self, entity: &EntityMapping) -> Discriminator {
        Discriminator::new(&entity.name)
    }
}

/// Uses `<entity-name>#<uuid>`, unique to each operation. The discriminator column must be wide
/// enough for the longest entity name plus 37 characters.
#[derive(Debug, Default, Clone, Copy)]
pub struct OperationScopedDiscriminator;

impl DiscriminatorGenerator for OperationScopedDiscriminator {
    fn generate(&self, entity: &EntityMapping) -> Discriminator {
        Discriminator::new(format!("{}#{}", entity.name, Uuid::new_v4()))
    }
}

/// The configurable choice of [`DiscriminatorGenerator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscriminatorStrategy {
    #[default]
    EntityName,
    OperationScoped,
}

impl DiscriminatorStrategy {
    pub fn generator(&self) -> Box<dyn DiscriminatorGenerator> {
        match self {
            DiscriminatorStrategy::EntityName => Box::new(EntityNameDiscriminator),
            DiscriminatorStrategy::OperationScoped => Box::new(OperationScopedDiscriminator),
        }
    }
}

impl FromStr for DiscriminatorStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entity-name" | "entity_name" => Ok(Self::EntityName),
            "operation-scoped" | "operation_scoped" => Ok(Self::OperationScoped),
            _ => Err(format!(
                "expected 'entity-name' or 'operation-scoped', got '{s}'"
            )),
        }
    }
}
