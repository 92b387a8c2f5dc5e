//! Routing rules.
//!
//! # Responsibilities
//! - Match a client's user and database against configured patterns
//! - Pick the most specific rule when several match
//!
//! # Design Decisions
//! - `*` is the only wildcard; patterns are otherwise exact and case-sensitive
//! - An exact database outranks an exact user
//! - Each rule owns a deep copy of its storage

use std::sync::Arc;

use thiserror::Error;

use crate::config::RuleConfig;
use crate::storage::{AllocationError, StorageRegistry, StorageRule};

pub const WILDCARD: &str = "*";

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule {user}.{database} references unknown storage '{storage}'")]
    UnknownStorage {
        user: String,
        database: String,
        storage: String,
    },
    #[error("copying storage for rule {user}.{database}: {source}")]
    Allocation {
        user: String,
        database: String,
        #[source]
        source: AllocationError,
    },
}

#[derive(Debug)]
pub struct RouteRule {
    pub user: String,
    pub database: String,
    pub storage: Arc<StorageRule>,
    pub pool_size: usize,
}

impl RouteRule {
    pub fn new(
        user: impl Into<String>,
        database: impl Into<String>,
        storage: Arc<StorageRule>,
        pool_size: usize,
    ) -> Self {
        Self {
            user: user.into(),
            database: database.into(),
            storage,
            pool_size,
        }
    }

    /// Build a rule, deep-copying the referenced storage out of the registry.
    pub fn from_config(config: &RuleConfig, registry: &StorageRegistry) -> Result<Self, RuleError> {
        let storage = registry
            .get(&config.storage)
            .ok_or_else(|| RuleError::UnknownStorage {
                user: config.user.clone(),
                database: config.database.clone(),
                storage: config.storage.clone(),
            })?;
        let storage = storage.try_copy().map_err(|source| RuleError::Allocation {
            user: config.user.clone(),
            database: config.database.clone(),
            source,
        })?;
        Ok(Self::new(
            config.user.clone(),
            config.database.clone(),
            Arc::new(storage),
            config.pool_size,
        ))
    }

    pub fn specificity(&self, user: &str, database: &str) -> Option<u8> {
        pattern_specificity(&self.user, &self.database, user, database)
    }
}

/// Score of a pattern pair against a user/database, `None` when it does not
/// match. Higher is more specific.
pub fn pattern_specificity(
    user_pattern: &str,
    database_pattern: &str,
    user: &str,
    database: &str,
) -> Option<u8> {
    let user_score = match user_pattern {
        WILDCARD => 0,
        p if p == user => 1,
        _ => return None,
    };
    let database_score = match database_pattern {
        WILDCARD => 0,
        p if p == database => 2,
        _ => return None,
    };
    Some(user_score + database_score)
}

/// Most specific rule for a user/database. Ties go to the rule declared
/// first.
pub fn find_rule<'a>(rules: &'a [RouteRule], user: &str, database: &str) -> Option<&'a RouteRule> {
    let mut best: Option<(u8, &RouteRule)> = None;
    for rule in rules {
        if let Some(score) = rule.specificity(user, database) {
            if best.map_or(true, |(s, _)| score > s) {
                best = Some((score, rule));
            }
        }
    }
    best.map(|(_, rule)| rule)
}
