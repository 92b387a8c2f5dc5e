//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (rules reference existing storages)
//! - Ensure every watchdog can route to its own storage
//! - Validate value ranges (timeouts > 0, check_retry >= 1, interval > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PoolerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::{PoolerConfig, RuleConfig};
use crate::router::rule::pattern_specificity;
use crate::storage::{StorageError, StorageRule};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("storage '{name}' is declared more than once")]
    DuplicateStorage { name: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("rule {user}.{database} has an empty user or database pattern")]
    EmptyRulePattern { user: String, database: String },
    #[error("rule {user}.{database} references unknown storage '{storage}'")]
    UnknownStorage {
        user: String,
        database: String,
        storage: String,
    },
    #[error("watchdog of storage '{storage}' has no rule for {user}.{database}")]
    UnroutableWatchdog {
        storage: String,
        user: String,
        database: String,
    },
    #[error("watchdog of storage '{storage}' routes {user}.{database} to storage '{routed_to}'")]
    WatchdogRoutesElsewhere {
        storage: String,
        user: String,
        database: String,
        routed_to: String,
    },
    #[error("timeout '{field}' must be greater than zero")]
    ZeroTimeout { field: &'static str },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &PoolerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut names = HashSet::new();
    for storage in &config.storages {
        if let Err(e) = StorageRule::from_config(storage) {
            errors.push(ValidationError::Storage(e));
        }
        if !storage.name.is_empty() && !names.insert(storage.name.as_str()) {
            errors.push(ValidationError::DuplicateStorage {
                name: storage.name.clone(),
            });
        }
    }

    for rule in &config.rules {
        if rule.user.is_empty() || rule.database.is_empty() {
            errors.push(ValidationError::EmptyRulePattern {
                user: rule.user.clone(),
                database: rule.database.clone(),
            });
        }
        if !names.contains(rule.storage.as_str()) {
            errors.push(ValidationError::UnknownStorage {
                user: rule.user.clone(),
                database: rule.database.clone(),
                storage: rule.storage.clone(),
            });
        }
    }

    for storage in &config.storages {
        let Some(wd) = &storage.watchdog else {
            continue;
        };
        if wd.route_usr.is_empty() || wd.route_db.is_empty() {
            // already reported through StorageRule::from_config
            continue;
        }
        match best_rule(&config.rules, &wd.route_usr, &wd.route_db) {
            None => errors.push(ValidationError::UnroutableWatchdog {
                storage: storage.name.clone(),
                user: wd.route_usr.clone(),
                database: wd.route_db.clone(),
            }),
            Some(rule) if rule.storage != storage.name => {
                errors.push(ValidationError::WatchdogRoutesElsewhere {
                    storage: storage.name.clone(),
                    user: wd.route_usr.clone(),
                    database: wd.route_db.clone(),
                    routed_to: rule.storage.clone(),
                })
            }
            Some(_) => {}
        }
    }

    if config.timeouts.connect_ms == 0 {
        errors.push(ValidationError::ZeroTimeout { field: "connect_ms" });
    }
    if config.timeouts.query_ms == 0 {
        errors.push(ValidationError::ZeroTimeout { field: "query_ms" });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn best_rule<'a>(rules: &'a [RuleConfig], user: &str, database: &str) -> Option<&'a RuleConfig> {
    let mut best: Option<(u8, &RuleConfig)> = None;
    for rule in rules {
        if let Some(score) = pattern_specificity(&rule.user, &rule.database, user, database) {
            if best.map_or(true, |(s, _)| score > s) {
                best = Some((score, rule));
            }
        }
    }
    best.map(|(_, rule)| rule)
}
