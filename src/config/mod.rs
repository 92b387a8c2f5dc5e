//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → PoolerConfig (validated, immutable)
//!     → lifecycle::startup builds storages, rules, watchdogs
//!
//! On reload signal:
//!     watcher.rs detects change (or SIGHUP)
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → route rules swapped atomically
//!     → watchdog generation restarted
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::PoolerConfig;
pub use schema::RuleConfig;
pub use schema::StorageConfig;
pub use schema::TimeoutConfig;
pub use schema::WatchdogConfig;

pub use loader::{load_config, parse_config, ConfigError};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
