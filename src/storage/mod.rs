//! Storage backends and their watchdog descriptors.
//!
//! # Data Flow
//! ```text
//! [[storage]] config entries
//!     → rule.rs (StorageRule::from_config, validated value type)
//!     → registry.rs (name → Arc<StorageRule>)
//!     → router::rule (each route rule owns a deep copy)
//!
//! Storage with a [storage.watchdog] section:
//!     → watchdog.rs (query, route identity, retry budget)
//!     → health::watchdog (the running loop)
//! ```
//!
//! # Design Decisions
//! - TLS options are always present, possibly empty
//! - Copies are all-or-nothing: a failed copy leaves nothing behind
//! - A copy carries watchdog settings, never a running watchdog task

pub mod registry;
pub mod rule;
pub mod tls;
pub mod watchdog;

pub use registry::StorageRegistry;
pub use rule::{AllocationError, StorageError, StorageRule, StorageType};
pub use tls::{TlsMode, TlsOpts};
pub use watchdog::Watchdog;
