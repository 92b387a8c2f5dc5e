//! Replication lag watchdog for a PostgreSQL connection pooler.
//!
//! One watchdog per watched storage acquires a pooled server through the
//! pooler's own routing path, runs a lag query and publishes the decoded
//! value to every route of that storage.

pub mod client;
pub mod config;
pub mod health;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod pool;
pub mod protocol;
pub mod resilience;
pub mod router;
pub mod storage;

pub use config::schema::PoolerConfig;
pub use health::LagWatchdog;
pub use lifecycle::Shutdown;
