//! Storage health checking.
//!
//! # Data Flow
//! ```text
//! watchdog.rs (one task per watched storage):
//!     fresh InternalClient
//!     → acquire.rs (route → attach → connect, unwinding on failure)
//!     → query + decode, up to check_retry attempts
//!     → router broadcast of the lag
//!     → detach + unroute, cooldown
//! ```
//!
//! # Design Decisions
//! - Watchdogs are independent; one stalled storage never delays another
//! - Counters in stats.rs are per watchdog, metrics are per storage

pub mod acquire;
pub mod stats;
pub mod watchdog;

pub use acquire::{acquire, AcquireError};
pub use stats::{WatchdogStats, WatchdogStatsSnapshot};
pub use watchdog::{Iteration, LagWatchdog, WatchdogInitError};
