//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build storages and routes → Start watchdogs
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop watchdogs → Close idle servers → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     SIGHUP → Trigger config reload
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then routing, then watchdogs
//! - Reload swaps rules in place and restarts every watchdog

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::{Signal, SignalListener};
pub use startup::{build_runtime, Runtime, StartupError, WatchdogSupervisor};
