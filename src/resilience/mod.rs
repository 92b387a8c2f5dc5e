//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Watchdog step to backend:
//!     → timeouts.rs (enforce connect/query timeout)
//!     → on failure the watchdog consumes a retry or restarts acquisition
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retry policy lives in the watchdog loop, not here

pub mod timeouts;
