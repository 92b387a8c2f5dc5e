//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Acquisition: Backend::connect(server)
//!     → pg.rs (TCP connect, StartupMessage, wait for ReadyForQuery)
//!     → connection stored on the Server
//!
//! Watchdog lag query: Backend::send_query(server, query)
//!     → pg.rs (Query, collect first DataRow, wait for ReadyForQuery)
//!     → raw DataRow bytes handed to the row decoder
//! ```
//!
//! # Design Decisions
//! - Plain TCP only; storages that demand TLS are refused at connect
//! - Every network step runs under a timeout

pub mod backend;
pub mod pg;

pub use backend::{Backend, BackendError, PgBackend};
pub use pg::PgConnection;
