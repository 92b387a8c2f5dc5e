//! PostgreSQL wire protocol subset.
//!
//! # Data Flow
//! ```text
//! Outgoing (messages.rs):
//!     StartupMessage, Query, Terminate
//!     → BytesMut frames written by net::pg
//!
//! Incoming (net::pg reads frames):
//!     [tag][u32 len][body]
//!     → DataRow → datarow.rs → Lag
//!     → ErrorResponse → messages.rs (extract 'M' field)
//! ```
//!
//! # Design Decisions
//! - Only the messages the watchdog exchanges are modelled
//! - Decoding works on borrowed slices and never panics on short input
//! - All integers are big-endian per the protocol

pub mod datarow;
pub mod messages;

pub use datarow::{decode_lag_row, DecodeError, Lag};
