//! Backend server pooling.
//!
//! # Data Flow
//! ```text
//! attach:  idle server (reuse) or new unconnected Server
//! detach:  connected → idle list, broken → dropped
//! close:   dropped, socket closed
//! ```
//!
//! # Design Decisions
//! - One pool per route, guarded by the route's pool lock
//! - A server is connected lazily by whoever attached it

pub mod pool;
pub mod server;

pub use pool::ServerPool;
pub use server::{Server, ServerId};
