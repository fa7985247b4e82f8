//! Client-facing proxy subsystem.
//!
//! # Data Flow
//! ```text
//! Client connection
//!     → server.rs (accept, shard assignment, command loop)
//!     → protocol.rs (parse command line)
//!     → routing engine (deterministic failover)
//!     → reply rendered back to the client
//! ```
//!
//! # Design Decisions
//! - Worker shards handle disjoint connection sets; nothing per-request is
//!   shared across shards
//! - `stats` is served locally from the stats registry, never routed
//! - Replies mirror the backend protocol so existing clients keep working

pub mod protocol;
pub mod server;

pub use protocol::{parse_command, Command, ParseError};
pub use server::ProxyServer;
