//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build router state → Start admin → Start proxy
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C → broadcast → stop accepting → shards drain → exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core state, listeners last
//! - One broadcast channel; every long-running task holds a receiver

pub mod shutdown;

pub use shutdown::Shutdown;
