//! Health tracking subsystem.
//!
//! # Data Flow
//! ```text
//! Failover engine reports request outcomes:
//!     → tracker.rs record_outcome (failure count, TKO transitions)
//!
//! Failover engine gates candidates:
//!     → tracker.rs is_routable (pure read)
//!
//! Admin surface reads:
//!     → classification + consecutive_failures per destination
//! ```
//!
//! # Design Decisions
//! - Passive only: health is derived from real request outcomes, no probes
//! - State is per-destination, shared across pools that list the endpoint
//! - Reset happens by rebuilding the tracker on configuration reload

pub mod tracker;

pub use tracker::{Classification, HealthTracker};
