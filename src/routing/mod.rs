//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request key
//!     → policy.rs (route selection by prefix, effective key)
//!     → hasher.rs (primary ordinal in the route's pool)
//!     → engine.rs (health gate → attempt → deterministic failover walk)
//!     → Reply, or miss/error on exhaustion
//!
//! Compilation (at startup and on reload):
//!     RouterConfig
//!     → registry (pools, deduplicated destinations)
//!     → policies (entries resolved to pool/destination ids)
//!     → RouterState (table + fresh health tracker), swapped atomically
//! ```
//!
//! # Design Decisions
//! - Selection is a pure function of (key, topology): no worker identity,
//!   retry count, or clock feeds it
//! - Health state lives beside the table it indexes; a reload replaces both
//!   together, which is the only way health state resets

pub mod engine;
pub mod hasher;
pub mod policy;

use crate::config::{ConfigError, RouterConfig, ValidationError};
use crate::health::HealthTracker;

pub use engine::{FailoverEngine, RouteError};
pub use policy::{FailoverPolicy, PolicyEntry, RouterTable};

/// One configuration load's worth of routing state.
///
/// The table is immutable; the tracker is the only mutable part and carries
/// its own synchronization. Swapping the whole struct atomically is what
/// gives reload its reset-health semantics.
#[derive(Debug)]
pub struct RouterState {
    pub table: RouterTable,
    pub tracker: HealthTracker,
}

impl RouterState {
    /// Build routing state from a validated configuration.
    pub fn build(config: &RouterConfig) -> Result<Self, ConfigError> {
        let table = RouterTable::from_config(config)?;
        let threshold = config
            .tko
            .timeouts_until_tko
            .ok_or_else(|| ConfigError::Validation(vec![ValidationError::MissingTkoThreshold]))?;
        let tracker = HealthTracker::new(table.registry().destination_count(), threshold);
        Ok(Self { table, tracker })
    }
}
