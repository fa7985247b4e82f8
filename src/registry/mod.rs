//! Destination registry subsystem.
//!
//! # Data Flow
//! ```text
//! PoolConfig[] (validated)
//!     → dedup servers by (host, port) across pools
//!     → assign dense DestinationIds in first-appearance order
//!     → freeze as immutable DestinationRegistry
//! ```
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - One DestinationId per physical endpoint, however many pools list it
//! - Pool order and in-pool server order are preserved exactly as configured

pub mod destination;
pub mod pool;

use std::collections::HashMap;

use crate::config::schema::PoolConfig;

pub use destination::{parse_server_address, Destination, DestinationId};
pub use pool::{Pool, PoolId};

/// Immutable, per-configuration-load registry of destinations and pools.
#[derive(Debug)]
pub struct DestinationRegistry {
    destinations: Vec<Destination>,
    pools: Vec<Pool>,
    pools_by_name: HashMap<String, PoolId>,
}

impl DestinationRegistry {
    /// Build the registry from validated pool configuration.
    ///
    /// Server strings that fail to parse are skipped with a warning; semantic
    /// validation has already rejected them, so this only fires when the
    /// registry is built from an unvalidated config in tests.
    pub fn from_config(pools: &[PoolConfig]) -> Self {
        let mut destinations: Vec<Destination> = Vec::new();
        let mut by_address: HashMap<(String, u16), DestinationId> = HashMap::new();
        let mut built_pools = Vec::with_capacity(pools.len());
        let mut pools_by_name = HashMap::with_capacity(pools.len());

        for (pool_index, pool_config) in pools.iter().enumerate() {
            let mut members = Vec::with_capacity(pool_config.servers.len());
            for server in &pool_config.servers {
                let Some((host, port)) = parse_server_address(server) else {
                    tracing::warn!(server = %server, pool = %pool_config.name, "Skipping unparseable server address");
                    continue;
                };
                let id = *by_address
                    .entry((host.clone(), port))
                    .or_insert_with(|| {
                        let id = DestinationId(destinations.len() as u32);
                        destinations.push(Destination { id, host, port });
                        id
                    });
                members.push(id);
            }
            let pool_id = PoolId(pool_index as u32);
            pools_by_name.insert(pool_config.name.clone(), pool_id);
            built_pools.push(Pool {
                name: pool_config.name.clone(),
                destinations: members,
            });
        }

        Self {
            destinations,
            pools: built_pools,
            pools_by_name,
        }
    }

    pub fn destination(&self, id: DestinationId) -> &Destination {
        &self.destinations[id.index()]
    }

    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    pub fn destination_count(&self) -> usize {
        self.destinations.len()
    }

    pub fn pool(&self, id: PoolId) -> &Pool {
        &self.pools[id.index()]
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    pub fn pool_by_name(&self, name: &str) -> Option<PoolId> {
        self.pools_by_name.get(name).copied()
    }

    /// Names of the pools a destination belongs to, in pool order.
    pub fn pool_memberships(&self, id: DestinationId) -> Vec<&str> {
        self.pools
            .iter()
            .filter(|p| p.destinations.contains(&id))
            .map(|p| p.name.as_str())
            .collect()
    }
}
