//! Failover policies and the compiled route table.
//!
//! # Responsibilities
//! - Compile validated route configuration into immutable policies
//! - Resolve a request key to its route and effective key
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime, shared via Arc
//! - Keys of the form "/name/rest" select route `name` and hash `rest`;
//!   everything else uses the first configured route
//! - Explicit no-match on an unknown routing prefix rather than a silent
//!   fallback, so a typoed prefix is visible to the client

use std::collections::HashMap;

use crate::config::schema::RouterConfig;
use crate::config::ConfigError;
use crate::config::ValidationError;
use crate::registry::{parse_server_address, DestinationId, DestinationRegistry, PoolId};

/// One failover candidate: a pool (resolved by hashing) or a single
/// destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyEntry {
    Pool(PoolId),
    Destination(DestinationId),
}

/// Ordered failover chain for one logical route.
///
/// Immutable after configuration load; shared read-only across all
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct FailoverPolicy {
    pub route_name: String,
    pub primary: PoolId,
    pub entries: Vec<PolicyEntry>,
}

/// Compiled routing state: registry plus per-route policies.
#[derive(Debug)]
pub struct RouterTable {
    registry: DestinationRegistry,
    policies: Vec<FailoverPolicy>,
    by_name: HashMap<String, usize>,
}

impl RouterTable {
    /// Compile a validated configuration.
    ///
    /// References are re-checked while compiling so an unvalidated config
    /// yields a typed error instead of a panic.
    pub fn from_config(config: &RouterConfig) -> Result<Self, ConfigError> {
        let registry = DestinationRegistry::from_config(&config.pools);
        let mut policies = Vec::with_capacity(config.routes.len());
        let mut by_name = HashMap::with_capacity(config.routes.len());
        let mut errors = Vec::new();

        let destination_by_address: HashMap<(String, u16), DestinationId> = registry
            .destinations()
            .iter()
            .map(|d| ((d.host.clone(), d.port), d.id))
            .collect();

        for route in &config.routes {
            let Some(primary) = registry.pool_by_name(&route.pool) else {
                errors.push(ValidationError::UnknownPool {
                    route: route.name.clone(),
                    pool: route.pool.clone(),
                });
                continue;
            };

            let mut entries = Vec::with_capacity(route.failover.len());
            for (index, entry) in route.failover.iter().enumerate() {
                match (&entry.pool, &entry.server) {
                    (Some(pool), None) => match registry.pool_by_name(pool) {
                        Some(id) => entries.push(PolicyEntry::Pool(id)),
                        None => errors.push(ValidationError::UnknownFailoverPool {
                            route: route.name.clone(),
                            index,
                            pool: pool.clone(),
                        }),
                    },
                    (None, Some(server)) => {
                        let id = parse_server_address(server)
                            .and_then(|parsed| destination_by_address.get(&parsed).copied());
                        match id {
                            Some(id) => entries.push(PolicyEntry::Destination(id)),
                            None => errors.push(ValidationError::UnregisteredFailoverServer {
                                route: route.name.clone(),
                                index,
                                server: server.clone(),
                            }),
                        }
                    }
                    _ => errors.push(ValidationError::AmbiguousFailoverEntry {
                        route: route.name.clone(),
                        index,
                    }),
                }
            }

            by_name.insert(route.name.clone(), policies.len());
            policies.push(FailoverPolicy {
                route_name: route.name.clone(),
                primary,
                entries,
            });
        }

        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        Ok(Self {
            registry,
            policies,
            by_name,
        })
    }

    pub fn registry(&self) -> &DestinationRegistry {
        &self.registry
    }

    pub fn policies(&self) -> &[FailoverPolicy] {
        &self.policies
    }

    pub fn policy_by_name(&self, name: &str) -> Option<&FailoverPolicy> {
        self.by_name.get(name).map(|&i| &self.policies[i])
    }

    /// Resolve a request key to its policy and the effective key to hash and
    /// forward.
    ///
    /// `/name/rest` selects route `name` with effective key `rest`; any other
    /// key uses the first configured route unchanged. Returns `None` when the
    /// routing prefix names no route.
    pub fn select<'a>(&'a self, key: &'a str) -> Option<(&'a FailoverPolicy, &'a str)> {
        if let Some(without_slash) = key.strip_prefix('/') {
            if let Some((route_name, rest)) = without_slash.split_once('/') {
                return self
                    .policy_by_name(route_name)
                    .map(|policy| (policy, rest));
            }
        }
        self.policies.first().map(|policy| (policy, key))
    }
}
