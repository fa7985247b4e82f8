//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes and failover entries reference
//!   existing pools and registered servers)
//! - Validate value ranges (threshold >= 1, timeouts > 0, workers > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system; any error is fatal at
//!   load time and never surfaces per-request

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::RouterConfig;
use crate::registry::parse_server_address;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no pools defined")]
    NoPools,

    #[error("no routes defined")]
    NoRoutes,

    #[error("duplicate pool name '{0}'")]
    DuplicatePoolName(String),

    #[error("duplicate route name '{0}'")]
    DuplicateRouteName(String),

    #[error("pool '{0}' has no servers")]
    EmptyPool(String),

    #[error("pool '{pool}' server '{server}' is not a host:port address")]
    BadServerAddress { pool: String, server: String },

    #[error("route '{route}' references unknown pool '{pool}'")]
    UnknownPool { route: String, pool: String },

    #[error("route '{route}' failover entry {index} references unknown pool '{pool}'")]
    UnknownFailoverPool {
        route: String,
        index: usize,
        pool: String,
    },

    #[error("route '{route}' failover entry {index} server '{server}' is not listed in any pool")]
    UnregisteredFailoverServer {
        route: String,
        index: usize,
        server: String,
    },

    #[error("route '{route}' failover entry {index} must set exactly one of 'pool' or 'server'")]
    AmbiguousFailoverEntry { route: String, index: usize },

    #[error("timeouts_until_tko must be supplied (config 'tko' section or --timeouts-until-tko)")]
    MissingTkoThreshold,

    #[error("timeouts_until_tko must be at least 1")]
    ZeroTkoThreshold,

    #[error("timeouts.attempt_ms must be greater than 0")]
    ZeroAttemptTimeout,

    #[error("runtime.workers must be at least 1")]
    ZeroWorkers,

    #[error("listener.bind_address '{0}' is not a valid socket address")]
    BadListenerAddress(String),

    #[error("admin.bind_address '{0}' is not a valid socket address")]
    BadAdminAddress(String),
}

/// Validate the full configuration, collecting every error.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.pools.is_empty() {
        errors.push(ValidationError::NoPools);
    }
    if config.routes.is_empty() {
        errors.push(ValidationError::NoRoutes);
    }

    let mut pool_names: HashSet<&str> = HashSet::new();
    let mut registered_servers: HashSet<(String, u16)> = HashSet::new();
    for pool in &config.pools {
        if !pool_names.insert(&pool.name) {
            errors.push(ValidationError::DuplicatePoolName(pool.name.clone()));
        }
        if pool.servers.is_empty() {
            errors.push(ValidationError::EmptyPool(pool.name.clone()));
        }
        for server in &pool.servers {
            match parse_server_address(server) {
                Some(parsed) => {
                    registered_servers.insert(parsed);
                }
                None => errors.push(ValidationError::BadServerAddress {
                    pool: pool.name.clone(),
                    server: server.clone(),
                }),
            }
        }
    }

    let mut route_names: HashSet<&str> = HashSet::new();
    for route in &config.routes {
        if !route_names.insert(&route.name) {
            errors.push(ValidationError::DuplicateRouteName(route.name.clone()));
        }
        if !pool_names.contains(route.pool.as_str()) {
            errors.push(ValidationError::UnknownPool {
                route: route.name.clone(),
                pool: route.pool.clone(),
            });
        }
        for (index, entry) in route.failover.iter().enumerate() {
            match (&entry.pool, &entry.server) {
                (Some(pool), None) => {
                    if !pool_names.contains(pool.as_str()) {
                        errors.push(ValidationError::UnknownFailoverPool {
                            route: route.name.clone(),
                            index,
                            pool: pool.clone(),
                        });
                    }
                }
                (None, Some(server)) => match parse_server_address(server) {
                    Some(parsed) if registered_servers.contains(&parsed) => {}
                    _ => errors.push(ValidationError::UnregisteredFailoverServer {
                        route: route.name.clone(),
                        index,
                        server: server.clone(),
                    }),
                },
                _ => errors.push(ValidationError::AmbiguousFailoverEntry {
                    route: route.name.clone(),
                    index,
                }),
            }
        }
    }

    match config.tko.timeouts_until_tko {
        None => errors.push(ValidationError::MissingTkoThreshold),
        Some(0) => errors.push(ValidationError::ZeroTkoThreshold),
        Some(_) => {}
    }

    if config.timeouts.attempt_ms == 0 {
        errors.push(ValidationError::ZeroAttemptTimeout);
    }
    if config.runtime.workers == 0 {
        errors.push(ValidationError::ZeroWorkers);
    }
    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::BadListenerAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.admin.enabled && config.admin.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::BadAdminAddress(
            config.admin.bind_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{FailoverEntryConfig, PoolConfig, RouteConfig};

    fn valid_config() -> RouterConfig {
        let mut config = RouterConfig::default();
        config.pools.push(PoolConfig {
            name: "east".to_string(),
            servers: vec!["127.0.0.1:5001".to_string(), "127.0.0.1:5002".to_string()],
        });
        config.routes.push(RouteConfig {
            name: "default".to_string(),
            pool: "east".to_string(),
            failover: vec![FailoverEntryConfig {
                pool: Some("east".to_string()),
                server: None,
            }],
        });
        config.tko.timeouts_until_tko = Some(1);
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_threshold_is_fatal() {
        let mut config = valid_config();
        config.tko.timeouts_until_tko = None;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::MissingTkoThreshold));
    }

    #[test]
    fn test_zero_threshold_is_fatal() {
        let mut config = valid_config();
        config.tko.timeouts_until_tko = Some(0);
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::ZeroTkoThreshold));
    }

    #[test]
    fn test_unknown_pool_reference() {
        let mut config = valid_config();
        config.routes[0].pool = "nowhere".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::UnknownPool {
            route: "default".to_string(),
            pool: "nowhere".to_string(),
        }));
    }

    #[test]
    fn test_failover_entry_must_be_unambiguous() {
        let mut config = valid_config();
        config.routes[0].failover.push(FailoverEntryConfig {
            pool: Some("east".to_string()),
            server: Some("127.0.0.1:5001".to_string()),
        });
        config.routes[0].failover.push(FailoverEntryConfig::default());
        let errors = validate_config(&config).unwrap_err();
        let ambiguous = errors
            .iter()
            .filter(|e| matches!(e, ValidationError::AmbiguousFailoverEntry { .. }))
            .count();
        assert_eq!(ambiguous, 2);
    }

    #[test]
    fn test_failover_server_must_be_registered() {
        let mut config = valid_config();
        config.routes[0].failover.push(FailoverEntryConfig {
            pool: None,
            server: Some("10.9.9.9:9999".to_string()),
        });
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::UnregisteredFailoverServer { .. }
        )));
    }

    #[test]
    fn test_all_errors_reported_at_once() {
        let mut config = RouterConfig::default();
        config.runtime.workers = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 4); // no pools, no routes, no threshold, zero workers
    }
}
