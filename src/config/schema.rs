//! Configuration schema definitions.
//!
//! This module defines the complete topology structure for the router.
//! All types derive Serde traits for deserialization from JSON config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Named destination pools. Order of pools and of servers within a pool
    /// is significant: it is an input to deterministic selection.
    pub pools: Vec<PoolConfig>,

    /// Logical routes with their failover chains. The first route is the
    /// default for keys without a routing prefix.
    pub routes: Vec<RouteConfig>,

    /// TKO thresholds.
    pub tko: TkoConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Worker shards and request-shaping behavior.
    pub runtime: RuntimeConfig,

    /// Admin HTTP surface.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:11299").
    pub bind_address: String,

    /// Maximum concurrent client connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:11299".to_string(),
            max_connections: 10_000,
        }
    }
}

/// A named, ordered pool of destination servers.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Unique pool name.
    pub name: String,

    /// Servers as "host:port" strings, in selection order.
    pub servers: Vec<String>,
}

/// A logical route: primary pool plus ordered failover entries.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier, matched against the key's routing prefix.
    pub name: String,

    /// Primary pool name.
    pub pool: String,

    /// Ordered failover candidates consulted after the primary fails.
    #[serde(default)]
    pub failover: Vec<FailoverEntryConfig>,
}

/// One failover candidate: exactly one of `pool` or `server` must be set.
///
/// A pool entry is one candidate resolved by hashing, never an inner scan of
/// the whole pool. A server entry must name a server that appears in some
/// pool, so it resolves to a registered destination.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FailoverEntryConfig {
    pub pool: Option<String>,
    pub server: Option<String>,
}

/// TKO thresholds.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TkoConfig {
    /// Consecutive failures before a destination is knocked out.
    /// No default: must be supplied here or via `--timeouts-until-tko`.
    pub timeouts_until_tko: Option<u32>,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Per-attempt deadline in milliseconds, covering connect and exchange.
    pub attempt_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { attempt_ms: 1000 }
    }
}

/// Worker shards and request-shaping behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Number of worker shards. Affects parallelism only, never routing
    /// determinism.
    pub workers: usize,

    /// Surface an exhausted get as an explicit error instead of a miss.
    pub disable_miss_on_get_errors: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            disable_miss_on_get_errors: false,
        }
    }
}

/// Admin HTTP surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin HTTP endpoint.
    pub enabled: bool,

    /// Admin bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:11300".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing filter (e.g., "kvrouter=debug").
    pub log_filter: String,

    /// Enable the Prometheus metrics exporter.
    pub metrics_enabled: bool,

    /// Metrics exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "kvrouter=info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Command-line overrides applied on top of the config file, both at startup
/// and again on every admin-triggered reload.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOverrides {
    pub timeouts_until_tko: Option<u32>,
    pub disable_miss_on_get_errors: bool,
    pub workers: Option<usize>,
    pub bind_address: Option<String>,
    pub admin_bind_address: Option<String>,
}

impl RouterConfig {
    /// Apply command-line overrides. Flags win over file values.
    pub fn apply_overrides(&mut self, overrides: &RuntimeOverrides) {
        if overrides.timeouts_until_tko.is_some() {
            self.tko.timeouts_until_tko = overrides.timeouts_until_tko;
        }
        if overrides.disable_miss_on_get_errors {
            self.runtime.disable_miss_on_get_errors = true;
        }
        if let Some(workers) = overrides.workers {
            self.runtime.workers = workers;
        }
        if let Some(ref bind) = overrides.bind_address {
            self.listener.bind_address = bind.clone();
        }
        if let Some(ref bind) = overrides.admin_bind_address {
            self.admin.bind_address = bind.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_parses() {
        let json = r#"{
            "pools": [{"name": "east", "servers": ["127.0.0.1:5001"]}],
            "routes": [{"name": "default", "pool": "east"}],
            "tko": {"timeouts_until_tko": 1}
        }"#;
        let config: RouterConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.pools.len(), 1);
        assert_eq!(config.routes[0].failover.len(), 0);
        assert_eq!(config.tko.timeouts_until_tko, Some(1));
        // Sections not present fall back to defaults.
        assert_eq!(config.runtime.workers, 1);
        assert_eq!(config.timeouts.attempt_ms, 1000);
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut config = RouterConfig::default();
        config.tko.timeouts_until_tko = Some(5);

        config.apply_overrides(&RuntimeOverrides {
            timeouts_until_tko: Some(1),
            disable_miss_on_get_errors: true,
            workers: Some(4),
            ..Default::default()
        });

        assert_eq!(config.tko.timeouts_until_tko, Some(1));
        assert!(config.runtime.disable_miss_on_get_errors);
        assert_eq!(config.runtime.workers, 4);
    }
}
