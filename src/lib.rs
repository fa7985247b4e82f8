//! kvrouter — deterministic-failover key-value routing proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!                    │                    KVROUTER                      │
//!                    │                                                  │
//!   Client request   │  ┌─────────┐    ┌──────────┐    ┌────────────┐  │
//!   ─────────────────┼─▶│  proxy  │───▶│ routing  │───▶│ transport  │──┼──▶ Backend
//!                    │  │ shards  │    │  engine  │    │  (ASCII)   │  │    servers
//!                    │  └─────────┘    └────┬─────┘    └────────────┘  │
//!                    │                      │                          │
//!                    │            ┌─────────┴──────────┐               │
//!                    │            ▼                    ▼               │
//!                    │      ┌──────────┐         ┌──────────┐          │
//!                    │      │  health  │         │  stats   │          │
//!                    │      │ tracker  │         │ registry │          │
//!                    │      └──────────┘         └──────────┘          │
//!                    │                                                 │
//!                    │  ┌───────────────────────────────────────────┐  │
//!                    │  │        Cross-Cutting Concerns             │  │
//!                    │  │  config · registry · admin · lifecycle    │  │
//!                    │  │           observability                   │  │
//!                    │  └───────────────────────────────────────────┘  │
//!                    └──────────────────────────────────────────────────┘
//! ```
//!
//! The core is the failover decision engine: deterministic candidate
//! selection over named destination pools, gated by per-destination TKO
//! tracking, with collision suppression and exact outcome counters.

// Core subsystems
pub mod config;
pub mod registry;
pub mod routing;
pub mod transport;

// Traffic management
pub mod health;
pub mod proxy;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;
pub mod stats;

pub use config::{load_config, parse_config, ConfigError, RouterConfig, RuntimeOverrides};
pub use health::{Classification, HealthTracker};
pub use lifecycle::Shutdown;
pub use proxy::ProxyServer;
pub use routing::{FailoverEngine, RouteError, RouterState, RouterTable};
pub use stats::StatsRegistry;
pub use transport::{AsciiTransport, Operation, Reply, Transport, TransportError};
