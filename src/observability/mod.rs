//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → stats registry (atomic counters, mirrored to the metrics facade)
//!
//! Consumers:
//!     → stdout logs
//!     → `stats` protocol command and admin /stats (exact-name contract)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Counter updates are cheap atomic increments on the request path
//! - The exact counter names are owned by the stats registry, not here

pub mod logging;
pub mod metrics;
