//! Admin HTTP surface.
//!
//! # Responsibilities
//! - Expose the stats registry (query-by-name and full snapshot)
//! - Expose per-destination health for operators
//! - Accept explicit configuration reloads
//!
//! # Design Decisions
//! - Read-only except for /reload; there is no per-counter reset
//! - Serves JSON for machine consumption (the CLI client included)

pub mod handlers;

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::RuntimeOverrides;
use crate::routing::RouterState;
use crate::stats::StatsRegistry;

use self::handlers::{get_destinations, get_stat, get_stats, get_status, post_reload};

/// Shared state for admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub state: Arc<ArcSwap<RouterState>>,
    pub stats: Arc<StatsRegistry>,
    /// Config file to re-read on /reload; None when built from a literal.
    pub config_path: Option<PathBuf>,
    /// CLI overrides, re-applied on every reload.
    pub overrides: RuntimeOverrides,
}

/// Build the admin router.
pub fn admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/stats", get(get_stats))
        .route("/stats/{name}", get(get_stat))
        .route("/destinations", get(get_destinations))
        .route("/reload", post(post_reload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
