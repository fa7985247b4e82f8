//! Admin endpoint handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::admin::AdminState;
use crate::config::load_config;
use crate::routing::RouterState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct DestinationStatus {
    pub address: String,
    pub pools: Vec<String>,
    pub classification: &'static str,
    pub consecutive_failures: u32,
    pub routable: bool,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn get_stats(State(state): State<AdminState>) -> Json<serde_json::Value> {
    let mut map = serde_json::Map::new();
    for (name, value) in state.stats.snapshot() {
        map.insert(name.to_string(), serde_json::Value::from(value));
    }
    Json(serde_json::Value::Object(map))
}

pub async fn get_stat(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Response {
    match state.stats.get(&name) {
        Some(value) => Json(serde_json::json!({ "name": name, "value": value })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            format!("unknown counter '{name}'"),
        )
            .into_response(),
    }
}

pub async fn get_destinations(State(state): State<AdminState>) -> Json<Vec<DestinationStatus>> {
    let router_state = state.state.load_full();
    let registry = router_state.table.registry();
    let tracker = &router_state.tracker;

    let statuses = registry
        .destinations()
        .iter()
        .map(|destination| DestinationStatus {
            address: destination.address(),
            pools: registry
                .pool_memberships(destination.id)
                .into_iter()
                .map(str::to_string)
                .collect(),
            classification: tracker.classification(destination.id).as_str(),
            consecutive_failures: tracker.consecutive_failures(destination.id),
            routable: tracker.is_routable(destination.id),
        })
        .collect();

    Json(statuses)
}

/// Re-read the config file and atomically swap the router state.
///
/// The swap replaces the health tracker as well: reload is the one event
/// that resets TKO state.
pub async fn post_reload(State(state): State<AdminState>) -> Response {
    let Some(ref path) = state.config_path else {
        return (
            StatusCode::BAD_REQUEST,
            "router was started without a config file",
        )
            .into_response();
    };

    let rebuilt = load_config(path, &state.overrides).and_then(|config| RouterState::build(&config));
    match rebuilt {
        Ok(new_state) => {
            let destinations = new_state.table.registry().destination_count();
            let routes = new_state.table.policies().len();
            state.state.store(std::sync::Arc::new(new_state));
            tracing::info!(destinations, routes, "Configuration reloaded");
            Json(serde_json::json!({
                "reloaded": true,
                "destinations": destinations,
                "routes": routes,
            }))
            .into_response()
        }
        Err(error) => {
            tracing::error!(error = %error, "Reload rejected");
            (StatusCode::UNPROCESSABLE_ENTITY, error.to_string()).into_response()
        }
    }
}
