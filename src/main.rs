//! kvrouter binary: load config, build routing state, serve.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use clap::Parser;
use tokio::net::TcpListener;

use kvrouter::admin::{admin_router, AdminState};
use kvrouter::config::{load_config, RuntimeOverrides};
use kvrouter::observability;
use kvrouter::routing::{FailoverEngine, RouterState};
use kvrouter::stats::StatsRegistry;
use kvrouter::transport::AsciiTransport;
use kvrouter::{ProxyServer, Shutdown};

#[derive(Parser)]
#[command(name = "kvrouter")]
#[command(about = "Deterministic-failover key-value routing proxy", long_about = None)]
struct Cli {
    /// Path to the JSON topology file.
    #[arg(short, long)]
    config: PathBuf,

    /// Consecutive failures before a destination is knocked out.
    /// Overrides the config file; required if the file omits it.
    #[arg(long)]
    timeouts_until_tko: Option<u32>,

    /// Surface exhausted gets as errors instead of misses.
    #[arg(long)]
    disable_miss_on_get_errors: bool,

    /// Number of worker shards.
    #[arg(long)]
    num_workers: Option<usize>,

    /// Client listener address (overrides config).
    #[arg(long)]
    bind: Option<String>,

    /// Admin listener address (overrides config).
    #[arg(long)]
    admin_bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let overrides = RuntimeOverrides {
        timeouts_until_tko: cli.timeouts_until_tko,
        disable_miss_on_get_errors: cli.disable_miss_on_get_errors,
        workers: cli.num_workers,
        bind_address: cli.bind.clone(),
        admin_bind_address: cli.admin_bind.clone(),
    };

    // Configuration errors are fatal here, before anything listens.
    let config = load_config(&cli.config, &overrides)?;

    observability::logging::init(&config.observability.log_filter);
    tracing::info!(
        config = %cli.config.display(),
        bind_address = %config.listener.bind_address,
        workers = config.runtime.workers,
        timeouts_until_tko = config.tko.timeouts_until_tko,
        "kvrouter starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let state = Arc::new(ArcSwap::from_pointee(RouterState::build(&config)?));
    let stats = Arc::new(StatsRegistry::new());
    let engine = Arc::new(FailoverEngine::new(
        Arc::new(AsciiTransport::new()),
        stats.clone(),
        Duration::from_millis(config.timeouts.attempt_ms),
        config.runtime.disable_miss_on_get_errors,
    ));

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();

    if config.admin.enabled {
        let admin_state = AdminState {
            state: state.clone(),
            stats: stats.clone(),
            config_path: Some(cli.config.clone()),
            overrides: overrides.clone(),
        };
        let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %config.admin.bind_address, "Admin server starting");
        let mut admin_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let result = axum::serve(admin_listener, admin_router(admin_state))
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await;
            if let Err(error) = result {
                tracing::error!(error = %error, "Admin server failed");
            }
        });
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = ProxyServer::new(
        state,
        stats,
        engine,
        config.runtime.workers,
        config.listener.max_connections,
    );
    server.run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
