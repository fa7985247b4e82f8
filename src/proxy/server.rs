//! Client-facing TCP server.
//!
//! # Responsibilities
//! - Accept client connections, bounded by the configured connection limit
//! - Distribute connections across worker shards
//! - Drive the command loop: parse, route through the failover engine,
//!   render replies, serve `stats`
//!
//! # Design Decisions
//! - Shards share nothing per-request; only the router state, the health
//!   arena inside it, and the stats registry are shared, all behind Arcs
//! - Shard assignment is round-robin over connections; routing determinism
//!   never depends on which shard serves a request
//! - The router state is re-loaded per command, so an admin reload takes
//!   effect for in-flight connections at their next command

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Semaphore};
use uuid::Uuid;

use crate::lifecycle::Shutdown;
use crate::proxy::protocol::{parse_command, Command, ParseError};
use crate::routing::{FailoverEngine, RouteError, RouterState};
use crate::stats::StatsRegistry;
use crate::transport::{Operation, Reply};

/// Everything a connection handler needs, cheaply cloneable.
#[derive(Clone)]
struct ConnectionContext {
    state: Arc<ArcSwap<RouterState>>,
    stats: Arc<StatsRegistry>,
    engine: Arc<FailoverEngine>,
}

/// The client-facing proxy server.
pub struct ProxyServer {
    context: ConnectionContext,
    workers: usize,
    max_connections: usize,
}

impl ProxyServer {
    pub fn new(
        state: Arc<ArcSwap<RouterState>>,
        stats: Arc<StatsRegistry>,
        engine: Arc<FailoverEngine>,
        workers: usize,
        max_connections: usize,
    ) -> Self {
        Self {
            context: ConnectionContext {
                state,
                stats,
                engine,
            },
            workers,
            max_connections,
        }
    }

    /// Accept connections until shutdown, distributing them across shards.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, workers = self.workers, "Proxy server starting");

        let limit = Arc::new(Semaphore::new(self.max_connections));
        let mut shards = Vec::with_capacity(self.workers);
        for shard in 0..self.workers {
            let (tx, rx) = mpsc::channel::<TcpStream>(64);
            shards.push(tx);
            tokio::spawn(worker_loop(
                shard,
                rx,
                self.context.clone(),
                limit.clone(),
                shutdown.subscribe(),
            ));
        }

        let mut shutdown_rx = shutdown.subscribe();
        let mut next_shard = 0usize;
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let shard = next_shard % shards.len();
                            next_shard = next_shard.wrapping_add(1);
                            if shards[shard].send(stream).await.is_err() {
                                tracing::warn!(peer = %peer, shard, "Worker shard gone, dropping connection");
                            }
                        }
                        Err(error) => {
                            tracing::warn!(error = %error, "Accept failed");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Proxy server received shutdown signal");
                    break;
                }
            }
        }
        Ok(())
    }
}

async fn worker_loop(
    shard: usize,
    mut connections: mpsc::Receiver<TcpStream>,
    context: ConnectionContext,
    limit: Arc<Semaphore>,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) {
    tracing::debug!(shard, "Worker shard started");
    loop {
        tokio::select! {
            received = connections.recv() => {
                let Some(stream) = received else { break };
                let Ok(permit) = limit.clone().try_acquire_owned() else {
                    tracing::warn!(shard, "Connection limit reached, dropping connection");
                    continue;
                };
                let context = context.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    handle_connection(shard, stream, context).await;
                });
            }
            _ = shutdown.recv() => break,
        }
    }
    tracing::debug!(shard, "Worker shard stopped");
}

async fn handle_connection(shard: usize, stream: TcpStream, context: ConnectionContext) {
    let connection_id = Uuid::new_v4();
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    tracing::debug!(shard, connection = %connection_id, peer = %peer, "Client connected");

    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            continue;
        }

        let command = match parse_command(trimmed) {
            Ok(command) => command,
            Err(error) => {
                if write_client_error(&mut write_half, &error).await.is_err() {
                    break;
                }
                // A set header we couldn't parse may still be followed by a
                // payload we can't size; drop the connection for safety.
                if matches!(error, ParseError::BadByteCount) {
                    break;
                }
                continue;
            }
        };

        let done = match command {
            Command::Quit => break,
            Command::Version => write_line(
                &mut write_half,
                &format!("VERSION kvrouter {}", env!("CARGO_PKG_VERSION")),
            )
            .await
            .is_err(),
            Command::Stats => write_stats(&mut write_half, &context.stats).await.is_err(),
            Command::Get { key } => {
                let op = Operation::Get { key };
                respond(&mut write_half, &context, &op).await.is_err()
            }
            Command::Set { key, bytes } => {
                // Payload plus trailing \r\n follows the header line.
                let mut payload = vec![0u8; bytes + 2];
                if reader.read_exact(&mut payload).await.is_err() {
                    break;
                }
                if !payload.ends_with(b"\r\n") {
                    let _ = write_line(&mut write_half, "CLIENT_ERROR bad data chunk").await;
                    break;
                }
                payload.truncate(bytes);
                let op = Operation::Set {
                    key,
                    value: payload,
                };
                respond(&mut write_half, &context, &op).await.is_err()
            }
        };
        if done {
            break;
        }
    }

    tracing::debug!(shard, connection = %connection_id, "Client disconnected");
}

/// Route one operation and render the reply.
async fn respond(
    write_half: &mut OwnedWriteHalf,
    context: &ConnectionContext,
    op: &Operation,
) -> std::io::Result<()> {
    let state = context.state.load_full();
    match context.engine.route(&state, op).await {
        Ok(Reply::Hit(value)) => {
            let header = format!("VALUE {} 0 {}\r\n", op.key(), value.len());
            write_half.write_all(header.as_bytes()).await?;
            write_half.write_all(&value).await?;
            write_half.write_all(b"\r\nEND\r\n").await?;
            write_half.flush().await
        }
        Ok(Reply::Miss) => write_line(write_half, "END").await,
        Ok(Reply::Stored) => write_line(write_half, "STORED").await,
        Err(RouteError::NoRoute(key)) => {
            write_line(write_half, &format!("CLIENT_ERROR no route for key '{key}'")).await
        }
        Err(RouteError::AllFailed) => {
            write_line(write_half, "SERVER_ERROR all backends failed").await
        }
    }
}

async fn write_stats(
    write_half: &mut OwnedWriteHalf,
    stats: &StatsRegistry,
) -> std::io::Result<()> {
    let mut rendered = String::new();
    for (name, value) in stats.snapshot() {
        rendered.push_str(&format!("STAT {name} {value}\r\n"));
    }
    rendered.push_str("END\r\n");
    write_half.write_all(rendered.as_bytes()).await?;
    write_half.flush().await
}

async fn write_client_error(
    write_half: &mut OwnedWriteHalf,
    error: &ParseError,
) -> std::io::Result<()> {
    write_line(write_half, &format!("CLIENT_ERROR {error}")).await
}

async fn write_line(write_half: &mut OwnedWriteHalf, line: &str) -> std::io::Result<()> {
    write_half.write_all(line.as_bytes()).await?;
    write_half.write_all(b"\r\n").await?;
    write_half.flush().await
}
