//! Backend transport seam.
//!
//! # Responsibilities
//! - Define the operation and reply types the engine routes
//! - Define the `Transport` trait the engine attempts candidates through
//! - Classify transport failures (timeout, connect, protocol)
//!
//! # Design Decisions
//! - The engine treats every `TransportError` as an undifferentiated attempt
//!   failure; the taxonomy exists for logs and for distinguishing
//!   "attempted-and-failed" from "never attempted" at the call site
//! - A backend miss is a *successful* attempt: the destination answered
//! - Connection establishment and pooling live behind this trait, not in
//!   the engine

pub mod ascii;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::registry::Destination;

pub use ascii::AsciiTransport;

/// A client operation keyed by a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Get { key: String },
    Set { key: String, value: Vec<u8> },
}

impl Operation {
    pub fn key(&self) -> &str {
        match self {
            Operation::Get { key } => key,
            Operation::Set { key, .. } => key,
        }
    }

    pub fn is_get(&self) -> bool {
        matches!(self, Operation::Get { .. })
    }

    /// The same operation under a different key (the routing prefix is
    /// stripped before forwarding).
    pub fn rekeyed(&self, key: &str) -> Operation {
        match self {
            Operation::Get { .. } => Operation::Get {
                key: key.to_string(),
            },
            Operation::Set { value, .. } => Operation::Set {
                key: key.to_string(),
                value: value.clone(),
            },
        }
    }
}

/// A successful backend reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Get found a value.
    Hit(Vec<u8>),
    /// Get found nothing; the backend is fine.
    Miss,
    /// Set was accepted.
    Stored,
}

/// Why an attempt failed.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("attempt timed out")]
    Timeout,

    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// One bounded attempt against one destination.
///
/// Implementations own connection establishment, framing, and I/O; the
/// whole attempt must resolve within `timeout`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn attempt(
        &self,
        destination: &Destination,
        op: &Operation,
        timeout: Duration,
    ) -> Result<Reply, TransportError>;
}
