//! ASCII protocol transport over TCP.
//!
//! Speaks the memcached-style text protocol to backends: one connection per
//! attempt, the whole exchange bounded by the caller's timeout. Pooling and
//! pipelining are deliberately not modeled here.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::registry::Destination;
use crate::transport::{Operation, Reply, Transport, TransportError};

/// TCP transport for the backend ASCII protocol.
#[derive(Debug, Default)]
pub struct AsciiTransport;

impl AsciiTransport {
    pub fn new() -> Self {
        Self
    }

    async fn exchange(
        &self,
        destination: &Destination,
        op: &Operation,
    ) -> Result<Reply, TransportError> {
        let stream = TcpStream::connect((destination.host.as_str(), destination.port))
            .await
            .map_err(TransportError::Connect)?;
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        match op {
            Operation::Get { key } => {
                let request = format!("get {key}\r\n");
                write_half
                    .write_all(request.as_bytes())
                    .await
                    .map_err(TransportError::Connect)?;

                let header = read_line(&mut reader).await?;
                if header == "END" {
                    return Ok(Reply::Miss);
                }
                // "VALUE <key> <flags> <bytes>"
                let mut parts = header.split_ascii_whitespace();
                if parts.next() != Some("VALUE") {
                    return Err(TransportError::Protocol(format!(
                        "unexpected get response '{header}'"
                    )));
                }
                let length: usize = parts
                    .nth(2)
                    .and_then(|len| len.parse().ok())
                    .ok_or_else(|| {
                        TransportError::Protocol(format!("bad VALUE header '{header}'"))
                    })?;

                let mut value = vec![0u8; length + 2]; // data + trailing \r\n
                reader
                    .read_exact(&mut value)
                    .await
                    .map_err(TransportError::Connect)?;
                value.truncate(length);

                let trailer = read_line(&mut reader).await?;
                if trailer != "END" {
                    return Err(TransportError::Protocol(format!(
                        "missing END, got '{trailer}'"
                    )));
                }
                Ok(Reply::Hit(value))
            }
            Operation::Set { key, value } => {
                let header = format!("set {} 0 0 {}\r\n", key, value.len());
                write_half
                    .write_all(header.as_bytes())
                    .await
                    .map_err(TransportError::Connect)?;
                write_half
                    .write_all(value)
                    .await
                    .map_err(TransportError::Connect)?;
                write_half
                    .write_all(b"\r\n")
                    .await
                    .map_err(TransportError::Connect)?;

                let response = read_line(&mut reader).await?;
                match response.as_str() {
                    "STORED" => Ok(Reply::Stored),
                    other => Err(TransportError::Protocol(format!(
                        "set not stored: '{other}'"
                    ))),
                }
            }
        }
    }
}

async fn read_line<R>(reader: &mut BufReader<R>) -> Result<String, TransportError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .await
        .map_err(TransportError::Connect)?;
    if read == 0 {
        return Err(TransportError::Protocol(
            "connection closed mid-response".to_string(),
        ));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[async_trait]
impl Transport for AsciiTransport {
    async fn attempt(
        &self,
        destination: &Destination,
        op: &Operation,
        timeout: Duration,
    ) -> Result<Reply, TransportError> {
        match tokio::time::timeout(timeout, self.exchange(destination, op)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        }
    }
}
