//! Shared backend doubles for integration testing.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

/// Start an in-memory key-value backend speaking the ASCII protocol.
///
/// Returns the address it listens on; every connection is served until the
/// test process exits.
pub async fn start_store_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let store: Arc<Mutex<HashMap<String, Vec<u8>>>> = Arc::new(Mutex::new(HashMap::new()));

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let store = store.clone();
            tokio::spawn(async move {
                let (read_half, mut write_half) = stream.into_split();
                let mut lines = BufReader::new(read_half).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let fields: Vec<&str> = line.split_ascii_whitespace().collect();
                    match fields.as_slice() {
                        ["get", key] => {
                            let value = store.lock().unwrap().get(*key).cloned();
                            let response = match value {
                                Some(value) => format!(
                                    "VALUE {} 0 {}\r\n{}\r\nEND\r\n",
                                    key,
                                    value.len(),
                                    String::from_utf8_lossy(&value)
                                ),
                                None => "END\r\n".to_string(),
                            };
                            if write_half.write_all(response.as_bytes()).await.is_err() {
                                break;
                            }
                        }
                        ["set", key, _flags, _exptime, _bytes] => {
                            let Ok(Some(payload)) = lines.next_line().await else {
                                break;
                            };
                            store
                                .lock()
                                .unwrap()
                                .insert(key.to_string(), payload.into_bytes());
                            if write_half.write_all(b"STORED\r\n").await.is_err() {
                                break;
                            }
                        }
                        _ => {
                            if write_half.write_all(b"ERROR\r\n").await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });

    addr
}

/// Start a backend that accepts connections and never replies, the shape of
/// an unresponsive server: every attempt against it times out.
pub async fn start_sleep_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        loop {
            match listener.accept().await {
                // Keep the socket open so the client waits out its timeout.
                Ok((stream, _)) => held.push(stream),
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start `count` sleep backends.
pub async fn start_sleep_backends(count: usize) -> Vec<SocketAddr> {
    let mut addrs = Vec::with_capacity(count);
    for _ in 0..count {
        addrs.push(start_sleep_backend().await);
    }
    addrs
}
