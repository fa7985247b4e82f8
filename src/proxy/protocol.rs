//! Client-facing ASCII protocol codec.
//!
//! # Responsibilities
//! - Parse one command line into a typed `Command`
//! - Enforce key constraints before anything reaches the routing engine
//!
//! # Design Decisions
//! - Line-based framing; `set` payload bytes are read separately by the
//!   connection handler using the announced length
//! - Keys follow memcached limits: max 250 bytes, no control characters
//! - Unknown commands are client errors, never routed

use thiserror::Error;

pub const MAX_KEY_LENGTH: usize = 250;

/// One parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get { key: String },
    /// Header only; the payload of `bytes` bytes follows on the wire.
    Set { key: String, bytes: usize },
    Stats,
    Version,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("wrong number of arguments for '{0}'")]
    BadArguments(&'static str),

    #[error("key exceeds {MAX_KEY_LENGTH} bytes")]
    KeyTooLong,

    #[error("key contains control characters")]
    BadKey,

    #[error("bad byte count")]
    BadByteCount,
}

fn validate_key(key: &str) -> Result<(), ParseError> {
    if key.len() > MAX_KEY_LENGTH {
        return Err(ParseError::KeyTooLong);
    }
    if key.bytes().any(|b| b <= b' ' || b == 0x7f) {
        return Err(ParseError::BadKey);
    }
    Ok(())
}

/// Parse one command line (without its line terminator).
pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let mut parts = line.split_ascii_whitespace();
    let Some(verb) = parts.next() else {
        return Err(ParseError::Empty);
    };

    match verb {
        "get" => {
            let key = parts.next().ok_or(ParseError::BadArguments("get"))?;
            if parts.next().is_some() {
                return Err(ParseError::BadArguments("get"));
            }
            validate_key(key)?;
            Ok(Command::Get {
                key: key.to_string(),
            })
        }
        "set" => {
            // "set <key> <flags> <exptime> <bytes>"; flags and exptime are
            // accepted for compatibility and ignored.
            let key = parts.next().ok_or(ParseError::BadArguments("set"))?;
            let _flags = parts.next().ok_or(ParseError::BadArguments("set"))?;
            let _exptime = parts.next().ok_or(ParseError::BadArguments("set"))?;
            let bytes = parts.next().ok_or(ParseError::BadArguments("set"))?;
            if parts.next().is_some() {
                return Err(ParseError::BadArguments("set"));
            }
            validate_key(key)?;
            let bytes: usize = bytes.parse().map_err(|_| ParseError::BadByteCount)?;
            Ok(Command::Set {
                key: key.to_string(),
                bytes,
            })
        }
        // "stats all" is accepted; the argument is ignored.
        "stats" => Ok(Command::Stats),
        "version" => Ok(Command::Version),
        "quit" => Ok(Command::Quit),
        other => Err(ParseError::UnknownCommand(other.to_string())),
    }
}
