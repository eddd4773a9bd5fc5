//! Response definitions
//!
//! What the CLI prints for each command outcome.

use std::fmt;

use crate::error::{CaskError, Result};

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
    Error,
}

/// A response to print
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (value for GET, error message for ERROR)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// Create a NOT_FOUND response
    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            payload: None,
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            payload: Some(message.as_bytes().to_vec()),
        }
    }
}

impl From<Result<Option<Vec<u8>>>> for Response {
    fn from(result: Result<Option<Vec<u8>>>) -> Self {
        match result {
            Ok(payload) => Response::ok(payload),
            Err(CaskError::KeyNotFound) => Response::not_found(),
            Err(e) => Response::error(&e.to_string()),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, &self.payload) {
            (Status::Ok, Some(value)) => f.write_str(&String::from_utf8_lossy(value)),
            (Status::Ok, None) => f.write_str(":OK"),
            (Status::NotFound, _) => f.write_str("[ERROR] Key not found"),
            (Status::Error, Some(message)) => {
                write!(f, ":ERROR {}", String::from_utf8_lossy(message))
            }
            (Status::Error, None) => f.write_str(":ERROR"),
        }
    }
}
