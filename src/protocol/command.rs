//! Command definitions
//!
//! Parses one line of user input into a command.

use crate::error::{CaskError, Result};

/// Shown when a line cannot be parsed
pub const USAGE: &str = "query format:\n  get [key]\n  put [key] \"[value]\"\n  del [key]\n  merge";

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Get a value by key
    Get { key: Vec<u8> },

    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },

    /// Compact sealed segments
    Merge,

    /// Leave the REPL
    Quit,
}

impl Command {
    /// Parse a line such as `put name "Ada Lovelace"`
    ///
    /// The key is the second word. For `put`, everything after the key is
    /// the value with double quotes removed, so values may contain spaces.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (op, rest) = match line.split_once(char::is_whitespace) {
            Some((op, rest)) => (op, rest.trim()),
            None => (line, ""),
        };

        match op.to_ascii_lowercase().as_str() {
            "get" => Ok(Command::Get {
                key: Self::single_key(rest)?,
            }),
            "del" | "delete" => Ok(Command::Delete {
                key: Self::single_key(rest)?,
            }),
            "put" => {
                let (key, value) = rest.split_once(char::is_whitespace).ok_or_else(usage)?;
                let value = value.trim().replace('"', "");
                if key.is_empty() || value.is_empty() {
                    return Err(usage());
                }
                Ok(Command::Put {
                    key: key.as_bytes().to_vec(),
                    value: value.into_bytes(),
                })
            }
            "merge" if rest.is_empty() => Ok(Command::Merge),
            "quit" | "exit" if rest.is_empty() => Ok(Command::Quit),
            _ => Err(usage()),
        }
    }

    fn single_key(rest: &str) -> Result<Vec<u8>> {
        if rest.is_empty() || rest.contains(char::is_whitespace) {
            return Err(usage());
        }
        Ok(rest.as_bytes().to_vec())
    }
}

fn usage() -> CaskError {
    CaskError::Protocol(USAGE.to_string())
}
