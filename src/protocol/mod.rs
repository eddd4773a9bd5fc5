//! Protocol Module
//!
//! Line-oriented text front end used by the interactive CLI.
//!
//! ## Commands
//! ```text
//! get <key>
//! put <key> "<value>"
//! del <key>
//! merge
//! quit | exit
//! ```
//!
//! ## Responses
//! - `:OK` after a successful put, del or merge
//! - the value after a successful get
//! - `[ERROR] Key not found` for a missing key
//! - `:ERROR <message>` for anything else

mod command;
mod response;

pub use command::{Command, USAGE};
pub use response::{Response, Status};
