//! # Patrol Protocols
//!
//! Text-level handling of network device CLIs:
//!
//! * **[`parser`]**: turns raw command output into rows, using either a [`pattern`] or a
//!   [`table`] schema.
//! * **[`prompt`]**: recognizes interactive prompts and pager interruptions, and cleans
//!   captured output.
//! * **[`dialect`]**: vendor-specific session preparation commands.

pub mod dialect;
pub mod parser;
pub mod pattern;
pub mod prompt;
pub mod table;

pub use parser::{Parser, parse};
