//! CLI command implementations for zprogress.
//!
//! This module provides implementations for all CLI subcommands:
//! - `check`: System validation
//! - `formats`: Supported tool and format listing

pub mod check;
pub mod formats;

// Re-export command functions
pub use check::command_check;
pub use formats::command_formats;
