//! Terminal rendering for monitored targets.
//!
//! This module provides:
//! - `format`: Size, rate, duration and progress bar formatting
//! - `lines`: The in-progress and done line variants per mode
//! - `screen`: Serialized, row-addressed output

pub mod format;
pub mod lines;
pub mod screen;

pub use format::{draw_progress_bar, format_rate, format_size, format_time};
pub use lines::{Line, Span};
pub use screen::{LineKind, RenderMode, Screen};
