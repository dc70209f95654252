//! Channel layer for pattern matching over an interactive CLI.
//!
//! This module handles output accumulation, ANSI stripping, prompt
//! detection and device error markers.

mod buffer;
mod patterns;
mod pty;

pub use buffer::PatternBuffer;
pub use patterns::{PatternSet, PromptMatcher};
pub use pty::{PtyChannel, PtyConfig, ReadResult};
