//! Configuration model, differ and command linearizer.
//!
//! Text is parsed into a [`ConfigTree`], two trees are compared with
//! [`difference`], and the result is flattened into device commands with
//! [`render`].

mod diff;
mod ignore;
mod render;
mod tree;

pub use diff::{DiffOptions, DiffResult, MatchPolicy, ReplacePolicy, difference};
pub use ignore::IgnorePattern;
pub use render::{NOOP_COMMANDS, is_noop_command, render};
pub use tree::{
    ConfigStatement, ConfigTree, DEFAULT_COMMENT_TOKENS, ParseOptions, StatementId, Syntax,
};
