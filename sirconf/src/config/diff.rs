//! Structural difference between a candidate and a running configuration.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::tree::{ConfigStatement, ConfigTree, StatementId};
use crate::error::{Error, PlatformError};

/// How candidate statements are compared against the running tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// A statement is present if the same path exists anywhere.
    #[default]
    Line,
    /// A statement must also sit at the same position.
    Strict,
    /// Any difference at all yields the whole candidate.
    Exact,
    /// No comparison; everything in the candidate is an update.
    None,
}

impl MatchPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Strict => "strict",
            Self::Exact => "exact",
            Self::None => "none",
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "line" => Ok(Self::Line),
            "strict" => Ok(Self::Strict),
            "exact" => Ok(Self::Exact),
            "none" => Ok(Self::None),
            other => Err(PlatformError::InvalidValue {
                message: format!("invalid match policy '{}'", other),
            }
            .into()),
        }
    }
}

/// What gets emitted around a changed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplacePolicy {
    /// Only the changed statement and its ancestors.
    #[default]
    Line,
    /// The whole enclosing block.
    Block,
}

impl ReplacePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Block => "block",
        }
    }
}

impl fmt::Display for ReplacePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplacePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "line" => Ok(Self::Line),
            "block" => Ok(Self::Block),
            other => Err(PlatformError::InvalidValue {
                message: format!("invalid replace policy '{}'", other),
            }
            .into()),
        }
    }
}

/// Knobs for [`difference`].
#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    pub match_policy: MatchPolicy,
    pub replace: ReplacePolicy,
    /// Restrict both trees to the block at this path.
    pub path: Vec<String>,
}

/// Ordered set of candidate statements that need to be applied.
#[derive(Debug, Clone)]
pub struct DiffResult<'a> {
    tree: &'a ConfigTree,
    items: Vec<StatementId>,
}

impl<'a> DiffResult<'a> {
    pub fn tree(&self) -> &'a ConfigTree {
        self.tree
    }

    pub fn ids(&self) -> &[StatementId] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn statements(&self) -> impl Iterator<Item = &'a ConfigStatement> + '_ {
        self.items.iter().map(|&id| self.tree.statement(id))
    }

    /// Statement texts in candidate order.
    pub fn texts(&self) -> Vec<&'a str> {
        self.statements().map(ConfigStatement::text).collect()
    }
}

/// Compute the statements of `candidate` that are missing from `running`.
///
/// Every reported statement is preceded by its ancestors, each ancestor is
/// reported once, and the result follows the candidate's document order.
pub fn difference<'a>(
    candidate: &'a ConfigTree,
    running: &ConfigTree,
    options: &DiffOptions,
) -> DiffResult<'a> {
    let Some(ours) = scope(candidate, &options.path) else {
        return DiffResult {
            tree: candidate,
            items: Vec::new(),
        };
    };
    let theirs = scope(running, &options.path).unwrap_or_default();

    let updates = match options.match_policy {
        MatchPolicy::None => ours,
        MatchPolicy::Line => diff_line(candidate, &ours, running, &theirs),
        MatchPolicy::Strict => diff_strict(candidate, &ours, running, &theirs),
        MatchPolicy::Exact => diff_exact(candidate, ours, running, &theirs),
    };

    let updates = match options.replace {
        ReplacePolicy::Line => updates,
        ReplacePolicy::Block => expand_blocks(candidate, &updates, options.path.len()),
    };

    DiffResult {
        tree: candidate,
        items: with_ancestors(candidate, &updates),
    }
}

/// Statements under `path`, or the whole tree when no path is given.
fn scope<S: AsRef<str>>(tree: &ConfigTree, path: &[S]) -> Option<Vec<StatementId>> {
    if path.is_empty() {
        return Some(tree.ids().collect());
    }
    tree.find_path(path).map(|id| tree.descendants(id))
}

fn diff_line(
    candidate: &ConfigTree,
    ours: &[StatementId],
    running: &ConfigTree,
    theirs: &[StatementId],
) -> Vec<StatementId> {
    let existing: HashSet<Vec<&str>> = theirs.iter().map(|&id| running.path(id)).collect();
    ours.iter()
        .copied()
        .filter(|&id| !existing.contains(&candidate.path(id)))
        .collect()
}

fn diff_strict(
    candidate: &ConfigTree,
    ours: &[StatementId],
    running: &ConfigTree,
    theirs: &[StatementId],
) -> Vec<StatementId> {
    ours.iter()
        .enumerate()
        .filter(|&(position, &id)| match theirs.get(position) {
            Some(&other) => candidate.path(id) != running.path(other),
            None => true,
        })
        .map(|(_, &id)| id)
        .collect()
}

fn diff_exact(
    candidate: &ConfigTree,
    ours: Vec<StatementId>,
    running: &ConfigTree,
    theirs: &[StatementId],
) -> Vec<StatementId> {
    let identical = ours.len() == theirs.len()
        && ours
            .iter()
            .zip(theirs)
            .all(|(&a, &b)| candidate.path(a) == running.path(b));
    if identical { Vec::new() } else { ours }
}

/// Replace each update with the whole block it belongs to.
///
/// The block is rooted at the outermost ancestor below the scoping path.
fn expand_blocks(
    tree: &ConfigTree,
    updates: &[StatementId],
    path_depth: usize,
) -> Vec<StatementId> {
    let mut expanded = BTreeSet::new();
    for &id in updates {
        let root = tree
            .ancestors(id)
            .get(path_depth)
            .copied()
            .unwrap_or(id);
        expanded.insert(root);
        expanded.extend(tree.descendants(root));
    }
    expanded.into_iter().collect()
}

fn with_ancestors(tree: &ConfigTree, updates: &[StatementId]) -> Vec<StatementId> {
    let mut items = BTreeSet::new();
    for &id in updates {
        items.extend(tree.ancestors(id));
        items.insert(id);
    }
    // Arena order is document order.
    items.into_iter().collect()
}
