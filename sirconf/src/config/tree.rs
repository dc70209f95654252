//! Block-structured configuration model.
//!
//! Statements live in an arena in document order, so walking the arena
//! front to back is a pre-order traversal of the tree and every subtree
//! occupies a contiguous range of ids.

use std::fmt;

use log::trace;
use sha2::{Digest, Sha256};

use super::ignore::IgnorePattern;
use crate::error::{ConfigError, Result};

/// Line prefixes treated as comments and skipped while parsing.
pub const DEFAULT_COMMENT_TOKENS: &[&str] = &["#", "!", "/*", "*/", "echo"];

/// How nesting is expressed in configuration text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Syntax {
    /// Every statement is top-level.
    #[default]
    Flat,
    /// Nesting by leading whitespace, rendered with `width` spaces per level.
    Indented { width: usize },
}

impl Syntax {
    fn width(self) -> usize {
        match self {
            Self::Flat => 0,
            Self::Indented { width } => width,
        }
    }
}

/// Options controlling how text is turned into a [`ConfigTree`].
#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub syntax: Syntax,
    pub ignore_lines: Vec<IgnorePattern>,
    pub comment_tokens: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            syntax: Syntax::Flat,
            ignore_lines: Vec::new(),
            comment_tokens: DEFAULT_COMMENT_TOKENS
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

impl ParseOptions {
    pub fn new(syntax: Syntax) -> Self {
        Self {
            syntax,
            ..Default::default()
        }
    }

    /// Add patterns whose matching lines (and their children) are dropped.
    pub fn with_ignore_lines<I, P>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<IgnorePattern>,
    {
        self.ignore_lines.extend(patterns.into_iter().map(Into::into));
        self
    }

    fn is_comment(&self, line: &str) -> bool {
        self.comment_tokens
            .iter()
            .any(|token| line.starts_with(token.as_str()))
    }

    fn is_ignored(&self, line: &str) -> bool {
        self.ignore_lines.iter().any(|p| p.is_match(line))
    }
}

/// Index of a statement inside its [`ConfigTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatementId(usize);

impl StatementId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One configuration line and its position in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStatement {
    text: String,
    depth: usize,
    ordinal: usize,
    parent: Option<StatementId>,
    children: Vec<StatementId>,
}

impl ConfigStatement {
    /// Statement text without indentation.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Nesting depth, 0 for top-level statements.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Position among siblings.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn parent(&self) -> Option<StatementId> {
        self.parent
    }

    pub fn children(&self) -> &[StatementId] {
        &self.children
    }
}

/// Parsed device configuration.
#[derive(Debug, Clone)]
pub struct ConfigTree {
    statements: Vec<ConfigStatement>,
    roots: Vec<StatementId>,
    raw: String,
    syntax: Syntax,
}

impl ConfigTree {
    /// An empty configuration.
    pub fn empty(syntax: Syntax) -> Self {
        Self {
            statements: Vec::new(),
            roots: Vec::new(),
            raw: String::new(),
            syntax,
        }
    }

    /// Parse configuration text.
    ///
    /// Blank lines and comment lines are skipped. Lines matching an ignore
    /// pattern are dropped together with everything nested beneath them.
    pub fn parse(text: &str, options: &ParseOptions) -> Result<Self> {
        let mut tree = Self::empty(options.syntax);
        tree.raw = text.to_string();

        // Open indentation levels; `None` marks an elided statement.
        let mut stack: Vec<(usize, Option<StatementId>)> = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || options.is_comment(trimmed) {
                continue;
            }

            let indent = match options.syntax {
                Syntax::Flat => 0,
                Syntax::Indented { .. } => line.len() - line.trim_start().len(),
            };

            let mut dedented = false;
            while stack.last().is_some_and(|&(level, _)| level > indent) {
                stack.pop();
                dedented = true;
            }

            match stack.last() {
                Some(&(level, _)) if level == indent => {
                    stack.pop();
                }
                Some(_) | None if dedented => {
                    return Err(ConfigError::MalformedIndentation {
                        line_number: index + 1,
                        line: line.to_string(),
                    }
                    .into());
                }
                _ => {}
            }

            let parent = stack.last().map(|&(_, id)| id);
            if matches!(parent, Some(None)) || options.is_ignored(trimmed) {
                trace!("eliding config line {:?}", trimmed);
                stack.push((indent, None));
                continue;
            }

            let id = tree.push(trimmed, parent.flatten());
            stack.push((indent, Some(id)));
        }

        Ok(tree)
    }

    /// Build a tree from lines that are already known to be well formed.
    pub fn from_lines<I, S>(lines: I, options: &ParseOptions) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let text = lines
            .into_iter()
            .map(|line| line.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        Self::parse(&text, options)
    }

    fn push(&mut self, text: &str, parent: Option<StatementId>) -> StatementId {
        let id = StatementId(self.statements.len());
        let (depth, ordinal) = match parent {
            Some(parent) => {
                let parent = &mut self.statements[parent.0];
                parent.children.push(id);
                (parent.depth + 1, parent.children.len() - 1)
            }
            None => {
                self.roots.push(id);
                (0, self.roots.len() - 1)
            }
        };
        self.statements.push(ConfigStatement {
            text: text.to_string(),
            depth,
            ordinal,
            parent,
            children: Vec::new(),
        });
        id
    }

    pub fn syntax(&self) -> Syntax {
        self.syntax
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn roots(&self) -> &[StatementId] {
        &self.roots
    }

    pub fn statement(&self, id: StatementId) -> &ConfigStatement {
        &self.statements[id.0]
    }

    /// All statements in document order.
    pub fn iter(&self) -> impl Iterator<Item = (StatementId, &ConfigStatement)> {
        self.statements
            .iter()
            .enumerate()
            .map(|(index, statement)| (StatementId(index), statement))
    }

    /// Every statement id in document order.
    pub fn ids(&self) -> impl Iterator<Item = StatementId> + use<> {
        (0..self.statements.len()).map(StatementId)
    }

    /// Ancestors of a statement, outermost first.
    pub fn ancestors(&self, id: StatementId) -> Vec<StatementId> {
        let mut chain = Vec::new();
        let mut cursor = self.statement(id).parent;
        while let Some(parent) = cursor {
            chain.push(parent);
            cursor = self.statement(parent).parent;
        }
        chain.reverse();
        chain
    }

    /// Texts of the ancestors followed by the statement's own text.
    ///
    /// Two statements are the same configuration line when their paths
    /// are equal.
    pub fn path(&self, id: StatementId) -> Vec<&str> {
        self.ancestors(id)
            .into_iter()
            .chain(std::iter::once(id))
            .map(|id| self.statement(id).text())
            .collect()
    }

    /// Everything nested below a statement, in document order.
    pub fn descendants(&self, id: StatementId) -> Vec<StatementId> {
        let depth = self.statement(id).depth;
        self.statements[id.0 + 1..]
            .iter()
            .take_while(|statement| statement.depth > depth)
            .enumerate()
            .map(|(offset, _)| StatementId(id.0 + 1 + offset))
            .collect()
    }

    /// Locate a statement by the texts of it and its ancestors.
    pub fn find_path<S: AsRef<str>>(&self, path: &[S]) -> Option<StatementId> {
        let (first, rest) = path.split_first()?;
        let mut current = self
            .roots
            .iter()
            .copied()
            .find(|&id| self.statement(id).text() == first.as_ref())?;
        for segment in rest {
            current = self
                .statement(current)
                .children
                .iter()
                .copied()
                .find(|&id| self.statement(id).text() == segment.as_ref())?;
        }
        Some(current)
    }

    /// Original text the tree was parsed from.
    pub fn config_text(&self) -> &str {
        &self.raw
    }

    /// Canonical rendering of the effective statements.
    pub fn to_text(&self) -> String {
        let width = self.syntax.width();
        self.statements
            .iter()
            .map(|s| format!("{}{}", " ".repeat(width * s.depth), s.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// SHA-256 of the canonical rendering, as lowercase hex.
    ///
    /// Equal fingerprints mean the effective configurations are identical.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_text().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl PartialEq for ConfigTree {
    fn eq(&self, other: &Self) -> bool {
        self.statements == other.statements
    }
}

impl Eq for ConfigTree {}

impl fmt::Display for ConfigTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
