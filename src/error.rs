use std::fmt;

use itertools::Itertools;
use thiserror::Error;

use crate::compiler::Block;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("rule `{rule}` references unknown collection `{name}`")]
    UnresolvedReference { rule: String, name: String },

    #[error("`{name}` is reserved: {reason}")]
    ReservedName { name: String, reason: &'static str },

    #[error("rule `{name}` is declared more than once in the {block} block")]
    DuplicateResult { block: Block, name: String },

    #[error("collection `{0}` is declared more than once")]
    DuplicateCollection(String),

    #[error("collection `{collection}` declares column `{column}` more than once")]
    DuplicateColumn { collection: String, column: String },

    #[error("collection `{collection}` has unknown type `{kind}`")]
    UnknownKind { collection: String, kind: String },

    #[error("preloaded collection `{0}` is not declared in the schema")]
    UnknownPreload(String),

    #[error("collection `{0}` is preloaded more than once")]
    DuplicatePreload(String),

    #[error("rule `{rule}` reads the preloaded tuples of `{collection}`, but none are available")]
    MissingTuples { rule: String, collection: String },

    #[error("rule `{rule}` has no anchor and its first operator takes no collection")]
    MissingAnchor { rule: String },

    #[error("preloaded row {row} of `{collection}` has {found} fields, expected {expected}")]
    TupleArity {
        collection: String,
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("argument `address` is reserved to be `std::string`, found `{0}`")]
    ReservedArgument(String),

    #[error("malformed program document: {0}")]
    Document(#[from] serde_yaml::Error),
}

/// Deepest failure found while parsing one rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub rule: String,
    /// Byte offset into the rule text.
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    /// Grammar alternatives that were tried at `offset`.
    pub expected: Vec<String>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rule `{}`: parse error at offset {} (line {}, column {})",
            self.rule, self.offset, self.line, self.column
        )?;
        if !self.expected.is_empty() {
            write!(f, ", expected {}", self.expected.iter().join(" or "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}
