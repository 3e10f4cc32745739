//! Error types for the query core.
//!
//! Every error raised here is a deterministic function of the input text or
//! criteria: identical input always reproduces the identical error, so none
//! of them are retryable. Embedding services surface them as bad-request
//! responses.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;

use crate::criteria::{CriterionType, Operator};

/// Errors raised while parsing, validating, merging or compiling criteria.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Ungrammatical input: no operator found, unterminated value, empty expression.
    #[error("malformed {criterion_type} expression at position {position}: {message}")]
    MalformedExpression {
        criterion_type: CriterionType,
        position: usize,
        message: String,
    },

    /// A multivariate operand is missing its opening or closing bracket.
    #[error(
        "operator {operator} for {criterion_type} {key} requires right operand to be surrounded in []"
    )]
    BracketMismatch {
        criterion_type: CriterionType,
        key: String,
        operator: Operator,
    },

    /// The operand shape or type is incompatible with the operator.
    #[error("unsupported operation: {message}")]
    UnsupportedOperator { message: String },

    /// An unescaped separator in a key, or a newline in a value.
    #[error("forbidden character: {message}")]
    ForbiddenCharacter { message: String },

    /// The same (key, type) pair occurs more than once in a combined set.
    #[error("duplicate {criterion_type} key: {key}")]
    DuplicateKey {
        criterion_type: CriterionType,
        key: String,
    },

    /// A malformed orderBy or limit instruction.
    #[error("invalid result query: {message}")]
    InvalidResultSpec { message: String },

    /// The field key is not in the entity's column allow-list.
    #[error("unsupported field query key: {field}")]
    UnsupportedField { field: String },

    /// Label criteria were supplied to the deletion path.
    #[error(
        "deleting from {table} by label query is not supported; list the matching entities and delete them by primary key"
    )]
    UnsupportedLabelDelete { table: String },

    /// Label criteria were compiled against an entity that has no labels.
    #[error("entity table {table} does not support label queries (key: {key})")]
    UnsupportedLabelQuery { table: String, key: String },
}

/// Coarse classification of a [`QueryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryErrorKind {
    MalformedExpression,
    BracketMismatch,
    UnsupportedOperator,
    ForbiddenCharacter,
    DuplicateKey,
    InvalidResultSpec,
    UnsupportedField,
    UnsupportedLabelDelete,
    UnsupportedLabelQuery,
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryErrorKind::MalformedExpression => "malformed_expression",
            QueryErrorKind::BracketMismatch => "bracket_mismatch",
            QueryErrorKind::UnsupportedOperator => "unsupported_operator",
            QueryErrorKind::ForbiddenCharacter => "forbidden_character",
            QueryErrorKind::DuplicateKey => "duplicate_key",
            QueryErrorKind::InvalidResultSpec => "invalid_result_spec",
            QueryErrorKind::UnsupportedField => "unsupported_field",
            QueryErrorKind::UnsupportedLabelDelete => "unsupported_label_delete",
            QueryErrorKind::UnsupportedLabelQuery => "unsupported_label_query",
        };
        f.write_str(name)
    }
}

impl QueryError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> QueryErrorKind {
        match self {
            QueryError::MalformedExpression { .. } => QueryErrorKind::MalformedExpression,
            QueryError::BracketMismatch { .. } => QueryErrorKind::BracketMismatch,
            QueryError::UnsupportedOperator { .. } => QueryErrorKind::UnsupportedOperator,
            QueryError::ForbiddenCharacter { .. } => QueryErrorKind::ForbiddenCharacter,
            QueryError::DuplicateKey { .. } => QueryErrorKind::DuplicateKey,
            QueryError::InvalidResultSpec { .. } => QueryErrorKind::InvalidResultSpec,
            QueryError::UnsupportedField { .. } => QueryErrorKind::UnsupportedField,
            QueryError::UnsupportedLabelDelete { .. } => QueryErrorKind::UnsupportedLabelDelete,
            QueryError::UnsupportedLabelQuery { .. } => QueryErrorKind::UnsupportedLabelQuery,
        }
    }

    /// Returns `true` if the error was caused by the client's input.
    ///
    /// Every query error is; the method exists so callers mapping errors to
    /// responses don't need to enumerate variants.
    pub fn is_client_error(&self) -> bool {
        true
    }

    pub(crate) fn unsupported_operator(message: impl Into<String>) -> Self {
        QueryError::UnsupportedOperator {
            message: message.into(),
        }
    }

    pub(crate) fn forbidden_character(message: impl Into<String>) -> Self {
        QueryError::ForbiddenCharacter {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_result_spec(message: impl Into<String>) -> Self {
        QueryError::InvalidResultSpec {
            message: message.into(),
        }
    }
}

/// Errors raised by the identity policy stage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The injected criteria were rejected.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A configured claim is absent from the caller's token.
    #[error("claim {claim} required for label restriction {label_key} is missing")]
    MissingClaim { claim: String, label_key: String },

    /// A configured claim has a value that cannot be used as a label value.
    #[error("claim {claim} must be a string, number or boolean")]
    InvalidClaim { claim: String },
}

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;
