//! Parser for criteria expressions.
//!
//! Field and label queries arrive as separate request parameters
//! (`fieldQuery`, `labelQuery`), each holding an expression in the same
//! grammar:
//!
//! ```text
//! expression  = segment { "|" segment } [ "|" ]
//! segment     = leftOperand SP operator SP rightOperand
//! operator    = "=" / "!=" / "gt" / "gte" / "lt" / "lte" / "in" / "notin" / "eqornil"
//! rightOperand = value                           ; single-valued operators
//!              / "[" value { "|" value } "]"     ; in / notin
//! ```
//!
//! A backslash before `|` makes the separator part of the value. Inside a
//! bracketed list a run of separators is a single element boundary, and the
//! list ends at the `]` that is followed by a separator or the end of input.
//!
//! # Example
//!
//! ```
//! use registry_query::criteria::{CriterionType, Operator};
//! use registry_query::parser::parse_expression;
//!
//! let criteria =
//!     parse_expression(CriterionType::Field, "name = foo\\|bar|id in [1|2]").unwrap();
//! assert_eq!(criteria[0].right_op, vec!["foo|bar"]);
//! assert_eq!(criteria[1].operator, Operator::In);
//! assert_eq!(criteria[1].right_op, vec!["1", "2"]);
//! ```

mod lexer;

use std::iter::Peekable;
use std::vec::IntoIter;

use tracing::trace;

use crate::criteria::{CriteriaSet, Criterion, CriterionType, Operator};
use crate::error::{QueryError, QueryResult};

use lexer::{Lexer, Token, TokenKind};

/// Request parameters carrying criteria expressions, in merge order.
pub const SUPPORTED_QUERY_TYPES: [CriterionType; 2] = [CriterionType::Field, CriterionType::Label];

/// Parses one expression into criteria of the given type.
///
/// An empty expression yields no criteria. Each parsed criterion is
/// validated before it is returned.
pub fn parse_expression(
    criterion_type: CriterionType,
    input: &str,
) -> QueryResult<Vec<Criterion>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }
    if input.trim().is_empty() {
        return Err(QueryError::MalformedExpression {
            criterion_type,
            position: 0,
            message: "empty expression".to_string(),
        });
    }

    let tokens = Lexer::new(input).tokenize();
    let criteria = ExpressionParser::new(criterion_type, tokens).parse()?;
    if criteria.is_empty() {
        return Err(QueryError::MalformedExpression {
            criterion_type,
            position: 0,
            message: format!("{} is not a valid {}", input, criterion_type),
        });
    }
    Ok(criteria)
}

/// Builds the criteria of a request from its field and label expressions.
///
/// Either expression may be absent. Field criteria are merged first, then
/// label criteria; the result is canonically ordered.
pub fn criteria_from_request(
    field_query: Option<&str>,
    label_query: Option<&str>,
) -> QueryResult<CriteriaSet> {
    let mut criteria = CriteriaSet::new();
    for (criterion_type, input) in SUPPORTED_QUERY_TYPES
        .into_iter()
        .zip([field_query, label_query])
    {
        let parsed = parse_expression(criterion_type, input.unwrap_or_default())?;
        criteria = criteria.merge(parsed)?;
    }
    Ok(criteria)
}

/// Builds the criteria of a request from its raw, URL-encoded query string.
///
/// Only the `fieldQuery` and `labelQuery` parameters are read; if one is
/// repeated, the first occurrence wins.
pub fn criteria_from_query_string(query: &str) -> QueryResult<CriteriaSet> {
    let mut field_query = None;
    let mut label_query = None;
    for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let slot = match name.as_ref() {
            "fieldQuery" => &mut field_query,
            "labelQuery" => &mut label_query,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.into_owned());
        }
    }
    criteria_from_request(field_query.as_deref(), label_query.as_deref())
}

/// Turns a token stream into criteria, one segment at a time.
struct ExpressionParser {
    criterion_type: CriterionType,
    tokens: Peekable<IntoIter<Token>>,
}

impl ExpressionParser {
    fn new(criterion_type: CriterionType, tokens: Vec<Token>) -> Self {
        Self {
            criterion_type,
            tokens: tokens.into_iter().peekable(),
        }
    }

    fn parse(mut self) -> QueryResult<Vec<Criterion>> {
        let mut criteria = Vec::new();
        while let Some((position, left_op, operator)) = self.parse_left_operand()? {
            let right_op = if operator.is_multivariate() {
                self.parse_list(&left_op, operator)?
            } else {
                vec![self.parse_value()]
            };
            trace!(
                criterion_type = %self.criterion_type,
                position,
                key = %left_op,
                operator = %operator,
                values = right_op.len(),
                "Parsed criterion"
            );
            let criterion = Criterion::new(left_op, operator, right_op, self.criterion_type);
            criterion.validate()?;
            criteria.push(criterion);
        }
        Ok(criteria)
    }

    /// Reads up to and including the operator of the next segment.
    ///
    /// Returns `None` once the input is exhausted between segments.
    fn parse_left_operand(&mut self) -> QueryResult<Option<(usize, String, Operator)>> {
        let Some(first) = self.tokens.peek() else {
            return Ok(None);
        };
        let position = first.position;

        let mut left_op = String::new();
        for token in self.tokens.by_ref() {
            match token.kind {
                TokenKind::Operator(op) if left_op.is_empty() => {
                    return Err(QueryError::MalformedExpression {
                        criterion_type: self.criterion_type,
                        position: token.position,
                        message: format!("operator {} has no left operand", op),
                    });
                }
                TokenKind::Operator(op) => return Ok(Some((position, left_op, op))),
                other => left_op.push_str(&other.as_literal()),
            }
        }

        Err(QueryError::MalformedExpression {
            criterion_type: self.criterion_type,
            position,
            message: format!("no operator found in \"{}\"", left_op),
        })
    }

    /// Reads a single value up to the next separator or end of input.
    fn parse_value(&mut self) -> String {
        let mut value = String::new();
        for token in self.tokens.by_ref() {
            match token.kind {
                TokenKind::Separator => break,
                other => value.push_str(&other.as_literal()),
            }
        }
        value
    }

    /// Reads a bracketed list, consuming the separator that ends the segment.
    fn parse_list(&mut self, left_op: &str, operator: Operator) -> QueryResult<Vec<String>> {
        let criterion_type = self.criterion_type;
        let bracket_mismatch = || QueryError::BracketMismatch {
            criterion_type,
            key: left_op.to_string(),
            operator,
        };

        match self.tokens.next() {
            Some(Token {
                kind: TokenKind::OpenBracket,
                ..
            }) => {}
            _ => return Err(bracket_mismatch()),
        }

        let mut values = Vec::new();
        let mut current = String::new();
        let mut after_separator = false;
        while let Some(token) = self.tokens.next() {
            match token.kind {
                TokenKind::Separator => {
                    if !after_separator {
                        values.push(self.list_element(left_op, &mut current, token.position)?);
                    }
                    after_separator = true;
                    continue;
                }
                TokenKind::CloseBracket if self.at_segment_end() => {
                    values.push(self.list_element(left_op, &mut current, token.position)?);
                    self.tokens.next_if(|t| t.kind == TokenKind::Separator);
                    return Ok(values);
                }
                other => current.push_str(&other.as_literal()),
            }
            after_separator = false;
        }

        Err(bracket_mismatch())
    }

    /// Takes the finished list element; empty elements are rejected.
    fn list_element(
        &self,
        left_op: &str,
        current: &mut String,
        position: usize,
    ) -> QueryResult<String> {
        if current.is_empty() {
            return Err(QueryError::MalformedExpression {
                criterion_type: self.criterion_type,
                position,
                message: format!("empty list element in right operand of \"{}\"", left_op),
            });
        }
        Ok(std::mem::take(current))
    }

    fn at_segment_end(&mut self) -> bool {
        self.tokens
            .peek()
            .is_none_or(|t| t.kind == TokenKind::Separator)
    }
}
