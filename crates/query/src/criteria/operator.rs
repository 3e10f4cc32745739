//! Query operators.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A comparison operator usable in field and label criteria.
///
/// The textual form of each operator is what appears in a query expression,
/// bracketed by single spaces: `name = foo`, `age gte 21`, `id in [a|b]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Left operand equals the right operand.
    #[serde(rename = "=")]
    Equals,
    /// Left operand differs from the right operand.
    #[serde(rename = "!=")]
    NotEquals,
    /// Left operand is greater than the right operand.
    #[serde(rename = "gt")]
    GreaterThan,
    /// Left operand is greater than or equal to the right operand.
    #[serde(rename = "gte")]
    GreaterThanOrEqual,
    /// Left operand is less than the right operand.
    #[serde(rename = "lt")]
    LessThan,
    /// Left operand is less than or equal to the right operand.
    #[serde(rename = "lte")]
    LessThanOrEqual,
    /// Left operand is one of the right operands.
    #[serde(rename = "in")]
    In,
    /// Left operand is none of the right operands.
    #[serde(rename = "notin")]
    NotIn,
    /// Left operand equals the right operand, or is null.
    #[serde(rename = "eqornil")]
    EqualsOrNil,
    /// Not a comparison; carried by result criteria.
    #[serde(rename = "nop")]
    NoOp,
}

impl Operator {
    /// Operators recognised by the expression parser, in matching order.
    ///
    /// `gt` precedes `gte` safely because a match requires the delimiter on
    /// both sides of the token.
    pub const PARSEABLE: [Operator; 9] = [
        Operator::Equals,
        Operator::NotEquals,
        Operator::In,
        Operator::NotIn,
        Operator::GreaterThan,
        Operator::GreaterThanOrEqual,
        Operator::LessThan,
        Operator::LessThanOrEqual,
        Operator::EqualsOrNil,
    ];

    /// Returns the token used for this operator in query expressions.
    pub fn token(&self) -> &'static str {
        match self {
            Operator::Equals => "=",
            Operator::NotEquals => "!=",
            Operator::GreaterThan => "gt",
            Operator::GreaterThanOrEqual => "gte",
            Operator::LessThan => "lt",
            Operator::LessThanOrEqual => "lte",
            Operator::In => "in",
            Operator::NotIn => "notin",
            Operator::EqualsOrNil => "eqornil",
            Operator::NoOp => "nop",
        }
    }

    /// Returns `true` if the right operand is a list.
    pub fn is_multivariate(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    /// Returns `true` if the operator also matches a null left operand.
    pub fn is_nullable(&self) -> bool {
        matches!(self, Operator::EqualsOrNil)
    }

    /// Returns `true` if the operator requires a numeric or timestamp operand.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Operator::GreaterThan
                | Operator::GreaterThanOrEqual
                | Operator::LessThan
                | Operator::LessThanOrEqual
        )
    }

    /// Returns the SQL comparison for this operator, if it has one.
    ///
    /// `EqualsOrNil` compiles to `=` combined with an `IS NULL` check, and
    /// `NoOp` has no SQL form.
    pub fn to_sql_op(&self) -> Option<&'static str> {
        match self {
            Operator::Equals | Operator::EqualsOrNil => Some("="),
            Operator::NotEquals => Some("!="),
            Operator::GreaterThan => Some(">"),
            Operator::GreaterThanOrEqual => Some(">="),
            Operator::LessThan => Some("<"),
            Operator::LessThanOrEqual => Some("<="),
            Operator::In => Some("IN"),
            Operator::NotIn => Some("NOT IN"),
            Operator::NoOp => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" => Ok(Operator::Equals),
            "!=" => Ok(Operator::NotEquals),
            "gt" => Ok(Operator::GreaterThan),
            "gte" => Ok(Operator::GreaterThanOrEqual),
            "lt" => Ok(Operator::LessThan),
            "lte" => Ok(Operator::LessThanOrEqual),
            "in" => Ok(Operator::In),
            "notin" => Ok(Operator::NotIn),
            "eqornil" => Ok(Operator::EqualsOrNil),
            "nop" => Ok(Operator::NoOp),
            _ => Err(format!("unknown operator: {}", s)),
        }
    }
}
