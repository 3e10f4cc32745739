//! A single filter, sort or limit instruction.

use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use super::operator::Operator;
use crate::error::{QueryError, QueryResult};

/// Separator between query segments and between list elements.
pub const SEPARATOR: char = '|';

/// Delimiter bracketing the operator token.
pub const OPERAND_SEPARATOR: char = ' ';

/// Opens a multivariate right operand.
pub const OPEN_BRACKET: char = '[';

/// Closes a multivariate right operand.
pub const CLOSE_BRACKET: char = ']';

/// Escapes a separator inside a right operand.
pub const ESCAPE: char = '\\';

/// Reserved left operand of an ordering criterion.
pub const ORDER_BY: &str = "orderBy";

/// Reserved left operand of a limit criterion.
pub const LIMIT: &str = "limit";

/// What a criterion applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CriterionType {
    /// A predicate over a column of the primary entity.
    #[serde(rename = "fieldQuery")]
    Field,
    /// A predicate over the entity's attached key/value labels.
    #[serde(rename = "labelQuery")]
    Label,
    /// Ordering or page size of the result.
    #[serde(rename = "resultQuery")]
    Result,
}

impl CriterionType {
    /// Returns the request parameter name carrying this type of query.
    pub fn as_str(&self) -> &'static str {
        match self {
            CriterionType::Field => "fieldQuery",
            CriterionType::Label => "labelQuery",
            CriterionType::Result => "resultQuery",
        }
    }
}

impl fmt::Display for CriterionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of an ordering criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl OrderType {
    /// Returns the textual form used in criteria operands.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Asc => "asc",
            OrderType::Desc => "desc",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(OrderType::Asc),
            "desc" => Ok(OrderType::Desc),
            _ => Err(format!("unknown order type: {}", s)),
        }
    }
}

/// One filter, sort or limit instruction.
///
/// Constructors produce unvalidated criteria; call [`Criterion::validate`]
/// (or merge them into a [`CriteriaSet`](super::CriteriaSet), which
/// validates) before compiling.
///
/// # Examples
///
/// ```
/// use registry_query::criteria::{Criterion, Operator};
///
/// let criterion = Criterion::by_field(Operator::In, "status", ["ready", "failed"]);
/// assert!(criterion.validate().is_ok());
///
/// let bad = Criterion::by_label(Operator::EqualsOrNil, "env", ["dev"]);
/// assert!(bad.validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Criterion {
    /// The left operand: a field name, label key, or reserved result key.
    pub left_op: String,
    /// The operator.
    pub operator: Operator,
    /// The right operand; a list only for multivariate operators.
    pub right_op: Vec<String>,
    /// What the criterion applies to.
    #[serde(rename = "type")]
    pub criterion_type: CriterionType,
}

impl Criterion {
    /// Creates a criterion over an entity field.
    pub fn by_field<I, S>(operator: Operator, left_op: impl Into<String>, right_op: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(left_op, operator, right_op, CriterionType::Field)
    }

    /// Creates a criterion over an entity label.
    pub fn by_label<I, S>(operator: Operator, left_op: impl Into<String>, right_op: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(left_op, operator, right_op, CriterionType::Label)
    }

    /// Creates a criterion ordering the result by `field`.
    pub fn order_result_by(field: impl Into<String>, order: OrderType) -> Self {
        Self::new(
            ORDER_BY,
            Operator::NoOp,
            [field.into(), order.as_str().to_string()],
            CriterionType::Result,
        )
    }

    /// Creates a criterion limiting the result to `limit` entries.
    pub fn limit_result_by(limit: u32) -> Self {
        Self::new(
            LIMIT,
            Operator::NoOp,
            [limit.to_string()],
            CriterionType::Result,
        )
    }

    pub(crate) fn new<I, S>(
        left_op: impl Into<String>,
        operator: Operator,
        right_op: I,
        criterion_type: CriterionType,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            left_op: left_op.into(),
            operator,
            right_op: right_op.into_iter().map(Into::into).collect(),
            criterion_type,
        }
    }

    /// Checks the criterion's invariants.
    pub fn validate(&self) -> QueryResult<()> {
        if self.criterion_type == CriterionType::Result {
            return self.validate_result_query();
        }

        if self.operator == Operator::NoOp {
            return Err(QueryError::unsupported_operator(format!(
                "{} with key \"{}\" requires a comparison operator",
                self.criterion_type, self.left_op
            )));
        }
        if self.right_op.is_empty() {
            return Err(QueryError::unsupported_operator(format!(
                "operation {} for {} with key \"{}\" has no right operand",
                self.operator, self.criterion_type, self.left_op
            )));
        }
        if self.right_op.len() > 1 && !self.operator.is_multivariate() {
            return Err(QueryError::unsupported_operator(format!(
                "multiple values {:?} received for single value operation {}",
                self.right_op, self.operator
            )));
        }
        if self.operator.is_nullable() && self.criterion_type != CriterionType::Field {
            return Err(QueryError::unsupported_operator(
                "nullable operations are supported only for field queries",
            ));
        }
        if self.operator.is_numeric() {
            let operand = &self.right_op[0];
            if !is_numeric(operand) && !is_datetime(operand) {
                return Err(QueryError::unsupported_operator(format!(
                    "{} is numeric operator, but the right operand {} is not numeric or datetime",
                    self.operator, operand
                )));
            }
        }

        if self.left_op.contains(SEPARATOR) {
            let possible_key = self
                .left_op
                .split(SEPARATOR)
                .filter(|part| !part.is_empty())
                .next_back()
                .unwrap_or_default();
            return Err(QueryError::forbidden_character(format!(
                "separator {} is not allowed in {} with left operand \"{}\". Maybe you meant \"{}\"? Make sure if the separator is present in any right operand, that it is escaped with a backslash ({})",
                SEPARATOR, self.criterion_type, self.left_op, possible_key, ESCAPE
            )));
        }
        if let Some(value) = self.right_op.iter().find(|value| value.contains('\n')) {
            return Err(QueryError::forbidden_character(format!(
                "{} with key \"{}\" has value \"{}\" containing forbidden new line character",
                self.criterion_type,
                self.left_op,
                value.escape_default()
            )));
        }

        Ok(())
    }

    fn validate_result_query(&self) -> QueryResult<()> {
        match self.left_op.as_str() {
            LIMIT => {
                let [value] = self.right_op.as_slice() else {
                    return Err(QueryError::invalid_result_spec(format!(
                        "limit expects exactly one value, but has {}",
                        self.right_op.len()
                    )));
                };
                match value.parse::<i64>() {
                    Ok(limit) if limit >= 1 && limit <= i64::from(u32::MAX) => Ok(()),
                    Ok(limit) => Err(QueryError::invalid_result_spec(format!(
                        "limit ({}) is invalid. Limit should be positive number",
                        limit
                    ))),
                    Err(e) => Err(QueryError::invalid_result_spec(format!(
                        "could not parse limit \"{}\": {}",
                        value, e
                    ))),
                }
            }
            ORDER_BY => match self.right_op.as_slice() {
                [] => Err(QueryError::invalid_result_spec(
                    "order by result expects field and order type, but has none",
                )),
                [field] => Err(QueryError::invalid_result_spec(format!(
                    "order by result for field \"{}\" expects order type, but has none",
                    field
                ))),
                [field, order] => {
                    if field.is_empty() {
                        return Err(QueryError::invalid_result_spec(
                            "order by result expects a non-empty field",
                        ));
                    }
                    order.parse::<OrderType>().map(|_| ()).map_err(|_| {
                        QueryError::invalid_result_spec(format!(
                            "order type \"{}\" for field \"{}\" must be asc or desc",
                            order, field
                        ))
                    })
                }
                _ => Err(QueryError::invalid_result_spec(format!(
                    "order by result expects field and order type, but has {:?}",
                    self.right_op
                ))),
            },
            other => Err(QueryError::invalid_result_spec(format!(
                "unknown result query key \"{}\"; expected {} or {}",
                other, ORDER_BY, LIMIT
            ))),
        }
    }
}

fn is_numeric(value: &str) -> bool {
    value.parse::<i64>().is_ok() || value.parse::<f64>().is_ok_and(f64::is_finite)
}

fn is_datetime(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
}
