//! The criteria data model.
//!
//! - [`Operator`] - comparison operators and their metadata
//! - [`Criterion`] - one filter, sort or limit instruction
//! - [`CriteriaSet`] - a validated, canonically ordered set of criteria

mod criterion;
mod operator;
mod set;

pub use criterion::{
    CLOSE_BRACKET, Criterion, CriterionType, ESCAPE, LIMIT, OPEN_BRACKET, OPERAND_SEPARATOR,
    ORDER_BY, OrderType, SEPARATOR,
};
pub use operator::Operator;
pub use set::CriteriaSet;
