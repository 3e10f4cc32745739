//! Ordered, validated collections of criteria.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use super::criterion::{Criterion, CriterionType, LIMIT, ORDER_BY, OrderType};
use crate::error::{QueryError, QueryResult};

/// An immutable, canonically ordered set of validated criteria.
///
/// Members are sorted by left operand (then by criterion type) so that
/// compilation is deterministic regardless of the order in which criteria
/// arrived. A set never holds two field criteria, or two label criteria,
/// with the same key, and at most one `orderBy` and one `limit`.
///
/// Sets are only grown through [`CriteriaSet::merge`], which returns a new
/// set and leaves the receiver untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CriteriaSet {
    criteria: Vec<Criterion>,
}

impl CriteriaSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from criteria, validating each one.
    pub fn from_criteria(criteria: impl IntoIterator<Item = Criterion>) -> QueryResult<Self> {
        Self::new().merge(criteria)
    }

    /// Wraps criteria without validating or checking for duplicates.
    ///
    /// Used to establish the initial set of a request from a trusted source;
    /// the criteria are still put into canonical order.
    pub fn from_trusted(criteria: impl IntoIterator<Item = Criterion>) -> Self {
        let mut criteria: Vec<Criterion> = criteria.into_iter().collect();
        sort_canonical(&mut criteria);
        Self { criteria }
    }

    /// Combines this set with `incoming`, all-or-nothing.
    ///
    /// Every incoming criterion is validated, and rejected if its
    /// `(left operand, type)` key occurs more than once across both sets.
    /// On any failure `self` is unchanged and no partial result escapes.
    pub fn merge(&self, incoming: impl IntoIterator<Item = Criterion>) -> QueryResult<Self> {
        let incoming: Vec<Criterion> = incoming.into_iter().collect();

        let mut occurrences: HashMap<(&str, CriterionType), usize> = HashMap::new();
        for criterion in self.criteria.iter().chain(incoming.iter()) {
            if criterion.criterion_type != CriterionType::Result {
                *occurrences
                    .entry((criterion.left_op.as_str(), criterion.criterion_type))
                    .or_default() += 1;
            }
        }

        for criterion in &incoming {
            let key = (criterion.left_op.as_str(), criterion.criterion_type);
            if occurrences.get(&key).is_some_and(|count| *count > 1) {
                return Err(QueryError::DuplicateKey {
                    criterion_type: criterion.criterion_type,
                    key: criterion.left_op.clone(),
                });
            }
            criterion.validate()?;
        }

        for reserved in [ORDER_BY, LIMIT] {
            let count = self
                .criteria
                .iter()
                .chain(incoming.iter())
                .filter(|c| c.criterion_type == CriterionType::Result && c.left_op == reserved)
                .count();
            if count > 1 {
                return Err(QueryError::invalid_result_spec(format!(
                    "{} may be specified at most once, but was specified {} times",
                    reserved, count
                )));
            }
        }

        debug!(
            existing = self.criteria.len(),
            incoming = incoming.len(),
            "Merged criteria"
        );

        let mut criteria = self.criteria.clone();
        criteria.extend(incoming);
        sort_canonical(&mut criteria);
        Ok(Self { criteria })
    }

    /// Returns the number of criteria in the set.
    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    /// Returns `true` if the set has no criteria.
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Iterates over the criteria in canonical order.
    pub fn iter(&self) -> std::slice::Iter<'_, Criterion> {
        self.criteria.iter()
    }

    /// Returns the criteria in canonical order.
    pub fn as_slice(&self) -> &[Criterion] {
        &self.criteria
    }

    /// Iterates over the field criteria.
    pub fn field_criteria(&self) -> impl Iterator<Item = &Criterion> {
        self.of_type(CriterionType::Field)
    }

    /// Iterates over the label criteria.
    pub fn label_criteria(&self) -> impl Iterator<Item = &Criterion> {
        self.of_type(CriterionType::Label)
    }

    /// Returns `true` if any label criterion is present.
    pub fn has_label_criteria(&self) -> bool {
        self.label_criteria().next().is_some()
    }

    /// Returns the requested result ordering, if any.
    pub fn order_by(&self) -> Option<(&str, OrderType)> {
        self.result_criterion(ORDER_BY).and_then(|c| match c.right_op.as_slice() {
            [field, order] => order.parse().ok().map(|order| (field.as_str(), order)),
            _ => None,
        })
    }

    /// Returns the requested result limit, if any.
    pub fn limit(&self) -> Option<u32> {
        self.result_criterion(LIMIT)
            .and_then(|c| c.right_op.first())
            .and_then(|value| value.parse().ok())
    }

    fn of_type(&self, criterion_type: CriterionType) -> impl Iterator<Item = &Criterion> {
        self.criteria
            .iter()
            .filter(move |c| c.criterion_type == criterion_type)
    }

    fn result_criterion(&self, key: &str) -> Option<&Criterion> {
        self.of_type(CriterionType::Result).find(|c| c.left_op == key)
    }
}

impl<'a> IntoIterator for &'a CriteriaSet {
    type Item = &'a Criterion;
    type IntoIter = std::slice::Iter<'a, Criterion>;

    fn into_iter(self) -> Self::IntoIter {
        self.criteria.iter()
    }
}

/// Sorts by left operand; ties keep field before label before result.
fn sort_canonical(criteria: &mut [Criterion]) {
    criteria.sort_by(|a, b| {
        a.left_op
            .cmp(&b.left_op)
            .then(a.criterion_type.cmp(&b.criterion_type))
    });
}
