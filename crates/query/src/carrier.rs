//! Request-scoped criteria propagation.
//!
//! A [`CriteriaCarrier`] holds the criteria of one request as it passes
//! through independent pipeline stages. Stages derive new carriers instead
//! of mutating the one they were given, so a carrier captured by an earlier
//! stage keeps seeing exactly the criteria it saw at capture time.

use std::sync::Arc;

use crate::criteria::{CriteriaSet, Criterion};
use crate::error::QueryResult;

/// An immutable handle to the current criteria of a request.
///
/// Cloning is cheap; clones share the same underlying set.
///
/// # Examples
///
/// ```
/// use registry_query::carrier::CriteriaCarrier;
/// use registry_query::criteria::{Criterion, Operator};
///
/// let request = CriteriaCarrier::new()
///     .attach([Criterion::by_field(Operator::Equals, "name", ["broker"])])
///     .unwrap();
/// let restricted = request
///     .attach([Criterion::by_label(Operator::Equals, "tenant", ["acme"])])
///     .unwrap();
///
/// assert_eq!(request.read().len(), 1);
/// assert_eq!(restricted.read().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CriteriaCarrier {
    criteria: Arc<CriteriaSet>,
}

impl CriteriaCarrier {
    /// Creates a carrier holding no criteria.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a carrier holding the given set.
    pub fn with_criteria(criteria: CriteriaSet) -> Self {
        Self {
            criteria: Arc::new(criteria),
        }
    }

    /// Merges `criteria` into the current set and returns a carrier bound to
    /// the result.
    ///
    /// Fails without side effects if any criterion is invalid or collides
    /// with a key already present.
    pub fn attach(&self, criteria: impl IntoIterator<Item = Criterion>) -> QueryResult<Self> {
        let merged = self.criteria.merge(criteria)?;
        Ok(Self::with_criteria(merged))
    }

    /// Returns the current criteria.
    pub fn read(&self) -> &CriteriaSet {
        &self.criteria
    }

    /// Returns a carrier bound to `criteria`, bypassing merge.
    ///
    /// Used to establish the initial set of a request.
    pub fn replace(&self, criteria: CriteriaSet) -> Self {
        Self::with_criteria(criteria)
    }

    /// Returns `true` if both carriers share the same underlying set.
    pub fn shares_criteria_with(&self, other: &CriteriaCarrier) -> bool {
        Arc::ptr_eq(&self.criteria, &other.criteria)
    }
}

impl From<CriteriaSet> for CriteriaCarrier {
    fn from(criteria: CriteriaSet) -> Self {
        Self::with_criteria(criteria)
    }
}
