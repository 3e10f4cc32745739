//! Identity-derived label restrictions.
//!
//! A [`ClaimLabelPolicy`] turns claims of the authenticated caller into label
//! criteria and layers them onto the request's criteria. For example, with
//! the mapping `zid -> subaccount_id`, a caller whose token carries
//! `"zid": "acme"` only ever sees entities labelled `subaccount_id=acme`.
//!
//! Because restrictions are attached through [`CriteriaCarrier::attach`], a
//! caller cannot widen them: a request that already filters on the same
//! label key is rejected as a duplicate instead of being silently merged.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::carrier::CriteriaCarrier;
use crate::criteria::{Criterion, Operator};
use crate::error::PolicyError;

/// Maps identity claims to label restrictions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimLabelPolicy {
    /// Claim name to label key.
    label_keys_by_claim: BTreeMap<String, String>,
    /// Skip absent claims instead of failing.
    skip_missing_claims: bool,
}

impl ClaimLabelPolicy {
    /// Creates a policy from `(claim, label key)` pairs.
    pub fn new<I, C, K>(label_keys_by_claim: I) -> Self
    where
        I: IntoIterator<Item = (C, K)>,
        C: Into<String>,
        K: Into<String>,
    {
        Self {
            label_keys_by_claim: label_keys_by_claim
                .into_iter()
                .map(|(claim, key)| (claim.into(), key.into()))
                .collect(),
            skip_missing_claims: false,
        }
    }

    /// Sets whether absent claims are skipped (with a warning) or rejected.
    pub fn with_skip_missing_claims(mut self, skip: bool) -> Self {
        self.skip_missing_claims = skip;
        self
    }

    /// Returns `true` if the policy restricts nothing.
    pub fn is_empty(&self) -> bool {
        self.label_keys_by_claim.is_empty()
    }

    /// Builds the label criteria for the given claims.
    pub fn restrictions(&self, claims: &Map<String, Value>) -> Result<Vec<Criterion>, PolicyError> {
        let mut restrictions = Vec::with_capacity(self.label_keys_by_claim.len());
        for (claim, label_key) in &self.label_keys_by_claim {
            let value = match claims.get(claim) {
                None | Some(Value::Null) => {
                    if self.skip_missing_claims {
                        warn!(claim = %claim, label_key = %label_key, "Claim missing; label restriction skipped");
                        continue;
                    }
                    return Err(PolicyError::MissingClaim {
                        claim: claim.clone(),
                        label_key: label_key.clone(),
                    });
                }
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                Some(Value::Bool(b)) => b.to_string(),
                Some(_) => {
                    return Err(PolicyError::InvalidClaim {
                        claim: claim.clone(),
                    });
                }
            };
            restrictions.push(Criterion::by_label(Operator::Equals, label_key.as_str(), [value]));
        }
        Ok(restrictions)
    }

    /// Attaches the restrictions for `claims` to the carrier.
    ///
    /// All restrictions are attached at once; if any is rejected the
    /// original carrier is left as it was.
    pub fn apply(
        &self,
        carrier: &CriteriaCarrier,
        claims: &Map<String, Value>,
    ) -> Result<CriteriaCarrier, PolicyError> {
        if self.is_empty() {
            return Ok(carrier.clone());
        }

        let restrictions = self.restrictions(claims)?;
        debug!(
            restrictions = restrictions.len(),
            label_keys = ?restrictions.iter().map(|c| c.left_op.as_str()).collect::<Vec<_>>(),
            "Applying claim label restrictions"
        );
        Ok(carrier.attach(restrictions)?)
    }
}
