//! Configuration for the query pipeline.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `REGISTRY_QUERY_PLACEHOLDER_STYLE` | question | `question`, `dollar` or `numbered` |
//! | `REGISTRY_QUERY_MAX_LIMIT` | (none) | Upper bound for `limit` result criteria |
//! | `REGISTRY_QUERY_LABEL_CLAIMS` | (empty) | `claim=labelKey` pairs, comma-separated |
//! | `REGISTRY_QUERY_SKIP_MISSING_CLAIMS` | false | Skip absent claims instead of failing |
//!
//! # Example
//!
//! ```rust
//! use registry_query::config::QueryConfig;
//! use registry_query::sql::PlaceholderStyle;
//!
//! let config = QueryConfig {
//!     placeholder_style: PlaceholderStyle::Dollar,
//!     label_claims: "zid=subaccount_id".to_string(),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! assert_eq!(
//!     config.label_claim_pairs().unwrap(),
//!     vec![("zid".to_string(), "subaccount_id".to_string())]
//! );
//! ```

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::criteria::SEPARATOR;
use crate::sql::PlaceholderStyle;

/// Configuration for parsing, restricting and compiling criteria.
#[derive(Debug, Clone, PartialEq, Eq, Parser, Serialize, Deserialize)]
#[command(name = "registry-query")]
#[command(about = "Criteria query configuration")]
#[serde(default)]
pub struct QueryConfig {
    /// Placeholder convention of the storage driver.
    #[arg(
        long,
        env = "REGISTRY_QUERY_PLACEHOLDER_STYLE",
        value_enum,
        default_value_t = PlaceholderStyle::Question
    )]
    pub placeholder_style: PlaceholderStyle,

    /// Upper bound for `limit` result criteria.
    #[arg(long, env = "REGISTRY_QUERY_MAX_LIMIT")]
    pub max_limit: Option<u32>,

    /// Identity claims mapped to label keys (`claim=labelKey`, comma-separated).
    #[arg(long, env = "REGISTRY_QUERY_LABEL_CLAIMS", default_value = "")]
    pub label_claims: String,

    /// Skip absent claims with a warning instead of rejecting the request.
    #[arg(long, env = "REGISTRY_QUERY_SKIP_MISSING_CLAIMS", default_value = "false")]
    pub skip_missing_claims: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            placeholder_style: PlaceholderStyle::Question,
            max_limit: None,
            label_claims: String::new(),
            skip_missing_claims: false,
        }
    }
}

impl QueryConfig {
    /// Creates a QueryConfig from environment variables.
    ///
    /// Process arguments are ignored.
    pub fn from_env() -> Self {
        Self::try_parse_from(["registry-query"]).unwrap_or_default()
    }

    /// Parses `label_claims` into `(claim, label key)` pairs.
    pub fn label_claim_pairs(&self) -> Result<Vec<(String, String)>, String> {
        self.label_claims
            .split(',')
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((claim, key)) if !claim.trim().is_empty() && !key.trim().is_empty() => {
                    Ok((claim.trim().to_string(), key.trim().to_string()))
                }
                _ => Err(format!(
                    "Invalid label claim mapping '{}', expected claim=labelKey",
                    pair
                )),
            })
            .collect()
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.max_limit == Some(0) {
            errors.push("Max limit cannot be 0".to_string());
        }

        match self.label_claim_pairs() {
            Ok(pairs) => {
                let mut claims = Vec::with_capacity(pairs.len());
                let mut keys = Vec::with_capacity(pairs.len());
                for (claim, key) in &pairs {
                    if claims.contains(&claim) {
                        errors.push(format!("Claim '{}' is mapped more than once", claim));
                    }
                    if keys.contains(&key) {
                        errors.push(format!("Label key '{}' is mapped more than once", key));
                    }
                    if key.contains(SEPARATOR) {
                        errors.push(format!(
                            "Label key '{}' contains the separator '{}'",
                            key, SEPARATOR
                        ));
                    }
                    claims.push(claim);
                    keys.push(key);
                }
            }
            Err(e) => errors.push(e),
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
