//! End-to-end request handling.
//!
//! [`QueryPipeline`] wires the stages a listing or deletion request passes
//! through, in order:
//!
//! 1. parse `fieldQuery`/`labelQuery` into a [`CriteriaCarrier`]
//! 2. attach identity-derived label restrictions
//! 3. compile the carrier's criteria for an entity table
//! 4. rebind placeholders for the storage driver
//!
//! Each stage is a separate method so embedding services can insert their
//! own stages between them.

use serde_json::{Map, Value};

use crate::carrier::CriteriaCarrier;
use crate::config::QueryConfig;
use crate::criteria::CriteriaSet;
use crate::error::{PolicyError, QueryError, QueryResult};
use crate::parser::{criteria_from_query_string, criteria_from_request};
use crate::policy::ClaimLabelPolicy;
use crate::schema::EntitySchema;
use crate::sql::{Statement, StatementCompiler};

/// A configured query pipeline.
///
/// # Examples
///
/// ```
/// use registry_query::config::QueryConfig;
/// use registry_query::pipeline::QueryPipeline;
/// use registry_query::schema::EntitySchema;
/// use registry_query::sql::PlaceholderStyle;
///
/// let pipeline = QueryPipeline::new(QueryConfig {
///     placeholder_style: PlaceholderStyle::Dollar,
///     ..Default::default()
/// })
/// .unwrap();
/// let schema = EntitySchema::with_fields(["id", "name"]);
///
/// let carrier = pipeline.parse_request(Some("name = broker|id != 1"), None).unwrap();
/// let statement = pipeline.compile_list(&carrier, "brokers", &schema).unwrap();
/// assert_eq!(
///     statement.sql,
///     "SELECT * FROM brokers WHERE brokers.id != $1 AND brokers.name = $2;"
/// );
/// assert_eq!(statement.params, vec!["1", "broker"]);
/// ```
#[derive(Debug, Clone)]
pub struct QueryPipeline {
    config: QueryConfig,
    policy: ClaimLabelPolicy,
}

impl QueryPipeline {
    /// Creates a pipeline, building the claim policy from the configuration.
    pub fn new(config: QueryConfig) -> Result<Self, Vec<String>> {
        config.validate()?;
        let pairs = config.label_claim_pairs().map_err(|e| vec![e])?;
        let policy =
            ClaimLabelPolicy::new(pairs).with_skip_missing_claims(config.skip_missing_claims);
        Ok(Self { config, policy })
    }

    /// Creates a pipeline from environment variables.
    pub fn from_env() -> Result<Self, Vec<String>> {
        Self::new(QueryConfig::from_env())
    }

    /// Replaces the claim policy.
    pub fn with_policy(mut self, policy: ClaimLabelPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Returns the claim policy.
    pub fn policy(&self) -> &ClaimLabelPolicy {
        &self.policy
    }

    /// Parses the request's expressions into the request's initial carrier.
    pub fn parse_request(
        &self,
        field_query: Option<&str>,
        label_query: Option<&str>,
    ) -> QueryResult<CriteriaCarrier> {
        let criteria = criteria_from_request(field_query, label_query)?;
        Ok(CriteriaCarrier::new().replace(criteria))
    }

    /// Parses a raw URL query string into the request's initial carrier.
    pub fn parse_query_string(&self, query: &str) -> QueryResult<CriteriaCarrier> {
        let criteria = criteria_from_query_string(query)?;
        Ok(CriteriaCarrier::new().replace(criteria))
    }

    /// Attaches the label restrictions derived from the caller's claims.
    pub fn apply_claims(
        &self,
        carrier: &CriteriaCarrier,
        claims: &Map<String, Value>,
    ) -> Result<CriteriaCarrier, PolicyError> {
        self.policy.apply(carrier, claims)
    }

    /// Compiles a listing statement in the configured placeholder style.
    ///
    /// A `limit` attached by any earlier stage is checked against
    /// `max_limit` here.
    pub fn compile_list(
        &self,
        carrier: &CriteriaCarrier,
        table: &str,
        schema: &EntitySchema,
    ) -> QueryResult<Statement> {
        let criteria = carrier.read();
        self.check_limit(criteria)?;
        let statement = StatementCompiler::new(table, schema).list(criteria)?;
        Ok(statement.rebind(self.config.placeholder_style))
    }

    /// Compiles a deletion statement in the configured placeholder style.
    pub fn compile_delete(
        &self,
        carrier: &CriteriaCarrier,
        table: &str,
        schema: &EntitySchema,
    ) -> QueryResult<Statement> {
        let statement = StatementCompiler::new(table, schema).delete(carrier.read())?;
        Ok(statement.rebind(self.config.placeholder_style))
    }

    fn check_limit(&self, criteria: &CriteriaSet) -> QueryResult<()> {
        match (criteria.limit(), self.config.max_limit) {
            (Some(limit), Some(max)) if limit > max => Err(QueryError::invalid_result_spec(
                format!("limit {} exceeds the maximum of {}", limit, max),
            )),
            _ => Ok(()),
        }
    }
}
