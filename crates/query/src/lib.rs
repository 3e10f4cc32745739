//! # registry-query - Criteria queries for a resource registry
//!
//! This crate implements the filtering language used by the registry's list
//! and delete endpoints, from request parameter to parameterized SQL.
//!
//! ## Features
//!
//! - **Criteria DSL**: `fieldQuery` and `labelQuery` expressions such as
//!   `name = broker|id in [1|2]`, with `\|` escaping
//! - **Merge engine**: validation, duplicate detection and a canonical
//!   ordering shared by every stage
//! - **Criteria carrier**: request-scoped, copy-on-write propagation of the
//!   current criteria across independent stages
//! - **Identity policy**: label restrictions derived from token claims that
//!   callers cannot widen
//! - **SQL compiler**: listing and deletion statements over an entity table
//!   and its optional label table, with every operand bound as a parameter
//!
//! ## Architecture
//!
//! - [`criteria`] - operators, criteria and criteria sets
//! - [`parser`] - the expression grammar
//! - [`carrier`] - request-scoped criteria propagation
//! - [`policy`] - claim-to-label restrictions
//! - [`schema`] - entity and label table descriptors
//! - [`sql`] - statement compilation and placeholder rebinding
//! - [`config`] - environment-driven configuration
//! - [`pipeline`] - the stages wired together
//! - [`error`] - error types
//!
//! ## Quick Start
//!
//! ```rust
//! use registry_query::config::QueryConfig;
//! use registry_query::pipeline::QueryPipeline;
//! use registry_query::schema::{EntitySchema, LabelLink};
//! use serde_json::json;
//!
//! let pipeline = QueryPipeline::new(QueryConfig {
//!     label_claims: "zid=subaccount_id".to_string(),
//!     ..Default::default()
//! })
//! .unwrap();
//!
//! let schema = EntitySchema::with_fields(["id", "name"])
//!     .with_label_link(LabelLink::new("broker_labels", "broker_id"));
//! let claims = json!({"zid": "acme"});
//!
//! let carrier = pipeline
//!     .parse_query_string("fieldQuery=name%20%3D%20broker")
//!     .unwrap();
//! let carrier = pipeline
//!     .apply_claims(&carrier, claims.as_object().unwrap())
//!     .unwrap();
//! let statement = pipeline.compile_list(&carrier, "brokers", &schema).unwrap();
//!
//! assert!(statement.sql.ends_with(
//!     "WHERE brokers.name = ? AND broker_labels.key = ? AND broker_labels.val = ?;"
//! ));
//! assert_eq!(statement.params, vec!["broker", "subaccount_id", "acme"]);
//! ```

pub mod carrier;
pub mod config;
pub mod criteria;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod policy;
pub mod schema;
pub mod sql;

pub use carrier::CriteriaCarrier;
pub use config::QueryConfig;
pub use criteria::{CriteriaSet, Criterion, CriterionType, Operator, OrderType};
pub use error::{PolicyError, QueryError, QueryErrorKind, QueryResult};
pub use pipeline::QueryPipeline;
pub use policy::ClaimLabelPolicy;
pub use schema::{EntitySchema, LabelLink};
pub use sql::{PlaceholderStyle, Statement, StatementCompiler};
