//! Tests for listing and deletion statement compilation.

mod common;

use registry_query::criteria::{CriteriaSet, Criterion, Operator, OrderType};
use registry_query::error::QueryErrorKind;
use registry_query::parser::criteria_from_request;
use registry_query::schema::{EntitySchema, LabelLink};
use registry_query::sql::{PlaceholderStyle, StatementCompiler};

use common::{assert_error_kind, broker_schema, init_tracing, platform_schema, visibility_schema};

fn set(criteria: impl IntoIterator<Item = Criterion>) -> CriteriaSet {
    CriteriaSet::from_criteria(criteria).unwrap()
}

fn placeholder_count(sql: &str) -> usize {
    sql.matches('?').count()
}

// ============================================================================
// Listing
// ============================================================================

#[test]
fn test_order_independent_compilation() {
    init_tracing();
    let schema = platform_schema();
    let compiler = StatementCompiler::new("platforms", &schema);

    let one = criteria_from_request(Some("name = 1|id = 2"), None).unwrap();
    let other = criteria_from_request(Some("id = 2|name = 1"), None).unwrap();

    let one = compiler.list(&one).unwrap();
    let other = compiler.list(&other).unwrap();
    assert_eq!(one, other);
    assert_eq!(
        one.sql,
        "SELECT * FROM platforms WHERE platforms.id = ? AND platforms.name = ?;"
    );
    assert_eq!(one.params, vec!["2", "1"]);
}

#[test]
fn test_equals_or_nil_shape() {
    let schema = EntitySchema::with_fields(["platform_id"]);
    let statement = StatementCompiler::new("t", &schema)
        .list(&set([Criterion::by_field(
            Operator::EqualsOrNil,
            "platform_id",
            ["value"],
        )]))
        .unwrap();
    assert_eq!(
        statement.sql,
        "SELECT * FROM t WHERE (t.platform_id = ? OR t.platform_id IS NULL);"
    );
    assert_eq!(statement.params, vec!["value"]);
}

#[test]
fn test_label_join_added_without_label_criteria() {
    let schema = visibility_schema();
    let statement = StatementCompiler::new("visibilities", &schema)
        .list(&CriteriaSet::new())
        .unwrap();
    assert!(statement.sql.starts_with("SELECT visibilities.*, "));
    assert!(statement.sql.contains(
        "FROM visibilities LEFT JOIN visibility_labels ON visibilities.id = visibility_labels.visibility_id;"
    ));
    assert!(statement.params.is_empty());
}

#[test]
fn test_custom_label_link() {
    let schema = EntitySchema::with_fields(["uuid"]).with_label_link(
        LabelLink::new("offering_labels", "offering_uuid")
            .with_primary_key_column("uuid")
            .with_columns(["key", "val"]),
    );
    let statement = StatementCompiler::new("offerings", &schema)
        .list(&set([Criterion::by_label(Operator::NotEquals, "env", ["dev"])]))
        .unwrap();
    assert_eq!(
        statement.sql,
        "SELECT offerings.*, offering_labels.key AS \"offering_labels.key\", \
         offering_labels.val AS \"offering_labels.val\" \
         FROM offerings LEFT JOIN offering_labels ON offerings.uuid = offering_labels.offering_uuid \
         WHERE offering_labels.key = ? AND offering_labels.val != ?;"
    );
    assert_eq!(statement.params, vec!["env", "dev"]);
}

#[test]
fn test_params_stay_in_lock_step_with_placeholders() {
    let schema = broker_schema();
    let criteria = criteria_from_request(
        Some("url = http://x|id in [1|2|3]|created_at gt 2020-01-01T00:00:00Z"),
        Some("env notin [dev|test]|team = core"),
    )
    .unwrap();
    let statement = StatementCompiler::new("brokers", &schema)
        .list(&criteria)
        .unwrap();

    assert_eq!(placeholder_count(&statement.sql), statement.params.len());
    assert!(statement.sql.ends_with(
        "WHERE brokers.created_at > ? \
         AND broker_labels.key = ? AND broker_labels.val NOT IN (?, ?) \
         AND brokers.id IN (?, ?, ?) \
         AND broker_labels.key = ? AND broker_labels.val = ? \
         AND brokers.broker_url = ?;"
    ));
    assert_eq!(
        statement.params,
        vec![
            "2020-01-01T00:00:00Z",
            "env",
            "dev",
            "test",
            "1",
            "2",
            "3",
            "team",
            "core",
            "http://x",
        ]
    );
}

#[test]
fn test_label_predicates_share_one_joined_row() {
    let schema = broker_schema();
    let statement = StatementCompiler::new("brokers", &schema)
        .list(&set([
            Criterion::by_label(Operator::Equals, "env", ["dev"]),
            Criterion::by_label(Operator::Equals, "subaccount_id", ["acme"]),
        ]))
        .unwrap();
    assert_eq!(statement.sql.matches(" LEFT JOIN ").count(), 1);
    assert!(statement.sql.ends_with(
        "WHERE broker_labels.key = ? AND broker_labels.val = ? \
         AND broker_labels.key = ? AND broker_labels.val = ?;"
    ));
    assert_eq!(statement.params, vec!["env", "dev", "subaccount_id", "acme"]);
}

#[test]
fn test_result_criteria_do_not_reach_sql() {
    let schema = platform_schema();
    let statement = StatementCompiler::new("platforms", &schema)
        .list(&set([
            Criterion::order_result_by("name", OrderType::Asc),
            Criterion::limit_result_by(10),
        ]))
        .unwrap();
    assert_eq!(statement.sql, "SELECT * FROM platforms;");
}

#[test]
fn test_allow_list_enforced() {
    let schema = EntitySchema::with_fields(["id", "name"]);
    assert_error_kind(
        StatementCompiler::new("t", &schema)
            .list(&set([Criterion::by_field(Operator::Equals, "ghost", ["v"])])),
        QueryErrorKind::UnsupportedField,
    );
}

#[test]
fn test_storage_column_name_is_not_a_field() {
    let schema = broker_schema();
    assert_error_kind(
        StatementCompiler::new("brokers", &schema).list(&set([Criterion::by_field(
            Operator::Equals,
            "broker_url",
            ["x"],
        )])),
        QueryErrorKind::UnsupportedField,
    );
}

#[test]
fn test_label_query_needs_label_table() {
    let schema = platform_schema();
    assert_error_kind(
        StatementCompiler::new("platforms", &schema)
            .list(&set([Criterion::by_label(Operator::Equals, "env", ["dev"])])),
        QueryErrorKind::UnsupportedLabelQuery,
    );
}

#[test]
fn test_hostile_values_are_bound() {
    let schema = platform_schema();
    let criteria = criteria_from_request(Some("name = '; DELETE FROM platforms; --"), None).unwrap();
    let statement = StatementCompiler::new("platforms", &schema)
        .list(&criteria)
        .unwrap();
    assert_eq!(
        statement.sql,
        "SELECT * FROM platforms WHERE platforms.name = ?;"
    );
    assert_eq!(statement.params, vec!["'; DELETE FROM platforms; --"]);
}

// ============================================================================
// Deletion
// ============================================================================

#[test]
fn test_delete_with_labels_rejected() {
    let schema = visibility_schema();
    assert_error_kind(
        StatementCompiler::new("visibilities", &schema).delete(&set([
            Criterion::by_field(Operator::Equals, "id", ["1"]),
            Criterion::by_label(Operator::Equals, "env", ["dev"]),
        ])),
        QueryErrorKind::UnsupportedLabelDelete,
    );
}

#[test]
fn test_delete_never_joins() {
    let schema = visibility_schema();
    let statement = StatementCompiler::new("visibilities", &schema)
        .delete(&set([Criterion::by_field(
            Operator::EqualsOrNil,
            "platform_id",
            ["p1"],
        )]))
        .unwrap();
    assert_eq!(
        statement.sql,
        "DELETE FROM visibilities WHERE (visibilities.platform_id = ? OR visibilities.platform_id IS NULL);"
    );
}

#[test]
fn test_delete_everything() {
    let schema = platform_schema();
    let statement = StatementCompiler::new("platforms", &schema)
        .delete(&CriteriaSet::new())
        .unwrap();
    assert_eq!(statement.sql, "DELETE FROM platforms;");
}

// ============================================================================
// Placeholder rebinding
// ============================================================================

#[test]
fn test_rebind_label_statement() {
    let schema = broker_schema();
    let statement = StatementCompiler::new("brokers", &schema)
        .list(&set([
            Criterion::by_label(Operator::In, "env", ["dev", "prod"]),
            Criterion::by_field(Operator::Equals, "name", ["b"]),
        ]))
        .unwrap();

    let dollar = statement.clone().rebind(PlaceholderStyle::Dollar);
    assert!(dollar.sql.ends_with(
        "WHERE broker_labels.key = $1 AND broker_labels.val IN ($2, $3) AND brokers.name = $4;"
    ));
    assert!(dollar.sql.contains("AS \"broker_labels.key\""));

    let numbered = statement.rebind(PlaceholderStyle::Numbered);
    assert!(numbered.sql.ends_with(
        "WHERE broker_labels.key = ?1 AND broker_labels.val IN (?2, ?3) AND brokers.name = ?4;"
    ));
    assert_eq!(numbered.params, vec!["env", "dev", "prod", "b"]);
}
