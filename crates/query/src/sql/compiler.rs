//! Compiles criteria sets into listing and deletion statements.
//!
//! Listing statements select from the entity table, left-joining the label
//! table when the schema declares one:
//!
//! ```text
//! SELECT * FROM brokers WHERE brokers.name = ?;
//! SELECT brokers.*, broker_labels.key AS "broker_labels.key", ...
//!     FROM brokers LEFT JOIN broker_labels ON brokers.id = broker_labels.broker_id
//!     WHERE broker_labels.key = ? AND broker_labels.val = ?;
//! ```
//!
//! Predicates follow the set's canonical order and are joined with `AND`.
//! Result criteria (ordering, limit) are not compiled here.

use tracing::debug;

use super::statement::{SqlFragment, Statement};
use crate::criteria::{CriteriaSet, Criterion, CriterionType, Operator};
use crate::error::{QueryError, QueryResult};
use crate::schema::{EntitySchema, LabelLink};

/// Label table column holding the label key.
const LABEL_KEY_COLUMN: &str = "key";

/// Label table column holding the label value.
const LABEL_VALUE_COLUMN: &str = "val";

/// Compiles statements against one entity table.
///
/// Every label predicate tests the same joined label row. Two label
/// criteria with different keys therefore never match together; such
/// combinations only make sense when the caller resolves one of them
/// separately, for example by listing primary keys first.
///
/// # Examples
///
/// ```
/// use registry_query::criteria::{CriteriaSet, Criterion, Operator};
/// use registry_query::schema::EntitySchema;
/// use registry_query::sql::StatementCompiler;
///
/// let schema = EntitySchema::with_fields(["id", "platform_id"]);
/// let criteria = CriteriaSet::from_criteria([Criterion::by_field(
///     Operator::EqualsOrNil,
///     "platform_id",
///     ["value"],
/// )])
/// .unwrap();
///
/// let statement = StatementCompiler::new("t", &schema).list(&criteria).unwrap();
/// assert_eq!(
///     statement.sql,
///     "SELECT * FROM t WHERE (t.platform_id = ? OR t.platform_id IS NULL);"
/// );
/// assert_eq!(statement.params, vec!["value"]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct StatementCompiler<'a> {
    table: &'a str,
    schema: &'a EntitySchema,
}

impl<'a> StatementCompiler<'a> {
    /// Creates a compiler for the given primary table and schema.
    pub fn new(table: &'a str, schema: &'a EntitySchema) -> Self {
        Self { table, schema }
    }

    /// Compiles a listing statement.
    ///
    /// The label table is joined whenever the schema declares one, so that
    /// label columns are available for collating labels onto entities.
    pub fn list(&self, criteria: &CriteriaSet) -> QueryResult<Statement> {
        self.check_field_criteria(criteria)?;
        if self.schema.label_link.is_none()
            && let Some(label) = criteria.label_criteria().next()
        {
            return Err(QueryError::UnsupportedLabelQuery {
                table: self.table.to_string(),
                key: label.left_op.clone(),
            });
        }

        let base = match &self.schema.label_link {
            Some(link) => self.select_with_labels(link),
            None => format!("SELECT * FROM {}", self.table),
        };
        let statement = self.finish(base, self.predicates(criteria)?);

        debug!(
            table = %self.table,
            sql = %statement.sql,
            params = statement.params.len(),
            "Compiled list statement"
        );
        Ok(statement)
    }

    /// Compiles a deletion statement.
    ///
    /// Only field criteria are accepted. To delete by label, list the
    /// matching entities first and delete them by primary key.
    pub fn delete(&self, criteria: &CriteriaSet) -> QueryResult<Statement> {
        if criteria.has_label_criteria() {
            return Err(QueryError::UnsupportedLabelDelete {
                table: self.table.to_string(),
            });
        }
        self.check_field_criteria(criteria)?;

        let base = format!("DELETE FROM {}", self.table);
        let statement = self.finish(base, self.predicates(criteria)?);

        debug!(
            table = %self.table,
            sql = %statement.sql,
            params = statement.params.len(),
            "Compiled delete statement"
        );
        Ok(statement)
    }

    /// Checks every field criterion against the schema's allow-list.
    fn check_field_criteria(&self, criteria: &CriteriaSet) -> QueryResult<()> {
        match criteria
            .field_criteria()
            .find(|c| self.schema.column(&c.left_op).is_none())
        {
            Some(criterion) => Err(QueryError::UnsupportedField {
                field: criterion.left_op.clone(),
            }),
            None => Ok(()),
        }
    }

    fn select_with_labels(&self, link: &LabelLink) -> String {
        let mut projection = vec![format!("{}.*", self.table)];
        projection.extend(link.columns.iter().map(|column| {
            format!(
                "{table}.{column} AS \"{table}.{column}\"",
                table = link.label_table
            )
        }));
        format!(
            "SELECT {} FROM {} LEFT JOIN {} ON {}.{} = {}.{}",
            projection.join(", "),
            self.table,
            link.label_table,
            self.table,
            link.primary_key_column,
            link.label_table,
            link.foreign_key_column
        )
    }

    fn finish(&self, base: String, predicates: SqlFragment) -> Statement {
        let sql = if predicates.is_empty() {
            format!("{};", base)
        } else {
            format!("{} WHERE {};", base, predicates.sql)
        };
        Statement {
            sql,
            params: predicates.params,
        }
    }

    /// Builds the WHERE predicates in the set's canonical order.
    fn predicates(&self, criteria: &CriteriaSet) -> QueryResult<SqlFragment> {
        let mut combined = SqlFragment::default();
        for criterion in criteria {
            let predicate = match criterion.criterion_type {
                CriterionType::Field => self.field_predicate(criterion)?,
                CriterionType::Label => self.label_predicate(criterion)?,
                CriterionType::Result => continue,
            };
            combined = combined.and(predicate);
        }
        Ok(combined)
    }

    fn field_predicate(&self, criterion: &Criterion) -> QueryResult<SqlFragment> {
        let column = self
            .schema
            .column(&criterion.left_op)
            .ok_or_else(|| QueryError::UnsupportedField {
                field: criterion.left_op.clone(),
            })?;
        let qualified = format!("{}.{}", self.table, column);

        let mut fragment = SqlFragment::default();
        let sql = match criterion.operator {
            Operator::EqualsOrNil => {
                let placeholder = fragment.bind(single_operand(criterion)?);
                format!("({qualified} = {placeholder} OR {qualified} IS NULL)")
            }
            op => comparison(&mut fragment, &qualified, op, criterion)?,
        };
        fragment.sql = sql;
        Ok(fragment)
    }

    fn label_predicate(&self, criterion: &Criterion) -> QueryResult<SqlFragment> {
        let link = self
            .schema
            .label_link
            .as_ref()
            .ok_or_else(|| QueryError::UnsupportedLabelQuery {
                table: self.table.to_string(),
                key: criterion.left_op.clone(),
            })?;
        if criterion.operator.is_nullable() {
            return Err(QueryError::unsupported_operator(
                "nullable operations are supported only for field queries",
            ));
        }

        let mut fragment = SqlFragment::default();
        let key_placeholder = fragment.bind(criterion.left_op.as_str());
        let value_column = format!("{}.{}", link.label_table, LABEL_VALUE_COLUMN);
        let value_predicate =
            comparison(&mut fragment, &value_column, criterion.operator, criterion)?;
        fragment.sql = format!(
            "{}.{} = {} AND {}",
            link.label_table, LABEL_KEY_COLUMN, key_placeholder, value_predicate
        );
        Ok(fragment)
    }
}

/// Renders `<column> <op> ?`, or `<column> [NOT] IN (?, ...)` for lists,
/// binding the operands into `fragment`.
fn comparison(
    fragment: &mut SqlFragment,
    column: &str,
    operator: Operator,
    criterion: &Criterion,
) -> QueryResult<String> {
    let sql_op = operator.to_sql_op().ok_or_else(|| {
        QueryError::unsupported_operator(format!(
            "{} with key \"{}\" has no comparison operator",
            criterion.criterion_type, criterion.left_op
        ))
    })?;

    if operator.is_multivariate() {
        if criterion.right_op.is_empty() {
            return Err(QueryError::unsupported_operator(format!(
                "operation {} for {} with key \"{}\" has no right operand",
                operator, criterion.criterion_type, criterion.left_op
            )));
        }
        let placeholders: Vec<String> = criterion
            .right_op
            .iter()
            .map(|value| fragment.bind(value.as_str()).to_string())
            .collect();
        Ok(format!("{} {} ({})", column, sql_op, placeholders.join(", ")))
    } else {
        let placeholder = fragment.bind(single_operand(criterion)?);
        Ok(format!("{} {} {}", column, sql_op, placeholder))
    }
}

fn single_operand(criterion: &Criterion) -> QueryResult<&str> {
    match criterion.right_op.as_slice() {
        [value] => Ok(value.as_str()),
        other => Err(QueryError::unsupported_operator(format!(
            "single value operation {} for {} with key \"{}\" received {} values",
            criterion.operator,
            criterion.criterion_type,
            criterion.left_op,
            other.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryErrorKind;

    const TABLE: &str = "table_name";
    const LABELS: &str = "labels_table_name";

    fn labelled_schema() -> EntitySchema {
        EntitySchema::with_fields(["id", "platform_id", "name"])
            .with_label_link(LabelLink::new(LABELS, "visibility_id"))
    }

    fn set(criteria: impl IntoIterator<Item = Criterion>) -> CriteriaSet {
        CriteriaSet::from_criteria(criteria).unwrap()
    }

    #[test]
    fn test_list_without_criteria() {
        let schema = EntitySchema::with_fields(["id"]);
        let statement = StatementCompiler::new(TABLE, &schema)
            .list(&CriteriaSet::new())
            .unwrap();
        assert_eq!(statement.sql, "SELECT * FROM table_name;");
        assert!(statement.params.is_empty());
    }

    #[test]
    fn test_list_with_field_criterion() {
        let schema = EntitySchema::with_fields(["platform_id"]);
        let statement = StatementCompiler::new(TABLE, &schema)
            .list(&set([Criterion::by_field(
                Operator::Equals,
                "platform_id",
                ["value"],
            )]))
            .unwrap();
        assert_eq!(
            statement.sql,
            "SELECT * FROM table_name WHERE table_name.platform_id = ?;"
        );
        assert_eq!(statement.params, vec!["value"]);
    }

    #[test]
    fn test_list_with_label_join_projects_label_columns() {
        let schema = labelled_schema();
        let statement = StatementCompiler::new(TABLE, &schema)
            .list(&set([Criterion::by_field(
                Operator::EqualsOrNil,
                "platform_id",
                ["value"],
            )]))
            .unwrap();
        let expected = format!(
            "SELECT {t}.*, {l}.id AS \"{l}.id\", {l}.key AS \"{l}.key\", {l}.val AS \"{l}.val\", \
             {l}.created_at AS \"{l}.created_at\", {l}.updated_at AS \"{l}.updated_at\", \
             {l}.visibility_id AS \"{l}.visibility_id\" \
             FROM {t} LEFT JOIN {l} ON {t}.id = {l}.visibility_id \
             WHERE ({t}.platform_id = ? OR {t}.platform_id IS NULL);",
            t = TABLE,
            l = LABELS
        );
        assert_eq!(statement.sql, expected);
        assert_eq!(statement.params, vec!["value"]);
    }

    #[test]
    fn test_field_and_label_predicates_follow_canonical_order() {
        let schema = labelled_schema();
        let statement = StatementCompiler::new(TABLE, &schema)
            .list(&set([
                Criterion::by_field(Operator::Equals, "platform_id", ["value"]),
                Criterion::by_label(Operator::Equals, "label_key", ["labelValue"]),
            ]))
            .unwrap();
        assert!(statement.sql.ends_with(
            "WHERE labels_table_name.key = ? AND labels_table_name.val = ? AND table_name.platform_id = ?;"
        ));
        assert_eq!(statement.params, vec!["label_key", "labelValue", "value"]);
    }

    #[test]
    fn test_multivariate_predicates() {
        let schema = labelled_schema();
        let statement = StatementCompiler::new(TABLE, &schema)
            .list(&set([
                Criterion::by_field(Operator::NotIn, "id", ["1", "2", "3"]),
                Criterion::by_label(Operator::In, "env", ["dev", "test"]),
            ]))
            .unwrap();
        assert!(statement.sql.ends_with(
            "WHERE labels_table_name.key = ? AND labels_table_name.val IN (?, ?) AND table_name.id NOT IN (?, ?, ?);"
        ));
        assert_eq!(statement.params, vec!["env", "dev", "test", "1", "2", "3"]);
    }

    #[test]
    fn test_renamed_column_is_used() {
        let schema = EntitySchema::default().with_column("url", "broker_url");
        let statement = StatementCompiler::new("brokers", &schema)
            .list(&set([Criterion::by_field(Operator::NotEquals, "url", ["x"])]))
            .unwrap();
        assert_eq!(
            statement.sql,
            "SELECT * FROM brokers WHERE brokers.broker_url != ?;"
        );
    }

    #[test]
    fn test_result_criteria_are_ignored() {
        let schema = EntitySchema::with_fields(["name"]);
        let statement = StatementCompiler::new(TABLE, &schema)
            .list(&set([
                Criterion::limit_result_by(5),
                Criterion::by_field(Operator::GreaterThan, "name", ["3"]),
            ]))
            .unwrap();
        assert_eq!(
            statement.sql,
            "SELECT * FROM table_name WHERE table_name.name > ?;"
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let schema = EntitySchema::with_fields(["id", "name"]);
        let err = StatementCompiler::new(TABLE, &schema)
            .list(&set([Criterion::by_field(Operator::Equals, "ghost", ["v"])]))
            .unwrap_err();
        assert_eq!(err.kind(), QueryErrorKind::UnsupportedField);
    }

    #[test]
    fn test_label_query_without_label_table() {
        let schema = EntitySchema::with_fields(["id"]);
        let err = StatementCompiler::new(TABLE, &schema)
            .list(&set([Criterion::by_label(Operator::Equals, "env", ["dev"])]))
            .unwrap_err();
        assert_eq!(err.kind(), QueryErrorKind::UnsupportedLabelQuery);
    }

    #[test]
    fn test_delete_without_criteria() {
        let schema = EntitySchema::with_fields(["id"]);
        let statement = StatementCompiler::new(TABLE, &schema)
            .delete(&CriteriaSet::new())
            .unwrap();
        assert_eq!(statement.sql, "DELETE FROM table_name;");
    }

    #[test]
    fn test_delete_with_field_criteria() {
        let schema = labelled_schema();
        let statement = StatementCompiler::new(TABLE, &schema)
            .delete(&set([Criterion::by_field(
                Operator::NotEquals,
                "id",
                ["platform-1"],
            )]))
            .unwrap();
        assert_eq!(
            statement.sql,
            "DELETE FROM table_name WHERE table_name.id != ?;"
        );
        assert_eq!(statement.params, vec!["platform-1"]);
    }

    #[test]
    fn test_delete_by_label_rejected() {
        let schema = labelled_schema();
        let err = StatementCompiler::new(TABLE, &schema)
            .delete(&set([Criterion::by_label(Operator::Equals, "left", ["right"])]))
            .unwrap_err();
        assert_eq!(err.kind(), QueryErrorKind::UnsupportedLabelDelete);
    }

    #[test]
    fn test_delete_unknown_field_rejected() {
        let schema = EntitySchema::with_fields(["id"]);
        let err = StatementCompiler::new(TABLE, &schema)
            .delete(&set([Criterion::by_field(
                Operator::Equals,
                "non-existing-field",
                ["value"],
            )]))
            .unwrap_err();
        assert_eq!(err.kind(), QueryErrorKind::UnsupportedField);
    }

    #[test]
    fn test_values_are_never_inlined() {
        let schema = EntitySchema::with_fields(["name"]);
        let hostile = "x'; DROP TABLE table_name; --";
        let statement = StatementCompiler::new(TABLE, &schema)
            .list(&set([Criterion::by_field(Operator::Equals, "name", [hostile])]))
            .unwrap();
        assert!(!statement.sql.contains("DROP"));
        assert_eq!(statement.params, vec![hostile]);
    }
}
