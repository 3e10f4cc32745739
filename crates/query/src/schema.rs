//! Entity schema descriptors.
//!
//! Each entity type registers an [`EntitySchema`] at startup: the allow-list
//! of queryable fields with their storage columns, and, for labelable
//! entities, a [`LabelLink`] describing the attached label table. Schemas
//! are immutable and shared read-only across requests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Describes the label table attached to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelLink {
    /// Name of the label table.
    pub label_table: String,
    /// Column of the label table referencing the entity.
    pub foreign_key_column: String,
    /// Column of the entity table the foreign key references.
    pub primary_key_column: String,
    /// Label table columns projected into listing results.
    pub columns: Vec<String>,
}

impl LabelLink {
    /// Creates a link with the conventional label table layout.
    ///
    /// The projected columns are `id, key, val, created_at, updated_at` and
    /// the foreign key column; the entity's primary key is `id`.
    ///
    /// # Examples
    ///
    /// ```
    /// use registry_query::schema::LabelLink;
    ///
    /// let link = LabelLink::new("broker_labels", "broker_id");
    /// assert_eq!(link.primary_key_column, "id");
    /// assert_eq!(link.columns.last().map(String::as_str), Some("broker_id"));
    /// ```
    pub fn new(label_table: impl Into<String>, foreign_key_column: impl Into<String>) -> Self {
        let foreign_key_column = foreign_key_column.into();
        let columns = ["id", "key", "val", "created_at", "updated_at"]
            .into_iter()
            .map(String::from)
            .chain(std::iter::once(foreign_key_column.clone()))
            .collect();
        Self {
            label_table: label_table.into(),
            foreign_key_column,
            primary_key_column: "id".to_string(),
            columns,
        }
    }

    /// Sets the entity column referenced by the label table.
    pub fn with_primary_key_column(mut self, column: impl Into<String>) -> Self {
        self.primary_key_column = column.into();
        self
    }

    /// Replaces the projected label columns.
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

/// Static description of a queryable entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    /// Logical field name to storage column name.
    pub columns: BTreeMap<String, String>,
    /// The attached label table, if the entity supports labels.
    pub label_link: Option<LabelLink>,
}

impl EntitySchema {
    /// Creates a schema whose fields map onto identically named columns.
    ///
    /// # Examples
    ///
    /// ```
    /// use registry_query::schema::{EntitySchema, LabelLink};
    ///
    /// let schema = EntitySchema::with_fields(["id", "name", "broker_url"])
    ///     .with_label_link(LabelLink::new("broker_labels", "broker_id"));
    ///
    /// assert_eq!(schema.column("name"), Some("name"));
    /// assert_eq!(schema.column("ghost"), None);
    /// assert!(schema.supports_labels());
    /// ```
    pub fn with_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: fields
                .into_iter()
                .map(|field| {
                    let field = field.into();
                    (field.clone(), field)
                })
                .collect(),
            label_link: None,
        }
    }

    /// Adds a field stored under a differently named column.
    pub fn with_column(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        self.columns.insert(field.into(), column.into());
        self
    }

    /// Attaches a label table.
    pub fn with_label_link(mut self, link: LabelLink) -> Self {
        self.label_link = Some(link);
        self
    }

    /// Returns the storage column for a field, if the field may be queried.
    pub fn column(&self, field: &str) -> Option<&str> {
        self.columns.get(field).map(String::as_str)
    }

    /// Returns `true` if the entity has an attached label table.
    pub fn supports_labels(&self) -> bool {
        self.label_link.is_some()
    }
}
