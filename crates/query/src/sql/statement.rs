//! Statement text with positional parameters.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Positional placeholder emitted by the compiler.
pub const PLACEHOLDER: char = '?';

/// A fragment of SQL with bound parameters, kept in lock-step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlFragment {
    /// The SQL clause.
    pub sql: String,
    /// Bound parameter values, in placeholder order.
    pub params: Vec<String>,
}

impl SqlFragment {
    /// Creates a fragment without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Creates a fragment with parameters.
    pub fn with_params(sql: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Binds a parameter and returns its placeholder.
    pub fn bind(&mut self, value: impl Into<String>) -> char {
        self.params.push(value.into());
        PLACEHOLDER
    }

    /// Combines with another fragment using AND, without added parentheses.
    pub fn and(mut self, other: SqlFragment) -> Self {
        if !self.sql.is_empty() && !other.sql.is_empty() {
            self.sql = format!("{} AND {}", self.sql, other.sql);
        } else if !other.sql.is_empty() {
            self.sql = other.sql;
        }
        self.params.extend(other.params);
        self
    }

    /// Returns true if this fragment is empty.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Placeholder conventions of storage drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderStyle {
    /// `?` for every parameter (MySQL, the compiler's own output).
    #[default]
    Question,
    /// `$1`, `$2`, ... (PostgreSQL).
    Dollar,
    /// `?1`, `?2`, ... (SQLite numbered parameters).
    Numbered,
}

impl fmt::Display for PlaceholderStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceholderStyle::Question => write!(f, "question"),
            PlaceholderStyle::Dollar => write!(f, "dollar"),
            PlaceholderStyle::Numbered => write!(f, "numbered"),
        }
    }
}

/// A complete statement ready for a storage driver.
///
/// Operand values never appear in `sql`; they are carried in `params`, one
/// per placeholder, in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    /// The statement text, terminated by `;`.
    pub sql: String,
    /// Positional parameter values.
    pub params: Vec<String>,
}

impl Statement {
    /// Rewrites the `?` placeholders into the driver's convention.
    ///
    /// Question marks inside double-quoted identifiers are left alone.
    ///
    /// # Examples
    ///
    /// ```
    /// use registry_query::sql::{PlaceholderStyle, Statement};
    ///
    /// let statement = Statement {
    ///     sql: "SELECT * FROM t WHERE t.a = ? AND t.b = ?;".to_string(),
    ///     params: vec!["1".to_string(), "2".to_string()],
    /// };
    /// let rebound = statement.rebind(PlaceholderStyle::Dollar);
    /// assert_eq!(rebound.sql, "SELECT * FROM t WHERE t.a = $1 AND t.b = $2;");
    /// ```
    pub fn rebind(self, style: PlaceholderStyle) -> Self {
        if style == PlaceholderStyle::Question {
            return self;
        }

        let mut sql = String::with_capacity(self.sql.len() + self.params.len() * 2);
        let mut index = 0usize;
        let mut quoted = false;
        for c in self.sql.chars() {
            match c {
                '"' => {
                    quoted = !quoted;
                    sql.push(c);
                }
                PLACEHOLDER if !quoted => {
                    index += 1;
                    let prefix = match style {
                        PlaceholderStyle::Dollar => '$',
                        _ => PLACEHOLDER,
                    };
                    sql.push(prefix);
                    sql.push_str(&index.to_string());
                }
                _ => sql.push(c),
            }
        }

        Self {
            sql,
            params: self.params,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}
