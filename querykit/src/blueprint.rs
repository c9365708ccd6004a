//! Declarations of tables and prepared statements.

use serde::{Deserialize, Serialize};

/// A table to create when the registry is finalized.
///
/// Column fragments are raw SQL (`"id integer primary key"`) and are passed
/// through to the DDL verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableBlueprint {
    /// Table name.
    pub name: String,
    /// Emit `if not exists`, making creation idempotent.
    #[serde(default = "default_if_not_exists")]
    pub if_not_exists: bool,
    /// Column definition fragments, in order.
    pub columns: Vec<String>,
}

const fn default_if_not_exists() -> bool {
    true
}

impl TableBlueprint {
    /// Creates a table declaration.
    pub fn new<I, S>(name: impl Into<String>, if_not_exists: bool, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            if_not_exists,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds `create table [if not exists] name(col1,col2,...);`.
    ///
    /// An empty column list yields `name();`, which the engine rejects.
    #[must_use]
    pub fn create_sql(&self) -> String {
        let mut sql = String::from("create table ");
        if self.if_not_exists {
            sql.push_str("if not exists ");
        }
        sql.push_str(&self.name);
        sql.push('(');
        sql.push_str(&self.columns.join(","));
        sql.push_str(");");
        sql
    }
}

/// A named, parameterized statement compiled when a connection opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatementBlueprint {
    /// Name the statement is executed by.
    pub name: String,
    /// SQL text with `?` placeholders.
    pub sql: String,
    /// Report the generated row key after an insert.
    #[serde(default)]
    pub return_generated_key: bool,
}

impl StatementBlueprint {
    /// Creates a statement declaration.
    pub fn new(
        name: impl Into<String>,
        sql: impl Into<String>,
        return_generated_key: bool,
    ) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            return_generated_key,
        }
    }
}
