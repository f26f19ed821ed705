//! Relational reference schema model
//!
//! The reference schema is the source of truth that remote entities are
//! reconciled against. It is built once (usually by [`crate::ddl`]) and is
//! read-only afterwards.

use serde::{Deserialize, Serialize};

/// A parsed reference schema: an ordered list of tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SqlSchema {
    pub tables: Vec<SqlTable>,
}

impl SqlSchema {
    pub fn new(tables: Vec<SqlTable>) -> Self {
        Self { tables }
    }

    /// Look up a table by name (case-insensitive)
    pub fn table(&self, name: &str) -> Option<&SqlTable> {
        self.tables
            .iter()
            .find(|table| table.name.eq_ignore_ascii_case(name))
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|table| table.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// A reference table with its columns and constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlTable {
    pub name: String,
    pub columns: Vec<SqlColumn>,
    pub primary_key: Option<SqlPrimaryKey>,
    pub unique_keys: Vec<SqlUniqueKey>,
    pub foreign_keys: Vec<SqlForeignKey>,
}

impl SqlTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
            unique_keys: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: SqlColumn) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_primary_key(mut self, primary_key: SqlPrimaryKey) -> Self {
        self.primary_key = Some(primary_key);
        self
    }

    pub fn with_unique_key(mut self, unique_key: SqlUniqueKey) -> Self {
        self.unique_keys.push(unique_key);
        self
    }

    pub fn with_foreign_key(mut self, foreign_key: SqlForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Look up a column by name (case-insensitive)
    pub fn column(&self, name: &str) -> Option<&SqlColumn> {
        self.columns
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

/// A reference column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlColumn {
    pub name: String,
    /// Raw type string as written in the DDL, e.g. `varchar(100)`
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub is_auto_increment: bool,
}

impl SqlColumn {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            default_value: None,
            is_auto_increment: false,
        }
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.is_auto_increment = true;
        self
    }
}

/// The single optional primary key of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlPrimaryKey {
    pub name: Option<String>,
    pub columns: Vec<String>,
}

impl SqlPrimaryKey {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            name: None,
            columns,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The sole column when the key is single-column
    pub fn single_column(&self) -> Option<&str> {
        match self.columns.as_slice() {
            [column] => Some(column.as_str()),
            _ => None,
        }
    }
}

/// A named unique key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlUniqueKey {
    pub name: String,
    pub columns: Vec<String>,
}

impl SqlUniqueKey {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }
}

/// A named foreign key: local columns referencing another table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

impl SqlForeignKey {
    pub fn new(
        name: impl Into<String>,
        columns: Vec<String>,
        referenced_table: impl Into<String>,
        referenced_columns: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            columns,
            referenced_table: referenced_table.into(),
            referenced_columns,
            on_delete: None,
            on_update: None,
        }
    }

    /// The sole local column when the key is single-column
    pub fn single_column(&self) -> Option<&str> {
        match self.columns.as_slice() {
            [column] => Some(column.as_str()),
            _ => None,
        }
    }
}
