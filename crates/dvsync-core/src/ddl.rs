//! Loader for `CREATE TABLE` scripts
//!
//! Parses MySQL-flavoured DDL with `sqlparser` and keeps only what schema
//! alignment needs: columns, primary key, unique keys and foreign keys.
//! Statements other than `CREATE TABLE` are ignored.

use crate::{
    Result, SqlColumn, SqlForeignKey, SqlPrimaryKey, SqlSchema, SqlTable, SqlUniqueKey, SyncError,
};
use sqlparser::ast::{ColumnDef, ColumnOption, Ident, ObjectName, Statement, TableConstraint};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use std::path::Path;

/// Parse a DDL script into a reference schema
///
/// Returns an error when the script does not parse or declares no tables.
pub fn parse_schema(sql: &str) -> Result<SqlSchema> {
    let statements = Parser::parse_sql(&MySqlDialect {}, sql)
        .map_err(|e| SyncError::Ddl(e.to_string()))?;

    let tables: Vec<SqlTable> = statements
        .iter()
        .filter_map(|statement| match statement {
            Statement::CreateTable(create) => {
                Some(table_from_parts(&create.name, &create.columns, &create.constraints))
            }
            _ => None,
        })
        .collect();

    if tables.is_empty() {
        return Err(SyncError::Ddl(
            "no CREATE TABLE statements found in script".to_string(),
        ));
    }

    tracing::debug!(tables = tables.len(), "parsed reference schema");
    Ok(SqlSchema::new(tables))
}

/// Read and parse a DDL script from disk
pub fn load_schema(path: &Path) -> Result<SqlSchema> {
    let sql = std::fs::read_to_string(path)?;
    parse_schema(&sql).map_err(|e| match e {
        SyncError::Ddl(message) => SyncError::Ddl(format!("{}: {}", path.display(), message)),
        other => other,
    })
}

fn table_from_parts(
    name: &ObjectName,
    columns: &[ColumnDef],
    constraints: &[TableConstraint],
) -> SqlTable {
    let table_name = object_name(name);
    let mut table = SqlTable::new(&table_name);

    for column in columns {
        let mut sql_column = SqlColumn::new(&column.name.value, column.data_type.to_string(), true);

        for option in &column.options {
            match &option.option {
                ColumnOption::NotNull => sql_column.nullable = false,
                ColumnOption::Null => sql_column.nullable = true,
                ColumnOption::Default(expr) => sql_column.default_value = Some(expr.to_string()),
                ColumnOption::Unique { is_primary, .. } => {
                    if *is_primary {
                        sql_column.nullable = false;
                        table.primary_key = Some(SqlPrimaryKey::new(vec![column.name.value.clone()]));
                    } else {
                        table.unique_keys.push(SqlUniqueKey::new(
                            format!("UQ_{}_{}", table_name, column.name.value),
                            vec![column.name.value.clone()],
                        ));
                    }
                }
                ColumnOption::ForeignKey {
                    foreign_table,
                    referred_columns,
                    on_delete,
                    on_update,
                    ..
                } => {
                    let mut foreign_key = SqlForeignKey::new(
                        format!("FK_{}_{}", table_name, column.name.value),
                        vec![column.name.value.clone()],
                        object_name(foreign_table),
                        ident_values(referred_columns),
                    );
                    foreign_key.on_delete = on_delete.as_ref().map(ToString::to_string);
                    foreign_key.on_update = on_update.as_ref().map(ToString::to_string);
                    table.foreign_keys.push(foreign_key);
                }
                ColumnOption::DialectSpecific(tokens) => {
                    if tokens
                        .iter()
                        .any(|token| token.to_string().eq_ignore_ascii_case("AUTO_INCREMENT"))
                    {
                        sql_column.is_auto_increment = true;
                    }
                }
                _ => {}
            }
        }

        table.columns.push(sql_column);
    }

    for constraint in constraints {
        match constraint {
            TableConstraint::PrimaryKey { name, columns, .. } => {
                let column_names = ident_values(columns);
                for column in &mut table.columns {
                    if column_names
                        .iter()
                        .any(|pk| pk.eq_ignore_ascii_case(&column.name))
                    {
                        column.nullable = false;
                    }
                }
                let mut primary_key = SqlPrimaryKey::new(column_names);
                primary_key.name = name.as_ref().map(|n| n.value.clone());
                table.primary_key = Some(primary_key);
            }
            TableConstraint::Unique {
                name,
                index_name,
                columns,
                ..
            } => {
                let column_names = ident_values(columns);
                let key_name = name
                    .as_ref()
                    .or(index_name.as_ref())
                    .map(|n| n.value.clone())
                    .unwrap_or_else(|| format!("UQ_{}_{}", table_name, column_names.join("_")));
                table
                    .unique_keys
                    .push(SqlUniqueKey::new(key_name, column_names));
            }
            TableConstraint::ForeignKey {
                name,
                columns,
                foreign_table,
                referred_columns,
                on_delete,
                on_update,
                ..
            } => {
                let column_names = ident_values(columns);
                let key_name = name
                    .as_ref()
                    .map(|n| n.value.clone())
                    .unwrap_or_else(|| format!("FK_{}_{}", table_name, column_names.join("_")));
                let mut foreign_key = SqlForeignKey::new(
                    key_name,
                    column_names,
                    object_name(foreign_table),
                    ident_values(referred_columns),
                );
                foreign_key.on_delete = on_delete.as_ref().map(ToString::to_string);
                foreign_key.on_update = on_update.as_ref().map(ToString::to_string);
                table.foreign_keys.push(foreign_key);
            }
            _ => {}
        }
    }

    table
}

/// Unqualified, unquoted object name
fn object_name(name: &ObjectName) -> String {
    name.0
        .last()
        .map(|ident| ident.value.clone())
        .unwrap_or_else(|| name.to_string())
}

fn ident_values(idents: &[Ident]) -> Vec<String> {
    idents.iter().map(|ident| ident.value.clone()).collect()
}

#[cfg(test)]
mod tests;
