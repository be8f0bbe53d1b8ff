//! SQLite-backed table storage, the "live" production mode.
//!
//! The table set is not known at compile time, so SQL is built at runtime
//! from pre-validated identifiers with all values bound as parameters.

use async_trait::async_trait;
use db::models::builtin_schema;
use db::models::ops::TableOp;
use db::models::table::{CellValue, Column, ColumnType, Row, Table};
use db::models::table_ref::{TableRef, is_valid_identifier};
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as _, Row as _, TypeInfo as _, ValueRef as _};
use tracing::debug;

use super::{StorageError, TableStore};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new().connect(url).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_schema(&self, physical: &str) -> Result<Vec<Column>, StorageError> {
        let sql = format!("PRAGMA table_info(\"{physical}\")");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        if rows.is_empty() {
            return Err(StorageError::TableNotFound(physical.to_string()));
        }
        let mut schema = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("name")?;
            let declared: String = row.try_get("type")?;
            schema.push(Column::new(&name, &name, map_declared_type(&declared)));
        }
        Ok(schema)
    }

    /// Create an application-owned table on first write; user tables are
    /// provisioned by migrations and are never created implicitly.
    async fn bootstrap_if_builtin(
        &self,
        table: &TableRef,
        physical: &str,
    ) -> Result<(), StorageError> {
        let Some(schema) = builtin_schema(table.logical_name()) else {
            return Ok(());
        };
        let columns: Vec<String> = schema
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let sql_type = match c.column_type {
                    ColumnType::Text => "TEXT",
                    ColumnType::Number => "REAL",
                    ColumnType::Boolean => "BOOLEAN",
                };
                if i == 0 {
                    format!("\"{}\" {} PRIMARY KEY", c.id, sql_type)
                } else {
                    format!("\"{}\" {}", c.id, sql_type)
                }
            })
            .collect();
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS \"{physical}\" ({})",
            columns.join(", ")
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl TableStore for SqliteStore {
    async fn load_table(&self, table: &TableRef) -> Result<Table, StorageError> {
        table.validate()?;
        let physical = table.physical_name();
        let schema = self.load_schema(&physical).await?;

        let sql = format!("SELECT * FROM \"{physical}\"");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let mut data = Vec::with_capacity(rows.len());
        for row in &rows {
            data.push(decode_row(row, &schema)?);
        }
        debug!(table = %table, rows = data.len(), "loaded sqlite table");
        Ok(Table { schema, data })
    }

    async fn table_exists(&self, table: &TableRef) -> Result<bool, StorageError> {
        table.validate()?;
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table.physical_name())
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn apply_ops(&self, table: &TableRef, ops: &[TableOp]) -> Result<u64, StorageError> {
        table.validate()?;
        let physical = table.physical_name();

        if !self.table_exists(table).await? {
            self.bootstrap_if_builtin(table, &physical).await?;
        }

        let mut tx = self.pool.begin().await?;
        let mut affected = 0u64;
        for op in ops {
            match op {
                TableOp::Insert { row } => {
                    let (columns, values) = split_columns(row)?;
                    let placeholders = vec!["?"; columns.len()].join(", ");
                    let sql = format!(
                        "INSERT INTO \"{physical}\" ({}) VALUES ({placeholders})",
                        quote_idents(&columns)
                    );
                    let mut query = sqlx::query(&sql);
                    for value in &values {
                        query = bind_cell(query, value);
                    }
                    affected += query.execute(&mut *tx).await?.rows_affected();
                }
                TableOp::Update { set, where_ } => {
                    let (set_columns, set_values) = split_columns(set)?;
                    let (where_columns, where_values) = split_columns(where_)?;
                    let assignments: Vec<String> = set_columns
                        .iter()
                        .map(|c| format!("\"{c}\" = ?"))
                        .collect();
                    let sql = format!(
                        "UPDATE \"{physical}\" SET {} WHERE {}",
                        assignments.join(", "),
                        where_clause(&where_columns)
                    );
                    let mut query = sqlx::query(&sql);
                    for value in set_values.iter().chain(where_values.iter()) {
                        query = bind_cell(query, value);
                    }
                    affected += query.execute(&mut *tx).await?.rows_affected();
                }
                TableOp::Delete { where_ } => {
                    let (where_columns, where_values) = split_columns(where_)?;
                    let sql = format!(
                        "DELETE FROM \"{physical}\" WHERE {}",
                        where_clause(&where_columns)
                    );
                    let mut query = sqlx::query(&sql);
                    for value in &where_values {
                        query = bind_cell(query, value);
                    }
                    affected += query.execute(&mut *tx).await?.rows_affected();
                }
            }
        }
        tx.commit().await?;
        debug!(table = %table, ops = ops.len(), affected, "sqlite ops committed");
        Ok(affected)
    }
}

fn map_declared_type(declared: &str) -> ColumnType {
    let upper = declared.to_ascii_uppercase();
    if upper.contains("BOOL") {
        ColumnType::Boolean
    } else if upper.contains("INT")
        || upper.contains("REAL")
        || upper.contains("FLOA")
        || upper.contains("DOUB")
        || upper.contains("NUM")
        || upper.contains("DEC")
    {
        ColumnType::Number
    } else {
        ColumnType::Text
    }
}

fn decode_row(row: &SqliteRow, schema: &[Column]) -> Result<Row, StorageError> {
    let mut out = Row::with_capacity(schema.len());
    for (i, sqlite_column) in row.columns().iter().enumerate() {
        let declared = schema
            .iter()
            .find(|c| c.id == sqlite_column.name())
            .map(|c| c.column_type)
            .unwrap_or(ColumnType::Text);
        let raw = row.try_get_raw(i)?;
        let value = if raw.is_null() {
            CellValue::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" => {
                    let n: i64 = row.try_get(i)?;
                    if declared == ColumnType::Boolean {
                        CellValue::Bool(n != 0)
                    } else {
                        CellValue::Number(n as f64)
                    }
                }
                "REAL" => CellValue::Number(row.try_get::<f64, _>(i)?),
                "BOOLEAN" => CellValue::Bool(row.try_get::<bool, _>(i)?),
                "BLOB" => CellValue::Null,
                _ => CellValue::text(row.try_get::<String, _>(i)?),
            }
        };
        out.insert(sqlite_column.name().to_string(), value);
    }
    Ok(out)
}

/// Split a row map into parallel column/value lists, validating every
/// identifier before it is interpolated.
fn split_columns(row: &Row) -> Result<(Vec<String>, Vec<CellValue>), StorageError> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for (column, value) in row {
        if !is_valid_identifier(column) {
            return Err(StorageError::InvalidIdentifier(column.clone()));
        }
        columns.push(column.clone());
        values.push(value.clone());
    }
    Ok((columns, values))
}

fn quote_idents(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `IS ?` gives null-safe equality in SQLite.
fn where_clause(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| format!("\"{c}\" IS ?"))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn bind_cell<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>,
    value: &'q CellValue,
) -> sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>> {
    match value {
        CellValue::Text(s) => query.bind(s.as_str()),
        CellValue::Number(n) => query.bind(*n),
        CellValue::Bool(b) => query.bind(*b),
        CellValue::Null => query.bind(Option::<String>::None),
    }
}
