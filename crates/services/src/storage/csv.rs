//! CSV-backed table storage: one `{physical_name}.csv` per table under a
//! data directory. The header row is the schema; column types are inferred
//! from the values.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use csv_async::{AsyncReaderBuilder, AsyncWriterBuilder, StringRecord};
use db::models::builtin_schema;
use db::models::ops::{TableOp, apply_ops, validate_ops};
use db::models::table::{CellValue, Column, ColumnType, Row, Table};
use db::models::table_ref::TableRef;
use futures_util::StreamExt;
use tokio::fs::{self, File};
use tokio::sync::Mutex;
use tracing::debug;

use super::{StorageError, TableStore};

pub struct CsvStore {
    data_dir: PathBuf,
    writable: bool,
    // Serializes whole-file rewrites.
    write_lock: Mutex<()>,
}

impl CsvStore {
    pub fn new(data_dir: impl Into<PathBuf>, writable: bool) -> Self {
        Self {
            data_dir: data_dir.into(),
            writable,
            write_lock: Mutex::new(()),
        }
    }

    fn path_for(&self, table: &TableRef) -> Result<PathBuf, StorageError> {
        table.validate()?;
        Ok(self.data_dir.join(format!("{}.csv", table.physical_name())))
    }

    async fn read_table(path: &Path, physical: &str) -> Result<Table, StorageError> {
        let file = match File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::TableNotFound(physical.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut reader = AsyncReaderBuilder::new().flexible(true).create_reader(file);
        let headers = reader.headers().await?.clone();
        let mut raw_rows: Vec<StringRecord> = Vec::new();
        let mut records = reader.records();
        while let Some(record) = records.next().await {
            raw_rows.push(record?);
        }

        let schema: Vec<Column> = headers
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let values: Vec<&str> = raw_rows
                    .iter()
                    .filter_map(|r| r.get(i))
                    .filter(|v| !v.is_empty())
                    .collect();
                Column::new(id, id, infer_type(&values))
            })
            .collect();

        let data: Vec<Row> = raw_rows
            .iter()
            .map(|record| {
                schema
                    .iter()
                    .enumerate()
                    .map(|(i, column)| {
                        let raw = record.get(i).unwrap_or("");
                        (column.id.clone(), parse_cell(raw, column.column_type))
                    })
                    .collect()
            })
            .collect();

        Ok(Table { schema, data })
    }

    async fn write_table(&self, path: &Path, table: &Table) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("csv.tmp");
        let file = File::create(&tmp).await?;
        let mut writer = AsyncWriterBuilder::new().create_writer(file);
        let header: Vec<&str> = table.schema.iter().map(|c| c.id.as_str()).collect();
        writer.write_record(header).await?;
        for row in &table.data {
            let fields: Vec<String> = table
                .schema
                .iter()
                .map(|c| row.get(&c.id).map(CellValue::to_csv_string).unwrap_or_default())
                .collect();
            writer.write_record(&fields).await?;
        }
        writer.flush().await?;
        drop(writer);
        fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl TableStore for CsvStore {
    async fn load_table(&self, table: &TableRef) -> Result<Table, StorageError> {
        let path = self.path_for(table)?;
        let loaded = Self::read_table(&path, &table.physical_name()).await?;
        debug!(table = %table, rows = loaded.data.len(), "loaded csv table");
        Ok(loaded)
    }

    async fn table_exists(&self, table: &TableRef) -> Result<bool, StorageError> {
        let path = self.path_for(table)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn apply_ops(&self, table: &TableRef, ops: &[TableOp]) -> Result<u64, StorageError> {
        if !self.writable {
            return Err(StorageError::ReadOnly);
        }
        let path = self.path_for(table)?;
        let physical = table.physical_name();

        let _guard = self.write_lock.lock().await;
        let mut current = match Self::read_table(&path, &physical).await {
            Ok(table) => table,
            Err(StorageError::TableNotFound(_)) => {
                // First write against an application-owned table bootstraps it.
                match builtin_schema(table.logical_name()) {
                    Some(schema) => Table::new(schema),
                    None => return Err(StorageError::TableNotFound(physical)),
                }
            }
            Err(e) => return Err(e),
        };

        validate_ops(&physical, &current, ops)?;
        let affected = apply_ops(&mut current, ops);
        self.write_table(&path, &current).await?;
        debug!(table = %table, ops = ops.len(), affected, "csv table rewritten");
        Ok(affected)
    }
}

fn infer_type(values: &[&str]) -> ColumnType {
    if values.is_empty() {
        return ColumnType::Text;
    }
    if values.iter().all(|v| v.trim().parse::<f64>().is_ok()) {
        return ColumnType::Number;
    }
    if values
        .iter()
        .all(|v| v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false"))
    {
        return ColumnType::Boolean;
    }
    ColumnType::Text
}

fn parse_cell(raw: &str, column_type: ColumnType) -> CellValue {
    if raw.is_empty() {
        return CellValue::Null;
    }
    match column_type {
        ColumnType::Number => raw
            .trim()
            .parse::<f64>()
            .map(CellValue::Number)
            .unwrap_or_else(|_| CellValue::text(raw)),
        ColumnType::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" => CellValue::Bool(true),
            "false" => CellValue::Bool(false),
            _ => CellValue::text(raw),
        },
        ColumnType::Text => CellValue::text(raw),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use db::models::dev_lock::{ComponentType, DevLock, LockType};

    async fn seeded_store(writable: bool) -> (tempfile::TempDir, CsvStore) {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(
            dir.path().join("stock_m01.csv"),
            "sku,on_hand,discontinued\nTEE-S,12,false\nTEE-M,3,true\n",
        )
        .await
        .unwrap();
        let store = CsvStore::new(dir.path(), writable);
        (dir, store)
    }

    #[tokio::test]
    async fn loads_schema_and_typed_rows() {
        let (_dir, store) = seeded_store(false).await;
        let table = store
            .load_table(&TableRef::scoped("stock", "m01"))
            .await
            .unwrap();
        assert_eq!(table.schema.len(), 3);
        assert_eq!(table.column("on_hand").unwrap().column_type, ColumnType::Number);
        assert_eq!(
            table.column("discontinued").unwrap().column_type,
            ColumnType::Boolean
        );
        assert_eq!(table.data[0]["on_hand"], CellValue::Number(12.0));
        assert_eq!(table.data[1]["discontinued"], CellValue::Bool(true));
    }

    #[tokio::test]
    async fn missing_table_reports_not_found() {
        let (_dir, store) = seeded_store(false).await;
        let err = store
            .load_table(&TableRef::shared("orders"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::TableNotFound(name) if name == "orders"));
    }

    #[tokio::test]
    async fn debug_mode_rejects_writes() {
        let (_dir, store) = seeded_store(false).await;
        let ops = vec![TableOp::Delete {
            where_: HashMap::from([("sku".to_string(), CellValue::text("TEE-S"))]),
        }];
        let err = store
            .apply_ops(&TableRef::scoped("stock", "m01"), &ops)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ReadOnly));
    }

    #[tokio::test]
    async fn writable_mode_round_trips_ops_through_the_file() {
        let (_dir, store) = seeded_store(true).await;
        let table_ref = TableRef::scoped("stock", "m01");
        let ops = vec![
            TableOp::Update {
                set: HashMap::from([("on_hand".to_string(), CellValue::Number(20.0))]),
                where_: HashMap::from([("sku".to_string(), CellValue::text("TEE-S"))]),
            },
            TableOp::Insert {
                row: HashMap::from([
                    ("sku".to_string(), CellValue::text("TEE-L")),
                    ("on_hand".to_string(), CellValue::Number(5.0)),
                    ("discontinued".to_string(), CellValue::Bool(false)),
                ]),
            },
        ];
        assert_eq!(store.apply_ops(&table_ref, &ops).await.unwrap(), 2);

        let reloaded = store.load_table(&table_ref).await.unwrap();
        assert_eq!(reloaded.data.len(), 3);
        assert_eq!(reloaded.data[0]["on_hand"], CellValue::Number(20.0));
        assert_eq!(reloaded.data[2]["sku"], CellValue::text("TEE-L"));
    }

    #[tokio::test]
    async fn quoted_fields_survive_the_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(
            dir.path().join("customers.csv"),
            "customer_id,name\nc1,\"Acme, Inc.\"\n",
        )
        .await
        .unwrap();
        let store = CsvStore::new(dir.path(), true);
        let table_ref = TableRef::shared("customers");

        let ops = vec![TableOp::Insert {
            row: HashMap::from([
                ("customer_id".to_string(), CellValue::text("c2")),
                ("name".to_string(), CellValue::text("Bolt \"B\" Apparel")),
            ]),
        }];
        store.apply_ops(&table_ref, &ops).await.unwrap();

        let reloaded = store.load_table(&table_ref).await.unwrap();
        assert_eq!(reloaded.data[0]["name"], CellValue::text("Acme, Inc."));
        assert_eq!(reloaded.data[1]["name"], CellValue::text("Bolt \"B\" Apparel"));
    }

    #[tokio::test]
    async fn first_write_bootstraps_application_tables() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path(), true);
        let lock = DevLock::new(ComponentType::Tool, "estimator", LockType::NoEdit);
        let ops = vec![TableOp::Insert { row: lock.to_row() }];
        store
            .apply_ops(&TableRef::shared("dev_locks"), &ops)
            .await
            .unwrap();

        let table = store
            .load_table(&TableRef::shared("dev_locks"))
            .await
            .unwrap();
        let locks = DevLock::all_from_table(&table);
        assert_eq!(locks.len(), 1);
        assert_eq!(locks[0].component_name, "estimator");
        assert!(locks[0].is_locked);
    }
}
