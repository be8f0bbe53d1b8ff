//! Declarative table operations and their in-memory application semantics.
//!
//! An op batch is validated and coerced against the table schema before it is
//! applied locally or handed to a storage backend. The same semantics hold in
//! every storage mode.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use super::table::{CellValue, Row, Table};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum TableOp {
    Insert {
        row: Row,
    },
    Update {
        set: Row,
        #[serde(rename = "where")]
        where_: Row,
    },
    Delete {
        #[serde(rename = "where")]
        where_: Row,
    },
}

#[derive(Debug, Error)]
pub enum OpError {
    #[error("unknown column `{column}` in table `{table}`")]
    UnknownColumn { table: String, column: String },
    #[error("update on `{table}` would modify the primary key column `{column}`")]
    PrimaryKeyUpdate { table: String, column: String },
    #[error("update/delete on `{table}` requires a non-empty where clause")]
    EmptyWhere { table: String },
    #[error("update on `{table}` requires a non-empty set clause")]
    EmptySet { table: String },
    #[error("insert on `{table}` requires a non-empty row")]
    EmptyRow { table: String },
}

/// Equality match of a row against a `where` clause. A column the row lacks
/// compares as null.
pub fn row_matches(row: &Row, where_: &Row) -> bool {
    where_
        .iter()
        .all(|(column, expected)| row.get(column).unwrap_or(&CellValue::Null) == expected)
}

/// Check an op batch against the table schema. Every referenced column must
/// exist, update/delete predicates must be non-empty, and an update may not
/// touch the primary key column.
pub fn validate_ops(table_name: &str, table: &Table, ops: &[TableOp]) -> Result<(), OpError> {
    let check_columns = |row: &Row| -> Result<(), OpError> {
        for column in row.keys() {
            if !table.has_column(column) {
                return Err(OpError::UnknownColumn {
                    table: table_name.to_string(),
                    column: column.clone(),
                });
            }
        }
        Ok(())
    };

    for op in ops {
        match op {
            TableOp::Insert { row } => {
                if row.is_empty() {
                    return Err(OpError::EmptyRow {
                        table: table_name.to_string(),
                    });
                }
                check_columns(row)?;
            }
            TableOp::Update { set, where_ } => {
                if where_.is_empty() {
                    return Err(OpError::EmptyWhere {
                        table: table_name.to_string(),
                    });
                }
                // An empty set would be a no-op locally but malformed SQL in
                // live mode; reject it before either backend sees it.
                if set.is_empty() {
                    return Err(OpError::EmptySet {
                        table: table_name.to_string(),
                    });
                }
                check_columns(set)?;
                check_columns(where_)?;
                if let Some(pk) = table.primary_key() {
                    if set.contains_key(&pk.id) {
                        return Err(OpError::PrimaryKeyUpdate {
                            table: table_name.to_string(),
                            column: pk.id.clone(),
                        });
                    }
                }
            }
            TableOp::Delete { where_ } => {
                if where_.is_empty() {
                    return Err(OpError::EmptyWhere {
                        table: table_name.to_string(),
                    });
                }
                check_columns(where_)?;
            }
        }
    }
    Ok(())
}

/// Coerce every payload cell according to the declared column types.
pub fn coerce_ops(table: &Table, ops: &mut [TableOp]) {
    for op in ops.iter_mut() {
        match op {
            TableOp::Insert { row } => table.coerce_row(row),
            TableOp::Update { set, where_ } => {
                table.coerce_row(set);
                table.coerce_row(where_);
            }
            TableOp::Delete { where_ } => table.coerce_row(where_),
        }
    }
}

/// Apply an ordered op batch to the in-memory row set. Returns the number of
/// rows inserted, updated, or deleted.
pub fn apply_ops(table: &mut Table, ops: &[TableOp]) -> u64 {
    let mut affected = 0u64;
    for op in ops {
        match op {
            TableOp::Insert { row } => {
                table.data.push(row.clone());
                affected += 1;
            }
            TableOp::Update { set, where_ } => {
                for row in table.data.iter_mut().filter(|r| row_matches(r, where_)) {
                    for (column, value) in set {
                        row.insert(column.clone(), value.clone());
                    }
                    affected += 1;
                }
            }
            TableOp::Delete { where_ } => {
                let before = table.data.len();
                table.data.retain(|r| !row_matches(r, where_));
                affected += (before - table.data.len()) as u64;
            }
        }
    }
    affected
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::models::table::{Column, ColumnType};

    fn row(pairs: &[(&str, CellValue)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn orders_table() -> Table {
        let mut table = Table::new(vec![
            Column::text("order_id"),
            Column::text("customer"),
            Column::new("total", "Total", ColumnType::Number),
        ]);
        table.data = vec![
            row(&[
                ("order_id", CellValue::text("o1")),
                ("customer", CellValue::text("acme")),
                ("total", CellValue::Number(120.0)),
            ]),
            row(&[
                ("order_id", CellValue::text("o2")),
                ("customer", CellValue::text("acme")),
                ("total", CellValue::Number(75.5)),
            ]),
        ];
        table
    }

    #[test]
    fn insert_appends_exactly_once() {
        let mut table = orders_table();
        let ops = vec![TableOp::Insert {
            row: row(&[
                ("order_id", CellValue::text("o3")),
                ("customer", CellValue::text("bolt")),
            ]),
        }];
        assert_eq!(apply_ops(&mut table, &ops), 1);
        assert_eq!(table.data.len(), 3);
        assert_eq!(
            table
                .data
                .iter()
                .filter(|r| r.get("order_id") == Some(&CellValue::text("o3")))
                .count(),
            1
        );
    }

    #[test]
    fn update_changes_only_named_fields_on_matching_rows() {
        let mut table = orders_table();
        let ops = vec![TableOp::Update {
            set: row(&[("total", CellValue::Number(130.0))]),
            where_: row(&[("order_id", CellValue::text("o1"))]),
        }];
        assert_eq!(apply_ops(&mut table, &ops), 1);
        let updated = &table.data[0];
        assert_eq!(updated["order_id"], CellValue::text("o1"));
        assert_eq!(updated["customer"], CellValue::text("acme"));
        assert_eq!(updated["total"], CellValue::Number(130.0));
        // Non-matching row untouched.
        assert_eq!(table.data[1]["total"], CellValue::Number(75.5));
    }

    #[test]
    fn update_matches_every_row_satisfying_the_predicate() {
        let mut table = orders_table();
        let ops = vec![TableOp::Update {
            set: row(&[("customer", CellValue::text("acme-renamed"))]),
            where_: row(&[("customer", CellValue::text("acme"))]),
        }];
        assert_eq!(apply_ops(&mut table, &ops), 2);
        assert!(
            table
                .data
                .iter()
                .all(|r| r["customer"] == CellValue::text("acme-renamed"))
        );
    }

    #[test]
    fn delete_removes_matching_rows() {
        let mut table = orders_table();
        let ops = vec![TableOp::Delete {
            where_: row(&[("order_id", CellValue::text("o2"))]),
        }];
        assert_eq!(apply_ops(&mut table, &ops), 1);
        assert_eq!(table.data.len(), 1);
        assert_eq!(table.data[0]["order_id"], CellValue::text("o1"));
    }

    #[test]
    fn ops_apply_in_order() {
        let mut table = orders_table();
        let ops = vec![
            TableOp::Insert {
                row: row(&[("order_id", CellValue::text("o3"))]),
            },
            TableOp::Delete {
                where_: row(&[("order_id", CellValue::text("o3"))]),
            },
        ];
        assert_eq!(apply_ops(&mut table, &ops), 2);
        assert_eq!(table.data.len(), 2);
    }

    #[test]
    fn validate_rejects_unknown_columns() {
        let table = orders_table();
        let ops = vec![TableOp::Insert {
            row: row(&[("no_such_column", CellValue::text("x"))]),
        }];
        assert!(matches!(
            validate_ops("orders", &table, &ops),
            Err(OpError::UnknownColumn { column, .. }) if column == "no_such_column"
        ));
    }

    #[test]
    fn validate_rejects_primary_key_updates() {
        let table = orders_table();
        let ops = vec![TableOp::Update {
            set: row(&[("order_id", CellValue::text("o9"))]),
            where_: row(&[("order_id", CellValue::text("o1"))]),
        }];
        assert!(matches!(
            validate_ops("orders", &table, &ops),
            Err(OpError::PrimaryKeyUpdate { .. })
        ));
    }

    #[test]
    fn validate_rejects_empty_set_updates() {
        let table = orders_table();
        let ops = vec![TableOp::Update {
            set: HashMap::new(),
            where_: row(&[("order_id", CellValue::text("o1"))]),
        }];
        assert!(matches!(
            validate_ops("orders", &table, &ops),
            Err(OpError::EmptySet { .. })
        ));
    }

    #[test]
    fn validate_rejects_empty_where() {
        let table = orders_table();
        let ops = vec![TableOp::Delete { where_: HashMap::new() }];
        assert!(matches!(
            validate_ops("orders", &table, &ops),
            Err(OpError::EmptyWhere { .. })
        ));
    }

    #[test]
    fn coerce_ops_applies_declared_types() {
        let table = orders_table();
        let mut ops = vec![TableOp::Update {
            set: row(&[("total", CellValue::text("99"))]),
            where_: row(&[("order_id", CellValue::text("o1"))]),
        }];
        coerce_ops(&table, &mut ops);
        let TableOp::Update { set, .. } = &ops[0] else {
            unreachable!()
        };
        assert_eq!(set["total"], CellValue::Number(99.0));
    }

    #[test]
    fn where_on_missing_column_compares_as_null() {
        let mut table = orders_table();
        table.data[0].remove("customer");
        let ops = vec![TableOp::Delete {
            where_: row(&[("customer", CellValue::Null)]),
        }];
        assert_eq!(apply_ops(&mut table, &ops), 1);
        assert_eq!(table.data.len(), 1);
    }

    #[test]
    fn op_json_shape_uses_lowercase_tags() {
        let op = TableOp::Delete {
            where_: row(&[("order_id", CellValue::text("o1"))]),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "delete");
        assert_eq!(json["where"]["order_id"], "o1");
    }
}
