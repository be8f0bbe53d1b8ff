use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

/// A single cell: the scalars a row may hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(untagged)]
pub enum CellValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Null,
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the cell the way it is written to a CSV file. Null becomes an
    /// empty field; whole numbers drop the trailing `.0`.
    pub fn to_csv_string(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Null => String::new(),
        }
    }
}

pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// A record: column id to scalar. Rows may omit optional columns; the schema
/// carries the authoritative column order.
pub type Row = HashMap<String, CellValue>;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnType {
    #[default]
    Text,
    Number,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct Column {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(id: impl Into<String>, name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            column_type,
        }
    }

    pub fn text(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            column_type: ColumnType::Text,
        }
    }
}

/// A named schema + row-set pair, the unit of data loaded and saved by a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, Default)]
pub struct Table {
    pub schema: Vec<Column>,
    pub data: Vec<Row>,
}

impl Table {
    pub fn new(schema: Vec<Column>) -> Self {
        Self {
            schema,
            data: Vec::new(),
        }
    }

    /// By convention the first schema column is the primary key.
    pub fn primary_key(&self) -> Option<&Column> {
        self.schema.first()
    }

    pub fn column(&self, id: &str) -> Option<&Column> {
        self.schema.iter().find(|c| c.id == id)
    }

    pub fn has_column(&self, id: &str) -> bool {
        self.column(id).is_some()
    }

    /// Parse text cells into numbers/booleans according to the declared
    /// column type (the bulk-edit coercion rule). Unparseable text is left
    /// as text.
    pub fn coerce_row(&self, row: &mut Row) {
        for column in &self.schema {
            let Some(cell) = row.get_mut(&column.id) else {
                continue;
            };
            let CellValue::Text(text) = cell else {
                continue;
            };
            match column.column_type {
                ColumnType::Number => {
                    if let Ok(n) = text.trim().parse::<f64>() {
                        *cell = CellValue::Number(n);
                    }
                }
                ColumnType::Boolean => {
                    if text.trim().eq_ignore_ascii_case("true") {
                        *cell = CellValue::Bool(true);
                    } else if text.trim().eq_ignore_ascii_case("false") {
                        *cell = CellValue::Bool(false);
                    }
                }
                ColumnType::Text => {}
            }
        }
    }
}

/// The full in-memory mapping of table name to table, partially populated at
/// any time — tools load only the subset of tables they depend on.
pub type Database = HashMap<String, Table>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        Table::new(vec![
            Column::text("id"),
            Column::new("qty", "Quantity", ColumnType::Number),
            Column::new("active", "Active", ColumnType::Boolean),
        ])
    }

    #[test]
    fn primary_key_is_first_column() {
        let table = sample_table();
        assert_eq!(table.primary_key().unwrap().id, "id");
    }

    #[test]
    fn coerce_row_parses_declared_types() {
        let table = sample_table();
        let mut row: Row = HashMap::from([
            ("id".to_string(), CellValue::text("sku-1")),
            ("qty".to_string(), CellValue::text("42")),
            ("active".to_string(), CellValue::text("TRUE")),
        ]);
        table.coerce_row(&mut row);
        assert_eq!(row["qty"], CellValue::Number(42.0));
        assert_eq!(row["active"], CellValue::Bool(true));
        assert_eq!(row["id"], CellValue::text("sku-1"));
    }

    #[test]
    fn coerce_row_leaves_unparseable_text() {
        let table = sample_table();
        let mut row: Row = HashMap::from([("qty".to_string(), CellValue::text("a lot"))]);
        table.coerce_row(&mut row);
        assert_eq!(row["qty"], CellValue::text("a lot"));
    }

    #[test]
    fn csv_rendering_drops_trailing_zero() {
        assert_eq!(CellValue::Number(3.0).to_csv_string(), "3");
        assert_eq!(CellValue::Number(2.5).to_csv_string(), "2.5");
        assert_eq!(CellValue::Null.to_csv_string(), "");
        assert_eq!(CellValue::Bool(false).to_csv_string(), "false");
    }

    #[test]
    fn cell_value_serializes_untagged() {
        let row: Row = HashMap::from([("v".to_string(), CellValue::Number(3.0))]);
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"v":3.0}"#);
        let back: Row = serde_json::from_str(r#"{"v":true}"#).unwrap();
        assert_eq!(back["v"], CellValue::Bool(true));
    }
}
