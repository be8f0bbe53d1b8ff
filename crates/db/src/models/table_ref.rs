//! Explicit references to physical tables.
//!
//! Certain entities (stock, SKUs, colors, sizes, product prices) are
//! manufacturer-scoped: partitioned by manufacturer id at the storage layer
//! rather than carrying a foreign key. All shard-name construction goes
//! through [`TableRef::physical_name`] instead of scattered string templates.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use super::table::{Database, Table};

/// Table families physically partitioned by manufacturer id.
pub const MANUFACTURER_SCOPED: &[&str] = &["product_prices", "stock", "skus", "colors", "sizes"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TableRef {
    Shared {
        name: String,
    },
    ManufacturerScoped {
        base: String,
        manufacturer_id: String,
    },
}

#[derive(Debug, Error)]
pub enum TableRefError {
    #[error("invalid table identifier `{0}`")]
    InvalidIdentifier(String),
}

pub fn is_valid_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl TableRef {
    pub fn shared(name: impl Into<String>) -> Self {
        TableRef::Shared { name: name.into() }
    }

    pub fn scoped(base: impl Into<String>, manufacturer_id: impl Into<String>) -> Self {
        TableRef::ManufacturerScoped {
            base: base.into(),
            manufacturer_id: manufacturer_id.into(),
        }
    }

    /// Resolve a logical table name plus an optional manufacturer context.
    /// Only names in the manufacturer-scoped family are sharded.
    pub fn resolve(name: &str, manufacturer_id: Option<&str>) -> Self {
        match manufacturer_id {
            Some(id) if MANUFACTURER_SCOPED.contains(&name) => Self::scoped(name, id),
            _ => Self::parse(name),
        }
    }

    /// Parse a (possibly already sharded) table name. `stock_m01` becomes a
    /// scoped ref on `stock`; anything else is shared. Scoped bases are
    /// checked longest-first so `product_prices` is not split at its own
    /// underscore.
    pub fn parse(name: &str) -> Self {
        for base in MANUFACTURER_SCOPED {
            if let Some(rest) = name.strip_prefix(base) {
                if let Some(id) = rest.strip_prefix('_') {
                    if !id.is_empty() {
                        return Self::scoped(*base, id);
                    }
                }
            }
        }
        Self::shared(name)
    }

    /// The storage-layer name: `{base}_{manufacturer_id}` for scoped refs.
    pub fn physical_name(&self) -> String {
        match self {
            TableRef::Shared { name } => name.clone(),
            TableRef::ManufacturerScoped {
                base,
                manufacturer_id,
            } => format!("{base}_{manufacturer_id}"),
        }
    }

    /// The logical family name, ignoring any manufacturer shard.
    pub fn logical_name(&self) -> &str {
        match self {
            TableRef::Shared { name } => name,
            TableRef::ManufacturerScoped { base, .. } => base,
        }
    }

    /// Identifier safety check applied before a name reaches a storage
    /// backend (file path or SQL identifier).
    pub fn validate(&self) -> Result<(), TableRefError> {
        let physical = self.physical_name();
        if is_valid_identifier(&physical) {
            Ok(())
        } else {
            Err(TableRefError::InvalidIdentifier(physical))
        }
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.physical_name())
    }
}

/// Look up a manufacturer shard of a table family in an in-memory database.
pub fn manufacturer_table<'a>(
    db: &'a Database,
    base: &str,
    manufacturer_id: &str,
) -> Option<&'a Table> {
    db.get(&TableRef::scoped(base, manufacturer_id).physical_name())
}
