pub mod dev_lock;
pub mod ops;
pub mod settings;
pub mod table;
pub mod table_ref;
pub mod ui_text;

use table::Column;

/// Schemas for the tables the application itself owns. Storage backends use
/// these to bootstrap a table the first time it is written to.
pub fn builtin_schema(name: &str) -> Option<Vec<Column>> {
    match name {
        dev_lock::DEV_LOCKS_TABLE => Some(dev_lock::schema()),
        settings::SETTINGS_TABLE => Some(settings::schema()),
        _ => None,
    }
}
