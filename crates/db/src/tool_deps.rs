//! Static tool → table dependency map.
//!
//! Every tool page declares the tables it needs; the loader fetches only the
//! missing ones when a tool mounts. Manufacturer-scoped families appear here
//! under their base name and are resolved to a shard per request context.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Tables the application itself owns and expects to exist in any backend.
pub const CORE_TABLES: &[&str] = &["settings", "dev_locks"];

pub static TOOL_DEPENDENCIES: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    HashMap::from([
        (
            "estimator",
            vec![
                "settings",
                "manufacturers",
                "products_master",
                "product_prices",
                "customers",
            ],
        ),
        (
            "orders",
            vec!["orders", "order_items", "customers", "products_master"],
        ),
        (
            "products",
            vec!["products_master", "skus", "colors", "sizes", "manufacturers"],
        ),
        ("inventory", vec!["stock", "manufacturers", "products_master"]),
        ("pricing", vec!["product_prices", "manufacturers", "settings"]),
        ("tasks", vec!["tasks"]),
        ("ink_recipes", vec!["ink_recipes", "inks"]),
        ("email", vec!["email_templates", "customers"]),
        ("admin", vec!["settings", "dev_locks"]),
    ])
});

/// Phased fetch sets for the estimator: each phase is loaded concurrently and
/// the results shallow-merged.
pub const ESTIMATOR_PHASES: &[(&str, &[&str])] = &[
    ("essential", &["settings", "manufacturers"]),
    ("products", &["products_master", "product_prices"]),
    ("customers", &["customers"]),
];

pub fn tables_for_tool(tool: &str) -> &'static [&'static str] {
    TOOL_DEPENDENCIES
        .get(tool)
        .map(|tables| tables.as_slice())
        .unwrap_or(&[])
}

pub fn is_known_tool(tool: &str) -> bool {
    TOOL_DEPENDENCIES.contains_key(tool)
}

/// All tool names, sorted for deterministic bulk operations.
pub fn all_tools() -> Vec<&'static str> {
    let mut tools: Vec<&'static str> = TOOL_DEPENDENCIES.keys().copied().collect();
    tools.sort_unstable();
    tools
}

/// Every table named by any tool dependency, sorted and deduplicated.
pub fn all_known_tables() -> Vec<&'static str> {
    let mut tables: Vec<&'static str> = TOOL_DEPENDENCIES
        .values()
        .flatten()
        .copied()
        .collect();
    tables.sort_unstable();
    tables.dedup();
    tables
}
