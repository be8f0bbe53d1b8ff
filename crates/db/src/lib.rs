pub mod models;
pub mod tool_deps;
