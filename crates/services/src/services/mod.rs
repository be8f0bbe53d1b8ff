pub mod backup;
pub mod dev_lock;
pub mod dispatcher;
pub mod loader;
pub mod settings;
pub mod store_validator;
pub mod ui_text;
