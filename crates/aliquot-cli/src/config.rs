//! Run-plan configuration: the TOML plan file, built-in defaults, and the
//! merge of both with command-line overrides into an [`AppConfig`](models::AppConfig).

pub mod builder;
pub mod defaults;
pub mod file;
pub mod models;
