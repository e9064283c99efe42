//! Command handlers.

pub mod config_cmd;
pub mod get;
pub mod list;
pub mod schemas;
