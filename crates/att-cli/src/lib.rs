//! Beacon attendance CLI library.
//!
//! This crate provides the `att` command-line interface and the HTTP API
//! served by `att serve`.

mod cli;
pub mod commands;
mod config;
pub mod server;

pub use cli::{Cli, Commands, EmployeesAction, RecordFilters};
pub use config::Config;
