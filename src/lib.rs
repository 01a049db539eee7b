#![forbid(unsafe_code)]

//! Maps ODK/Ona webhook submissions onto Odoo animal-health records.

pub mod builders;
pub mod catalogue;
pub mod config;
pub mod errors;
pub mod extract;
pub mod gateway;
pub mod models;
pub mod pipeline;
pub mod server;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
