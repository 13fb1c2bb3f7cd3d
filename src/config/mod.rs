//! Configuration for pargolo.
//!
//! ## config.kdl - User preferences
//!
//! Located at `$PARGOLO_CONFIG`, else `~/.config/pargolo/config.kdl`.
//!
//! Contains:
//! - `backend` - "ssm", "file" or "memory"
//! - `region` / `endpoint` - remote store location
//! - `store-file` - JSON document for the file backend
//! - `page-size`, `page-delay-ms` - listing behaviour
//! - `max-retries`, `retry-base-delay-ms`, `timeout-secs` - remote client tuning
//! - `output-format` - "json" or "human"
//!
//! ## Precedence
//!
//! CLI flag > environment > config.kdl > defaults
//!
//! Use the [`resolver`] module for unified precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, Resolved, ResolvedConfig, ValueSource, config_path, load_config_file,
    resolve_config,
};
pub use schema::{OutputFormat, PargoloConfig};
