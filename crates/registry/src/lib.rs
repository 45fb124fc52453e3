//! Configuration loading for the rule chain engine.
//!
//! This crate provides:
//! - The YAML configuration file schema (rules, rule groups, chains, and
//!   cross-file `rule-refs`)
//! - A cross-file resolver producing one validated [`Registry`] snapshot
//! - A shared handle with atomic snapshot swapping and hot-reload via
//!   `notify` watcher
//!
//! [`Registry`]: ruleflow_core::Registry

pub mod error;
pub mod loader;
pub mod resolve;
pub mod schema;

pub use error::{ResolveError, Result};
pub use loader::{ConfigSource, RegistryWatcher, SharedRegistry, YamlConfigSource};
pub use resolve::{resolve_files, resolve_root};
pub use schema::{FileRef, RawConfig};
