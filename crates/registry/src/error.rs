//! Error taxonomy for configuration loading and resolution.

use std::path::PathBuf;

/// Errors that can occur while loading and resolving configuration files.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Filesystem I/O error.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse/deserialization error.
    #[error("YAML parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Structurally valid YAML that violates a configuration constraint
    /// (duplicate sequence numbers, empty ids, and the like).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The same rule id defined twice with different content.
    #[error("duplicate rule '{id}' with conflicting definitions")]
    DuplicateRule { id: String },

    /// The same group id defined twice with different content.
    #[error("duplicate rule group '{id}' with conflicting definitions")]
    DuplicateGroup { id: String },

    /// The same chain id defined twice with different content.
    #[error("duplicate chain '{id}' with conflicting definitions")]
    DuplicateChain { id: String },

    /// Rule groups that reference each other in a cycle.
    #[error("circular group reference: {path}")]
    CircularReference { path: String },

    /// A group or chain names a rule or group that does not exist.
    #[error("{referrer} references unknown {kind} '{id}'")]
    MissingReference {
        referrer: String,
        kind: &'static str,
        id: String,
    },

    /// Filesystem watcher error.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// Result alias for resolution operations.
pub type Result<T> = std::result::Result<T, ResolveError>;
