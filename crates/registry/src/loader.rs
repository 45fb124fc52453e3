//! Configuration file loading and the shared registry handle.
//!
//! [`ConfigSource`] is the parsing seam: the resolver consumes parsed
//! [`RawConfig`] records and never touches YAML itself. [`SharedRegistry`]
//! wraps a resolved snapshot with atomic swapping and an optional `notify`
//! hot-reload watcher; an in-flight evaluation keeps the snapshot it
//! started with.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use ruleflow_core::model::Registry;
use tracing::{info, warn};

use crate::error::{ResolveError, Result};
use crate::resolve::resolve_root;
use crate::schema::RawConfig;

/// Supplies parsed configuration records by path.
///
/// The YAML implementation is the production source; tests substitute an
/// in-memory map.
pub trait ConfigSource {
    fn load(&self, path: &Path) -> Result<RawConfig>;
}

/// Reads and parses YAML configuration files from disk.
pub struct YamlConfigSource;

impl ConfigSource for YamlConfigSource {
    fn load(&self, path: &Path) -> Result<RawConfig> {
        let contents = fs::read_to_string(path).map_err(|source| ResolveError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ResolveError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Shared handle to the current configuration snapshot.
#[derive(Clone)]
pub struct SharedRegistry {
    root: PathBuf,
    current: Arc<RwLock<Arc<Registry>>>,
}

impl SharedRegistry {
    /// Resolve the root file and wrap the result in a shared handle.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let registry = resolve_root(&root)?;
        Ok(Self {
            root,
            current: Arc::new(RwLock::new(Arc::new(registry))),
        })
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<Registry> {
        Arc::clone(&self.current.read().expect("registry lock poisoned"))
    }

    /// Re-resolve from the source and swap in the new snapshot.
    ///
    /// On failure the previous snapshot stays active and the error is
    /// returned to the caller.
    pub fn reload(&self) -> Result<()> {
        let registry = resolve_root(&self.root)?;
        *self.current.write().expect("registry lock poisoned") = Arc::new(registry);
        info!(root = %self.root.display(), "configuration reloaded");
        Ok(())
    }

    /// Start a filesystem watcher over the root file's directory.
    ///
    /// Any YAML change triggers a full re-resolve. A resolve that fails is
    /// logged and the previous snapshot is kept.
    pub fn watch(&self) -> Result<RegistryWatcher> {
        let shared = self.clone();
        let dir = self
            .root
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<Event, notify::Error>| match res {
                Ok(event) => handle_fs_event(&event, &shared),
                Err(e) => warn!(error = %e, "filesystem watcher error"),
            },
        )?;
        watcher.watch(&dir, RecursiveMode::Recursive)?;

        info!(path = %dir.display(), "watching configuration directory for changes");
        Ok(RegistryWatcher { _watcher: watcher })
    }
}

/// Keeps the underlying watcher alive; drop it to stop watching.
pub struct RegistryWatcher {
    _watcher: RecommendedWatcher,
}

fn handle_fs_event(event: &Event, shared: &SharedRegistry) {
    let touches_yaml = event.paths.iter().any(|p| {
        p.extension()
            .and_then(|e| e.to_str())
            .map(|e| e == "yml" || e == "yaml")
            .unwrap_or(false)
    });
    if !touches_yaml {
        return;
    }

    match &event.kind {
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {
            if let Err(e) = shared.reload() {
                warn!(error = %e, "hot-reload failed, keeping previous configuration");
            }
        }
        _ => {}
    }
}
