//! Stack-to-package resolution via on-disk manifests.
//!
//! Walks a captured stack innermost-first looking for a frame whose
//! source file lives under a `node_modules` directory, derives the
//! package name from the path segments after the rightmost
//! `node_modules`, and reads the package's `package.json` for its
//! version. Parsed manifests are cached per package directory for
//! the life of the process. The resolver never raises: every I/O or
//! parse failure collapses to an unattributed result.

use crate::attribution::stack::CallStack;
use crate::paths;
use crate::signal::PackageIdentity;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Parsed subset of a package manifest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// A successful attribution: the responsible package and its
/// on-disk directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    /// Package identity recorded on the signal
    pub package: PackageIdentity,
    /// Absolute package directory the manifest was read from
    pub package_dir: PathBuf,
}

/// Resolves captured stacks to third-party package identities.
pub struct AttributionEngine {
    cache: Mutex<HashMap<PathBuf, Arc<PackageManifest>>>,
}

impl AttributionEngine {
    /// Create an engine with an empty manifest cache.
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a stack to the responsible package, if any.
    ///
    /// Returns `None` for first-party stacks (no `node_modules`
    /// ancestor on any frame) and for frames whose manifest is
    /// missing or malformed once every frame has been tried.
    pub fn attribute(&self, stack: &CallStack) -> Option<Attribution> {
        for frame in stack.frames() {
            let Some((name, dir)) = locate_package(&frame.file) else {
                continue;
            };
            let Some(manifest) = self.manifest_for(&dir) else {
                continue;
            };
            let version = manifest
                .version
                .clone()
                .unwrap_or_else(|| "unknown".to_string());
            return Some(Attribution {
                package: PackageIdentity::new(name, version),
                package_dir: dir,
            });
        }
        None
    }

    /// Number of cached manifests.
    pub fn cache_len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn manifest_for(&self, package_dir: &Path) -> Option<Arc<PackageManifest>> {
        if let Some(cached) = self
            .cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(package_dir).cloned())
        {
            return Some(cached);
        }

        let manifest_path = package_dir.join("package.json");
        let raw = match std::fs::read_to_string(&manifest_path) {
            Ok(raw) => raw,
            Err(err) => {
                debug!(path = %manifest_path.display(), %err, "manifest unreadable");
                return None;
            }
        };
        let manifest: PackageManifest = match serde_json::from_str(&raw) {
            Ok(manifest) => manifest,
            Err(err) => {
                debug!(path = %manifest_path.display(), %err, "manifest malformed");
                return None;
            }
        };

        let manifest = Arc::new(manifest);
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(package_dir.to_path_buf(), Arc::clone(&manifest));
        }
        Some(manifest)
    }
}

impl Default for AttributionEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive the package name and directory from a source file path.
///
/// Finds the rightmost `node_modules` segment; the following segment
/// is the package name, or the following two when the first begins
/// with `@` (scoped packages). Returns the absolute prefix up to and
/// including the package name.
pub fn locate_package(file: &Path) -> Option<(String, PathBuf)> {
    let normalized = paths::normalize(file);
    let components: Vec<Component> = normalized.components().collect();

    let anchor = components
        .iter()
        .rposition(|c| c.as_os_str() == "node_modules")?;

    let first = components.get(anchor + 1)?.as_os_str().to_str()?;
    let (name, name_end) = if first.starts_with('@') {
        let second = components.get(anchor + 2)?.as_os_str().to_str()?;
        (format!("{}/{}", first, second), anchor + 2)
    } else {
        (first.to_string(), anchor + 1)
    };

    let package_dir: PathBuf = components[..=name_end].iter().collect();
    Some((name, package_dir))
}
