use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{info, warn};

use super::types::{Catalog, FunctionDescriptor};
use crate::error::CallerError;

/// Default catalog embedded in the binary, written out when no file exists.
const DEFAULT_CATALOG: &str = include_str!("../../config/function_templates.json");

fn normalized(mut catalog: Catalog) -> Catalog {
    for d in &mut catalog.templates {
        d.dedupe_params();
    }
    catalog
}

/// The embedded catalog.
///
/// # Panics
/// Panics if the embedded JSON is invalid (a build-time bug, covered by tests).
pub fn default_catalog() -> Catalog {
    normalized(serde_json::from_str(DEFAULT_CATALOG).expect("embedded function_templates.json must be valid"))
}

/// Write the default catalog to `path` unless a file is already there.
pub fn ensure_catalog_file(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, DEFAULT_CATALOG).with_context(|| format!("writing default catalog to {:?}", path))?;
    info!("Wrote default catalog to {:?}", path);
    Ok(true)
}

pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading catalog {:?}", path))?;
    let catalog: Catalog = serde_json::from_str(&content).with_context(|| format!("parsing catalog {:?}", path))?;
    Ok(normalized(catalog))
}

/// The live catalog, reloadable from its file on demand.
pub struct CatalogHandle {
    path: PathBuf,
    current: RwLock<Catalog>,
    fallback: Catalog,
}

impl CatalogHandle {
    /// Ensure the file exists, then load it. A file that cannot be parsed
    /// leaves the embedded catalog in use.
    pub fn open(path: PathBuf) -> Self {
        if let Err(e) = ensure_catalog_file(&path) {
            warn!("{:#}", e);
        }
        let fallback = default_catalog();
        let current = match load_catalog(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Using built-in catalog: {:#}", e);
                fallback.clone()
            }
        };
        info!("Catalog has {} functions", current.len());
        Self {
            path,
            current: RwLock::new(current),
            fallback,
        }
    }

    /// Wrap an already-loaded catalog. `reload` still reads `path`.
    pub fn from_catalog(path: PathBuf, catalog: Catalog) -> Self {
        Self {
            path,
            current: RwLock::new(normalized(catalog)),
            fallback: default_catalog(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Catalog {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Re-read the file, replacing the live catalog. On error the old one stays.
    pub fn reload(&self) -> crate::error::Result<usize> {
        let fresh = load_catalog(&self.path).map_err(|e| CallerError::Storage(format!("{:#}", e)))?;
        let n = fresh.len();
        match self.current.write() {
            Ok(mut guard) => *guard = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }
        info!("Reloaded catalog from {:?}: {} functions", self.path, n);
        Ok(n)
    }

    pub fn find(&self, key: &str) -> Option<FunctionDescriptor> {
        self.snapshot().find(key).cloned()
    }

    /// Look up `function` in the live catalog, then in the embedded one.
    pub fn descriptor_or_default(&self, function: &str) -> crate::error::Result<FunctionDescriptor> {
        if let Some(d) = self.find(function) {
            return Ok(d);
        }
        self.fallback
            .find(function)
            .cloned()
            .ok_or_else(|| CallerError::Catalog(format!("Function '{}' is not in the catalog", function)))
    }
}
