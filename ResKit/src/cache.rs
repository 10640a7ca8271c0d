//! Process-wide package cache
//!
//! Managers that load the same package share one decoded table. Entries are
//! held weakly: once no manager references a package it is dropped, and the
//! dead entry is cleaned up on the next access or by [`PackageCache::prune`].
//! A changed modification time on disk invalidates an entry.
//!
//! One file loaded as different [`PackageKind`]s is parsed once: every kind
//! gets its own handle on the same decoded table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::SystemTime;

use crate::error::{Error, Result};
use crate::index::{DecodeOptions, IndexFormat, SelectedTypes};
use crate::package::{FileSystem, PackageKind, ResourcePackage, StdFileSystem};
use crate::res_config::ResConfig;

#[derive(Debug)]
struct CacheEntry {
    /// Live handles on one decoded table, one per kind it was loaded as.
    views: HashMap<PackageKind, Weak<ResourcePackage>>,
    modified: Option<SystemTime>,
}

impl CacheEntry {
    fn new(package: &Arc<ResourcePackage>, modified: Option<SystemTime>) -> Self {
        Self {
            views: HashMap::from([(package.kind(), Arc::downgrade(package))]),
            modified,
        }
    }

    fn view(&self, kind: PackageKind) -> Option<Arc<ResourcePackage>> {
        self.views.get(&kind).and_then(Weak::upgrade)
    }

    fn any_view(&self) -> Option<Arc<ResourcePackage>> {
        self.views.values().find_map(Weak::upgrade)
    }

    fn is_live(&self) -> bool {
        self.views.values().any(|view| view.strong_count() > 0)
    }
}

/// Shared cache of decoded packages, keyed by canonical path.
#[derive(Debug)]
pub struct PackageCache {
    fs: Arc<dyn FileSystem>,
    format: Option<IndexFormat>,
    entries: Mutex<HashMap<PathBuf, CacheEntry>>,
    load_count: AtomicUsize,
}

impl Default for PackageCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageCache {
    pub fn new() -> Self {
        Self::with_fs(Arc::new(StdFileSystem))
    }

    pub fn with_fs(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            format: None,
            entries: Mutex::new(HashMap::new()),
            load_count: AtomicUsize::new(0),
        }
    }

    /// Force one index layout instead of detecting it.
    #[must_use]
    pub fn with_format(mut self, format: Option<IndexFormat>) -> Self {
        self.format = format;
        self
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        self.fs.canonicalize(path)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<PathBuf, CacheEntry>>> {
        self.entries.lock().map_err(|_| Error::LockPoisoned("package cache"))
    }

    /// Load the package at `path`, reusing a live cached copy when possible.
    ///
    /// Only complete loads (every type selected) are shared. A filtered load
    /// is decoded against `request` and handed out uncached. Parsing happens
    /// under the cache lock, so concurrent loads of one path parse it once.
    pub fn load(
        &self,
        path: &Path,
        kind: PackageKind,
        selected: SelectedTypes,
        request: Option<&ResConfig>,
    ) -> Result<Arc<ResourcePackage>> {
        let canonical = self.fs.canonicalize(path)?;
        if !selected.is_all() {
            let options = DecodeOptions {
                selected_types: selected,
                request: request.cloned(),
                load_all: true,
                is_update: false,
            };
            let package = self.parse(&canonical, kind, &options)?;
            return Ok(Arc::new(package));
        }

        let modified = self.fs.modified(&canonical);
        let mut entries = self.lock()?;
        if let Some(entry) = entries.get_mut(&canonical) {
            if entry.modified == modified {
                if let Some(package) = entry.view(kind) {
                    tracing::debug!("Package cache hit: {}", canonical.display());
                    return Ok(package);
                }
                if let Some(shared) = entry.any_view() {
                    tracing::debug!("Package cache hit as {}: {}", kind, canonical.display());
                    let package = Arc::new(shared.with_kind(kind));
                    entry.views.insert(kind, Arc::downgrade(&package));
                    return Ok(package);
                }
            } else if entry.is_live() {
                tracing::info!("Package changed on disk, reloading: {}", canonical.display());
            }
        }

        tracing::debug!("Package cache miss: {}", canonical.display());
        let package = Arc::new(self.parse(&canonical, kind, &DecodeOptions::all())?);
        entries.insert(canonical, CacheEntry::new(&package, modified));
        Ok(package)
    }

    fn parse(&self, path: &Path, kind: PackageKind, options: &DecodeOptions) -> Result<ResourcePackage> {
        let package = ResourcePackage::load(self.fs.as_ref(), path, kind, options, self.format)
            .inspect_err(|e| tracing::warn!("Failed to load {}: {}", path.display(), e))?;
        self.load_count.fetch_add(1, Ordering::SeqCst);
        Ok(package)
    }

    /// Live cached package, if any.
    pub fn get(&self, path: &Path, kind: PackageKind) -> Option<Arc<ResourcePackage>> {
        let path = self.fs.canonicalize(path).ok()?;
        let entries = self.lock().ok()?;
        entries.get(&path)?.view(kind)
    }

    /// Forget `path`, whatever kinds it was loaded as. Returns whether it was cached.
    pub fn remove(&self, path: &Path) -> Result<bool> {
        let path = self.fs.canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        Ok(self.lock()?.remove(&path).is_some())
    }

    /// Drop entries whose package is no longer referenced.
    pub fn prune(&self) -> Result<usize> {
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, entry| {
            entry.views.retain(|_, view| view.strong_count() > 0);
            !entry.views.is_empty()
        });
        Ok(before - entries.len())
    }

    /// Record `patch` as the patch package of every live copy of `path`.
    pub fn set_patch(&self, path: &Path, patch: &Path) -> Result<()> {
        let path = self.fs.canonicalize(path)?;
        let entries = self.lock()?;
        // every view of one file shares its patch slot
        match entries.get(&path).and_then(CacheEntry::any_view) {
            Some(package) => package.meta().set_patch_path(Some(patch.to_path_buf())),
            None => Err(Error::NotLoaded(path)),
        }
    }

    /// Number of entries, live or not yet pruned.
    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    /// Number of real parses performed so far.
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }
}
