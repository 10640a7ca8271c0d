//! Loaded resource packages
//!
//! A [`ResourcePackage`] is one decoded index plus where it came from. Its
//! candidates are handed out as [`QualifierVariant`]s, which carry enough
//! provenance (package path, overlay and system flags) for the manager to
//! rank variants coming from different layers.

pub mod overlay;
pub mod source;

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::error::{Error, Result};
use crate::index::{
    DecodeOptions, IndexFormat, ResType, ResourceTable, TableEntry, ValueHandle, decode_index,
    decoder_for,
};
use crate::res_config::{ColorMode, ResConfig};

pub use overlay::IdRemap;
pub use source::{
    ArchiveReader, FileSystem, StdFileSystem, ZipArchiveReader, is_archive_path, read_index_bytes,
    raw_file_relative,
};

/// How a package takes part in lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PackageKind {
    pub system: bool,
    pub overlay: bool,
}

impl PackageKind {
    pub const APP: PackageKind = PackageKind {
        system: false,
        overlay: false,
    };
    pub const SYSTEM: PackageKind = PackageKind {
        system: true,
        overlay: false,
    };
    pub const OVERLAY: PackageKind = PackageKind {
        system: false,
        overlay: true,
    };
    pub const SYSTEM_OVERLAY: PackageKind = PackageKind {
        system: true,
        overlay: true,
    };
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match (self.system, self.overlay) {
            (false, false) => "app",
            (true, false) => "system",
            (false, true) => "overlay",
            (true, true) => "system overlay",
        })
    }
}

/// Where a package came from. Shared by every variant it produces.
#[derive(Debug)]
pub struct PackageMeta {
    path: PathBuf,
    resources_root: PathBuf,
    kind: PackageKind,
    modified: Option<SystemTime>,
    /// Shared by every kind the same file is loaded as.
    patch: Arc<Mutex<Option<PathBuf>>>,
}

impl PackageMeta {
    pub fn new(path: PathBuf, kind: PackageKind, modified: Option<SystemTime>) -> Self {
        // a bare index sits next to its resources/ directory, an archive is its own root
        let resources_root = if is_archive_path(&path) {
            path.clone()
        } else {
            path.parent().map(Path::to_path_buf).unwrap_or_default()
        };
        Self {
            path,
            resources_root,
            kind,
            modified,
            patch: Arc::new(Mutex::new(None)),
        }
    }

    /// The same file seen as `kind`.
    #[must_use]
    pub fn with_kind(&self, kind: PackageKind) -> Self {
        Self {
            path: self.path.clone(),
            resources_root: self.resources_root.clone(),
            kind,
            modified: self.modified,
            patch: Arc::clone(&self.patch),
        }
    }

    /// Canonical path the package was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory (or archive) that media and raw-file paths are relative to.
    pub fn resources_root(&self) -> &Path {
        &self.resources_root
    }

    pub fn kind(&self) -> PackageKind {
        self.kind
    }

    pub fn is_system(&self) -> bool {
        self.kind.system
    }

    pub fn is_overlay(&self) -> bool {
        self.kind.overlay
    }

    /// Modification time of the package file when it was loaded.
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// Patch package consulted for raw files missing from this one.
    pub fn patch_path(&self) -> Option<PathBuf> {
        self.patch.lock().ok().and_then(|patch| patch.clone())
    }

    pub fn set_patch_path(&self, patch: Option<PathBuf>) -> Result<()> {
        let mut slot = self.patch.lock().map_err(|_| Error::LockPoisoned("package patch"))?;
        *slot = patch;
        Ok(())
    }
}

/// Lookup key for a resource: numeric id or `(name, type)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceQuery {
    Id(u32),
    Name { name: String, res_type: ResType },
}

impl ResourceQuery {
    pub fn by_name(name: impl Into<String>, res_type: ResType) -> Self {
        ResourceQuery::Name {
            name: name.into(),
            res_type,
        }
    }
}

impl fmt::Display for ResourceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceQuery::Id(id) => write!(f, "{id:#010x}"),
            ResourceQuery::Name { name, res_type } => write!(f, "{res_type}/{name}"),
        }
    }
}

impl From<u32> for ResourceQuery {
    fn from(id: u32) -> Self {
        ResourceQuery::Id(id)
    }
}

impl From<(&str, ResType)> for ResourceQuery {
    fn from((name, res_type): (&str, ResType)) -> Self {
        ResourceQuery::by_name(name, res_type)
    }
}

/// One candidate of a resource, as seen from outside its package.
#[derive(Debug, Clone)]
pub struct QualifierVariant {
    /// Id as visible to callers; overlay ids are already remapped.
    pub id: u32,
    pub config: Arc<ResConfig>,
    pub value: ValueHandle,
    pub package: Arc<PackageMeta>,
}

impl QualifierVariant {
    pub fn package_path(&self) -> &Path {
        self.package.path()
    }

    pub fn is_overlay(&self) -> bool {
        self.package.is_overlay()
    }

    pub fn is_system(&self) -> bool {
        self.package.is_system()
    }
}

/// A decoded index and its provenance.
#[derive(Debug, Clone)]
pub struct ResourcePackage {
    meta: Arc<PackageMeta>,
    table: Arc<ResourceTable>,
    remap: Option<Arc<IdRemap>>,
}

impl ResourcePackage {
    pub fn new(meta: PackageMeta, table: ResourceTable) -> Self {
        Self {
            meta: Arc::new(meta),
            table: Arc::new(table),
            remap: None,
        }
    }

    /// Decode `data` as the package at `path`.
    ///
    /// `format` forces a layout; `None` detects it.
    pub fn from_bytes(
        path: PathBuf,
        kind: PackageKind,
        modified: Option<SystemTime>,
        data: Vec<u8>,
        options: &DecodeOptions,
        format: Option<IndexFormat>,
    ) -> Result<Self> {
        let data: Arc<[u8]> = Arc::from(data);
        let table = match format {
            Some(format) => decoder_for(format).decode(data, options)?,
            None => decode_index(data, options)?,
        };
        tracing::info!(
            "Loaded {} package {} ({} resources, {} keys, {})",
            kind,
            path.display(),
            table.len(),
            table.keys().len(),
            table.format()
        );
        Ok(Self::new(PackageMeta::new(path, kind, modified), table))
    }

    /// Read and decode the package at `path`, which should already be canonical.
    pub fn load(
        fs: &dyn FileSystem,
        path: &Path,
        kind: PackageKind,
        options: &DecodeOptions,
        format: Option<IndexFormat>,
    ) -> Result<Self> {
        let data = read_index_bytes(fs, path)?;
        Self::from_bytes(path.to_path_buf(), kind, fs.modified(path), data, options, format)
    }

    pub fn meta(&self) -> &Arc<PackageMeta> {
        &self.meta
    }

    pub fn path(&self) -> &Path {
        self.meta.path()
    }

    pub fn kind(&self) -> PackageKind {
        self.meta.kind()
    }

    pub fn table(&self) -> &ResourceTable {
        &self.table
    }

    /// A handle on the same table taking part in lookups as `kind`.
    #[must_use]
    pub fn with_kind(&self, kind: PackageKind) -> ResourcePackage {
        ResourcePackage {
            meta: Arc::new(self.meta.with_kind(kind)),
            table: Arc::clone(&self.table),
            remap: self.remap.clone(),
        }
    }

    /// Whether two handles share one decoded table.
    pub fn shares_table(&self, other: &ResourcePackage) -> bool {
        Arc::ptr_eq(&self.table, &other.table)
    }

    pub fn has_dark_variant(&self) -> bool {
        self.table.has_dark()
    }

    /// Whether unset color modes read as light for lookups under `active`.
    ///
    /// Only packages that ship dark resources get the stamp, and only when the
    /// application adapts to the system color mode.
    pub fn dark_stamp_for(&self, active: &ResConfig) -> bool {
        active.app_color_mode() && self.has_dark_variant()
    }

    pub fn limit_keys(&self) -> u32 {
        self.table.limit_keys()
    }

    /// Locales this package declares. Overlays never contribute, system
    /// packages only when asked to.
    pub fn locales(&self, include_system: bool) -> BTreeSet<String> {
        if self.meta.is_overlay() || (self.meta.is_system() && !include_system) {
            return BTreeSet::new();
        }
        self.table.locales().clone()
    }

    fn lookup(&self, query: &ResourceQuery) -> Option<&TableEntry> {
        match query {
            ResourceQuery::Id(id) => {
                let table_id = match &self.remap {
                    Some(remap) => remap.to_table(*id)?,
                    None => *id,
                };
                self.table.entry(table_id)
            }
            ResourceQuery::Name { name, res_type } => self.table.entry_by_name(name, *res_type),
        }
    }

    /// Id of a table entry as seen by callers.
    pub fn public_id(&self, table_id: u32) -> u32 {
        self.remap
            .as_ref()
            .map_or(table_id, |remap| remap.to_public(table_id))
    }

    /// Every variant of the queried resource; empty when it is absent.
    ///
    /// With `treat_unset_as_light`, variants without a color mode carry the
    /// light copy of their configuration when the same resource also has a
    /// dark variant.
    pub fn get_variants(
        &self,
        query: &ResourceQuery,
        treat_unset_as_light: bool,
    ) -> Result<Vec<QualifierVariant>> {
        let Some(entry) = self.lookup(query) else {
            return Ok(Vec::new());
        };
        let candidates = entry.candidates()?;
        let keys = self.table.keys();
        let has_dark_sibling = treat_unset_as_light
            && candidates.iter().any(|candidate| {
                keys.get(candidate.key)
                    .is_some_and(|key| key.config.color_mode() == ColorMode::Dark)
            });

        let id = self.public_id(entry.id);
        let mut variants = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let Some(key) = keys.get(candidate.key) else {
                continue;
            };
            let config = if has_dark_sibling {
                Arc::clone(&key.light)
            } else {
                Arc::clone(&key.config)
            };
            variants.push(QualifierVariant {
                id,
                config,
                value: candidate.value.clone(),
                package: Arc::clone(&self.meta),
            });
        }
        Ok(variants)
    }
}
