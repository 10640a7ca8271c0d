//! Layered resource lookup over several packages
//!
//! A [`ResourcePackageManager`] owns an ordered list of packages (the
//! application package, its overlays and optionally a shared system layer)
//! together with the active and override configurations. Lookups take a
//! shared read lock; loading, removal and config updates take the write lock.
//!
//! Packages come from a [`PackageCache`], so two managers that load the same
//! path share one decoded table.

mod lookup;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;

use crate::cache::PackageCache;
use crate::error::{Error, Result};
use crate::index::SelectedTypes;
use crate::package::{PackageKind, ResourcePackage};
use crate::plural::{PluralCache, PluralRuleProvider, SimplePluralRules};
use crate::raw_file::RawFileCache;
use crate::res_config::{DefaultLocaleMatcher, LocaleMatcher, ResConfig};
use crate::settings::{DEFAULT_MAX_REFERENCE_DEPTH, DEFAULT_PLURAL_CACHE_SIZE, Settings};

/// Tunables a manager is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerOptions {
    pub max_reference_depth: usize,
    pub plural_cache_size: usize,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            max_reference_depth: DEFAULT_MAX_REFERENCE_DEPTH,
            plural_cache_size: DEFAULT_PLURAL_CACHE_SIZE,
        }
    }
}

impl From<&Settings> for ManagerOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            max_reference_depth: settings.max_reference_depth.max(1),
            plural_cache_size: settings.plural_cache_size,
        }
    }
}

/// One package in the lookup order.
#[derive(Debug, Clone)]
pub(crate) struct Layer {
    pub(crate) package: Arc<ResourcePackage>,
    /// Unset color modes read as light for this package.
    pub(crate) treat_unset_as_light: bool,
}

#[derive(Debug, Default)]
struct ManagerState {
    /// Load order; later layers win ties.
    layers: Vec<Layer>,
    /// Base package path to the overlay paths loaded with it.
    loaded_paths: IndexMap<PathBuf, Vec<PathBuf>>,
    active: ResConfig,
    /// `app_dark_res` as the caller last set it.
    declared_dark_res: bool,
    override_config: ResConfig,
    system: Option<Arc<ResourcePackageManager>>,
}

impl ManagerState {
    fn contains(&self, path: &Path) -> bool {
        self.layers.iter().any(|layer| layer.package.path() == path)
    }

    /// Re-apply dark stamping after the active config or the layers changed.
    fn restamp(&mut self) {
        let has_dark_res = self
            .layers
            .iter()
            .any(|layer| !layer.package.kind().system && layer.package.has_dark_variant());
        self.active
            .set_app_dark_res(self.declared_dark_res || has_dark_res);
        for layer in &mut self.layers {
            layer.treat_unset_as_light = layer.package.dark_stamp_for(&self.active);
        }
    }

    fn push(&mut self, package: Arc<ResourcePackage>) {
        self.layers.push(Layer {
            package,
            treat_unset_as_light: false,
        });
        self.restamp();
    }
}

/// Configuration-aware resource lookup across a stack of packages.
pub struct ResourcePackageManager {
    state: RwLock<ManagerState>,
    cache: Arc<PackageCache>,
    matcher: Arc<dyn LocaleMatcher>,
    options: ManagerOptions,
    plurals: PluralCache,
    raw_files: RawFileCache,
}

impl fmt::Debug for ResourcePackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layers = self.state.read().map(|state| state.layers.len()).unwrap_or_default();
        f.debug_struct("ResourcePackageManager")
            .field("layers", &layers)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ResourcePackageManager {
    pub fn new(cache: Arc<PackageCache>) -> Self {
        Self::with_options(cache, ManagerOptions::default())
    }

    pub fn with_options(cache: Arc<PackageCache>, options: ManagerOptions) -> Self {
        Self {
            state: RwLock::new(ManagerState::default()),
            cache,
            matcher: Arc::new(DefaultLocaleMatcher),
            options,
            plurals: PluralCache::new(Arc::new(SimplePluralRules), options.plural_cache_size),
            raw_files: RawFileCache::new(),
        }
    }

    #[must_use]
    pub fn with_locale_matcher(mut self, matcher: Arc<dyn LocaleMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    #[must_use]
    pub fn with_plural_rules(mut self, provider: Arc<dyn PluralRuleProvider>) -> Self {
        self.plurals = PluralCache::new(provider, self.options.plural_cache_size);
        self
    }

    pub fn options(&self) -> ManagerOptions {
        self.options
    }

    pub fn cache(&self) -> &Arc<PackageCache> {
        &self.cache
    }

    pub fn matcher(&self) -> &dyn LocaleMatcher {
        self.matcher.as_ref()
    }

    pub fn plurals(&self) -> &PluralCache {
        &self.plurals
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, ManagerState>> {
        self.state.read().map_err(|_| Error::LockPoisoned("resource manager"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, ManagerState>> {
        self.state.write().map_err(|_| Error::LockPoisoned("resource manager"))
    }

    // ==================== Loading ====================

    /// Load the package at `path` and append it to the lookup order.
    ///
    /// Loading a path that is already loaded with every type selected is a
    /// no-op.
    pub fn add_resource<P: AsRef<Path>>(&self, path: P, selected: SelectedTypes) -> Result<()> {
        self.add_with_kind(path.as_ref(), PackageKind::APP, selected)
    }

    /// Load a system package into this manager.
    pub fn add_system_resource<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.add_with_kind(path.as_ref(), PackageKind::SYSTEM, SelectedTypes::ALL)
    }

    fn add_with_kind(&self, path: &Path, kind: PackageKind, selected: SelectedTypes) -> Result<()> {
        let canonical = self.cache.canonicalize(path)?;
        let mut state = self.write()?;
        if selected.is_all() && state.contains(&canonical) {
            tracing::debug!("Already loaded: {}", canonical.display());
            return Ok(());
        }
        let package = self.cache.load(&canonical, kind, selected, Some(&state.active))?;
        state.push(package);
        state.loaded_paths.entry(canonical).or_default();
        Ok(())
    }

    /// Load a base package followed by its overlays.
    ///
    /// Overlay ids are remapped onto the base package's ids by `(type, name)`
    /// and every overlay lands after the base in the lookup order.
    pub fn add_resource_with_overlays<P, Q>(&self, path: P, overlays: &[Q]) -> Result<()>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        self.add_layered(path.as_ref(), overlays, PackageKind::APP)
    }

    /// Load a system package followed by its overlays.
    pub fn add_system_resource_with_overlays<P, Q>(&self, path: P, overlays: &[Q]) -> Result<()>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        self.add_layered(path.as_ref(), overlays, PackageKind::SYSTEM)
    }

    fn add_layered<Q: AsRef<Path>>(&self, path: &Path, overlays: &[Q], kind: PackageKind) -> Result<()> {
        let overlay_kind = if kind.system {
            PackageKind::SYSTEM_OVERLAY
        } else {
            PackageKind::OVERLAY
        };
        let canonical = self.cache.canonicalize(path)?;
        let mut state = self.write()?;
        let existing = state
            .layers
            .iter()
            .find(|layer| layer.package.path() == canonical && !layer.package.kind().overlay)
            .map(|layer| Arc::clone(&layer.package));
        let base = match existing {
            Some(package) => package,
            None => {
                let package = self.cache.load(&canonical, kind, SelectedTypes::ALL, None)?;
                state.push(Arc::clone(&package));
                package
            }
        };
        let mapping = base.name_type_id_mapping();

        // load every overlay before pushing any, so one bad overlay adds none
        let mut loaded = Vec::new();
        for overlay in overlays {
            let overlay_path = self.cache.canonicalize(overlay.as_ref())?;
            if state.contains(&overlay_path) {
                let loaded_as_base = state
                    .layers
                    .iter()
                    .any(|layer| layer.package.path() == overlay_path && !layer.package.kind().overlay);
                if loaded_as_base {
                    return Err(Error::AlreadyLoaded(overlay_path));
                }
                tracing::debug!("Overlay already loaded: {}", overlay_path.display());
                continue;
            }
            let package = self.cache.load(&overlay_path, overlay_kind, SelectedTypes::ALL, None)?;
            loaded.push((overlay_path, Arc::new(package.with_remapped_ids(&mapping))));
        }

        let recorded = state.loaded_paths.entry(canonical).or_default();
        for (overlay_path, _) in &loaded {
            if !recorded.contains(overlay_path) {
                recorded.push(overlay_path.clone());
            }
        }
        for (overlay_path, package) in loaded {
            tracing::info!("Added overlay {} over {}", overlay_path.display(), base.path().display());
            state.push(package);
        }
        Ok(())
    }

    /// Add an overlay over the application package.
    pub fn add_app_overlay<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let base = {
            let state = self.read()?;
            state
                .layers
                .iter()
                .find(|layer| layer.package.kind() == PackageKind::APP)
                .map(|layer| layer.package.path().to_path_buf())
        };
        match base {
            Some(base) => self.add_resource_with_overlays(base, &[path]),
            None => Err(Error::NotLoaded(path.as_ref().to_path_buf())),
        }
    }

    /// Remove an overlay added with [`add_app_overlay`](Self::add_app_overlay).
    pub fn remove_app_overlay<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let overlay = self.cache.canonicalize(path.as_ref())?;
        let base = {
            let state = self.read()?;
            state
                .loaded_paths
                .iter()
                .find(|(_, overlays)| overlays.contains(&overlay))
                .map(|(base, _)| base.clone())
        };
        match base {
            Some(base) => self.remove_resource(base, &[overlay]),
            None => Err(Error::NotLoaded(overlay)),
        }
    }

    /// Remove overlays loaded over the base package at `path`.
    ///
    /// Fails when the base has no overlays recorded.
    pub fn remove_resource<P, Q>(&self, path: P, overlays: &[Q]) -> Result<()>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let base = self.cache.canonicalize(path.as_ref())?;
        let overlays = overlays
            .iter()
            .map(|overlay| {
                self.cache
                    .canonicalize(overlay.as_ref())
                    .unwrap_or_else(|_| overlay.as_ref().to_path_buf())
            })
            .collect::<Vec<_>>();

        let mut state = self.write()?;
        let Some(recorded) = state.loaded_paths.get_mut(&base) else {
            return Err(Error::NotLoaded(base));
        };
        if recorded.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "{} has no overlays to remove",
                base.display()
            )));
        }
        recorded.retain(|overlay| !overlays.contains(overlay));
        state
            .layers
            .retain(|layer| !(layer.package.kind().overlay && overlays.iter().any(|o| o == layer.package.path())));
        tracing::info!("Removed {} overlay(s) from {}", overlays.len(), base.display());
        state.restamp();
        Ok(())
    }

    /// Remove a package and every overlay recorded for it.
    pub fn remove_package<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let base = self.cache.canonicalize(path.as_ref())?;
        let mut state = self.write()?;
        let Some(overlays) = state.loaded_paths.shift_remove(&base) else {
            return Err(Error::NotLoaded(base));
        };
        state.layers.retain(|layer| {
            let path = layer.package.path();
            path != base && !overlays.iter().any(|o| o == path)
        });
        tracing::info!("Removed {}", base.display());
        state.restamp();
        Ok(())
    }

    /// Consult `system`'s packages after every package of this manager.
    pub fn attach_system(&self, system: Arc<ResourcePackageManager>) -> Result<()> {
        if std::ptr::eq(system.as_ref(), self) {
            return Err(Error::InvalidArgument("a manager cannot be its own system layer".to_string()));
        }
        // System layers are one level deep, which also rules out cycles.
        if system.read()?.system.is_some() {
            return Err(Error::InvalidArgument(
                "the system manager already has a system layer".to_string(),
            ));
        }
        self.write()?.system = Some(system);
        Ok(())
    }

    // ==================== Configuration ====================

    /// Replace the active configuration.
    pub fn update_res_config(&self, config: ResConfig) -> Result<()> {
        if !config.is_valid() {
            return Err(Error::InvalidArgument(format!("invalid configuration {config}")));
        }
        let mut state = self.write()?;
        tracing::debug!("Active config {} -> {}", state.active, config);
        state.declared_dark_res = config.app_dark_res();
        state.active = config;
        state.restamp();
        Ok(())
    }

    /// Replace the override configuration used by override-aware lookups.
    pub fn update_override_res_config(&self, config: ResConfig) -> Result<()> {
        if !config.is_valid() {
            return Err(Error::InvalidArgument(format!("invalid override configuration {config}")));
        }
        let mut state = self.write()?;
        tracing::debug!("Override config {} -> {}", state.override_config, config);
        state.override_config = config;
        Ok(())
    }

    pub fn res_config(&self) -> Result<ResConfig> {
        Ok(self.read()?.active.clone())
    }

    pub fn override_res_config(&self) -> Result<ResConfig> {
        Ok(self.read()?.override_config.clone())
    }

    /// Configuration lookups run against; `None` if the state is unavailable.
    pub fn effective_config(&self, use_override: bool) -> Option<ResConfig> {
        let state = self.read().ok()?;
        Some(Self::effective(&state, use_override))
    }

    fn effective(state: &ManagerState, use_override: bool) -> ResConfig {
        if use_override {
            state.active.merge_override(&state.override_config)
        } else {
            state.active.clone()
        }
    }

    // ==================== Listing ====================

    /// Base paths in load order with the overlays loaded over each.
    pub fn loaded_paths(&self) -> Result<IndexMap<PathBuf, Vec<PathBuf>>> {
        Ok(self.read()?.loaded_paths.clone())
    }

    /// Packages in load order, system layer excluded.
    pub fn packages(&self) -> Result<Vec<Arc<ResourcePackage>>> {
        Ok(self
            .read()?
            .layers
            .iter()
            .map(|layer| Arc::clone(&layer.package))
            .collect())
    }

    /// Effective configuration plus the layers in lookup priority order: own
    /// layers newest first, then the system layer.
    ///
    /// The system manager is only read after this manager's lock is released.
    fn lookup_layers(&self, use_override: bool) -> Result<(ResConfig, Vec<Layer>)> {
        let (config, active, mut layers, system) = {
            let state = self.read()?;
            (
                Self::effective(&state, use_override),
                state.active.clone(),
                state.layers.iter().rev().cloned().collect::<Vec<_>>(),
                state.system.clone(),
            )
        };
        if let Some(system) = system {
            let system_layers: Vec<Layer> = system.read()?.layers.iter().rev().cloned().collect();
            layers.extend(system_layers.into_iter().map(|layer| Layer {
                treat_unset_as_light: layer.package.dark_stamp_for(&active),
                package: layer.package,
            }));
        }
        Ok((config, layers))
    }
}

#[cfg(test)]
mod tests;
