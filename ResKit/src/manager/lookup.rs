//! Variant selection and read-only queries

use std::collections::BTreeSet;
use std::sync::Arc;

use super::{Layer, ResourcePackageManager};
use crate::error::{Error, Result};
use crate::package::{QualifierVariant, ResourceQuery};
use crate::raw_file::{self, RawFileDescriptor, RawFileLocation};
use crate::res_config::ResConfig;
use crate::res_config::qualifier::validate_density;

/// Running best of one partition (base or overlay).
fn keep_best(
    best: &mut Option<QualifierVariant>,
    variant: QualifierVariant,
    manager: &ResourcePackageManager,
    config: &ResConfig,
    density: u32,
) {
    let replace = match best {
        None => true,
        Some(current) => variant.config.is_more_suitable_with(
            manager.matcher(),
            &current.config,
            Some(config),
            density,
        ),
    };
    if replace {
        *best = Some(variant);
    }
}

impl ResourcePackageManager {
    /// The variant of `query` that best fits the effective configuration.
    ///
    /// Every layer is scanned, newest first, so among equally suitable
    /// variants the most recently loaded package wins. Overlay variants
    /// compete separately and replace the base winner unless the base winner
    /// is strictly more suitable. `density` is `0` (use the configuration's
    /// own density) or one of the density buckets.
    pub fn find_best_variant(
        &self,
        query: &ResourceQuery,
        use_override: bool,
        density: u32,
    ) -> Result<QualifierVariant> {
        validate_density(density)?;
        let (config, layers) = self.lookup_layers(use_override)?;

        let mut base_best = None;
        let mut overlay_best = None;
        for Layer {
            package,
            treat_unset_as_light,
        } in layers
        {
            let variants = match package.get_variants(query, treat_unset_as_light) {
                Ok(variants) => variants,
                Err(e) => {
                    tracing::warn!("Skipping {} for {}: {}", package.path().display(), query, e);
                    continue;
                }
            };
            for variant in variants {
                if !config.matches_with(self.matcher(), &variant.config, true) {
                    continue;
                }
                let slot = if variant.is_overlay() {
                    &mut overlay_best
                } else {
                    &mut base_best
                };
                keep_best(slot, variant, self, &config, density);
            }
        }

        match (base_best, overlay_best) {
            (Some(base), Some(overlay)) => {
                if base
                    .config
                    .is_more_suitable_with(self.matcher(), &overlay.config, Some(&config), density)
                {
                    Ok(base)
                } else {
                    Ok(overlay)
                }
            }
            (Some(best), None) | (None, Some(best)) => Ok(best),
            (None, None) => Err(Error::NotFound(format!("{query} for config {config}"))),
        }
    }

    /// Every variant of `query` in every layer, newest layer first.
    pub fn get_variants(&self, query: &ResourceQuery) -> Result<Vec<QualifierVariant>> {
        let (_, layers) = self.lookup_layers(false)?;
        let mut variants = Vec::new();
        for layer in layers {
            variants.extend(layer.package.get_variants(query, layer.treat_unset_as_light)?);
        }
        Ok(variants)
    }

    /// Union of the key dimensions used by every loaded package.
    pub fn limit_keys(&self) -> Result<u32> {
        let (_, layers) = self.lookup_layers(false)?;
        Ok(layers
            .iter()
            .fold(0, |bits, layer| bits | layer.package.limit_keys()))
    }

    /// Locales declared by the loaded packages.
    pub fn locales(&self, include_system: bool) -> Result<BTreeSet<String>> {
        let (_, layers) = self.lookup_layers(false)?;
        let mut locales = BTreeSet::new();
        for layer in layers {
            locales.extend(layer.package.locales(include_system));
        }
        Ok(locales)
    }

    // ==================== Raw files ====================

    /// Locate raw file `name` in the newest application package that has it.
    pub fn find_raw_file(&self, name: &str) -> Result<RawFileLocation> {
        let packages = {
            let state = self.read()?;
            state
                .layers
                .iter()
                .rev()
                .filter(|layer| !layer.package.kind().system)
                .map(|layer| Arc::clone(layer.package.meta()))
                .collect::<Vec<_>>()
        };
        let fs = self.cache.fs();
        for meta in packages {
            match raw_file::find_raw_file(fs.as_ref(), &meta, name) {
                Ok(location) => return Ok(location),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Err(Error::NotFound(format!("raw file {name}")))
    }

    /// Open raw file `name`, reusing a descriptor that is still open.
    pub fn open_raw_file(&self, name: &str) -> Result<Arc<RawFileDescriptor>> {
        let location = self.find_raw_file(name)?;
        self.raw_files.open(name, location)
    }

    /// Release a descriptor from [`open_raw_file`](Self::open_raw_file).
    pub fn close_raw_file(&self, name: &str) -> Result<bool> {
        self.raw_files.close(name)
    }

    /// Raw files below `dir` across the application packages, deduplicated.
    pub fn raw_file_entries(&self, dir: &str) -> Result<Vec<String>> {
        let packages = self.packages()?;
        let fs = self.cache.fs();
        let mut entries = BTreeSet::new();
        for package in packages.iter().filter(|package| !package.kind().system) {
            entries.extend(raw_file::list_raw_files(fs.as_ref(), package.meta(), dir)?);
        }
        Ok(entries.into_iter().collect())
    }
}
