//! Shared system resources
//!
//! [`SystemResources`] builds the system package manager the first time an
//! application asks for it and hands the same instance to every caller while
//! any of them still holds it. Once the last holder drops it, the next request
//! builds a fresh one.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use reskit::cache::PackageCache;
//! use reskit::manager::ResourcePackageManager;
//! use reskit::settings::Settings;
//! use reskit::system::SystemResources;
//!
//! let cache = Arc::new(PackageCache::new());
//! let system = SystemResources::from_settings(&Settings::load_or_default(), Arc::clone(&cache));
//!
//! let app = ResourcePackageManager::new(cache);
//! app.add_resource("entry/resources.index", Default::default())?;
//! system.attach(&app)?;
//! # Ok::<(), reskit::Error>(())
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

use crate::cache::PackageCache;
use crate::error::{Error, Result};
use crate::manager::{ManagerOptions, ResourcePackageManager};
use crate::settings::Settings;

/// Lazily built, shared system resource manager.
#[derive(Debug)]
pub struct SystemResources {
    /// Candidate system packages; the first that exists is used.
    resource_paths: Vec<PathBuf>,
    overlay_paths: Vec<PathBuf>,
    cache: Arc<PackageCache>,
    options: ManagerOptions,
    current: Mutex<Weak<ResourcePackageManager>>,
}

impl SystemResources {
    pub fn new(resource_paths: Vec<PathBuf>, overlay_paths: Vec<PathBuf>, cache: Arc<PackageCache>) -> Self {
        Self {
            resource_paths,
            overlay_paths,
            cache,
            options: ManagerOptions::default(),
            current: Mutex::new(Weak::new()),
        }
    }

    pub fn from_settings(settings: &Settings, cache: Arc<PackageCache>) -> Self {
        let mut system = Self::new(
            settings.system_resource_paths.clone(),
            settings.system_overlay_paths.clone(),
            cache,
        );
        system.options = ManagerOptions::from(settings);
        system
    }

    /// The system package this service would load, if any candidate exists.
    pub fn resource_path(&self) -> Option<&Path> {
        let fs = self.cache.fs();
        self.resource_paths
            .iter()
            .map(PathBuf::as_path)
            .find(|path| fs.exists(path))
    }

    /// Whether a system manager is currently alive.
    pub fn is_loaded(&self) -> bool {
        self.current
            .lock()
            .map(|current| current.strong_count() > 0)
            .unwrap_or(false)
    }

    /// The shared system manager, built on first use.
    pub fn manager(&self) -> Result<Arc<ResourcePackageManager>> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| Error::LockPoisoned("system resources"))?;
        if let Some(manager) = current.upgrade() {
            return Ok(manager);
        }

        let path = self
            .resource_path()
            .ok_or_else(|| Error::NotFound(format!("system resources in {:?}", self.resource_paths)))?;
        let fs = self.cache.fs();
        let overlays = self
            .overlay_paths
            .iter()
            .filter(|overlay| {
                let exists = fs.exists(overlay);
                if !exists {
                    tracing::warn!("System overlay missing: {}", overlay.display());
                }
                exists
            })
            .collect::<Vec<_>>();

        let manager = ResourcePackageManager::with_options(Arc::clone(&self.cache), self.options);
        if overlays.is_empty() {
            manager.add_system_resource(path)?;
        } else {
            manager.add_system_resource_with_overlays(path, &overlays)?;
        }
        tracing::info!(
            "Loaded system resources from {} ({} overlay(s))",
            path.display(),
            overlays.len()
        );

        let manager = Arc::new(manager);
        *current = Arc::downgrade(&manager);
        Ok(manager)
    }

    /// Attach the shared system manager to `app` as its lowest-priority layer.
    pub fn attach(&self, app: &ResourcePackageManager) -> Result<Arc<ResourcePackageManager>> {
        let system = self.manager()?;
        app.attach_system(Arc::clone(&system))?;
        Ok(system)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IdItem, IndexFormat, IndexWriter, ResType, SelectedTypes};
    use crate::res_config::ResConfig;
    use crate::resolver::ReferenceResolver;
    use pretty_assertions::assert_eq;

    const OK_TEXT: u32 = 0x0700_0001;
    const APP_TITLE: u32 = 0x0100_0001;

    fn write_index(path: &Path, values: &[(u32, &str, &str)]) {
        let mut writer = IndexWriter::new();
        let key = writer.add_key(&ResConfig::new()).unwrap();
        for (id, name, value) in values {
            writer.add_value(key, *id, IdItem::single(ResType::String, *name, *value)).unwrap();
        }
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        writer.write_to(path, IndexFormat::Lazy).unwrap();
    }

    #[test]
    fn test_manager_is_shared_while_alive() {
        let dir = tempfile::tempdir().unwrap();
        let system_index = dir.path().join("system/resources.index");
        write_index(&system_index, &[(OK_TEXT, "ok", "OK")]);

        let cache = Arc::new(PackageCache::new());
        let system = SystemResources::new(
            vec![dir.path().join("missing/resources.index"), system_index],
            Vec::new(),
            Arc::clone(&cache),
        );
        assert!(!system.is_loaded());

        let first = system.manager().unwrap();
        let second = system.manager().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(system.is_loaded());
        assert_eq!(cache.load_count(), 1);
        assert!(first.packages().unwrap()[0].kind().system);

        drop(first);
        drop(second);
        assert!(!system.is_loaded());
        system.manager().unwrap();
        assert_eq!(cache.load_count(), 2);
    }

    #[test]
    fn test_no_system_package() {
        let dir = tempfile::tempdir().unwrap();
        let system = SystemResources::new(
            vec![dir.path().join("nothing.index")],
            Vec::new(),
            Arc::new(PackageCache::new()),
        );
        assert!(system.resource_path().is_none());
        assert!(system.manager().unwrap_err().is_not_found());
    }

    #[test]
    fn test_attach_falls_back_to_system() {
        let dir = tempfile::tempdir().unwrap();
        let system_index = dir.path().join("system/resources.index");
        let overlay_index = dir.path().join("system_overlay/resources.index");
        let app_index = dir.path().join("app/resources.index");
        write_index(&system_index, &[(OK_TEXT, "ok", "OK")]);
        write_index(&overlay_index, &[(0x0700_0099, "ok", "Okay")]);
        write_index(&app_index, &[(APP_TITLE, "title", "App")]);

        let cache = Arc::new(PackageCache::new());
        let system = SystemResources::new(vec![system_index], vec![overlay_index], Arc::clone(&cache));
        let app = ResourcePackageManager::new(cache);
        app.add_resource(&app_index, SelectedTypes::ALL).unwrap();
        let shared = system.attach(&app).unwrap();

        assert_eq!(shared.packages().unwrap().len(), 2);
        let resolver = ReferenceResolver::new(&app);
        assert_eq!(resolver.get_string(APP_TITLE).unwrap(), "App");
        // the system overlay's id is remapped onto the system package's
        assert_eq!(resolver.get_string(OK_TEXT).unwrap(), "Okay");
        assert!(app.locales(false).unwrap().is_empty());
    }
}
