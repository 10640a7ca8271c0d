//! CLI command for listing raw files

use std::path::Path;
use std::sync::Arc;

use crate::cache::PackageCache;
use crate::index::SelectedTypes;
use crate::manager::ResourcePackageManager;

pub fn execute(source: &Path, dir: &str) -> anyhow::Result<()> {
    let manager = ResourcePackageManager::new(Arc::new(PackageCache::new()));
    manager.add_resource(source, SelectedTypes::ALL)?;

    let entries = manager.raw_file_entries(dir)?;
    if entries.is_empty() {
        println!("No raw files under '{dir}'");
        return Ok(());
    }
    let dir = dir.trim_matches('/');
    for name in &entries {
        let full_name = if dir.is_empty() {
            name.clone()
        } else {
            format!("{dir}/{name}")
        };
        let location = manager.find_raw_file(&full_name)?;
        println!("{:>10}  {}", location.length, full_name);
    }
    println!("\n{} file(s)", entries.len());
    Ok(())
}
