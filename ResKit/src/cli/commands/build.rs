//! CLI command for building an index from a TOML manifest

use std::path::Path;

use crate::index::{IndexFormat, IndexManifest};

pub fn execute(source: &Path, destination: &Path, lazy: bool) -> anyhow::Result<()> {
    let manifest = IndexManifest::load(source)?;
    let writer = manifest.to_writer()?;
    let format = if lazy { IndexFormat::Lazy } else { IndexFormat::Eager };

    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }
    writer.write_to(destination, format)?;

    println!(
        "Wrote {} index with {} resources and {} keys to {}",
        format,
        manifest.resources.len(),
        writer.key_count(),
        destination.display()
    );
    Ok(())
}
