//! CLI command for summarising an index

use std::path::Path;

use crate::index::DecodeOptions;
use crate::package::{FileSystem, PackageKind, ResourcePackage, StdFileSystem};
use crate::res_config::KeyType;
use crate::settings::Settings;

pub fn execute(source: &Path, ids: bool, settings: &Settings) -> anyhow::Result<()> {
    let fs = StdFileSystem;
    let path = fs.canonicalize(source)?;
    let package = ResourcePackage::load(
        &fs,
        &path,
        PackageKind::APP,
        &DecodeOptions::all(),
        settings.index_format()?,
    )?;
    let table = package.table();

    println!("Index: {}", path.display());
    println!("Layout: {}", table.format());
    println!("Resources: {}", table.len());

    println!("Keys: {}", table.keys().len());
    for (i, key) in table.keys().iter().enumerate() {
        println!("  [{i:>3}] {}", key.config.qualifier_path());
    }

    let limit = table.limit_keys();
    let dimensions: Vec<&str> = KeyType::ALL
        .iter()
        .filter(|key_type| limit & key_type.limit_bit() != 0)
        .map(|key_type| key_type.name())
        .collect();
    println!("Limit keys: {limit:#06x} ({})", dimensions.join(", "));

    let locales: Vec<&str> = table.locales().iter().map(String::as_str).collect();
    if locales.is_empty() {
        println!("Locales: none");
    } else {
        println!("Locales: {}", locales.join(", "));
    }
    println!("Dark variants: {}", if table.has_dark() { "yes" } else { "no" });

    if ids {
        println!();
        for entry in table.entries() {
            let variants = entry.candidates()?.len();
            println!(
                "{:#010x}  {:<10} {} ({} variant{})",
                entry.id,
                entry.res_type.name(),
                entry.name,
                variants,
                if variants == 1 { "" } else { "s" }
            );
        }
    }

    Ok(())
}
