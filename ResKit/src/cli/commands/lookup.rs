//! CLI command for resolving one resource against a configuration

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::PackageCache;
use crate::index::{IdItem, ResType};
use crate::manager::{ManagerOptions, ResourcePackageManager};
use crate::package::ResourceQuery;
use crate::res_config::ResConfig;
use crate::resolver::ReferenceResolver;
use crate::settings::Settings;

/// Arguments of `reskit lookup`.
pub struct LookupArgs<'a> {
    pub source: &'a Path,
    pub id: Option<&'a str>,
    pub name: Option<&'a str>,
    pub res_type: Option<&'a str>,
    pub config: &'a str,
    pub density: u32,
    pub overlays: &'a [PathBuf],
    pub system: Option<&'a Path>,
    pub all: bool,
}

fn parse_id(text: &str) -> anyhow::Result<u32> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| anyhow::anyhow!("invalid resource id '{text}'"))
}

fn query_from(args: &LookupArgs<'_>) -> anyhow::Result<ResourceQuery> {
    match (args.id, args.name, args.res_type) {
        (Some(id), _, _) => Ok(ResourceQuery::Id(parse_id(id)?)),
        (None, Some(name), Some(res_type)) => Ok(ResourceQuery::by_name(name, res_type.parse::<ResType>()?)),
        _ => anyhow::bail!("pass --id, or --name together with --type"),
    }
}

fn describe(item: &IdItem) -> String {
    match item.value_str() {
        Some(value) => value.to_string(),
        None => format!("[{}]", item.values().join(", ")),
    }
}

pub fn execute(args: &LookupArgs<'_>, settings: &Settings) -> anyhow::Result<()> {
    let query = query_from(args)?;
    let cache = Arc::new(PackageCache::new().with_format(settings.index_format()?));
    let options = ManagerOptions::from(settings);

    let manager = ResourcePackageManager::with_options(Arc::clone(&cache), options);
    if args.overlays.is_empty() {
        manager.add_resource(args.source, settings.selected_types()?)?;
    } else {
        manager.add_resource_with_overlays(args.source, args.overlays)?;
    }
    if let Some(system_path) = args.system {
        let system = ResourcePackageManager::with_options(cache, options);
        system.add_system_resource(system_path)?;
        manager.attach_system(Arc::new(system))?;
    }
    manager.update_res_config(args.config.parse::<ResConfig>()?)?;

    if args.all {
        let variants = manager.get_variants(&query)?;
        if variants.is_empty() {
            anyhow::bail!("{query} not found");
        }
        for variant in variants {
            let item = variant.value.item()?;
            println!(
                "{:<32} {}  ({})",
                variant.config.qualifier_path(),
                describe(&item),
                variant.package_path().display()
            );
        }
        return Ok(());
    }

    let resolver = ReferenceResolver::new(&manager).with_density(args.density);
    let (variant, _) = resolver.find(&query)?;
    let value = resolver.resolve(query)?;
    println!("Variant: {}", variant.config.qualifier_path());
    println!("Package: {}", variant.package_path().display());
    println!("{value}");

    Ok(())
}
