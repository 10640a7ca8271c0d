//! Managers over real files: sharing, archives, overlays and references

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::thread;

use pretty_assertions::assert_eq;
use reskit::prelude::*;
use tempfile::tempdir;
use zip::write::SimpleFileOptions;

const TITLE: u32 = 0x0100_0000;
const ACCENT: u32 = 0x0100_0001;
const ICON: u32 = 0x0100_0002;

fn index_bytes(entries: &[(&str, u32, IdItem)], format: IndexFormat) -> Vec<u8> {
    let mut writer = IndexWriter::new();
    for (qualifier, id, item) in entries {
        let key = writer.add_key(&qualifier.parse::<ResConfig>().unwrap()).unwrap();
        writer.add_value(key, *id, item.clone()).unwrap();
    }
    writer.to_bytes(format).unwrap()
}

fn app_entries() -> Vec<(&'static str, u32, IdItem)> {
    vec![
        ("base", TITLE, IdItem::single(ResType::String, "title", "Notes")),
        ("fr", TITLE, IdItem::single(ResType::String, "title", "Notes (fr)")),
        ("base", ACCENT, IdItem::single(ResType::Color, "accent", "#336699")),
        ("dark", ACCENT, IdItem::single(ResType::Color, "accent", "#99ccff")),
        ("base", ICON, IdItem::single(ResType::Media, "icon", "resources/base/media/icon.png")),
    ]
}

fn write_app(dir: &Path, name: &str) -> PathBuf {
    let root = dir.join(name);
    std::fs::create_dir_all(&root).unwrap();
    let path = root.join("resources.index");
    std::fs::write(&path, index_bytes(&app_entries(), IndexFormat::Lazy)).unwrap();
    path
}

#[test]
fn concurrent_loads_share_one_parse() {
    let dir = tempdir().unwrap();
    let path = write_app(dir.path(), "app");
    let cache = Arc::new(PackageCache::new());
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            let path = path.clone();
            thread::spawn(move || {
                let manager = ResourcePackageManager::new(cache);
                barrier.wait();
                manager.add_resource(&path, SelectedTypes::ALL).unwrap();
                manager
            })
        })
        .collect();
    let managers: Vec<ResourcePackageManager> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(cache.load_count(), 1);
    let first = managers[0].packages().unwrap();
    let second = managers[1].packages().unwrap();
    assert!(Arc::ptr_eq(&first[0], &second[0]));
    assert!(first[0].shares_table(&second[0]));
}

#[test]
fn repeated_add_is_a_no_op() {
    let dir = tempdir().unwrap();
    let path = write_app(dir.path(), "app");
    let manager = ResourcePackageManager::new(Arc::new(PackageCache::new()));
    for _ in 0..3 {
        manager.add_resource(&path, SelectedTypes::ALL).unwrap();
    }
    assert_eq!(manager.packages().unwrap().len(), 1);
    assert_eq!(manager.cache().load_count(), 1);
}

#[test]
fn dark_mode_and_locale_lookup() {
    let dir = tempdir().unwrap();
    let path = write_app(dir.path(), "app");
    let manager = ResourcePackageManager::new(Arc::new(PackageCache::new()));
    manager.add_resource(&path, SelectedTypes::ALL).unwrap();
    manager.update_res_config(ResConfig::app_default()).unwrap();
    let resolver = ReferenceResolver::new(&manager);

    assert_eq!(resolver.get_color(ACCENT).unwrap(), 0xFF33_6699);

    manager
        .update_res_config(
            ResConfig::new()
                .with_locale_tag("fr-FR")
                .unwrap()
                .with_color_mode(ColorMode::Dark)
                .with_app_color_mode(true),
        )
        .unwrap();
    assert_eq!(resolver.get_color(ACCENT).unwrap(), 0xFF99_CCFF);
    assert_eq!(resolver.get_string(("title", ResType::String)).unwrap(), "Notes (fr)");
}

#[test]
fn overlay_replaces_base_value() {
    let dir = tempdir().unwrap();
    let base = write_app(dir.path(), "app");
    let overlay_root = dir.path().join("theme");
    std::fs::create_dir_all(&overlay_root).unwrap();
    let overlay = overlay_root.join("resources.index");
    // overlay ids differ from the base; they are matched by name and type
    std::fs::write(
        &overlay,
        index_bytes(
            &[("base", 0x0200_0010, IdItem::single(ResType::Color, "accent", "#ff0000"))],
            IndexFormat::Eager,
        ),
    )
    .unwrap();

    let manager = ResourcePackageManager::new(Arc::new(PackageCache::new()));
    manager.add_resource_with_overlays(&base, &[&overlay]).unwrap();
    manager.update_res_config(ResConfig::app_default()).unwrap();
    let resolver = ReferenceResolver::new(&manager);
    assert_eq!(resolver.get_color(ACCENT).unwrap(), 0xFFFF_0000);
    assert_eq!(resolver.get_string(TITLE).unwrap(), "Notes");

    manager.remove_resource(&base, &[&overlay]).unwrap();
    assert_eq!(resolver.get_color(ACCENT).unwrap(), 0xFF33_6699);
    assert!(matches!(
        manager.remove_resource(&base, &[&overlay]),
        Err(Error::InvalidArgument(_))
    ));
}

fn build_hap(index: &[u8], raw_files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    writer.start_file("module.json", options).unwrap();
    writer.write_all(br#"{"module": {"name": "entry"}}"#).unwrap();
    writer.start_file("resources.index", options).unwrap();
    writer.write_all(index).unwrap();
    for (name, data) in raw_files {
        writer.start_file(format!("resources/rawfile/{name}"), options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[test]
fn hap_archive_package() {
    let dir = tempdir().unwrap();
    let hap = dir.path().join("entry.hap");
    let index = index_bytes(&app_entries(), IndexFormat::Eager);
    std::fs::write(&hap, build_hap(&index, &[("config/app.json", b"{\"debug\": true}")])).unwrap();

    let manager = ResourcePackageManager::new(Arc::new(PackageCache::new()));
    manager.add_resource(&hap, SelectedTypes::ALL).unwrap();
    let resolver = ReferenceResolver::new(&manager);
    assert_eq!(resolver.get_string(TITLE).unwrap(), "Notes");

    let canonical = std::fs::canonicalize(&hap).unwrap();
    assert_eq!(
        resolver.get_media_path(ICON).unwrap(),
        canonical.join("resources/base/media/icon.png")
    );

    assert_eq!(manager.raw_file_entries("config").unwrap(), vec!["app.json".to_string()]);
    let descriptor = manager.open_raw_file("config/app.json").unwrap();
    assert_eq!(descriptor.read_all().unwrap(), b"{\"debug\": true}");
    assert!(manager.close_raw_file("config/app.json").unwrap());
    assert!(manager.find_raw_file("config/missing.json").unwrap_err().is_not_found());
}

#[test]
fn reference_depth_limit_through_manager() {
    let depth = ManagerOptions::default().max_reference_depth as u32;
    let build = |links: u32| {
        (0..=links)
            .map(|i| {
                let value = if i == links {
                    "done".to_string()
                } else {
                    format!("$string:{}", TITLE + i + 1)
                };
                ("base", TITLE + i, IdItem::single(ResType::String, format!("link_{i}"), value))
            })
            .collect::<Vec<_>>()
    };

    for (links, ok) in [(depth, true), (depth + 1, false)] {
        let dir = tempdir().unwrap();
        let path = dir.path().join("resources.index");
        std::fs::write(&path, index_bytes(&build(links), IndexFormat::Lazy)).unwrap();
        let manager = ResourcePackageManager::new(Arc::new(PackageCache::new()));
        manager.add_resource(&path, SelectedTypes::ALL).unwrap();

        let resolved = ReferenceResolver::new(&manager).get_string(TITLE);
        if ok {
            assert_eq!(resolved.unwrap(), "done");
        } else {
            assert!(matches!(resolved, Err(Error::ReferenceTooDeep { .. })));
        }
    }
}
