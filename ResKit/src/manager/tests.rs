use super::*;
use crate::index::{IdItem, IndexFormat, IndexWriter, ResType};
use crate::package::{QualifierVariant, ResourceQuery};
use crate::res_config::{ColorMode, ScreenDensity};
use pretty_assertions::assert_eq;
use std::fs;

const TITLE: u32 = 0x0100_0005;

/// Write an index with one string per `(qualifier, id, name, value)`.
fn write_index(dir: &Path, name: &str, values: &[(&str, u32, &str, &str)]) -> PathBuf {
    let mut writer = IndexWriter::new();
    for (qualifier, id, res_name, value) in values {
        let config = ResConfig::from_qualifier_path(qualifier).unwrap();
        let key = writer.add_key(&config).unwrap();
        writer.add_value(key, *id, IdItem::single(ResType::String, *res_name, *value)).unwrap();
    }
    let root = dir.join(name);
    fs::create_dir_all(&root).unwrap();
    let path = root.join("resources.index");
    writer.write_to(&path, IndexFormat::Lazy).unwrap();
    path
}

fn value_of(variant: &QualifierVariant) -> String {
    variant.value.item().unwrap().value_str().unwrap().to_string()
}

fn manager() -> ResourcePackageManager {
    ResourcePackageManager::new(Arc::new(PackageCache::new()))
}

#[test]
fn test_add_resource_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_index(dir.path(), "app", &[("base", TITLE, "title", "base")]);
    let manager = manager();
    manager.add_resource(&path, SelectedTypes::ALL).unwrap();
    manager.add_resource(&path, SelectedTypes::ALL).unwrap();
    assert_eq!(manager.cache().load_count(), 1);
    assert_eq!(manager.packages().unwrap().len(), 1);
    assert_eq!(manager.loaded_paths().unwrap().len(), 1);
}

#[test]
fn test_locale_selection() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_index(
        dir.path(),
        "app",
        &[
            ("base", TITLE, "title", "Title"),
            ("de", TITLE, "title", "Titel"),
            ("de_DE", TITLE, "title", "Titel (DE)"),
        ],
    );
    let manager = manager();
    manager.add_resource(&path, SelectedTypes::ALL).unwrap();
    let query = ResourceQuery::Id(TITLE);

    let best = manager.find_best_variant(&query, false, 0).unwrap();
    assert_eq!(value_of(&best), "Title");

    manager.update_res_config(ResConfig::new().with_locale_tag("de-DE").unwrap()).unwrap();
    assert_eq!(value_of(&manager.find_best_variant(&query, false, 0).unwrap()), "Titel (DE)");

    manager.update_res_config(ResConfig::new().with_locale_tag("de-AT").unwrap()).unwrap();
    assert_eq!(value_of(&manager.find_best_variant(&query, false, 0).unwrap()), "Titel");

    let by_name = ResourceQuery::by_name("title", ResType::String);
    assert_eq!(value_of(&manager.find_best_variant(&by_name, false, 0).unwrap()), "Titel");
}

#[test]
fn test_override_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_index(
        dir.path(),
        "app",
        &[("base", TITLE, "title", "Title"), ("fr", TITLE, "title", "Titre")],
    );
    let manager = manager();
    manager.add_resource(&path, SelectedTypes::ALL).unwrap();
    manager.update_override_res_config(ResConfig::new().with_locale_tag("fr").unwrap()).unwrap();

    let query = ResourceQuery::Id(TITLE);
    assert_eq!(value_of(&manager.find_best_variant(&query, false, 0).unwrap()), "Title");
    assert_eq!(value_of(&manager.find_best_variant(&query, true, 0).unwrap()), "Titre");
    assert_eq!(
        manager.effective_config(true).unwrap().locale().map(|l| l.to_tag()),
        Some("fr".to_string())
    );
    assert!(manager.res_config().unwrap().locale().is_none());
}

#[test]
fn test_density_selection() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_index(
        dir.path(),
        "app",
        &[
            ("xldpi", TITLE, "icon", "320"),
            ("xxldpi", TITLE, "icon", "480"),
            ("xxxldpi", TITLE, "icon", "640"),
        ],
    );
    let manager = manager();
    manager.add_resource(&path, SelectedTypes::ALL).unwrap();
    let query = ResourceQuery::Id(TITLE);
    assert_eq!(value_of(&manager.find_best_variant(&query, false, 480).unwrap()), "480");

    manager
        .update_res_config(ResConfig::new().with_density(ScreenDensity::Xxxldpi))
        .unwrap();
    assert_eq!(value_of(&manager.find_best_variant(&query, false, 0).unwrap()), "640");

    let err = manager.find_best_variant(&query, false, 333).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn test_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_index(dir.path(), "app", &[("de", TITLE, "title", "Titel")]);
    let manager = manager();
    manager.add_resource(&path, SelectedTypes::ALL).unwrap();
    manager.update_res_config(ResConfig::new().with_locale_tag("en").unwrap()).unwrap();
    assert!(manager.find_best_variant(&ResourceQuery::Id(TITLE), false, 0).unwrap_err().is_not_found());
    assert!(manager.find_best_variant(&ResourceQuery::Id(0x0100_0999), false, 0).unwrap_err().is_not_found());
}

#[test]
fn test_overlay_precedence() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_index(dir.path(), "base", &[("base", TITLE, "title", "base")]);
    let overlay = write_index(dir.path(), "overlay", &[("base", 0x0100_0077, "title", "overlay")]);
    let manager = manager();
    manager.add_resource_with_overlays(&base, &[&overlay]).unwrap();

    let best = manager.find_best_variant(&ResourceQuery::Id(TITLE), false, 0).unwrap();
    assert_eq!(value_of(&best), "overlay");
    assert!(best.is_overlay());
    assert_eq!(best.id, TITLE);

    let loaded = manager.loaded_paths().unwrap();
    let (base_path, overlays) = loaded.get_index(0).unwrap();
    assert_eq!(base_path, &fs::canonicalize(&base).unwrap());
    assert_eq!(overlays, &vec![fs::canonicalize(&overlay).unwrap()]);
}

#[test]
fn test_more_suitable_base_beats_overlay() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_index(
        dir.path(),
        "base",
        &[("base", TITLE, "title", "base"), ("en", TITLE, "title", "base (en)")],
    );
    let overlay = write_index(dir.path(), "overlay", &[("base", TITLE, "title", "overlay")]);
    let manager = manager();
    manager.add_resource_with_overlays(&base, &[&overlay]).unwrap();
    manager.update_res_config(ResConfig::new().with_locale_tag("en").unwrap()).unwrap();
    let best = manager.find_best_variant(&ResourceQuery::Id(TITLE), false, 0).unwrap();
    assert_eq!(value_of(&best), "base (en)");
}

#[test]
fn test_remove_overlays() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_index(dir.path(), "base", &[("base", TITLE, "title", "base")]);
    let overlay = write_index(dir.path(), "overlay", &[("base", TITLE, "title", "overlay")]);
    let manager = manager();
    manager.add_resource(&base, SelectedTypes::ALL).unwrap();

    let none: [&Path; 1] = [&overlay];
    assert!(matches!(manager.remove_resource(&base, &none), Err(Error::InvalidArgument(_))));

    manager.add_app_overlay(&overlay).unwrap();
    assert_eq!(manager.packages().unwrap().len(), 2);
    manager.remove_app_overlay(&overlay).unwrap();
    assert_eq!(manager.packages().unwrap().len(), 1);
    let best = manager.find_best_variant(&ResourceQuery::Id(TITLE), false, 0).unwrap();
    assert_eq!(value_of(&best), "base");

    manager.remove_package(&base).unwrap();
    assert!(manager.packages().unwrap().is_empty());
    assert!(matches!(manager.remove_package(&base), Err(Error::NotLoaded(_))));
}

#[test]
fn test_later_package_wins_ties() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_index(dir.path(), "first", &[("base", TITLE, "title", "first")]);
    let second = write_index(dir.path(), "second", &[("base", TITLE, "title", "second")]);
    let manager = manager();
    manager.add_resource(&first, SelectedTypes::ALL).unwrap();
    manager.add_resource(&second, SelectedTypes::ALL).unwrap();
    let best = manager.find_best_variant(&ResourceQuery::Id(TITLE), false, 0).unwrap();
    assert_eq!(value_of(&best), "second");
    assert_eq!(manager.get_variants(&ResourceQuery::Id(TITLE)).unwrap().len(), 2);
}

#[test]
fn test_base_package_cannot_be_overlay() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_index(dir.path(), "first", &[("base", TITLE, "title", "first")]);
    let second = write_index(dir.path(), "second", &[("base", TITLE, "title", "second")]);
    let manager = manager();
    manager.add_resource(&first, SelectedTypes::ALL).unwrap();
    manager.add_resource(&second, SelectedTypes::ALL).unwrap();
    assert!(matches!(
        manager.add_resource_with_overlays(&first, &[&second]),
        Err(Error::AlreadyLoaded(_))
    ));
    assert_eq!(manager.packages().unwrap().len(), 2);
}

#[test]
fn test_dark_stamping() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_index(
        dir.path(),
        "app",
        &[("base", TITLE, "bg", "light"), ("dark", TITLE, "bg", "dark")],
    );
    let manager = manager();
    manager.add_resource(&path, SelectedTypes::ALL).unwrap();
    assert!(manager.res_config().unwrap().app_dark_res());
    let query = ResourceQuery::Id(TITLE);

    manager
        .update_res_config(ResConfig::new().with_color_mode(ColorMode::Dark).with_app_color_mode(true))
        .unwrap();
    assert_eq!(value_of(&manager.find_best_variant(&query, false, 0).unwrap()), "dark");

    manager
        .update_res_config(ResConfig::new().with_color_mode(ColorMode::Light).with_app_color_mode(true))
        .unwrap();
    let best = manager.find_best_variant(&query, false, 0).unwrap();
    assert_eq!(value_of(&best), "light");
    assert_eq!(best.config.color_mode(), ColorMode::Light);
}

#[test]
fn test_dark_flag_follows_packages() {
    let dir = tempfile::tempdir().unwrap();
    let dark = write_index(
        dir.path(),
        "dark_app",
        &[("base", TITLE, "bg", "light"), ("dark", TITLE, "bg", "dark")],
    );
    let plain = write_index(dir.path(), "plain_app", &[("base", TITLE + 1, "label", "x")]);
    let manager = manager();
    manager.add_resource(&plain, SelectedTypes::ALL).unwrap();
    assert!(!manager.res_config().unwrap().app_dark_res());

    manager.add_resource(&dark, SelectedTypes::ALL).unwrap();
    assert!(manager.res_config().unwrap().app_dark_res());

    manager.remove_package(&dark).unwrap();
    assert!(!manager.res_config().unwrap().app_dark_res());

    // A flag the caller set survives package removal.
    manager
        .update_res_config(ResConfig::new().with_app_dark_res(true))
        .unwrap();
    manager.remove_package(&plain).unwrap();
    assert!(manager.res_config().unwrap().app_dark_res());
}

#[test]
fn test_system_layer_is_consulted_last() {
    let dir = tempfile::tempdir().unwrap();
    let system_path = write_index(
        dir.path(),
        "system",
        &[("base", TITLE, "title", "system"), ("base", 0x0700_0001, "ok", "OK")],
    );
    let app_path = write_index(dir.path(), "app", &[("base", TITLE, "title", "app")]);
    let cache = Arc::new(PackageCache::new());
    let system = Arc::new(ResourcePackageManager::new(Arc::clone(&cache)));
    system.add_system_resource(&system_path).unwrap();
    let app = ResourcePackageManager::new(cache);
    app.add_resource(&app_path, SelectedTypes::ALL).unwrap();
    app.attach_system(system).unwrap();

    assert_eq!(value_of(&app.find_best_variant(&ResourceQuery::Id(TITLE), false, 0).unwrap()), "app");
    let ok = app.find_best_variant(&ResourceQuery::Id(0x0700_0001), false, 0).unwrap();
    assert_eq!(value_of(&ok), "OK");
    assert!(ok.is_system());
}

#[test]
fn test_system_layers_do_not_nest() {
    let cache = Arc::new(PackageCache::new());
    let outer = Arc::new(ResourcePackageManager::new(Arc::clone(&cache)));
    let inner = Arc::new(ResourcePackageManager::new(Arc::clone(&cache)));
    let app = ResourcePackageManager::new(Arc::clone(&cache));

    inner.attach_system(Arc::clone(&outer)).unwrap();
    assert!(matches!(app.attach_system(Arc::clone(&inner)), Err(Error::InvalidArgument(_))));
    // The reverse link would close a cycle.
    assert!(matches!(outer.attach_system(inner), Err(Error::InvalidArgument(_))));
    assert!(matches!(outer.attach_system(Arc::clone(&outer)), Err(Error::InvalidArgument(_))));
    app.attach_system(outer).unwrap();
}

#[test]
fn test_limit_keys_and_locales() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_index(
        dir.path(),
        "app",
        &[("base", TITLE, "title", "t"), ("zh_CN", TITLE, "title", "t"), ("dark", TITLE, "title", "t")],
    );
    let manager = manager();
    manager.add_resource(&path, SelectedTypes::ALL).unwrap();
    let locales = manager.locales(false).unwrap();
    assert!(locales.contains("zh-CN"));
    assert_eq!(locales.len(), 1);
    assert_ne!(manager.limit_keys().unwrap(), 0);
}

#[test]
fn test_raw_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_index(dir.path(), "app", &[("base", TITLE, "title", "t")]);
    let raw = dir.path().join("app/resources/rawfile");
    fs::create_dir_all(&raw).unwrap();
    fs::write(raw.join("config.json"), b"{}").unwrap();

    let manager = manager();
    manager.add_resource(&path, SelectedTypes::ALL).unwrap();
    assert_eq!(manager.find_raw_file("config.json").unwrap().length, 2);
    assert_eq!(manager.raw_file_entries("").unwrap(), vec!["config.json".to_string()]);
    let descriptor = manager.open_raw_file("config.json").unwrap();
    assert_eq!(descriptor.read_all().unwrap(), b"{}");
    assert!(manager.close_raw_file("config.json").unwrap());
    assert!(manager.find_raw_file("missing.json").unwrap_err().is_not_found());
}

#[test]
fn test_invalid_config_rejected() {
    let manager = manager();
    let err = manager.update_res_config(ResConfig::new().with_mcc_mnc(0, 1)).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}
