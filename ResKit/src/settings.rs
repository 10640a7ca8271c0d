//! Persisted settings for `ResKit`

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::{IndexFormat, ResType, SelectedTypes};

/// Default reference and parent-chain depth limit.
pub const DEFAULT_MAX_REFERENCE_DEPTH: usize = 20;
/// Default number of languages whose plural rules stay cached.
pub const DEFAULT_PLURAL_CACHE_SIZE: usize = 3;

const SETTINGS_DIR: &str = "reskit";
const SETTINGS_FILE: &str = "reskit.toml";

// Default value functions for serde
fn default_index_format() -> String {
    "auto".to_string()
}
fn default_max_reference_depth() -> usize {
    DEFAULT_MAX_REFERENCE_DEPTH
}
fn default_plural_cache_size() -> usize {
    DEFAULT_PLURAL_CACHE_SIZE
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Settings shared by the CLI and by managers built from a settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// `auto`, `eager` or `lazy`
    #[serde(default = "default_index_format")]
    pub index_format: String,
    /// Resource type names to load; empty loads everything
    #[serde(default)]
    pub selected_types: Vec<String>,
    /// Candidate system packages, first existing one wins
    #[serde(default)]
    pub system_resource_paths: Vec<PathBuf>,
    #[serde(default)]
    pub system_overlay_paths: Vec<PathBuf>,
    #[serde(default = "default_max_reference_depth")]
    pub max_reference_depth: usize,
    #[serde(default = "default_plural_cache_size")]
    pub plural_cache_size: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_format: default_index_format(),
            selected_types: Vec::new(),
            system_resource_paths: Vec::new(),
            system_overlay_paths: Vec::new(),
            max_reference_depth: default_max_reference_depth(),
            plural_cache_size: default_plural_cache_size(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// `<config dir>/reskit/reskit.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(SETTINGS_DIR).join(SETTINGS_FILE))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let settings = Self::from_toml_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Settings from the default location, or defaults if there are none.
    pub fn load_or_default() -> Self {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path).unwrap_or_else(|e| {
                tracing::warn!("Ignoring settings at {}: {}", path.display(), e);
                Self::default()
            }),
            _ => Self::default(),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.index_format()?;
        self.selected_types()?;
        self.log_level()?;
        if self.max_reference_depth == 0 {
            return Err(Error::Config("max_reference_depth must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Forced layout, `None` for auto-detection.
    pub fn index_format(&self) -> Result<Option<IndexFormat>> {
        if self.index_format.eq_ignore_ascii_case("auto") {
            return Ok(None);
        }
        self.index_format
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("unknown index_format '{}'", self.index_format)))
    }

    pub fn log_level(&self) -> Result<tracing::Level> {
        self.log_level
            .parse()
            .map_err(|_| Error::Config(format!("unknown log_level '{}'", self.log_level)))
    }

    pub fn selected_types(&self) -> Result<SelectedTypes> {
        if self.selected_types.is_empty() {
            return Ok(SelectedTypes::ALL);
        }
        let types = self
            .selected_types
            .iter()
            .map(|name| {
                name.parse::<ResType>()
                    .map_err(|_| Error::Config(format!("unknown resource type '{name}'")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(SelectedTypes::from_types(types))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_from_empty_file() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.max_reference_depth, 20);
        assert_eq!(settings.index_format().unwrap(), None);
        assert!(settings.selected_types().unwrap().is_all());
    }

    #[test]
    fn test_parse_fields() {
        let settings = Settings::from_toml_str(
            r#"
            index_format = "lazy"
            selected_types = ["string", "color"]
            system_resource_paths = ["/system/resources.index"]
            plural_cache_size = 5
            "#,
        )
        .unwrap();
        assert_eq!(settings.index_format().unwrap(), Some(IndexFormat::Lazy));
        let selected = settings.selected_types().unwrap();
        assert!(selected.contains(ResType::String));
        assert!(!selected.contains(ResType::Media));
        assert_eq!(settings.system_resource_paths, vec![PathBuf::from("/system/resources.index")]);
        assert_eq!(settings.plural_cache_size, 5);
    }

    #[test]
    fn test_invalid_values() {
        let settings = Settings::from_toml_str("index_format = \"v9\"").unwrap();
        assert!(matches!(settings.validate(), Err(Error::Config(_))));
        let settings = Settings::from_toml_str("selected_types = [\"nope\"]").unwrap();
        assert!(matches!(settings.validate(), Err(Error::Config(_))));
        assert!(matches!(Settings::from_toml_str("max_reference_depth = \"x\""), Err(Error::Config(_))));
        let settings = Settings::from_toml_str("log_level = \"loud\"").unwrap();
        assert!(matches!(settings.validate(), Err(Error::Config(_))));
        let settings = Settings::from_toml_str("log_level = \"WARN\"").unwrap();
        assert_eq!(settings.log_level().unwrap(), tracing::Level::WARN);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/reskit.toml");
        let settings = Settings {
            log_level: "debug".to_string(),
            ..Settings::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }
}
