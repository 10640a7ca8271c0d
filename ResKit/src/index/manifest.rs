//! TOML description of an index
//!
//! ```toml
//! [[resource]]
//! id = 0x01000000
//! name = "app_name"
//! type = "string"
//! values = { base = "Notes", de_DE = "Notizen" }
//!
//! [[resource]]
//! id = 0x01000001
//! name = "sizes"
//! type = "intarray"
//! values = { base = ["8", "16"] }
//! ```
//!
//! Each `values` table maps a qualifier folder name to a single value or a
//! list, depending on the type.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::types::{IdItem, ResType};
use super::writer::IndexWriter;
use crate::error::{Error, Result};
use crate::res_config::ResConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestValue {
    Single(String),
    Array(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestResource {
    pub id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub res_type: String,
    /// Qualifier folder name to value, in declaration order
    pub values: IndexMap<String, ManifestValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    #[serde(default, rename = "resource")]
    pub resources: Vec<ManifestResource>,
}

impl IndexManifest {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    /// Build a writer holding every value; identical qualifiers share one key.
    pub fn to_writer(&self) -> Result<IndexWriter> {
        let mut writer = IndexWriter::new();
        let mut keys: HashMap<String, usize> = HashMap::new();
        for resource in &self.resources {
            let res_type: ResType = resource.res_type.parse()?;
            for (qualifier, value) in &resource.values {
                let config: ResConfig = qualifier.parse()?;
                let folder = config.qualifier_path();
                let key = match keys.get(&folder) {
                    Some(key) => *key,
                    None => {
                        let key = writer.add_key(&config)?;
                        keys.insert(folder, key);
                        key
                    }
                };
                let item = match (value, res_type.is_array()) {
                    (ManifestValue::Single(value), false) => {
                        IdItem::single(res_type, resource.name.as_str(), value.as_str())
                    }
                    (ManifestValue::Array(values), true) => {
                        IdItem::array(res_type, resource.name.as_str(), values.clone())
                    }
                    _ => {
                        return Err(Error::InvalidArgument(format!(
                            "value of {} '{}' under '{qualifier}' has the wrong shape",
                            res_type, resource.name
                        )));
                    }
                };
                writer.add_value(key, resource.id, item)?;
            }
        }
        Ok(writer)
    }
}
