//! Where package bytes come from: plain index files or HAP/HSP archives

use std::fmt;
use std::fs;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;
use zip::ZipArchive;

use crate::error::{Error, Result};

/// Index entry of a stage-model package.
pub const STAGE_INDEX_ENTRY: &str = "resources.index";
/// Marker entry of a stage-model package.
pub const STAGE_MODEL_MARKER: &str = "module.json";
/// Configuration entry of an FA-model package, which names the module.
pub const FA_CONFIG_ENTRY: &str = "config.json";
/// Prefix every raw-file name is resolved under.
pub const RAW_FILE_PREFIX: &str = "rawfile/";

/// Whether `path` names a package archive rather than a bare index file.
pub fn is_archive_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("hap") || ext.eq_ignore_ascii_case("hsp"))
}

/// `rawfile/<name>`, unless `name` already carries the prefix.
pub fn raw_file_relative(name: &str) -> String {
    if name.starts_with(RAW_FILE_PREFIX) {
        name.to_string()
    } else {
        format!("{RAW_FILE_PREFIX}{name}")
    }
}

/// File system access used for loading packages and raw files.
pub trait FileSystem: Send + Sync + fmt::Debug {
    fn exists(&self, path: &Path) -> bool;

    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    fn canonicalize(&self, path: &Path) -> Result<PathBuf>;

    /// Every file below `dir`, recursively, relative to `dir`.
    fn list_dir(&self, dir: &Path) -> Result<Vec<PathBuf>>;

    fn modified(&self, path: &Path) -> Option<SystemTime>;

    fn file_len(&self, path: &Path) -> Result<u64>;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(fs::read(path)?)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        Ok(fs::canonicalize(path)?)
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(dir) {
                files.push(relative.to_path_buf());
            }
        }
        Ok(files)
    }

    fn modified(&self, path: &Path) -> Option<SystemTime> {
        fs::metadata(path).and_then(|meta| meta.modified()).ok()
    }

    fn file_len(&self, path: &Path) -> Result<u64> {
        Ok(fs::metadata(path)?.len())
    }
}

/// Read access to a package archive.
pub trait ArchiveReader {
    fn has_entry(&self, name: &str) -> bool;

    fn extract(&mut self, name: &str) -> Result<Vec<u8>>;

    /// Entry names below `dir` (a `/`-terminated prefix), recursively.
    fn list_dir(&self, dir: &str) -> Vec<String>;

    /// Byte range of a stored (uncompressed) entry within the archive.
    fn stored_range(&mut self, name: &str) -> Result<(u64, u64)>;

    fn is_stage_model(&self) -> bool {
        self.has_entry(STAGE_MODEL_MARKER)
    }

    /// Module name declared by an FA-model package.
    fn module_name(&mut self) -> Result<String> {
        let config = self.extract(FA_CONFIG_ENTRY)?;
        let json: serde_json::Value = serde_json::from_slice(&config)?;
        find_module_name(&json)
            .map(str::to_string)
            .ok_or_else(|| Error::Archive(format!("{FA_CONFIG_ENTRY} declares no moduleName")))
    }

    /// Directory holding `resources.index` and `resources/`, `""` for the archive root.
    fn resources_dir(&mut self) -> Result<String> {
        if self.is_stage_model() {
            Ok(String::new())
        } else {
            Ok(format!("assets/{}/", self.module_name()?))
        }
    }

    fn index_entry(&mut self) -> Result<String> {
        Ok(format!("{}{STAGE_INDEX_ENTRY}", self.resources_dir()?))
    }

    fn raw_file_entry(&mut self, name: &str) -> Result<String> {
        Ok(format!("{}resources/{}", self.resources_dir()?, raw_file_relative(name)))
    }
}

fn find_module_name(value: &serde_json::Value) -> Option<&str> {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(name) = map.get("moduleName").and_then(serde_json::Value::as_str) {
                return Some(name);
            }
            map.values().find_map(find_module_name)
        }
        serde_json::Value::Array(items) => items.iter().find_map(find_module_name),
        _ => None,
    }
}

/// [`ArchiveReader`] over a ZIP container.
pub struct ZipArchiveReader<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> fmt::Debug for ZipArchiveReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipArchiveReader")
            .field("entries", &self.archive.len())
            .finish()
    }
}

impl ZipArchiveReader<Cursor<Vec<u8>>> {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::new(Cursor::new(bytes))
    }
}

impl ZipArchiveReader<fs::File> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(fs::File::open(path)?)
    }
}

impl<R: Read + Seek> ZipArchiveReader<R> {
    pub fn new(reader: R) -> Result<Self> {
        Ok(Self {
            archive: ZipArchive::new(reader)?,
        })
    }
}

impl<R: Read + Seek> ArchiveReader for ZipArchiveReader<R> {
    fn has_entry(&self, name: &str) -> bool {
        self.archive.file_names().any(|entry| entry == name)
    }

    fn extract(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = self
            .archive
            .by_name(name)
            .map_err(|e| Error::Archive(format!("{name}: {e}")))?;
        let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or_default());
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    fn list_dir(&self, dir: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .archive
            .file_names()
            .filter(|name| name.starts_with(dir) && !name.ends_with('/'))
            .map(|name| name[dir.len()..].to_string())
            .collect();
        names.sort();
        names
    }

    fn stored_range(&mut self, name: &str) -> Result<(u64, u64)> {
        let file = self
            .archive
            .by_name(name)
            .map_err(|e| Error::Archive(format!("{name}: {e}")))?;
        if file.compression() != zip::CompressionMethod::Stored {
            return Err(Error::Archive(format!(
                "{name} is compressed and cannot be opened in place"
            )));
        }
        Ok((file.data_start(), file.size()))
    }
}

/// Raw index bytes of the package at `path`.
pub fn read_index_bytes(fs: &dyn FileSystem, path: &Path) -> Result<Vec<u8>> {
    if !is_archive_path(path) {
        return fs.read(path);
    }
    let mut archive = ZipArchiveReader::from_bytes(fs.read(path)?)?;
    let entry = archive.index_entry()?;
    tracing::debug!("Reading {} from {}", entry, path.display());
    archive.extract(&entry)
}
