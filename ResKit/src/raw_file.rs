//! Raw files shipped next to a package's index
//!
//! Raw files live under `resources/rawfile/` of a package, either as plain
//! files next to the index or as stored entries inside a HAP archive. A
//! patch package, when set, replaces files of its base.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::package::{
    ArchiveReader, FileSystem, PackageMeta, ZipArchiveReader, is_archive_path, raw_file_relative,
};

/// Byte range of a raw file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFileLocation {
    /// The raw file itself, or the archive that contains it.
    pub path: PathBuf,
    pub offset: u64,
    pub length: u64,
}

fn check_name(name: &str) -> Result<()> {
    let escapes = Path::new(name)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if name.is_empty() || escapes {
        return Err(Error::InvalidArgument(format!("invalid raw file name '{name}'")));
    }
    Ok(())
}

/// Locate `name` in the package rooted at `root`, `None` if it has no such file.
fn locate_in(fs: &dyn FileSystem, root: &Path, name: &str) -> Result<Option<RawFileLocation>> {
    if is_archive_path(root) {
        let mut archive = ZipArchiveReader::from_bytes(fs.read(root)?)?;
        let entry = archive.raw_file_entry(name)?;
        if !archive.has_entry(&entry) {
            return Ok(None);
        }
        let (offset, length) = archive.stored_range(&entry)?;
        return Ok(Some(RawFileLocation {
            path: root.to_path_buf(),
            offset,
            length,
        }));
    }

    let path = root.join("resources").join(raw_file_relative(name));
    if !fs.exists(&path) {
        return Ok(None);
    }
    Ok(Some(RawFileLocation {
        length: fs.file_len(&path)?,
        path,
        offset: 0,
    }))
}

/// Find raw file `name` of a package, preferring its patch package.
pub fn find_raw_file(fs: &dyn FileSystem, meta: &PackageMeta, name: &str) -> Result<RawFileLocation> {
    check_name(name)?;
    if let Some(patch) = meta.patch_path() {
        let patch_root = if is_archive_path(&patch) {
            patch
        } else {
            patch.parent().map(Path::to_path_buf).unwrap_or(patch)
        };
        if let Some(location) = locate_in(fs, &patch_root, name)? {
            tracing::debug!("Raw file {} served from patch {}", name, patch_root.display());
            return Ok(location);
        }
    }
    locate_in(fs, meta.resources_root(), name)?
        .ok_or_else(|| Error::NotFound(format!("raw file {name} in {}", meta.path().display())))
}

/// Every raw file below `dir` of a package, relative to `dir`.
pub fn list_raw_files(fs: &dyn FileSystem, meta: &PackageMeta, dir: &str) -> Result<Vec<String>> {
    let root = meta.resources_root();
    let relative = raw_file_relative(dir.trim_end_matches('/'));
    if is_archive_path(root) {
        let mut archive = ZipArchiveReader::from_bytes(fs.read(root)?)?;
        let prefix = format!("{}resources/{}/", archive.resources_dir()?, relative.trim_end_matches('/'));
        return Ok(archive.list_dir(&prefix));
    }
    let path = root.join("resources").join(relative);
    if !fs.exists(&path) {
        return Ok(Vec::new());
    }
    Ok(fs
        .list_dir(&path)?
        .into_iter()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .collect())
}

/// An open raw file.
#[derive(Debug)]
pub struct RawFileDescriptor {
    file: File,
    location: RawFileLocation,
}

impl RawFileDescriptor {
    pub fn location(&self) -> &RawFileLocation {
        &self.location
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    /// Contents of the raw file.
    pub fn read_all(&self) -> Result<Vec<u8>> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(self.location.offset))?;
        let length = usize::try_from(self.location.length)
            .map_err(|_| Error::InvalidArgument(format!("raw file of {} bytes", self.location.length)))?;
        let mut data = vec![0u8; length];
        file.read_exact(&mut data)?;
        Ok(data)
    }
}

/// Open descriptors by raw-file name. Descriptors stay open until closed.
#[derive(Debug, Default)]
pub struct RawFileCache {
    open: Mutex<HashMap<String, Arc<RawFileDescriptor>>>,
}

impl RawFileCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Arc<RawFileDescriptor>>>> {
        self.open.lock().map_err(|_| Error::LockPoisoned("raw file cache"))
    }

    /// Descriptor for `name`, opening `location` if none is open yet.
    pub fn open(&self, name: &str, location: RawFileLocation) -> Result<Arc<RawFileDescriptor>> {
        let mut open = self.lock()?;
        if let Some(descriptor) = open.get(name) {
            return Ok(Arc::clone(descriptor));
        }
        let descriptor = Arc::new(RawFileDescriptor {
            file: File::open(&location.path)?,
            location,
        });
        open.insert(name.to_string(), Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// Release the descriptor for `name`. Returns whether one was open.
    pub fn close(&self, name: &str) -> Result<bool> {
        Ok(self.lock()?.remove(name).is_some())
    }

    pub fn len(&self) -> usize {
        self.lock().map(|open| open.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{PackageKind, StdFileSystem};
    use std::fs;
    use std::io::{Cursor, Write};

    fn package_dir() -> (tempfile::TempDir, PackageMeta) {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("resources/rawfile/sub");
        fs::create_dir_all(&raw).unwrap();
        fs::write(dir.path().join("resources/rawfile/readme.txt"), b"hello").unwrap();
        fs::write(raw.join("data.bin"), b"0123").unwrap();
        let meta = PackageMeta::new(dir.path().join("resources.index"), PackageKind::APP, None);
        (dir, meta)
    }

    #[test]
    fn test_find_in_directory() {
        let (_dir, meta) = package_dir();
        let location = find_raw_file(&StdFileSystem, &meta, "readme.txt").unwrap();
        assert_eq!(location.offset, 0);
        assert_eq!(location.length, 5);
        let same = find_raw_file(&StdFileSystem, &meta, "rawfile/readme.txt").unwrap();
        assert_eq!(location, same);

        assert!(find_raw_file(&StdFileSystem, &meta, "absent.txt").unwrap_err().is_not_found());
        assert!(matches!(
            find_raw_file(&StdFileSystem, &meta, "../resources.index"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_list_raw_files() {
        let (_dir, meta) = package_dir();
        let files = list_raw_files(&StdFileSystem, &meta, "").unwrap();
        assert_eq!(files, vec!["readme.txt".to_string(), "sub/data.bin".to_string()]);
        assert_eq!(list_raw_files(&StdFileSystem, &meta, "sub").unwrap(), vec!["data.bin".to_string()]);
    }

    #[test]
    fn test_patch_replaces_base() {
        let (_dir, meta) = package_dir();
        let patch = tempfile::tempdir().unwrap();
        fs::create_dir_all(patch.path().join("resources/rawfile")).unwrap();
        fs::write(patch.path().join("resources/rawfile/readme.txt"), b"patched!").unwrap();
        meta.set_patch_path(Some(patch.path().join("resources.index"))).unwrap();

        let location = find_raw_file(&StdFileSystem, &meta, "readme.txt").unwrap();
        assert_eq!(location.length, 8);
        // files the patch lacks still come from the base
        let location = find_raw_file(&StdFileSystem, &meta, "sub/data.bin").unwrap();
        assert_eq!(location.length, 4);
    }

    #[test]
    fn test_find_in_archive() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file("module.json", options).unwrap();
        writer.write_all(b"{}").unwrap();
        writer.start_file("resources/rawfile/readme.txt", options).unwrap();
        writer.write_all(b"in the archive").unwrap();
        let hap = dir.path().join("entry.hap");
        fs::write(&hap, writer.finish().unwrap().into_inner()).unwrap();

        let meta = PackageMeta::new(hap, PackageKind::APP, None);
        let location = find_raw_file(&StdFileSystem, &meta, "readme.txt").unwrap();
        let cache = RawFileCache::new();
        let descriptor = cache.open("readme.txt", location).unwrap();
        assert_eq!(descriptor.read_all().unwrap(), b"in the archive");
    }

    #[test]
    fn test_descriptor_cache() {
        let (_dir, meta) = package_dir();
        let cache = RawFileCache::new();
        let location = find_raw_file(&StdFileSystem, &meta, "readme.txt").unwrap();
        let first = cache.open("readme.txt", location.clone()).unwrap();
        let second = cache.open("readme.txt", location).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.read_all().unwrap(), b"hello");
        assert_eq!(cache.len(), 1);
        assert!(cache.close("readme.txt").unwrap());
        assert!(!cache.close("readme.txt").unwrap());
        assert!(cache.is_empty());
    }
}
