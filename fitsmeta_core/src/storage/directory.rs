use super::{MetadataEntry, ObjectStore, RandomAccess, RemoteObject, local::LocalFile};
use crate::error::{IoError, Result};
use chrono::{DateTime, Utc};
use log::debug;
use std::collections::BTreeMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

/// Object store backed by a local directory tree
///
/// Object paths are resolved below `root`. User metadata lives in a
/// `<object>.meta.json` sidecar next to each object.
#[derive(Debug, Clone)]
pub struct DirectoryObjectStore {
    root: PathBuf,
}

impl DirectoryObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    fn sidecar(file: &Path) -> PathBuf {
        let mut name = file.as_os_str().to_os_string();
        name.push(".meta.json");
        PathBuf::from(name)
    }
}

fn read_sidecar(path: &Path) -> Result<Vec<MetadataEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(path).map_err(|e| IoError::from_std(e).with_path(path))?;
    Ok(serde_json::from_str(&text)?)
}

impl ObjectStore for DirectoryObjectStore {
    fn get(&self, path: &str) -> Result<Box<dyn RemoteObject>> {
        let file = self.resolve(path);
        if !file.is_file() {
            return Err(IoError::object_not_found(path).into());
        }
        Ok(Box::new(DirectoryObject {
            remote_path: path.to_string(),
            file,
            handle: None,
        }))
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn add_metadata(&self, path: &str, name: &str, value: &str) -> Result<()> {
        let file = self.resolve(path);
        if !file.is_file() {
            return Err(IoError::object_not_found(path).into());
        }
        let sidecar = Self::sidecar(&file);
        let mut entries = read_sidecar(&sidecar)?;
        entries.push(MetadataEntry::new(name, value));
        let text = serde_json::to_string_pretty(&entries)?;
        std::fs::write(&sidecar, text).map_err(|e| IoError::from_std(e).with_path(&sidecar))?;
        debug!("Attached {name}={value} to {path}");
        Ok(())
    }
}

/// Object handle for [`DirectoryObjectStore`]
#[derive(Debug)]
struct DirectoryObject {
    remote_path: String,
    file: PathBuf,
    handle: Option<LocalFile>,
}

impl DirectoryObject {
    fn handle(&mut self) -> Result<&mut LocalFile> {
        self.handle
            .as_mut()
            .ok_or_else(|| IoError::remote(&self.remote_path, "object is not open").into())
    }
}

impl RandomAccess for DirectoryObject {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.handle()?.seek(pos)
    }

    fn tell(&mut self) -> Result<u64> {
        self.handle()?.tell()
    }

    fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        self.handle()?.read(n)
    }

    fn size(&self) -> u64 {
        match &self.handle {
            Some(handle) => handle.size(),
            None => std::fs::metadata(&self.file).map(|m| m.len()).unwrap_or(0),
        }
    }

    fn location(&self) -> &str {
        &self.remote_path
    }
}

impl RemoteObject for DirectoryObject {
    fn open(&mut self) -> Result<()> {
        if self.handle.is_none() {
            let file = LocalFile::open(&self.file)
                .map_err(|e| IoError::remote(&self.remote_path, e.to_string()))?;
            self.handle = Some(file);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.handle = None;
    }

    fn metadata(&self) -> Vec<MetadataEntry> {
        read_sidecar(&DirectoryObjectStore::sidecar(&self.file)).unwrap_or_default()
    }

    fn attributes(&self) -> BTreeMap<String, String> {
        let mut attributes = BTreeMap::new();
        if let Ok(meta) = std::fs::metadata(&self.file) {
            attributes.insert("data_size".to_string(), meta.len().to_string());
            if let Ok(modified) = meta.modified() {
                let modified: DateTime<Utc> = modified.into();
                attributes.insert("modify_time".to_string(), modified.to_rfc3339());
            }
        }
        attributes
    }
}
