use super::{MetadataEntry, ObjectStore, RandomAccess, RemoteObject, resolve_seek};
use crate::error::{IoError, Result};
use std::collections::{BTreeMap, HashMap};
use std::io::SeekFrom;
use std::sync::{Arc, Mutex};

/// In-memory object store
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, StoredObject>>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Arc<Vec<u8>>,
    metadata: Vec<MetadataEntry>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` under `path`, replacing any previous object
    pub fn insert(&self, path: &str, bytes: Vec<u8>) {
        if let Ok(mut objects) = self.objects.lock() {
            objects.insert(
                path.to_string(),
                StoredObject {
                    bytes: Arc::new(bytes),
                    metadata: Vec::new(),
                },
            );
        }
    }

    /// Metadata currently attached to `path`
    pub fn metadata_of(&self, path: &str) -> Vec<MetadataEntry> {
        self.objects
            .lock()
            .ok()
            .and_then(|objects| objects.get(path).map(|o| o.metadata.clone()))
            .unwrap_or_default()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn get(&self, path: &str) -> Result<Box<dyn RemoteObject>> {
        let objects = self
            .objects
            .lock()
            .map_err(|_| IoError::remote(path, "object store lock poisoned"))?;
        let stored = objects
            .get(path)
            .ok_or_else(|| IoError::object_not_found(path))?;
        let mut object = MemoryObject::from_shared(path, Arc::clone(&stored.bytes));
        object.metadata = stored.metadata.clone();
        Ok(Box::new(object))
    }

    fn exists(&self, path: &str) -> bool {
        self.objects
            .lock()
            .map(|objects| objects.contains_key(path))
            .unwrap_or(false)
    }

    fn add_metadata(&self, path: &str, name: &str, value: &str) -> Result<()> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| IoError::remote(path, "object store lock poisoned"))?;
        let stored = objects
            .get_mut(path)
            .ok_or_else(|| IoError::object_not_found(path))?;
        stored.metadata.push(MetadataEntry::new(name, value));
        Ok(())
    }
}

/// Handle to an object held in memory
#[derive(Debug)]
pub struct MemoryObject {
    location: String,
    bytes: Arc<Vec<u8>>,
    metadata: Vec<MetadataEntry>,
    position: u64,
    is_open: bool,
    /// Absolute positions passed to `seek`, in call order
    pub seeks: Vec<u64>,
}

impl MemoryObject {
    pub fn new(location: &str, bytes: Vec<u8>) -> Self {
        Self::from_shared(location, Arc::new(bytes))
    }

    fn from_shared(location: &str, bytes: Arc<Vec<u8>>) -> Self {
        Self {
            location: location.to_string(),
            bytes,
            metadata: Vec::new(),
            position: 0,
            is_open: false,
            seeks: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_open {
            Ok(())
        } else {
            Err(IoError::remote(&self.location, "object is not open").into())
        }
    }
}

impl RandomAccess for MemoryObject {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.ensure_open()?;
        let target = resolve_seek(&self.location, pos, self.position, self.size())?;
        self.position = target;
        self.seeks.push(target);
        Ok(target)
    }

    fn tell(&mut self) -> Result<u64> {
        self.ensure_open()?;
        Ok(self.position)
    }

    fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        self.ensure_open()?;
        let len = self.bytes.len();
        let start = (self.position as usize).min(len);
        let end = start.saturating_add(n).min(len);
        self.position = end as u64;
        Ok(self.bytes[start..end].to_vec())
    }

    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn location(&self) -> &str {
        &self.location
    }
}

impl RemoteObject for MemoryObject {
    fn open(&mut self) -> Result<()> {
        self.is_open = true;
        self.position = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.is_open = false;
    }

    fn metadata(&self) -> Vec<MetadataEntry> {
        self.metadata.clone()
    }

    fn attributes(&self) -> BTreeMap<String, String> {
        BTreeMap::from([("data_size".to_string(), self.bytes.len().to_string())])
    }
}
