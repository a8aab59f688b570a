//! Byte sources and the remote object store
//!
//! [`RandomAccess`] is the seam the FITS reader works against. Local files
//! implement it directly; remote objects implement it through
//! [`RemoteObject`], which adds an explicit open/close lifecycle and the
//! user metadata attached to the object.

mod directory;
mod local;
mod memory;

pub use directory::DirectoryObjectStore;
pub use local::LocalFile;
pub use memory::{MemoryObject, MemoryObjectStore};

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::io::SeekFrom;

/// Seekable byte source of known size
pub trait RandomAccess: Debug {
    /// Move the cursor; returns the new absolute position
    fn seek(&mut self, pos: SeekFrom) -> Result<u64>;

    /// Current absolute position
    fn tell(&mut self) -> Result<u64>;

    /// Read up to `n` bytes; fewer are returned only at end of input
    fn read(&mut self, n: usize) -> Result<Vec<u8>>;

    /// Total size in bytes
    fn size(&self) -> u64;

    /// Path or URI used in error messages
    fn location(&self) -> &str;
}

/// One attribute/value/unit triple attached to a remote object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

impl MetadataEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            units: None,
        }
    }
}

/// Handle to one object in an [`ObjectStore`]
pub trait RemoteObject: RandomAccess + Send {
    /// Open the object for reading; reads before this fail
    fn open(&mut self) -> Result<()>;

    /// Release the handle; safe to call more than once
    fn close(&mut self);

    /// User metadata attached to the object
    fn metadata(&self) -> Vec<MetadataEntry>;

    /// System attributes of the object such as size and checksum
    fn attributes(&self) -> BTreeMap<String, String>;
}

/// Remote object store holding FITS files
pub trait ObjectStore: Debug + Send + Sync {
    /// Look up an object; a missing object is a not-found error
    fn get(&self, path: &str) -> Result<Box<dyn RemoteObject>>;

    fn exists(&self, path: &str) -> bool;

    /// Attach a metadata attribute to the object at `path`
    fn add_metadata(&self, path: &str, name: &str, value: &str) -> Result<()>;
}

/// Closes a remote object when dropped
#[derive(Debug)]
pub struct OpenObject {
    inner: Box<dyn RemoteObject>,
}

impl OpenObject {
    /// Open `object`, closing it again on every exit path
    pub fn open(mut inner: Box<dyn RemoteObject>) -> Result<Self> {
        inner.open()?;
        Ok(Self { inner })
    }

    pub fn metadata(&self) -> Vec<MetadataEntry> {
        self.inner.metadata()
    }

    pub fn attributes(&self) -> BTreeMap<String, String> {
        self.inner.attributes()
    }
}

impl RandomAccess for OpenObject {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.inner.seek(pos)
    }

    fn tell(&mut self) -> Result<u64> {
        self.inner.tell()
    }

    fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        self.inner.read(n)
    }

    fn size(&self) -> u64 {
        self.inner.size()
    }

    fn location(&self) -> &str {
        self.inner.location()
    }
}

impl Drop for OpenObject {
    fn drop(&mut self) {
        self.inner.close();
    }
}

/// Resolve a relative or absolute seek against a cursor and size
pub(crate) fn resolve_seek(location: &str, pos: SeekFrom, current: u64, size: u64) -> Result<u64> {
    let target = match pos {
        SeekFrom::Start(n) => Some(n),
        SeekFrom::Current(delta) => current.checked_add_signed(delta),
        SeekFrom::End(delta) => size.checked_add_signed(delta),
    };
    target.ok_or_else(|| {
        crate::error::IoError::remote(location, format!("invalid seek {pos:?}")).into()
    })
}
