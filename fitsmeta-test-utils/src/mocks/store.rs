//! Object store that refuses every request

use fitsmeta_core::error::IoError;
use fitsmeta_core::storage::{ObjectStore, RemoteObject};
use fitsmeta_core::Result;

/// Object store whose every operation fails, as if the archive were down
#[derive(Debug, Clone)]
pub struct FailingObjectStore {
    reason: String,
}

impl FailingObjectStore {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

impl Default for FailingObjectStore {
    fn default() -> Self {
        Self::new("connection refused")
    }
}

impl ObjectStore for FailingObjectStore {
    fn get(&self, path: &str) -> Result<Box<dyn RemoteObject>> {
        Err(IoError::remote(path, self.reason.clone()).into())
    }

    fn exists(&self, _path: &str) -> bool {
        false
    }

    fn add_metadata(&self, path: &str, _name: &str, _value: &str) -> Result<()> {
        Err(IoError::remote(path, self.reason.clone()).into())
    }
}
