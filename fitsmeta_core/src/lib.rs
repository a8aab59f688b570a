//! FITS metadata pipeline core library
//!
//! Reads FITS headers and tables from local files or a remote object store,
//! normalises them through alias and field-description stages, calculates
//! ObsCore values and delivers the result to JSON, CSV, SQL, a database or
//! back onto the remote object as attributes.

pub mod bundle;
pub mod checksum;
pub mod config;
pub mod error;
pub mod fits;
pub mod ini;
pub mod pipeline;
pub mod sinks;
pub mod stages;
pub mod storage;
pub mod value;

// Test utilities module (available for tests)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export main types
pub use bundle::{Aliased, ColumnInfo, FieldSpec, FieldsInfo, FileInfo, MetadataBundle};
pub use config::{CatalogAliasSets, DbConfig, ObsCoreConfig, TableName};
pub use error::{Disposition, Error, ErrorKind, Result};
pub use fits::{FitsReader, Header, LinearTanSolver, WcsInfo, WcsSolver};
pub use pipeline::{MetadataPipeline, MetadataPipelineBuilder, PipelineStats, Sink, Stage};
pub use storage::{DirectoryObjectStore, LocalFile, ObjectStore, RandomAccess, RemoteObject};
pub use value::{Datatype, Value};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
