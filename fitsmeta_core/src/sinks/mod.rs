//! Terminal stages that deliver a finished bundle
//!
//! File-writing sinks share [`OutputTarget`]; database and object-store
//! sinks talk to their collaborators through the [`SqlCursor`] and
//! [`ObjectStore`](crate::storage::ObjectStore) traits.

mod annotate;
mod csv;
mod database;
mod json;
pub mod sql;

pub use self::annotate::RemoteAnnotator;
pub use self::csv::CsvSink;
pub use self::database::{CursorFactory, DatabaseSink, SqlCursor, table_exists};
#[cfg(feature = "database")]
pub use self::database::{PgCursor, PgCursorFactory};
pub use self::json::JsonSink;
pub use self::sql::{ExistenceQuery, SqlMode, SqlScriptSink, SqlValue, Statement};

use crate::Result;
use crate::error::IoError;
use chrono::NaiveDateTime;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Where a sink writes its text output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputTarget {
    #[default]
    Stdout,
    File {
        path: PathBuf,
        append: bool,
    },
}

impl OutputTarget {
    /// Truncating file target
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File {
            path: path.into(),
            append: false,
        }
    }

    /// Appending file target
    pub fn append(path: impl Into<PathBuf>) -> Self {
        Self::File {
            path: path.into(),
            append: true,
        }
    }

    /// True when the target is a file that already holds data
    pub fn has_content(&self) -> bool {
        match self {
            Self::Stdout => false,
            Self::File { path, .. } => std::fs::metadata(path).is_ok_and(|m| m.len() > 0),
        }
    }

    /// True when writing will add to existing data rather than replace it
    pub fn appends_to_content(&self) -> bool {
        matches!(self, Self::File { append: true, .. }) && self.has_content()
    }

    /// Open the target for writing
    pub fn open(&self) -> Result<Box<dyn Write>> {
        match self {
            Self::Stdout => Ok(Box::new(io::stdout().lock())),
            Self::File { path, append } => {
                let file = open_file(path, *append)?;
                Ok(Box::new(io::BufWriter::new(file)))
            }
        }
    }

    /// Write `text` and flush
    pub fn write_all(&self, text: &str) -> Result<()> {
        let mut writer = self.open()?;
        writer
            .write_all(text.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|e| self.io_error(e))?;
        Ok(())
    }

    pub(crate) fn io_error(&self, source: io::Error) -> crate::Error {
        match self {
            Self::Stdout => IoError::from_std(source).into(),
            Self::File { path, .. } => IoError::from_std(source).with_path(path).into(),
        }
    }
}

fn open_file(path: &Path, append: bool) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| IoError::from_std(e).with_path(parent))?;
    }
    let mut options = OpenOptions::new();
    options.create(true);
    if append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }
    options
        .open(path)
        .map_err(|e| IoError::from_std(e).with_path(path).into())
}

/// `{out_dir}/{stem}_{stage}_{YYYYMMDD_HHMMSS-micros}.{ext}`
pub fn generated_output_path(
    out_dir: &Path,
    input: &Path,
    stage: &str,
    ext: &str,
    now: NaiveDateTime,
) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stdin".to_string());
    let stamp = now.format("%Y%m%d_%H%M%S-%6f");
    out_dir.join(format!("{stem}_{stage}_{stamp}.{ext}"))
}
