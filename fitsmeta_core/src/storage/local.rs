use super::RandomAccess;
use crate::error::{IoError, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// A file on the local filesystem
#[derive(Debug)]
pub struct LocalFile {
    file: File,
    path: PathBuf,
    location: String,
    size: u64,
}

impl LocalFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| IoError::from_std(e).with_path(path))?;
        let size = file
            .metadata()
            .map_err(|e| IoError::from_std(e).with_path(path))?
            .len();
        Ok(Self {
            file,
            path: path.to_path_buf(),
            location: path.display().to_string(),
            size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RandomAccess for LocalFile {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.file
            .seek(pos)
            .map_err(|e| IoError::from_std(e).with_path(&self.path).into())
    }

    fn tell(&mut self) -> Result<u64> {
        self.seek(SeekFrom::Current(0))
    }

    /// Reads at most `n` bytes; the buffer never grows past what the file holds
    fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        let position = self.tell()?;
        let remaining = self.size.saturating_sub(position);
        let mut buffer = Vec::with_capacity(remaining.min(n as u64) as usize);
        (&mut self.file)
            .take(n as u64)
            .read_to_end(&mut buffer)
            .map_err(|e| IoError::from_std(e).with_path(&self.path))?;
        Ok(buffer)
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn location(&self) -> &str {
        &self.location
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_and_seek() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"0123456789").unwrap();

        let mut file = LocalFile::open(tmp.path()).unwrap();
        assert_eq!(file.size(), 10);
        assert_eq!(file.read(4).unwrap(), b"0123");
        assert_eq!(file.tell().unwrap(), 4);
        file.seek(SeekFrom::Current(2)).unwrap();
        assert_eq!(file.read(100).unwrap(), b"6789");
    }

    #[test]
    fn test_huge_read_returns_what_the_file_holds() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"0123456789").unwrap();

        let mut file = LocalFile::open(tmp.path()).unwrap();
        file.seek(SeekFrom::Start(6)).unwrap();
        let bytes = file.read(usize::MAX).unwrap();
        assert_eq!(bytes, b"6789");

        file.seek(SeekFrom::Start(50)).unwrap();
        assert!(file.read(usize::MAX).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = LocalFile::open(Path::new("/nonexistent/file.fits")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("/nonexistent/file.fits"));
    }
}
