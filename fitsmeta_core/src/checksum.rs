//! MD5 digests of local files

use crate::error::{IoError, Result};
use md5::{Digest, Md5};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const CHUNK_SIZE: usize = 64 * 1024;

/// Hex MD5 of everything `reader` yields
pub fn md5_reader<R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Hex MD5 of the file at `path`
pub fn md5_file(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| IoError::from_std(e).with_path(path))?;
    md5_reader(file).map_err(|e| IoError::from_std(e).with_path(path).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(md5_reader(&b""[..]).unwrap(), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(
            md5_reader(&b"The quick brown fox jumps over the lazy dog"[..]).unwrap(),
            "9e107d9d372bb6826bd81d3542a419d6"
        );
    }

    #[test]
    fn test_file_digest_matches_reader() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("x.bin");
        std::fs::write(&path, vec![7u8; 200_000]).unwrap();
        assert_eq!(
            md5_file(&path).unwrap(),
            md5_reader(std::io::Cursor::new(vec![7u8; 200_000])).unwrap()
        );
    }
}
