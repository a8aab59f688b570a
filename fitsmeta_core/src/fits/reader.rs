//! HDU walking over any seekable byte source
//!
//! Only header blocks, and table data when explicitly requested, are read.
//! Image data units are skipped with a single seek so that a header from the
//! second HDU of a multi-gigabyte file costs two block reads.

use super::codec::{BLOCK_SIZE, data_unit_bytes};
use super::header::{CARD_SIZE, Header, is_end_card};
use crate::error::{FitsError, Result};
use crate::storage::RandomAccess;
use log::debug;
use std::io::SeekFrom;

/// Location and parsed header of one HDU
#[derive(Debug, Clone, PartialEq)]
pub struct HduHeader {
    /// Index of the HDU in the file, 0 for the primary
    pub index: usize,
    /// Byte offset of the first header block
    pub start_offset: u64,
    /// Header length in bytes, a multiple of the block size
    pub header_length: u64,
    pub header: Header,
}

impl HduHeader {
    /// Offset of the first byte of the data unit
    pub fn data_offset(&self) -> u64 {
        self.start_offset + self.header_length
    }
}

/// Reads HDU headers from a [`RandomAccess`] source
#[derive(Debug)]
pub struct FitsReader<S: RandomAccess> {
    source: S,
}

impl<S: RandomAccess> FitsReader<S> {
    /// Wrap a source; anything smaller than one block is rejected
    pub fn new(source: S) -> Result<Self> {
        let size = source.size();
        if size < BLOCK_SIZE {
            return Err(FitsError::too_small(source.location(), size).into());
        }
        Ok(Self { source })
    }

    pub fn location(&self) -> &str {
        self.source.location()
    }

    /// Read the header blocks starting at `offset` up to and including `END`
    pub fn read_header_at(&mut self, index: usize, offset: u64) -> Result<HduHeader> {
        self.source.seek(SeekFrom::Start(offset))?;

        let mut bytes = Vec::new();
        loop {
            let block = self.source.read(BLOCK_SIZE as usize)?;
            if block.len() < BLOCK_SIZE as usize {
                return Err(FitsError::malformed(
                    self.source.location(),
                    format!("header of HDU {index} ends before an END card"),
                )
                .into());
            }
            let found_end = block.chunks(CARD_SIZE).any(is_end_card);
            bytes.extend_from_slice(&block);
            if found_end {
                break;
            }
        }

        let header_length = bytes.len() as u64;
        debug!(
            "Read {} header bytes of HDU {index} at offset {offset} in {}",
            header_length,
            self.source.location()
        );

        Ok(HduHeader {
            index,
            start_offset: offset,
            header_length,
            header: Header::parse(&bytes),
        })
    }

    /// Read the header of HDU `which`, or `None` when the file has fewer HDUs
    pub fn read_hdu(&mut self, which: usize) -> Result<Option<HduHeader>> {
        let size = self.source.size();
        let mut hdu = self.read_header_at(0, 0)?;

        for index in 1..=which {
            let next = self.next_hdu_offset(&hdu)?;
            if next >= size {
                return Ok(None);
            }
            hdu = self.read_header_at(index, next)?;
        }

        Ok(Some(hdu))
    }

    /// Read HDU `which`, failing with not-found when it does not exist
    pub fn require_hdu(&mut self, which: usize) -> Result<HduHeader> {
        match self.read_hdu(which)? {
            Some(hdu) => Ok(hdu),
            None => Err(FitsError::hdu_not_found(which, self.source.location()).into()),
        }
    }

    /// Headers of every HDU in the file
    pub fn hdus(&mut self) -> Result<Vec<HduHeader>> {
        let size = self.source.size();
        let mut hdus = vec![self.read_header_at(0, 0)?];

        loop {
            let Some(last) = hdus.last() else { break };
            let next = self.next_hdu_offset(last)?;
            if next >= size {
                break;
            }
            let index = hdus.len();
            hdus.push(self.read_header_at(index, next)?);
        }

        Ok(hdus)
    }

    fn next_hdu_offset(&self, hdu: &HduHeader) -> Result<u64> {
        hdu.data_offset()
            .checked_add(data_unit_bytes(&hdu.header)?)
            .ok_or_else(|| {
                FitsError::malformed(
                    self.source.location(),
                    format!("data unit of HDU {} runs past any possible file size", hdu.index),
                )
                .into()
            })
    }

    /// Raw table bytes of a catalog HDU, `NAXIS1 * NAXIS2` long
    ///
    /// The length is checked against the source size before anything is read.
    pub fn read_table_bytes(&mut self, hdu: &HduHeader) -> Result<Vec<u8>> {
        let width = hdu.header.get_int("NAXIS1").unwrap_or(0).max(0) as u64;
        let rows = hdu.header.get_int("NAXIS2").unwrap_or(0).max(0) as u64;
        let location = self.source.location().to_string();
        let truncated = || {
            FitsError::malformed(&location, format!("table data of HDU {} is truncated", hdu.index))
        };

        let len = width.checked_mul(rows).ok_or_else(truncated)?;
        let end = hdu.data_offset().checked_add(len).ok_or_else(truncated)?;
        if end > self.source.size() {
            return Err(truncated().into());
        }
        let len = usize::try_from(len).map_err(|_| truncated())?;

        self.source.seek(SeekFrom::Start(hdu.data_offset()))?;
        let bytes = self.source.read(len)?;
        if bytes.len() < len {
            return Err(truncated().into());
        }
        Ok(bytes)
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}
