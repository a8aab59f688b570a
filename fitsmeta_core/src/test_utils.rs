//! Builders for synthetic FITS files
//!
//! Used by unit tests inside this crate and re-exported through the
//! `test-utils` feature for the integration tests of other crates.

#![cfg(any(test, feature = "test-utils"))]

use crate::fits::{BLOCK_SIZE, CARD_SIZE, padded_size};
use crate::value::Value;
use std::path::Path;

#[derive(Debug, Clone)]
struct HduSpec {
    cards: Vec<(String, Value)>,
    data: Vec<u8>,
    /// Zero-filled data bytes when `data` is empty
    data_len: u64,
}

impl HduSpec {
    fn set(&mut self, key: &str, value: Value) {
        match self.cards.iter_mut().find(|(k, _)| k == key) {
            Some(card) => card.1 = value,
            None => self.cards.push((key.to_string(), value)),
        }
    }

    fn get_int(&self, key: &str) -> i64 {
        self.cards
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_i64())
            .unwrap_or(0)
    }

    fn image_data_len(&self) -> u64 {
        let naxis = self.get_int("NAXIS");
        if naxis == 0 {
            return 0;
        }
        let bytes = self.get_int("BITPIX").unsigned_abs() / 8;
        (1..=naxis).fold(bytes, |acc, n| acc * self.get_int(&format!("NAXIS{n}")) as u64)
    }
}

/// Fluent builder for multi-HDU FITS files
///
/// Card methods apply to the most recently started HDU.
#[derive(Debug, Clone)]
pub struct FitsBuilder {
    hdus: Vec<HduSpec>,
}

impl FitsBuilder {
    /// Primary HDU with a 2-D 16-bit image
    pub fn image(naxis1: i64, naxis2: i64) -> Self {
        let mut primary = HduSpec {
            cards: Vec::new(),
            data: Vec::new(),
            data_len: 0,
        };
        primary.set("SIMPLE", Value::Bool(true));
        primary.set("BITPIX", Value::Integer(16));
        primary.set("NAXIS", Value::Integer(2));
        primary.set("NAXIS1", Value::Integer(naxis1));
        primary.set("NAXIS2", Value::Integer(naxis2));
        Self {
            hdus: vec![primary],
        }
    }

    /// Primary HDU without data
    pub fn primary_only() -> Self {
        let mut primary = HduSpec {
            cards: Vec::new(),
            data: Vec::new(),
            data_len: 0,
        };
        primary.set("SIMPLE", Value::Bool(true));
        primary.set("BITPIX", Value::Integer(8));
        primary.set("NAXIS", Value::Integer(0));
        primary.set("EXTEND", Value::Bool(true));
        Self {
            hdus: vec![primary],
        }
    }

    fn current(&mut self) -> &mut HduSpec {
        let last = self.hdus.len() - 1;
        &mut self.hdus[last]
    }

    /// Set a card on the current HDU, replacing an earlier value
    pub fn card(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.current().set(key, value.into());
        self
    }

    /// Append a card even when the keyword already exists
    pub fn duplicate_card(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.current().cards.push((key.to_string(), value.into()));
        self
    }

    pub fn bitpix(self, bitpix: i64) -> Self {
        self.card("BITPIX", bitpix)
    }

    /// Standard TAN WCS centred on the image
    pub fn tan_wcs(self, ra: f64, dec: f64, scale_deg: f64) -> Self {
        let n1 = self.hdus.last().map(|h| h.get_int("NAXIS1")).unwrap_or(0);
        let n2 = self.hdus.last().map(|h| h.get_int("NAXIS2")).unwrap_or(0);
        self.card("CTYPE1", "RA---TAN")
            .card("CTYPE2", "DEC--TAN")
            .card("CRPIX1", (n1 as f64 + 1.0) / 2.0)
            .card("CRPIX2", (n2 as f64 + 1.0) / 2.0)
            .card("CRVAL1", ra)
            .card("CRVAL2", dec)
            .card("CD1_1", -scale_deg)
            .card("CD1_2", 0.0)
            .card("CD2_1", 0.0)
            .card("CD2_2", scale_deg)
    }

    /// Start an IMAGE extension
    pub fn extension_image(mut self, naxis1: i64, naxis2: i64) -> Self {
        let mut hdu = HduSpec {
            cards: Vec::new(),
            data: Vec::new(),
            data_len: 0,
        };
        hdu.set("XTENSION", Value::Text("IMAGE".into()));
        hdu.set("BITPIX", Value::Integer(-32));
        hdu.set("NAXIS", Value::Integer(2));
        hdu.set("NAXIS1", Value::Integer(naxis1));
        hdu.set("NAXIS2", Value::Integer(naxis2));
        hdu.set("PCOUNT", Value::Integer(0));
        hdu.set("GCOUNT", Value::Integer(1));
        self.hdus.push(hdu);
        self
    }

    /// Start a BINTABLE extension with zero-filled rows
    pub fn bintable(mut self, columns: &[(&str, &str)], rows: usize) -> Self {
        let width: usize = columns
            .iter()
            .map(|(_, tform)| crate::fits::column_width(tform).unwrap_or(0))
            .sum();
        let mut hdu = HduSpec {
            cards: Vec::new(),
            data: Vec::new(),
            data_len: (width * rows) as u64,
        };
        hdu.set("XTENSION", Value::Text("BINTABLE".into()));
        hdu.set("BITPIX", Value::Integer(8));
        hdu.set("NAXIS", Value::Integer(2));
        hdu.set("NAXIS1", Value::Integer(width as i64));
        hdu.set("NAXIS2", Value::Integer(rows as i64));
        hdu.set("PCOUNT", Value::Integer(0));
        hdu.set("GCOUNT", Value::Integer(1));
        hdu.set("TFIELDS", Value::Integer(columns.len() as i64));
        for (i, (name, tform)) in columns.iter().enumerate() {
            hdu.set(&format!("TTYPE{}", i + 1), Value::Text(name.to_string()));
            hdu.set(&format!("TFORM{}", i + 1), Value::Text(tform.to_string()));
        }
        self.hdus.push(hdu);
        self
    }

    /// Replace the current table's rows with big-endian encoded bytes
    pub fn table_data(mut self, rows: usize, bytes: Vec<u8>) -> Self {
        let hdu = self.current();
        hdu.set("NAXIS2", Value::Integer(rows as i64));
        hdu.data_len = bytes.len() as u64;
        hdu.data = bytes;
        self
    }

    /// Start an ASCII TABLE extension
    pub fn ascii_table(mut self, width: i64, rows: i64) -> Self {
        let mut hdu = HduSpec {
            cards: Vec::new(),
            data: Vec::new(),
            data_len: (width * rows) as u64,
        };
        hdu.set("XTENSION", Value::Text("TABLE".into()));
        hdu.set("BITPIX", Value::Integer(8));
        hdu.set("NAXIS", Value::Integer(2));
        hdu.set("NAXIS1", Value::Integer(width));
        hdu.set("NAXIS2", Value::Integer(rows));
        hdu.set("PCOUNT", Value::Integer(0));
        hdu.set("GCOUNT", Value::Integer(1));
        hdu.set("TFIELDS", Value::Integer(1));
        hdu.set("TTYPE1", Value::Text("X".into()));
        hdu.set("TFORM1", Value::Text(format!("A{width}")));
        self.hdus.push(hdu);
        self
    }

    /// Serialize all HDUs
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for hdu in &self.hdus {
            let mut header = Vec::new();
            for (key, value) in &hdu.cards {
                header.extend_from_slice(format_card(key, value).as_bytes());
            }
            header.extend_from_slice(format!("{:<80}", "END").as_bytes());
            header.resize(padded_size(header.len() as u64) as usize, b' ');
            out.extend_from_slice(&header);

            let data_len = if hdu.data.is_empty() && hdu.data_len == 0 {
                hdu.image_data_len()
            } else {
                hdu.data_len
            };
            let mut data = hdu.data.clone();
            data.resize(padded_size(data_len) as usize, 0);
            out.extend_from_slice(&data);
        }
        out
    }

    /// Write the file to `path`
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.build())
    }
}

/// Format one 80-byte header card
pub fn format_card(key: &str, value: &Value) -> String {
    let rendered = match value {
        Value::Bool(true) => format!("{:>20}", "T"),
        Value::Bool(false) => format!("{:>20}", "F"),
        Value::Integer(i) => format!("{i:>20}"),
        Value::Float(f) => format!("{:>20}", format_float(*f)),
        Value::Text(s) => format!("'{:<8}'", s.replace('\'', "''")),
        other => format!("'{other}'"),
    };
    let card = format!("{key:<8}= {rendered}");
    let mut card: String = card.chars().take(CARD_SIZE).collect();
    while card.len() < CARD_SIZE {
        card.push(' ');
    }
    card
}

fn format_float(f: f64) -> String {
    let text = format!("{f:?}");
    if text.contains('.') || text.contains('e') || text.contains("inf") || text.contains("NaN") {
        text.replace('e', "E")
    } else {
        format!("{text}.0")
    }
}

/// Bytes of a file consisting of `n` blank blocks, for truncation tests
pub fn blank_blocks(n: usize) -> Vec<u8> {
    vec![b' '; n * BLOCK_SIZE as usize]
}
