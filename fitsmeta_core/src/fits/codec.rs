//! Pure helpers over header keywords: block arithmetic, HDU classification,
//! pixel types and table column widths

use super::header::Header;
use crate::error::{FitsError, Result, ValidationError};

/// Size of one FITS block in bytes
pub const BLOCK_SIZE: u64 = 2880;

/// Round a byte count up to the next multiple of [`BLOCK_SIZE`]
pub fn padded_size(n: u64) -> u64 {
    n.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

/// Extension type of a non-primary HDU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Image,
    BinTable,
    Table,
}

impl Extension {
    /// Extension of the HDU described by `header`; `None` for primary HDUs
    pub fn of(header: &Header) -> Result<Option<Self>> {
        let Some(name) = header.get_str("XTENSION") else {
            return Ok(None);
        };
        match name.to_ascii_uppercase().as_str() {
            "IMAGE" => Ok(Some(Self::Image)),
            "BINTABLE" => Ok(Some(Self::BinTable)),
            "TABLE" => Ok(Some(Self::Table)),
            other => Err(FitsError::unsupported(format!("extension type '{other}'")).into()),
        }
    }
}

/// True when the header describes pixel data
pub fn is_image_header(header: &Header) -> bool {
    if header.get_bool("SIMPLE") == Some(true) {
        return header.get_int("NAXIS").unwrap_or(0) >= 2;
    }
    header
        .get_str("XTENSION")
        .is_some_and(|x| x.eq_ignore_ascii_case("IMAGE"))
}

/// True when the header describes a binary or ASCII table
pub fn is_catalog_header(header: &Header) -> bool {
    header.get_str("XTENSION").is_some_and(|x| {
        x.eq_ignore_ascii_case("BINTABLE") || x.eq_ignore_ascii_case("TABLE")
    })
}

/// Size in bytes of the data unit after the header, including padding
///
/// Axis lengths whose product does not fit in a `u64` are a bad value.
pub fn data_unit_bytes(header: &Header) -> Result<u64> {
    let extension = Extension::of(header)?;
    let count = |key: &str, default: i64| header.get_int(key).unwrap_or(default).max(0) as u64;
    let overflow = || ValidationError::bad_value("data unit size does not fit in 64 bits");

    if let Some(Extension::BinTable | Extension::Table) = extension {
        let bytes_per_element = header.get_int("BITPIX").unwrap_or(8).unsigned_abs() / 8;
        let table = bytes_per_element
            .checked_mul(count("NAXIS1", 0))
            .and_then(|n| n.checked_mul(count("NAXIS2", 0)))
            .and_then(|n| n.checked_add(count("PCOUNT", 0)))
            .and_then(checked_padded_size)
            .ok_or_else(overflow)?;
        return Ok(table);
    }

    let naxis = header.get_int("NAXIS").unwrap_or(0);
    if naxis < 1 {
        return Ok(0);
    }

    let bitpix = header
        .get_int("BITPIX")
        .ok_or_else(|| ValidationError::bad_value("header has no BITPIX"))?;
    let bytes_per_element = bitpix.unsigned_abs() / 8;
    let mut elements: u64 = 1;
    for axis in 1..=naxis {
        elements = elements
            .checked_mul(count(&format!("NAXIS{axis}"), 0))
            .ok_or_else(overflow)?;
    }

    let bytes = match extension {
        Some(Extension::Image) => count("PCOUNT", 0)
            .checked_add(elements)
            .and_then(|n| n.checked_mul(count("GCOUNT", 1)))
            .and_then(|n| n.checked_mul(bytes_per_element)),
        _ => bytes_per_element.checked_mul(elements),
    };

    bytes.and_then(checked_padded_size).ok_or_else(|| overflow().into())
}

fn checked_padded_size(n: u64) -> Option<u64> {
    n.div_ceil(BLOCK_SIZE).checked_mul(BLOCK_SIZE)
}

/// Pixel element type named by `BITPIX`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Unknown,
}

impl PixelType {
    pub fn from_bitpix(bitpix: i64) -> Self {
        match bitpix {
            8 => Self::Byte,
            16 => Self::Short,
            32 => Self::Int,
            64 => Self::Long,
            -32 => Self::Float,
            -64 => Self::Double,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Unknown => "unknown",
        }
    }

    /// Bytes per element
    pub fn size(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Short => 2,
            Self::Int | Self::Float => 4,
            Self::Long | Self::Double => 8,
            Self::Unknown => 0,
        }
    }
}

/// Pixel type for a `BITPIX` value
pub fn element_size(bitpix: i64) -> PixelType {
    PixelType::from_bitpix(bitpix)
}

/// PostgreSQL column type for a binary-table `TFORM`
///
/// Repeat counts and trailing widths are ignored; the first letter decides.
pub fn fits_format_to_sql(tform: &str) -> Result<&'static str> {
    let code = tform
        .trim()
        .chars()
        .find(|c| !c.is_ascii_digit())
        .map(|c| c.to_ascii_uppercase());

    match code {
        Some('A') => Ok("text"),
        Some('D') => Ok("double precision"),
        Some('E' | 'F') => Ok("real"),
        Some('I') => Ok("smallint"),
        Some('J') => Ok("integer"),
        Some('K') => Ok("bigint"),
        Some('L') => Ok("boolean"),
        Some('X') => Ok("bit"),
        Some('Z' | 'O') => Ok("bytea"),
        Some(c @ ('B' | 'C' | 'M' | 'P' | 'Q')) => {
            Err(FitsError::unsupported(format!("no SQL type for column type '{c}'")).into())
        }
        _ => Err(ValidationError::bad_value(format!("unknown column format '{tform}'")).into()),
    }
}

/// A parsed `TFORMn` value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnFormat {
    pub repeat: usize,
    pub code: char,
}

impl ColumnFormat {
    /// Parse a binary-table `TFORM` such as `1J`, `20A` or `E`
    pub fn parse(tform: &str) -> Result<Self> {
        let tform = tform.trim();
        let digits: String = tform.chars().take_while(char::is_ascii_digit).collect();
        let code = tform[digits.len()..]
            .chars()
            .next()
            .ok_or_else(|| ValidationError::bad_value(format!("empty TFORM '{tform}'")))?;
        let repeat = if digits.is_empty() {
            1
        } else {
            digits
                .parse()
                .map_err(|_| ValidationError::bad_value(format!("bad TFORM repeat '{tform}'")))?
        };
        Ok(Self {
            repeat,
            code: code.to_ascii_uppercase(),
        })
    }

    /// Bytes occupied by one cell of this column
    pub fn byte_width(self) -> Result<usize> {
        let unit = match self.code {
            'L' | 'B' | 'A' => 1,
            'X' => return Ok(self.repeat.div_ceil(8)),
            'I' => 2,
            'J' | 'E' => 4,
            'K' | 'D' => 8,
            'C' | 'M' | 'P' | 'Q' => {
                return Err(FitsError::unsupported(format!(
                    "binary table column type '{}'",
                    self.code
                ))
                .into());
            }
            other => {
                return Err(ValidationError::bad_value(format!(
                    "unknown binary table column type '{other}'"
                ))
                .into());
            }
        };
        Ok(unit * self.repeat)
    }
}

/// Cell width in bytes for a `TFORM` value
pub fn column_width(tform: &str) -> Result<usize> {
    ColumnFormat::parse(tform)?.byte_width()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    fn header(pairs: &[(&str, crate::value::Value)]) -> Header {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_padded_size_boundaries() {
        assert_eq!(padded_size(0), 0);
        assert_eq!(padded_size(1), 2880);
        assert_eq!(padded_size(2880), 2880);
        assert_eq!(padded_size(2881), 5760);
    }

    #[test]
    fn test_image_data_unit() {
        let h = header(&[
            ("SIMPLE", true.into()),
            ("BITPIX", (-64).into()),
            ("NAXIS", 2.into()),
            ("NAXIS1", 9791.into()),
            ("NAXIS2", 4305.into()),
        ]);
        assert_eq!(data_unit_bytes(&h).unwrap(), 337_204_800);
    }

    #[test]
    fn test_empty_primary_has_no_data() {
        let h = header(&[("SIMPLE", true.into()), ("BITPIX", 8.into()), ("NAXIS", 0.into())]);
        assert_eq!(data_unit_bytes(&h).unwrap(), 0);
        assert!(!is_image_header(&h));
    }

    #[test]
    fn test_bintable_data_unit_includes_heap() {
        let h = header(&[
            ("XTENSION", "BINTABLE".into()),
            ("NAXIS1", 24.into()),
            ("NAXIS2", 100.into()),
            ("PCOUNT", 3000.into()),
        ]);
        assert_eq!(data_unit_bytes(&h).unwrap(), padded_size(5400));
        assert!(is_catalog_header(&h));
        assert!(!is_image_header(&h));
    }

    #[test]
    fn test_image_extension_groups() {
        let h = header(&[
            ("XTENSION", "IMAGE".into()),
            ("BITPIX", 16.into()),
            ("NAXIS", 1.into()),
            ("NAXIS1", 1000.into()),
            ("PCOUNT", 440.into()),
            ("GCOUNT", 2.into()),
        ]);
        assert_eq!(data_unit_bytes(&h).unwrap(), padded_size(2 * 2 * 1440));
    }

    #[test]
    fn test_ascii_table_data_unit() {
        let h = header(&[
            ("XTENSION", "TABLE   ".into()),
            ("NAXIS1", 80.into()),
            ("NAXIS2", 40.into()),
        ]);
        assert_eq!(data_unit_bytes(&h).unwrap(), 5760);
    }

    #[test]
    fn test_oversized_table_is_bad_value() {
        let h = header(&[
            ("XTENSION", "BINTABLE".into()),
            ("NAXIS1", 4_294_967_296i64.into()),
            ("NAXIS2", 4_294_967_296i64.into()),
        ]);
        let err = data_unit_bytes(&h).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadValue);
    }

    #[test]
    fn test_oversized_image_is_bad_value() {
        let h = header(&[
            ("SIMPLE", true.into()),
            ("BITPIX", (-64).into()),
            ("NAXIS", 3.into()),
            ("NAXIS1", 4_294_967_296i64.into()),
            ("NAXIS2", 4_294_967_296i64.into()),
            ("NAXIS3", 2.into()),
        ]);
        assert_eq!(data_unit_bytes(&h).unwrap_err().kind(), ErrorKind::BadValue);

        let last_block = header(&[
            ("SIMPLE", true.into()),
            ("BITPIX", 16.into()),
            ("NAXIS", 1.into()),
            ("NAXIS1", i64::MAX.into()),
        ]);
        assert_eq!(data_unit_bytes(&last_block).unwrap_err().kind(), ErrorKind::BadValue);
    }

    #[test]
    fn test_unknown_extension_is_unsupported() {
        let h = header(&[("XTENSION", "A3DTABLE".into())]);
        let err = data_unit_bytes(&h).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedType);
    }

    #[test]
    fn test_image_extension_classification() {
        let h = header(&[("XTENSION", "IMAGE".into()), ("NAXIS", 2.into())]);
        assert!(is_image_header(&h));
        let spectrum = header(&[("SIMPLE", true.into()), ("NAXIS", 1.into())]);
        assert!(!is_image_header(&spectrum));
        assert!(!is_catalog_header(&h));
    }

    #[test]
    fn test_element_size() {
        assert_eq!(element_size(-32).label(), "float");
        assert_eq!(element_size(-32).size(), 4);
        assert_eq!(element_size(16).label(), "short");
        assert_eq!(element_size(64).size(), 8);
        assert_eq!(element_size(12), PixelType::Unknown);
        assert_eq!(element_size(12).label(), "unknown");
    }

    #[test]
    fn test_fits_format_to_sql() {
        assert_eq!(fits_format_to_sql("20A").unwrap(), "text");
        assert_eq!(fits_format_to_sql("1D").unwrap(), "double precision");
        assert_eq!(fits_format_to_sql("E").unwrap(), "real");
        assert_eq!(fits_format_to_sql("F8.3").unwrap(), "real");
        assert_eq!(fits_format_to_sql("1K").unwrap(), "bigint");
        assert_eq!(fits_format_to_sql("L").unwrap(), "boolean");
        assert_eq!(fits_format_to_sql("16X").unwrap(), "bit");
    }

    #[test]
    fn test_fits_format_to_sql_rejections() {
        assert_eq!(
            fits_format_to_sql("1B").unwrap_err().kind(),
            ErrorKind::UnsupportedType
        );
        assert_eq!(
            fits_format_to_sql("1PE(5)").unwrap_err().kind(),
            ErrorKind::UnsupportedType
        );
        assert_eq!(fits_format_to_sql("3W").unwrap_err().kind(), ErrorKind::BadValue);
        assert_eq!(fits_format_to_sql("").unwrap_err().kind(), ErrorKind::BadValue);
    }

    #[test]
    fn test_column_widths() {
        assert_eq!(column_width("1J").unwrap(), 4);
        assert_eq!(column_width("D").unwrap(), 8);
        assert_eq!(column_width("20A").unwrap(), 20);
        assert_eq!(column_width("3E").unwrap(), 12);
        assert_eq!(column_width("11X").unwrap(), 2);
        assert_eq!(column_width("0K").unwrap(), 0);
    }

    #[test]
    fn test_variable_length_columns_unsupported() {
        let err = column_width("1PE(12)").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedType);
        let err = column_width("2C").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedType);
    }

    #[test]
    fn test_unknown_column_letter_is_bad_value() {
        let err = column_width("3Z").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadValue);
    }

    proptest! {
        #[test]
        fn padded_size_is_smallest_block_multiple(n in 0u64..10_000_000) {
            let p = padded_size(n);
            prop_assert_eq!(p % BLOCK_SIZE, 0);
            prop_assert!(p >= n);
            prop_assert!(p < n + BLOCK_SIZE);
        }
    }
}
