//! Binary table column descriptions and row decoding

use super::codec::{ColumnFormat, Extension};
use super::header::Header;
use crate::bundle::ColumnInfo;
use crate::error::{FitsError, Result, ValidationError};
use crate::value::Value;

/// Column names and `TFORM` strings of a table HDU
pub fn column_info(header: &Header) -> Result<ColumnInfo> {
    let fields = header.get_int("TFIELDS").unwrap_or(0).max(0) as usize;
    let mut names = Vec::with_capacity(fields);
    let mut formats = Vec::with_capacity(fields);

    for n in 1..=fields {
        let format = header
            .get_str(&format!("TFORM{n}"))
            .ok_or_else(|| ValidationError::bad_value(format!("table has no TFORM{n}")))?;
        let name = header
            .get_str(&format!("TTYPE{n}"))
            .map(str::to_string)
            .unwrap_or_else(|| format!("col{n}"));
        names.push(name);
        formats.push(format.to_string());
    }

    ColumnInfo::new(names, formats)
}

#[derive(Debug)]
struct Column {
    format: ColumnFormat,
    width: usize,
    scale: Option<(f64, f64)>,
}

/// Decode every row of a binary table
///
/// `TSCALn`/`TZEROn` are applied to integer columns. ASCII tables are not
/// decoded.
pub fn decode_rows(header: &Header, data: &[u8]) -> Result<Vec<Vec<Value>>> {
    if Extension::of(header)? != Some(Extension::BinTable) {
        return Err(FitsError::unsupported("row data is only read from BINTABLE extensions").into());
    }

    let info = column_info(header)?;
    let mut columns = Vec::with_capacity(info.format.len());
    for (i, tform) in info.format.iter().enumerate() {
        let format = ColumnFormat::parse(tform)?;
        let n = i + 1;
        let tscal = header.get_float(&format!("TSCAL{n}"));
        let tzero = header.get_float(&format!("TZERO{n}"));
        let scale = match (tscal, tzero) {
            (None, None) => None,
            (s, z) => Some((s.unwrap_or(1.0), z.unwrap_or(0.0))),
        };
        columns.push(Column {
            format,
            width: format.byte_width()?,
            scale,
        });
    }

    let row_width = header.get_int("NAXIS1").unwrap_or(0).max(0) as usize;
    let rows = header.get_int("NAXIS2").unwrap_or(0).max(0) as usize;
    let declared: usize = columns.iter().map(|c| c.width).sum();
    if declared > row_width {
        return Err(ValidationError::bad_value(format!(
            "columns need {declared} bytes but NAXIS1 is {row_width}"
        ))
        .into());
    }
    if row_width.checked_mul(rows).is_none_or(|needed| data.len() < needed) {
        return Err(ValidationError::bad_value("table data shorter than NAXIS1 * NAXIS2").into());
    }

    let mut out = Vec::with_capacity(rows.min(data.len() / row_width.max(1)));
    for row in data.chunks_exact(row_width.max(1)).take(rows) {
        let mut offset = 0;
        let mut values = Vec::with_capacity(columns.len());
        for column in &columns {
            let cell = &row[offset..offset + column.width];
            values.push(decode_cell(column, cell));
            offset += column.width;
        }
        out.push(values);
    }
    Ok(out)
}

fn decode_cell(column: &Column, cell: &[u8]) -> Value {
    let ColumnFormat { repeat, code } = column.format;

    match code {
        'A' => {
            let text = String::from_utf8_lossy(cell);
            Value::Text(text.trim_end_matches(['\0', ' ']).to_string())
        }
        'X' => Value::Array(
            (0..repeat)
                .map(|bit| Value::Bool(cell[bit / 8] & (0x80 >> (bit % 8)) != 0))
                .collect(),
        ),
        _ => {
            let unit = column.width / repeat.max(1);
            let mut items: Vec<Value> = cell
                .chunks_exact(unit.max(1))
                .take(repeat)
                .map(|bytes| scaled(column.scale, decode_scalar(code, bytes)))
                .collect();
            if repeat == 1 {
                items.pop().unwrap_or(Value::Array(Vec::new()))
            } else {
                Value::Array(items)
            }
        }
    }
}

fn decode_scalar(code: char, bytes: &[u8]) -> Value {
    match code {
        'L' => Value::Bool(bytes[0] == b'T'),
        'B' => Value::Integer(bytes[0] as i64),
        'I' => Value::Integer(i16::from_be_bytes([bytes[0], bytes[1]]) as i64),
        'J' => Value::Integer(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as i64),
        'K' => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[..8]);
            Value::Integer(i64::from_be_bytes(buf))
        }
        'E' => Value::Float(f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64),
        'D' => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[..8]);
            Value::Float(f64::from_be_bytes(buf))
        }
        _ => Value::Array(Vec::new()),
    }
}

fn scaled(scale: Option<(f64, f64)>, value: Value) -> Value {
    let Some((tscal, tzero)) = scale else {
        return value;
    };
    match value {
        Value::Integer(raw) if tscal == 1.0 && tzero.fract() == 0.0 => {
            Value::Integer(raw + tzero as i64)
        }
        Value::Integer(raw) => Value::Float(raw as f64 * tscal + tzero),
        other => other,
    }
}
