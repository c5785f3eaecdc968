//! Conversion between semantic values and their in-memory byte encodings
//!
//! Numeric types use native byte order at their declared width and
//! signedness, floats are IEEE-754 single/double precision, and strings are
//! raw UTF-8 with no terminator. Decoded floats are rounded to six decimal
//! digits; that rounding is the precision used for display and comparison.

use super::types::{DataType, MemoryError, MemoryResult, Value};

/// Decimal digits kept when decoding `Float`/`Double`
pub const FLOAT_DECIMALS: usize = 6;

/// Encodes `value` as the bytes `data_type` occupies in memory
pub fn encode(value: &Value, data_type: DataType) -> MemoryResult<Vec<u8>> {
    match data_type {
        DataType::String => Ok(match value {
            Value::Text(s) => s.as_bytes().to_vec(),
            other => other.to_string().into_bytes(),
        }),
        DataType::Float => {
            let v = float_operand(value, data_type)?;
            if v.is_finite() && v.abs() > f32::MAX as f64 {
                return Err(MemoryError::conversion(
                    value,
                    data_type,
                    "float too large to pack",
                ));
            }
            Ok((v as f32).to_ne_bytes().to_vec())
        }
        DataType::Double => Ok(float_operand(value, data_type)?.to_ne_bytes().to_vec()),
        _ => encode_integer(integer_operand(value, data_type)?, value, data_type),
    }
}

/// Decodes `bytes` as a value of `data_type`.
///
/// Strings decode lossily and drop trailing NUL bytes; numeric types require
/// exactly their declared width.
pub fn decode(bytes: &[u8], data_type: DataType) -> MemoryResult<Value> {
    if data_type == DataType::String {
        let text = String::from_utf8_lossy(bytes);
        return Ok(Value::Text(text.trim_end_matches('\0').to_string()));
    }

    let width = data_type.size().unwrap_or(0);
    if bytes.len() != width {
        return Err(MemoryError::conversion(
            hex::encode(bytes),
            data_type,
            format!("expected {} bytes, got {}", width, bytes.len()),
        ));
    }

    let value = match data_type {
        DataType::Int8 => Value::Int(i8::from_ne_bytes([bytes[0]]) as i64),
        DataType::UInt8 => Value::UInt(bytes[0] as u64),
        DataType::Int16 => Value::Int(i16::from_ne_bytes(array(bytes)) as i64),
        DataType::UInt16 => Value::UInt(u16::from_ne_bytes(array(bytes)) as u64),
        DataType::Int32 => Value::Int(i32::from_ne_bytes(array(bytes)) as i64),
        DataType::UInt32 => Value::UInt(u32::from_ne_bytes(array(bytes)) as u64),
        DataType::Int64 => Value::Int(i64::from_ne_bytes(array(bytes))),
        DataType::UInt64 => Value::UInt(u64::from_ne_bytes(array(bytes))),
        DataType::Float => Value::Float(round_decimals(f32::from_ne_bytes(array(bytes)) as f64)),
        DataType::Double => Value::Float(round_decimals(f64::from_ne_bytes(array(bytes)))),
        DataType::String => unreachable!("handled above"),
    };
    Ok(value)
}

/// Passes `value` through encode and decode so it compares the way memory does
pub fn normalize(value: &Value, data_type: DataType) -> MemoryResult<Value> {
    decode(&encode(value, data_type)?, data_type)
}

/// Parses user text into a value of `data_type`
pub fn parse(text: &str, data_type: DataType) -> MemoryResult<Value> {
    normalize(&Value::Text(text.to_string()), data_type)
}

/// Rounds to `FLOAT_DECIMALS` decimal places, correctly rounded in decimal
pub fn round_decimals(v: f64) -> f64 {
    if !v.is_finite() {
        return v;
    }
    format!("{:.*}", FLOAT_DECIMALS, v).parse().unwrap_or(v)
}

fn array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

fn integer_operand(value: &Value, data_type: DataType) -> MemoryResult<i128> {
    match value {
        Value::Int(v) => Ok(*v as i128),
        Value::UInt(v) => Ok(*v as i128),
        Value::Float(v) if v.is_finite() => Ok(v.trunc() as i128),
        Value::Float(_) => Err(MemoryError::conversion(
            value,
            data_type,
            "cannot convert non-finite float to integer",
        )),
        Value::Text(s) => s
            .trim()
            .parse::<i128>()
            .map_err(|e| MemoryError::conversion(s, data_type, e.to_string())),
    }
}

fn float_operand(value: &Value, data_type: DataType) -> MemoryResult<f64> {
    match value {
        Value::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| MemoryError::conversion(s, data_type, e.to_string())),
        other => other
            .as_f64()
            .ok_or_else(|| MemoryError::conversion(other, data_type, "not a number")),
    }
}

fn encode_integer(v: i128, original: &Value, data_type: DataType) -> MemoryResult<Vec<u8>> {
    let out_of_range =
        || MemoryError::conversion(original, data_type, "int too big to convert");

    let bytes = match data_type {
        DataType::Int8 => i8::try_from(v).map_err(|_| out_of_range())?.to_ne_bytes().to_vec(),
        DataType::UInt8 => u8::try_from(v).map_err(|_| out_of_range())?.to_ne_bytes().to_vec(),
        DataType::Int16 => i16::try_from(v).map_err(|_| out_of_range())?.to_ne_bytes().to_vec(),
        DataType::UInt16 => u16::try_from(v).map_err(|_| out_of_range())?.to_ne_bytes().to_vec(),
        DataType::Int32 => i32::try_from(v).map_err(|_| out_of_range())?.to_ne_bytes().to_vec(),
        DataType::UInt32 => u32::try_from(v).map_err(|_| out_of_range())?.to_ne_bytes().to_vec(),
        DataType::Int64 => i64::try_from(v).map_err(|_| out_of_range())?.to_ne_bytes().to_vec(),
        DataType::UInt64 => u64::try_from(v).map_err(|_| out_of_range())?.to_ne_bytes().to_vec(),
        DataType::Float | DataType::Double | DataType::String => {
            unreachable!("non-integer types are encoded by the caller")
        }
    };
    Ok(bytes)
}
