//! ChainPack encode side, grounded in `chainpack.cpp`'s `write`/`writeData`/
//! `writeMetaData`/`writeTypeInfo`.

use byteorder::{ByteOrder, LittleEndian};

use super::vlq;
use crate::constants;
use crate::error::{Error, Result};
use crate::reader::DepthGuard;
use crate::value::{Array, DateTime, ElementType, MetaData, Type, Value};

pub fn to_bytes(v: &Value) -> Result<Vec<u8>> {
    to_bytes_with_depth(v, constants::DEFAULT_MAX_RECURSION_DEPTH)
}

pub fn to_bytes_with_depth(v: &Value, max_depth: usize) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut depth = DepthGuard::new(max_depth);
    write_value(&mut out, v, &mut depth)?;
    Ok(out)
}

/// Like [`to_bytes`], but refuses to serialize `v` (or anything nested in
/// it) if it contains an `Invalid` value, instead of the default lenient
/// policy of writing `Invalid` as `Null`.
pub fn to_bytes_strict(v: &Value) -> Result<Vec<u8>> {
    to_bytes_with_depth_strict(v, constants::DEFAULT_MAX_RECURSION_DEPTH)
}

pub fn to_bytes_with_depth_strict(v: &Value, max_depth: usize) -> Result<Vec<u8>> {
    if v.contains_invalid() {
        return Err(Error::InvalidValueRejected);
    }
    to_bytes_with_depth(v, max_depth)
}

pub fn write_value(out: &mut Vec<u8>, v: &Value, depth: &mut DepthGuard) -> Result<()> {
    if let Some(meta) = v.meta() {
        write_meta(out, meta, depth)?;
    }
    write_value_data(out, v, depth)
}

/// Encodes just the body (meta-data-less) of `v`, ignoring any meta-data it
/// carries. Used by the RPC framing layer, which frames meta and body as
/// separately-addressable byte ranges.
pub(crate) fn to_bytes_body_only(v: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut depth = DepthGuard::new(constants::DEFAULT_MAX_RECURSION_DEPTH);
    write_value_data(&mut out, v, &mut depth)?;
    Ok(out)
}

/// Encodes a stand-alone meta-data prefix, as written ahead of a value
/// (`<meta_data_bytes><body_bytes>` framing).
pub(crate) fn meta_to_bytes(meta: &MetaData) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut depth = DepthGuard::new(constants::DEFAULT_MAX_RECURSION_DEPTH);
    write_meta(&mut out, meta, &mut depth)?;
    Ok(out)
}

pub(crate) fn write_meta(out: &mut Vec<u8>, meta: &MetaData, depth: &mut DepthGuard) -> Result<()> {
    if !meta.i_values().is_empty() {
        out.push(constants::META_IMAP);
        for (k, val) in meta.i_values().iter() {
            vlq::write_uint(out, *k as u64);
            write_value_data(out, val, depth)?;
        }
        out.push(constants::TERM);
    }
    if !meta.s_values().is_empty() {
        out.push(constants::META_SMAP);
        for (k, val) in meta.s_values().iter() {
            write_string_payload(out, k);
            write_value_data(out, val, depth)?;
        }
        out.push(constants::TERM);
    }
    Ok(())
}

fn write_string_payload(out: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    vlq::write_uint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

/// Packs a `DateTime` into a single signed VLQ `Int`, matching
/// `chainpack.cpp::writeData_DateTime` bit for bit: the offset (if any) is
/// folded into the same integer — shifted in above the millisecond value —
/// rather than appended as a separate byte, so the whole thing round-trips
/// through `write_int`/`read_int` as one value.
fn write_date_time(out: &mut Vec<u8>, dt: &DateTime) {
    let mut msecs = dt.msec_since_epoch() - crate::value::SHV_EPOCH_MSEC;
    let offset = (dt.tz_quarter_hours() as i64) & 0x7F;
    let ms = msecs % 1000;
    if ms == 0 {
        msecs /= 1000;
    }
    if offset != 0 {
        msecs <<= 7;
        msecs |= offset;
    }
    msecs <<= constants::DATE_TIME_SHIFT_TZ;
    if offset != 0 {
        msecs |= constants::DATE_TIME_MASK_HAS_TZ as i64;
    }
    if ms == 0 {
        msecs |= constants::DATE_TIME_MASK_NO_MSEC as i64;
    }
    vlq::write_int(out, msecs);
}

/// Array element-type tags live in their own byte range, disjoint from the
/// scalar tags (see `constants::ARRAY_ELEM_*`) — reusing the scalar bytes
/// would make e.g. an `Array<Int>` byte-identical to a scalar `Int` on the
/// wire, since the scalar tags already have the `ARRAY_FLAG` bit set.
fn element_type_tag(et: ElementType) -> u8 {
    match et {
        ElementType::Null => constants::ARRAY_ELEM_NULL,
        ElementType::Bool => constants::ARRAY_ELEM_BOOL,
        ElementType::Int => constants::ARRAY_ELEM_INT,
        ElementType::UInt => constants::ARRAY_ELEM_UINT,
        ElementType::Double => constants::ARRAY_ELEM_DOUBLE,
        ElementType::Decimal => constants::ARRAY_ELEM_DECIMAL,
        ElementType::DateTime => constants::ARRAY_ELEM_DATE_TIME,
    }
}

fn write_array_element(out: &mut Vec<u8>, et: ElementType, v: &Value) -> Result<()> {
    if !et.matches(v.type_()) {
        return Err(Error::UnsupportedArrayType(v.type_().name()));
    }
    match et {
        ElementType::Null => {}
        ElementType::Bool => out.push(v.as_bool() as u8),
        ElementType::Int => vlq::write_int(out, v.as_int()),
        ElementType::UInt => vlq::write_uint(out, v.as_uint()),
        ElementType::Double => {
            let mut b = [0u8; 8];
            LittleEndian::write_f64(&mut b, v.as_double());
            out.extend_from_slice(&b);
        }
        ElementType::Decimal => {
            let d = v.as_decimal();
            vlq::write_int(out, d.mantissa());
            vlq::write_int(out, d.precision() as i64);
        }
        ElementType::DateTime => write_date_time(out, &v.as_date_time()),
    }
    Ok(())
}

fn write_array(out: &mut Vec<u8>, a: &Array) -> Result<()> {
    match a.elements.iter().find(|e| !a.element_type.matches(e.type_())) {
        Some(bad) => return Err(Error::UnsupportedArrayType(bad.type_().name())),
        None => {}
    }
    out.push(element_type_tag(a.element_type) | constants::ARRAY_FLAG);
    vlq::write_uint(out, a.elements.len() as u64);
    for e in &a.elements {
        write_array_element(out, a.element_type, e)?;
    }
    Ok(())
}

fn write_value_data(out: &mut Vec<u8>, v: &Value, depth: &mut DepthGuard) -> Result<()> {
    depth.enter()?;
    let result = write_value_data_inner(out, v, depth);
    depth.leave();
    result
}

fn write_value_data_inner(out: &mut Vec<u8>, v: &Value, depth: &mut DepthGuard) -> Result<()> {
    match v.type_() {
        Type::Invalid | Type::Null => out.push(constants::NULL),
        Type::Bool => out.push(if v.as_bool() { constants::TRUE } else { constants::FALSE }),
        Type::UInt => {
            let n = v.as_uint();
            if n <= constants::TINY_UINT_MAX as u64 {
                out.push(n as u8);
            } else {
                out.push(constants::UINT);
                vlq::write_uint(out, n);
            }
        }
        Type::Int => {
            let n = v.as_int();
            if (0..64).contains(&n) {
                out.push(constants::TINY_INT_MIN + n as u8);
            } else {
                out.push(constants::INT);
                vlq::write_int(out, n);
            }
        }
        Type::Double => {
            out.push(constants::DOUBLE);
            let mut b = [0u8; 8];
            LittleEndian::write_f64(&mut b, v.as_double());
            out.extend_from_slice(&b);
        }
        Type::Decimal => {
            out.push(constants::DECIMAL);
            let d = v.as_decimal();
            vlq::write_int(out, d.mantissa());
            vlq::write_int(out, d.precision() as i64);
        }
        Type::DateTime => {
            out.push(constants::DATE_TIME);
            write_date_time(out, &v.as_date_time());
        }
        Type::Blob => {
            out.push(constants::BLOB);
            let b = v.as_blob();
            vlq::write_uint(out, b.len() as u64);
            out.extend_from_slice(b);
        }
        Type::String => {
            out.push(constants::STRING);
            write_string_payload(out, v.as_str());
        }
        Type::List => {
            out.push(constants::LIST);
            for item in v.as_list() {
                write_value(out, item, depth)?;
            }
            out.push(constants::TERM);
        }
        Type::Map => {
            out.push(constants::MAP);
            for (k, val) in v.as_map().expect("Type::Map").iter() {
                write_string_payload(out, k);
                write_value(out, val, depth)?;
            }
            out.push(constants::TERM);
        }
        Type::IMap => {
            out.push(constants::IMAP);
            for (k, val) in v.as_imap().expect("Type::IMap").iter() {
                vlq::write_uint(out, *k as u64);
                write_value(out, val, depth)?;
            }
            out.push(constants::TERM);
        }
        Type::Array => {
            write_array(out, v.as_array().expect("Type::Array"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Array as ArrayV, ElementType};

    #[test]
    fn null_encodes_to_single_byte() {
        assert_eq!(to_bytes(&Value::null()).unwrap(), vec![0x82]);
    }

    #[test]
    fn small_uint_is_tiny() {
        assert_eq!(to_bytes(&Value::from(63u64)).unwrap(), vec![0x3F]);
    }

    #[test]
    fn large_uint_uses_escape() {
        assert_eq!(to_bytes(&Value::from(64u64)).unwrap(), vec![0x83, 64]);
    }

    #[test]
    fn negative_int_round_trips_through_chainpack() {
        let v = Value::from(-1i64);
        let bytes = to_bytes(&v).unwrap();
        let back = super::super::from_bytes(&bytes).unwrap();
        assert_eq!(back.as_int(), -1);
    }

    #[test]
    fn list_encodes_with_term_sentinel() {
        let list: Vec<Value> = vec![Value::from(1i64), Value::from(2i64), Value::from(3i64)];
        let v = Value::from(list);
        assert_eq!(to_bytes(&v).unwrap(), vec![0x88, 0x41, 0x42, 0x43, 0xFF]);
    }

    #[test]
    fn heterogeneous_array_is_rejected() {
        let mut a = ArrayV::new(ElementType::Int);
        a.elements.push(Value::from("oops"));
        let v = Value::from(a);
        assert!(to_bytes(&v).is_err());
    }

    #[test]
    fn int_array_round_trips_and_is_not_confused_with_scalar_int() {
        let mut a = ArrayV::new(ElementType::Int);
        a.elements.push(Value::from(1i64));
        a.elements.push(Value::from(-2i64));
        let v = Value::from(a);
        let bytes = to_bytes(&v).unwrap();
        // Array element-type tag must differ from the scalar Int tag (0x84),
        // else this would decode back as a bare scalar Int.
        assert_ne!(bytes[0], constants::INT);
        let back = super::super::from_bytes(&bytes).unwrap();
        let arr = back.as_array().unwrap();
        assert_eq!(arr.elements.len(), 2);
        assert_eq!(arr.elements[0].as_int(), 1);
        assert_eq!(arr.elements[1].as_int(), -2);
    }

    #[test]
    fn bool_array_round_trips() {
        let mut a = ArrayV::new(ElementType::Bool);
        a.elements.push(Value::from(true));
        a.elements.push(Value::from(false));
        let v = Value::from(a);
        let bytes = to_bytes(&v).unwrap();
        let back = super::super::from_bytes(&bytes).unwrap();
        let arr = back.as_array().unwrap();
        assert_eq!(arr.elements[0].as_bool(), true);
        assert_eq!(arr.elements[1].as_bool(), false);
    }

    #[test]
    fn lenient_writer_serializes_invalid_as_null() {
        assert_eq!(to_bytes(&Value::default()).unwrap(), vec![constants::NULL]);
    }

    #[test]
    fn strict_writer_rejects_invalid_value() {
        assert!(matches!(to_bytes_strict(&Value::default()), Err(Error::InvalidValueRejected)));
    }

    #[test]
    fn strict_writer_rejects_invalid_nested_in_a_list() {
        let list: Vec<Value> = vec![Value::from(1i64), Value::default()];
        let v = Value::from(list);
        assert!(to_bytes(&v).is_ok());
        assert!(matches!(to_bytes_strict(&v), Err(Error::InvalidValueRejected)));
    }

    #[test]
    fn meta_data_is_written_before_value() {
        let mut v = Value::from(1i64);
        v.set_meta_value_i(8, Value::from(42i64));
        let bytes = to_bytes(&v).unwrap();
        assert_eq!(bytes[0], constants::META_IMAP);
    }
}
