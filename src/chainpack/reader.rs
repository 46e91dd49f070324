//! ChainPack decode side, grounded in `chainpack.cpp`'s `read()`/`readData`/
//! `readMetaData` dispatch. Scalar decoding and List/Map/IMap body assembly
//! go through the shared [`Tokenizer`]/[`crate::reader::assemble_body`]
//! machinery; meta-data and arrays stay here since their shapes (two
//! sequential fixed-order sections, and a tag-and-count array prefix with
//! untagged element payloads) aren't expressible as a flat item stream.

use byteorder::{ByteOrder, LittleEndian};

use super::vlq;
use crate::constants;
use crate::error::{Error, Result};
use crate::reader::{assemble_body, ByteReader, ContainerKind, DepthGuard, Item, Unpack};
use crate::value::{build, Array, DateTime, Decimal, ElementType, IMap, Map, MetaData, Value};

pub fn from_bytes(data: &[u8]) -> Result<Value> {
    from_bytes_with_depth(data, constants::DEFAULT_MAX_RECURSION_DEPTH)
}

pub fn from_bytes_with_depth(data: &[u8], max_depth: usize) -> Result<Value> {
    let mut r = ByteReader::new(data);
    let mut depth = DepthGuard::new(max_depth);
    read_value(&mut r, &mut depth)
}

pub(crate) fn read_value(r: &mut ByteReader, depth: &mut DepthGuard) -> Result<Value> {
    let b = r.peek_u8()?;
    if b == constants::META_IMAP || b == constants::META_SMAP {
        let meta = read_meta(r, depth)?;
        let mut v = read_value_data(r, depth)?;
        v.set_meta(meta);
        Ok(v)
    } else {
        read_value_data(r, depth)
    }
}

/// Reads just the optional meta-data prefix, leaving the cursor positioned
/// right at the start of the value body (does not read the value itself).
/// Grounded in `ChainPackReader::read(RpcValue::MetaData&)`, which peeks for
/// the meta marker and parses only the meta map, never the trailing value —
/// used by the RPC framing layer to decode meta-data eagerly without paying
/// for a full body decode.
pub(crate) fn read_meta_only(r: &mut ByteReader, depth: &mut DepthGuard) -> Result<MetaData> {
    let b = r.peek_u8()?;
    if b == constants::META_IMAP || b == constants::META_SMAP {
        read_meta(r, depth)
    } else {
        Ok(MetaData::default())
    }
}

/// Reads the optional `<imap><smap>` meta-data prefix. Per Design Note §9
/// ("cyclic meta rejection") the values inside meta-data never themselves
/// carry meta-data, so this recurses through `read_value_data`, not
/// `read_value`.
fn read_meta(r: &mut ByteReader, depth: &mut DepthGuard) -> Result<MetaData> {
    let mut imap = IMap::new();
    let mut smap = Map::new();

    if r.peek_u8()? == constants::META_IMAP {
        r.read_u8()?;
        loop {
            if r.peek_u8()? == constants::TERM {
                r.read_u8()?;
                break;
            }
            let key = vlq::read_uint(r)? as u32;
            let val = read_value_data(r, depth)?;
            imap.insert(key, val);
        }
    }
    if let Ok(constants::META_SMAP) = r.peek_u8() {
        r.read_u8()?;
        loop {
            if r.peek_u8()? == constants::TERM {
                r.read_u8()?;
                break;
            }
            let key = read_string_payload(r)?;
            let val = read_value_data(r, depth)?;
            smap.insert(key, val);
        }
    }
    Ok(MetaData::from_maps(imap, smap))
}

fn read_string_payload(r: &mut ByteReader) -> Result<String> {
    let n = vlq::read_uint(r)? as usize;
    let bytes = r.read_bytes(n)?;
    std::str::from_utf8(bytes).map(str::to_owned).map_err(|_| Error::InvalidUtf8)
}

/// Unpacks a `DateTime` from a single signed VLQ `Int`, matching
/// `chainpack.cpp::readData_DateTime` bit for bit (mirror of `write_date_time`
/// above — the timezone offset, when present, is folded into the same `Int`
/// rather than trailing it as a separate byte).
fn read_date_time(r: &mut ByteReader) -> Result<DateTime> {
    let mut d = vlq::read_int(r)?;
    let has_tz_offset = d & (constants::DATE_TIME_MASK_HAS_TZ as i64) != 0;
    let has_not_msec = d & (constants::DATE_TIME_MASK_NO_MSEC as i64) != 0;
    d >>= constants::DATE_TIME_SHIFT_TZ;
    let mut tz_quarter_hours: i8 = 0;
    if has_tz_offset {
        let raw = (d & 0x7F) as i32;
        tz_quarter_hours = (if raw >= 64 { raw - 128 } else { raw }) as i8;
        d >>= 7;
    }
    if has_not_msec {
        d *= 1000;
    }
    let msec_since_epoch = d + crate::value::SHV_EPOCH_MSEC;
    Ok(DateTime::from_epoch_msec(msec_since_epoch, tz_quarter_hours as i32 * 15))
}

fn element_type_from_tag(tag: u8) -> Result<ElementType> {
    match tag {
        constants::ARRAY_ELEM_NULL => Ok(ElementType::Null),
        constants::ARRAY_ELEM_BOOL => Ok(ElementType::Bool),
        constants::ARRAY_ELEM_INT => Ok(ElementType::Int),
        constants::ARRAY_ELEM_UINT => Ok(ElementType::UInt),
        constants::ARRAY_ELEM_DOUBLE => Ok(ElementType::Double),
        constants::ARRAY_ELEM_DECIMAL => Ok(ElementType::Decimal),
        constants::ARRAY_ELEM_DATE_TIME => Ok(ElementType::DateTime),
        other => Err(Error::UnknownTypeByte(other)),
    }
}

fn read_array_element(r: &mut ByteReader, et: ElementType) -> Result<Value> {
    Ok(match et {
        ElementType::Null => build::null(),
        ElementType::Bool => build::bool_(r.read_u8()? != 0),
        ElementType::Int => build::int(vlq::read_int(r)?),
        ElementType::UInt => build::uint(vlq::read_uint(r)?),
        ElementType::Double => build::double(LittleEndian::read_f64(r.read_bytes(8)?)),
        ElementType::Decimal => build::decimal(read_decimal_payload(r)?),
        ElementType::DateTime => build::date_time(read_date_time(r)?),
    })
}

fn read_decimal_payload(r: &mut ByteReader) -> Result<Decimal> {
    let mantissa = vlq::read_int(r)?;
    let precision = vlq::read_int(r)?;
    Ok(Decimal::new(mantissa, precision as i16))
}

fn read_array(r: &mut ByteReader, depth: &mut DepthGuard, elem_tag: u8) -> Result<Value> {
    let et = element_type_from_tag(elem_tag)?;
    let count = vlq::read_uint(r)? as usize;
    depth.enter()?;
    let result = (|| {
        let mut elements = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            elements.push(read_array_element(r, et)?);
        }
        Ok(build::array(Array { element_type: et, elements }))
    })();
    depth.leave();
    result
}

/// Unit struct implementing the shared [`Unpack`] contract for ChainPack's
/// binary grammar: head-byte dispatch, `TERM` as every container's closing
/// marker, and no key/value separator (map entries are purely positional).
struct Tokenizer;

impl Unpack for Tokenizer {
    fn at_container_end(&mut self, r: &mut ByteReader, _kind: ContainerKind) -> Result<bool> {
        if r.peek_u8()? == constants::TERM {
            r.read_u8()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn next_item(&mut self, r: &mut ByteReader) -> Result<Item> {
        let b = r.read_u8()?;
        if b <= constants::TINY_UINT_MAX {
            return Ok(Item::UInt(b as u64));
        }
        if (constants::TINY_INT_MIN..=constants::TINY_INT_MAX).contains(&b) {
            return Ok(Item::Int((b - constants::TINY_INT_MIN) as i64));
        }
        match b {
            constants::FALSE => Ok(Item::Bool(false)),
            constants::TRUE => Ok(Item::Bool(true)),
            constants::NULL => Ok(Item::Null),
            constants::UINT => Ok(Item::UInt(vlq::read_uint(r)?)),
            constants::INT => Ok(Item::Int(vlq::read_int(r)?)),
            constants::DOUBLE => Ok(Item::Double(LittleEndian::read_f64(r.read_bytes(8)?))),
            constants::BLOB => {
                let n = vlq::read_uint(r)? as usize;
                Ok(Item::Blob { chunk: r.read_bytes(n)?.to_vec(), last_chunk: true })
            }
            constants::STRING => {
                let n = vlq::read_uint(r)? as usize;
                Ok(Item::String { chunk: r.read_bytes(n)?.to_vec(), last_chunk: true })
            }
            constants::LIST => Ok(Item::ListBegin),
            constants::MAP => Ok(Item::MapBegin),
            constants::IMAP => Ok(Item::IMapBegin),
            constants::DECIMAL => Ok(Item::Decimal(read_decimal_payload(r)?)),
            constants::DATE_TIME_EPOCH => {
                let msec = vlq::read_int(r)?;
                Ok(Item::DateTime(DateTime::from_epoch_msec(msec, 0)))
            }
            constants::DATE_TIME => Ok(Item::DateTime(read_date_time(r)?)),
            constants::META_IMAP | constants::META_SMAP => {
                Err(Error::malformed("meta-data cannot itself carry meta-data", r.position()))
            }
            other => Err(Error::UnknownTypeByte(other)),
        }
    }

    fn consume_key_separator(&mut self, _r: &mut ByteReader) -> Result<()> {
        Ok(())
    }
}

fn read_value_data(r: &mut ByteReader, depth: &mut DepthGuard) -> Result<Value> {
    // Arrays carry a tag byte that isn't a regular `Item` (it folds the
    // array marker and its element-type nibble together). Every named type
    // byte `Tokenizer` handles lives at or below `DATE_TIME` (0x8F), so any
    // byte past that is either an array tag or unknown — either way it's
    // `read_array`'s job, not the shared tokenizer's, matching the original
    // dispatch order (named bytes checked before the array-flag fallback).
    // `read_array` already guards its own body, but it used to be reached
    // through this function's depth-guarded dispatch too, so the same outer
    // `enter`/`leave` pair is kept here to leave recursion accounting
    // unchanged.
    if let Ok(b) = r.peek_u8() {
        if b > constants::DATE_TIME {
            r.read_u8()?;
            depth.enter()?;
            let result = read_array(r, depth, b);
            depth.leave();
            return result;
        }
    }
    assemble_body(&mut Tokenizer, r, depth, read_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Type;

    fn decode(bytes: &[u8]) -> Value {
        from_bytes(bytes).unwrap()
    }

    #[test]
    fn null_byte() {
        assert_eq!(decode(&[0x82]).type_(), Type::Null);
    }

    #[test]
    fn tiny_uint() {
        assert_eq!(decode(&[0x3F]).as_uint(), 63);
    }

    #[test]
    fn tiny_int() {
        assert_eq!(decode(&[0x40]).as_int(), 0);
        assert_eq!(decode(&[0x7F]).as_int(), 63);
    }

    #[test]
    fn uint_needs_escape_byte() {
        let v = decode(&[0x83, 64]);
        assert_eq!(v.as_uint(), 64);
    }

    #[test]
    fn list_of_tiny_ints() {
        let v = decode(&[0x88, 0x41, 0x42, 0x43, 0xFF]);
        let items: Vec<i64> = v.as_list().iter().map(|x| x.as_int()).collect();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn underflow_is_eof_not_hard_error() {
        assert_eq!(from_bytes(&[0x88, 0x41]).unwrap_err(), Error::Eof);
    }

    #[test]
    fn nested_empty_containers() {
        let v = decode(&[0x88, 0x88, 0xFF, 0xFF]);
        assert_eq!(v.as_list().len(), 1);
        assert_eq!(v.as_list()[0].as_list().len(), 0);
    }
}
