//! Cpon text decode side, grounded in `cponreader.cpp`'s `read`/`parseList`/
//! `parseMap`/`parseIMap`/`parseMetaData`. Scalar decoding and List/Map/IMap
//! body assembly go through the shared [`Tokenizer`]/
//! [`crate::reader::assemble_body`] machinery; meta-data and arrays stay
//! here since Cpon's meta grammar interleaves string/int keys in one mixed
//! section and its arrays infer their element type from the first bracketed
//! element, rather than declaring it up front.

use super::datetime;
use crate::constants::DEFAULT_MAX_RECURSION_DEPTH;
use crate::error::{Error, Result};
use crate::reader::{assemble_body, ByteReader, ContainerKind, DepthGuard, Item, Unpack};
use crate::value::{build, Array, Decimal, ElementType, IMap, Map, MetaData, Value};

pub fn from_str(text: &str) -> Result<Value> {
    from_str_with_depth(text, DEFAULT_MAX_RECURSION_DEPTH)
}

pub fn from_str_with_depth(text: &str, max_depth: usize) -> Result<Value> {
    let mut r = ByteReader::new(text.as_bytes());
    let mut depth = DepthGuard::new(max_depth);
    let v = read_value(&mut r, &mut depth)?;
    Ok(v)
}

/// Skips blank space, `//` line comments, and non-nesting `/* ... */` block
/// comments. Comment scanning never starts inside a string/blob literal,
/// since those are consumed as opaque runs by their own readers before this
/// function is ever asked to skip past them.
fn skip_ws_and_comments(r: &mut ByteReader) -> Result<()> {
    loop {
        r.skip_whitespace();
        match r.peek_u8() {
            Ok(b'/') => {
                if r.peek_at(1) == Some(b'/') {
                    while let Ok(b) = r.peek_u8() {
                        if b == b'\n' {
                            break;
                        }
                        r.read_u8()?;
                    }
                } else if r.peek_at(1) == Some(b'*') {
                    r.read_u8()?;
                    r.read_u8()?;
                    loop {
                        let b = r.read_u8().map_err(|_| Error::UnterminatedComment)?;
                        if b == b'*' && r.peek_u8() == Ok(b'/') {
                            r.read_u8()?;
                            break;
                        }
                    }
                } else {
                    return Ok(());
                }
            }
            _ => return Ok(()),
        }
    }
}

fn expect_literal(r: &mut ByteReader, lit: &str) -> Result<()> {
    let bytes = r.read_bytes(lit.len())?;
    if bytes == lit.as_bytes() {
        Ok(())
    } else {
        Err(Error::malformed(format!("expected literal {lit:?}"), r.position()))
    }
}

fn read_string_body(r: &mut ByteReader, quote: u8) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    loop {
        let b = r.read_u8()?;
        if b == quote {
            break;
        }
        if b != b'\\' {
            out.push(b);
            continue;
        }
        let esc = r.read_u8()?;
        match esc {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'\\' => out.push(b'\\'),
            b'0' => out.push(0),
            b'"' => out.push(b'"'),
            b'u' => {
                let hex = r.read_bytes(4)?;
                let hex_str = std::str::from_utf8(hex).map_err(|_| Error::InvalidEscape)?;
                let mut cp = u32::from_str_radix(hex_str, 16).map_err(|_| Error::InvalidEscape)?;
                if (0xD800..0xDC00).contains(&cp) && r.peek_u8() == Ok(b'\\') {
                    let save = r.clone();
                    r.read_u8()?;
                    if r.read_u8()? == b'u' {
                        let hex2 = r.read_bytes(4)?;
                        let hex2_str = std::str::from_utf8(hex2).map_err(|_| Error::InvalidEscape)?;
                        let low = u32::from_str_radix(hex2_str, 16).map_err(|_| Error::InvalidEscape)?;
                        if (0xDC00..0xE000).contains(&low) {
                            cp = 0x10000 + (cp - 0xD800) * 0x400 + (low - 0xDC00);
                        } else {
                            *r = save;
                        }
                    } else {
                        *r = save;
                    }
                }
                let ch = char::from_u32(cp).ok_or(Error::InvalidEscape)?;
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
            _ => return Err(Error::InvalidEscape),
        }
    }
    Ok(out)
}

fn read_blob_hex(r: &mut ByteReader) -> Result<Vec<u8>> {
    r.read_u8()?; // 'x'
    r.read_u8()?; // '"'
    let mut hex = String::new();
    loop {
        let b = r.read_u8()?;
        if b == b'"' {
            break;
        }
        hex.push(b as char);
    }
    hex::decode(&hex).map_err(|_| Error::malformed("invalid hex blob", r.position()))
}

fn read_date_time(r: &mut ByteReader) -> Result<crate::value::DateTime> {
    r.read_u8()?; // 'd'
    r.read_u8()?; // '"'
    let bytes = read_string_body(r, b'"')?;
    let text = String::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)?;
    datetime::parse(&text)
}

fn read_number(r: &mut ByteReader) -> Result<Value> {
    let mut buf = String::new();
    if r.peek_u8() == Ok(b'-') {
        buf.push('-');
        r.read_u8()?;
    }
    while let Ok(b) = r.peek_u8() {
        if b.is_ascii_digit() || b == b'.' || b == b'e' || b == b'E' || b == b'+' || b == b'-' {
            buf.push(b as char);
            r.read_u8()?;
        } else {
            break;
        }
    }
    let mut suffix = None;
    if let Ok(b) = r.peek_u8() {
        if b == b'u' || b == b'U' {
            suffix = Some('u');
            r.read_u8()?;
        } else if b == b'n' {
            suffix = Some('n');
            r.read_u8()?;
        }
    }
    parse_number(&buf, suffix)
}

/// Numeric-literal grammar: a `.`/`e`/`n` anywhere in the
/// literal routes to `Decimal`, never `Double` — the tokenizer never produces
/// a `Double` from text (`1e2` parses as Decimal `100`, exactly as
/// `tst_ccpcp.c`'s `test_unpack_number("1e2", CCPCP_ITEM_DECIMAL, 100)`
/// asserts). `Double` is reachable only by round-tripping a `Value::Double`
/// through ChainPack or constructing one directly in memory.
fn parse_number(text: &str, suffix: Option<char>) -> Result<Value> {
    let bad = || Error::malformed(format!("invalid numeric literal {text:?}"), 0);
    if suffix == Some('u') {
        return text.parse::<u64>().map(build::uint).map_err(|_| bad());
    }
    let has_dot = text.contains('.');
    let has_exp = text.contains('e') || text.contains('E');
    if has_dot || has_exp || suffix == Some('n') {
        let (mantissa_part, exponent): (&str, i32) = match text.find(['e', 'E']) {
            Some(epos) => {
                let (m, e) = text.split_at(epos);
                (m, e[1..].parse().map_err(|_| bad())?)
            }
            None => (text, 0),
        };
        let (int_part, frac_part) = match mantissa_part.split_once('.') {
            Some((i, f)) => (i, f),
            None => (mantissa_part, ""),
        };
        let neg = int_part.starts_with('-');
        let int_digits = int_part.trim_start_matches(['-', '+']);
        let digits = format!("{int_digits}{frac_part}");
        let magnitude: i64 = if digits.is_empty() { 0 } else { digits.parse().map_err(|_| bad())? };
        let mantissa = if neg { -magnitude } else { magnitude };
        let precision = frac_part.len() as i32 - exponent;
        return Ok(build::decimal(Decimal::new(mantissa, precision as i16)));
    }
    text.parse::<i64>().map(build::int).map_err(|_| bad())
}

fn read_meta(r: &mut ByteReader, depth: &mut DepthGuard) -> Result<MetaData> {
    r.read_u8()?; // '<'
    let mut imap = IMap::new();
    let mut smap = Map::new();
    loop {
        skip_ws_and_comments(r)?;
        if r.eat_u8(b'>')? {
            break;
        }
        skip_ws_and_comments(r)?;
        if r.peek_u8()? == b'"' {
            let key_val = read_string_literal(r)?;
            skip_ws_and_comments(r)?;
            expect_byte(r, b':')?;
            skip_ws_and_comments(r)?;
            let val = read_value_data(r, depth)?;
            smap.insert(key_val, val);
        } else {
            let key_val = read_number(r)?;
            skip_ws_and_comments(r)?;
            expect_byte(r, b':')?;
            skip_ws_and_comments(r)?;
            let val = read_value_data(r, depth)?;
            imap.insert(key_val.as_uint() as u32, val);
        }
        skip_ws_and_comments(r)?;
        r.eat_u8(b',')?;
    }
    Ok(MetaData::from_maps(imap, smap))
}

fn read_string_literal(r: &mut ByteReader) -> Result<String> {
    r.read_u8()?; // opening quote
    let bytes = read_string_body(r, b'"')?;
    String::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
}

fn expect_byte(r: &mut ByteReader, b: u8) -> Result<()> {
    if r.read_u8()? == b {
        Ok(())
    } else {
        Err(Error::malformed(format!("expected {:?}", b as char), r.position()))
    }
}

/// Reads just the optional `<...>` meta-data prefix, leaving the cursor at
/// the start of the value body. Mirrors `chainpack::reader::read_meta_only`
/// for the text format — used by the RPC framing layer.
pub(crate) fn read_meta_only(r: &mut ByteReader, depth: &mut DepthGuard) -> Result<MetaData> {
    skip_ws_and_comments(r)?;
    if r.peek_u8()? == b'<' {
        read_meta(r, depth)
    } else {
        Ok(MetaData::default())
    }
}

pub(crate) fn read_value(r: &mut ByteReader, depth: &mut DepthGuard) -> Result<Value> {
    skip_ws_and_comments(r)?;
    if r.peek_u8()? == b'<' {
        let meta = read_meta(r, depth)?;
        skip_ws_and_comments(r)?;
        let mut v = read_value_data(r, depth)?;
        v.set_meta(meta);
        Ok(v)
    } else {
        read_value_data(r, depth)
    }
}

fn read_array(r: &mut ByteReader, depth: &mut DepthGuard) -> Result<Value> {
    r.read_u8()?; // 'a'
    r.read_u8()?; // '['
    let mut elements = Vec::new();
    let mut element_type = None;
    loop {
        skip_ws_and_comments(r)?;
        if r.eat_u8(b']')? {
            break;
        }
        let v = read_value(r, depth)?;
        let et = element_type.get_or_insert(match v.type_() {
            crate::value::Type::Null => ElementType::Null,
            crate::value::Type::Bool => ElementType::Bool,
            crate::value::Type::Int => ElementType::Int,
            crate::value::Type::UInt => ElementType::UInt,
            crate::value::Type::Double => ElementType::Double,
            crate::value::Type::Decimal => ElementType::Decimal,
            crate::value::Type::DateTime => ElementType::DateTime,
            other => return Err(Error::UnsupportedArrayType(other.name())),
        });
        if !et.matches(v.type_()) {
            return Err(Error::UnsupportedArrayType(v.type_().name()));
        }
        elements.push(v);
        skip_ws_and_comments(r)?;
        r.eat_u8(b',')?;
    }
    Ok(build::array(Array { element_type: element_type.unwrap_or(ElementType::Null), elements }))
}

/// Unit struct implementing the shared [`Unpack`] contract for Cpon's text
/// grammar: lead-character dispatch, `]`/`}` as a container's close (with
/// comma separators skipped around each member), and `:` between a
/// map/imap key and its value.
struct Tokenizer;

impl Unpack for Tokenizer {
    /// Each element/entry is followed by an optional `,` that isn't itself
    /// whitespace, so this eats one (if present, including a trailing comma
    /// right before the close) on every call before checking for the close
    /// character — equivalent to the original per-element "skip_ws, eat
    /// comma" done right after reading each member, just shifted to the top
    /// of the next iteration.
    fn at_container_end(&mut self, r: &mut ByteReader, kind: ContainerKind) -> Result<bool> {
        skip_ws_and_comments(r)?;
        r.eat_u8(b',')?;
        skip_ws_and_comments(r)?;
        let close = match kind {
            ContainerKind::List => b']',
            ContainerKind::Map | ContainerKind::IMap => b'}',
        };
        if r.eat_u8(close)? {
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn next_item(&mut self, r: &mut ByteReader) -> Result<Item> {
        skip_ws_and_comments(r)?;
        let b = r.peek_u8()?;
        match b {
            b'n' => {
                expect_literal(r, "null")?;
                Ok(Item::Null)
            }
            b't' => {
                expect_literal(r, "true")?;
                Ok(Item::Bool(true))
            }
            b'f' => {
                expect_literal(r, "false")?;
                Ok(Item::Bool(false))
            }
            b'd' if r.peek_at(1) == Some(b'"') => Ok(Item::DateTime(read_date_time(r)?)),
            b'x' if r.peek_at(1) == Some(b'"') => Ok(Item::Blob { chunk: read_blob_hex(r)?, last_chunk: true }),
            b'"' => Ok(Item::String { chunk: read_string_literal(r)?.into_bytes(), last_chunk: true }),
            b'[' => {
                r.read_u8()?;
                Ok(Item::ListBegin)
            }
            b'{' => {
                r.read_u8()?;
                Ok(Item::MapBegin)
            }
            b'i' if r.peek_at(1) == Some(b'{') => {
                r.read_u8()?;
                r.read_u8()?;
                Ok(Item::IMapBegin)
            }
            b'-' | b'0'..=b'9' => match read_number(r)? {
                v if v.type_() == crate::value::Type::Int => Ok(Item::Int(v.as_int())),
                v if v.type_() == crate::value::Type::UInt => Ok(Item::UInt(v.as_uint())),
                v => Ok(Item::Decimal(v.as_decimal())),
            },
            other => Err(Error::malformed(format!("unexpected byte {:?}", other as char), r.position())),
        }
    }

    fn consume_key_separator(&mut self, r: &mut ByteReader) -> Result<()> {
        skip_ws_and_comments(r)?;
        expect_byte(r, b':')?;
        skip_ws_and_comments(r)?;
        Ok(())
    }
}

fn read_value_data(r: &mut ByteReader, depth: &mut DepthGuard) -> Result<Value> {
    // Arrays (`a[...]`) infer their element type from their first member
    // rather than declaring it up front, and every element recurses through
    // the full meta-aware `read_value` — different enough from the shared
    // tokenizer's scalar/container contract that they're peeked for and
    // handled here directly.
    skip_ws_and_comments(r)?;
    if r.peek_u8()? == b'a' && r.peek_at(1) == Some(b'[') {
        depth.enter()?;
        let result = read_array(r, depth);
        depth.leave();
        return result;
    }
    assemble_body(&mut Tokenizer, r, depth, read_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_primitives() {
        assert!(from_str("null").unwrap().is_null());
        assert_eq!(from_str("true").unwrap().as_bool(), true);
        assert_eq!(from_str("123").unwrap().as_int(), 123);
        assert_eq!(from_str("123u").unwrap().as_uint(), 123);
        assert_eq!(from_str("-5").unwrap().as_int(), -5);
    }

    #[test]
    fn parses_decimal_literal() {
        let d = from_str("12.3").unwrap();
        assert_eq!(d.as_decimal(), Decimal::new(123, 1));
    }

    #[test]
    fn exponent_literal_is_decimal_not_double() {
        // tst_ccpcp.c: test_unpack_number("1e2", CCPCP_ITEM_DECIMAL, 100)
        let v = from_str("1e2").unwrap();
        assert_eq!(v.type_(), crate::value::Type::Decimal);
        assert!((v.as_double() - 100.0).abs() < 1e-9);

        let v = from_str("-21.23e-4").unwrap();
        assert!((v.as_double() - (-21.23e-4)).abs() < 1e-9);
    }

    #[test]
    fn parses_string_with_escapes() {
        let v = from_str(r#""a\nb\"c""#).unwrap();
        assert_eq!(v.as_str(), "a\nb\"c");
    }

    #[test]
    fn parses_nested_empty_list() {
        let v = from_str("[[]]").unwrap();
        assert_eq!(v.as_list().len(), 1);
        assert_eq!(v.as_list()[0].as_list().len(), 0);
    }

    #[test]
    fn parses_list_with_comments() {
        let v = from_str("[1, /* two */ 2, 3] // trailing").unwrap();
        let items: Vec<i64> = v.as_list().iter().map(|x| x.as_int()).collect();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn parses_meta_data_prefix() {
        let v = from_str(r#"<1:2,"shvPath":"a/b">42"#).unwrap();
        assert_eq!(v.as_int(), 42);
        assert_eq!(v.meta_value_i(1).unwrap().as_int(), 2);
        assert_eq!(v.meta_value_s("shvPath").unwrap().as_str(), "a/b");
    }

    #[test]
    fn parses_imap_and_map() {
        let v = from_str(r#"i{1:"a",2:"b"}"#).unwrap();
        assert_eq!(v.as_imap().unwrap().get(&1).unwrap().as_str(), "a");
        let v = from_str(r#"{"x":1,"y":2}"#).unwrap();
        assert_eq!(v.at_key("y").as_int(), 2);
    }

    #[test]
    fn parses_array_of_ints() {
        let v = from_str("a[1,2,3]").unwrap();
        let a = v.as_array().unwrap();
        assert_eq!(a.element_type, ElementType::Int);
        assert_eq!(a.elements.len(), 3);
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        assert_eq!(from_str("/* oops").unwrap_err(), Error::UnterminatedComment);
    }
}
