//! Cpon text encode side, grounded in `cponwriter.h`/`CponWriter`.

use super::datetime;
use crate::error::{Error, Result};
use crate::value::{Array, MetaData, Type, Value};

/// Mirrors `CponWriterOptions`.
#[derive(Debug, Clone, Default)]
pub struct WriterOptions {
    /// Replace numeric meta-data keys by known symbolic names where a type
    /// registry provides one. Accepted but a no-op here: schema/type-registry
    /// lookups are out of scope.
    pub translate_ids: bool,
    pub hex_blob: bool,
    /// Empty means compact (no line breaks). Non-empty is the per-level
    /// indent string, repeated once per nesting depth.
    pub indent: String,
    /// Emit a JSON-safe subset: no type suffixes, datetimes as quoted ISO
    /// strings, no comments.
    pub json_format: bool,
}

impl WriterOptions {
    pub fn new() -> WriterOptions {
        WriterOptions::default()
    }

    pub fn with_indent(mut self, indent: impl Into<String>) -> WriterOptions {
        self.indent = indent.into();
        self
    }

    pub fn compact() -> WriterOptions {
        WriterOptions::default()
    }

    fn is_compact(&self) -> bool {
        self.indent.is_empty()
    }
}

pub fn to_string(v: &Value) -> String {
    to_string_opts(v, &WriterOptions::default())
}

pub fn to_string_opts(v: &Value, opts: &WriterOptions) -> String {
    let mut out = String::new();
    let mut w = Writer { out: &mut out, opts };
    w.write_value(v, 0);
    out
}

/// Like [`to_string`], but refuses to serialize `v` (or anything nested in
/// it) if it contains an `Invalid` value, instead of the default lenient
/// policy of writing `Invalid` as `null`.
pub fn to_string_strict(v: &Value) -> Result<String> {
    to_string_opts_strict(v, &WriterOptions::default())
}

pub fn to_string_opts_strict(v: &Value, opts: &WriterOptions) -> Result<String> {
    if v.contains_invalid() {
        return Err(Error::InvalidValueRejected);
    }
    Ok(to_string_opts(v, opts))
}

/// Encodes just the body (meta-data-less) of `v`, ignoring any meta-data it
/// carries. Used by the RPC framing layer.
pub(crate) fn to_string_body_only(v: &Value) -> String {
    let opts = WriterOptions::default();
    let mut out = String::new();
    let mut w = Writer { out: &mut out, opts: &opts };
    w.write_data(v, 0);
    out
}

/// Encodes a stand-alone meta-data prefix, for framing.
pub(crate) fn meta_to_string(meta: &MetaData) -> String {
    let opts = WriterOptions::default();
    let mut out = String::new();
    let mut w = Writer { out: &mut out, opts: &opts };
    w.write_meta(meta, 0);
    out
}

struct Writer<'a> {
    out: &'a mut String,
    opts: &'a WriterOptions,
}

impl<'a> Writer<'a> {
    fn newline(&mut self, depth: usize) {
        if !self.opts.is_compact() {
            self.out.push('\n');
            for _ in 0..depth {
                self.out.push_str(&self.opts.indent);
            }
        }
    }

    fn write_value(&mut self, v: &Value, depth: usize) {
        if let Some(meta) = v.meta() {
            if !self.opts.json_format {
                self.write_meta(meta, depth);
            }
        }
        self.write_data(v, depth);
    }

    fn write_meta(&mut self, meta: &MetaData, depth: usize) {
        self.out.push('<');
        let mut first = true;
        for (k, val) in meta.i_values().iter() {
            if !first {
                self.out.push(',');
            }
            first = false;
            self.out.push_str(&k.to_string());
            self.out.push(':');
            self.write_data(val, depth);
        }
        for (k, val) in meta.s_values().iter() {
            if !first {
                self.out.push(',');
            }
            first = false;
            write_quoted_string(self.out, k);
            self.out.push(':');
            self.write_data(val, depth);
        }
        self.out.push('>');
    }

    fn write_data(&mut self, v: &Value, depth: usize) {
        match v.type_() {
            Type::Invalid | Type::Null => self.out.push_str("null"),
            Type::Bool => self.out.push_str(if v.as_bool() { "true" } else { "false" }),
            Type::Int => self.out.push_str(&v.as_int().to_string()),
            Type::UInt => {
                self.out.push_str(&v.as_uint().to_string());
                if !self.opts.json_format {
                    self.out.push('u');
                }
            }
            Type::Double => {
                let d = v.as_double();
                if self.opts.json_format {
                    self.out.push_str(&format!("{d}"));
                } else {
                    self.out.push_str(&format_double_with_dot(d));
                }
            }
            Type::Decimal => {
                let d = v.as_decimal();
                self.out.push_str(&format_decimal(d.mantissa(), d.precision()));
            }
            Type::DateTime => {
                let text = datetime::format(&v.as_date_time());
                if self.opts.json_format {
                    write_quoted_string(self.out, &text);
                } else {
                    self.out.push_str("d\"");
                    self.out.push_str(&text);
                    self.out.push('"');
                }
            }
            Type::String => write_quoted_string(self.out, v.as_str()),
            Type::Blob => self.write_blob(v.as_blob()),
            Type::List => self.write_list(v.as_list(), depth),
            Type::Map => self.write_map(v.as_map().expect("Type::Map"), depth),
            Type::IMap => self.write_imap(v.as_imap().expect("Type::IMap"), depth),
            Type::Array => self.write_array(v.as_array().expect("Type::Array"), depth),
        }
    }

    fn write_blob(&mut self, bytes: &[u8]) {
        if self.opts.hex_blob || !self.opts.json_format {
            self.out.push_str("x\"");
            self.out.push_str(&hex::encode(bytes));
            self.out.push('"');
        } else {
            write_quoted_string(self.out, &String::from_utf8_lossy(bytes));
        }
    }

    fn write_list(&mut self, items: &[Value], depth: usize) {
        self.out.push('[');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.newline(depth + 1);
            self.write_value(item, depth + 1);
        }
        if !items.is_empty() {
            self.newline(depth);
        }
        self.out.push(']');
    }

    fn write_map(&mut self, m: &crate::value::Map, depth: usize) {
        self.out.push('{');
        for (i, (k, val)) in m.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.newline(depth + 1);
            write_quoted_string(self.out, k);
            self.out.push(':');
            self.write_value(val, depth + 1);
        }
        if m.len() > 0 {
            self.newline(depth);
        }
        self.out.push('}');
    }

    fn write_imap(&mut self, m: &crate::value::IMap, depth: usize) {
        self.out.push_str("i{");
        for (i, (k, val)) in m.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.newline(depth + 1);
            self.out.push_str(&k.to_string());
            self.out.push(':');
            self.write_value(val, depth + 1);
        }
        if m.len() > 0 {
            self.newline(depth);
        }
        self.out.push('}');
    }

    fn write_array(&mut self, a: &Array, depth: usize) {
        self.out.push_str("a[");
        for (i, item) in a.elements.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.newline(depth + 1);
            self.write_data(item, depth + 1);
        }
        if !a.elements.is_empty() {
            self.newline(depth);
        }
        self.out.push(']');
    }
}

fn format_decimal(mantissa: i64, precision: i16) -> String {
    if precision <= 0 {
        let mut s = mantissa.to_string();
        for _ in 0..(-precision) {
            s.push('0');
        }
        s.push('.');
        return s;
    }
    let neg = mantissa < 0;
    let digits = mantissa.unsigned_abs().to_string();
    let precision = precision as usize;
    let padded = if digits.len() <= precision {
        format!("{:0>width$}", digits, width = precision + 1)
    } else {
        digits
    };
    let split = padded.len() - precision;
    let mut s = String::new();
    if neg {
        s.push('-');
    }
    s.push_str(&padded[..split]);
    s.push('.');
    s.push_str(&padded[split..]);
    s
}

fn format_double_with_dot(d: f64) -> String {
    let s = format!("{d}");
    if s.contains('.') || s.contains('e') || s.contains("inf") || s.contains("NaN") {
        s
    } else {
        format!("{s}.")
    }
}

fn write_quoted_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x08' => out.push_str("\\b"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Decimal;

    #[test]
    fn null_and_bool() {
        assert_eq!(to_string(&Value::null()), "null");
        assert_eq!(to_string(&Value::from(true)), "true");
    }

    #[test]
    fn lenient_writer_serializes_invalid_as_null() {
        assert_eq!(to_string(&Value::default()), "null");
    }

    #[test]
    fn strict_writer_rejects_invalid_value() {
        assert!(matches!(to_string_strict(&Value::default()), Err(Error::InvalidValueRejected)));
    }

    #[test]
    fn strict_writer_rejects_invalid_nested_in_a_map() {
        let mut m = crate::value::Map::new();
        m.insert("a".to_string(), Value::default());
        let v = Value::from(m);
        assert!(to_string_opts_strict(&v, &WriterOptions::default()).is_err());
    }

    #[test]
    fn list_round_trips_compact() {
        let list: Vec<Value> = vec![Value::from(1i64), Value::from(2i64), Value::from(3i64)];
        assert_eq!(to_string(&Value::from(list)), "[1,2,3]");
    }

    #[test]
    fn decimal_formats_with_precision() {
        assert_eq!(to_string(&Value::from(Decimal::new(1224, 2))), "12.24");
        assert_eq!(to_string(&Value::from(Decimal::new(5, 3))), "0.005");
        assert_eq!(to_string(&Value::from(Decimal::new(-1224, 2))), "-12.24");
    }

    #[test]
    fn string_escapes_quote_and_backslash() {
        let v = Value::from("a\"b\\c");
        assert_eq!(to_string(&v), r#""a\"b\\c""#);
    }

    #[test]
    fn meta_data_written_before_value() {
        let mut v = Value::from(1i64);
        v.set_meta_value_i(8, Value::from(42i64));
        assert_eq!(to_string(&v), "<8:42>1");
    }

    #[test]
    fn uint_gets_u_suffix() {
        assert_eq!(to_string(&Value::from(42u64)), "42u");
    }

    #[test]
    fn json_format_drops_suffix_and_meta() {
        let mut v = Value::from(42u64);
        v.set_meta_value_i(8, Value::from(1i64));
        let opts = WriterOptions { json_format: true, ..Default::default() };
        assert_eq!(to_string_opts(&v, &opts), "42");
    }
}
