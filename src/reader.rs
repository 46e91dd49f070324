//! Shared pull-parsing runtime. Both `chainpack::reader` and `cpon::reader` decode a whole
//! item per call but share the same underflow discipline: running out of
//! bytes mid-item returns [`crate::error::Error::Eof`] instead of a hard
//! parse error, so a caller fed a partial buffer (e.g. from a socket) can
//! buffer more and retry the same decode from its start — mirroring
//! `AbstractStreamReader`'s `unpack_underflow_handler` in the original.
//!
//! On top of the byte cursor, this module also owns the [`Item`]/[`Unpack`]
//! tokenizer contract: `chainpack::reader`'s `Tokenizer` and `cpon::reader`'s
//! `Tokenizer` each implement [`Unpack`] for their own wire lexing, and
//! [`assemble_body`] is the one generic assembler — shared verbatim by both —
//! that turns a pulled [`Item`] stream into a [`Value`] tree. Meta-data's
//! two-section-vs-mixed-mapping shape differs enough between the binary and
//! text grammars that it stays a per-codec `read_meta`, but once a meta
//! marker is recognized, the key/value pairs inside it are pulled through
//! exactly this same tokenizer. Arrays stay per-codec too, for the same
//! reason: chainpack tags an array with its element type and a known count
//! up front and stores untagged raw element payloads, while Cpon infers the
//! element type from its first bracketed element — different enough shapes
//! that a single generic array-body loop would paper over real structure
//! rather than share it.

use crate::error::{Error, Result};
use crate::value::{build, DateTime, Decimal, IMap, List, Map, Value};

/// A forward-only cursor over a byte slice with `Eof`-on-underflow reads.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> ByteReader<'a> {
        ByteReader { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Looks at the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8> {
        self.data.get(self.pos).copied().ok_or(Error::Eof)
    }

    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.data.get(self.pos + offset).copied()
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let b = self.peek_u8()?;
        self.pos += 1;
        Ok(b)
    }

    /// Consumes the next byte only if it equals `b`.
    pub fn eat_u8(&mut self, b: u8) -> Result<bool> {
        if self.peek_u8()? == b {
            self.pos += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::Eof);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Skips ASCII whitespace (space, tab, CR, LF) without consuming past
    /// the end of the buffer. Used by the Cpon reader before peeking for
    /// structural characters like `<` or `}`.
    pub fn skip_whitespace(&mut self) {
        while let Some(&b) = self.data.get(self.pos) {
            if b == b' ' || b == b'\t' || b == b'\r' || b == b'\n' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }
}

/// Bounded nesting-depth guard shared by both codecs' container/meta-data
/// recursion, configurable and enforced on both encode and decode.
pub struct DepthGuard {
    max_depth: usize,
    depth: usize,
}

impl DepthGuard {
    pub fn new(max_depth: usize) -> DepthGuard {
        DepthGuard { max_depth, depth: 0 }
    }

    /// Enter one level of nesting; call the matching `leave` when done.
    /// Intended to be used as an RAII-free push/pop pair around a single
    /// recursive-descent call.
    pub fn enter(&mut self) -> Result<()> {
        if self.depth >= self.max_depth {
            return Err(Error::RecursionLimitExceeded);
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

/// Which bracket pair a container looks for when asked "are we at its
/// close". Chainpack's tokenizer ignores this (every container, regardless
/// of kind, closes on the same `TERM` byte); Cpon's keys off it to tell
/// `]`/`}` apart.
///
/// Arrays are not a variant here: their element count/type come from either
/// a tag-and-count prefix with untagged raw element payloads (chainpack) or
/// from inferring the element type off the first bracket-delimited element
/// (Cpon) — two different enough shapes that array bodies stay a per-codec
/// `read_array`, not something `assemble_body` walks generically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContainerKind {
    List,
    Map,
    IMap,
}

/// One token pulled from a codec's low-level tokenizer (spec's shared
/// `next_item`). Strings and blobs may arrive over more than one chunk;
/// `last_chunk: true` marks the final one. Both of this crate's tokenizers
/// currently decode a string/blob's whole payload in a single pass and so
/// only ever emit one chunk, but [`assemble_body`] always loops until
/// `last_chunk` regardless, so a tokenizer that streamed bytes straight off
/// a socket could honor the same contract without changing the assembler.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Item {
    Int(i64),
    UInt(u64),
    Double(f64),
    Decimal(Decimal),
    Bool(bool),
    Null,
    String { chunk: Vec<u8>, last_chunk: bool },
    /// Like `String`, but the payload is opaque bytes with no UTF-8
    /// requirement.
    Blob { chunk: Vec<u8>, last_chunk: bool },
    DateTime(DateTime),
    ListBegin,
    MapBegin,
    IMapBegin,
}

/// Pull-style tokenizer contract shared by `chainpack::reader` and
/// `cpon::reader` (spec's component F): decode exactly one [`Item`] per
/// call, sharing the underflow-is-`Eof` and bounded-recursion discipline
/// that both codecs build on. [`assemble_body`] is the one generic consumer
/// of this trait, used by both wire formats so meta-data, strings, and
/// containers are walked with identical semantics — only the byte/char-level
/// lexing that decides *which* `Item` comes next differs per format.
pub(crate) trait Unpack {
    /// Peeks whether the cursor sits at the terminator for a container of
    /// kind `kind`; if so, consumes it and returns `true`, otherwise leaves
    /// the cursor untouched. Kept separate from `next_item` because a
    /// container member may carry its own meta-data prefix, which isn't
    /// itself an `Item` — the caller must rule out "end of container"
    /// before deciding whether to read a plain item or recurse into a
    /// meta-aware value.
    fn at_container_end(&mut self, r: &mut ByteReader, kind: ContainerKind) -> Result<bool>;

    /// Decodes one token, assuming the cursor is not at a container
    /// terminator (call `at_container_end` first when that's ambiguous).
    fn next_item(&mut self, r: &mut ByteReader) -> Result<Item>;

    /// Consumes whatever separates a map/imap key from its value (`:` in
    /// Cpon text, nothing in chainpack's positional binary encoding).
    fn consume_key_separator(&mut self, r: &mut ByteReader) -> Result<()>;
}

/// Builds one [`Value`] from a tokenizer's item stream: this is the
/// assembler shared verbatim by both wire formats. `read_value` recurses
/// into container members and is always a codec's own meta-aware top-level
/// reader (a plain `fn`, not a closure, so it can call back into an
/// `assemble_body` invocation of its own for nested values).
pub(crate) fn assemble_body<T: Unpack>(
    tok: &mut T,
    r: &mut ByteReader,
    depth: &mut DepthGuard,
    read_value: fn(&mut ByteReader, &mut DepthGuard) -> Result<Value>,
) -> Result<Value> {
    depth.enter()?;
    let result = assemble_item(tok, r, depth, read_value);
    depth.leave();
    result
}

fn assemble_item<T: Unpack>(
    tok: &mut T,
    r: &mut ByteReader,
    depth: &mut DepthGuard,
    read_value: fn(&mut ByteReader, &mut DepthGuard) -> Result<Value>,
) -> Result<Value> {
    match tok.next_item(r)? {
        Item::Int(n) => Ok(build::int(n)),
        Item::UInt(n) => Ok(build::uint(n)),
        Item::Double(f) => Ok(build::double(f)),
        Item::Decimal(d) => Ok(build::decimal(d)),
        Item::Bool(b) => Ok(build::bool_(b)),
        Item::Null => Ok(build::null()),
        Item::DateTime(dt) => Ok(build::date_time(dt)),
        Item::String { chunk, last_chunk } => {
            let bytes = collect_chunks(tok, r, chunk, last_chunk)?;
            let s = String::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)?;
            Ok(build::string(s))
        }
        Item::Blob { chunk, last_chunk } => Ok(build::blob(collect_chunks(tok, r, chunk, last_chunk)?)),
        Item::ListBegin => {
            let mut out: List = Vec::new();
            while !tok.at_container_end(r, ContainerKind::List)? {
                out.push(read_value(r, depth)?);
            }
            Ok(build::list(out))
        }
        Item::MapBegin => {
            let mut out = Map::new();
            while !tok.at_container_end(r, ContainerKind::Map)? {
                let key = read_string_key(tok, r)?;
                tok.consume_key_separator(r)?;
                let val = read_value(r, depth)?;
                out.insert(key, val);
            }
            Ok(build::map(out))
        }
        Item::IMapBegin => {
            let mut out = IMap::new();
            while !tok.at_container_end(r, ContainerKind::IMap)? {
                let key = read_int_key(tok, r)?;
                tok.consume_key_separator(r)?;
                let val = read_value(r, depth)?;
                out.insert(key, val);
            }
            Ok(build::imap(out))
        }
    }
}

pub(crate) fn collect_chunks<T: Unpack>(
    tok: &mut T,
    r: &mut ByteReader,
    first_chunk: Vec<u8>,
    first_last: bool,
) -> Result<Vec<u8>> {
    let mut buf = first_chunk;
    let mut last = first_last;
    while !last {
        match tok.next_item(r)? {
            Item::String { chunk, last_chunk } | Item::Blob { chunk, last_chunk } => {
                buf.extend_from_slice(&chunk);
                last = last_chunk;
            }
            other => return Err(Error::malformed(format!("expected a string/blob chunk, got {other:?}"), r.position())),
        }
    }
    Ok(buf)
}

fn read_string_key<T: Unpack>(tok: &mut T, r: &mut ByteReader) -> Result<String> {
    match tok.next_item(r)? {
        Item::String { chunk, last_chunk } => {
            let bytes = collect_chunks(tok, r, chunk, last_chunk)?;
            String::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
        }
        other => Err(Error::malformed(format!("expected a string map key, got {other:?}"), r.position())),
    }
}

fn read_int_key<T: Unpack>(tok: &mut T, r: &mut ByteReader) -> Result<u32> {
    match tok.next_item(r)? {
        Item::UInt(n) => Ok(n as u32),
        Item::Int(n) => Ok(n as u32),
        other => Err(Error::malformed(format!("expected an integer imap key, got {other:?}"), r.position())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_past_end_is_eof() {
        let mut r = ByteReader::new(&[1, 2]);
        assert_eq!(r.read_u8().unwrap(), 1);
        assert_eq!(r.read_u8().unwrap(), 2);
        assert_eq!(r.read_u8().unwrap_err(), Error::Eof);
    }

    #[test]
    fn read_bytes_underflow_leaves_position_unchanged() {
        let mut r = ByteReader::new(&[1, 2, 3]);
        assert_eq!(r.read_bytes(10).unwrap_err(), Error::Eof);
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn depth_guard_rejects_past_limit() {
        let mut g = DepthGuard::new(2);
        g.enter().unwrap();
        g.enter().unwrap();
        assert!(g.enter().is_err());
        g.leave();
        assert!(g.enter().is_ok());
    }
}
