//! ChainPack wire-format constants.
//!
//! Laid out the way FRPS's `common.rs` lists its type-byte constants: one
//! flat table of `pub const` bytes, grouped by role, each with a short inline
//! comment rather than a type. ChainPack packs its tag in a full byte
//! (unlike FRPS's 5-bit `TYPE_MASK`/3-bit octet-count nibble), so
//! there's no mask/shift pair here — just the packet type table from
//! `chainpack.cpp`'s `PackingSchema` enum.

/// Values `0x00..=0x3F` are an inline `UInt` in `[0, 64)`.
pub const TINY_UINT_MAX: u8 = 0x3F;
/// Values `0x40..=0x7F` are an inline `Int` in `[0, 64)` (subtract `0x40`).
pub const TINY_INT_MIN: u8 = 0x40;
pub const TINY_INT_MAX: u8 = 0x7F;

pub const FALSE: u8 = 0x80;
pub const TRUE: u8 = 0x81;
pub const NULL: u8 = 0x82;
pub const UINT: u8 = 0x83;
pub const INT: u8 = 0x84;
pub const DOUBLE: u8 = 0x85;
pub const BLOB: u8 = 0x86;
pub const STRING: u8 = 0x87;
pub const LIST: u8 = 0x88;
pub const MAP: u8 = 0x89;
pub const IMAP: u8 = 0x8A;
pub const META_IMAP: u8 = 0x8B;
pub const META_SMAP: u8 = 0x8C;
pub const DECIMAL: u8 = 0x8D;
/// Deprecated: bare milliseconds-since-Unix-epoch `Int`. Read-only.
pub const DATE_TIME_EPOCH: u8 = 0x8E;
pub const DATE_TIME: u8 = 0x8F;

/// Terminates `List`/`Map`/`IMap`/meta-data bodies of unknown length.
pub const TERM: u8 = 0xFF;

/// OR'd onto a type byte to mark a homogeneous `Array` of that element type.
pub const ARRAY_FLAG: u8 = 0x80;

/// Array element-type tags (DESIGN.md "array element-type tag range").
///
/// Every scalar tag in `0x80..=0x8F` already has its top bit set, so ORing
/// `ARRAY_FLAG` onto one of those bytes is a no-op and would make an `Array`
/// of that element type byte-identical to the scalar value on the wire —
/// the decoder could never tell them apart. This implementation gives array
/// element types their own disjoint byte range instead of overloading the
/// scalar tags (see DESIGN.md for the reasoning).
pub const ARRAY_ELEM_NULL: u8 = 0x90;
pub const ARRAY_ELEM_BOOL: u8 = 0x91;
pub const ARRAY_ELEM_INT: u8 = 0x92;
pub const ARRAY_ELEM_UINT: u8 = 0x93;
pub const ARRAY_ELEM_DOUBLE: u8 = 0x94;
pub const ARRAY_ELEM_DECIMAL: u8 = 0x95;
pub const ARRAY_ELEM_DATE_TIME: u8 = 0x96;

/// Default bound on container/array nesting depth (Design Note §9,
/// "recursion depth configurable").
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 1000;

/// Flag bits packed into the type-info byte that precedes a `DateTime`'s
/// VLQ-encoded payload (`chainpack.cpp::readData_DateTime`).
pub const DATE_TIME_MASK_HAS_TZ: u64 = 1;
pub const DATE_TIME_MASK_NO_MSEC: u64 = 2;
pub const DATE_TIME_SHIFT_TZ: u32 = 2;
