//! Variable-length big-endian integer coding shared by `UInt`/`Int`,
//! `Decimal`'s mantissa, `DateTime`'s packed field, and the RPC frame
//! length/version prefix.
//!
//! The head byte's leading-one-bit count selects how many extra bytes
//! follow and how many value bits the head byte itself still carries:
//!
//! | leading ones | head byte pattern | value bits | extra bytes |
//! |---|---|---|---|
//! | 0 | `0xxxxxxx` | 7 | 0 |
//! | 1 | `10xxxxxx` | 6 | 1 |
//! | 2 | `110xxxxx` | 5 | 2 |
//! | 3 | `1110xxxx` | 4 | 3 |
//! | 4 | `1111nnnn` | 0 (head is pure escape) | `n + 4` |
//!
//! `Int` reuses exactly this tiering, but reserves the top bit of whichever
//! tier's value-bit-width it lands in as the sign bit, so encode/decode share
//! one tiering function instead of a separate zig-zag step.

use crate::error::{Error, Result};
use crate::reader::ByteReader;

enum Tier {
    T0,
    T1,
    T2,
    T3,
    Escape(usize),
}

impl Tier {
    fn value_bits(&self) -> u32 {
        match self {
            Tier::T0 => 7,
            Tier::T1 => 14,
            Tier::T2 => 21,
            Tier::T3 => 28,
            Tier::Escape(bytes) => (*bytes as u32) * 8,
        }
    }
}

fn minimal_be_bytes(n: u64) -> usize {
    if n == 0 {
        return 1;
    }
    (8 - (n.leading_zeros() as usize / 8)).max(1)
}

fn tier_for_uint(n: u64) -> Tier {
    if n < (1 << 7) {
        Tier::T0
    } else if n < (1 << 14) {
        Tier::T1
    } else if n < (1 << 21) {
        Tier::T2
    } else if n < (1 << 28) {
        Tier::T3
    } else {
        Tier::Escape(minimal_be_bytes(n).max(4))
    }
}

/// Smallest tier whose magnitude capacity (`value_bits - 1`, since one bit
/// is reserved for sign) can hold `magnitude`.
fn tier_for_int_magnitude(magnitude: u64) -> Tier {
    if magnitude < (1 << 6) {
        Tier::T0
    } else if magnitude < (1 << 13) {
        Tier::T1
    } else if magnitude < (1 << 20) {
        Tier::T2
    } else if magnitude < (1 << 27) {
        Tier::T3
    } else {
        let mut bytes = 4usize;
        while bytes < 8 && magnitude >= (1u64 << (bytes * 8 - 1)) {
            bytes += 1;
        }
        Tier::Escape(bytes)
    }
}

fn write_tiered(out: &mut Vec<u8>, raw: u64, tier: &Tier) {
    match tier {
        Tier::T0 => out.push(raw as u8),
        Tier::T1 => {
            out.push(0x80 | ((raw >> 8) as u8));
            out.push((raw & 0xFF) as u8);
        }
        Tier::T2 => {
            out.push(0xC0 | ((raw >> 16) as u8));
            out.push(((raw >> 8) & 0xFF) as u8);
            out.push((raw & 0xFF) as u8);
        }
        Tier::T3 => {
            out.push(0xE0 | ((raw >> 24) as u8));
            out.push(((raw >> 16) & 0xFF) as u8);
            out.push(((raw >> 8) & 0xFF) as u8);
            out.push((raw & 0xFF) as u8);
        }
        Tier::Escape(bytes) => {
            out.push(0xF0 | ((*bytes - 4) as u8));
            for i in (0..*bytes).rev() {
                out.push(((raw >> (8 * i)) & 0xFF) as u8);
            }
        }
    }
}

fn read_tiered(r: &mut ByteReader) -> Result<(u64, u32)> {
    let head = r.read_u8()?;
    if head & 0x80 == 0 {
        Ok((head as u64, 7))
    } else if head & 0x40 == 0 {
        let b1 = r.read_u8()?;
        Ok(((((head & 0x3F) as u64) << 8) | b1 as u64, 14))
    } else if head & 0x20 == 0 {
        let b1 = r.read_u8()?;
        let b2 = r.read_u8()?;
        Ok(((((head & 0x1F) as u64) << 16) | ((b1 as u64) << 8) | b2 as u64, 21))
    } else if head & 0x10 == 0 {
        let b1 = r.read_u8()?;
        let b2 = r.read_u8()?;
        let b3 = r.read_u8()?;
        Ok((
            (((head & 0x0F) as u64) << 24) | ((b1 as u64) << 16) | ((b2 as u64) << 8) | b3 as u64,
            28,
        ))
    } else {
        let extra = (head & 0x0F) as usize + 4;
        let mut v = 0u64;
        for _ in 0..extra {
            v = (v << 8) | r.read_u8()? as u64;
        }
        Ok((v, (extra as u32) * 8))
    }
}

pub fn write_uint(out: &mut Vec<u8>, n: u64) {
    let tier = tier_for_uint(n);
    write_tiered(out, n, &tier);
}

pub fn read_uint(r: &mut ByteReader) -> Result<u64> {
    let (raw, _) = read_tiered(r)?;
    Ok(raw)
}

/// Head byte for `i64::MIN`'s widened escape (see `write_int`): nibble `5`
/// means 9 extra bytes, one more than any tier `tier_for_int_magnitude` ever
/// produces on its own.
const MIN_I64_ESCAPE_HEAD: u8 = 0xF0 | 5;

pub fn write_int(out: &mut Vec<u8>, value: i64) {
    if value == i64::MIN {
        // `i64::MIN`'s magnitude is 2^63, which doesn't fit the 8-byte tier's
        // 63 usable magnitude bits (one bit of that tier is the sign). Widen
        // to 9 bytes and store the sign as its own leading byte instead of
        // folding it into the magnitude.
        out.push(MIN_I64_ESCAPE_HEAD);
        out.push(1);
        out.extend_from_slice(&(value as u64).to_be_bytes());
        return;
    }
    let neg = value < 0;
    let magnitude: u64 = if neg { value.unsigned_abs() } else { value as u64 };
    let tier = tier_for_int_magnitude(magnitude);
    let sign_bit = 1u64 << (tier.value_bits() - 1);
    let raw = magnitude | if neg { sign_bit } else { 0 };
    write_tiered(out, raw, &tier);
}

pub fn read_int(r: &mut ByteReader) -> Result<i64> {
    if r.peek_u8()? == MIN_I64_ESCAPE_HEAD {
        r.read_u8()?;
        let sign_byte = r.read_u8()?;
        let magnitude = u64::from_be_bytes(r.read_bytes(8)?.try_into().unwrap());
        let magnitude = magnitude as i64;
        return Ok(if sign_byte != 0 { magnitude.wrapping_neg() } else { magnitude });
    }
    let (raw, bits) = read_tiered(r)?;
    if bits == 0 {
        return Err(Error::malformed("zero-width Int tier", r.position()));
    }
    let sign_bit = 1u64 << (bits - 1);
    let magnitude = raw & (sign_bit - 1);
    Ok(if raw & sign_bit != 0 { -(magnitude as i64) } else { magnitude as i64 })
}
