//! Byte-level encodings of a compact list entry.
//!
//! Every entry is laid out as:
//! ```text
//! ┌──────────────────────┬──────────────────────────┬───────────────┐
//! │ prevlen (1B or 5B)   │ type+length (1B/2B/5B)   │ payload (var) │
//! └──────────────────────┴──────────────────────────┴───────────────┘
//! ```
//!
//! `prevlen` is the total encoded size of the previous entry. Below 254 it is
//! a single byte; otherwise a `0xFE` marker followed by a 4-byte
//! little-endian length.
//!
//! The first byte of the type+length field:
//! ```text
//! 00pppppp                       string, len <= 63
//! 01pppppp qqqqqqqq              string, len <= 16383 (14 bits, big endian)
//! 10000000 [4B big endian len]   string, len up to u32::MAX
//! 11000000                       int16  (2B payload)
//! 11010000                       int32  (4B payload)
//! 11100000                       int64  (8B payload)
//! 11110000                       int24  (3B payload)
//! 11111110                       int8   (1B payload)
//! 1111xxxx                       immediate, xxxx in 0001..=1101, value = xxxx - 1
//! 11111111                       end of buffer
//! ```
//! Integer payloads are little endian.

/// Fixed buffer header: total_bytes(4B) + tail_offset(4B) + count(2B).
pub const HEADER_SIZE: usize = 10;

/// Terminator byte. Always the final byte of a buffer.
pub const END: u8 = 0xFF;

/// First byte of a 5-byte prevlen field.
pub const BIG_PREVLEN: u8 = 0xFE;

/// Predecessors at least this large need the 5-byte prevlen form.
pub const BIG_PREVLEN_THRESHOLD: usize = 254;

const STR_MASK: u8 = 0xC0;
const STR_06B: u8 = 0x00;
const STR_14B: u8 = 0x40;
const STR_32B: u8 = 0x80;
const INT_16B: u8 = 0xC0;
const INT_32B: u8 = 0xD0;
const INT_64B: u8 = 0xE0;
const INT_24B: u8 = 0xF0;
const INT_8B: u8 = 0xFE;
const INT_IMM_MIN: u8 = 0xF1;
const INT_IMM_MAX: u8 = 0xFD;
const INT_IMM_MASK: u8 = 0x0F;

const STR_06B_MAX: usize = 0x3F;
const STR_14B_MAX: usize = 0x3FFF;

const INT24_MIN: i64 = -(1 << 23);
const INT24_MAX: i64 = (1 << 23) - 1;
const IMM_MAX_VALUE: i64 = 12;

/// Longest decimal text that can be a canonical i64 ("-9223372036854775808").
const MAX_INT_TEXT_LEN: usize = 20;

/// Payload encoding of one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Str06,
    Str14,
    Str32,
    Int8,
    Int16,
    Int24,
    Int32,
    Int64,
    /// Value 0..=12 packed into the type byte itself.
    Imm,
}

impl Encoding {
    pub fn is_int(self) -> bool {
        !matches!(self, Encoding::Str06 | Encoding::Str14 | Encoding::Str32)
    }

    /// Payload bytes that follow the type byte of an integer encoding.
    pub(crate) fn int_width(self) -> usize {
        match self {
            Encoding::Int8 => 1,
            Encoding::Int16 => 2,
            Encoding::Int24 => 3,
            Encoding::Int32 => 4,
            Encoding::Int64 => 8,
            Encoding::Imm => 0,
            Encoding::Str06 | Encoding::Str14 | Encoding::Str32 => {
                unreachable!("int_width on a string encoding")
            }
        }
    }

    /// Smallest integer encoding that holds `v`.
    pub fn for_int(v: i64) -> Encoding {
        if (0..=IMM_MAX_VALUE).contains(&v) {
            Encoding::Imm
        } else if i8::try_from(v).is_ok() {
            Encoding::Int8
        } else if i16::try_from(v).is_ok() {
            Encoding::Int16
        } else if (INT24_MIN..=INT24_MAX).contains(&v) {
            Encoding::Int24
        } else if i32::try_from(v).is_ok() {
            Encoding::Int32
        } else {
            Encoding::Int64
        }
    }

    /// Smallest string encoding for a payload of `len` bytes.
    pub fn for_str_len(len: usize) -> Encoding {
        if len <= STR_06B_MAX {
            Encoding::Str06
        } else if len <= STR_14B_MAX {
            Encoding::Str14
        } else {
            Encoding::Str32
        }
    }
}

/// Size of the prevlen field needed to describe a predecessor of `len` bytes.
pub(crate) fn prevlen_size_for(len: usize) -> usize {
    if len < BIG_PREVLEN_THRESHOLD { 1 } else { 5 }
}

/// An encoded prevlen field.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PrevLen {
    bytes: [u8; 5],
    size: usize,
}

impl PrevLen {
    /// Encode `len`. With `force_large` the 5-byte form is used even when
    /// one byte would do; this is how an oversized field keeps its width.
    pub(crate) fn encode(len: usize, force_large: bool) -> Self {
        let mut bytes = [0u8; 5];
        if len < BIG_PREVLEN_THRESHOLD && !force_large {
            bytes[0] = len as u8;
            PrevLen { bytes, size: 1 }
        } else {
            assert!(len <= u32::MAX as usize, "compact entry larger than 4GiB");
            bytes[0] = BIG_PREVLEN;
            bytes[1..5].copy_from_slice(&(len as u32).to_le_bytes());
            PrevLen { bytes, size: 5 }
        }
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.size]
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }
}

/// Decode the prevlen field at `offset`: `(field_size, predecessor_len)`.
/// `None` when the bytes are missing or the first byte is the terminator.
pub(crate) fn try_decode_prevlen(buf: &[u8], offset: usize) -> Option<(usize, usize)> {
    let first = *buf.get(offset)?;
    if first < BIG_PREVLEN {
        Some((1, first as usize))
    } else if first == BIG_PREVLEN {
        let raw: [u8; 4] = buf.get(offset + 1..offset + 5)?.try_into().ok()?;
        Some((5, u32::from_le_bytes(raw) as usize))
    } else {
        None
    }
}

pub(crate) fn decode_prevlen(buf: &[u8], offset: usize) -> (usize, usize) {
    try_decode_prevlen(buf, offset)
        .unwrap_or_else(|| panic!("corrupt compact list: bad prevlen at offset {offset}"))
}

/// Decoded metadata of the entry starting at some offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EntryHeader {
    pub prevlen_size: usize,
    pub prevlen: usize,
    pub encoding: Encoding,
    /// Size of the type+length field.
    pub len_size: usize,
    /// Payload bytes.
    pub len: usize,
}

impl EntryHeader {
    pub(crate) fn try_decode(buf: &[u8], offset: usize) -> Option<Self> {
        let (prevlen_size, prevlen) = try_decode_prevlen(buf, offset)?;
        let p = offset + prevlen_size;
        let b = *buf.get(p)?;
        let (encoding, len_size, len) = match b & STR_MASK {
            STR_06B => (Encoding::Str06, 1, (b as usize) & STR_06B_MAX),
            STR_14B => {
                let low = *buf.get(p + 1)? as usize;
                (Encoding::Str14, 2, (((b & !STR_MASK) as usize) << 8) | low)
            }
            STR_32B => {
                if b != STR_32B {
                    return None;
                }
                let raw: [u8; 4] = buf.get(p + 1..p + 5)?.try_into().ok()?;
                (Encoding::Str32, 5, u32::from_be_bytes(raw) as usize)
            }
            _ => {
                let encoding = match b {
                    INT_8B => Encoding::Int8,
                    INT_16B => Encoding::Int16,
                    INT_24B => Encoding::Int24,
                    INT_32B => Encoding::Int32,
                    INT_64B => Encoding::Int64,
                    INT_IMM_MIN..=INT_IMM_MAX => Encoding::Imm,
                    _ => return None,
                };
                (encoding, 1, encoding.int_width())
            }
        };
        let header = EntryHeader {
            prevlen_size,
            prevlen,
            encoding,
            len_size,
            len,
        };
        if offset + header.total_size() > buf.len() {
            return None;
        }
        Some(header)
    }

    /// Decode the header at `offset`. Unknown encoding bytes are fatal.
    pub(crate) fn decode(buf: &[u8], offset: usize) -> Self {
        Self::try_decode(buf, offset)
            .unwrap_or_else(|| panic!("corrupt compact list: bad entry at offset {offset}"))
    }

    pub(crate) fn header_size(&self) -> usize {
        self.prevlen_size + self.len_size
    }

    /// Encoded size of the whole entry (prevlen + type/length + payload).
    pub(crate) fn total_size(&self) -> usize {
        self.header_size() + self.len
    }
}

/// What gets written after an entry's prevlen field.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Payload<'a> {
    Str(&'a [u8]),
    Int(i64, Encoding),
}

impl<'a> Payload<'a> {
    /// Integers in canonical decimal form are always stored as integers.
    pub(crate) fn from_bytes(value: &'a [u8]) -> Self {
        match try_numeric_encode(value) {
            Some((v, encoding)) => Payload::Int(v, encoding),
            None => Payload::Str(value),
        }
    }

    /// Size of the type+length field plus payload.
    pub(crate) fn encoded_len(&self) -> usize {
        match *self {
            Payload::Str(s) => {
                let len_size = match Encoding::for_str_len(s.len()) {
                    Encoding::Str06 => 1,
                    Encoding::Str14 => 2,
                    _ => 5,
                };
                len_size + s.len()
            }
            Payload::Int(_, encoding) => 1 + encoding.int_width(),
        }
    }

    pub(crate) fn write_to(&self, out: &mut Vec<u8>) {
        match *self {
            Payload::Str(s) => {
                let len = s.len();
                match Encoding::for_str_len(len) {
                    Encoding::Str06 => out.push(STR_06B | len as u8),
                    Encoding::Str14 => {
                        out.push(STR_14B | (len >> 8) as u8);
                        out.push((len & 0xFF) as u8);
                    }
                    _ => {
                        assert!(len <= u32::MAX as usize, "compact string larger than 4GiB");
                        out.push(STR_32B);
                        out.extend_from_slice(&(len as u32).to_be_bytes());
                    }
                }
                out.extend_from_slice(s);
            }
            Payload::Int(v, encoding) => match encoding {
                Encoding::Imm => out.push(INT_IMM_MIN + v as u8),
                Encoding::Int8 => {
                    out.push(INT_8B);
                    out.push(v as i8 as u8);
                }
                Encoding::Int16 => {
                    out.push(INT_16B);
                    out.extend_from_slice(&(v as i16).to_le_bytes());
                }
                Encoding::Int24 => {
                    // Low three bytes of the value, little endian.
                    let shifted = ((v as i32) << 8).to_le_bytes();
                    out.push(INT_24B);
                    out.extend_from_slice(&shifted[1..4]);
                }
                Encoding::Int32 => {
                    out.push(INT_32B);
                    out.extend_from_slice(&(v as i32).to_le_bytes());
                }
                Encoding::Int64 => {
                    out.push(INT_64B);
                    out.extend_from_slice(&v.to_le_bytes());
                }
                Encoding::Str06 | Encoding::Str14 | Encoding::Str32 => {
                    unreachable!("string encoding on an integer payload")
                }
            },
        }
    }
}

/// Read the integer whose type byte sits at `p`.
pub(crate) fn decode_int(buf: &[u8], p: usize, encoding: Encoding) -> i64 {
    let at = p + 1;
    match encoding {
        Encoding::Imm => ((buf[p] & INT_IMM_MASK) as i64) - 1,
        Encoding::Int8 => buf[at] as i8 as i64,
        Encoding::Int16 => i16::from_le_bytes([buf[at], buf[at + 1]]) as i64,
        Encoding::Int24 => (i32::from_le_bytes([0, buf[at], buf[at + 1], buf[at + 2]]) >> 8) as i64,
        Encoding::Int32 => {
            i32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]) as i64
        }
        Encoding::Int64 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&buf[at..at + 8]);
            i64::from_le_bytes(raw)
        }
        Encoding::Str06 | Encoding::Str14 | Encoding::Str32 => {
            unreachable!("decode_int on a string entry")
        }
    }
}

/// Parse `bytes` as an i64 only if it is the canonical decimal text of
/// that integer: optional single `-`, no `+`, no leading zeros (except
/// `"0"` itself), no whitespace, no `"-0"`.
pub fn parse_canonical_i64(bytes: &[u8]) -> Option<i64> {
    if bytes.is_empty() || bytes.len() > MAX_INT_TEXT_LEN {
        return None;
    }
    let (negative, digits) = match bytes {
        [b'-', rest @ ..] => (true, rest),
        _ => (false, bytes),
    };
    match digits {
        [b'0'] if !negative => return Some(0),
        [b'1'..=b'9', ..] => {}
        _ => return None,
    }

    // Accumulate on the negative side so i64::MIN parses without overflow.
    let mut acc: i64 = 0;
    for &d in digits {
        if !d.is_ascii_digit() {
            return None;
        }
        acc = acc.checked_mul(10)?.checked_sub((d - b'0') as i64)?;
    }
    if negative { Some(acc) } else { acc.checked_neg() }
}

/// If `bytes` is a canonical integer, return it with the smallest encoding
/// able to hold it. Such values are always stored as integer entries.
pub fn try_numeric_encode(bytes: &[u8]) -> Option<(i64, Encoding)> {
    parse_canonical_i64(bytes).map(|v| (v, Encoding::for_int(v)))
}
