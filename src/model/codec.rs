//! Binary record encoding
//!
//! Records are written field by field in a fixed order: LEB128 varints for
//! integers, varint-length-prefixed UTF-8 for strings, and a seconds/nanos
//! pair for timestamps. There is no framing or schema; readers must consume
//! fields in the order writers produced them.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Longest varint accepted for a u64 (ceil(64 / 7))
pub const MAX_VARINT_BYTES: usize = 10;

/// Errors raised while decoding a record
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Unexpected end of record at byte {0}")]
    UnexpectedEof(usize),

    #[error("Varint exceeds maximum length at byte {0}")]
    VarintOverflow(usize),

    #[error("Length {len} at byte {pos} exceeds remaining {remaining} bytes")]
    LengthOverflow {
        len: u64,
        pos: usize,
        remaining: usize,
    },

    #[error("Invalid UTF-8 string at byte {0}")]
    InvalidUtf8(usize),

    #[error("Invalid timestamp: {secs}s {nanos}ns")]
    InvalidTimestamp { secs: i64, nanos: u32 },

    #[error("Unknown action tag: {0}")]
    UnknownAction(u64),

    #[error("Value out of range: {0}")]
    OutOfRange(u64),

    #[error("{0} trailing bytes after record")]
    TrailingBytes(usize),
}

/// Encode a varint to bytes
pub fn put_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        } else {
            buf.push(byte | 0x80);
        }
    }
}

/// Encode a signed integer as a zigzag varint
pub fn put_signed(buf: &mut Vec<u8>, value: i64) {
    put_varint(buf, ((value << 1) ^ (value >> 63)) as u64);
}

pub fn put_string(buf: &mut Vec<u8>, value: &str) {
    put_varint(buf, value.len() as u64);
    buf.extend_from_slice(value.as_bytes());
}

pub fn put_strings(buf: &mut Vec<u8>, values: &[String]) {
    put_varint(buf, values.len() as u64);
    for value in values {
        put_string(buf, value);
    }
}

pub fn put_time(buf: &mut Vec<u8>, time: &DateTime<Utc>) {
    buf.extend_from_slice(&time.timestamp().to_be_bytes());
    buf.extend_from_slice(&time.timestamp_subsec_nanos().to_be_bytes());
}

/// Cursor over an encoded record
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::UnexpectedEof(self.pos));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn varint(&mut self) -> Result<u64, CodecError> {
        let start = self.pos;
        let mut result: u64 = 0;
        let mut shift = 0;

        for i in 0..MAX_VARINT_BYTES {
            let byte = *self
                .bytes
                .get(self.pos)
                .ok_or(CodecError::UnexpectedEof(self.pos))?;
            self.pos += 1;
            result |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            // The tenth byte may only carry the top bit of a u64
            if i == MAX_VARINT_BYTES - 2 && self.bytes.get(self.pos).map_or(false, |b| *b > 1) {
                break;
            }
            shift += 7;
        }

        Err(CodecError::VarintOverflow(start))
    }

    pub fn signed(&mut self) -> Result<i64, CodecError> {
        let raw = self.varint()?;
        Ok((raw >> 1) as i64 ^ -((raw & 1) as i64))
    }

    pub fn string(&mut self) -> Result<String, CodecError> {
        let pos = self.pos;
        let len = self.varint()?;
        let remaining = self.remaining();
        if len > remaining as u64 {
            return Err(CodecError::LengthOverflow {
                len,
                pos,
                remaining,
            });
        }
        let bytes = self.take(len as usize)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8(pos))
    }

    pub fn strings(&mut self) -> Result<Vec<String>, CodecError> {
        let pos = self.pos;
        let count = self.varint()?;
        // Every string needs at least its length byte
        let remaining = self.remaining();
        if count > remaining as u64 {
            return Err(CodecError::LengthOverflow {
                len: count,
                pos,
                remaining,
            });
        }
        (0..count).map(|_| self.string()).collect()
    }

    pub fn time(&mut self) -> Result<DateTime<Utc>, CodecError> {
        let mut secs = [0u8; 8];
        secs.copy_from_slice(self.take(8)?);
        let mut nanos = [0u8; 4];
        nanos.copy_from_slice(self.take(4)?);

        let secs = i64::from_be_bytes(secs);
        let nanos = u32::from_be_bytes(nanos);
        DateTime::from_timestamp(secs, nanos).ok_or(CodecError::InvalidTimestamp { secs, nanos })
    }

    /// Fails if any bytes were left unread
    pub fn finish(self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}

/// A value with a fixed-order binary encoding
pub trait BinaryRecord: Sized {
    fn write_to(&self, buf: &mut Vec<u8>);

    fn read_from(reader: &mut Reader<'_>) -> Result<Self, CodecError>;

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_to(&mut buf);
        buf
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = Reader::new(bytes);
        let value = Self::read_from(&mut reader)?;
        reader.finish()?;
        Ok(value)
    }
}
