use crate::blob::Blob;
use thiserror::Error;

/// Errors produced while decoding serialized bytes.
///
/// These carry no table context; the query layer wraps them together with
/// the table name and offending key when a stored row fails to decode.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of input: wanted {wanted} bytes, {remaining} remaining")]
    UnexpectedEof { wanted: usize, remaining: usize },
    #[error("length field {len} exceeds remaining input ({remaining} bytes)")]
    LengthOutOfRange { len: u64, remaining: usize },
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,
    #[error("{0} bytes left after decoding a complete record")]
    TrailingBytes(usize),
}

/// Sink a `Serializer` writes into.
///
/// `write` returns false when the sink rejects the bytes; `pos` is the
/// running offset, used by callers that patch up headers after the fact.
pub trait Sink {
    fn write(&mut self, bytes: &[u8]) -> bool;
    fn pos(&self) -> usize;
}

impl Sink for Blob {
    fn write(&mut self, bytes: &[u8]) -> bool {
        self.append(bytes);
        true
    }

    fn pos(&self) -> usize {
        self.size()
    }
}

impl Sink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) -> bool {
        self.extend_from_slice(bytes);
        true
    }

    fn pos(&self) -> usize {
        self.len()
    }
}

/// Stream-style byte writer.
///
/// Encoding rules, fixed for every reader and writer of the store:
/// fixed-width integers are little-endian; lengths and element counts are
/// 8-byte `u64` little-endian regardless of host pointer width; byte
/// strings are length followed by raw bytes.
pub struct Serializer<'a, S: Sink> {
    sink: &'a mut S,
    failed: bool,
}

impl<'a, S: Sink> Serializer<'a, S> {
    pub fn new(sink: &'a mut S) -> Self {
        Self {
            sink,
            failed: false,
        }
    }

    pub fn pos(&self) -> usize {
        self.sink.pos()
    }

    /// True if any write has been rejected by the sink.
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    pub fn write_raw(&mut self, bytes: &[u8]) -> &mut Self {
        if !self.failed && !self.sink.write(bytes) {
            self.failed = true;
        }
        self
    }

    pub fn write_u8(&mut self, v: u8) -> &mut Self {
        self.write_raw(&[v])
    }

    pub fn write_u16(&mut self, v: u16) -> &mut Self {
        self.write_raw(&v.to_le_bytes())
    }

    pub fn write_u32(&mut self, v: u32) -> &mut Self {
        self.write_raw(&v.to_le_bytes())
    }

    pub fn write_u64(&mut self, v: u64) -> &mut Self {
        self.write_raw(&v.to_le_bytes())
    }

    pub fn write_i32(&mut self, v: i32) -> &mut Self {
        self.write_raw(&v.to_le_bytes())
    }

    pub fn write_i64(&mut self, v: i64) -> &mut Self {
        self.write_raw(&v.to_le_bytes())
    }

    /// Length or element count: always 8 bytes on the wire.
    pub fn write_len(&mut self, len: usize) -> &mut Self {
        self.write_u64(len as u64)
    }

    /// Length-prefixed byte string.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.write_len(bytes.len());
        self.write_raw(bytes)
    }

    pub fn write_str(&mut self, s: &str) -> &mut Self {
        self.write_bytes(s.as_bytes())
    }
}

/// Stream-style reader over a borrowed byte view.
pub struct Deserializer<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Deserializer<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn at_end(&self) -> bool {
        self.remaining() == 0
    }

    /// Fail unless the whole input has been consumed.
    pub fn finish(self) -> Result<(), DecodeError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(DecodeError::TrailingBytes(self.remaining()))
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::UnexpectedEof {
                wanted: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let mut a = [0u8; 2];
        a.copy_from_slice(self.take(2)?);
        Ok(u16::from_le_bytes(a))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let mut a = [0u8; 4];
        a.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(a))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        let mut a = [0u8; 8];
        a.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(a))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        let mut a = [0u8; 4];
        a.copy_from_slice(self.take(4)?);
        Ok(i32::from_le_bytes(a))
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        let mut a = [0u8; 8];
        a.copy_from_slice(self.take(8)?);
        Ok(i64::from_le_bytes(a))
    }

    /// Length or element count, validated against the remaining input so a
    /// corrupt header cannot drive a huge allocation.
    pub fn read_len(&mut self) -> Result<usize, DecodeError> {
        let len = self.read_u64()?;
        if len > self.remaining() as u64 {
            return Err(DecodeError::LengthOutOfRange {
                len,
                remaining: self.remaining(),
            });
        }
        Ok(len as usize)
    }

    /// Length-prefixed byte string, borrowed from the input.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_len()?;
        self.take(len)
    }

    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
    }
}
