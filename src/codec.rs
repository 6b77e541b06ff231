//! Big-endian integer read/write on byte cursors, with bounds checks, and
//! the 1/2/3-byte vector-length-prefix convention used throughout the TLS
//! handshake grammar.

use alloc::vec::Vec;

use crate::error::Error;

/// A read cursor over a byte slice. Every `get_*` call either advances the
/// cursor and returns the value, or returns a `Decode` error and leaves the
/// cursor positioned at the start of the failed read.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn used(&self) -> usize {
        self.pos
    }

    pub fn left(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn eof(&self) -> bool {
        self.left() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        if self.left() < n {
            return Err(Error::Decode(alloc::format!(
                "truncated buffer: wanted {n} bytes, have {}",
                self.left()
            )));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn get_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    pub fn get_u16(&mut self) -> Result<u16, Error> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn get_u24(&mut self) -> Result<u32, Error> {
        let b = self.take(3)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    pub fn get_u32(&mut self) -> Result<u32, Error> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn get_bytes(&mut self, n: usize) -> Result<&'a [u8], Error> {
        self.take(n)
    }

    /// Read a vector whose length is given by a prefix of `prefix_len`
    /// bytes (1, 2, or 3), and return the inner slice (not including the
    /// prefix).
    pub fn get_vec(&mut self, prefix_len: usize) -> Result<&'a [u8], Error> {
        let len = match prefix_len {
            1 => self.get_u8()? as usize,
            2 => self.get_u16()? as usize,
            3 => self.get_u24()? as usize,
            _ => return Err(Error::Internal("bad vector prefix length".into())),
        };
        self.take(len)
    }

    /// Split off a sub-`Reader` covering a length-prefixed region, useful
    /// for parsing nested extension lists without copying.
    pub fn sub_reader(&mut self, prefix_len: usize) -> Result<Reader<'a>, Error> {
        Ok(Reader::new(self.get_vec(prefix_len)?))
    }
}

/// An append-only write cursor into a caller-owned buffer (the
/// record-layer-provided handshake-message buffer). Writers return the
/// number of bytes written or a `Resource` error if the buffer is full.
pub struct Writer<'a> {
    buf: &'a mut Vec<u8>,
}

impl<'a> Writer<'a> {
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        Self { buf }
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_u24(&mut self, v: u32) {
        let b = v.to_be_bytes();
        self.buf.extend_from_slice(&b[1..4]);
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_bytes(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }

    /// Reserve `prefix_len` bytes for a length prefix, run `f` to write the
    /// body, then backfill the prefix with the body's length.
    pub fn length_prefixed(
        &mut self,
        prefix_len: usize,
        f: impl FnOnce(&mut Writer<'_>),
    ) -> Result<(), Error> {
        let start = self.buf.len();
        match prefix_len {
            1 => self.put_u8(0),
            2 => self.put_u16(0),
            3 => self.put_u24(0),
            _ => return Err(Error::Internal("bad vector prefix length".into())),
        }
        let body_start = self.buf.len();
        f(self);
        let body_len = self.buf.len() - body_start;
        let max = match prefix_len {
            1 => u8::MAX as usize,
            2 => u16::MAX as usize,
            _ => 0x00FF_FFFF,
        };
        if body_len > max {
            return Err(Error::Resource(alloc::format!(
                "length-prefixed body of {body_len} bytes exceeds {prefix_len}-byte prefix"
            )));
        }
        match prefix_len {
            1 => self.buf[start] = body_len as u8,
            2 => self.buf[start..start + 2].copy_from_slice(&(body_len as u16).to_be_bytes()),
            3 => {
                let b = (body_len as u32).to_be_bytes();
                self.buf[start..start + 3].copy_from_slice(&b[1..4]);
            }
            _ => unreachable!(),
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Overwrite a single already-written byte at `pos`. Used by the
    /// PSK binder's two-phase write (spec §4.2), where a placeholder is
    /// reserved before the transcript needed to compute the real value
    /// exists.
    pub fn overwrite_u8(&mut self, pos: usize, v: u8) {
        self.buf[pos] = v;
    }

    /// Overwrite `v.len()` already-written bytes starting at `pos`.
    pub fn overwrite_bytes(&mut self, pos: usize, v: &[u8]) {
        self.buf[pos..pos + v.len()].copy_from_slice(v);
    }
}

/// Types with a canonical TLS wire encoding, mirroring rustls's `Codec`
/// trait: symmetric `encode`/`read` so extension writers and parsers stay
/// next to each other.
pub trait Codec: Sized {
    fn encode(&self, w: &mut Writer<'_>);
    fn read(r: &mut Reader<'_>) -> Result<Self, Error>;
}
