//! Bounds-checked reader over an index buffer
//!
//! Every read either returns a view of the requested size or an error;
//! a short buffer is reported as [`Error::AllocationFailure`] and a bad tag
//! or out-of-range offset as [`Error::MalformedData`].

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// Little-endian cursor over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Reader positioned at `offset`.
    pub fn at(data: &'a [u8], offset: usize) -> Result<Self> {
        let mut reader = Self::new(data);
        reader.seek(offset)?;
        Ok(reader)
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.data.len() {
            return Err(Error::malformed(
                format!("offset beyond buffer of {} bytes", self.data.len()),
                offset,
            ));
        }
        self.pos = offset;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.read_bytes(count).map(|_| ())
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if count > self.remaining() {
            return Err(Error::AllocationFailure {
                requested: count,
                offset: self.pos,
                available: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    /// Read a `u32` that is used as an offset or count.
    pub fn read_usize(&mut self) -> Result<usize> {
        Ok(self.read_u32()? as usize)
    }

    /// Read four bytes and require them to equal `tag`.
    pub fn expect_tag(&mut self, tag: &[u8; 4]) -> Result<()> {
        let start = self.pos;
        let found = self.read_bytes(4)?;
        if found != tag {
            return Err(Error::malformed(
                format!(
                    "expected tag {:?}, found {:?}",
                    String::from_utf8_lossy(tag),
                    String::from_utf8_lossy(found)
                ),
                start,
            ));
        }
        Ok(())
    }

    /// Read `count` bytes as text; invalid UTF-8 is replaced.
    pub fn read_text(&mut self, count: usize) -> Result<String> {
        Ok(String::from_utf8_lossy(self.read_bytes(count)?).into_owned())
    }
}
