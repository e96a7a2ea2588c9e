use crate::crdt::CrdtId;
use crate::error::{LinesError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

/// Initial capacity of a stream opened for writing.
const WRITE_CAPACITY: usize = 1024;

/// Little-endian cursor over a byte buffer, usable for both reading and
/// writing. Reads past the end fail with `EndOfInput`; writes grow the
/// buffer.
pub struct ByteStream {
    cursor: Cursor<Vec<u8>>,
}

impl ByteStream {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    pub fn for_write() -> Self {
        Self {
            cursor: Cursor::new(Vec::with_capacity(WRITE_CAPACITY)),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.cursor.read_u8().map_err(|_| LinesError::EndOfInput)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| LinesError::EndOfInput)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| LinesError::EndOfInput)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.cursor
            .read_f32::<LittleEndian>()
            .map_err(|_| LinesError::EndOfInput)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.cursor
            .read_f64::<LittleEndian>()
            .map_err(|_| LinesError::EndOfInput)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; len];
        self.cursor
            .read_exact(&mut buffer)
            .map_err(|_| LinesError::EndOfInput)?;
        Ok(buffer)
    }

    /// Unsigned LEB128: 7 value bits per byte, high bit marks continuation.
    pub fn read_varuint(&mut self) -> Result<u64> {
        let mut result: u64 = 0;
        let mut shift: u32 = 0;
        loop {
            let byte = self.read_u8()?;
            if shift >= 64 {
                return Err(LinesError::InvalidEncoding(
                    "varuint does not fit in 64 bits".to_string(),
                ));
            }
            result |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    pub fn read_crdt_id(&mut self) -> Result<CrdtId> {
        let author = self.read_u8()?;
        let counter = self.read_varuint()?;
        Ok(CrdtId::new(author, counter))
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.cursor.write_u8(value).map_err(|_| LinesError::EndOfInput)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.cursor
            .write_u16::<LittleEndian>(value)
            .map_err(|_| LinesError::EndOfInput)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.cursor
            .write_u32::<LittleEndian>(value)
            .map_err(|_| LinesError::EndOfInput)
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(u8::from(value))
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.cursor
            .write_f32::<LittleEndian>(value)
            .map_err(|_| LinesError::EndOfInput)
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.cursor
            .write_f64::<LittleEndian>(value)
            .map_err(|_| LinesError::EndOfInput)
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.cursor
            .write_all(data)
            .map_err(|_| LinesError::EndOfInput)
    }

    pub fn write_varuint(&mut self, mut value: u64) -> Result<()> {
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            self.write_u8(byte)?;
            if value == 0 {
                return Ok(());
            }
        }
    }

    pub fn write_crdt_id(&mut self, id: CrdtId) -> Result<()> {
        self.write_u8(id.author)?;
        self.write_varuint(id.counter)
    }

    /// Patch a u32 at an absolute position without moving the cursor.
    /// Used to fill in length prefixes once their payload is written.
    pub fn write_u32_at(&mut self, pos: usize, value: u32) -> Result<()> {
        let buf = self.cursor.get_mut();
        if pos + 4 > buf.len() {
            return Err(LinesError::EndOfInput);
        }
        buf[pos..pos + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn tell(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.cursor.get_ref().len() {
            return Err(LinesError::EndOfInput);
        }
        self.cursor.set_position(pos as u64);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.tell())
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.cursor.into_inner()
    }
}
