use crate::crdt::{CrdtId, LwwValue};
use crate::error::{LinesError, Result};
use crate::stream::ByteStream;
use crate::tagged::TagType;

/// Bookkeeping for an open sub-block on the write side: where the
/// length prefix sits, to be patched once the payload is complete.
#[derive(Debug, Clone, Copy)]
pub struct SubblockStart {
    length_pos: usize,
}

struct PendingBlock {
    block_type: u8,
    min_version: u8,
    current_version: u8,
    buffer: ByteStream,
}

/// Writer for the tagged encoding. Block payloads are buffered in a
/// scratch stream so the envelope can be emitted with a known length;
/// sub-block lengths are back-patched in place.
pub struct TaggedWriter {
    stream: ByteStream,
    block: Option<PendingBlock>,
}

impl Default for TaggedWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl TaggedWriter {
    pub fn new() -> Self {
        Self {
            stream: ByteStream::for_write(),
            block: None,
        }
    }

    /// The stream writes currently target: the block scratch buffer
    /// while a block is open, the output otherwise.
    pub fn stream(&mut self) -> &mut ByteStream {
        match &mut self.block {
            Some(block) => &mut block.buffer,
            None => &mut self.stream,
        }
    }

    pub fn write_tag(&mut self, index: u8, tag_type: TagType) -> Result<()> {
        let tag = (u64::from(index) << 4) | u64::from(tag_type as u8);
        self.stream().write_varuint(tag)
    }

    pub fn write_bool(&mut self, index: u8, value: bool) -> Result<()> {
        self.write_tag(index, TagType::Byte1)?;
        self.stream().write_bool(value)
    }

    pub fn write_u8(&mut self, index: u8, value: u8) -> Result<()> {
        self.write_tag(index, TagType::Byte1)?;
        self.stream().write_u8(value)
    }

    pub fn write_u32(&mut self, index: u8, value: u32) -> Result<()> {
        self.write_tag(index, TagType::Byte4)?;
        self.stream().write_u32(value)
    }

    pub fn write_f32(&mut self, index: u8, value: f32) -> Result<()> {
        self.write_tag(index, TagType::Byte4)?;
        self.stream().write_f32(value)
    }

    pub fn write_f64(&mut self, index: u8, value: f64) -> Result<()> {
        self.write_tag(index, TagType::Byte8)?;
        self.stream().write_f64(value)
    }

    pub fn write_id(&mut self, index: u8, id: CrdtId) -> Result<()> {
        self.write_tag(index, TagType::Id)?;
        self.stream().write_crdt_id(id)
    }

    pub fn begin_subblock(&mut self, index: u8) -> Result<SubblockStart> {
        self.write_tag(index, TagType::Length4)?;
        let length_pos = self.stream().tell();
        self.stream().write_u32(0)?;
        Ok(SubblockStart { length_pos })
    }

    pub fn end_subblock(&mut self, start: SubblockStart) -> Result<()> {
        let end = self.stream().tell();
        let length = (end - start.length_pos - 4) as u32;
        self.stream().write_u32_at(start.length_pos, length)
    }

    pub fn write_string(&mut self, index: u8, text: &str) -> Result<()> {
        let scope = self.begin_subblock(index)?;
        self.write_string_inner(text)?;
        self.end_subblock(scope)
    }

    pub fn write_string_with_format(
        &mut self,
        index: u8,
        text: &str,
        format: Option<u32>,
    ) -> Result<()> {
        let scope = self.begin_subblock(index)?;
        self.write_string_inner(text)?;
        if let Some(code) = format {
            self.write_u32(2, code)?;
        }
        self.end_subblock(scope)
    }

    fn write_string_inner(&mut self, text: &str) -> Result<()> {
        let bytes = text.as_bytes();
        self.stream().write_varuint(bytes.len() as u64)?;
        self.stream().write_bool(true)?;
        self.stream().write_bytes(bytes)
    }

    pub fn write_lww_bool(&mut self, index: u8, value: &LwwValue<bool>) -> Result<()> {
        self.write_lww(index, value.timestamp, |w| w.write_bool(2, value.value))
    }

    pub fn write_lww_u8(&mut self, index: u8, value: &LwwValue<u8>) -> Result<()> {
        self.write_lww(index, value.timestamp, |w| w.write_u8(2, value.value))
    }

    pub fn write_lww_f32(&mut self, index: u8, value: &LwwValue<f32>) -> Result<()> {
        self.write_lww(index, value.timestamp, |w| w.write_f32(2, value.value))
    }

    pub fn write_lww_id(&mut self, index: u8, value: &LwwValue<CrdtId>) -> Result<()> {
        self.write_lww(index, value.timestamp, |w| w.write_id(2, value.value))
    }

    pub fn write_lww_string(&mut self, index: u8, value: &LwwValue<String>) -> Result<()> {
        self.write_lww(index, value.timestamp, |w| w.write_string(2, &value.value))
    }

    fn write_lww(
        &mut self,
        index: u8,
        timestamp: CrdtId,
        write_value: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        let scope = self.begin_subblock(index)?;
        self.write_id(1, timestamp)?;
        write_value(self)?;
        self.end_subblock(scope)
    }

    /// Open a top-level block. Its payload is buffered until
    /// `end_block`; nesting is a caller bug.
    pub fn start_block(&mut self, block_type: u8, min_version: u8, current_version: u8) -> Result<()> {
        if self.block.is_some() {
            return Err(LinesError::UnexpectedBlock(
                "block started while another block is open".to_string(),
            ));
        }
        if min_version > current_version {
            return Err(LinesError::InvalidEncoding(format!(
                "min_version {min_version} exceeds current_version {current_version}"
            )));
        }
        self.block = Some(PendingBlock {
            block_type,
            min_version,
            current_version,
            buffer: ByteStream::for_write(),
        });
        Ok(())
    }

    pub fn end_block(&mut self) -> Result<()> {
        let block = self.block.take().ok_or_else(|| {
            LinesError::UnexpectedBlock("end_block without an open block".to_string())
        })?;
        let payload = block.buffer.into_inner();
        self.stream.write_u32(payload.len() as u32)?;
        self.stream.write_u8(0)?;
        self.stream.write_u8(block.min_version)?;
        self.stream.write_u8(block.current_version)?;
        self.stream.write_u8(block.block_type)?;
        self.stream.write_bytes(&payload)
    }

    pub fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.stream().write_bytes(data)
    }

    pub fn into_bytes(self) -> Result<Vec<u8>> {
        if self.block.is_some() {
            return Err(LinesError::UnexpectedBlock(
                "stream finished with an unterminated block".to_string(),
            ));
        }
        Ok(self.stream.into_inner())
    }
}
