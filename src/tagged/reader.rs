use crate::crdt::{CrdtId, LwwValue};
use crate::error::{LinesError, Result};
use crate::stream::ByteStream;
use crate::tagged::TagType;
use log::warn;

/// Bookkeeping for an open sub-block: where its payload starts and how
/// many bytes it declared.
#[derive(Debug, Clone, Copy)]
pub struct SubblockScope {
    pub offset: usize,
    pub length: usize,
}

/// Envelope of a top-level block as found in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramedBlock {
    pub offset: usize,
    pub length: usize,
    pub block_type: u8,
    pub min_version: u8,
    pub current_version: u8,
}

/// Reader for the tagged encoding: pairs every primitive with its
/// (index, wire-type) tag, tracks sub-block scopes, and frames
/// top-level blocks.
pub struct TaggedReader {
    stream: ByteStream,
    block_end: Option<usize>,
    scope_ends: Vec<usize>,
    warned_extra_data: bool,
}

impl TaggedReader {
    pub fn new(data: &[u8]) -> Self {
        Self {
            stream: ByteStream::new(data.to_vec()),
            block_end: None,
            scope_ends: Vec::new(),
            warned_extra_data: false,
        }
    }

    /// Raw access to the underlying stream, for the few untagged wire
    /// positions (varuint counts, bare ids, bare doubles).
    pub fn stream(&mut self) -> &mut ByteStream {
        &mut self.stream
    }

    pub fn tell(&self) -> usize {
        self.stream.tell()
    }

    /// Bytes left before the end of the active top-level block, or of
    /// the whole stream when no block is open.
    pub fn remaining_in_block(&self) -> usize {
        match self.block_end {
            Some(end) => end.saturating_sub(self.stream.tell()),
            None => self.stream.remaining(),
        }
    }

    /// Bytes left in the innermost open sub-block (falling back to the
    /// block, then the stream).
    pub fn remaining_in_scope(&self) -> usize {
        match self.scope_ends.last() {
            Some(end) => end.saturating_sub(self.stream.tell()),
            None => self.remaining_in_block(),
        }
    }

    /// Consume a tag, failing (and restoring position) unless both the
    /// field index and the wire type match.
    pub fn read_tag(&mut self, index: u8, tag_type: TagType) -> Result<()> {
        let pos = self.stream.tell();
        let result = self.read_tag_inner(index, tag_type);
        if result.is_err() {
            self.stream.seek(pos)?;
        }
        result
    }

    fn read_tag_inner(&mut self, index: u8, tag_type: TagType) -> Result<()> {
        let x = self.stream.read_varuint()?;
        let found_index = (x >> 4) as u8;
        let found_type = (x & 0x0F) as u8;
        if found_index != index || found_type != tag_type as u8 {
            return Err(LinesError::UnexpectedTag {
                expected_index: index,
                expected_type: tag_type as u8,
                found_index,
                found_type,
            });
        }
        Ok(())
    }

    /// Check for a tag without advancing, regardless of outcome.
    pub fn peek_tag(&mut self, index: u8, tag_type: TagType) -> bool {
        let pos = self.stream.tell();
        let matched = self.read_tag_inner(index, tag_type).is_ok();
        // The seek cannot fail: we never moved past the buffer end.
        let _ = self.stream.seek(pos);
        matched
    }

    /// True if the next field in the current scope is a sub-block with
    /// this index.
    pub fn has_subblock(&mut self, index: u8) -> bool {
        self.remaining_in_scope() > 0 && self.peek_tag(index, TagType::Length4)
    }

    fn optional<T>(&mut self, read: impl FnOnce(&mut Self) -> Result<T>) -> Result<Option<T>> {
        // An exhausted scope means the field is absent; peeking past
        // its end could misread the next region as a matching tag.
        if self.remaining_in_scope() == 0 {
            return Ok(None);
        }
        let pos = self.stream.tell();
        match read(self) {
            Ok(value) => Ok(Some(value)),
            Err(LinesError::UnexpectedTag { .. }) | Err(LinesError::EndOfInput) => {
                self.stream.seek(pos)?;
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }

    pub fn read_bool(&mut self, index: u8) -> Result<bool> {
        self.read_tag(index, TagType::Byte1)?;
        self.stream.read_bool()
    }

    pub fn read_u8(&mut self, index: u8) -> Result<u8> {
        self.read_tag(index, TagType::Byte1)?;
        self.stream.read_u8()
    }

    pub fn read_u32(&mut self, index: u8) -> Result<u32> {
        self.read_tag(index, TagType::Byte4)?;
        self.stream.read_u32()
    }

    pub fn read_f32(&mut self, index: u8) -> Result<f32> {
        self.read_tag(index, TagType::Byte4)?;
        self.stream.read_f32()
    }

    pub fn read_f64(&mut self, index: u8) -> Result<f64> {
        self.read_tag(index, TagType::Byte8)?;
        self.stream.read_f64()
    }

    pub fn read_id(&mut self, index: u8) -> Result<CrdtId> {
        self.read_tag(index, TagType::Id)?;
        self.stream.read_crdt_id()
    }

    pub fn read_bool_opt(&mut self, index: u8) -> Result<Option<bool>> {
        self.optional(|r| r.read_bool(index))
    }

    pub fn read_u32_opt(&mut self, index: u8) -> Result<Option<u32>> {
        self.optional(|r| r.read_u32(index))
    }

    pub fn read_id_opt(&mut self, index: u8) -> Result<Option<CrdtId>> {
        self.optional(|r| r.read_id(index))
    }

    pub fn begin_subblock(&mut self, index: u8) -> Result<SubblockScope> {
        self.read_tag(index, TagType::Length4)?;
        let length = self.stream.read_u32()? as usize;
        let offset = self.stream.tell();
        self.scope_ends.push(offset + length);
        Ok(SubblockScope { offset, length })
    }

    /// Close a sub-block: position past its declared end is fatal,
    /// unread bytes are captured as extra data.
    pub fn end_subblock(&mut self, scope: SubblockScope) -> Result<Vec<u8>> {
        self.scope_ends.pop();
        self.close_scope(scope.offset, scope.length)
    }

    fn close_scope(&mut self, offset: usize, length: usize) -> Result<Vec<u8>> {
        let end = offset + length;
        let pos = self.stream.tell();
        if pos > end {
            return Err(LinesError::BlockOverflow { offset, length });
        }
        if pos < end {
            let extra = self.stream.read_bytes(end - pos)?;
            if !self.warned_extra_data {
                warn!(
                    "scope at offset {offset} contains {} unread trailing bytes; \
                     further occurrences in this stream will not be reported",
                    extra.len()
                );
                self.warned_extra_data = true;
            }
            return Ok(extra);
        }
        Ok(Vec::new())
    }

    pub fn read_string(&mut self, index: u8) -> Result<String> {
        let scope = self.begin_subblock(index)?;
        let text = self.read_string_inner()?;
        self.end_subblock(scope)?;
        Ok(text)
    }

    /// A string sub-block that may carry a trailing format code.
    pub fn read_string_with_format(&mut self, index: u8) -> Result<(String, Option<u32>)> {
        let scope = self.begin_subblock(index)?;
        let text = self.read_string_inner()?;
        let format = self.read_u32_opt(2)?;
        self.end_subblock(scope)?;
        Ok((text, format))
    }

    fn read_string_inner(&mut self) -> Result<String> {
        let length = self.stream.read_varuint()? as usize;
        let is_ascii = self.stream.read_bool()?;
        if !is_ascii {
            return Err(LinesError::InvalidEncoding(
                "string is not flagged ASCII".to_string(),
            ));
        }
        let bytes = self.stream.read_bytes(length)?;
        String::from_utf8(bytes)
            .map_err(|_| LinesError::InvalidEncoding("invalid UTF-8 in string".to_string()))
    }

    pub fn read_lww_bool(&mut self, index: u8) -> Result<LwwValue<bool>> {
        self.read_lww(index, |r| r.read_bool(2))
    }

    pub fn read_lww_u8(&mut self, index: u8) -> Result<LwwValue<u8>> {
        self.read_lww(index, |r| r.read_u8(2))
    }

    pub fn read_lww_f32(&mut self, index: u8) -> Result<LwwValue<f32>> {
        self.read_lww(index, |r| r.read_f32(2))
    }

    pub fn read_lww_id(&mut self, index: u8) -> Result<LwwValue<CrdtId>> {
        self.read_lww(index, |r| r.read_id(2))
    }

    pub fn read_lww_string(&mut self, index: u8) -> Result<LwwValue<String>> {
        self.read_lww(index, |r| r.read_string(2))
    }

    fn read_lww<T>(
        &mut self,
        index: u8,
        read_value: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<LwwValue<T>> {
        let scope = self.begin_subblock(index)?;
        let timestamp = self.read_id(1)?;
        let value = read_value(self)?;
        self.end_subblock(scope)?;
        Ok(LwwValue::new(timestamp, value))
    }

    /// Read the next top-level block envelope, or `None` at a clean
    /// end of stream. Truncation and a nonzero reserved byte abort the
    /// whole stream.
    pub fn read_block_header(&mut self) -> Result<Option<FramedBlock>> {
        if self.stream.remaining() == 0 {
            return Ok(None);
        }
        let length = self.stream.read_u32()? as usize;
        let reserved = self.stream.read_u8()?;
        if reserved != 0 {
            return Err(LinesError::InvalidEncoding(format!(
                "nonzero reserved byte {reserved:#04x} in block header"
            )));
        }
        let min_version = self.stream.read_u8()?;
        let current_version = self.stream.read_u8()?;
        let block_type = self.stream.read_u8()?;
        if length > self.stream.remaining() {
            return Err(LinesError::EndOfInput);
        }
        let offset = self.stream.tell();
        self.block_end = Some(offset + length);
        Ok(Some(FramedBlock {
            offset,
            length,
            block_type,
            min_version,
            current_version,
        }))
    }

    /// Close the active block with the same position discipline as a
    /// sub-block.
    pub fn end_block(&mut self, frame: &FramedBlock) -> Result<Vec<u8>> {
        self.block_end = None;
        self.scope_ends.clear();
        self.close_scope(frame.offset, frame.length)
    }

    /// Abandon the active block and reposition at an absolute offset.
    /// Used by error recovery to re-read a payload as opaque bytes.
    pub fn rewind_block(&mut self, frame: &FramedBlock) -> Result<Vec<u8>> {
        self.block_end = None;
        self.scope_ends.clear();
        self.stream.seek(frame.offset)?;
        self.stream.read_bytes(frame.length)
    }
}
