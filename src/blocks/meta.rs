use crate::crdt::{CrdtId, LwwValue};
use crate::error::{LinesError, Result};
use crate::tagged::{TaggedReader, TaggedWriter};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Author table: maps the one-byte author ids used in CRDT ids to the
/// device UUIDs they stand for. UUID bytes are stored in the
/// Microsoft-GUID (little-endian) layout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthorIdsBlock {
    pub authors: BTreeMap<u16, Uuid>,
}

impl AuthorIdsBlock {
    pub const BLOCK_TYPE: u8 = 0x09;

    pub fn read(reader: &mut TaggedReader) -> Result<Self> {
        let count = reader.stream().read_varuint()?;
        let mut authors = BTreeMap::new();
        for _ in 0..count {
            let scope = reader.begin_subblock(0)?;
            let uuid_length = reader.stream().read_varuint()? as usize;
            let uuid_bytes = reader.stream().read_bytes(uuid_length)?;
            let uuid_bytes: [u8; 16] = uuid_bytes.try_into().map_err(|_| {
                LinesError::InvalidEncoding(format!(
                    "author UUID must be 16 bytes, got {uuid_length}"
                ))
            })?;
            let author_id = reader.stream().read_u16()?;
            authors.insert(author_id, Uuid::from_bytes_le(uuid_bytes));
            reader.end_subblock(scope)?;
        }
        Ok(Self { authors })
    }

    pub fn write(&self, writer: &mut TaggedWriter) -> Result<()> {
        writer.stream().write_varuint(self.authors.len() as u64)?;
        for (author_id, uuid) in &self.authors {
            let scope = writer.begin_subblock(0)?;
            let bytes = uuid.to_bytes_le();
            writer.stream().write_varuint(bytes.len() as u64)?;
            writer.stream().write_bytes(&bytes)?;
            writer.stream().write_u16(*author_id)?;
            writer.end_subblock(scope)?;
        }
        Ok(())
    }
}

/// Device-migration marker. The bool at index 3 is undocumented and
/// passed through opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationInfoBlock {
    pub migration_id: CrdtId,
    pub is_device: bool,
    pub unknown: Option<bool>,
}

impl MigrationInfoBlock {
    pub const BLOCK_TYPE: u8 = 0x00;

    pub fn read(reader: &mut TaggedReader) -> Result<Self> {
        Ok(Self {
            migration_id: reader.read_id(1)?,
            is_device: reader.read_bool(2)?,
            unknown: reader.read_bool_opt(3)?,
        })
    }

    pub fn write(&self, writer: &mut TaggedWriter) -> Result<()> {
        writer.write_id(1, self.migration_id)?;
        writer.write_bool(2, self.is_device)?;
        if let Some(unknown) = self.unknown {
            writer.write_bool(3, unknown)?;
        }
        Ok(())
    }
}

/// Page statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageInfoBlock {
    pub loads_count: u32,
    pub merges_count: u32,
    pub text_chars_count: u32,
    pub text_lines_count: u32,
    pub type_folio_use_count: u32,
}

impl PageInfoBlock {
    pub const BLOCK_TYPE: u8 = 0x0A;

    pub fn read(reader: &mut TaggedReader) -> Result<Self> {
        Ok(Self {
            loads_count: reader.read_u32(1)?,
            merges_count: reader.read_u32(2)?,
            text_chars_count: reader.read_u32(3)?,
            text_lines_count: reader.read_u32(4)?,
            type_folio_use_count: reader.read_u32_opt(5)?.unwrap_or(0),
        })
    }

    pub fn write(&self, writer: &mut TaggedWriter) -> Result<()> {
        writer.write_u32(1, self.loads_count)?;
        writer.write_u32(2, self.merges_count)?;
        writer.write_u32(3, self.text_chars_count)?;
        writer.write_u32(4, self.text_lines_count)?;
        writer.write_u32(5, self.type_folio_use_count)
    }
}

/// Document-level registers: the active layer and page options.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneInfoBlock {
    pub current_layer: LwwValue<CrdtId>,
    pub background_visible: Option<LwwValue<bool>>,
    pub root_document_visible: Option<LwwValue<bool>>,
    pub paper_size: Option<(u32, u32)>,
}

impl SceneInfoBlock {
    pub const BLOCK_TYPE: u8 = 0x0D;

    pub fn read(reader: &mut TaggedReader) -> Result<Self> {
        let current_layer = reader.read_lww_id(1)?;
        let background_visible = if reader.has_subblock(2) {
            Some(reader.read_lww_bool(2)?)
        } else {
            None
        };
        let root_document_visible = if reader.has_subblock(3) {
            Some(reader.read_lww_bool(3)?)
        } else {
            None
        };
        let paper_size = if reader.has_subblock(5) {
            let scope = reader.begin_subblock(5)?;
            let size = (reader.stream().read_u32()?, reader.stream().read_u32()?);
            reader.end_subblock(scope)?;
            Some(size)
        } else {
            None
        };
        Ok(Self {
            current_layer,
            background_visible,
            root_document_visible,
            paper_size,
        })
    }

    pub fn write(&self, writer: &mut TaggedWriter) -> Result<()> {
        writer.write_lww_id(1, &self.current_layer)?;
        if let Some(value) = &self.background_visible {
            writer.write_lww_bool(2, value)?;
        }
        if let Some(value) = &self.root_document_visible {
            writer.write_lww_bool(3, value)?;
        }
        if let Some((width, height)) = self.paper_size {
            let scope = writer.begin_subblock(5)?;
            writer.stream().write_u32(width)?;
            writer.stream().write_u32(height)?;
            writer.end_subblock(scope)?;
        }
        Ok(())
    }
}
