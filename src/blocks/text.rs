use crate::crdt::{CrdtId, CrdtSequence, CrdtSequenceItem, ItemValue, LwwValue};
use crate::error::{LinesError, Result};
use crate::model::{ParagraphStyle, Text, TextItem};
use crate::tagged::{TaggedReader, TaggedWriter};
use std::collections::BTreeMap;

/// Leading byte of every paragraph-style entry. Purpose unknown;
/// asserted on read and reproduced on write.
const STYLE_ENTRY_MAGIC: u8 = 17;

/// The document's root text: character runs, paragraph styles, and
/// the text-box position and width.
#[derive(Debug, Clone, PartialEq)]
pub struct RootTextBlock {
    pub block_id: CrdtId,
    pub text: Text,
}

impl RootTextBlock {
    pub const BLOCK_TYPE: u8 = 0x07;

    pub fn read(reader: &mut TaggedReader) -> Result<Self> {
        let block_id = reader.read_id(1)?;

        let outer = reader.begin_subblock(2)?;
        let items = read_text_items(reader)?;
        let styles = read_text_styles(reader)?;
        reader.end_subblock(outer)?;

        let scope = reader.begin_subblock(3)?;
        let pos_x = reader.stream().read_f64()?;
        let pos_y = reader.stream().read_f64()?;
        reader.end_subblock(scope)?;

        let width = reader.read_f32(4)?;

        Ok(Self {
            block_id,
            text: Text {
                items,
                styles,
                pos_x,
                pos_y,
                width,
            },
        })
    }

    pub fn write(&self, writer: &mut TaggedWriter) -> Result<()> {
        writer.write_id(1, self.block_id)?;

        let outer = writer.begin_subblock(2)?;
        write_text_items(writer, &self.text.items)?;
        write_text_styles(writer, &self.text.styles)?;
        writer.end_subblock(outer)?;

        let scope = writer.begin_subblock(3)?;
        writer.stream().write_f64(self.text.pos_x)?;
        writer.stream().write_f64(self.text.pos_y)?;
        writer.end_subblock(scope)?;

        writer.write_f32(4, self.text.width)
    }
}

fn read_text_items(reader: &mut TaggedReader) -> Result<CrdtSequence<TextItem>> {
    let outer = reader.begin_subblock(1)?;
    let inner = reader.begin_subblock(1)?;
    let count = reader.stream().read_varuint()?;
    let mut items = CrdtSequence::new();
    for _ in 0..count {
        let scope = reader.begin_subblock(0)?;
        let item_id = reader.read_id(2)?;
        let left_id = reader.read_id(3)?;
        let right_id = reader.read_id(4)?;
        let deleted_length = reader.read_u32(5)?;
        let value = if reader.has_subblock(6) {
            let (text, format) = reader.read_string_with_format(6)?;
            ItemValue::Present(match format {
                Some(code) => TextItem::FormatCode { code, text },
                None => TextItem::Text(text),
            })
        } else {
            ItemValue::Tombstone {
                length: deleted_length,
            }
        };
        items.insert(CrdtSequenceItem {
            item_id,
            left_id,
            right_id,
            value,
        })?;
        reader.end_subblock(scope)?;
    }
    reader.end_subblock(inner)?;
    reader.end_subblock(outer)?;
    Ok(items)
}

fn write_text_items(writer: &mut TaggedWriter, items: &CrdtSequence<TextItem>) -> Result<()> {
    let outer = writer.begin_subblock(1)?;
    let inner = writer.begin_subblock(1)?;
    writer.stream().write_varuint(items.len() as u64)?;
    for item in items.iter() {
        let scope = writer.begin_subblock(0)?;
        writer.write_id(2, item.item_id)?;
        writer.write_id(3, item.left_id)?;
        writer.write_id(4, item.right_id)?;
        writer.write_u32(5, item.value.deleted_length())?;
        match &item.value {
            ItemValue::Present(TextItem::Text(text)) => {
                writer.write_string_with_format(6, text, None)?;
            }
            ItemValue::Present(TextItem::FormatCode { code, text }) => {
                writer.write_string_with_format(6, text, Some(*code))?;
            }
            ItemValue::Tombstone { .. } => {}
        }
        writer.end_subblock(scope)?;
    }
    writer.end_subblock(inner)?;
    writer.end_subblock(outer)
}

fn read_text_styles(
    reader: &mut TaggedReader,
) -> Result<BTreeMap<CrdtId, LwwValue<ParagraphStyle>>> {
    let outer = reader.begin_subblock(2)?;
    let inner = reader.begin_subblock(1)?;
    let count = reader.stream().read_varuint()?;
    let mut styles = BTreeMap::new();
    for _ in 0..count {
        // The style key is a bare id, not a tagged field.
        let key = reader.stream().read_crdt_id()?;
        let timestamp = reader.read_id(1)?;
        let scope = reader.begin_subblock(2)?;
        let magic = reader.stream().read_u8()?;
        if magic != STYLE_ENTRY_MAGIC {
            return Err(LinesError::InvalidEncoding(format!(
                "unexpected style entry marker {magic}"
            )));
        }
        let style = ParagraphStyle::from_u8(reader.stream().read_u8()?)?;
        reader.end_subblock(scope)?;
        styles.insert(key, LwwValue::new(timestamp, style));
    }
    reader.end_subblock(inner)?;
    reader.end_subblock(outer)?;
    Ok(styles)
}

fn write_text_styles(
    writer: &mut TaggedWriter,
    styles: &BTreeMap<CrdtId, LwwValue<ParagraphStyle>>,
) -> Result<()> {
    let outer = writer.begin_subblock(2)?;
    let inner = writer.begin_subblock(1)?;
    writer.stream().write_varuint(styles.len() as u64)?;
    for (key, style) in styles {
        writer.stream().write_crdt_id(*key)?;
        writer.write_id(1, style.timestamp)?;
        let scope = writer.begin_subblock(2)?;
        writer.stream().write_u8(STYLE_ENTRY_MAGIC)?;
        writer.stream().write_u8(style.value.as_u8())?;
        writer.end_subblock(scope)?;
    }
    writer.end_subblock(inner)?;
    writer.end_subblock(outer)
}
