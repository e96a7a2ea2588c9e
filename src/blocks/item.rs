use crate::crdt::{CrdtId, CrdtSequenceItem, ItemValue};
use crate::error::{LinesError, Result};
use crate::model::{GlyphRange, Line, Pen, PenColor, Point, Rectangle, SceneItem};
use crate::tagged::{FramedBlock, TaggedReader, TaggedWriter};

/// Timestamp written into every line item; the field is dead on read.
const LINE_TIMESTAMP: CrdtId = CrdtId {
    author: 0,
    counter: 1,
};

/// One entry of a group's child sequence, addressed to its parent.
/// Covers the glyph (0x03), group (0x04), line (0x05), text (0x06)
/// and tombstone (0x08) block types; which one is derived from the
/// item's value.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneItemBlock {
    pub parent_id: CrdtId,
    pub item: CrdtSequenceItem<SceneItem>,
}

impl SceneItemBlock {
    pub const GLYPH_TYPE: u8 = 0x03;
    pub const GROUP_TYPE: u8 = 0x04;
    pub const LINE_TYPE: u8 = 0x05;
    pub const TEXT_TYPE: u8 = 0x06;
    pub const TOMBSTONE_TYPE: u8 = 0x08;

    pub fn block_type(&self) -> u8 {
        match &self.item.value {
            ItemValue::Present(SceneItem::GlyphRange(_)) => Self::GLYPH_TYPE,
            ItemValue::Present(SceneItem::Group(_)) => Self::GROUP_TYPE,
            ItemValue::Present(SceneItem::Line(_)) => Self::LINE_TYPE,
            ItemValue::Present(SceneItem::Text) => Self::TEXT_TYPE,
            ItemValue::Tombstone { .. } => Self::TOMBSTONE_TYPE,
        }
    }

    pub fn read(reader: &mut TaggedReader, frame: &FramedBlock) -> Result<Self> {
        let parent_id = reader.read_id(1)?;
        let item_id = reader.read_id(2)?;
        let left_id = reader.read_id(3)?;
        let right_id = reader.read_id(4)?;
        let deleted_length = reader.read_u32(5)?;

        let value = if reader.has_subblock(6) {
            let scope = reader.begin_subblock(6)?;
            let discriminator = reader.stream().read_u8()?;
            if discriminator != frame.block_type {
                return Err(LinesError::InvalidEncoding(format!(
                    "scene item discriminator {discriminator:#04x} does not match \
                     block type {:#04x}",
                    frame.block_type
                )));
            }
            let value = match frame.block_type {
                Self::GLYPH_TYPE => {
                    ItemValue::Present(SceneItem::GlyphRange(read_glyph_range(reader)?))
                }
                Self::GROUP_TYPE => ItemValue::Present(SceneItem::Group(reader.read_id(2)?)),
                Self::LINE_TYPE => ItemValue::Present(SceneItem::Line(read_line(
                    reader,
                    frame.current_version,
                )?)),
                Self::TEXT_TYPE => ItemValue::Present(SceneItem::Text),
                Self::TOMBSTONE_TYPE => ItemValue::Tombstone {
                    length: deleted_length,
                },
                other => {
                    return Err(LinesError::UnexpectedBlock(format!(
                        "not a scene item block type: {other:#04x}"
                    )))
                }
            };
            reader.end_subblock(scope)?;
            value
        } else {
            ItemValue::Tombstone {
                length: deleted_length,
            }
        };

        Ok(Self {
            parent_id,
            item: CrdtSequenceItem {
                item_id,
                left_id,
                right_id,
                value,
            },
        })
    }

    pub fn write(&self, writer: &mut TaggedWriter, line_version: u8) -> Result<()> {
        writer.write_id(1, self.parent_id)?;
        writer.write_id(2, self.item.item_id)?;
        writer.write_id(3, self.item.left_id)?;
        writer.write_id(4, self.item.right_id)?;
        writer.write_u32(5, self.item.value.deleted_length())?;
        if let ItemValue::Present(value) = &self.item.value {
            let scope = writer.begin_subblock(6)?;
            writer.stream().write_u8(self.block_type())?;
            match value {
                SceneItem::GlyphRange(glyph) => write_glyph_range(writer, glyph)?,
                SceneItem::Group(child_id) => writer.write_id(2, *child_id)?,
                SceneItem::Line(line) => write_line(writer, line, line_version)?,
                SceneItem::Text => {}
            }
            writer.end_subblock(scope)?;
        }
        Ok(())
    }
}

fn read_line(reader: &mut TaggedReader, version: u8) -> Result<Line> {
    let tool = Pen::from_u32(reader.read_u32(1)?)?;
    let color = PenColor::from_u32(reader.read_u32(2)?)?;
    let thickness_scale = reader.read_f64(3)?;
    let starting_length = reader.read_f32(4)?;

    let scope = reader.begin_subblock(5)?;
    let point_size = Point::serialized_size(version)?;
    if scope.length % point_size != 0 {
        return Err(LinesError::InvalidEncoding(format!(
            "point data length {} is not a multiple of the point size {point_size}",
            scope.length
        )));
    }
    let count = scope.length / point_size;
    let mut points = Vec::with_capacity(count);
    for _ in 0..count {
        points.push(Point::read(reader.stream(), version)?);
    }
    reader.end_subblock(scope)?;

    let _timestamp = reader.read_id(6)?;
    // The optional move id belongs to the line's own sub-block; bytes
    // past its end are the enclosing block's slack, not ours.
    let move_id = if reader.remaining_in_scope() >= 3 {
        reader.read_id_opt(7)?
    } else {
        None
    };

    Ok(Line {
        color,
        tool,
        points,
        thickness_scale,
        starting_length,
        move_id,
    })
}

fn write_line(writer: &mut TaggedWriter, line: &Line, version: u8) -> Result<()> {
    writer.write_u32(1, line.tool.as_u32())?;
    writer.write_u32(2, line.color.as_u32())?;
    writer.write_f64(3, line.thickness_scale)?;
    writer.write_f32(4, line.starting_length)?;

    let scope = writer.begin_subblock(5)?;
    for point in &line.points {
        point.write(writer.stream(), version)?;
    }
    writer.end_subblock(scope)?;

    writer.write_id(6, LINE_TIMESTAMP)?;
    if let Some(move_id) = line.move_id {
        writer.write_id(7, move_id)?;
    }
    Ok(())
}

fn read_glyph_range(reader: &mut TaggedReader) -> Result<GlyphRange> {
    let start = reader.read_u32_opt(2)?;
    let explicit_length = match start {
        Some(_) => Some(reader.read_u32(3)?),
        None => None,
    };
    let color = PenColor::from_u32(reader.read_u32(4)?)?;
    let text = reader.read_string(5)?;

    let scope = reader.begin_subblock(6)?;
    let count = reader.stream().read_varuint()?;
    let mut rectangles = Vec::with_capacity(count as usize);
    for _ in 0..count {
        rectangles.push(Rectangle {
            x: reader.stream().read_f64()?,
            y: reader.stream().read_f64()?,
            w: reader.stream().read_f64()?,
            h: reader.stream().read_f64()?,
        });
    }
    reader.end_subblock(scope)?;

    let length = match explicit_length {
        Some(length) => length as i32,
        None => text.chars().count() as i32,
    };
    Ok(GlyphRange {
        start: start.map(|v| v as i32),
        length,
        text,
        color,
        rectangles,
    })
}

fn write_glyph_range(writer: &mut TaggedWriter, glyph: &GlyphRange) -> Result<()> {
    if let Some(start) = glyph.start {
        writer.write_u32(2, start as u32)?;
        writer.write_u32(3, glyph.length as u32)?;
    }
    writer.write_u32(4, glyph.color.as_u32())?;
    writer.write_string(5, &glyph.text)?;

    let scope = writer.begin_subblock(6)?;
    writer.stream().write_varuint(glyph.rectangles.len() as u64)?;
    for rect in &glyph.rectangles {
        writer.stream().write_f64(rect.x)?;
        writer.stream().write_f64(rect.y)?;
        writer.stream().write_f64(rect.w)?;
        writer.stream().write_f64(rect.h)?;
    }
    writer.end_subblock(scope)
}
