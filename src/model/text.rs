use crate::crdt::{CrdtId, CrdtSequence, CrdtSequenceItem, ItemValue, LwwValue};
use crate::error::{LinesError, Result};
use crate::model::line::PenColor;
use serde::Serialize;
use std::collections::BTreeMap;

/// Paragraph formatting codes. Wire-visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum ParagraphStyle {
    Basic = 0,
    Plain = 1,
    Heading = 2,
    Bold = 3,
    Bullet = 4,
    Bullet2 = 5,
    Checkbox = 6,
    CheckboxChecked = 7,
}

impl ParagraphStyle {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Basic),
            1 => Ok(Self::Plain),
            2 => Ok(Self::Heading),
            3 => Ok(Self::Bold),
            4 => Ok(Self::Bullet),
            5 => Ok(Self::Bullet2),
            6 => Ok(Self::Checkbox),
            7 => Ok(Self::CheckboxChecked),
            other => Err(LinesError::InvalidEncoding(format!(
                "unknown paragraph style {other}"
            ))),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rectangle {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// A highlighted span of typed or recognised text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlyphRange {
    pub start: Option<i32>,
    pub length: i32,
    pub text: String,
    pub color: PenColor,
    pub rectangles: Vec<Rectangle>,
}

/// Value of one text-sequence entry: a run of characters, or a
/// paragraph format code. The wire permits a format code to ride along
/// with string bytes; both are kept so a rewrite is lossless, and the
/// code dominates as the logical value.
#[derive(Debug, Clone, PartialEq)]
pub enum TextItem {
    Text(String),
    FormatCode { code: u32, text: String },
}

impl TextItem {
    pub fn text(&self) -> &str {
        match self {
            TextItem::Text(s) => s,
            TextItem::FormatCode { text, .. } => text,
        }
    }

    pub fn format_code(&self) -> Option<u32> {
        match self {
            TextItem::Text(_) => None,
            TextItem::FormatCode { code, .. } => Some(*code),
        }
    }
}

/// The root text of a document: a CRDT sequence of character runs plus
/// the paragraph styles, keyed by the id of the character each break
/// sits in front of (or the end-marker for the trailing paragraph).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Text {
    pub items: CrdtSequence<TextItem>,
    pub styles: BTreeMap<CrdtId, LwwValue<ParagraphStyle>>,
    pub pos_x: f64,
    pub pos_y: f64,
    pub width: f32,
}

impl Text {
    /// Entries in canonical order with every multi-character run split
    /// into single characters and every tombstone run split into unit
    /// tombstones, each with its own sequential id. This is the form
    /// character indexing and style resolution work on.
    pub fn expanded_items(&self) -> Result<Vec<CrdtSequenceItem<TextItem>>> {
        let mut out = Vec::new();
        for item in self.items.sorted_items()? {
            expand_item(item, &mut out);
        }
        Ok(out)
    }
}

fn expand_item(item: &CrdtSequenceItem<TextItem>, out: &mut Vec<CrdtSequenceItem<TextItem>>) {
    let count = match &item.value {
        ItemValue::Present(TextItem::FormatCode { .. }) => {
            out.push(item.clone());
            return;
        }
        ItemValue::Present(TextItem::Text(s)) => s.chars().count(),
        ItemValue::Tombstone { length } => *length as usize,
    };
    if count <= 1 {
        out.push(item.clone());
        return;
    }

    let mut chars = match &item.value {
        ItemValue::Present(TextItem::Text(s)) => s.chars().map(Some).collect::<Vec<_>>(),
        _ => vec![None; count],
    }
    .into_iter();

    let mut item_id = item.item_id;
    let mut left_id = item.left_id;
    for index in 0..count {
        let next_id = CrdtId::new(item_id.author, item_id.counter + 1);
        let right_id = if index == count - 1 {
            item.right_id
        } else {
            next_id
        };
        let value = match chars.next().flatten() {
            Some(c) => ItemValue::Present(TextItem::Text(c.to_string())),
            None => ItemValue::Tombstone { length: 1 },
        };
        out.push(CrdtSequenceItem {
            item_id,
            left_id,
            right_id,
            value,
        });
        left_id = item_id;
        item_id = next_id;
    }
}
