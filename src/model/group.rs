use crate::crdt::{CrdtId, CrdtSequence, LwwValue};
use crate::model::line::Line;
use crate::model::text::GlyphRange;

/// One entry in a group's child sequence. Group children are stored as
/// the referenced node's id; the concrete `Group` is materialised by
/// scene-tree lookup, which keeps the tree free of reference cycles.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneItem {
    Line(Line),
    GlyphRange(GlyphRange),
    Group(CrdtId),
    Text,
}

/// A layer or nested group of scene items.
///
/// `label` and `visible` are always present (with zero-timestamp
/// defaults); the four anchor registers travel together and are only
/// present on groups anchored to text.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub node_id: CrdtId,
    pub children: CrdtSequence<SceneItem>,
    pub label: LwwValue<String>,
    pub visible: LwwValue<bool>,
    pub anchor_id: Option<LwwValue<CrdtId>>,
    pub anchor_type: Option<LwwValue<u8>>,
    pub anchor_threshold: Option<LwwValue<f32>>,
    pub anchor_origin_x: Option<LwwValue<f32>>,
}

impl Group {
    pub fn new(node_id: CrdtId) -> Self {
        Self {
            node_id,
            children: CrdtSequence::new(),
            label: LwwValue::unset(String::new()),
            visible: LwwValue::unset(true),
            anchor_id: None,
            anchor_type: None,
            anchor_threshold: None,
            anchor_origin_x: None,
        }
    }
}
