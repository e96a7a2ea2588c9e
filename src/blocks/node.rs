use crate::crdt::{CrdtId, LwwValue};
use crate::error::{LinesError, Result};
use crate::model::Group;
use crate::tagged::{TaggedReader, TaggedWriter};

/// Declares a group node and its parent edge in the scene tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneTreeBlock {
    pub tree_id: CrdtId,
    pub node_id: CrdtId,
    pub is_update: bool,
    pub parent_id: CrdtId,
}

impl SceneTreeBlock {
    pub const BLOCK_TYPE: u8 = 0x01;

    pub fn read(reader: &mut TaggedReader) -> Result<Self> {
        let tree_id = reader.read_id(1)?;
        let node_id = reader.read_id(2)?;
        let is_update = reader.read_bool(3)?;
        let scope = reader.begin_subblock(4)?;
        let parent_id = reader.read_id(1)?;
        reader.end_subblock(scope)?;
        Ok(Self {
            tree_id,
            node_id,
            is_update,
            parent_id,
        })
    }

    pub fn write(&self, writer: &mut TaggedWriter) -> Result<()> {
        writer.write_id(1, self.tree_id)?;
        writer.write_id(2, self.node_id)?;
        writer.write_bool(3, self.is_update)?;
        let scope = writer.begin_subblock(4)?;
        writer.write_id(1, self.parent_id)?;
        writer.end_subblock(scope)
    }
}

/// Carries a group's LWW registers. The four anchor registers travel
/// together; their presence is detected from leftover block bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNodeBlock {
    pub node_id: CrdtId,
    pub label: LwwValue<String>,
    pub visible: LwwValue<bool>,
    pub anchor_id: Option<LwwValue<CrdtId>>,
    pub anchor_type: Option<LwwValue<u8>>,
    pub anchor_threshold: Option<LwwValue<f32>>,
    pub anchor_origin_x: Option<LwwValue<f32>>,
}

impl TreeNodeBlock {
    pub const BLOCK_TYPE: u8 = 0x02;

    pub fn read(reader: &mut TaggedReader) -> Result<Self> {
        let node_id = reader.read_id(1)?;
        let label = reader.read_lww_string(2)?;
        let visible = reader.read_lww_bool(3)?;
        let (anchor_id, anchor_type, anchor_threshold, anchor_origin_x) =
            if reader.remaining_in_block() > 0 {
                (
                    Some(reader.read_lww_id(7)?),
                    Some(reader.read_lww_u8(8)?),
                    Some(reader.read_lww_f32(9)?),
                    Some(reader.read_lww_f32(10)?),
                )
            } else {
                (None, None, None, None)
            };
        Ok(Self {
            node_id,
            label,
            visible,
            anchor_id,
            anchor_type,
            anchor_threshold,
            anchor_origin_x,
        })
    }

    pub fn write(&self, writer: &mut TaggedWriter) -> Result<()> {
        writer.write_id(1, self.node_id)?;
        writer.write_lww_string(2, &self.label)?;
        writer.write_lww_bool(3, &self.visible)?;
        match (
            &self.anchor_id,
            &self.anchor_type,
            &self.anchor_threshold,
            &self.anchor_origin_x,
        ) {
            (Some(id), Some(kind), Some(threshold), Some(origin_x)) => {
                writer.write_lww_id(7, id)?;
                writer.write_lww_u8(8, kind)?;
                writer.write_lww_f32(9, threshold)?;
                writer.write_lww_f32(10, origin_x)?;
            }
            (None, None, None, None) => {}
            _ => {
                return Err(LinesError::InvalidEncoding(
                    "anchor registers must be set together".to_string(),
                ))
            }
        }
        Ok(())
    }

    pub fn from_group(group: &Group) -> Self {
        Self {
            node_id: group.node_id,
            label: group.label.clone(),
            visible: group.visible,
            anchor_id: group.anchor_id,
            anchor_type: group.anchor_type,
            anchor_threshold: group.anchor_threshold,
            anchor_origin_x: group.anchor_origin_x,
        }
    }

    /// Copy the registers onto an existing group, leaving its children
    /// untouched.
    pub fn apply_to(&self, group: &mut Group) {
        group.label = self.label.clone();
        group.visible = self.visible;
        group.anchor_id = self.anchor_id;
        group.anchor_type = self.anchor_type;
        group.anchor_threshold = self.anchor_threshold;
        group.anchor_origin_x = self.anchor_origin_x;
    }
}
