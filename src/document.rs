use crate::blocks::{
    read_blocks, write_blocks, AuthorIdsBlock, Block, MigrationInfoBlock, PageInfoBlock,
    SceneInfoBlock, SceneItemBlock, SceneTreeBlock, TreeNodeBlock, UnreadableBlock, WriteOptions,
};
use crate::crdt::CrdtId;
use crate::error::{LinesError, Result};
use crate::model::SceneItem;
use crate::tree::SceneTree;
use std::collections::BTreeMap;
use uuid::Uuid;

/// A whole scene file: the metadata blocks plus the scene tree.
///
/// Reading collects every block into its slot; writing emits blocks in
/// dependency order (author table, migration, page info, scene info,
/// then the tree groups in pre-order with their item blocks, then the
/// root text). Any unreadable blocks are carried verbatim and
/// re-emitted after the readable content.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneDocument {
    pub authors: BTreeMap<u16, Uuid>,
    pub migration: Option<MigrationInfoBlock>,
    pub page_info: Option<PageInfoBlock>,
    pub scene_info: Option<SceneInfoBlock>,
    pub tree: SceneTree,
    pub unreadable: Vec<UnreadableBlock>,
}

impl SceneDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_blocks(&read_blocks(data)?)
    }

    pub fn from_blocks(blocks: &[Block]) -> Result<Self> {
        let mut document = Self::new();
        for block in blocks {
            match block {
                Block::AuthorIds(b) => document.authors = b.authors.clone(),
                Block::MigrationInfo(b) => document.migration = Some(*b),
                Block::PageInfo(b) => document.page_info = Some(*b),
                Block::SceneInfo(b) => document.scene_info = Some(b.clone()),
                Block::Unreadable(b) => document.unreadable.push(b.clone()),
                other => document.tree.apply_block(other)?,
            }
        }
        Ok(document)
    }

    /// Emit the document as a block sequence in writer order. The
    /// author table is always present, even when empty.
    pub fn to_blocks(&self) -> Result<Vec<Block>> {
        let mut blocks = vec![Block::AuthorIds(AuthorIdsBlock {
            authors: self.authors.clone(),
        })];
        if let Some(migration) = self.migration {
            blocks.push(Block::MigrationInfo(migration));
        }
        if let Some(page_info) = self.page_info {
            blocks.push(Block::PageInfo(page_info));
        }
        if let Some(scene_info) = &self.scene_info {
            blocks.push(Block::SceneInfo(scene_info.clone()));
        }

        self.emit_group(SceneTree::ROOT_ID, None, &mut blocks)?;

        if let Some(root_text) = &self.tree.root_text {
            blocks.push(Block::RootText(root_text.clone()));
        }
        for unreadable in &self.unreadable {
            blocks.push(Block::Unreadable(unreadable.clone()));
        }
        Ok(blocks)
    }

    fn emit_group(
        &self,
        group_id: CrdtId,
        parent_id: Option<CrdtId>,
        blocks: &mut Vec<Block>,
    ) -> Result<()> {
        let group = self
            .tree
            .node(group_id)
            .ok_or(LinesError::ParentMissing(group_id))?;

        if let Some(parent_id) = parent_id {
            blocks.push(Block::SceneTree(SceneTreeBlock {
                tree_id: group_id,
                node_id: CrdtId::END_MARKER,
                is_update: true,
                parent_id,
            }));
        }
        blocks.push(Block::TreeNode(TreeNodeBlock::from_group(group)));

        let items = group.children.sorted_items()?;
        for item in &items {
            blocks.push(Block::SceneItem(SceneItemBlock {
                parent_id: group_id,
                item: (*item).clone(),
            }));
        }
        // Child groups follow their parent's item blocks, so a group
        // reference is always resolvable once the whole stream is read.
        for item in &items {
            if let Some(SceneItem::Group(child_id)) = item.value.value() {
                self.emit_group(*child_id, Some(group_id), blocks)?;
            }
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_bytes_with(&WriteOptions::default())
    }

    pub fn to_bytes_with(&self, options: &WriteOptions) -> Result<Vec<u8>> {
        write_blocks(&self.to_blocks()?, options)
    }
}
