use crate::blocks::{Block, RootTextBlock};
use crate::crdt::{CrdtId, CrdtSequenceItem};
use crate::error::{LinesError, Result};
use crate::model::{Group, SceneItem};
use std::collections::BTreeMap;

/// The scene graph: groups keyed by node id, each holding a CRDT
/// sequence of children, plus the optional root text. Group-typed
/// children reference their node by id; `node` resolves them. The
/// root text keeps its block form so the wire-level block id survives
/// a rewrite.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneTree {
    nodes: BTreeMap<CrdtId, Group>,
    parents: BTreeMap<CrdtId, CrdtId>,
    pub root_text: Option<RootTextBlock>,
}

impl Default for SceneTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneTree {
    pub const ROOT_ID: CrdtId = CrdtId {
        author: 0,
        counter: 1,
    };

    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(Self::ROOT_ID, Group::new(Self::ROOT_ID));
        Self {
            nodes,
            parents: BTreeMap::new(),
            root_text: None,
        }
    }

    /// Rebuild a tree from a decoded block stream in one pass.
    pub fn from_blocks<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> Result<Self> {
        let mut tree = Self::new();
        for block in blocks {
            tree.apply_block(block)?;
        }
        Ok(tree)
    }

    /// Feed one block into the tree. Blocks that carry no scene
    /// structure (author table, page info, ...) are ignored.
    pub fn apply_block(&mut self, block: &Block) -> Result<()> {
        match block {
            Block::SceneTree(b) => self.add_node(b.tree_id, b.parent_id),
            Block::TreeNode(b) => {
                let group = self
                    .nodes
                    .entry(b.node_id)
                    .or_insert_with(|| Group::new(b.node_id));
                b.apply_to(group);
            }
            Block::SceneItem(b) => self.attach_item(b.parent_id, b.item.clone())?,
            Block::RootText(b) => self.root_text = Some(b.clone()),
            _ => {}
        }
        Ok(())
    }

    /// Register a group. Idempotent; a later call updates the parent
    /// edge only.
    pub fn add_node(&mut self, node_id: CrdtId, parent_id: CrdtId) {
        self.nodes
            .entry(node_id)
            .or_insert_with(|| Group::new(node_id));
        if node_id != Self::ROOT_ID {
            self.parents.insert(node_id, parent_id);
        }
    }

    /// Append an item to a group's child sequence.
    pub fn attach_item(
        &mut self,
        parent_id: CrdtId,
        item: CrdtSequenceItem<SceneItem>,
    ) -> Result<()> {
        self.nodes
            .get_mut(&parent_id)
            .ok_or(LinesError::ParentMissing(parent_id))?
            .children
            .insert(item)
    }

    pub fn node(&self, id: CrdtId) -> Option<&Group> {
        self.nodes.get(&id)
    }

    pub fn parent_of(&self, id: CrdtId) -> Option<CrdtId> {
        self.parents.get(&id).copied()
    }

    pub fn root(&self) -> &Group {
        // Present from construction on; nothing removes nodes.
        self.nodes
            .get(&Self::ROOT_ID)
            .expect("root group exists from construction")
    }

    /// All registered groups in id order.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.nodes.values()
    }

    /// Depth-first traversal of the whole scene from the root, in
    /// child-sequence order. Tombstoned children are skipped; a group
    /// reference without a registered node is an error.
    pub fn walk(&self) -> Result<Vec<(CrdtId, &SceneItem)>> {
        let mut items = Vec::new();
        self.walk_group(Self::ROOT_ID, &mut items)?;
        Ok(items)
    }

    fn walk_group<'a>(
        &'a self,
        group_id: CrdtId,
        items: &mut Vec<(CrdtId, &'a SceneItem)>,
    ) -> Result<()> {
        let group = self
            .nodes
            .get(&group_id)
            .ok_or(LinesError::ParentMissing(group_id))?;
        for (id, entry) in group.children.sorted_pairs()? {
            if let Some(value) = entry.value.value() {
                items.push((id, value));
                if let SceneItem::Group(child_id) = value {
                    self.walk_group(*child_id, items)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{SceneItemBlock, SceneTreeBlock, TreeNodeBlock};
    use crate::crdt::LwwValue;
    use crate::model::{Line, Pen, PenColor};

    fn line() -> Line {
        Line {
            color: PenColor::Black,
            tool: Pen::Ballpoint2,
            points: Vec::new(),
            thickness_scale: 1.0,
            starting_length: 0.0,
            move_id: None,
        }
    }

    fn line_item(id: CrdtId) -> CrdtSequenceItem<SceneItem> {
        CrdtSequenceItem::new(
            id,
            CrdtId::END_MARKER,
            CrdtId::END_MARKER,
            SceneItem::Line(line()),
        )
    }

    #[test]
    fn new_tree_has_empty_root() {
        let tree = SceneTree::new();
        assert!(tree.root().children.is_empty());
        assert!(tree.root_text.is_none());
        assert_eq!(tree.walk().unwrap(), vec![]);
    }

    #[test]
    fn attach_to_unknown_parent_fails() {
        let mut tree = SceneTree::new();
        let err = tree
            .attach_item(CrdtId::new(0, 99), line_item(CrdtId::new(1, 1)))
            .unwrap_err();
        assert!(matches!(err, LinesError::ParentMissing(id) if id == CrdtId::new(0, 99)));
    }

    #[test]
    fn add_node_is_idempotent() {
        let mut tree = SceneTree::new();
        tree.add_node(CrdtId::new(0, 2), SceneTree::ROOT_ID);
        tree.attach_item(CrdtId::new(0, 2), line_item(CrdtId::new(1, 1)))
            .unwrap();
        tree.add_node(CrdtId::new(0, 2), SceneTree::ROOT_ID);
        assert_eq!(tree.node(CrdtId::new(0, 2)).unwrap().children.len(), 1);
    }

    #[test]
    fn node_properties_may_arrive_before_the_node() {
        // A TreeNode block for a group the tree has not seen yet
        // creates the group with default children.
        let node = TreeNodeBlock {
            node_id: CrdtId::new(0, 11),
            label: LwwValue::new(CrdtId::new(0, 30), "Layer 1".to_string()),
            visible: LwwValue::new(CrdtId::new(0, 31), false),
            anchor_id: None,
            anchor_type: None,
            anchor_threshold: None,
            anchor_origin_x: None,
        };
        let mut tree = SceneTree::new();
        tree.apply_block(&Block::TreeNode(node)).unwrap();

        let group = tree.node(CrdtId::new(0, 11)).unwrap();
        assert_eq!(group.label.value, "Layer 1");
        assert!(!group.visible.value);
        assert!(group.children.is_empty());

        // The SceneTree block arriving later only adds the parent edge.
        tree.apply_block(&Block::SceneTree(SceneTreeBlock {
            tree_id: CrdtId::new(0, 11),
            node_id: CrdtId::END_MARKER,
            is_update: true,
            parent_id: SceneTree::ROOT_ID,
        }))
        .unwrap();
        assert_eq!(tree.node(CrdtId::new(0, 11)).unwrap().label.value, "Layer 1");
        assert_eq!(tree.parent_of(CrdtId::new(0, 11)), Some(SceneTree::ROOT_ID));
    }

    #[test]
    fn walk_recurses_through_groups_in_sequence_order() {
        let mut tree = SceneTree::new();
        let layer = CrdtId::new(0, 2);
        tree.add_node(layer, SceneTree::ROOT_ID);
        tree.attach_item(
            SceneTree::ROOT_ID,
            CrdtSequenceItem::new(
                CrdtId::new(1, 1),
                CrdtId::END_MARKER,
                CrdtId::END_MARKER,
                SceneItem::Group(layer),
            ),
        )
        .unwrap();
        tree.attach_item(layer, line_item(CrdtId::new(1, 2))).unwrap();
        tree.attach_item(layer, {
            let mut item = line_item(CrdtId::new(1, 3));
            item.left_id = CrdtId::new(1, 2);
            item
        })
        .unwrap();

        let walked = tree.walk().unwrap();
        let ids: Vec<CrdtId> = walked.iter().map(|(id, _)| *id).collect();
        assert_eq!(
            ids,
            vec![CrdtId::new(1, 1), CrdtId::new(1, 2), CrdtId::new(1, 3)]
        );
        assert!(matches!(walked[0].1, SceneItem::Group(id) if *id == layer));
    }

    #[test]
    fn tombstoned_children_are_not_walked() {
        let mut tree = SceneTree::new();
        tree.attach_item(
            SceneTree::ROOT_ID,
            CrdtSequenceItem::tombstone(
                CrdtId::new(1, 5),
                CrdtId::END_MARKER,
                CrdtId::END_MARKER,
                2,
            ),
        )
        .unwrap();
        assert_eq!(tree.walk().unwrap(), vec![]);
    }

    #[test]
    fn scene_item_block_for_missing_parent_is_fatal() {
        let block = Block::SceneItem(SceneItemBlock {
            parent_id: CrdtId::new(0, 77),
            item: line_item(CrdtId::new(1, 1)),
        });
        let mut tree = SceneTree::new();
        assert!(matches!(
            tree.apply_block(&block),
            Err(LinesError::ParentMissing(_))
        ));
    }
}
