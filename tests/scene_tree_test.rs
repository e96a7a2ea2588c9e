use pretty_assertions::assert_eq;
use remlines::blocks::{MigrationInfoBlock, PageInfoBlock, SceneInfoBlock};
use remlines::model::{GlyphRange, Line, Pen, PenColor, Point, Rectangle, SceneItem};
use remlines::{CrdtId, CrdtSequenceItem, LwwValue, SceneDocument, SceneTree, WriteOptions};
use uuid::Uuid;

fn stroke(points: Vec<Point>) -> Line {
    Line {
        color: PenColor::Black,
        tool: Pen::Pencil2,
        points,
        thickness_scale: 1.0,
        starting_length: 0.0,
        move_id: Some(CrdtId::new(0, 40)),
    }
}

fn sample_point() -> Point {
    Point {
        x: -3.5,
        y: 12.25,
        speed: 80,
        direction: 64,
        width: 44,
        pressure: 190,
    }
}

/// A document with two layers, a nested group, a highlight, and a
/// deleted run.
fn sample_document() -> SceneDocument {
    let mut document = SceneDocument::new();
    document.authors.insert(
        1,
        Uuid::parse_str("12345678-1234-5678-1234-567812345678").unwrap(),
    );
    document.migration = Some(MigrationInfoBlock {
        migration_id: CrdtId::new(0, 42),
        is_device: true,
        unknown: None,
    });
    document.page_info = Some(PageInfoBlock {
        loads_count: 5,
        merges_count: 1,
        text_chars_count: 0,
        text_lines_count: 0,
        type_folio_use_count: 0,
    });
    document.scene_info = Some(SceneInfoBlock {
        current_layer: LwwValue::new(CrdtId::new(0, 50), CrdtId::new(0, 11)),
        background_visible: Some(LwwValue::new(CrdtId::new(0, 51), true)),
        root_document_visible: None,
        paper_size: Some((1404, 1872)),
    });

    let root = SceneTree::ROOT_ID;
    let layer1 = CrdtId::new(0, 11);
    let layer2 = CrdtId::new(0, 12);
    let nested = CrdtId::new(0, 13);

    let tree = &mut document.tree;
    tree.add_node(layer1, root);
    tree.add_node(layer2, root);
    tree.add_node(nested, layer1);

    tree.attach_item(
        root,
        CrdtSequenceItem::new(
            CrdtId::new(0, 21),
            CrdtId::END_MARKER,
            CrdtId::END_MARKER,
            SceneItem::Group(layer1),
        ),
    )
    .unwrap();
    tree.attach_item(
        root,
        CrdtSequenceItem::new(
            CrdtId::new(0, 22),
            CrdtId::new(0, 21),
            CrdtId::END_MARKER,
            SceneItem::Group(layer2),
        ),
    )
    .unwrap();

    tree.attach_item(
        layer1,
        CrdtSequenceItem::new(
            CrdtId::new(1, 1),
            CrdtId::END_MARKER,
            CrdtId::END_MARKER,
            SceneItem::Line(stroke(vec![sample_point()])),
        ),
    )
    .unwrap();
    tree.attach_item(
        layer1,
        CrdtSequenceItem::new(
            CrdtId::new(1, 2),
            CrdtId::new(1, 1),
            CrdtId::END_MARKER,
            SceneItem::Group(nested),
        ),
    )
    .unwrap();
    // A deleted run of three items.
    tree.attach_item(
        layer1,
        CrdtSequenceItem::tombstone(
            CrdtId::new(1, 3),
            CrdtId::new(1, 2),
            CrdtId::END_MARKER,
            3,
        ),
    )
    .unwrap();

    tree.attach_item(
        nested,
        CrdtSequenceItem::new(
            CrdtId::new(1, 10),
            CrdtId::END_MARKER,
            CrdtId::END_MARKER,
            SceneItem::GlyphRange(GlyphRange {
                start: Some(12),
                length: 5,
                text: "hello".to_string(),
                color: PenColor::Highlight,
                rectangles: vec![Rectangle {
                    x: 10.0,
                    y: 20.0,
                    w: 80.0,
                    h: 14.5,
                }],
            }),
        ),
    )
    .unwrap();

    // layer2 stays empty on purpose: its TreeNode block must still be
    // written.
    let mut layer2_group = tree.node(layer2).unwrap().clone();
    layer2_group.label = LwwValue::new(CrdtId::new(0, 60), "Layer 2".to_string());
    layer2_group.anchor_id = Some(LwwValue::new(CrdtId::new(0, 61), CrdtId::new(1, 100)));
    layer2_group.anchor_type = Some(LwwValue::new(CrdtId::new(0, 61), 2));
    layer2_group.anchor_threshold = Some(LwwValue::new(CrdtId::new(0, 61), 0.5));
    layer2_group.anchor_origin_x = Some(LwwValue::new(CrdtId::new(0, 61), -100.25));
    let node_block = remlines::blocks::TreeNodeBlock::from_group(&layer2_group);
    tree.apply_block(&remlines::Block::TreeNode(node_block)).unwrap();

    document
}

#[test]
fn document_round_trips_through_bytes() {
    let document = sample_document();
    let data = document.to_bytes().unwrap();
    let read_back = SceneDocument::from_bytes(&data).unwrap();
    assert_eq!(read_back, document);
}

#[test]
fn document_round_trips_with_v1_points() {
    let document = sample_document();
    let data = document
        .to_bytes_with(&WriteOptions { line_version: 1 })
        .unwrap();
    assert_eq!(SceneDocument::from_bytes(&data).unwrap(), document);
}

#[test]
fn empty_group_still_gets_a_tree_node_block() {
    let document = sample_document();
    let blocks = document.to_blocks().unwrap();
    let node_blocks: Vec<CrdtId> = blocks
        .iter()
        .filter_map(|b| match b {
            remlines::Block::TreeNode(node) => Some(node.node_id),
            _ => None,
        })
        .collect();
    assert!(node_blocks.contains(&CrdtId::new(0, 12)));
}

#[test]
fn group_blocks_precede_their_subtree() {
    // Writer convention: each group's declaration comes before the
    // blocks of the groups nested beneath it.
    let document = sample_document();
    let blocks = document.to_blocks().unwrap();

    let position = |id: CrdtId| {
        blocks
            .iter()
            .position(|b| matches!(b, remlines::Block::SceneTree(t) if t.tree_id == id))
            .unwrap()
    };
    assert!(position(CrdtId::new(0, 11)) < position(CrdtId::new(0, 13)));
    assert!(position(CrdtId::new(0, 13)) < position(CrdtId::new(0, 12)));
}

#[test]
fn walk_visits_nested_items_in_order() {
    let document = sample_document();
    let walked = document.tree.walk().unwrap();
    let ids: Vec<CrdtId> = walked.iter().map(|(id, _)| *id).collect();
    assert_eq!(
        ids,
        vec![
            CrdtId::new(0, 21), // layer 1
            CrdtId::new(1, 1),  // its stroke
            CrdtId::new(1, 2),  // nested group
            CrdtId::new(1, 10), // highlight inside the nested group
            CrdtId::new(0, 22), // layer 2
        ]
    );
}

#[test]
fn glyph_length_defaults_to_text_length() {
    let mut document = SceneDocument::new();
    document
        .tree
        .attach_item(
            SceneTree::ROOT_ID,
            CrdtSequenceItem::new(
                CrdtId::new(1, 1),
                CrdtId::END_MARKER,
                CrdtId::END_MARKER,
                SceneItem::GlyphRange(GlyphRange {
                    start: None,
                    length: 2,
                    text: "hi".to_string(),
                    color: PenColor::Yellow,
                    rectangles: vec![],
                }),
            ),
        )
        .unwrap();

    let data = document.to_bytes().unwrap();
    let read_back = SceneDocument::from_bytes(&data).unwrap();
    assert_eq!(read_back, document);
}
