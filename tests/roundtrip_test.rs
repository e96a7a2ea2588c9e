use pretty_assertions::assert_eq;
use remlines::blocks::{
    AuthorIdsBlock, MigrationInfoBlock, PageInfoBlock, SceneItemBlock, SceneTreeBlock,
    TreeNodeBlock,
};
use remlines::model::{Line, Pen, PenColor, Point, SceneItem};
use remlines::{
    read_blocks, write_blocks, Block, CrdtId, CrdtSequenceItem, LinesError, LwwValue,
    SceneDocument, WriteOptions, FILE_HEADER,
};
use std::collections::BTreeMap;
use uuid::Uuid;

fn point(x: f32, y: f32, speed: u16, direction: u8, width: u16, pressure: u8) -> Point {
    Point {
        x,
        y,
        speed,
        direction,
        width,
        pressure,
    }
}

/// The block stream of a page holding a single stroke on one layer.
fn single_stroke_blocks() -> Vec<Block> {
    let mut authors = BTreeMap::new();
    authors.insert(
        1u16,
        Uuid::parse_str("00000000-0000-0000-0000-000000000001").unwrap(),
    );
    let layer = CrdtId::new(0, 2);

    vec![
        Block::AuthorIds(AuthorIdsBlock { authors }),
        Block::PageInfo(PageInfoBlock {
            loads_count: 1,
            merges_count: 0,
            text_chars_count: 0,
            text_lines_count: 0,
            type_folio_use_count: 0,
        }),
        Block::SceneTree(SceneTreeBlock {
            tree_id: layer,
            node_id: layer,
            is_update: false,
            parent_id: CrdtId::new(0, 1),
        }),
        Block::TreeNode(TreeNodeBlock {
            node_id: layer,
            label: LwwValue::unset("L1".to_string()),
            visible: LwwValue::unset(true),
            anchor_id: None,
            anchor_type: None,
            anchor_threshold: None,
            anchor_origin_x: None,
        }),
        Block::SceneItem(SceneItemBlock {
            parent_id: CrdtId::new(0, 1),
            item: CrdtSequenceItem::new(
                CrdtId::new(0, 3),
                CrdtId::END_MARKER,
                CrdtId::END_MARKER,
                SceneItem::Group(layer),
            ),
        }),
        Block::SceneItem(SceneItemBlock {
            parent_id: layer,
            item: CrdtSequenceItem::new(
                CrdtId::new(1, 1),
                CrdtId::END_MARKER,
                CrdtId::END_MARKER,
                SceneItem::Line(Line {
                    color: PenColor::Blue,
                    tool: Pen::Fineliner1,
                    points: vec![
                        point(10.0, 20.0, 100, 128, 40, 200),
                        point(11.0, 21.0, 120, 130, 40, 210),
                    ],
                    thickness_scale: 2.0,
                    starting_length: 0.0,
                    move_id: None,
                }),
            ),
        }),
    ]
}

#[test]
fn empty_document_reads_as_empty_stream() {
    let data = write_blocks(&[], &WriteOptions::default()).unwrap();
    assert_eq!(data, FILE_HEADER.to_vec());

    let blocks = read_blocks(&data).unwrap();
    assert_eq!(blocks, vec![]);

    let document = SceneDocument::from_blocks(&blocks).unwrap();
    assert!(document.tree.root().children.is_empty());
    assert!(document.tree.root_text.is_none());
}

#[test]
fn single_stroke_round_trips() {
    let blocks = single_stroke_blocks();
    let data = write_blocks(&blocks, &WriteOptions::default()).unwrap();
    let read_back = read_blocks(&data).unwrap();
    assert_eq!(read_back, blocks);

    let document = SceneDocument::from_blocks(&read_back).unwrap();
    let walked = document.tree.walk().unwrap();
    let lines: Vec<&Line> = walked
        .iter()
        .filter_map(|(_, item)| match item {
            SceneItem::Line(line) => Some(line),
            _ => None,
        })
        .collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].color, PenColor::Blue);
    assert_eq!(lines[0].tool, Pen::Fineliner1);
    assert_eq!(lines[0].thickness_scale, 2.0);
    assert_eq!(lines[0].points[0], point(10.0, 20.0, 100, 128, 40, 200));
    assert_eq!(lines[0].points[1], point(11.0, 21.0, 120, 130, 40, 210));
}

#[test]
fn single_stroke_round_trips_with_v1_points() {
    // Version 1 stores the integer point fields as scaled floats; for
    // values in the nominal ranges the conversion is lossless.
    let blocks = single_stroke_blocks();
    let options = WriteOptions { line_version: 1 };
    let data = write_blocks(&blocks, &options).unwrap();
    assert_eq!(read_blocks(&data).unwrap(), blocks);
}

#[test]
fn trailing_block_slack_is_not_read_as_a_move_id() {
    let blocks = vec![Block::SceneItem(SceneItemBlock {
        parent_id: CrdtId::new(0, 1),
        item: CrdtSequenceItem::new(
            CrdtId::new(1, 1),
            CrdtId::END_MARKER,
            CrdtId::END_MARKER,
            SceneItem::Line(Line {
                color: PenColor::Black,
                tool: Pen::Ballpoint2,
                points: vec![point(1.0, 2.0, 10, 20, 30, 40)],
                thickness_scale: 1.0,
                starting_length: 0.0,
                move_id: None,
            }),
        ),
    })];
    let mut data = write_blocks(&blocks, &WriteOptions::default()).unwrap();

    // Extend the block envelope with slack bytes that would parse as
    // an id:7 field if the reader confused the block's tail with the
    // line's own sub-block payload.
    let slack = [0x7F, 0x00, 0x28, 0x00];
    data.extend_from_slice(&slack);
    let at = FILE_HEADER.len();
    let length = u32::from_le_bytes(data[at..at + 4].try_into().unwrap());
    data[at..at + 4].copy_from_slice(&(length + slack.len() as u32).to_le_bytes());

    assert_eq!(read_blocks(&data).unwrap(), blocks);
}

#[test]
fn metadata_blocks_round_trip() {
    let blocks = vec![
        Block::AuthorIds(AuthorIdsBlock::default()),
        Block::MigrationInfo(MigrationInfoBlock {
            migration_id: CrdtId::new(1, 1),
            is_device: true,
            unknown: Some(false),
        }),
        Block::PageInfo(PageInfoBlock {
            loads_count: 3,
            merges_count: 1,
            text_chars_count: 120,
            text_lines_count: 8,
            type_folio_use_count: 2,
        }),
    ];
    let data = write_blocks(&blocks, &WriteOptions::default()).unwrap();
    assert_eq!(read_blocks(&data).unwrap(), blocks);
}

#[test]
fn unknown_block_survives_a_rewrite() {
    let mut data = FILE_HEADER.to_vec();
    // One block of unknown type 0xFE with a four byte payload,
    // followed by a readable page info block.
    data.extend_from_slice(&4u32.to_le_bytes());
    data.extend_from_slice(&[0, 0, 1, 0xFE]);
    data.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
    let tail = write_blocks(
        &[Block::PageInfo(PageInfoBlock::default())],
        &WriteOptions::default(),
    )
    .unwrap();
    data.extend_from_slice(&tail[FILE_HEADER.len()..]);

    let blocks = read_blocks(&data).unwrap();
    assert_eq!(blocks.len(), 2);
    match &blocks[0] {
        Block::Unreadable(unreadable) => {
            assert_eq!(unreadable.block_type, 0xFE);
            assert_eq!(unreadable.data, vec![0xDE, 0xAD, 0xBE, 0xEF]);
        }
        other => panic!("expected an unreadable block, got {other:?}"),
    }
    assert!(matches!(blocks[1], Block::PageInfo(_)));

    // Rewriting emits the captured bytes verbatim.
    let rewritten = write_blocks(&blocks, &WriteOptions::default()).unwrap();
    assert_eq!(read_blocks(&rewritten).unwrap(), blocks);
}

#[test]
fn malformed_payload_is_captured_not_fatal() {
    let mut data = FILE_HEADER.to_vec();
    // A page info block whose payload is garbage for its grammar.
    data.extend_from_slice(&2u32.to_le_bytes());
    data.extend_from_slice(&[0, 0, 1, 0x0A]);
    data.extend_from_slice(&[0xFF, 0xFF]);
    let tail = write_blocks(
        &[Block::MigrationInfo(MigrationInfoBlock {
            migration_id: CrdtId::new(0, 1),
            is_device: false,
            unknown: None,
        })],
        &WriteOptions::default(),
    )
    .unwrap();
    data.extend_from_slice(&tail[FILE_HEADER.len()..]);

    let blocks = read_blocks(&data).unwrap();
    assert_eq!(blocks.len(), 2);
    match &blocks[0] {
        Block::Unreadable(unreadable) => {
            assert_eq!(unreadable.block_type, 0x0A);
            assert_eq!(unreadable.data, vec![0xFF, 0xFF]);
        }
        other => panic!("expected an unreadable block, got {other:?}"),
    }
    assert!(matches!(blocks[1], Block::MigrationInfo(_)));
}

#[test]
fn future_min_version_is_captured_not_fatal() {
    let mut data = FILE_HEADER.to_vec();
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend_from_slice(&[0, 9, 9, 0x0A]);
    data.push(0x00);

    let blocks = read_blocks(&data).unwrap();
    match &blocks[0] {
        Block::Unreadable(unreadable) => {
            assert_eq!(unreadable.min_version, 9);
            assert_eq!(unreadable.data, vec![0x00]);
        }
        other => panic!("expected an unreadable block, got {other:?}"),
    }
}

#[test]
fn corrupt_header_is_rejected() {
    let mut data = FILE_HEADER.to_vec();
    data[0] = b'x';
    assert!(matches!(read_blocks(&data), Err(LinesError::BadHeader)));

    // Truncated header.
    assert!(matches!(
        read_blocks(&FILE_HEADER[..20]),
        Err(LinesError::BadHeader)
    ));
}

#[test]
fn truncated_envelope_aborts_the_stream() {
    let mut data = FILE_HEADER.to_vec();
    // Declares 100 payload bytes but provides none.
    data.extend_from_slice(&100u32.to_le_bytes());
    data.extend_from_slice(&[0, 0, 1, 0x0A]);
    assert!(matches!(read_blocks(&data), Err(LinesError::EndOfInput)));
}
