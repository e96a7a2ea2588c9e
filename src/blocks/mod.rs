pub mod item;
pub mod meta;
pub mod node;
pub mod text;

pub use self::item::SceneItemBlock;
pub use self::meta::{AuthorIdsBlock, MigrationInfoBlock, PageInfoBlock, SceneInfoBlock};
pub use self::node::{SceneTreeBlock, TreeNodeBlock};
pub use self::text::RootTextBlock;

use crate::error::{LinesError, Result};
use crate::tagged::{FramedBlock, TaggedReader, TaggedWriter};
use log::debug;

/// The fixed 43-byte file header, trailing spaces included.
pub const FILE_HEADER: &[u8; 43] = b"reMarkable .lines file, version=6          ";

/// Highest block `min_version` this reader accepts.
pub const SUPPORTED_VERSION: u8 = 2;

/// A block whose payload could not be decoded: unknown type, version
/// from the future, or a grammar error. The raw payload is kept so the
/// block survives a rewrite and the rest of the stream stays readable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadableBlock {
    pub block_type: u8,
    pub min_version: u8,
    pub current_version: u8,
    pub error: String,
    pub data: Vec<u8>,
}

/// A decoded top-level block.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    AuthorIds(AuthorIdsBlock),
    MigrationInfo(MigrationInfoBlock),
    PageInfo(PageInfoBlock),
    SceneTree(SceneTreeBlock),
    TreeNode(TreeNodeBlock),
    SceneInfo(SceneInfoBlock),
    SceneItem(SceneItemBlock),
    RootText(RootTextBlock),
    Unreadable(UnreadableBlock),
}

impl Block {
    pub fn block_type(&self) -> u8 {
        match self {
            Block::AuthorIds(_) => AuthorIdsBlock::BLOCK_TYPE,
            Block::MigrationInfo(_) => MigrationInfoBlock::BLOCK_TYPE,
            Block::PageInfo(_) => PageInfoBlock::BLOCK_TYPE,
            Block::SceneTree(_) => SceneTreeBlock::BLOCK_TYPE,
            Block::TreeNode(_) => TreeNodeBlock::BLOCK_TYPE,
            Block::SceneInfo(_) => SceneInfoBlock::BLOCK_TYPE,
            Block::SceneItem(block) => block.block_type(),
            Block::RootText(_) => RootTextBlock::BLOCK_TYPE,
            Block::Unreadable(block) => block.block_type,
        }
    }

    /// The (min_version, current_version) pair written for this block.
    /// Only line items vary: their current version selects the point
    /// encoding.
    fn version_pair(&self, options: &WriteOptions) -> (u8, u8) {
        match self {
            Block::SceneItem(block) if block.block_type() == SceneItemBlock::LINE_TYPE => {
                (1, options.line_version)
            }
            Block::Unreadable(block) => (block.min_version, block.current_version),
            _ => (0, 1),
        }
    }

    pub fn write(&self, writer: &mut TaggedWriter, options: &WriteOptions) -> Result<()> {
        let (min_version, current_version) = self.version_pair(options);
        writer.start_block(self.block_type(), min_version, current_version)?;
        match self {
            Block::AuthorIds(block) => block.write(writer)?,
            Block::MigrationInfo(block) => block.write(writer)?,
            Block::PageInfo(block) => block.write(writer)?,
            Block::SceneTree(block) => block.write(writer)?,
            Block::TreeNode(block) => block.write(writer)?,
            Block::SceneInfo(block) => block.write(writer)?,
            Block::SceneItem(block) => block.write(writer, options.line_version)?,
            Block::RootText(block) => block.write(writer)?,
            Block::Unreadable(block) => writer.write_raw(&block.data)?,
        }
        writer.end_block()
    }
}

/// Controls the writer's output encoding.
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    /// Point encoding for line items: 1 or 2.
    pub line_version: u8,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self { line_version: 2 }
    }
}

/// Parse a whole scene file into its block sequence.
///
/// Errors inside one block demote it to `Unreadable` and parsing
/// continues; a bad header, a truncated envelope or a nonzero reserved
/// byte abort the stream.
pub fn read_blocks(data: &[u8]) -> Result<Vec<Block>> {
    let mut reader = TaggedReader::new(data);
    let header = reader
        .stream()
        .read_bytes(FILE_HEADER.len())
        .map_err(|_| LinesError::BadHeader)?;
    if header != FILE_HEADER {
        return Err(LinesError::BadHeader);
    }

    let mut blocks = Vec::new();
    while let Some(frame) = reader.read_block_header()? {
        blocks.push(read_framed_block(&mut reader, &frame)?);
    }
    Ok(blocks)
}

fn read_framed_block(reader: &mut TaggedReader, frame: &FramedBlock) -> Result<Block> {
    if frame.min_version > SUPPORTED_VERSION {
        let error = format!(
            "block requires reader version {} (supported: {SUPPORTED_VERSION})",
            frame.min_version
        );
        return capture_unreadable(reader, frame, error);
    }
    match read_payload(reader, frame) {
        Ok(block) => match reader.end_block(frame) {
            Ok(_extra) => Ok(block),
            Err(error) => capture_unreadable(reader, frame, error.to_string()),
        },
        Err(error) => capture_unreadable(reader, frame, error.to_string()),
    }
}

fn read_payload(reader: &mut TaggedReader, frame: &FramedBlock) -> Result<Block> {
    match frame.block_type {
        MigrationInfoBlock::BLOCK_TYPE => MigrationInfoBlock::read(reader).map(Block::MigrationInfo),
        SceneTreeBlock::BLOCK_TYPE => SceneTreeBlock::read(reader).map(Block::SceneTree),
        TreeNodeBlock::BLOCK_TYPE => TreeNodeBlock::read(reader).map(Block::TreeNode),
        SceneItemBlock::GLYPH_TYPE
        | SceneItemBlock::GROUP_TYPE
        | SceneItemBlock::LINE_TYPE
        | SceneItemBlock::TEXT_TYPE
        | SceneItemBlock::TOMBSTONE_TYPE => {
            SceneItemBlock::read(reader, frame).map(Block::SceneItem)
        }
        RootTextBlock::BLOCK_TYPE => RootTextBlock::read(reader).map(Block::RootText),
        AuthorIdsBlock::BLOCK_TYPE => AuthorIdsBlock::read(reader).map(Block::AuthorIds),
        PageInfoBlock::BLOCK_TYPE => PageInfoBlock::read(reader).map(Block::PageInfo),
        SceneInfoBlock::BLOCK_TYPE => SceneInfoBlock::read(reader).map(Block::SceneInfo),
        other => Err(LinesError::UnexpectedBlock(format!(
            "unknown block type {other:#04x}"
        ))),
    }
}

fn capture_unreadable(
    reader: &mut TaggedReader,
    frame: &FramedBlock,
    error: String,
) -> Result<Block> {
    let data = reader.rewind_block(frame)?;
    debug!(
        "captured block type {:#04x} at offset {} as unreadable: {error}",
        frame.block_type, frame.offset
    );
    Ok(Block::Unreadable(UnreadableBlock {
        block_type: frame.block_type,
        min_version: frame.min_version,
        current_version: frame.current_version,
        error,
        data,
    }))
}

/// Serialise a block sequence, header included.
pub fn write_blocks(blocks: &[Block], options: &WriteOptions) -> Result<Vec<u8>> {
    if !(1..=2).contains(&options.line_version) {
        return Err(LinesError::InvalidEncoding(format!(
            "unsupported line version {}",
            options.line_version
        )));
    }
    let mut writer = TaggedWriter::new();
    writer.write_raw(FILE_HEADER)?;
    for block in blocks {
        block.write(&mut writer, options)?;
    }
    writer.into_bytes()
}
