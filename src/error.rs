use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinesError {
    #[error("Invalid .lines file header")]
    BadHeader,

    #[error("Unexpected end of input")]
    EndOfInput,

    #[error("Unexpected tag: expected index {expected_index} type {expected_type:#x}, found index {found_index} type {found_type:#x}")]
    UnexpectedTag {
        expected_index: u8,
        expected_type: u8,
        found_index: u8,
        found_type: u8,
    },

    #[error("Read past the end of a {length}-byte scope starting at {offset}")]
    BlockOverflow { offset: usize, length: usize },

    #[error("Unexpected block: {0}")]
    UnexpectedBlock(String),

    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("CRDT sequence order contains a cycle")]
    CyclicOrder,

    #[error("Unknown pen tool id: {0}")]
    UnknownPen(u32),

    #[error("Unknown pen color id: {0}")]
    UnknownColor(u32),

    #[error("Parent {0} not present in scene tree")]
    ParentMissing(crate::crdt::CrdtId),

    #[error("Duplicate CRDT id in sequence: {0}")]
    DuplicateId(crate::crdt::CrdtId),
}

pub type Result<T> = std::result::Result<T, LinesError>;
