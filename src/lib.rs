//! Reader and writer for the reMarkable v6 `.lines` ("scene") file
//! format: a tagged binary block stream whose payload is a concurrent
//! document of strokes, groups, highlights and rich text stored as
//! CRDT sequences.
//!
//! The crate works on byte slices; loading and saving files is the
//! caller's job.
//!
//! ```no_run
//! use remlines::SceneDocument;
//!
//! let data = std::fs::read("page.rm").unwrap();
//! let document = SceneDocument::from_bytes(&data).unwrap();
//! for (id, item) in document.tree.walk().unwrap() {
//!     println!("{id}: {item:?}");
//! }
//! ```

pub mod blocks;
pub mod crdt;
pub mod document;
pub mod error;
pub mod model;
pub mod stream;
pub mod tagged;
pub mod tree;

pub use crate::blocks::{
    read_blocks, write_blocks, Block, UnreadableBlock, WriteOptions, FILE_HEADER,
};
pub use crate::crdt::{CrdtId, CrdtSequence, CrdtSequenceItem, ItemValue, LwwValue};
pub use crate::document::SceneDocument;
pub use crate::error::{LinesError, Result};
pub use crate::tree::SceneTree;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_header_is_43_bytes() {
        assert_eq!(FILE_HEADER.len(), 43);
        assert!(FILE_HEADER.starts_with(b"reMarkable .lines file, version=6"));
    }

    #[test]
    fn empty_input_is_a_bad_header() {
        assert!(matches!(read_blocks(&[]), Err(LinesError::BadHeader)));
    }
}
