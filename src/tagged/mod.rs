pub mod reader;
pub mod writer;

pub use self::reader::{FramedBlock, SubblockScope, TaggedReader};
pub use self::writer::{SubblockStart, TaggedWriter};

/// Wire type carried in the low nibble of a tag. The high nibble (and
/// any higher varuint bits) is the field index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TagType {
    /// Single byte: bool or u8.
    Byte1 = 0x1,
    /// Four bytes: u32 or f32.
    Byte4 = 0x4,
    /// Eight bytes: f64.
    Byte8 = 0x8,
    /// Length-prefixed sub-block: u32 length then payload.
    Length4 = 0xC,
    /// CRDT id: author byte plus varuint counter.
    Id = 0xF,
}
