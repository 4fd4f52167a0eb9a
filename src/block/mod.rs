/// block/mod.rs
use std::io::{self, Write};

/// One stored mapping: (rsID key, chromosome id, position).
///
/// Chromosome ids index into the chromosome table of the [`KeyIndex`](crate::index::KeyIndex).
pub type BlockEntry = (u64, u32, u64);

/// Bytes in a serialized block header.
pub const HEADER_SIZE: u64 = 28;

/// A compressed block of entries, complete with metadata.
#[derive(Debug)]
pub struct CompressedBlock {
    /// Size of compressed data in bytes
    pub compressed_size: u32,
    /// Size of uncompressed data in bytes
    pub uncompressed_size: u32,
    /// Number of entries in block
    pub n_records: u32,
    /// The compressed data bytes
    pub data: Vec<u8>,
    /// Smallest key in the block
    pub first_key: u64,
    /// Largest key in the block
    pub last_key: u64,
}

/// Configuration for block parameters
#[derive(Debug, Clone)]
pub struct BlockConfig {
    /// Maximum entries per block
    pub max_records: usize,
    /// zstd compression level
    pub level: i32,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            max_records: 4096,
            level: 3,
        }
    }
}

/// Write a block to the given writer
pub fn write_block<W: Write>(writer: &mut W, block: &CompressedBlock) -> io::Result<()> {
    // Write header fields in little-endian format
    writer.write_all(&block.compressed_size.to_le_bytes())?;
    writer.write_all(&block.uncompressed_size.to_le_bytes())?;
    writer.write_all(&block.n_records.to_le_bytes())?;
    writer.write_all(&block.first_key.to_le_bytes())?;
    writer.write_all(&block.last_key.to_le_bytes())?;

    // Write compressed data
    writer.write_all(&block.data)?;

    Ok(())
}

/// Buffer for accumulating entries before compression
#[derive(Debug)]
pub struct BlockBuffer {
    /// Entries in ascending key order
    pub records: Vec<BlockEntry>,
}

pub mod reader;
pub mod writer;

pub use reader::BlockReader;
pub use writer::BlockWriter;
