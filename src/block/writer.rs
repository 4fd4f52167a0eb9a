/// block/writer.rs
use super::{BlockBuffer, BlockConfig, BlockEntry, CompressedBlock};
use crate::error::RsIndexError;
use core::fmt;
use std::io;

/// Block-based compressed writer. Entries must be added in ascending key order.
pub struct BlockWriter {
    buffer: BlockBuffer,
    config: BlockConfig,
    last_key: Option<u64>,
}

impl fmt::Debug for BlockWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockWriter")
            .field("buffer_size", &self.buffer.records.len())
            .field("last_key", &self.last_key)
            .field("config", &self.config)
            .finish()
    }
}

impl BlockWriter {
    /// Create a new [`BlockWriter`].
    pub fn new(config: BlockConfig) -> Self {
        Self {
            buffer: BlockBuffer {
                records: Vec::with_capacity(config.max_records),
            },
            config,
            last_key: None,
        }
    }

    /// The [`BlockWriter`] is flushed once the buffer holds `max_records` entries.
    fn should_flush(&self) -> bool {
        if self.buffer.records.is_empty() {
            return false;
        }

        self.buffer.records.len() >= self.config.max_records
    }

    /// Flush the current [`BlockWriter`], by serializing
    /// the entries in the block to binary and compressing them.
    pub fn flush(&mut self) -> io::Result<CompressedBlock> {
        let first_key = self.buffer.records.first().map_or(0, |e| e.0);
        let last_key = self.buffer.records.last().map_or(0, |e| e.0);

        // Serialize entries
        let records_data = bincode::serialize(&self.buffer.records)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        // Compress into a new Vec
        let mut compressed_data = Vec::new();
        zstd::stream::copy_encode(
            records_data.as_slice(),
            &mut compressed_data,
            self.config.level,
        )?;

        let block = CompressedBlock {
            compressed_size: compressed_data.len() as u32,
            uncompressed_size: records_data.len() as u32,
            n_records: self.buffer.records.len() as u32,
            data: compressed_data,
            first_key,
            last_key,
        };

        self.buffer.records.clear();

        Ok(block)
    }

    /// Add an entry to the [`BlockWriter`] buffer, returning a block when it fills up.
    pub fn add_record(&mut self, entry: BlockEntry) -> Result<Option<CompressedBlock>, RsIndexError> {
        if let Some(previous) = self.last_key {
            if entry.0 <= previous {
                return Err(RsIndexError::UnsortedKeys {
                    previous,
                    current: entry.0,
                });
            }
        }
        self.last_key = Some(entry.0);
        self.buffer.records.push(entry);

        if self.should_flush() {
            Ok(Some(self.flush()?))
        } else {
            Ok(None)
        }
    }

    /// Flush remaining entries if any exist
    pub fn finish(&mut self) -> io::Result<Option<CompressedBlock>> {
        if self.buffer.records.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.flush()?))
        }
    }
}
