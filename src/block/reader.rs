/// block/reader.rs
use super::{BlockEntry, CompressedBlock};
use std::io::{self, Read, Seek, SeekFrom};

pub struct BlockReader<R: Read + Seek> {
    /// The underlying reader
    reader: R,
}

impl<R: Read + Seek> BlockReader<R> {
    /// Create a new BlockReader
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read a block header, and the compressed data following it, from the current position
    pub fn read_header(&mut self) -> io::Result<CompressedBlock> {
        let mut size_buf = [0u8; 4];
        let mut key_buf = [0u8; 8];

        self.reader.read_exact(&mut size_buf)?;
        let compressed_size = u32::from_le_bytes(size_buf);

        self.reader.read_exact(&mut size_buf)?;
        let uncompressed_size = u32::from_le_bytes(size_buf);

        self.reader.read_exact(&mut size_buf)?;
        let n_records = u32::from_le_bytes(size_buf);

        self.reader.read_exact(&mut key_buf)?;
        let first_key = u64::from_le_bytes(key_buf);

        self.reader.read_exact(&mut key_buf)?;
        let last_key = u64::from_le_bytes(key_buf);

        let mut data = vec![0u8; compressed_size as usize];
        self.reader.read_exact(&mut data)?;

        Ok(CompressedBlock {
            compressed_size,
            uncompressed_size,
            n_records,
            data,
            first_key,
            last_key,
        })
    }

    /// Read and decompress the entries of a block, in ascending key order.
    pub fn read_records(&mut self, header: &CompressedBlock) -> io::Result<Vec<BlockEntry>> {
        let mut decompressed = Vec::with_capacity(header.uncompressed_size as usize);
        zstd::stream::copy_decode(header.data.as_slice(), &mut decompressed)?;

        let records: Vec<BlockEntry> = bincode::deserialize(&decompressed)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if records.len() != header.n_records as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "block holds {} entries, header says {}",
                    records.len(),
                    header.n_records
                ),
            ));
        }

        Ok(records)
    }

    /// Seek to a specific position in the file.
    pub fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.reader.seek(pos)
    }
}
