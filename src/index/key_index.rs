// key_index.rs

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::RsIndexError;

/// Bumped whenever the on-disk layout of the index or blocks changes.
pub const FORMAT_VERSION: u32 = 1;

/// KeyIndex is the directory of a store's block file: the key range and
/// file offset of every block, plus the chromosome labels the blocks
/// refer to by id.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct KeyIndex {
    pub version: u32,
    /// Chromosome labels in first-seen order; a label's position is its id.
    pub chromosomes: IndexSet<String>,
    /// Blocks in ascending key order. Key ranges never overlap.
    pub blocks: Vec<BlockSpan>,
    /// Total number of keys in the store.
    pub n_entries: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BlockSpan {
    /// Smallest key in the block.
    pub first_key: u64,
    /// Largest key in the block.
    pub last_key: u64,
    /// Offset of the block header in the block file.
    pub offset: u64,
}

impl Default for KeyIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyIndex {
    pub fn new() -> Self {
        KeyIndex {
            version: FORMAT_VERSION,
            chromosomes: IndexSet::new(),
            blocks: Vec::new(),
            n_entries: 0,
        }
    }

    /// Create a new index object by reading a binary serialized version of disk.
    pub fn open(path: &Path) -> Result<Self, RsIndexError> {
        let file = File::open(path)?;
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        let index: KeyIndex = bincode::deserialize(&mmap[..])?;
        if index.version != FORMAT_VERSION {
            return Err(RsIndexError::IncompatibleStore {
                found: index.version,
                expected: FORMAT_VERSION,
            });
        }
        Ok(index)
    }

    /// Id of a chromosome label, registering it on first sight.
    pub fn intern(&mut self, chrom: &str) -> u32 {
        if let Some(id) = self.chromosomes.get_index_of(chrom) {
            return id as u32;
        }
        self.chromosomes.insert_full(chrom.to_string()).0 as u32
    }

    pub fn chrom_name(&self, id: u32) -> Option<&str> {
        self.chromosomes.get_index(id as usize).map(String::as_str)
    }

    /// Register a block; blocks must be added in key order.
    pub fn add_block(&mut self, first_key: u64, last_key: u64, offset: u64) {
        self.blocks.push(BlockSpan {
            first_key,
            last_key,
            offset,
        });
    }

    /// Offset of the only block that can hold `key`, if any.
    pub fn find_block(&self, key: u64) -> Option<u64> {
        let i = self.blocks.partition_point(|b| b.last_key < key);
        self.blocks
            .get(i)
            .filter(|b| b.first_key <= key)
            .map(|b| b.offset)
    }

    /// Group sorted, deduplicated keys by the block that may contain them.
    /// Keys outside every block's range are dropped.
    pub fn group_by_block(&self, keys: &[u64]) -> Vec<(u64, Vec<u64>)> {
        let mut groups: Vec<(u64, Vec<u64>)> = Vec::new();
        for &key in keys {
            let Some(offset) = self.find_block(key) else {
                continue;
            };
            match groups.last_mut() {
                Some((last, members)) if *last == offset => members.push(key),
                _ => groups.push((offset, vec![key])),
            }
        }
        groups
    }

    /// Write the KeyIndex to a path by binary serialization.
    ///
    /// The index goes to a temporary sibling first and is renamed into place,
    /// so a store directory never holds a partially written index.
    pub fn write(&self, path: &Path) -> Result<(), RsIndexError> {
        let tmp_path = path.with_extension("bin.tmp");
        {
            let mut file = BufWriter::new(File::create(&tmp_path)?);
            bincode::serialize_into(&mut file, &self)?;
            file.flush()?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use tempfile;

    fn make_test_case_01() -> KeyIndex {
        let mut index = KeyIndex::new();
        index.add_block(10, 20, 0);
        index.add_block(25, 40, 100);
        index.add_block(41, 41, 250);
        index
    }

    #[test]
    fn test_find_block() {
        let index = make_test_case_01();

        assert_eq!(index.find_block(9), None);
        assert_eq!(index.find_block(10), Some(0));
        assert_eq!(index.find_block(20), Some(0));
        assert_eq!(index.find_block(21), None); // gap between blocks
        assert_eq!(index.find_block(30), Some(100));
        assert_eq!(index.find_block(41), Some(250));
        assert_eq!(index.find_block(42), None);
    }

    #[test]
    fn test_group_by_block() {
        let index = make_test_case_01();
        let groups = index.group_by_block(&[1, 12, 15, 22, 25, 41, 99]);
        assert_eq!(
            groups,
            vec![(0, vec![12, 15]), (100, vec![25]), (250, vec![41])]
        );
        assert!(KeyIndex::new().group_by_block(&[1, 2, 3]).is_empty());
    }

    #[test]
    fn test_intern() {
        let mut index = KeyIndex::new();
        assert_eq!(index.intern("17"), 0);
        assert_eq!(index.intern("4"), 1);
        assert_eq!(index.intern("17"), 0);
        assert_eq!(index.chrom_name(1), Some("4"));
        assert_eq!(index.chrom_name(2), None);
    }

    #[test]
    fn test_persistent_storage() {
        let mut index = make_test_case_01();
        index.intern("chr1");
        index.n_entries = 3;
        let tmp_dir = tempfile::tempdir().expect("Error creating tempdir");
        let index_file = tmp_dir.path().join("index.bin");

        index.write(&index_file).expect("Error writing index");
        assert!(!tmp_dir.path().join("index.bin.tmp").exists());

        let obj = KeyIndex::open(&index_file).expect("Error reading index");
        assert_eq!(index, obj);
    }

    #[test]
    fn test_version_mismatch() {
        let mut index = KeyIndex::new();
        index.version = FORMAT_VERSION + 1;
        let tmp_dir = tempfile::tempdir().expect("Error creating tempdir");
        let index_file = tmp_dir.path().join("index.bin");
        index.write(&index_file).unwrap();

        let err = KeyIndex::open(&index_file).unwrap_err();
        assert!(matches!(err, RsIndexError::IncompatibleStore { .. }));
    }
}
