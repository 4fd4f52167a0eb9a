use std::{
    collections::{hash_map::Entry, BTreeSet},
    fs::{self, File},
    io::{BufWriter, Cursor, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use dashmap::DashMap;
use memmap2::Mmap;
use rayon::slice::ParallelSliceMut;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::{
    block::{write_block, BlockConfig, BlockEntry, BlockReader, BlockWriter, HEADER_SIZE},
    error::RsIndexError,
    index::KeyIndex,
    key::VariantKey,
    records::CoordinateEntry,
};

const INDEX_FILENAME: &str = "index.bin";
const DATA_FILENAME: &str = "records.bin";
const INDEX_TMP_FILENAME: &str = "index.bin.tmp";
const STORE_FILENAMES: [&str; 3] = [INDEX_FILENAME, DATA_FILENAME, INDEX_TMP_FILENAME];
const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;
const DEFAULT_CACHE_BYTES: usize = 8 * 1024 * 1024;

/// Advisory tuning knobs for the storage engine. Unset values fall back to
/// defaults.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Cache size in KiB: bounds the decoded block cache on read, and sizes
    /// the output buffer on write.
    pub cache_size: Option<usize>,
    /// Memory map the block file on read when it is no larger than this many
    /// bytes.
    pub mmap_size: Option<u64>,
}

impl StoreConfig {
    fn cache_bytes(&self) -> Option<usize> {
        self.cache_size.map(|kib| kib.saturating_mul(1024))
    }
}

/// Make room for a new store at `path`.
///
/// An existing store is only removed when `force` is set; otherwise the build
/// is refused with [`RsIndexError::DestinationExists`]. Anything at `path`
/// that is not a store (a file, or a directory holding other files) is never
/// removed.
pub fn prepare_destination(path: &Path, force: bool) -> Result<(), RsIndexError> {
    if !path.exists() {
        return Ok(());
    }
    if !force {
        return Err(RsIndexError::DestinationExists(path.to_path_buf()));
    }
    if !is_store_directory(path)? {
        return Err(RsIndexError::NotAStore(path.to_path_buf()));
    }

    warn!("index \"{}\" exists, overwriting", path.display());
    for name in STORE_FILENAMES {
        let file = path.join(name);
        if file.exists() {
            fs::remove_file(file)?;
        }
    }
    fs::remove_dir(path)?;
    Ok(())
}

/// A directory holding nothing but store files. An empty directory, as left
/// by a build that failed early, counts.
fn is_store_directory(path: &Path) -> Result<bool, RsIndexError> {
    if !path.is_dir() {
        return Ok(false);
    }
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let known = STORE_FILENAMES
            .iter()
            .any(|name| entry.file_name() == *name);
        if !known || !entry.file_type()?.is_file() {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Write side of a store: collects entries with first-write-wins semantics
/// and lays them out as sorted blocks on [`finalize`](StoreWriter::finalize).
#[derive(Debug)]
pub struct StoreWriter {
    directory: PathBuf,
    index: KeyIndex,
    pending: FxHashMap<u64, (u32, u64)>,
    config: StoreConfig,
    block_config: BlockConfig,
}

impl StoreWriter {
    pub fn create(directory: &Path, config: StoreConfig) -> Result<Self, RsIndexError> {
        Self::create_with_blocks(directory, config, BlockConfig::default())
    }

    pub fn create_with_blocks(
        directory: &Path,
        config: StoreConfig,
        block_config: BlockConfig,
    ) -> Result<Self, RsIndexError> {
        fs::create_dir_all(directory)?;

        // a leftover index would make an unfinished build look valid
        let index_path = directory.join(INDEX_FILENAME);
        if index_path.exists() {
            fs::remove_file(&index_path)?;
        }
        if config.mmap_size.is_some() {
            debug!("mmap size only applies when reading a store, ignoring it for the build");
        }

        Ok(Self {
            directory: directory.to_path_buf(),
            index: KeyIndex::new(),
            pending: FxHashMap::default(),
            config,
            block_config,
        })
    }

    /// Record `key → (chrom, position)` unless the key is already present.
    /// Returns whether the entry was inserted.
    pub fn put_if_absent(&mut self, key: VariantKey, chrom: &str, position: u64) -> bool {
        match self.pending.entry(key.get()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                let chrom_id = self.index.intern(chrom);
                slot.insert((chrom_id, position));
                true
            }
        }
    }

    /// Number of distinct keys written so far.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Sort the keys, write the block file and then the index. Returns the
    /// number of keys stored.
    pub fn finalize(self) -> Result<u64, RsIndexError> {
        let Self {
            directory,
            mut index,
            pending,
            config,
            block_config,
        } = self;

        let mut entries: Vec<BlockEntry> = pending
            .into_iter()
            .map(|(key, (chrom_id, position))| (key, chrom_id, position))
            .collect();
        entries.par_sort_unstable_by_key(|entry| entry.0);

        let buffer_size = config.cache_bytes().unwrap_or(DEFAULT_BUFFER_SIZE).max(8 * 1024);
        let data_path = directory.join(DATA_FILENAME);
        let mut file = BufWriter::with_capacity(buffer_size, File::create(&data_path)?);
        let mut writer = BlockWriter::new(block_config);
        let mut offset = 0u64;

        for entry in entries.iter().copied() {
            if let Some(block) = writer.add_record(entry)? {
                write_block(&mut file, &block)?;
                index.add_block(block.first_key, block.last_key, offset);
                offset += HEADER_SIZE + block.compressed_size as u64;
            }
        }
        if let Some(block) = writer.finish()? {
            write_block(&mut file, &block)?;
            index.add_block(block.first_key, block.last_key, offset);
        }
        file.flush()?;
        file.get_ref().sync_all()?;

        index.n_entries = entries.len() as u64;
        index.write(&directory.join(INDEX_FILENAME))?;

        info!(
            "wrote {} rsIDs on {} chromosomes in {} blocks to {}",
            index.n_entries,
            index.chromosomes.len(),
            index.blocks.len(),
            directory.display()
        );
        Ok(index.n_entries)
    }
}

enum BlockData {
    Mapped(Mmap),
    File(PathBuf),
}

/// Decoded blocks keyed by file offset. Cleared wholesale when it outgrows
/// its byte budget.
struct BlockCache {
    blocks: DashMap<u64, Arc<Vec<BlockEntry>>>,
    bytes: AtomicUsize,
    capacity: usize,
}

impl BlockCache {
    fn new(capacity: usize) -> Self {
        Self {
            blocks: DashMap::new(),
            bytes: AtomicUsize::new(0),
            capacity,
        }
    }

    fn get(&self, offset: u64) -> Option<Arc<Vec<BlockEntry>>> {
        self.blocks.get(&offset).map(|b| Arc::clone(b.value()))
    }

    fn insert(&self, offset: u64, block: Arc<Vec<BlockEntry>>) {
        let size = block.len() * std::mem::size_of::<BlockEntry>();
        if size > self.capacity {
            return;
        }
        if self.bytes.fetch_add(size, Ordering::Relaxed) + size > self.capacity {
            self.blocks.clear();
            self.bytes.store(size, Ordering::Relaxed);
        }
        self.blocks.insert(offset, block);
    }
}

/// Read side of a store: a sorted `VariantKey → CoordinateEntry` mapping.
///
/// Opening never modifies the store, and a `VariantStore` can be shared
/// between threads.
pub struct VariantStore {
    index: KeyIndex,
    directory: PathBuf,
    data: BlockData,
    cache: BlockCache,
}

impl std::fmt::Debug for VariantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariantStore")
            .field("directory", &self.directory)
            .field("n_entries", &self.index.n_entries)
            .field("n_blocks", &self.index.blocks.len())
            .field("mapped", &matches!(self.data, BlockData::Mapped(_)))
            .finish()
    }
}

impl VariantStore {
    pub fn open(directory: &Path) -> Result<Self, RsIndexError> {
        Self::open_with(directory, StoreConfig::default())
    }

    pub fn open_with(directory: &Path, config: StoreConfig) -> Result<Self, RsIndexError> {
        let index_path = directory.join(INDEX_FILENAME);
        let data_path = directory.join(DATA_FILENAME);
        if !index_path.is_file() || !data_path.is_file() {
            return Err(RsIndexError::StoreNotFinalized(directory.to_path_buf()));
        }
        let index = KeyIndex::open(&index_path)?;

        let data_len = fs::metadata(&data_path)?.len();
        let data = match config.mmap_size {
            Some(limit) if data_len > 0 && data_len <= limit => {
                let file = File::open(&data_path)?;
                // SAFETY: stores are never modified once finalized
                BlockData::Mapped(unsafe { Mmap::map(&file)? })
            }
            _ => BlockData::File(data_path),
        };

        let capacity = config.cache_bytes().unwrap_or(DEFAULT_CACHE_BYTES);
        Ok(Self {
            index,
            directory: directory.to_path_buf(),
            data,
            cache: BlockCache::new(capacity),
        })
    }

    pub fn len(&self) -> u64 {
        self.index.n_entries
    }

    pub fn is_empty(&self) -> bool {
        self.index.n_entries == 0
    }

    /// Chromosome labels present in the store, in first-seen order.
    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.index.chromosomes.iter().map(String::as_str)
    }

    pub fn get(&self, key: VariantKey) -> Result<Option<CoordinateEntry>, RsIndexError> {
        let Some(offset) = self.index.find_block(key.get()) else {
            return Ok(None);
        };
        let block = self.load_block(offset)?;
        match block.binary_search_by_key(&key.get(), |e| e.0) {
            Ok(i) => Ok(Some(self.coordinate(block[i].1, block[i].2)?)),
            Err(_) => Ok(None),
        }
    }

    /// The distinct coordinates of the given keys. Keys that are not in the
    /// store are skipped, and keys sharing a coordinate yield it once.
    pub fn get_many<I>(&self, keys: I) -> Result<BTreeSet<CoordinateEntry>, RsIndexError>
    where
        I: IntoIterator<Item = VariantKey>,
    {
        let mut keys: Vec<u64> = keys.into_iter().map(VariantKey::get).collect();
        keys.sort_unstable();
        keys.dedup();

        let mut found: BTreeSet<(u32, u64)> = BTreeSet::new();
        for (offset, members) in self.index.group_by_block(&keys) {
            let block = self.load_block(offset)?;
            for key in members {
                if let Ok(i) = block.binary_search_by_key(&key, |e| e.0) {
                    let (_, chrom_id, position) = block[i];
                    found.insert((chrom_id, position));
                }
            }
        }

        found
            .into_iter()
            .map(|(chrom_id, position)| self.coordinate(chrom_id, position))
            .collect()
    }

    fn coordinate(&self, chrom_id: u32, position: u64) -> Result<CoordinateEntry, RsIndexError> {
        let chrom = self.index.chrom_name(chrom_id).ok_or_else(|| {
            RsIndexError::StringError(format!("Unknown chromosome id {} in store", chrom_id))
        })?;
        Ok(CoordinateEntry::new(chrom, position))
    }

    fn load_block(&self, offset: u64) -> Result<Arc<Vec<BlockEntry>>, RsIndexError> {
        if let Some(block) = self.cache.get(offset) {
            return Ok(block);
        }

        let records = match &self.data {
            BlockData::Mapped(mmap) => {
                let start = usize::try_from(offset)
                    .ok()
                    .filter(|&start| start < mmap.len())
                    .ok_or(RsIndexError::InvalidOffset(offset))?;
                read_block_at(Cursor::new(&mmap[start..]), SeekFrom::Start(0))?
            }
            BlockData::File(path) => read_block_at(File::open(path)?, SeekFrom::Start(offset))?,
        };

        let block = Arc::new(records);
        self.cache.insert(offset, Arc::clone(&block));
        Ok(block)
    }
}

fn read_block_at<R: Read + Seek>(reader: R, pos: SeekFrom) -> Result<Vec<BlockEntry>, RsIndexError> {
    let mut reader = BlockReader::new(reader);
    reader.seek(pos)?;
    let header = reader.read_header()?;
    Ok(reader.read_records(&header)?)
}
