// build.rs

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use tracing::{debug, info};

use crate::error::RsIndexError;
use crate::key::{VariantKey, RSID_PREFIX};
use crate::records::{is_header, ID_SEPARATOR};
use crate::store::{StoreConfig, StoreWriter};

/// Data lines between progress reports, until the reports thin out.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000_000;

/// Chromosome, position, ID and at least one more column.
pub const MIN_FIELDS: usize = 4;

const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

/// Receives the number of data lines processed so far while a build runs.
pub trait ProgressSink {
    fn processed(&mut self, lines: u64);
}

impl<F: FnMut(u64)> ProgressSink for F {
    fn processed(&mut self, lines: u64) {
        self(lines)
    }
}

/// Reports progress as `info` events.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn processed(&mut self, lines: u64) {
        info!("processed {} variants", lines);
    }
}

/// Discards progress.
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn processed(&mut self, _lines: u64) {}
}

/// Decides when a progress report is due: every `interval` lines until ten
/// intervals have passed, then the interval grows tenfold
/// (1M, 2M, ..., 10M, 20M, ..., 100M, 200M, ...).
#[derive(Debug, Clone)]
pub struct ProgressSchedule {
    interval: u64,
    threshold: u64,
}

impl Default for ProgressSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_INTERVAL)
    }
}

impl ProgressSchedule {
    pub fn new(interval: u64) -> Self {
        let interval = interval.max(1);
        Self {
            interval,
            threshold: interval,
        }
    }

    /// Whether a report is due after `lines` lines.
    pub fn tick(&mut self, lines: u64) -> bool {
        if lines < self.threshold {
            return false;
        }
        self.threshold += self.interval;
        if self.threshold == self.interval * 10 {
            self.interval = self.threshold;
        }
        true
    }
}

/// Stream a sorted, tab-delimited variant file once and record every `rs`
/// identifier it lists. Returns the number of keys newly written to `store`.
///
/// Lines starting with `#` are skipped. A data line with fewer than
/// [`MIN_FIELDS`] fields (a blank line has none), or a position that is not
/// an unsigned integer, aborts the build. Identifiers without the `rs` prefix are ignored, and a
/// key seen before keeps its first coordinate.
pub fn build<R: Read, P: ProgressSink + ?Sized>(
    source: R,
    store: &mut StoreWriter,
    progress: &mut P,
) -> Result<u64, RsIndexError> {
    build_with_schedule(source, store, progress, ProgressSchedule::default())
}

pub fn build_with_schedule<R: Read, P: ProgressSink + ?Sized>(
    source: R,
    store: &mut StoreWriter,
    progress: &mut P,
    mut schedule: ProgressSchedule,
) -> Result<u64, RsIndexError> {
    let mut reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, source);
    let mut buffer = String::new();
    let mut line = 0u64;
    let mut processed = 0u64;
    let mut written = 0u64;
    let mut skipped = 0u64;

    loop {
        buffer.clear();
        if reader.read_line(&mut buffer)? == 0 {
            break;
        }
        line += 1;
        if is_header(&buffer) {
            continue;
        }

        let record = buffer.trim_end_matches(['\n', '\r']);
        let fields: Vec<&str> = record.splitn(MIN_FIELDS, '\t').collect();
        if fields.len() < MIN_FIELDS {
            return Err(RsIndexError::Parse {
                line,
                message: format!(
                    "expected at least {} tab-separated fields, found {}",
                    MIN_FIELDS,
                    if record.is_empty() { 0 } else { fields.len() }
                ),
            });
        }

        let chrom = fields[0];
        let position: u64 = fields[1].parse().map_err(|_| RsIndexError::Parse {
            line,
            message: format!("invalid position \"{}\"", fields[1]),
        })?;

        for id in fields[2].split(ID_SEPARATOR) {
            match VariantKey::from_source(id) {
                Some(key) => {
                    if store.put_if_absent(key, chrom, position) {
                        written += 1;
                    }
                }
                None => {
                    if id.starts_with(RSID_PREFIX) {
                        debug!("line {}: ignoring malformed identifier \"{}\"", line, id);
                    }
                    skipped += 1;
                }
            }
        }

        processed += 1;
        if schedule.tick(processed) {
            progress.processed(processed);
        }
    }

    info!(
        "indexed {} rsIDs from {} variants ({} non-rsID identifiers ignored)",
        written, processed, skipped
    );
    Ok(written)
}

/// Build a complete store at `destination` from `source`. The destination is
/// expected to be free (see [`prepare_destination`](crate::store::prepare_destination)).
pub fn build_index<R: Read, P: ProgressSink + ?Sized>(
    source: R,
    destination: &Path,
    config: StoreConfig,
    progress: &mut P,
) -> Result<u64, RsIndexError> {
    let mut store = StoreWriter::create(destination, config)?;
    build(source, &mut store, progress)?;
    store.finalize()
}
